//! Partition and range properties of the standard catalog.

use partscale_presets::{build_catalog, PresetError};

#[test]
fn every_size_maps_to_exactly_one_bucket() {
    let table = build_catalog();
    let presets = table.presets();

    let mut size = 0.0;
    while size < 25.0 {
        let hit = table.closest(size).unwrap();
        let owners: Vec<usize> = presets
            .iter()
            .enumerate()
            .filter(|(i, p)| {
                let upper = presets.get(i + 1).map_or(f64::INFINITY, |n| n.min_size);
                size >= p.min_size && size < upper
            })
            .map(|(i, _)| i)
            .collect();
        assert_eq!(owners, vec![hit.index], "size {size}");
        size += 0.01;
    }
}

#[test]
fn range_selection_is_sorted_and_bounded() {
    let table = build_catalog();
    for &(min, max) in &[(0.0, 100.0), (0.625, 5.0), (1.0, 3.0), (3.75, 3.75)] {
        let selection = table.presets_in_range(min, max, 0.0);
        let sizes: Vec<f64> = selection
            .profiles
            .iter()
            .map(|key| table.preset_for_key(key).unwrap().size)
            .collect();
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
        assert!(sizes.iter().all(|&s| s >= min && s <= max));
        assert_eq!(selection.selected, 0);
    }
}

#[test]
fn keys_round_trip_through_lookup() {
    let table = build_catalog();
    for preset in &table {
        assert_eq!(table.preset_for_key(&preset.profile).unwrap(), preset);
    }
    assert!(matches!(
        table.preset_for_key("0.3"),
        Err(PresetError::NotFound(_))
    ));
}
