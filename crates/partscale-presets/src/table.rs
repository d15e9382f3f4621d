//! The stack preset catalog.

use serde::Serialize;

use crate::error::{PresetError, Result};

/// Diameter of the 1.25 m base stack, used to derive profile keys.
const BASE_STACK_SIZE: f64 = 1.25;

/// Standard stack diameters and whether each is a "round" size eligible
/// for silent autodetection.
const STANDARD_SIZES: [(f64, bool); 15] = [
    (0.3125, false),
    (0.625, true),
    (0.9375, false),
    (1.25, true),
    (1.875, true),
    (2.5, true),
    (3.75, true),
    (4.375, false),
    (5.0, true),
    (6.25, false),
    (7.5, true),
    (10.0, true),
    (12.5, false),
    (15.0, false),
    (20.0, false),
];

/// A standard cylindrical connector diameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackPreset {
    /// Diameter in metres.
    pub size: f64,
    /// Lower bound of the size bucket owned by this preset.
    pub min_size: f64,
    /// Position in the sorted catalog.
    pub index: usize,
    /// Eligible for autodetection.
    pub is_auto_profile: bool,
    /// Stable machine key (size relative to 1.25 m, e.g. `"1.5"`).
    pub profile: String,
    /// Display label (e.g. `"1.875m"`).
    pub title: String,
}

impl StackPreset {
    fn new(size: f64, is_auto_profile: bool) -> Self {
        let ratio = (size / BASE_STACK_SIZE * 1000.0).round() / 1000.0;
        Self {
            size,
            min_size: 0.0,
            index: 0,
            is_auto_profile,
            profile: format_trimmed(ratio, 3),
            title: format!("{}m", format_trimmed(size, 4)),
        }
    }
}

impl std::fmt::Display for StackPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Format with at most `decimals` fractional digits, dropping trailing zeros.
fn format_trimmed(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Presets offered for a size range, ready for a choice control.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PresetSelection {
    /// Profile keys in ascending size order.
    pub profiles: Vec<String>,
    /// Display titles, parallel to `profiles`.
    pub titles: Vec<String>,
    /// Index of the preset exactly equal to the current size, else 0.
    pub selected: usize,
}

impl PresetSelection {
    /// Number of offered presets.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True when no preset is offered.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Immutable, size-sorted catalog of stack presets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresetTable {
    presets: Vec<StackPreset>,
}

/// Build the standard stack preset catalog.
///
/// Call once during start-up and share the result; the table never
/// changes afterwards.
pub fn build_catalog() -> PresetTable {
    PresetTable::from_sizes(STANDARD_SIZES.iter().copied())
}

impl PresetTable {
    /// Build a catalog from `(size, is_auto_profile)` pairs in any order.
    ///
    /// Each preset owns the half-open interval from the midpoint with its
    /// smaller neighbour up to the midpoint with its larger neighbour; the
    /// first preset's bucket starts at zero.
    pub fn from_sizes(sizes: impl IntoIterator<Item = (f64, bool)>) -> Self {
        let mut presets: Vec<StackPreset> = sizes
            .into_iter()
            .map(|(size, auto)| StackPreset::new(size, auto))
            .collect();
        presets.sort_by(|a, b| a.size.total_cmp(&b.size));

        for i in 0..presets.len() {
            presets[i].index = i;
            presets[i].min_size = if i == 0 {
                0.0
            } else {
                let prev = presets[i - 1].size;
                presets[i].size - (presets[i].size - prev) * 0.5
            };
        }

        Self { presets }
    }

    /// All presets in ascending size order.
    pub fn presets(&self) -> &[StackPreset] {
        &self.presets
    }

    /// Iterate presets in ascending size order.
    pub fn iter(&self) -> std::slice::Iter<'_, StackPreset> {
        self.presets.iter()
    }

    /// Number of presets.
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// True for an empty catalog.
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Preset whose bucket contains `size`.
    ///
    /// Sizes below the first bucket clamp to the smallest preset, sizes
    /// past the last boundary fall into the largest. `None` only for an
    /// empty catalog.
    pub fn closest(&self, size: f64) -> Option<&StackPreset> {
        self.presets
            .iter()
            .rev()
            .find(|p| size >= p.min_size)
            .or_else(|| self.presets.first())
    }

    /// Presets between `min` and `max` for a forced-snap choice control.
    ///
    /// The run starts at the first preset not smaller than `min` and is as
    /// long as the number of presets within `[min, max]`. The catalog has
    /// no gaps, so this is the contiguous range. `selected` is only set on
    /// an exact size match with `current`.
    pub fn presets_in_range(&self, min: f64, max: f64, current: f64) -> PresetSelection {
        let mut start = None;
        let mut count = 0;
        for (i, preset) in self.presets.iter().enumerate() {
            if preset.size >= min {
                start.get_or_insert(i);
                if preset.size <= max {
                    count += 1;
                }
            }
        }

        let mut selection = PresetSelection::default();
        let Some(start) = start else {
            return selection;
        };

        for (i, preset) in self.presets[start..start + count].iter().enumerate() {
            selection.profiles.push(preset.profile.clone());
            selection.titles.push(preset.title.clone());
            if preset.size == current {
                selection.selected = i;
            }
        }
        selection
    }

    /// Exact lookup by profile key.
    pub fn preset_for_key(&self, profile: &str) -> Result<&StackPreset> {
        self.presets
            .iter()
            .find(|p| p.profile == profile)
            .ok_or_else(|| PresetError::NotFound(profile.to_string()))
    }
}

impl<'a> IntoIterator for &'a PresetTable {
    type Item = &'a StackPreset;
    type IntoIter = std::slice::Iter<'a, StackPreset>;

    fn into_iter(self) -> Self::IntoIter {
        self.presets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_catalog_sorted_with_midpoints() {
        let table = build_catalog();
        assert_eq!(table.len(), 15);
        assert_eq!(table.presets()[0].min_size, 0.0);
        for pair in table.presets().windows(2) {
            assert!(pair[0].size < pair[1].size);
            assert_relative_eq!(pair[1].min_size, (pair[0].size + pair[1].size) / 2.0);
        }
        for (i, preset) in table.iter().enumerate() {
            assert_eq!(preset.index, i);
        }
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let table = PresetTable::from_sizes([(2.5, true), (1.25, true), (1.875, false)]);
        let sizes: Vec<f64> = table.iter().map(|p| p.size).collect();
        assert_eq!(sizes, vec![1.25, 1.875, 2.5]);
        assert_relative_eq!(table.presets()[1].min_size, 1.5625);
    }

    #[test]
    fn test_profile_and_title() {
        let table = build_catalog();
        let keys: Vec<&str> = table.iter().map(|p| p.profile.as_str()).collect();
        assert_eq!(keys[0], "0.25");
        assert_eq!(keys[3], "1");
        assert_eq!(keys[4], "1.5");
        assert_eq!(keys[7], "3.5");
        assert_eq!(keys[14], "16");
        assert_eq!(table.presets()[0].title, "0.3125m");
        assert_eq!(table.presets()[4].title, "1.875m");
        assert_eq!(table.presets()[8].to_string(), "5m");
    }

    #[test]
    fn test_closest_buckets() {
        let table = build_catalog();
        assert_eq!(table.closest(0.0).unwrap().size, 0.3125);
        assert_eq!(table.closest(-3.0).unwrap().size, 0.3125);
        assert_eq!(table.closest(1.3).unwrap().size, 1.25);
        assert_eq!(table.closest(1.6).unwrap().size, 1.875);
        assert_eq!(table.closest(1000.0).unwrap().size, 20.0);
    }

    #[test]
    fn test_closest_boundaries_are_half_open() {
        let table = build_catalog();
        for pair in table.presets().windows(2) {
            let boundary = pair[1].min_size;
            assert_eq!(table.closest(boundary).unwrap().index, pair[1].index);
            assert_eq!(table.closest(boundary - 1e-9).unwrap().index, pair[0].index);
        }
    }

    #[test]
    fn test_closest_on_empty_table() {
        let table = PresetTable::from_sizes([]);
        assert!(table.is_empty());
        assert!(table.closest(1.25).is_none());
        assert!(table.presets_in_range(0.0, 10.0, 1.25).is_empty());
    }

    #[test]
    fn test_presets_in_range() {
        let table = PresetTable::from_sizes([(1.25, true), (1.875, true), (2.5, true)]);
        let selection = table.presets_in_range(1.0, 3.0, 1.875);
        assert_eq!(selection.profiles.len(), 3);
        assert_eq!(selection.titles.len(), 3);
        assert_eq!(selection.selected, 1);
    }

    #[test]
    fn test_presets_in_range_without_exact_match() {
        let table = build_catalog();
        let selection = table.presets_in_range(0.625, 2.5, 1.3);
        assert_eq!(selection.titles, vec!["0.625m", "0.9375m", "1.25m", "1.875m", "2.5m"]);
        assert_eq!(selection.selected, 0);
    }

    #[test]
    fn test_presets_in_range_empty() {
        let table = build_catalog();
        assert!(table.presets_in_range(30.0, 40.0, 35.0).is_empty());
        assert!(table.presets_in_range(1.3, 1.4, 1.3).is_empty());
    }

    #[test]
    fn test_preset_for_key() {
        let table = build_catalog();
        assert_eq!(table.preset_for_key("1.5").unwrap().size, 1.875);
        assert_eq!(
            table.preset_for_key("nope"),
            Err(PresetError::NotFound("nope".into()))
        );
    }
}
