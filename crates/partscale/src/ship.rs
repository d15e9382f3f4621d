//! The construction graph: parts, their attachments, and the rescale
//! observer list.

use partscale_math::Vec3;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Result, ScaleError};
use crate::part::Part;

new_key_type! {
    /// Handle to a part in a [`Ship`].
    pub struct PartId;
}

/// Broadcast after every successful rescale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescaleEvent {
    /// The rescaled part.
    pub part: PartId,
    /// New absolute linear factor.
    pub absolute: f64,
    /// Linear factor relative to the previous scale.
    pub relative: f64,
}

/// Collaborator reacting to part resizes (thrust, capacity, crew scalers).
pub trait RescaleListener {
    /// Called once per completed rescale.
    fn on_rescaled(&mut self, event: &RescaleEvent);
}

/// A vessel under construction.
#[derive(Default)]
pub struct Ship {
    parts: SlotMap<PartId, Part>,
    listeners: Vec<Box<dyn RescaleListener>>,
    modifications: u64,
}

impl std::fmt::Debug for Ship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ship")
            .field("parts", &self.parts)
            .field("listeners", &self.listeners.len())
            .field("modifications", &self.modifications)
            .finish()
    }
}

impl Ship {
    /// Empty ship.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unattached part.
    pub fn add_part(&mut self, part: Part) -> PartId {
        self.parts.insert(part)
    }

    /// Part by id.
    pub fn get(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    /// Mutable part by id.
    pub fn get_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(id)
    }

    /// Part by id, or [`ScaleError::UnknownPart`].
    pub fn part(&self, id: PartId) -> Result<&Part> {
        self.parts.get(id).ok_or(ScaleError::UnknownPart)
    }

    /// Mutable part by id, or [`ScaleError::UnknownPart`].
    pub fn part_mut(&mut self, id: PartId) -> Result<&mut Part> {
        self.parts.get_mut(id).ok_or(ScaleError::UnknownPart)
    }

    /// Iterate over all parts.
    pub fn iter(&self) -> impl Iterator<Item = (PartId, &Part)> {
        self.parts.iter()
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when the ship has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Join `child`'s node `child_node` to `parent`'s node `parent_node`.
    pub fn attach_to_node(
        &mut self,
        child: PartId,
        child_node: &str,
        parent: PartId,
        parent_node: &str,
    ) -> Result<()> {
        let p = self.part(parent)?;
        if p.node(parent_node).is_none() {
            return Err(ScaleError::MissingNode {
                part: p.name().to_string(),
                node: parent_node.to_string(),
            });
        }
        {
            let c = self.part_mut(child)?;
            let name = c.name().to_string();
            let node = c.node_mut(child_node).ok_or_else(|| ScaleError::MissingNode {
                part: name,
                node: child_node.to_string(),
            })?;
            node.attached_part = Some(parent);
            c.parent = Some(parent);
        }
        let p = self.part_mut(parent)?;
        let name = p.name().to_string();
        let node = p.node_mut(parent_node).ok_or_else(|| ScaleError::MissingNode {
            part: name,
            node: parent_node.to_string(),
        })?;
        node.attached_part = Some(child);
        p.children.push(child);
        Ok(())
    }

    /// Surface-attach `child` onto the body of `parent`.
    pub fn attach_to_surface(&mut self, child: PartId, parent: PartId) -> Result<()> {
        self.part(parent)?;
        let c = self.part_mut(child)?;
        let name = c.name().to_string();
        let node = c
            .srf_attach_node
            .as_mut()
            .ok_or_else(|| ScaleError::MissingNode {
                part: name,
                node: "srfAttach".to_string(),
            })?;
        node.attached_part = Some(parent);
        c.parent = Some(parent);
        self.part_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Move `id` and everything attached below it by `delta`, expressed in
    /// the axes of part `frame`.
    ///
    /// The attachment graph is a tree; cycles are not guarded against.
    pub fn translate(&mut self, id: PartId, delta: &Vec3, frame: PartId) -> Result<()> {
        let frame = self.part(frame)?.placement;

        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let part = self.part_mut(next)?;
            part.placement.translate_in(delta, &frame);
            pending.extend(part.children.iter().copied());
        }
        Ok(())
    }

    /// Register an observer for rescale events.
    pub fn subscribe(&mut self, listener: Box<dyn RescaleListener>) {
        self.listeners.push(listener);
    }

    /// Deliver `event` to every observer.
    pub fn notify_rescaled(&mut self, event: &RescaleEvent) {
        for listener in &mut self.listeners {
            listener.on_rescaled(event);
        }
    }

    /// Signal that the construction graph changed.
    pub fn mark_modified(&mut self) {
        self.modifications += 1;
    }

    /// Number of modification signals so far.
    pub fn modification_count(&self) -> u64 {
        self.modifications
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::PartPrefab;
    use approx::assert_relative_eq;
    use partscale_math::{Placement, Quat};
    use std::f64::consts::PI;
    use std::sync::Arc;

    fn stack_part() -> Part {
        Part::from_prefab(Arc::new(
            PartPrefab::new("tank")
                .with_node("top", Vec3::new(0.0, 1.0, 0.0), 1)
                .with_node("bottom", Vec3::new(0.0, -1.0, 0.0), 1)
                .with_srf_node(Vec3::new(0.5, 0.0, 0.0), 0),
        ))
    }

    #[test]
    fn test_attach_to_node_links_both_sides() {
        let mut ship = Ship::new();
        let a = ship.add_part(stack_part());
        let b = ship.add_part(stack_part());
        ship.attach_to_node(b, "top", a, "bottom").unwrap();

        assert_eq!(ship.part(b).unwrap().parent, Some(a));
        assert_eq!(ship.part(a).unwrap().children, vec![b]);
        assert_eq!(ship.part(a).unwrap().node("bottom").unwrap().attached_part, Some(b));
        assert_eq!(ship.part(b).unwrap().node("top").unwrap().attached_part, Some(a));
    }

    #[test]
    fn test_attach_missing_node() {
        let mut ship = Ship::new();
        let a = ship.add_part(stack_part());
        let b = ship.add_part(stack_part());
        let err = ship.attach_to_node(b, "side", a, "bottom").unwrap_err();
        assert!(matches!(err, ScaleError::MissingNode { .. }));
    }

    #[test]
    fn test_translate_moves_subtree() {
        let mut ship = Ship::new();
        let a = ship.add_part(stack_part());
        let b = ship.add_part(stack_part().placed(Placement::at(Vec3::new(0.0, -2.0, 0.0))));
        let c = ship.add_part(stack_part().placed(Placement::at(Vec3::new(0.0, -4.0, 0.0))));
        ship.attach_to_node(b, "top", a, "bottom").unwrap();
        ship.attach_to_surface(c, b).unwrap();

        ship.translate(b, &Vec3::new(0.0, -1.0, 0.0), a).unwrap();
        assert_relative_eq!(ship.part(a).unwrap().placement.position, Vec3::zeros());
        assert_relative_eq!(ship.part(b).unwrap().placement.position, Vec3::new(0.0, -3.0, 0.0));
        assert_relative_eq!(ship.part(c).unwrap().placement.position, Vec3::new(0.0, -5.0, 0.0));
    }

    #[test]
    fn test_translate_uses_frame_axes() {
        let mut ship = Ship::new();
        let frame = ship.add_part(stack_part().placed(
            Placement::identity().with_rotation(Quat::from_axis_angle(&Vec3::x_axis(), PI)),
        ));
        let p = ship.add_part(stack_part());
        ship.translate(p, &Vec3::new(0.0, 1.0, 0.0), frame).unwrap();
        assert_relative_eq!(
            ship.part(p).unwrap().placement.position,
            Vec3::new(0.0, -1.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_listeners_and_modifications() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Recorder(Rc<RefCell<Vec<RescaleEvent>>>);
        impl RescaleListener for Recorder {
            fn on_rescaled(&mut self, event: &RescaleEvent) {
                self.0.borrow_mut().push(*event);
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut ship = Ship::new();
        let a = ship.add_part(stack_part());
        ship.subscribe(Box::new(Recorder(Rc::clone(&seen))));
        ship.notify_rescaled(&RescaleEvent {
            part: a,
            absolute: 2.0,
            relative: 2.0,
        });
        ship.mark_modified();

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].absolute, 2.0);
        assert_eq!(ship.modification_count(), 1);
    }
}
