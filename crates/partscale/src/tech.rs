//! Research gating for discrete scale options.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Reports whether a research item is unlocked.
pub trait TechGate {
    /// True if `tech_id` is unlocked. The empty id is always unlocked.
    fn is_unlocked(&self, tech_id: &str) -> bool;
}

/// Gate for sandbox play: everything is unlocked.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUnlocked;

impl TechGate for AlwaysUnlocked {
    fn is_unlocked(&self, _tech_id: &str) -> bool {
        true
    }
}

/// Game mode of the loaded campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// No research tree.
    #[default]
    Sandbox,
    /// Full career.
    Career,
    /// Science mode without funds.
    ScienceSandbox,
}

impl GameMode {
    /// Modes with a research tree.
    pub fn has_research(&self) -> bool {
        matches!(self, GameMode::Career | GameMode::ScienceSandbox)
    }
}

/// Unlocked research of the current campaign.
#[derive(Debug, Clone, Default)]
pub struct ResearchState {
    mode: GameMode,
    unlocked: HashSet<String>,
}

impl ResearchState {
    /// Research state for `mode` with the given unlocked ids.
    pub fn new(mode: GameMode, unlocked: impl IntoIterator<Item = String>) -> Self {
        let mut state = Self {
            mode,
            unlocked: HashSet::new(),
        };
        state.reload(unlocked);
        state
    }

    /// Replace the unlocked set, e.g. after the research scenario was saved.
    pub fn reload(&mut self, unlocked: impl IntoIterator<Item = String>) {
        self.unlocked = unlocked.into_iter().collect();
    }

    /// Current game mode.
    pub fn mode(&self) -> GameMode {
        self.mode
    }
}

impl TechGate for ResearchState {
    fn is_unlocked(&self, tech_id: &str) -> bool {
        !self.mode.has_research() || tech_id.is_empty() || self.unlocked.contains(tech_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_unlocks_everything() {
        let state = ResearchState::new(GameMode::Sandbox, Vec::new());
        assert!(state.is_unlocked("advRocketry"));
        assert!(AlwaysUnlocked.is_unlocked("anything"));
    }

    #[test]
    fn test_career_uses_unlocked_set() {
        let mut state = ResearchState::new(GameMode::Career, vec!["basicRocketry".to_string()]);
        assert!(state.is_unlocked(""));
        assert!(state.is_unlocked("basicRocketry"));
        assert!(!state.is_unlocked("advRocketry"));

        state.reload(vec!["advRocketry".to_string()]);
        assert!(state.is_unlocked("advRocketry"));
        assert!(!state.is_unlocked("basicRocketry"));
        assert_eq!(state.mode(), GameMode::Career);
    }

    #[test]
    fn test_science_sandbox_has_research() {
        let state = ResearchState::new(GameMode::ScienceSandbox, Vec::new());
        assert!(!state.is_unlocked("basicRocketry"));
    }
}
