//! Runtime lifecycle tracking.

use serde::{Deserialize, Serialize};

/// Lifecycle states of one runtime generation.
///
/// `Parsed → Installing → Installed → Activating → Activated`, with
/// `Redundant` when installation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Constructed, nothing cached yet.
    Parsed,
    /// Warming the static partition.
    Installing,
    /// Installed and waiting to take over.
    Installed,
    /// Evicting stale partitions.
    Activating,
    /// Controlling requests.
    Activated,
    /// Installation failed; this generation will never activate.
    Redundant,
}

impl LifecycleState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installing, Redundant)
                | (Installed, Activating)
                | (Activating, Activated)
        )
    }

    /// Whether intercepted requests go through the caching strategies.
    pub fn controls_requests(&self) -> bool {
        matches!(self, Self::Activated)
    }

    /// Lowercase state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use LifecycleState::*;
        let path = [Parsed, Installing, Installed, Activating, Activated];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_illegal_transitions() {
        use LifecycleState::*;
        assert!(!Parsed.can_transition_to(Activated));
        assert!(!Redundant.can_transition_to(Installing));
        assert!(!Activated.can_transition_to(Installing));
    }

    #[test]
    fn test_only_activated_controls_requests() {
        assert!(LifecycleState::Activated.controls_requests());
        assert!(!LifecycleState::Installed.controls_requests());
    }
}
