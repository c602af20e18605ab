//! Common Types Module
//!
//! Shared types used across the codebase to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// Direction of the pair position.
///
/// `Long` holds the spread (long the first asset, short the hedge leg),
/// `Short` holds its negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionState {
    /// Sign applied to the trading weights: +1, -1 or 0
    pub fn direction(&self) -> f64 {
        match self {
            PositionState::Flat => 0.0,
            PositionState::Long => 1.0,
            PositionState::Short => -1.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionState::Flat => write!(f, "Flat"),
            PositionState::Long => write!(f, "Long"),
            PositionState::Short => write!(f, "Short"),
        }
    }
}

/// Desired fraction of capital held in one asset.
///
/// Positive weights are long, negative weights short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetWeight {
    pub asset: String,
    pub weight: f64,
}

impl TargetWeight {
    pub fn new(asset: impl Into<String>, weight: f64) -> Self {
        Self {
            asset: asset.into(),
            weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_signs() {
        assert_eq!(PositionState::Flat.direction(), 0.0);
        assert_eq!(PositionState::Long.direction(), 1.0);
        assert_eq!(PositionState::Short.direction(), -1.0);
        assert_eq!(PositionState::default(), PositionState::Flat);
    }

    #[test]
    fn test_display() {
        assert_eq!(PositionState::Short.to_string(), "Short");
    }
}
