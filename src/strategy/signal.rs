//! Position state machine driven by the normalized spread.
//!
//! | from  | condition   | to    |
//! |-------|-------------|-------|
//! | Flat  | z < -θ      | Long  |
//! | Flat  | z > θ       | Short |
//! | Long  | exit rule   | Flat  |
//! | Short | exit rule   | Flat  |
//!
//! With the default [`ExitRule::Band`] a Long position closes as soon as the
//! spread is back above `-θ` and a Short one as soon as it is back below `θ`.

use serde::{Deserialize, Serialize};

pub use crate::types::PositionState;

/// When an open position is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitRule {
    /// Long exits once `z > -θ`, Short once `z < θ`
    #[default]
    Band,
    /// Long exits once `z > 0`, Short once `z < 0`
    ZeroCross,
}

impl std::str::FromStr for ExitRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "band" => Ok(ExitRule::Band),
            "zero-cross" | "zero_cross" => Ok(ExitRule::ZeroCross),
            _ => Err(format!("Unknown exit rule '{}'. Use band or zero-cross", s)),
        }
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PositionState,
    pub to: PositionState,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Next state for `(state, z, θ)`.
///
/// Rules are checked in priority order and at most one fires.
pub fn next_state(state: PositionState, z: f64, threshold: f64, exit_rule: ExitRule) -> PositionState {
    let (long_exit, short_exit) = match exit_rule {
        ExitRule::Band => (-threshold, threshold),
        ExitRule::ZeroCross => (0.0, 0.0),
    };
    match state {
        PositionState::Flat if z < -threshold => PositionState::Long,
        PositionState::Flat if z > threshold => PositionState::Short,
        PositionState::Long if z > long_exit => PositionState::Flat,
        PositionState::Short if z < short_exit => PositionState::Flat,
        unchanged => unchanged,
    }
}

/// Holds the current position and applies [`next_state`] once per period.
#[derive(Debug, Clone, Default)]
pub struct SignalStateMachine {
    state: PositionState,
    exit_rule: ExitRule,
}

impl SignalStateMachine {
    pub fn new(exit_rule: ExitRule) -> Self {
        Self {
            state: PositionState::Flat,
            exit_rule,
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn exit_rule(&self) -> ExitRule {
        self.exit_rule
    }

    pub fn evaluate(&mut self, z: f64, threshold: f64) -> Transition {
        let from = self.state;
        self.state = next_state(from, z, threshold, self.exit_rule);
        Transition {
            from,
            to: self.state,
        }
    }

    /// Drop to Flat regardless of the current state
    pub fn force_flat(&mut self) -> Transition {
        let from = self.state;
        self.state = PositionState::Flat;
        Transition {
            from,
            to: PositionState::Flat,
        }
    }
}
