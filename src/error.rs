//! Error type for the GPIO/driver seam: a description, a captured
//! backtrace for postmortem logging, and a small set of flags describing
//! what state the caller should treat as unknown. A `PumpFailure` returned
//! from a tick is logged and swallowed by the orchestrator rather than
//! unwinding it — the control loop must keep running in degraded modes.

use backtrace::Backtrace;
use std::fmt;

#[derive(Debug)]
pub struct PumpFailure {
    description: String,
    trace: Backtrace,
    actions: CorrectiveActions,
}

impl PumpFailure {
    pub fn new(description: impl Into<String>, actions: CorrectiveActions) -> Self {
        PumpFailure {
            description: description.into(),
            trace: Backtrace::new(),
            actions,
        }
    }

    pub fn corrective_actions(&self) -> &CorrectiveActions {
        &self.actions
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.trace
    }
}

impl fmt::Display for PumpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

impl std::error::Error for PumpFailure {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CorrectiveActions {
    pump_relay_state_unknown: bool,
}

impl CorrectiveActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown_pump_relay() -> Self {
        CorrectiveActions::new().with_unknown_pump_relay_state()
    }

    pub fn with_unknown_pump_relay_state(mut self) -> Self {
        self.pump_relay_state_unknown = true;
        self
    }

    pub fn is_pump_relay_in_unknown_state(&self) -> bool {
        self.pump_relay_state_unknown
    }
}

/// Builds a `PumpFailure` with an optional `CorrectiveActions`, defaulting
/// to none taken.
#[macro_export]
macro_rules! pump_fail {
    ($msg:expr) => {
        $crate::error::PumpFailure::new($msg, $crate::error::CorrectiveActions::new())
    };
    ($msg:expr, $actions:expr) => {
        $crate::error::PumpFailure::new($msg, $actions)
    };
}
