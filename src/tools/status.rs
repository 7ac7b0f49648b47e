//! Per-call-id invocation bookkeeping.
//!
//! Each tool-call output id moves through a small linear state machine:
//! `Pending → Invoked → IterationGranted`. The single enum replaces the two
//! easy-to-desynchronize "completed" and "iteration-granted" sets.

use std::collections::HashMap;

/// Status of one tool-call output id across the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallStatus {
    /// Seen in the log, not yet invoked.
    #[default]
    Pending,
    /// `invoke` has started (or finished); never re-invoked.
    Invoked,
    /// Counted toward a `requires_iteration` pass; never counted again.
    IterationGranted,
}

/// Tracks call statuses for one loop invocation.
#[derive(Debug, Default)]
pub struct CallLedger {
    statuses: HashMap<String, CallStatus>,
}

impl CallLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, id: &str) -> CallStatus {
        self.statuses.get(id).copied().unwrap_or_default()
    }

    /// Claim a call for invocation. Returns false when the call was already
    /// invoked (or granted), guaranteeing at-most-once invocation.
    pub fn mark_invoked(&mut self, id: &str) -> bool {
        match self.status(id) {
            CallStatus::Pending => {
                self.statuses.insert(id.to_string(), CallStatus::Invoked);
                true
            }
            _ => false,
        }
    }

    /// Count a call toward an iteration grant. Returns false when the call
    /// already triggered a pass, preventing repeated re-triggering.
    pub fn mark_iteration_granted(&mut self, id: &str) -> bool {
        match self.status(id) {
            CallStatus::IterationGranted => false,
            _ => {
                self.statuses
                    .insert(id.to_string(), CallStatus::IterationGranted);
                true
            }
        }
    }

    pub fn is_iteration_granted(&self, id: &str) -> bool {
        self.status(id) == CallStatus::IterationGranted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_claims_exactly_once() {
        let mut ledger = CallLedger::new();
        assert!(ledger.mark_invoked("c1"));
        assert!(!ledger.mark_invoked("c1"));
        assert_eq!(ledger.status("c1"), CallStatus::Invoked);
    }

    #[test]
    fn grant_is_terminal() {
        let mut ledger = CallLedger::new();
        ledger.mark_invoked("c1");
        assert!(ledger.mark_iteration_granted("c1"));
        assert!(!ledger.mark_iteration_granted("c1"));
        // A granted call can never be invoked again either.
        assert!(!ledger.mark_invoked("c1"));
    }

    #[test]
    fn grant_allowed_without_invocation() {
        // Tools without invoke behavior can still require iteration.
        let mut ledger = CallLedger::new();
        assert!(ledger.mark_iteration_granted("c2"));
        assert!(ledger.is_iteration_granted("c2"));
    }
}
