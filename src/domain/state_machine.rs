//! Allowed status graph.
//!
//! `Pending` may move to any of the three terminal states; nothing else has
//! outgoing edges. Validation never touches storage.

use crate::domain::TransactionStatus;
use crate::error::TransitionError;

use crate::domain::TransactionStatus::*;

const EDGES: &[(TransactionStatus, TransactionStatus)] = &[
    (Pending, Completed),
    (Pending, Failed),
    (Pending, Cancelled),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct StateMachine;

impl StateMachine {
    pub fn is_allowed(from: TransactionStatus, to: TransactionStatus) -> bool {
        EDGES.iter().any(|&(f, t)| f == from && t == to)
    }

    pub fn validate(from: TransactionStatus, to: TransactionStatus) -> Result<(), TransitionError> {
        if Self::is_allowed(from, to) {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    pub fn successors(from: TransactionStatus) -> Vec<TransactionStatus> {
        EDGES
            .iter()
            .filter(|(f, _)| *f == from)
            .map(|&(_, t)| t)
            .collect()
    }

    pub fn is_terminal(status: TransactionStatus) -> bool {
        Self::successors(status).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_reaches_every_terminal_state() {
        assert_eq!(
            StateMachine::successors(Pending),
            vec![Completed, Failed, Cancelled]
        );
        for to in [Completed, Failed, Cancelled] {
            assert!(StateMachine::validate(Pending, to).is_ok());
        }
    }

    #[test]
    fn test_terminal_states_have_no_edges() {
        for status in [Completed, Failed, Cancelled] {
            assert!(StateMachine::is_terminal(status));
            for to in TransactionStatus::ALL {
                assert!(matches!(
                    StateMachine::validate(status, to),
                    Err(TransitionError::InvalidTransition { .. })
                ));
            }
        }
        assert!(!StateMachine::is_terminal(Pending));
    }

    #[test]
    fn test_self_loop_is_invalid() {
        let err = StateMachine::validate(Pending, Pending).unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InvalidTransition { from: Pending, to: Pending }
        ));
    }
}
