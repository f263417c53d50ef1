pub mod state_machine;
pub mod transaction;

pub use state_machine::StateMachine;
pub use transaction::{ParseStatusError, Transaction, TransactionStatus};
