pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use domain::{Transaction, TransactionStatus};
pub use error::TransitionError;
pub use services::TransitionCoordinator;
