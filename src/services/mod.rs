pub mod transition_coordinator;

pub use transition_coordinator::TransitionCoordinator;
