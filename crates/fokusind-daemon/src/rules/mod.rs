pub mod coordinator;

pub use coordinator::{CoordinatorError, CoordinatorSnapshot, RuleCoordinator};
