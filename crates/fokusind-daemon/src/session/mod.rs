pub mod engine;

pub use engine::{SessionEngine, SessionError};
