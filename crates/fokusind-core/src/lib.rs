pub mod error;
pub mod hostname;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
