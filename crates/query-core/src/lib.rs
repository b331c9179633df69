pub mod error;
pub mod types;

pub use error::{CacheError, Result};
pub use types::*;
