//! # Error Handling
//!
//! Translation is all-or-nothing: the first error aborts the whole Gateway and
//! is returned as-is. Nothing here is retried; a missing object in a synced
//! snapshot is genuinely missing.

mod types;

pub use types::{Error, Result};
