//! Route handlers for the REST API
//!
//! - [`drafts`]: running drafts by folder path or request token, and issuing tokens
//! - [`system`]: health

mod drafts;
mod system;

pub use drafts::*;
pub use system::*;
