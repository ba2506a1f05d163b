//! Business logic services.
//!
//! - [`sentinel`]: converts sentinel markers into field transforms
//! - [`delete`]: recursive deletion of collection trees
//! - [`document`]: single-document get/set/list

pub mod delete;
pub mod document;
pub mod sentinel;

pub use delete::{DeleteError, DeleteOptions, DeleteResult, DeleteService};
pub use document::DocumentService;
pub use sentinel::{ResolveError, SentinelResolver};
