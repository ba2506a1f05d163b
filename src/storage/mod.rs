//! Document store abstraction and backends.
//!
//! The bulk engine only talks to [`DocumentStore`]. Two backends ship with
//! the crate:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`FilesystemStore`] | Default CLI/server backend, one JSON file per document |
//! | [`MemoryStore`] | Tests and embedding; supports commit fault injection |

pub mod batch;
pub mod error;
pub mod filesystem;
pub mod memory;
pub mod traits;
pub mod transforms;

pub use batch::{WriteBatch, WriteOperation};
pub use error::StoreError;
pub use filesystem::FilesystemStore;
pub use memory::MemoryStore;
pub use traits::{DocumentRef, DocumentSnapshot, DocumentStore};
