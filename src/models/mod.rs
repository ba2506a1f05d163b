//! Data models shared by the engine, the store backends and the front ends.

pub mod document;
pub mod path;
pub mod value;

pub use document::{DocumentRecord, ImportManifest};
pub use path::{is_collection_path, is_document_path};
pub use value::{FieldMap, FieldTransform, FieldValue};
