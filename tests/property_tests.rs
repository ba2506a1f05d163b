//! Property-based tests.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Resolving a tree without sentinels changes nothing
//! - Import commits exactly `ceil(N / batch_size)` batches
//! - Document and collection paths alternate by segment parity

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use firebulk::models::path::{is_collection_path, is_document_path, join};
use firebulk::{
    DocumentRecord, ImportManifest, ImportOptions, ImportService, MemoryStore, SentinelResolver,
};
use proptest::prelude::*;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Arbitrary JSON without sentinel markers: no object ever has a `kind` key.
fn plain_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-h]{1,6}", inner, 0..6)
                .prop_map(|fields| Value::Object(fields.into_iter().collect())),
        ]
    })
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}"
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// Property: a sentinel-free tree resolves to itself.
    #[test]
    fn prop_resolver_identity_without_sentinels(value in plain_json()) {
        let resolved = SentinelResolver::new().resolve(&value).unwrap();
        prop_assert!(resolved.is_plain());
        prop_assert_eq!(resolved.to_plain(), Some(value));
    }

    /// Property: N valid documents with batch size b take ceil(N / b) commits.
    #[test]
    fn prop_import_commit_count(count in 0usize..60, batch_size in 1usize..=20) {
        let documents: Vec<DocumentRecord> = (0..count)
            .map(|i| DocumentRecord::new(format!("d{i}"), format!("items/d{i}"), Map::new()))
            .collect();
        let manifest = ImportManifest::new(documents);
        let store = Arc::new(MemoryStore::new());
        let service = ImportService::new(store.clone());
        let options = ImportOptions::new("unused").with_batch_size(batch_size);

        let result = runtime()
            .block_on(service.import_manifest(&manifest, &options, None))
            .unwrap();

        prop_assert_eq!(result.imported_count, count);
        prop_assert_eq!(store.commit_count(), count.div_ceil(batch_size));
        prop_assert_eq!(store.len(), count);
    }

    /// Property: each extra segment flips between collection and document.
    #[test]
    fn prop_path_parity(segments in prop::collection::vec(segment(), 1..10)) {
        let mut path = String::new();
        for (i, segment) in segments.iter().enumerate() {
            path = join(&path, segment);
            let depth = i + 1;
            prop_assert_eq!(is_document_path(&path), depth % 2 == 0);
            prop_assert_eq!(is_collection_path(&path), depth % 2 == 1);
        }
    }
}
