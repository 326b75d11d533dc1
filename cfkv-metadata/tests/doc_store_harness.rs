//! Shared test harness for DocumentStore implementations.
//!
//! Verifies for any DocumentStore:
//! - CRUD roundtrip per collection, with collections kept apart.
//! - `keys` reports first-insertion order; overwrites keep their position.
//! - A batch mixing upserts and deletes is applied in order.

use cfkv_metadata::{Collection, DocGet, DocWrite, DocumentStore};
use cfkv_result::Result;

fn upsert(collection: Collection, key: &str, doc: &[u8]) -> DocWrite {
    DocWrite::Upsert {
        collection,
        key: key.to_string(),
        doc: doc.to_vec(),
    }
}

pub fn run_crud_roundtrip<S, F>(make: F)
where
    S: DocumentStore,
    F: FnOnce() -> Result<S>,
{
    let store = make().expect("open store");

    store
        .batch_write(&[
            upsert(Collection::Configurations, "1", b"{\"a\":1}"),
            upsert(Collection::Properties, "1", b"{\"p\":1}"),
        ])
        .expect("batch_write");

    let got = store
        .batch_get(&[
            DocGet {
                collection: Collection::Configurations,
                key: "1".into(),
            },
            DocGet {
                collection: Collection::Properties,
                key: "1".into(),
            },
            DocGet {
                collection: Collection::Datasets,
                key: "1".into(),
            },
        ])
        .expect("batch_get");
    assert_eq!(got[0].as_deref(), Some(&b"{\"a\":1}"[..]));
    assert_eq!(got[1].as_deref(), Some(&b"{\"p\":1}"[..]));
    assert!(got[2].is_none());

    store
        .batch_write(&[DocWrite::Delete {
            collection: Collection::Configurations,
            key: "1".into(),
        }])
        .expect("delete");
    assert!(
        store
            .get(Collection::Configurations, "1")
            .expect("get")
            .is_none()
    );
    assert!(store.get(Collection::Properties, "1").expect("get").is_some());
}

pub fn run_key_order<S, F>(make: F)
where
    S: DocumentStore,
    F: FnOnce() -> Result<S>,
{
    let store = make().expect("open store");
    for k in ["30", "10", "20"] {
        store
            .batch_write(&[upsert(Collection::Configurations, k, b"{}")])
            .expect("write");
    }
    store
        .batch_write(&[upsert(Collection::Configurations, "10", b"{\"v\":2}")])
        .expect("overwrite");
    assert_eq!(
        store.keys(Collection::Configurations).expect("keys"),
        vec!["30", "10", "20"]
    );
    assert!(store.keys(Collection::Datasets).expect("keys").is_empty());
}

pub fn run_batch_order<S, F>(make: F)
where
    S: DocumentStore,
    F: FnOnce() -> Result<S>,
{
    let store = make().expect("open store");
    store
        .batch_write(&[
            upsert(Collection::Datasets, "d", b"1"),
            DocWrite::Delete {
                collection: Collection::Datasets,
                key: "d".into(),
            },
            upsert(Collection::Datasets, "d", b"2"),
        ])
        .expect("batch");
    let doc = store.get(Collection::Datasets, "d").expect("get");
    assert_eq!(doc.as_deref(), Some(&b"2"[..]));
    assert_eq!(store.keys(Collection::Datasets).expect("keys"), vec!["d"]);
}
