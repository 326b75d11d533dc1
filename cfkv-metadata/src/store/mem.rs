use super::{Collection, DocGet, DocWrite, DocumentStore};
use bytes::Bytes;
use cfkv_result::Result;
use rustc_hash::FxHashMap;
use std::sync::RwLock;

#[derive(Default)]
struct CollectionData {
    docs: FxHashMap<String, Bytes>,
    order: Vec<String>,
}

/// In-memory document store for tests and ephemeral databases.
#[derive(Default)]
pub struct MemDocumentStore {
    collections: RwLock<FxHashMap<Collection, CollectionData>>,
}

impl MemDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .expect("MemDocumentStore read lock poisoned")
            .get(&collection)
            .map_or(0, |c| c.docs.len())
    }
}

impl DocumentStore for MemDocumentStore {
    fn batch_get(&self, gets: &[DocGet]) -> Result<Vec<Option<Bytes>>> {
        let map = self
            .collections
            .read()
            .expect("MemDocumentStore read lock poisoned");
        Ok(gets
            .iter()
            .map(|g| {
                map.get(&g.collection)
                    .and_then(|c| c.docs.get(&g.key))
                    .cloned()
            })
            .collect())
    }

    fn batch_write(&self, writes: &[DocWrite]) -> Result<()> {
        let mut map = self
            .collections
            .write()
            .expect("MemDocumentStore write lock poisoned");
        for w in writes {
            match w {
                DocWrite::Upsert {
                    collection,
                    key,
                    doc,
                } => {
                    let c = map.entry(*collection).or_default();
                    if c.docs
                        .insert(key.clone(), Bytes::copy_from_slice(doc))
                        .is_none()
                    {
                        c.order.push(key.clone());
                    }
                }
                DocWrite::Delete { collection, key } => {
                    if let Some(c) = map.get_mut(collection) {
                        if c.docs.remove(key).is_some() {
                            c.order.retain(|k| k != key);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn keys(&self, collection: Collection) -> Result<Vec<String>> {
        let map = self
            .collections
            .read()
            .expect("MemDocumentStore read lock poisoned");
        Ok(map
            .get(&collection)
            .map(|c| c.order.clone())
            .unwrap_or_default())
    }
}
