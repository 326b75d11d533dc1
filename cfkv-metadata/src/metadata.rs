use crate::documents::Document;
use crate::store::{DocGet, DocWrite, DocumentStore};
use cfkv_result::{Error, Result};
use std::fmt::Display;
use std::sync::Arc;

/// Writes collected for one atomic [`DocumentStore::batch_write`].
#[derive(Debug, Default)]
pub struct WriteBatch {
    writes: Vec<DocWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert<D: Document>(&mut self, doc: &D) -> Result<&mut Self> {
        self.writes.push(DocWrite::Upsert {
            collection: D::COLLECTION,
            key: doc.key(),
            doc: serde_json::to_vec(doc)?,
        });
        Ok(self)
    }

    pub fn delete<D: Document>(&mut self, key: impl Display) -> &mut Self {
        self.writes.push(DocWrite::Delete {
            collection: D::COLLECTION,
            key: key.to_string(),
        });
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Typed access to a [`DocumentStore`].
pub struct MetadataStore<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> Clone for MetadataStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> MetadataStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn get<D: Document>(&self, key: impl Display) -> Result<Option<D>> {
        match self.store.get(D::COLLECTION, &key.to_string())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Like [`get`](Self::get) but a missing document is [`Error::NotFound`].
    pub fn require<D: Document>(&self, key: impl Display) -> Result<D> {
        self.get(key)?.ok_or(Error::NotFound)
    }

    /// One lookup per key, in order, fetched in a single batch.
    pub fn get_many<D, K>(&self, keys: impl IntoIterator<Item = K>) -> Result<Vec<Option<D>>>
    where
        D: Document,
        K: Display,
    {
        let gets: Vec<DocGet> = keys
            .into_iter()
            .map(|k| DocGet {
                collection: D::COLLECTION,
                key: k.to_string(),
            })
            .collect();
        if gets.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .batch_get(&gets)?
            .into_iter()
            .map(|b| match b {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            })
            .collect()
    }

    /// Like [`get_many`](Self::get_many) but every key must exist.
    pub fn require_many<D, K>(&self, keys: impl IntoIterator<Item = K>) -> Result<Vec<D>>
    where
        D: Document,
        K: Display,
    {
        self.get_many(keys)?
            .into_iter()
            .map(|d| d.ok_or(Error::NotFound))
            .collect()
    }

    pub fn contains<D: Document>(&self, key: impl Display) -> Result<bool> {
        Ok(self.store.get(D::COLLECTION, &key.to_string())?.is_some())
    }

    /// Keys of `D`'s collection in first-insertion order.
    pub fn keys<D: Document>(&self) -> Result<Vec<String>> {
        self.store.keys(D::COLLECTION)
    }

    /// Every document of `D`'s collection in first-insertion order.
    pub fn all<D: Document>(&self) -> Result<Vec<D>> {
        let keys = self.keys::<D>()?;
        self.require_many(keys)
    }

    pub fn put<D: Document>(&self, doc: &D) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.upsert(doc)?;
        self.commit(batch)
    }

    /// Applies `batch` atomically. Empty batches are skipped.
    pub fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        tracing::trace!(writes = batch.len(), "metadata batch commit");
        self.store.batch_write(&batch.writes)
    }
}
