use crate::paths::STANDARD_CONFIGURATION_FIELDS;
use cfkv_array_store::ArrayStoreConfig;
use cfkv_hash::ContentIdentity;

/// Run-time configuration of a [`Database`](crate::Database).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub array_store: ArrayStoreConfig,
    /// Field paths stacked by `concatenate_configurations`.
    pub standard_configuration_fields: Vec<String>,
    /// ID derivation. Must not change for a store that already holds data.
    pub identity: ContentIdentity,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            array_store: ArrayStoreConfig::default(),
            standard_configuration_fields: STANDARD_CONFIGURATION_FIELDS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            identity: ContentIdentity::default(),
        }
    }
}

impl DatabaseConfig {
    pub fn with_array_store(mut self, cfg: ArrayStoreConfig) -> Self {
        self.array_store = cfg;
        self
    }

    pub fn with_standard_configuration_fields<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.standard_configuration_fields = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_identity(mut self, identity: ContentIdentity) -> Self {
        self.identity = identity;
        self
    }
}
