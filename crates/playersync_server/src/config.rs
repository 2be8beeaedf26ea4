//! Server configuration.

/// Configuration for the reference backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// API key every request must carry, if set.
    pub api_key: Option<String>,
    /// Whether loads include `PartitionKey`, `RowKey` and `Timestamp`.
    pub stamp_metadata: bool,
    /// Partition name reported in `PartitionKey`.
    pub partition: String,
    /// Maximum number of application keys in one record.
    pub max_properties: usize,
}

impl ServerConfig {
    /// Creates a configuration with no API key and metadata stamping on.
    pub fn new() -> Self {
        Self {
            api_key: None,
            stamp_metadata: true,
            partition: "players".to_string(),
            max_properties: 252,
        }
    }

    /// Requires `api_key` on every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Enables or disables metadata stamping.
    pub fn with_stamp_metadata(mut self, stamp: bool) -> Self {
        self.stamp_metadata = stamp;
        self
    }

    /// Sets the maximum number of application keys per record.
    pub fn with_max_properties(mut self, max: usize) -> Self {
        self.max_properties = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
