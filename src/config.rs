//! Client configuration.

use crate::retry;

use aws_sdk_dynamodb::{Client, config};
use std::time;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default number of items returned by a scan.
pub const DEFAULT_SCAN_LIMIT: i32 = 1000;

/// Polling settings used while waiting for a table to change state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WaitConfig {
    /// Pause between two describe-table calls.
    pub poll_interval: time::Duration,
    /// Give up once this much time has passed.
    pub max_wait: time::Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: time::Duration::from_secs(1),
            max_wait: time::Duration::from_secs(120),
        }
    }
}

/// Configuration of a [`DataApi`](crate::client::DataApi).
///
/// ```rust
/// use dynamodb_data_api::config::DataApiConfig;
/// use std::time::Duration;
///
/// let config = DataApiConfig {
///     endpoint_url: Some("http://localhost:8000".to_string()),
///     timeout: Some(Duration::from_secs(5)),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DataApiConfig {
    /// AWS region; [`DEFAULT_REGION`] when unset.
    pub region: Option<String>,
    /// Custom endpoint, e.g. a local DynamoDB.
    pub endpoint_url: Option<String>,
    /// Retry policy for throttled operations.
    pub retry: retry::RetryConfig,
    /// Deadline for each store call, retries included.
    pub timeout: Option<time::Duration>,
    /// Item limit applied to scans that do not set one.
    pub scan_limit: Option<i32>,
    /// Pause between creating a seeded table and inserting its rows.
    pub seed_delay: time::Duration,
    /// Polling used by table creation and deletion.
    pub table_wait: WaitConfig,
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self {
            region: None,
            endpoint_url: None,
            retry: retry::RetryConfig::default(),
            timeout: None,
            scan_limit: Some(DEFAULT_SCAN_LIMIT),
            seed_delay: time::Duration::ZERO,
            table_wait: WaitConfig::default(),
        }
    }
}

impl DataApiConfig {
    /// Region in effect.
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Load AWS settings (credentials from the environment chain) and build a client.
    pub async fn load_client(&self) -> Client {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(config::Region::new(self.region().to_string()));
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;
        Client::new(&sdk_config)
    }
}
