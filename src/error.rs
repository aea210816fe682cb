//! Error types returned by the data API and by table store adapters.

use crate::store;

use aws_sdk_dynamodb::error::{self as sdk_error, ProvideErrorMetadata};
use std::{error, fmt, time};

/// Boxed error used as the source of a [`StoreError`].
pub type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// Result alias defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Service error codes that signal throttling and are safe to retry.
const RETRYABLE_CODES: [&str; 3] = [
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
];

const RESOURCE_NOT_FOUND_CODE: &str = "ResourceNotFoundException";

/// Failure of a single table store operation.
///
/// Wraps whatever the adapter reported (throughput exceeded, missing table,
/// permission denied, transport failure) together with the operation name and,
/// when the store answered, the service error code.
#[derive(Debug, thiserror::Error)]
#[error("`{operation}` failed: {source}")]
pub struct StoreError {
    operation: &'static str,
    code: Option<String>,
    source: BoxError,
}

impl StoreError {
    /// Create a store error from any error value.
    ///
    /// Adapters other than the SDK client use this to report failures; `code`
    /// drives retry classification.
    pub fn new(operation: &'static str, code: Option<String>, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            code,
            source: source.into(),
        }
    }

    /// Create a store error from an SDK error, keeping the service error code.
    pub fn from_sdk<E, R>(operation: &'static str, err: sdk_error::SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + error::Error + Send + Sync + 'static,
        R: fmt::Debug + Send + Sync + 'static,
    {
        let code = err
            .as_service_error()
            .and_then(|service_error| service_error.code())
            .map(str::to_owned);
        Self::new(operation, code, err)
    }

    /// Name of the failed operation.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Service error code, if the store returned one.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Whether the failure is a throttling error worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.code()
            .is_some_and(|code| RETRYABLE_CODES.iter().any(|retryable| *retryable == code))
    }

    /// Whether the failure reports a missing table.
    pub fn is_resource_not_found(&self) -> bool {
        self.code() == Some(RESOURCE_NOT_FOUND_CODE)
    }
}

/// Errors returned by the data API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Describing the table to learn its key schema failed.
    #[error("schema lookup for table `{table_name}` failed: {source}")]
    SchemaLookup {
        /// Table whose schema was requested.
        table_name: String,
        /// Underlying describe-table failure.
        #[source]
        source: StoreError,
    },
    /// The table description has no HASH key.
    #[error("table `{table_name}` has no HASH key in its key schema")]
    MissingHashKey {
        /// Table whose description is incomplete.
        table_name: String,
    },
    /// A filter value could not be converted into an attribute value.
    #[error("failed to build key condition: {0}")]
    ConditionBuild(#[source] serde_dynamo::Error),
    /// A query filter matched none of the table or index keys.
    #[error("filter for table `{table_name}` does not reference any key attribute")]
    MissingKeyCondition {
        /// Queried table.
        table_name: String,
    },
    /// A primary key does not fit the table's key schema.
    #[error("key for table `{table_name}` does not match its schema: {reason}")]
    KeyMismatch {
        /// Table the key was built for.
        table_name: String,
        /// What is wrong with the key.
        reason: &'static str,
    },
    /// A projection string had an empty name or overlapping paths.
    #[error("invalid selection `{0}`: expected a comma separated list of attribute paths")]
    InvalidSelection(String),
    /// An item could not be converted to or from attribute values.
    #[error(transparent)]
    Serialization(#[from] serde_dynamo::Error),
    /// A request could not be assembled.
    #[error(transparent)]
    Build(#[from] sdk_error::BuildError),
    /// The table store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A single-item read returned nothing.
    #[error("no item found in table `{table_name}`")]
    NotFound {
        /// Table that was read.
        table_name: String,
    },
    /// Some batch write requests were still unprocessed after every retry.
    #[error("{count} write requests for table `{table_name}` remained unprocessed")]
    UnprocessedItems {
        /// Written table.
        table_name: String,
        /// Number of requests left over.
        count: usize,
    },
    /// An operation did not finish before its deadline.
    #[error("`{operation}` did not complete within {limit:?}")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Configured deadline.
        limit: time::Duration,
    },
    /// A table did not reach the awaited state in time.
    #[error("table `{table_name}` did not become {state} within {waited:?}")]
    WaitTimeout {
        /// Awaited table.
        table_name: String,
        /// Awaited state.
        state: store::TableState,
        /// Time spent polling.
        waited: time::Duration,
    },
}

impl Error {
    /// Whether this error reports a missing item.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
