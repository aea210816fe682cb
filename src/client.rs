//! The caller-facing data API.
//!
//! [`DataApi`] ties the pieces together: it resolves table schemas through its
//! own [`SchemaCache`](schema::SchemaCache), compiles filters into key
//! conditions, builds the request types of [`read`], [`write`] and [`table`],
//! runs them against a [`TableStore`](store::TableStore) under the configured
//! retry policy and deadline, and shapes the responses with [`result`].

use crate::{common, config, error, filter, read, result, retry, schema, store, table, write};

use aws_sdk_dynamodb::{Client, types};
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::to_item;
use std::{future, sync, time};
use store::TableStore;

/// Order of query results along the range key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOrder {
    /// Smallest range key first.
    Ascending,
    /// Largest range key first.
    Descending,
}

impl SortOrder {
    fn scan_index_forward(self) -> bool {
        self == Self::Ascending
    }
}

/// Optional settings of [`DataApi::query`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryOptions {
    /// Maximum number of items to return.
    pub limit: Option<i32>,
    /// Result order; the store default (ascending) when unset.
    pub sort: Option<SortOrder>,
    /// Comma separated attributes to return, e.g. `"name,team"`.
    pub selection: Option<String>,
}

/// Optional settings of [`DataApi::scan`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScanOptions {
    /// Maximum number of items to return; the configured scan limit when unset.
    pub limit: Option<i32>,
    /// Comma separated attributes to return.
    pub selection: Option<String>,
}

fn parse_selection(
    selection: Option<&str>,
) -> error::Result<Option<common::selection::SelectionMap>> {
    selection.map(str::parse).transpose()
}

fn write_args(
    table_name: &str,
    return_values: Option<types::ReturnValue>,
) -> write::common::WriteArgs {
    write::common::WriteArgs {
        return_values,
        table_name: table_name.to_string(),
    }
}

/// Async DynamoDB data API.
///
/// Cloning is cheap: clones share the store and the schema cache.
///
/// ```rust,no_run
/// use dynamodb_data_api::{DataApi, Filter, QueryOptions, config::DataApiConfig};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize, Serialize)]
/// struct Event {
///     name: String,
///     date: String,
/// }
///
/// # async fn example() -> dynamodb_data_api::Result<()> {
/// let api = DataApi::connect(DataApiConfig::default()).await;
/// api.insert("events", &Event { name: "launch".to_string(), date: "1000".to_string() })
///     .await?;
/// let events: Vec<Event> = api
///     .query("events", Filter::new().equals("name", "launch"), QueryOptions::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DataApi<S = Client> {
    store: sync::Arc<S>,
    schemas: sync::Arc<schema::SchemaCache>,
    config: config::DataApiConfig,
}

impl<S> Clone for DataApi<S> {
    fn clone(&self) -> Self {
        Self {
            store: sync::Arc::clone(&self.store),
            schemas: sync::Arc::clone(&self.schemas),
            config: self.config.clone(),
        }
    }
}

impl DataApi<Client> {
    /// Build an SDK client from `config` and wrap it.
    pub async fn connect(config: config::DataApiConfig) -> Self {
        let client = config.load_client().await;
        Self::with_config(client, config)
    }
}

impl<S: TableStore> DataApi<S> {
    /// Wrap `store` with the default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, config::DataApiConfig::default())
    }

    /// Wrap `store` with `config`.
    pub fn with_config(store: S, config: config::DataApiConfig) -> Self {
        Self {
            store: sync::Arc::new(store),
            schemas: sync::Arc::new(schema::SchemaCache::new()),
            config,
        }
    }

    /// The underlying table store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Configuration in effect.
    pub fn config(&self) -> &config::DataApiConfig {
        &self.config
    }

    /// Schemas resolved so far.
    pub fn schemas(&self) -> &schema::SchemaCache {
        &self.schemas
    }

    /// A handle sharing this one's store and cache but retrying with `retry`.
    pub fn with_retry(&self, retry: retry::RetryConfig) -> Self {
        let mut api = self.clone();
        api.config.retry = retry;
        api
    }

    /// A handle sharing this one's store and cache but giving up on each
    /// store call after `timeout`.
    pub fn with_timeout(&self, timeout: time::Duration) -> Self {
        let mut api = self.clone();
        api.config.timeout = Some(timeout);
        api
    }

    async fn call<O, F, Fut>(&self, operation: &'static str, attempt: F) -> error::Result<O>
    where
        F: FnMut() -> Fut,
        Fut: future::Future<Output = Result<O, error::StoreError>>,
    {
        let retried = retry::retry(&self.config.retry, operation, attempt);
        let output = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, retried)
                .await
                .map_err(|_| error::Error::Timeout { operation, limit })?,
            None => retried.await,
        };
        Ok(output?)
    }

    /// Store `item`, replacing any item with the same key.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn put<T: Serialize>(&self, table_name: &str, item: &T) -> error::Result<()> {
        let input: write::put_item::PutItemInput = write::put_item::PutItem {
            item,
            write_args: write_args(table_name, None),
        }
        .try_into()?;
        let store = self.store.as_ref();
        self.call("put_item", move || store.put_item(input.clone()))
            .await?;
        Ok(())
    }

    /// Same as [`put`](Self::put).
    pub async fn insert<T: Serialize>(&self, table_name: &str, item: &T) -> error::Result<()> {
        self.put(table_name, item).await
    }

    /// Store every item of `items` with batch writes.
    ///
    /// Items are sent in batches of
    /// [`BATCH_WRITE_SIZE`](write::batch_write_item::BATCH_WRITE_SIZE). When
    /// several items share a primary key only the last one is written, as if
    /// each had been put on its own.
    /// Requests the store leaves unprocessed are resent with the retry
    /// backoff; [`Error::UnprocessedItems`](error::Error::UnprocessedItems) is
    /// returned once retries run out.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name, items = items.len()), err)
    )]
    pub async fn insert_many<T: Serialize>(
        &self,
        table_name: &str,
        items: &[T],
    ) -> error::Result<()> {
        let batch = write::batch_write_item::BatchWriteItem {
            table_name: table_name.to_string(),
            requests: items
                .iter()
                .map(write::batch_write_item::BatchWriteItemRequest::PutItem)
                .collect(),
        };
        let schema = self.schemas.resolve(self.store.as_ref(), table_name).await?;
        for chunk in batch.into_unique_chunks(&schema)? {
            self.write_batch(chunk).await?;
        }
        Ok(())
    }

    async fn write_batch(
        &self,
        mut input: write::batch_write_item::BatchWriteItemInput,
    ) -> error::Result<()> {
        let store = self.store.as_ref();
        let mut retries = 0;
        loop {
            let pending = input.clone();
            let unprocessed = self
                .call("batch_write", move || store.batch_write(pending.clone()))
                .await?;
            if unprocessed.is_empty() {
                return Ok(());
            }
            if retries >= self.config.retry.max_retries {
                return Err(error::Error::UnprocessedItems {
                    table_name: input.table_name,
                    count: unprocessed.len(),
                });
            }
            let delay = self.config.retry.delay(retries);
            #[cfg(feature = "tracing")]
            tracing::warn!(
                unprocessed = unprocessed.len(),
                retry = retries + 1,
                delay_ms = delay.as_millis() as u64,
                "resending unprocessed write requests"
            );
            tokio::time::sleep(delay).await;
            retries += 1;
            input.requests = unprocessed;
        }
    }

    /// Apply `actions` to the item at `keys` and return the updated item.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn update<K, V, U>(
        &self,
        table_name: &str,
        keys: common::key::Keys<K>,
        actions: Vec<(String, write::update_item::UpdateAction<V>)>,
    ) -> error::Result<U>
    where
        K: Serialize,
        V: Serialize,
        U: DeserializeOwned,
    {
        let input: write::update_item::UpdateItemInput = write::update_item::UpdateItem {
            keys,
            actions,
            write_args: write_args(table_name, Some(types::ReturnValue::AllNew)),
        }
        .try_into()?;
        self.send_update(table_name, input).await
    }

    /// Set every non-key attribute of `item` on the item at `keys` and return
    /// the updated item.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn patch<K, T, U>(
        &self,
        table_name: &str,
        keys: common::key::Keys<K>,
        item: &T,
    ) -> error::Result<U>
    where
        K: Serialize,
        T: Serialize,
        U: DeserializeOwned,
    {
        let key = common::Item::try_from(keys)?;
        let item: common::Item = to_item(item)?;
        let input = write::update_item::UpdateItemInput::set_all(
            key,
            item,
            write_args(table_name, Some(types::ReturnValue::AllNew)),
        );
        self.send_update(table_name, input).await
    }

    async fn send_update<U: DeserializeOwned>(
        &self,
        table_name: &str,
        input: write::update_item::UpdateItemInput,
    ) -> error::Result<U> {
        let store = self.store.as_ref();
        let item = self
            .call("update_item", move || store.update_item(input.clone()))
            .await?;
        result::single(table_name, item.into_iter().collect())
    }

    /// Delete the item at `keys`. Deleting a missing item is not an error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn delete<K: Serialize>(
        &self,
        table_name: &str,
        keys: common::key::Keys<K>,
    ) -> error::Result<()> {
        let input: write::delete_item::DeleteItemInput = write::delete_item::DeleteItem {
            keys,
            write_args: write_args(table_name, None),
        }
        .try_into()?;
        let store = self.store.as_ref();
        self.call("delete_item", move || store.delete_item(input.clone()))
            .await?;
        Ok(())
    }

    /// The item at `keys`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn get<K, U>(&self, table_name: &str, keys: common::key::Keys<K>) -> error::Result<U>
    where
        K: Serialize,
        U: DeserializeOwned,
    {
        let input: read::get_item::GetItemInput = read::get_item::GetItem {
            keys,
            single_read_args: read::common::SingleReadArgs {
                table_name: table_name.to_string(),
                ..Default::default()
            },
        }
        .try_into()?;
        let store = self.store.as_ref();
        let item = self
            .call("get_item", move || store.get_item(input.clone()))
            .await?;
        result::single(table_name, item.into_iter().collect())
    }

    async fn run_query<T: Serialize>(
        &self,
        table_name: &str,
        filter: filter::Filter<T>,
        options: QueryOptions,
    ) -> error::Result<read::common::ReadOutput> {
        let schema = self.schemas.resolve(self.store.as_ref(), table_name).await?;
        let condition = filter::compile(&schema, filter)?;
        if condition.is_empty() {
            return Err(error::Error::MissingKeyCondition {
                table_name: table_name.to_string(),
            });
        }
        let input: read::query::QueryInput = read::query::Query {
            condition,
            multiple_read_args: read::common::MultipleReadArgs {
                limit: options.limit,
                selection: parse_selection(options.selection.as_deref())?,
                table_name: table_name.to_string(),
                ..Default::default()
            },
            scan_index_forward: options.sort.map(SortOrder::scan_index_forward),
        }
        .into();
        let store = self.store.as_ref();
        self.call("query", move || store.query(input.clone())).await
    }

    /// Items matching `filter`, using the index the filter selects.
    ///
    /// Fails with [`Error::MissingKeyCondition`](error::Error::MissingKeyCondition)
    /// when no filter entry names a key attribute.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn query<T, U>(
        &self,
        table_name: &str,
        filter: filter::Filter<T>,
        options: QueryOptions,
    ) -> error::Result<Vec<U>>
    where
        T: Serialize,
        U: DeserializeOwned,
    {
        let output = self.run_query(table_name, filter, options).await?;
        result::list(output.items)
    }

    /// First item matching `filter`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn find<T, U>(
        &self,
        table_name: &str,
        filter: filter::Filter<T>,
        selection: Option<&str>,
    ) -> error::Result<U>
    where
        T: Serialize,
        U: DeserializeOwned,
    {
        let options = QueryOptions {
            limit: Some(1),
            selection: selection.map(str::to_owned),
            ..Default::default()
        };
        let output = self.run_query(table_name, filter, options).await?;
        result::single(table_name, output.items)
    }

    /// Items of the whole table, up to the limit.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn scan<U: DeserializeOwned>(
        &self,
        table_name: &str,
        options: ScanOptions,
    ) -> error::Result<Vec<U>> {
        let input: read::scan::ScanInput = read::scan::Scan {
            multiple_read_args: read::common::MultipleReadArgs {
                limit: options.limit.or(self.config.scan_limit),
                selection: parse_selection(options.selection.as_deref())?,
                table_name: table_name.to_string(),
                ..Default::default()
            },
        }
        .into();
        let store = self.store.as_ref();
        let output = self.call("scan", move || store.scan(input.clone())).await?;
        result::list(output.items)
    }

    /// Number of items in the table.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn get_row_count(&self, table_name: &str) -> error::Result<usize> {
        let input: read::scan::ScanInput = read::scan::Scan {
            multiple_read_args: read::common::MultipleReadArgs {
                select: Some(types::Select::Count),
                table_name: table_name.to_string(),
                ..Default::default()
            },
        }
        .into();
        let store = self.store.as_ref();
        let output = self.call("scan", move || store.scan(input.clone())).await?;
        Ok(output.count)
    }

    /// Names of all tables.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err))]
    pub async fn list_tables(&self) -> error::Result<Vec<String>> {
        let store = self.store.as_ref();
        self.call("list_tables", move || store.list_tables()).await
    }

    /// Current description of a table.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn describe_table(&self, table_name: &str) -> error::Result<types::TableDescription> {
        let store = self.store.as_ref();
        self.call("describe_table", move || store.describe_table(table_name))
            .await
    }

    /// Create a table and wait until it is active.
    ///
    /// Returns the description sent back by the create call.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %create_table.table_name), err)
    )]
    pub async fn create_table(
        &self,
        create_table: table::create_table::CreateTable,
    ) -> error::Result<types::TableDescription> {
        let table_name = create_table.table_name.clone();
        let input = table::create_table::CreateTableInput::try_from(create_table)?;
        let store = self.store.as_ref();
        let description = self
            .call("create_table", move || store.create_table(input.clone()))
            .await?;
        self.schemas.invalidate(&table_name);
        self.store
            .wait_for_table_state(&table_name, store::TableState::Active, &self.config.table_wait)
            .await?;
        Ok(description)
    }

    /// Delete a table and wait until it is gone.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn delete_table(&self, table_name: &str) -> error::Result<()> {
        let store = self.store.as_ref();
        self.call("delete_table", move || store.delete_table(table_name))
            .await?;
        self.schemas.invalidate(table_name);
        self.store
            .wait_for_table_state(table_name, store::TableState::Absent, &self.config.table_wait)
            .await
    }

    /// Delete every table; returns the deleted names.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err))]
    pub async fn delete_all_tables(&self) -> error::Result<Vec<String>> {
        let table_names = self.list_tables().await?;
        for table_name in &table_names {
            self.delete_table(table_name).await?;
        }
        Ok(table_names)
    }

    /// Recreate a table and fill it with `seed_data`.
    ///
    /// Unless `no_delete` is set the table is deleted first; a failed delete is
    /// ignored. A failed create is returned as an error, except with
    /// `no_delete` where the existing table is seeded instead and `None` is
    /// returned. `delay` (the configured seed delay when `None`) is waited
    /// after a successful delete and before inserting.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(table_name = %create_table.table_name), err)
    )]
    pub async fn seed_table<T: Serialize>(
        &self,
        create_table: table::create_table::CreateTable,
        seed_data: &[T],
        delay: Option<time::Duration>,
        no_delete: bool,
    ) -> error::Result<Option<types::TableDescription>> {
        let delay = delay.unwrap_or(self.config.seed_delay);
        let table_name = create_table.table_name.clone();
        if !no_delete {
            match self.delete_table(&table_name).await {
                Ok(()) => tokio::time::sleep(delay).await,
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(error = %_err, "delete before seeding failed");
                }
            }
        }
        let description = match self.create_table(create_table).await {
            Ok(description) => Some(description),
            Err(_err) if no_delete => {
                #[cfg(feature = "tracing")]
                tracing::debug!(error = %_err, "create failed, seeding the existing table");
                None
            }
            Err(err) => return Err(err),
        };
        tokio::time::sleep(delay).await;
        if !seed_data.is_empty() {
            self.insert_many(&table_name, seed_data).await?;
        }
        Ok(description)
    }

    /// Primary key of `table_name` built from its schema.
    ///
    /// `range_value` must be given exactly when the table has a range key.
    pub async fn key<T>(
        &self,
        table_name: &str,
        hash_value: T,
        range_value: Option<T>,
    ) -> error::Result<common::key::Keys<T>> {
        let schema = self.schemas.resolve(self.store.as_ref(), table_name).await?;
        common::key::Keys::from_schema(&schema, hash_value, range_value)
    }
}
