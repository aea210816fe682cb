//! The table store: the remote operations the data API is built on.
//!
//! [`TableStore`] is implemented for the SDK [`Client`]. Each method sends a
//! single request; retries and deadlines are applied by the caller.

use crate::{common, config, error, read, table, write};

use aws_sdk_dynamodb::{Client, types};
use std::{fmt, future};

#[cfg(test)]
pub(crate) mod mock;

/// Table state awaited by [`TableStore::wait_for_table_state`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TableState {
    /// The table exists and accepts reads and writes.
    Active,
    /// The table does not exist.
    Absent,
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Absent => f.write_str("absent"),
        }
    }
}

/// Remote table operations.
pub trait TableStore: Send + Sync {
    /// Describe a table.
    fn describe_table(
        &self,
        table_name: &str,
    ) -> impl future::Future<Output = Result<types::TableDescription, error::StoreError>> + Send;

    /// Names of all tables.
    fn list_tables(
        &self,
    ) -> impl future::Future<Output = Result<Vec<String>, error::StoreError>> + Send;

    /// Create a table. Returns as soon as the store accepted the request.
    fn create_table(
        &self,
        input: table::create_table::CreateTableInput,
    ) -> impl future::Future<Output = Result<types::TableDescription, error::StoreError>> + Send;

    /// Delete a table. Returns as soon as the store accepted the request.
    fn delete_table(
        &self,
        table_name: &str,
    ) -> impl future::Future<Output = Result<(), error::StoreError>> + Send;

    /// Put an item.
    fn put_item(
        &self,
        input: write::put_item::PutItemInput,
    ) -> impl future::Future<Output = Result<Option<common::Item>, error::StoreError>> + Send;

    /// Get an item by key.
    fn get_item(
        &self,
        input: read::get_item::GetItemInput,
    ) -> impl future::Future<Output = Result<Option<common::Item>, error::StoreError>> + Send;

    /// Update an item.
    fn update_item(
        &self,
        input: write::update_item::UpdateItemInput,
    ) -> impl future::Future<Output = Result<Option<common::Item>, error::StoreError>> + Send;

    /// Delete an item by key.
    fn delete_item(
        &self,
        input: write::delete_item::DeleteItemInput,
    ) -> impl future::Future<Output = Result<Option<common::Item>, error::StoreError>> + Send;

    /// Query items by key condition, all pages up to the limit.
    fn query(
        &self,
        input: read::query::QueryInput,
    ) -> impl future::Future<Output = Result<read::common::ReadOutput, error::StoreError>> + Send;

    /// Scan a table, all pages up to the limit.
    fn scan(
        &self,
        input: read::scan::ScanInput,
    ) -> impl future::Future<Output = Result<read::common::ReadOutput, error::StoreError>> + Send;

    /// Write one batch; returns the requests the store did not process.
    fn batch_write(
        &self,
        input: write::batch_write_item::BatchWriteItemInput,
    ) -> impl future::Future<Output = Result<Vec<types::WriteRequest>, error::StoreError>> + Send;

    /// Poll `describe_table` until the table reaches `state`.
    ///
    /// A table is active once its status is `ACTIVE` and absent once describing
    /// it reports a missing resource.
    fn wait_for_table_state(
        &self,
        table_name: &str,
        state: TableState,
        wait: &config::WaitConfig,
    ) -> impl future::Future<Output = error::Result<()>> + Send {
        async move {
            let started = tokio::time::Instant::now();
            loop {
                let current = match self.describe_table(table_name).await {
                    Ok(description) => {
                        (description.table_status() == Some(&types::TableStatus::Active))
                            .then_some(TableState::Active)
                    }
                    Err(err) if err.is_resource_not_found() => Some(TableState::Absent),
                    Err(err) => return Err(err.into()),
                };
                if current == Some(state) {
                    return Ok(());
                }
                let waited = started.elapsed();
                if waited >= wait.max_wait {
                    return Err(error::Error::WaitTimeout {
                        table_name: table_name.to_string(),
                        state,
                        waited,
                    });
                }
                #[cfg(feature = "tracing")]
                tracing::debug!(table_name, %state, "waiting for table");
                tokio::time::sleep(wait.poll_interval.min(wait.max_wait - waited)).await;
            }
        }
    }
}

impl TableStore for Client {
    async fn describe_table(
        &self,
        table_name: &str,
    ) -> Result<types::TableDescription, error::StoreError> {
        let output = self
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|err| error::StoreError::from_sdk("describe_table", err))?;
        output.table.ok_or_else(|| {
            error::StoreError::new(
                "describe_table",
                None,
                format!("no description returned for table `{table_name}`"),
            )
        })
    }

    async fn list_tables(&self) -> Result<Vec<String>, error::StoreError> {
        let mut table_names = Vec::new();
        let mut paginator = self.list_tables().into_paginator().send();
        while let Some(page) = paginator.next().await {
            let page = page.map_err(|err| error::StoreError::from_sdk("list_tables", err))?;
            table_names.extend(page.table_names.unwrap_or_default());
        }
        Ok(table_names)
    }

    async fn create_table(
        &self,
        input: table::create_table::CreateTableInput,
    ) -> Result<types::TableDescription, error::StoreError> {
        input
            .send(self)
            .await
            .map_err(|err| error::StoreError::from_sdk("create_table", err))
    }

    async fn delete_table(&self, table_name: &str) -> Result<(), error::StoreError> {
        self.delete_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|err| error::StoreError::from_sdk("delete_table", err))?;
        Ok(())
    }

    async fn put_item(
        &self,
        input: write::put_item::PutItemInput,
    ) -> Result<Option<common::Item>, error::StoreError> {
        input
            .send(self)
            .await
            .map_err(|err| error::StoreError::from_sdk("put_item", err))
    }

    async fn get_item(
        &self,
        input: read::get_item::GetItemInput,
    ) -> Result<Option<common::Item>, error::StoreError> {
        input
            .send(self)
            .await
            .map_err(|err| error::StoreError::from_sdk("get_item", err))
    }

    async fn update_item(
        &self,
        input: write::update_item::UpdateItemInput,
    ) -> Result<Option<common::Item>, error::StoreError> {
        input
            .send(self)
            .await
            .map_err(|err| error::StoreError::from_sdk("update_item", err))
    }

    async fn delete_item(
        &self,
        input: write::delete_item::DeleteItemInput,
    ) -> Result<Option<common::Item>, error::StoreError> {
        input
            .send(self)
            .await
            .map_err(|err| error::StoreError::from_sdk("delete_item", err))
    }

    async fn query(
        &self,
        input: read::query::QueryInput,
    ) -> Result<read::common::ReadOutput, error::StoreError> {
        input
            .send(self)
            .await
            .map_err(|err| error::StoreError::from_sdk("query", err))
    }

    async fn scan(
        &self,
        input: read::scan::ScanInput,
    ) -> Result<read::common::ReadOutput, error::StoreError> {
        input
            .send(self)
            .await
            .map_err(|err| error::StoreError::from_sdk("scan", err))
    }

    async fn batch_write(
        &self,
        input: write::batch_write_item::BatchWriteItemInput,
    ) -> Result<Vec<types::WriteRequest>, error::StoreError> {
        input
            .send(self)
            .await
            .map_err(|err| error::StoreError::from_sdk("batch_write", err))
    }
}

