use crate::{common, error, schema};

use aws_sdk_dynamodb::{Client, operation, types};
use serde::Serialize;
use serde_dynamo::to_item;
use std::collections;

/// Maximum number of requests the store accepts in one batch.
pub const BATCH_WRITE_SIZE: usize = 25;

/// One put or delete inside a [`BatchWriteItem`].
#[derive(Clone, Debug, PartialEq)]
pub enum BatchWriteItemRequest<T> {
    /// Put an item.
    PutItem(T),
    /// Delete the item with this primary key.
    DeleteItem(common::key::Keys<T>),
}

impl<T: Serialize> TryFrom<BatchWriteItemRequest<T>> for types::WriteRequest {
    type Error = error::Error;

    fn try_from(write_request: BatchWriteItemRequest<T>) -> error::Result<Self> {
        let builder = match write_request {
            BatchWriteItemRequest::PutItem(item) => {
                let item = to_item(item)?;
                let put_request = types::PutRequest::builder().set_item(Some(item)).build()?;
                Self::builder().put_request(put_request)
            }
            BatchWriteItemRequest::DeleteItem(keys) => {
                let key = keys.try_into()?;
                let delete_request = types::DeleteRequest::builder()
                    .set_key(Some(key))
                    .build()?;
                Self::builder().delete_request(delete_request)
            }
        };
        Ok(builder.build())
    }
}

/// Puts and deletes against one table, split into store-sized batches.
///
/// ```rust
/// use dynamodb_data_api::write::batch_write_item::{BatchWriteItem, BatchWriteItemRequest};
/// use serde_json::json;
///
/// let batch = BatchWriteItem {
///     table_name: "events".to_string(),
///     requests: (0..60)
///         .map(|id| BatchWriteItemRequest::PutItem(json!({"id": id})))
///         .collect(),
/// };
/// let chunks = batch.into_chunks().unwrap();
/// assert_eq!(chunks.iter().map(|chunk| chunk.requests.len()).collect::<Vec<_>>(), vec![25, 25, 10]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BatchWriteItem<T> {
    /// Table to write to.
    pub table_name: String,
    /// Requests in submission order.
    pub requests: Vec<BatchWriteItemRequest<T>>,
}

impl<T: Serialize> BatchWriteItem<T> {
    fn into_requests(self) -> error::Result<(String, Vec<types::WriteRequest>)> {
        let mut requests = Vec::with_capacity(self.requests.len());
        for request in self.requests {
            requests.push(types::WriteRequest::try_from(request)?);
        }
        Ok((self.table_name, requests))
    }

    /// Convert every request and group them by [`BATCH_WRITE_SIZE`].
    pub fn into_chunks(self) -> error::Result<Vec<BatchWriteItemInput>> {
        let (table_name, requests) = self.into_requests()?;
        Ok(chunk(&table_name, &requests))
    }

    /// Like [`into_chunks`](Self::into_chunks), but of several requests on the
    /// same primary key of `schema` only the last one is kept.
    ///
    /// The store rejects a batch touching one key twice, so this gives a batch
    /// the outcome of sending its requests one by one.
    pub fn into_unique_chunks(
        self,
        schema: &schema::TableSchema,
    ) -> error::Result<Vec<BatchWriteItemInput>> {
        let (table_name, requests) = self.into_requests()?;
        let key_attributes: Vec<&str> = std::iter::once(schema.hash_key.as_str())
            .chain(schema.range_key.as_deref())
            .collect();
        let mut seen = collections::HashSet::new();
        let mut unique: Vec<_> = requests
            .into_iter()
            .rev()
            .filter(|request| {
                write_request_key(&key_attributes, request).is_none_or(|key| seen.insert(key))
            })
            .collect();
        unique.reverse();
        Ok(chunk(&table_name, &unique))
    }
}

fn chunk(table_name: &str, requests: &[types::WriteRequest]) -> Vec<BatchWriteItemInput> {
    requests
        .chunks(BATCH_WRITE_SIZE)
        .map(|chunk| BatchWriteItemInput {
            table_name: table_name.to_string(),
            requests: chunk.to_vec(),
        })
        .collect()
}

/// Key values of the item a request touches, `None` when one is missing or
/// not a scalar.
fn write_request_key(
    key_attributes: &[&str],
    request: &types::WriteRequest,
) -> Option<Vec<String>> {
    let values = match (request.put_request(), request.delete_request()) {
        (Some(put_request), _) => put_request.item(),
        (None, Some(delete_request)) => delete_request.key(),
        (None, None) => return None,
    };
    key_attributes
        .iter()
        .map(|name| match values.get(*name)? {
            types::AttributeValue::S(value) => Some(format!("S:{value}")),
            types::AttributeValue::N(value) => Some(format!("N:{value}")),
            types::AttributeValue::B(value) => Some(format!("B:{:?}", value.as_ref())),
            _ => None,
        })
        .collect()
}

/// One batch of at most [`BATCH_WRITE_SIZE`] requests for a single table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchWriteItemInput {
    /// Table to write to.
    pub table_name: String,
    /// Requests of this batch.
    pub requests: Vec<types::WriteRequest>,
}

impl BatchWriteItemInput {
    /// Execute the BatchWriteItem operation, returning the requests the store left unprocessed.
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<
        Vec<types::WriteRequest>,
        aws_sdk_dynamodb::error::SdkError<operation::batch_write_item::BatchWriteItemError>,
    > {
        let table_name = self.table_name;
        let output = client
            .batch_write_item()
            .set_request_items(Some(collections::HashMap::from([(
                table_name.clone(),
                self.requests,
            )])))
            .send()
            .await?;
        let unprocessed = output
            .unprocessed_items
            .and_then(|mut unprocessed_items| unprocessed_items.remove(&table_name))
            .unwrap_or_default();
        Ok(unprocessed)
    }
}
