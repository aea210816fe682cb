//! Shaping raw items into caller types.

use crate::{common, error};

use serde::de::DeserializeOwned;
use serde_dynamo::{from_item, from_items};

/// First of `items`, or [`Error::NotFound`](error::Error::NotFound) when there is none.
pub fn single<T: DeserializeOwned>(
    table_name: &str,
    items: Vec<common::Item>,
) -> error::Result<T> {
    let item = items
        .into_iter()
        .next()
        .ok_or_else(|| error::Error::NotFound {
            table_name: table_name.to_string(),
        })?;
    Ok(from_item(item)?)
}

/// Every item of `items`, in order.
pub fn list<T: DeserializeOwned>(items: Vec<common::Item>) -> error::Result<Vec<T>> {
    Ok(from_items(items)?)
}
