use crate::{common, read};

use aws_sdk_dynamodb::{Client, error, operation};
use serde::Serialize;
use serde_dynamo::{Error, Result};

/// Request-level form of [`GetItem`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetItemInput {
    /// Primary key of the item.
    pub key: common::Item,
    /// Table and projection.
    pub single_read_input: read::common::SingleReadInput,
}

/// Retrieves a single item by its primary key.
///
/// Returns `None` if the item doesn't exist.
///
/// ```rust
/// use dynamodb_data_api::{common, read};
///
/// let get_item = read::get_item::GetItem {
///     keys: common::key::Keys::partition("name", "testname").with_sort("date", "1000"),
///     single_read_args: read::common::SingleReadArgs {
///         table_name: "events".to_string(),
///         ..Default::default()
///     },
/// };
/// let input: read::get_item::GetItemInput = get_item.try_into().unwrap();
/// assert_eq!(input.key.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetItem<T> {
    /// Primary key of the item to retrieve.
    pub keys: common::key::Keys<T>,
    /// Table, consistency and projection.
    pub single_read_args: read::common::SingleReadArgs,
}

impl<T: Serialize> TryFrom<GetItem<T>> for GetItemInput {
    type Error = Error;

    fn try_from(get_item: GetItem<T>) -> Result<Self> {
        let key = get_item.keys.try_into()?;
        let input = Self {
            key,
            single_read_input: get_item.single_read_args.into(),
        };
        Ok(input)
    }
}

impl GetItemInput {
    /// Execute the GetItem operation, returning the item if it exists.
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<Option<common::Item>, error::SdkError<operation::get_item::GetItemError>> {
        let builder = client.get_item().set_key(Some(self.key));
        let output = crate::apply_single_read_input!(builder, self.single_read_input)
            .send()
            .await?;
        Ok(output.item)
    }
}
