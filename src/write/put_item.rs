use crate::{common, write};

use aws_sdk_dynamodb::{Client, error, operation};
use serde::Serialize;
use serde_dynamo::{Error, Result, to_item};

/// Request-level form of [`PutItem`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PutItemInput {
    /// The item, already converted to attribute values.
    pub item: common::Item,
    /// Table and return values.
    pub write_input: write::common::WriteInput,
}

/// Creates a new item or replaces an existing item with the same primary key.
///
/// ```rust
/// use dynamodb_data_api::write;
/// use serde_json::json;
///
/// let put_item = write::put_item::PutItem {
///     item: json!({"name": "testname", "date": "1000"}),
///     write_args: write::common::WriteArgs {
///         table_name: "events".to_string(),
///         ..Default::default()
///     },
/// };
/// let input: write::put_item::PutItemInput = put_item.try_into().unwrap();
/// assert_eq!(input.item.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PutItem<T> {
    /// The item to put. Must include the primary key attributes.
    pub item: T,
    /// Table and return values.
    pub write_args: write::common::WriteArgs,
}

impl<T: Serialize> TryFrom<PutItem<T>> for PutItemInput {
    type Error = Error;

    fn try_from(put_item: PutItem<T>) -> Result<Self> {
        let item = to_item(put_item.item)?;
        let input = Self {
            item,
            write_input: put_item.write_args.into(),
        };
        Ok(input)
    }
}

impl PutItemInput {
    /// Execute the PutItem operation, returning the replaced item when requested.
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<Option<common::Item>, error::SdkError<operation::put_item::PutItemError>> {
        let builder = client.put_item().set_item(Some(self.item));
        let output = crate::apply_write_input!(builder, self.write_input)
            .send()
            .await?;
        Ok(output.attributes)
    }
}
