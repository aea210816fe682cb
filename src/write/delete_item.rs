use crate::{common, write};

use aws_sdk_dynamodb::{Client, error, operation};
use serde::Serialize;
use serde_dynamo::{Error, Result};

/// Request-level form of [`DeleteItem`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteItemInput {
    /// Primary key of the item.
    pub key: common::Item,
    /// Table and return values.
    pub write_input: write::common::WriteInput,
}

/// Deletes a single item by its primary key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeleteItem<T> {
    /// Primary key of the item to delete.
    pub keys: common::key::Keys<T>,
    /// Table and return values.
    pub write_args: write::common::WriteArgs,
}

impl<T: Serialize> TryFrom<DeleteItem<T>> for DeleteItemInput {
    type Error = Error;

    fn try_from(delete_item: DeleteItem<T>) -> Result<Self> {
        let key = delete_item.keys.try_into()?;
        let input = Self {
            key,
            write_input: delete_item.write_args.into(),
        };
        Ok(input)
    }
}

impl DeleteItemInput {
    /// Execute the DeleteItem operation, returning the deleted item when requested.
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<Option<common::Item>, error::SdkError<operation::delete_item::DeleteItemError>>
    {
        let builder = client.delete_item().set_key(Some(self.key));
        let output = crate::apply_write_input!(builder, self.write_input)
            .send()
            .await?;
        Ok(output.attributes)
    }
}
