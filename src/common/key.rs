use crate::{common, error, schema};

use serde::Serialize;
use serde_dynamo::{Error, Result, to_attribute_value};

/// Key component.
///
/// ```rust
/// use dynamodb_data_api::common::key;
///
/// let key = key::Key {
///     name: "email".to_string(),
///     value: "jane@example.com".to_string(),
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Key<T> {
    /// The attribute name of the key.
    pub name: String,
    /// The value of the key.
    pub value: T,
}

/// Primary key (partition key and optional sort key).
///
/// ```rust
/// use dynamodb_data_api::common::key;
///
/// let keys = key::Keys::partition("name", "testname").with_sort("date", "1000");
/// assert_eq!(keys.sort_key.unwrap().name, "date");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Keys<T> {
    /// The partition key (required).
    pub partition_key: Key<T>,
    /// The sort key (optional, only for tables with composite primary keys).
    pub sort_key: Option<Key<T>>,
}

impl<T> Keys<T> {
    /// Key made of a partition key only.
    pub fn partition(name: impl Into<String>, value: T) -> Self {
        Self {
            partition_key: Key {
                name: name.into(),
                value,
            },
            sort_key: None,
        }
    }

    /// Add a sort key.
    pub fn with_sort(mut self, name: impl Into<String>, value: T) -> Self {
        self.sort_key = Some(Key {
            name: name.into(),
            value,
        });
        self
    }

    /// Build the primary key of a table from its schema.
    ///
    /// The sort value must be given exactly when the table has a range key.
    pub fn from_schema(
        schema: &schema::TableSchema,
        partition_value: T,
        sort_value: Option<T>,
    ) -> error::Result<Self> {
        let keys = Self::partition(schema.hash_key.clone(), partition_value);
        match (&schema.range_key, sort_value) {
            (Some(range_key), Some(sort_value)) => Ok(keys.with_sort(range_key.clone(), sort_value)),
            (None, None) => Ok(keys),
            (Some(_), None) => Err(error::Error::KeyMismatch {
                table_name: schema.table_name.clone(),
                reason: "the table has a range key but no sort value was given",
            }),
            (None, Some(_)) => Err(error::Error::KeyMismatch {
                table_name: schema.table_name.clone(),
                reason: "the table has no range key but a sort value was given",
            }),
        }
    }
}

impl<T: Serialize> TryFrom<Keys<T>> for common::Item {
    type Error = Error;

    fn try_from(key: Keys<T>) -> Result<Self> {
        let partition_key_value = to_attribute_value(key.partition_key.value)?;
        let mut keys = Self::from([(key.partition_key.name, partition_key_value)]);
        if let Some(sort_key) = key.sort_key {
            let sort_key_value = to_attribute_value(sort_key.value)?;
            keys.insert(sort_key.name, sort_key_value);
        }
        Ok(keys)
    }
}
