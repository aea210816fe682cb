use crate::{common, write};

use aws_sdk_dynamodb::{Client, error, operation, types};
use serde::Serialize;
use serde_dynamo::{Error, Result, to_attribute_value};
use std::collections;

/// Change applied to one attribute by an update.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateAction<T> {
    /// `SET #a = :v`
    Set(T),
    /// `SET #a = #a + :v`
    Increment(T),
    /// `SET #a = #a - :v`
    Decrement(T),
    /// `REMOVE #a`
    Remove,
}

impl<T> UpdateAction<T> {
    fn try_map<U>(self, f: impl FnOnce(T) -> Result<U>) -> Result<UpdateAction<U>> {
        let action = match self {
            Self::Set(value) => UpdateAction::Set(f(value)?),
            Self::Increment(value) => UpdateAction::Increment(f(value)?),
            Self::Decrement(value) => UpdateAction::Decrement(f(value)?),
            Self::Remove => UpdateAction::Remove,
        };
        Ok(action)
    }

    fn get_set_expression(self, path: &str, value_placeholder: &str) -> Option<(T, String)> {
        match self {
            Self::Set(value) => Some((value, format!("{path} = {value_placeholder}"))),
            Self::Increment(value) => Some((value, format!("{path} = {path} + {value_placeholder}"))),
            Self::Decrement(value) => Some((value, format!("{path} = {path} - {value_placeholder}"))),
            Self::Remove => None,
        }
    }
}

/// Build the update expression for `actions`.
///
/// All `SET` clauses come first, then all `REMOVE` clauses, each group in the
/// order given.
fn get_update_expression(
    actions: Vec<(String, UpdateAction<types::AttributeValue>)>,
) -> common::ExpressionInput {
    let mut set_operations = Vec::new();
    let mut remove_operations = Vec::new();
    for (index, (name, action)) in actions.into_iter().enumerate() {
        let (placeholder, path) = common::add_placeholder(&[], &name);
        let path = path.join(".");
        let expression_attribute_names = collections::HashMap::from([(placeholder, name)]);
        let value_placeholder = format!(":set{index}");
        match action.get_set_expression(&path, &value_placeholder) {
            Some((value, expression)) => set_operations.push(common::ExpressionInput {
                expression,
                expression_attribute_names,
                expression_attribute_values: collections::HashMap::from([(
                    value_placeholder,
                    value,
                )]),
            }),
            None => remove_operations.push(common::ExpressionInput {
                expression: path,
                expression_attribute_names,
                ..Default::default()
            }),
        }
    }
    let mut operations = Vec::with_capacity(2);
    if !set_operations.is_empty() {
        let mut operation = common::ExpressionInput::merge(", ", set_operations);
        operation.expression = format!("SET {}", operation.expression);
        operations.push(operation);
    }
    if !remove_operations.is_empty() {
        let mut operation = common::ExpressionInput::merge(", ", remove_operations);
        operation.expression = format!("REMOVE {}", operation.expression);
        operations.push(operation);
    }
    common::ExpressionInput::merge(" ", operations)
}

/// Request-level form of [`UpdateItem`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateItemInput {
    /// Primary key of the item.
    pub key: common::Item,
    /// `SET` and `REMOVE` clauses, placeholders merged into `write_input`.
    pub update_expression: String,
    /// Table, placeholders and return values.
    pub write_input: write::common::WriteInput,
}

/// Modifies attributes of an existing item, creating it if it does not exist.
///
/// ```rust
/// use dynamodb_data_api::{common, write};
/// use write::update_item::UpdateAction;
///
/// let update_item = write::update_item::UpdateItem {
///     keys: common::key::Keys::partition("name", "testname"),
///     actions: vec![
///         ("team".to_string(), UpdateAction::Set("xyz")),
///         ("visits".to_string(), UpdateAction::Increment("1")),
///         ("draft".to_string(), UpdateAction::Remove),
///     ],
///     write_args: write::common::WriteArgs {
///         table_name: "events".to_string(),
///         ..Default::default()
///     },
/// };
/// let input: write::update_item::UpdateItemInput = update_item.try_into().unwrap();
/// assert_eq!(
///     input.update_expression,
///     "SET #team = :set0, #visits = #visits + :set1 REMOVE #draft",
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateItem<K, V> {
    /// Primary key of the item to update.
    pub keys: common::key::Keys<K>,
    /// Attribute changes, in order.
    pub actions: Vec<(String, UpdateAction<V>)>,
    /// Table and return values.
    pub write_args: write::common::WriteArgs,
}

impl<K: Serialize, V: Serialize> TryFrom<UpdateItem<K, V>> for UpdateItemInput {
    type Error = Error;

    fn try_from(update_item: UpdateItem<K, V>) -> Result<Self> {
        let key = update_item.keys.try_into()?;
        let mut actions = Vec::with_capacity(update_item.actions.len());
        for (name, action) in update_item.actions {
            actions.push((name, action.try_map(to_attribute_value)?));
        }
        Ok(Self::new(key, actions, update_item.write_args))
    }
}

impl UpdateItemInput {
    /// Execute the UpdateItem operation, returning the attributes selected by `return_values`.
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<Option<common::Item>, error::SdkError<operation::update_item::UpdateItemError>>
    {
        let builder = client
            .update_item()
            .set_key(Some(self.key))
            .update_expression(self.update_expression);
        let output = crate::apply_write_input!(builder, self.write_input)
            .send()
            .await?;
        Ok(output.attributes)
    }
}

impl UpdateItemInput {
    fn new(
        key: common::Item,
        actions: Vec<(String, UpdateAction<types::AttributeValue>)>,
        write_args: write::common::WriteArgs,
    ) -> Self {
        let mut write_input: write::common::WriteInput = write_args.into();
        let update_expression = write_input.merge_expression(get_update_expression(actions));
        Self {
            key,
            update_expression,
            write_input,
        }
    }

    /// Update setting every attribute of `item` except those of `key`.
    ///
    /// Attributes are set in name order.
    pub fn set_all(
        key: common::Item,
        item: common::Item,
        write_args: write::common::WriteArgs,
    ) -> Self {
        let mut actions: Vec<_> = item
            .into_iter()
            .filter(|(name, _)| !key.contains_key(name))
            .map(|(name, value)| (name, UpdateAction::Set(value)))
            .collect();
        actions.sort_by(|(left, _), (right, _)| left.cmp(right));
        Self::new(key, actions, write_args)
    }
}
