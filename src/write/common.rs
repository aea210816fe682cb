use crate::common;

use aws_sdk_dynamodb::types;
use std::collections;

/// Request-level form of [`WriteArgs`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteInput {
    /// Placeholders for attribute names.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Placeholders for attribute values.
    pub expression_attribute_values: Option<common::Item>,
    /// Attributes to return from the write.
    pub return_values: Option<types::ReturnValue>,
    /// Table to write to.
    pub table_name: String,
}

impl WriteInput {
    /// Merge an expression operation into this write operation.
    ///
    /// The placeholders of the operation are added to the request-level maps and the
    /// expression string is returned.
    pub(crate) fn merge_expression(&mut self, operation: common::ExpressionInput) -> String {
        operation.merge_into(
            &mut self.expression_attribute_names,
            &mut self.expression_attribute_values,
        )
    }
}

/// Arguments common to all write operations (Put, Update, Delete).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteArgs {
    /// Determines what values are returned after the operation.
    ///
    /// Put and delete return the previous item with `AllOld`; updates return the new item
    /// with `AllNew`.
    pub return_values: Option<types::ReturnValue>,
    /// The name of the table to write to.
    pub table_name: String,
}

impl From<WriteArgs> for WriteInput {
    fn from(write_args: WriteArgs) -> Self {
        Self {
            return_values: write_args.return_values,
            table_name: write_args.table_name,
            ..Default::default()
        }
    }
}

/// Apply a [`WriteInput`](crate::write::common::WriteInput) to an SDK request builder.
#[macro_export]
macro_rules! apply_write_input {
    ($builder:expr, $write_input:expr) => {
        $builder
            .set_expression_attribute_names($write_input.expression_attribute_names)
            .set_expression_attribute_values($write_input.expression_attribute_values)
            .set_return_values($write_input.return_values)
            .table_name($write_input.table_name)
    };
}
