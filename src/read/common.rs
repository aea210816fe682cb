use crate::common;

use aws_sdk_dynamodb::types;
use std::collections;

/// Request-level form of [`SingleReadArgs`], with the projection resolved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SingleReadInput {
    /// Strongly consistent read when `Some(true)`.
    pub consistent_read: Option<bool>,
    /// Placeholders used by the projection.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Attributes to return, all of them when `None`.
    pub projection_expression: Option<String>,
    /// Table to read from.
    pub table_name: String,
}

/// Arguments for single-item read operations (GetItem).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SingleReadArgs {
    /// Whether to use a consistent read.
    ///
    /// `true` for strongly consistent reads, `false` or `None` for eventually consistent reads.
    pub consistent_read: Option<bool>,
    /// Which attributes to retrieve (projection expression).
    ///
    /// If `None`, all attributes are retrieved.
    pub selection: Option<common::selection::SelectionMap>,
    /// The name of the table to read from.
    pub table_name: String,
}

impl From<SingleReadArgs> for SingleReadInput {
    fn from(single_read_args: SingleReadArgs) -> Self {
        let mut input = Self {
            consistent_read: single_read_args.consistent_read,
            table_name: single_read_args.table_name,
            ..Default::default()
        };
        if let Some(selection) = single_read_args.selection {
            let selection_operation: common::ExpressionInput = selection.into();
            let mut expression_attribute_values = None;
            input.projection_expression = Some(selection_operation.merge_into(
                &mut input.expression_attribute_names,
                &mut expression_attribute_values,
            ));
        }
        input
    }
}

/// Request-level form of [`MultipleReadArgs`], shared by queries and scans.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipleReadInput {
    /// Strongly consistent read when `Some(true)`.
    pub consistent_read: Option<bool>,
    /// Placeholders for attribute names.
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Placeholders for attribute values.
    pub expression_attribute_values: Option<common::Item>,
    /// Secondary index to read, the table itself when `None`.
    pub index_name: Option<String>,
    /// Maximum number of items to return across all pages.
    pub limit: Option<i32>,
    /// Attributes to return, all of them when `None`.
    pub projection_expression: Option<String>,
    /// What the store should return (items or only their count).
    pub select: Option<types::Select>,
    /// Table to read from.
    pub table_name: String,
}

/// Arguments for multiple-item read operations (Query, Scan).
///
/// ```rust
/// use dynamodb_data_api::read::common::MultipleReadArgs;
///
/// let args = MultipleReadArgs {
///     limit: Some(10),
///     selection: Some("name,date".parse().unwrap()),
///     table_name: "events".to_string(),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipleReadArgs {
    /// Whether to use a consistent read.
    pub consistent_read: Option<bool>,
    /// Secondary index to read.
    pub index_name: Option<String>,
    /// Maximum number of items to return.
    ///
    /// Pages are fetched until the limit is reached or the table is exhausted.
    pub limit: Option<i32>,
    /// Return items or only their count.
    pub select: Option<types::Select>,
    /// Which attributes to retrieve.
    pub selection: Option<common::selection::SelectionMap>,
    /// The name of the table to read from.
    pub table_name: String,
}

impl From<MultipleReadArgs> for MultipleReadInput {
    fn from(multiple_read_args: MultipleReadArgs) -> Self {
        let mut input = Self {
            consistent_read: multiple_read_args.consistent_read,
            index_name: multiple_read_args.index_name,
            limit: multiple_read_args.limit,
            select: multiple_read_args.select,
            table_name: multiple_read_args.table_name,
            ..Default::default()
        };
        if let Some(selection) = multiple_read_args.selection {
            let selection_operation: common::ExpressionInput = selection.into();
            input.projection_expression = Some(selection_operation.merge_into(
                &mut input.expression_attribute_names,
                &mut input.expression_attribute_values,
            ));
        }
        input
    }
}

/// Items read by a query or a scan, all pages combined.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadOutput {
    /// Returned items, at most `limit` of them.
    pub items: Vec<common::Item>,
    /// Number of matching items (equal to `items.len()` unless only counting).
    pub count: usize,
    /// Number of items the store evaluated.
    pub scanned_count: usize,
}

/// Drain a query or scan paginator into a [`ReadOutput`](crate::read::common::ReadOutput),
/// stopping once `limit` items were collected.
#[macro_export]
macro_rules! get_paginated_output {
    ($paginator:expr, $limit:expr) => {{
        let limit: Option<usize> = $limit.and_then(|limit: i32| usize::try_from(limit).ok());
        let mut output = $crate::read::common::ReadOutput::default();
        while let Some(page) = $paginator.next().await {
            let page = page?;
            output.count += usize::try_from(page.count).unwrap_or_default();
            output.scanned_count += usize::try_from(page.scanned_count).unwrap_or_default();
            if let Some(items) = page.items {
                output.items.extend(items);
            }
            if limit.is_some_and(|limit| output.count >= limit) {
                break;
            }
        }
        if let Some(limit) = limit {
            output.items.truncate(limit);
            output.count = output.count.min(limit);
        }
        Ok(output)
    }};
}

/// Apply a [`SingleReadInput`](crate::read::common::SingleReadInput) to an SDK request builder.
#[macro_export]
macro_rules! apply_single_read_input {
    ($builder:expr, $single_read_input:expr) => {
        $builder
            .set_consistent_read($single_read_input.consistent_read)
            .set_expression_attribute_names($single_read_input.expression_attribute_names)
            .set_projection_expression($single_read_input.projection_expression)
            .table_name($single_read_input.table_name)
    };
}

/// Apply a [`MultipleReadInput`](crate::read::common::MultipleReadInput) to an SDK request builder.
#[macro_export]
macro_rules! apply_multiple_read_input {
    ($builder:expr, $multiple_read_input:expr) => {
        $builder
            .set_consistent_read($multiple_read_input.consistent_read)
            .set_expression_attribute_names($multiple_read_input.expression_attribute_names)
            .set_expression_attribute_values($multiple_read_input.expression_attribute_values)
            .set_index_name($multiple_read_input.index_name)
            .set_limit($multiple_read_input.limit)
            .set_projection_expression($multiple_read_input.projection_expression)
            .set_select($multiple_read_input.select)
            .table_name($multiple_read_input.table_name)
    };
}
