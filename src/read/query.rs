use crate::{common, read};

use aws_sdk_dynamodb::{Client, error, operation};

/// Request-level form of [`Query`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryInput {
    /// Key condition with its placeholders merged into `multiple_read_input`.
    pub key_condition_expression: String,
    /// Table, index, projection and placeholders.
    pub multiple_read_input: read::common::MultipleReadInput,
    /// Ascending sort key order when `Some(true)`, descending when `Some(false)`.
    pub scan_index_forward: Option<bool>,
}

/// Retrieves the items matching a compiled key condition.
///
/// The index selected by the condition, if any, takes precedence over
/// `multiple_read_args.index_name`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    /// Key condition produced by [`filter::compile`](crate::filter::compile).
    pub condition: common::condition::CompiledCondition,
    /// Table, limit and projection.
    pub multiple_read_args: read::common::MultipleReadArgs,
    /// Sort key order.
    pub scan_index_forward: Option<bool>,
}

impl From<Query> for QueryInput {
    fn from(query: Query) -> Self {
        let mut multiple_read_input: read::common::MultipleReadInput =
            query.multiple_read_args.into();
        let condition = query.condition;
        if condition.index_name.is_some() {
            multiple_read_input.index_name = condition.index_name;
        }
        let key_condition_operation = common::ExpressionInput {
            expression: condition.key_condition_expression,
            expression_attribute_names: condition.expression_attribute_names,
            expression_attribute_values: condition.expression_attribute_values,
        };
        let key_condition_expression = key_condition_operation.merge_into(
            &mut multiple_read_input.expression_attribute_names,
            &mut multiple_read_input.expression_attribute_values,
        );
        Self {
            key_condition_expression,
            multiple_read_input,
            scan_index_forward: query.scan_index_forward,
        }
    }
}

impl QueryInput {
    /// Execute the Query operation, following pages up to the limit.
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<read::common::ReadOutput, error::SdkError<operation::query::QueryError>> {
        let limit = self.multiple_read_input.limit;
        let builder = client
            .query()
            .key_condition_expression(self.key_condition_expression)
            .set_scan_index_forward(self.scan_index_forward);
        let mut paginator = crate::apply_multiple_read_input!(builder, self.multiple_read_input)
            .into_paginator()
            .send();
        crate::get_paginated_output!(paginator, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use aws_sdk_dynamodb::types;
    use rstest::rstest;
    use std::collections;

    fn condition(index_name: Option<&str>) -> common::condition::CompiledCondition {
        let mut condition = common::condition::CompiledCondition::default();
        condition.add_condition(
            "team",
            common::condition::KeyOperator::Equal,
            types::AttributeValue::S("xyz".to_string()),
        );
        if let Some(index_name) = index_name {
            condition.select_index(index_name);
        }
        condition
    }

    #[rstest]
    #[case::table(
        Query {
            condition: condition(None),
            multiple_read_args: read::common::MultipleReadArgs {
                table_name: "a".to_string(),
                ..Default::default()
            },
            ..Default::default()
        },
        QueryInput {
            key_condition_expression: "#team = :team".to_string(),
            multiple_read_input: read::common::MultipleReadInput {
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#team".to_string(), "team".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":team".to_string(),
                                types::AttributeValue::S(
                                    "xyz".to_string()
                                )
                            ),
                        ]
                    )
                ),
                table_name: "a".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    )]
    #[case::index_with_projection(
        Query {
            condition: condition(Some("team-index")),
            multiple_read_args: read::common::MultipleReadArgs {
                limit: Some(5),
                selection: Some(
                    "name".parse().unwrap()
                ),
                table_name: "a".to_string(),
                ..Default::default()
            },
            scan_index_forward: Some(false),
        },
        QueryInput {
            key_condition_expression: "#team = :team".to_string(),
            multiple_read_input: read::common::MultipleReadInput {
                expression_attribute_names: Some(
                    collections::HashMap::from(
                        [
                            ("#name".to_string(), "name".to_string()),
                            ("#team".to_string(), "team".to_string()),
                        ]
                    )
                ),
                expression_attribute_values: Some(
                    collections::HashMap::from(
                        [
                            (
                                ":team".to_string(),
                                types::AttributeValue::S(
                                    "xyz".to_string()
                                )
                            ),
                        ]
                    )
                ),
                index_name: Some("team-index".to_string()),
                limit: Some(5),
                projection_expression: Some("#name".to_string()),
                table_name: "a".to_string(),
                ..Default::default()
            },
            scan_index_forward: Some(false),
        }
    )]
    fn test_query_to_input(#[case] query: Query, #[case] expected: QueryInput) {
        let actual: QueryInput = query.into();
        assert_eq!(actual, expected);
    }
}
