use crate::common;

use aws_sdk_dynamodb::types;
use std::{collections, ops};

/// Joins the clauses of a key condition expression.
pub(crate) const CLAUSE_SEPARATOR: &str = " and ";

/// Comparison operator of a key condition clause.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyOperator {
    /// `#key = :key`
    Equal,
    /// `#key <= :key`
    LessThanOrEqual,
}

impl ops::Deref for KeyOperator {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Equal => " = ",
            Self::LessThanOrEqual => " <= ",
        }
    }
}

/// Key condition compiled from a filter against a table schema.
///
/// Every attribute is aliased as `#name` with its value bound to `:name`, so
/// reserved words never reach the expression. An attribute is registered at
/// most once: later conditions on an already aliased attribute are dropped.
///
/// ```rust
/// use dynamodb_data_api::common::condition;
/// use aws_sdk_dynamodb::types::AttributeValue;
///
/// let mut compiled = condition::CompiledCondition::default();
/// compiled.add_condition("name", condition::KeyOperator::Equal, AttributeValue::S("a".into()));
/// compiled.add_condition("date", condition::KeyOperator::LessThanOrEqual, AttributeValue::S("b".into()));
/// assert_eq!(compiled.key_condition_expression, "#name = :name and #date <= :date");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledCondition {
    /// Attribute name aliases (`#name` to `name`).
    pub expression_attribute_names: collections::HashMap<String, String>,
    /// Attribute value aliases (`:name` to value).
    pub expression_attribute_values: common::Item,
    /// Clauses joined with `" and "`.
    pub key_condition_expression: String,
    /// Secondary index to query, `None` for the table itself.
    pub index_name: Option<String>,
}

impl CompiledCondition {
    /// Register `name` with `value` and append its clause, unless `name` is
    /// already aliased.
    ///
    /// Returns whether a clause was added.
    pub fn add_condition(
        &mut self,
        name: &str,
        operator: KeyOperator,
        value: types::AttributeValue,
    ) -> bool {
        let name_placeholder = format!("#{name}");
        if self
            .expression_attribute_names
            .contains_key(&name_placeholder)
        {
            return false;
        }
        let value_placeholder = format!(":{name}");
        let clause = format!("{name_placeholder}{}{value_placeholder}", &*operator);
        self.expression_attribute_names
            .insert(name_placeholder, name.to_string());
        self.expression_attribute_values
            .insert(value_placeholder, value);
        if !self.key_condition_expression.is_empty() {
            self.key_condition_expression.push_str(CLAUSE_SEPARATOR);
        }
        self.key_condition_expression.push_str(&clause);
        true
    }

    /// Route the query to `index_name` unless an index is already selected.
    pub fn select_index(&mut self, index_name: &str) -> bool {
        if self.index_name.is_some() {
            return false;
        }
        self.index_name = Some(index_name.to_string());
        true
    }

    /// Whether no clause has been added.
    pub fn is_empty(&self) -> bool {
        self.key_condition_expression.is_empty()
    }
}
