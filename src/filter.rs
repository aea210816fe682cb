//! Flat key/value filters and their compilation into key conditions.
//!
//! A filter names attributes and the values they must equal, or for range
//! keys, the upper bound they must not exceed. Compiling it against a
//! [`TableSchema`](schema::TableSchema) picks the index to query and emits
//! the clauses for every attribute that is part of a usable key.

use crate::{common::condition, error, schema};

use serde::Serialize;
use serde_dynamo::to_attribute_value;

/// Constraint on a single attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterValue<T> {
    /// The attribute equals the value.
    Equals(T),
    /// The attribute is at most the value. Only honoured on range keys.
    LessThanOrEqual(T),
}

/// Ordered list of attribute constraints.
///
/// ```rust
/// use dynamodb_data_api::filter::Filter;
///
/// let filter = Filter::new()
///     .equals("name", "testname")
///     .less_than_or_equal("date", "2000");
/// assert_eq!(filter.conditions.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Filter<T> {
    /// Constraints in evaluation order. The same attribute may appear twice;
    /// only its first occurrence reaches the compiled condition.
    pub conditions: Vec<(String, FilterValue<T>)>,
    /// Restrict index selection to this secondary index.
    pub index_name: Option<String>,
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            index_name: None,
        }
    }
}

impl<T> Filter<T> {
    /// Empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `name` to equal `value`.
    pub fn equals(mut self, name: impl Into<String>, value: T) -> Self {
        self.conditions
            .push((name.into(), FilterValue::Equals(value)));
        self
    }

    /// Require `name` to be at most `value`.
    pub fn less_than_or_equal(mut self, name: impl Into<String>, value: T) -> Self {
        self.conditions
            .push((name.into(), FilterValue::LessThanOrEqual(value)));
        self
    }

    /// Only consider the secondary index `index_name`.
    ///
    /// An index the table does not have is not an error: no index is
    /// selected and only the table's own keys are matched.
    pub fn index(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for Filter<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        Self {
            conditions: iter
                .into_iter()
                .map(|(name, value)| (name.into(), FilterValue::Equals(value)))
                .collect(),
            index_name: None,
        }
    }
}

fn add(
    compiled: &mut condition::CompiledCondition,
    key: &str,
    operator: condition::KeyOperator,
    value: &aws_sdk_dynamodb::types::AttributeValue,
) {
    if !compiled.add_condition(key, operator, value.clone()) {
        #[cfg(feature = "tracing")]
        tracing::debug!(key, "attribute already constrained, keeping the first value");
    }
}

/// Compile `filter` into a key condition for the table described by `schema`.
///
/// Each entry is checked against the secondary indexes first, in schema
/// order: matching an index hash key selects that index, matching an index
/// range key selects it only when its hash key was matched by an earlier
/// entry. Entries that match no index are then checked against the table's
/// own keys. Hash positions only take equality; a bound on an index hash
/// attribute is still checked against the table keys, so it is kept when
/// the attribute is the table's range key. The first selected index wins.
pub fn compile<T: Serialize>(
    schema: &schema::TableSchema,
    filter: Filter<T>,
) -> error::Result<condition::CompiledCondition> {
    let mut compiled = condition::CompiledCondition::default();
    let mut matched_hashes: Vec<&str> = Vec::new();
    let indexes: Vec<&schema::SecondaryIndex> = schema
        .secondary_indexes
        .iter()
        .filter(|index| {
            filter
                .index_name
                .as_deref()
                .is_none_or(|index_name| index_name == index.index_name)
        })
        .collect();
    if indexes.is_empty() && filter.index_name.is_some() {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            index = ?filter.index_name,
            table_name = %schema.table_name,
            "requested index does not exist, using table keys only"
        );
    }
    for (key, filter_value) in filter.conditions {
        let (is_bound, value) = match filter_value {
            FilterValue::Equals(value) => (false, value),
            FilterValue::LessThanOrEqual(value) => (true, value),
        };
        let value = to_attribute_value(value).map_err(error::Error::ConditionBuild)?;
        let range_operator = if is_bound {
            condition::KeyOperator::LessThanOrEqual
        } else {
            condition::KeyOperator::Equal
        };
        let mut index_used = false;
        for index in &indexes {
            if key == index.hash_attribute {
                if is_bound {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(key = %key, index = %index.index_name, "range bound on an index hash key ignored");
                    continue;
                }
                index_used = true;
                matched_hashes.push(&index.index_name);
                if compiled.select_index(&index.index_name) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(index = %index.index_name, "selected secondary index");
                }
                add(&mut compiled, &key, condition::KeyOperator::Equal, &value);
            } else if index.range_attribute.as_deref() == Some(key.as_str()) {
                index_used = true;
                if matched_hashes.contains(&index.index_name.as_str()) {
                    compiled.select_index(&index.index_name);
                }
                add(&mut compiled, &key, range_operator, &value);
            }
        }
        if index_used {
            continue;
        }
        if key == schema.hash_key {
            if is_bound {
                #[cfg(feature = "tracing")]
                tracing::debug!(key = %key, "range bound on the table hash key ignored");
                continue;
            }
            add(&mut compiled, &key, condition::KeyOperator::Equal, &value);
        } else if schema.range_key.as_deref() == Some(key.as_str()) {
            add(&mut compiled, &key, range_operator, &value);
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %key, table_name = %schema.table_name, "attribute is not a key, ignored");
        }
    }
    Ok(compiled)
}
