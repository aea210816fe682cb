//! In-memory table store used by unit tests.
//!
//! Evaluates the expressions produced by this crate (`=` and `<=` key
//! conditions joined by `and`, `SET`/`REMOVE` updates, flat projections) and
//! can inject failures, unprocessed batch requests and slow table creation.

use crate::{common, error, read, store, table, write};

use aws_sdk_dynamodb::types;
use std::{cmp, collections, sync};

struct Table {
    description: types::TableDescription,
    items: Vec<common::Item>,
    pending_polls: usize,
}

impl Table {
    fn key_attributes(&self, index_name: Option<&str>) -> (Option<String>, Option<String>) {
        let key_schema = match index_name {
            Some(index_name) => self
                .description
                .global_secondary_indexes()
                .iter()
                .find(|index| index.index_name() == Some(index_name))
                .map(|index| index.key_schema())
                .unwrap_or_default(),
            None => self.description.key_schema(),
        };
        let find = |key_type: types::KeyType| {
            key_schema
                .iter()
                .find(|element| element.key_type() == &key_type)
                .map(|element| element.attribute_name().to_string())
        };
        (find(types::KeyType::Hash), find(types::KeyType::Range))
    }

    fn key_of(&self, item: &common::Item) -> Option<common::Item> {
        let (hash, range) = self.key_attributes(None);
        let mut key = common::Item::new();
        for name in hash.into_iter().chain(range) {
            key.insert(name.clone(), item.get(&name)?.clone());
        }
        Some(key)
    }

    fn position(&self, key: &common::Item) -> Option<usize> {
        self.items
            .iter()
            .position(|item| self.key_of(item).as_ref() == Some(key))
    }

    fn put(&mut self, item: common::Item) -> Result<Option<common::Item>, error::StoreError> {
        let key = self.key_of(&item).ok_or_else(|| {
            error::StoreError::new(
                "put_item",
                Some("ValidationException".to_string()),
                "item is missing a key attribute",
            )
        })?;
        match self.position(&key) {
            Some(position) => Ok(Some(std::mem::replace(&mut self.items[position], item))),
            None => {
                self.items.push(item);
                Ok(None)
            }
        }
    }

    fn delete(&mut self, key: &common::Item) -> Option<common::Item> {
        let position = self.position(key)?;
        Some(self.items.remove(position))
    }
}

#[derive(Default)]
struct State {
    tables: collections::BTreeMap<String, Table>,
    describe_calls: collections::HashMap<String, usize>,
    calls: collections::HashMap<&'static str, usize>,
    failures: Vec<(&'static str, String)>,
    unprocessed_rounds: usize,
    activation_polls: usize,
}

impl State {
    fn enter(&mut self, operation: &'static str) -> Result<(), error::StoreError> {
        *self.calls.entry(operation).or_default() += 1;
        match self
            .failures
            .iter()
            .position(|(failing, _)| *failing == operation)
        {
            Some(position) => {
                let (_, code) = self.failures.remove(position);
                Err(error::StoreError::new(
                    operation,
                    Some(code),
                    "injected failure",
                ))
            }
            None => Ok(()),
        }
    }

    fn table(
        &mut self,
        operation: &'static str,
        table_name: &str,
    ) -> Result<&mut Table, error::StoreError> {
        self.tables
            .get_mut(table_name)
            .ok_or_else(|| not_found(operation, table_name))
    }
}

fn not_found(operation: &'static str, table_name: &str) -> error::StoreError {
    error::StoreError::new(
        operation,
        Some("ResourceNotFoundException".to_string()),
        format!("table `{table_name}` not found"),
    )
}

fn key_schema_element(name: &str, key_type: types::KeyType) -> types::KeySchemaElement {
    types::KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .unwrap()
}

/// Active table description with the given keys and indexes `(name, hash, range)`.
pub(crate) fn description(
    table_name: &str,
    hash_key: &str,
    range_key: Option<&str>,
    indexes: Vec<(&str, &str, Option<&str>)>,
) -> types::TableDescription {
    let mut key_schema = vec![key_schema_element(hash_key, types::KeyType::Hash)];
    if let Some(range_key) = range_key {
        key_schema.push(key_schema_element(range_key, types::KeyType::Range));
    }
    let indexes: Vec<_> = indexes
        .into_iter()
        .map(|(index_name, hash, range)| {
            let mut key_schema = vec![key_schema_element(hash, types::KeyType::Hash)];
            if let Some(range) = range {
                key_schema.push(key_schema_element(range, types::KeyType::Range));
            }
            types::GlobalSecondaryIndexDescription::builder()
                .index_name(index_name)
                .set_key_schema(Some(key_schema))
                .build()
        })
        .collect();
    types::TableDescription::builder()
        .table_name(table_name)
        .set_key_schema(Some(key_schema))
        .set_global_secondary_indexes((!indexes.is_empty()).then_some(indexes))
        .table_status(types::TableStatus::Active)
        .build()
}

fn compare(left: &types::AttributeValue, right: &types::AttributeValue) -> Option<cmp::Ordering> {
    match (left, right) {
        (types::AttributeValue::N(left), types::AttributeValue::N(right)) => {
            let left: f64 = left.parse().ok()?;
            let right: f64 = right.parse().ok()?;
            left.partial_cmp(&right)
        }
        (types::AttributeValue::S(left), types::AttributeValue::S(right)) => Some(left.cmp(right)),
        (left, right) => (left == right).then_some(cmp::Ordering::Equal),
    }
}

fn resolve_name(names: Option<&collections::HashMap<String, String>>, token: &str) -> String {
    names
        .and_then(|names| names.get(token))
        .cloned()
        .unwrap_or_else(|| token.to_string())
}

fn matches_key_condition(
    item: &common::Item,
    expression: &str,
    names: Option<&collections::HashMap<String, String>>,
    values: Option<&common::Item>,
) -> bool {
    expression.split(" and ").all(|clause| {
        let (name, operator, value) = if let Some((name, value)) = clause.split_once(" <= ") {
            (name, cmp::Ordering::Less, value)
        } else if let Some((name, value)) = clause.split_once(" = ") {
            (name, cmp::Ordering::Equal, value)
        } else {
            return false;
        };
        let Some(expected) = values.and_then(|values| values.get(value.trim())) else {
            return false;
        };
        let Some(actual) = item.get(&resolve_name(names, name.trim())) else {
            return false;
        };
        match (operator, compare(actual, expected)) {
            (cmp::Ordering::Equal, Some(cmp::Ordering::Equal)) => true,
            (cmp::Ordering::Less, Some(ordering)) => ordering != cmp::Ordering::Greater,
            _ => false,
        }
    })
}

fn project(
    item: &common::Item,
    projection: Option<&str>,
    names: Option<&collections::HashMap<String, String>>,
) -> common::Item {
    match projection {
        Some(projection) => projection
            .split(", ")
            .filter_map(|token| {
                let name = resolve_name(names, token.trim());
                item.get(&name).map(|value| (name, value.clone()))
            })
            .collect(),
        None => item.clone(),
    }
}

fn add_numbers(
    current: Option<&types::AttributeValue>,
    delta: &types::AttributeValue,
    sign: f64,
) -> Option<types::AttributeValue> {
    let current = match current {
        Some(types::AttributeValue::N(current)) => current.parse::<f64>().ok()?,
        None => 0.0,
        Some(_) => return None,
    };
    let delta = match delta {
        types::AttributeValue::N(delta) => delta.parse::<f64>().ok()?,
        _ => return None,
    };
    Some(types::AttributeValue::N((current + sign * delta).to_string()))
}

fn apply_update(
    item: &mut common::Item,
    expression: &str,
    names: Option<&collections::HashMap<String, String>>,
    values: Option<&common::Item>,
) -> Result<(), error::StoreError> {
    let invalid = || {
        error::StoreError::new(
            "update_item",
            Some("ValidationException".to_string()),
            format!("unsupported update expression `{expression}`"),
        )
    };
    let (set, remove) = match expression.split_once("REMOVE ") {
        Some((set, remove)) => (set.trim(), Some(remove.trim())),
        None => (expression.trim(), None),
    };
    if let Some(set) = set.strip_prefix("SET ") {
        for clause in set.split(", ") {
            let tokens: Vec<_> = clause.split_whitespace().collect();
            let name = resolve_name(names, tokens.first().ok_or_else(invalid)?);
            let placeholder = *tokens.last().ok_or_else(invalid)?;
            let value = values
                .and_then(|values| values.get(placeholder))
                .ok_or_else(invalid)?;
            let updated = match tokens.as_slice() {
                [_, "=", _] => value.clone(),
                [_, "=", _, "+", _] => add_numbers(item.get(&name), value, 1.0).ok_or_else(invalid)?,
                [_, "=", _, "-", _] => add_numbers(item.get(&name), value, -1.0).ok_or_else(invalid)?,
                _ => return Err(invalid()),
            };
            item.insert(name, updated);
        }
    }
    if let Some(remove) = remove {
        for token in remove.split(", ") {
            item.remove(&resolve_name(names, token.trim()));
        }
    }
    Ok(())
}

/// Table store keeping every table in memory.
#[derive(Default)]
pub(crate) struct MockStore {
    state: sync::Mutex<State>,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn add_table(&self, description: types::TableDescription) {
        let table_name = description.table_name().unwrap().to_string();
        self.state().tables.insert(
            table_name,
            Table {
                description,
                items: Vec::new(),
                pending_polls: 0,
            },
        );
    }

    pub(crate) fn describe_calls(&self, table_name: &str) -> usize {
        self.state()
            .describe_calls
            .get(table_name)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn calls(&self, operation: &str) -> usize {
        self.state().calls.get(operation).copied().unwrap_or_default()
    }

    /// Fail the next call of `operation` with the service error `code`.
    pub(crate) fn fail_next(&self, operation: &'static str, code: &str) {
        self.state().failures.push((operation, code.to_string()));
    }

    /// Leave the last request of each of the next `rounds` batches unprocessed.
    pub(crate) fn leave_unprocessed(&self, rounds: usize) {
        self.state().unprocessed_rounds = rounds;
    }

    /// Report new tables as `CREATING` for `polls` describe calls.
    pub(crate) fn delay_activation(&self, polls: usize) {
        self.state().activation_polls = polls;
    }

    pub(crate) fn items(&self, table_name: &str) -> Vec<common::Item> {
        self.state()
            .tables
            .get(table_name)
            .map(|table| table.items.clone())
            .unwrap_or_default()
    }

    pub(crate) fn has_table(&self, table_name: &str) -> bool {
        self.state().tables.contains_key(table_name)
    }

    fn read(
        &self,
        operation: &'static str,
        input: read::common::MultipleReadInput,
        key_condition: Option<(&str, Option<bool>)>,
    ) -> Result<read::common::ReadOutput, error::StoreError> {
        let mut state = self.state();
        state.enter(operation)?;
        let table = state.table(operation, &input.table_name)?;
        let names = input.expression_attribute_names.as_ref();
        let values = input.expression_attribute_values.as_ref();
        let mut matching: Vec<_> = table
            .items
            .iter()
            .filter(|item| {
                key_condition.is_none_or(|(expression, _)| {
                    matches_key_condition(item, expression, names, values)
                })
            })
            .collect();
        if let Some((_, scan_index_forward)) = key_condition {
            let (_, range) = table.key_attributes(input.index_name.as_deref());
            if let Some(range) = range {
                matching.sort_by(|left, right| match (left.get(&range), right.get(&range)) {
                    (Some(left), Some(right)) => compare(left, right).unwrap_or(cmp::Ordering::Equal),
                    _ => cmp::Ordering::Equal,
                });
            }
            if scan_index_forward == Some(false) {
                matching.reverse();
            }
        }
        let scanned_count = table.items.len();
        if let Some(limit) = input.limit.and_then(|limit| usize::try_from(limit).ok()) {
            matching.truncate(limit);
        }
        let count = matching.len();
        let items = if input.select == Some(types::Select::Count) {
            Vec::new()
        } else {
            matching
                .into_iter()
                .map(|item| project(item, input.projection_expression.as_deref(), names))
                .collect()
        };
        Ok(read::common::ReadOutput {
            items,
            count,
            scanned_count,
        })
    }
}

impl store::TableStore for MockStore {
    async fn describe_table(
        &self,
        table_name: &str,
    ) -> Result<types::TableDescription, error::StoreError> {
        let mut state = self.state();
        *state
            .describe_calls
            .entry(table_name.to_string())
            .or_default() += 1;
        state.enter("describe_table")?;
        let table = state.table("describe_table", table_name)?;
        if table.pending_polls > 0 {
            table.pending_polls -= 1;
            let mut description = table.description.clone();
            description.table_status = Some(types::TableStatus::Creating);
            return Ok(description);
        }
        Ok(table.description.clone())
    }

    async fn list_tables(&self) -> Result<Vec<String>, error::StoreError> {
        let mut state = self.state();
        state.enter("list_tables")?;
        Ok(state.tables.keys().cloned().collect())
    }

    async fn create_table(
        &self,
        input: table::create_table::CreateTableInput,
    ) -> Result<types::TableDescription, error::StoreError> {
        let mut state = self.state();
        state.enter("create_table")?;
        if state.tables.contains_key(&input.table_name) {
            return Err(error::StoreError::new(
                "create_table",
                Some("ResourceInUseException".to_string()),
                format!("table `{}` already exists", input.table_name),
            ));
        }
        let indexes = input.global_secondary_indexes.map(|indexes| {
            indexes
                .into_iter()
                .map(|index| {
                    types::GlobalSecondaryIndexDescription::builder()
                        .index_name(index.index_name)
                        .set_key_schema(Some(index.key_schema))
                        .build()
                })
                .collect()
        });
        let description = types::TableDescription::builder()
            .table_name(&input.table_name)
            .set_key_schema(Some(input.key_schema))
            .set_attribute_definitions(Some(input.attribute_definitions))
            .set_global_secondary_indexes(indexes)
            .table_status(types::TableStatus::Active)
            .build();
        let pending_polls = state.activation_polls;
        let mut created = description.clone();
        created.table_status = Some(types::TableStatus::Creating);
        state.tables.insert(
            input.table_name,
            Table {
                description,
                items: Vec::new(),
                pending_polls,
            },
        );
        Ok(created)
    }

    async fn delete_table(&self, table_name: &str) -> Result<(), error::StoreError> {
        let mut state = self.state();
        state.enter("delete_table")?;
        state
            .tables
            .remove(table_name)
            .map(|_| ())
            .ok_or_else(|| not_found("delete_table", table_name))
    }

    async fn put_item(
        &self,
        input: write::put_item::PutItemInput,
    ) -> Result<Option<common::Item>, error::StoreError> {
        let mut state = self.state();
        state.enter("put_item")?;
        let table = state.table("put_item", &input.write_input.table_name)?;
        let old = table.put(input.item)?;
        Ok(old.filter(|_| input.write_input.return_values == Some(types::ReturnValue::AllOld)))
    }

    async fn get_item(
        &self,
        input: read::get_item::GetItemInput,
    ) -> Result<Option<common::Item>, error::StoreError> {
        let mut state = self.state();
        state.enter("get_item")?;
        let read_input = input.single_read_input;
        let table = state.table("get_item", &read_input.table_name)?;
        Ok(table.position(&input.key).map(|position| {
            project(
                &table.items[position],
                read_input.projection_expression.as_deref(),
                read_input.expression_attribute_names.as_ref(),
            )
        }))
    }

    async fn update_item(
        &self,
        input: write::update_item::UpdateItemInput,
    ) -> Result<Option<common::Item>, error::StoreError> {
        let mut state = self.state();
        state.enter("update_item")?;
        let write_input = input.write_input;
        let table = state.table("update_item", &write_input.table_name)?;
        let mut item = match table.position(&input.key) {
            Some(position) => table.items.remove(position),
            None => input.key.clone(),
        };
        let result = apply_update(
            &mut item,
            &input.update_expression,
            write_input.expression_attribute_names.as_ref(),
            write_input.expression_attribute_values.as_ref(),
        );
        table.items.push(item.clone());
        result?;
        Ok((write_input.return_values == Some(types::ReturnValue::AllNew)).then_some(item))
    }

    async fn delete_item(
        &self,
        input: write::delete_item::DeleteItemInput,
    ) -> Result<Option<common::Item>, error::StoreError> {
        let mut state = self.state();
        state.enter("delete_item")?;
        let table = state.table("delete_item", &input.write_input.table_name)?;
        let old = table.delete(&input.key);
        Ok(old.filter(|_| input.write_input.return_values == Some(types::ReturnValue::AllOld)))
    }

    async fn query(
        &self,
        input: read::query::QueryInput,
    ) -> Result<read::common::ReadOutput, error::StoreError> {
        self.read(
            "query",
            input.multiple_read_input,
            Some((&input.key_condition_expression, input.scan_index_forward)),
        )
    }

    async fn scan(
        &self,
        input: read::scan::ScanInput,
    ) -> Result<read::common::ReadOutput, error::StoreError> {
        self.read("scan", input.multiple_read_input, None)
    }

    async fn batch_write(
        &self,
        input: write::batch_write_item::BatchWriteItemInput,
    ) -> Result<Vec<types::WriteRequest>, error::StoreError> {
        let mut state = self.state();
        state.enter("batch_write")?;
        let table = state.table("batch_write", &input.table_name)?;
        let keys: Vec<_> = input
            .requests
            .iter()
            .filter_map(|request| match (&request.put_request, &request.delete_request) {
                (Some(put_request), _) => table.key_of(&put_request.item),
                (None, Some(delete_request)) => Some(delete_request.key.clone()),
                (None, None) => None,
            })
            .collect();
        if keys
            .iter()
            .enumerate()
            .any(|(position, key)| keys[..position].contains(key))
        {
            return Err(error::StoreError::new(
                "batch_write",
                Some("ValidationException".to_string()),
                "provided list of item keys contains duplicates",
            ));
        }
        let mut requests = input.requests;
        let unprocessed = if state.unprocessed_rounds > 0 && !requests.is_empty() {
            state.unprocessed_rounds -= 1;
            requests.split_off(requests.len() - 1)
        } else {
            Vec::new()
        };
        let table = state.table("batch_write", &input.table_name)?;
        for request in requests {
            if let Some(put_request) = request.put_request {
                table.put(put_request.item)?;
            } else if let Some(delete_request) = request.delete_request {
                table.delete(&delete_request.key);
            }
        }
        Ok(unprocessed)
    }
}
