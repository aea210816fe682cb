//! Table key schemas and their per-client cache.

use crate::{error, store};

use aws_sdk_dynamodb::types;
use std::{collections, sync};
use tokio::sync::OnceCell;

/// Global secondary index as seen by the filter compiler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecondaryIndex {
    /// Name of the index.
    pub index_name: String,
    /// Partition key of the index.
    pub hash_attribute: String,
    /// Sort key of the index, if any.
    pub range_attribute: Option<String>,
}

/// Key layout of a table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableSchema {
    /// Table the schema was read from.
    pub table_name: String,
    /// Partition key attribute.
    pub hash_key: String,
    /// Sort key attribute, if any.
    pub range_key: Option<String>,
    /// Global secondary indexes in the order the table reports them.
    pub secondary_indexes: Vec<SecondaryIndex>,
}

fn key_attribute(key_schema: &[types::KeySchemaElement], key_type: types::KeyType) -> Option<String> {
    key_schema
        .iter()
        .find(|element| element.key_type() == &key_type)
        .map(|element| element.attribute_name().to_string())
}

impl TableSchema {
    /// Read the key schema out of a describe-table response.
    ///
    /// Indexes without a HASH key are skipped.
    pub fn from_description(
        table_name: &str,
        description: &types::TableDescription,
    ) -> error::Result<Self> {
        let hash_key = key_attribute(description.key_schema(), types::KeyType::Hash).ok_or_else(
            || error::Error::MissingHashKey {
                table_name: table_name.to_string(),
            },
        )?;
        let range_key = key_attribute(description.key_schema(), types::KeyType::Range);
        let secondary_indexes = description
            .global_secondary_indexes()
            .iter()
            .filter_map(|index| {
                let index_name = index.index_name()?.to_string();
                let hash_attribute = key_attribute(index.key_schema(), types::KeyType::Hash)?;
                let range_attribute = key_attribute(index.key_schema(), types::KeyType::Range);
                Some(SecondaryIndex {
                    index_name,
                    hash_attribute,
                    range_attribute,
                })
            })
            .collect();
        Ok(Self {
            table_name: table_name.to_string(),
            hash_key,
            range_key,
            secondary_indexes,
        })
    }
}

type Slot = sync::Arc<OnceCell<sync::Arc<TableSchema>>>;

/// Per-client cache of table schemas.
///
/// The first lookup of a table describes it through the store; concurrent
/// first lookups share that single call. Entries live until invalidated or
/// until the cache is dropped.
#[derive(Debug, Default)]
pub struct SchemaCache {
    slots: sync::Mutex<collections::HashMap<String, Slot>>,
}

impl SchemaCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, table_name: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(sync::PoisonError::into_inner);
        slots.entry(table_name.to_string()).or_default().clone()
    }

    /// Schema of `table_name`, describing the table on a cache miss.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "dynamodb_data_api.resolve_schema", skip_all, fields(table_name = %table_name), err)
    )]
    pub async fn resolve<S: store::TableStore>(
        &self,
        store: &S,
        table_name: &str,
    ) -> error::Result<sync::Arc<TableSchema>> {
        let slot = self.slot(table_name);
        let schema = slot
            .get_or_try_init(|| async {
                #[cfg(feature = "tracing")]
                tracing::debug!(table_name, "describing table to learn its key schema");
                let description = store.describe_table(table_name).await.map_err(|source| {
                    error::Error::SchemaLookup {
                        table_name: table_name.to_string(),
                        source,
                    }
                })?;
                TableSchema::from_description(table_name, &description).map(sync::Arc::new)
            })
            .await;
        match schema {
            Ok(schema) => Ok(schema.clone()),
            Err(err) => {
                self.forget_failed(table_name, &slot);
                Err(err)
            }
        }
    }

    /// Drop `slot` after a failed lookup, unless it was replaced or filled meanwhile.
    fn forget_failed(&self, table_name: &str, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(sync::PoisonError::into_inner);
        let stale = slots
            .get(table_name)
            .is_some_and(|current| sync::Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            slots.remove(table_name);
        }
    }

    /// Cached schema of `table_name`, without describing the table.
    pub fn get(&self, table_name: &str) -> Option<sync::Arc<TableSchema>> {
        let slots = self.slots.lock().unwrap_or_else(sync::PoisonError::into_inner);
        slots.get(table_name).and_then(|slot| slot.get().cloned())
    }

    /// Forget the schema of `table_name`.
    pub fn invalidate(&self, table_name: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(sync::PoisonError::into_inner);
        slots.remove(table_name);
    }

    /// Forget every schema.
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(sync::PoisonError::into_inner);
        slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::store::mock;
    use rstest::rstest;

    #[rstest]
    #[case::hash_only(
        mock::description("users", "email", None, vec![]),
        TableSchema {
            table_name: "users".to_string(),
            hash_key: "email".to_string(),
            range_key: None,
            secondary_indexes: vec![],
        }
    )]
    #[case::hash_range_and_indexes(
        mock::description(
            "events",
            "name",
            Some("date"),
            vec![
                ("team-index", "team", None),
                ("team-date-index", "team", Some("date")),
            ]
        ),
        TableSchema {
            table_name: "events".to_string(),
            hash_key: "name".to_string(),
            range_key: Some("date".to_string()),
            secondary_indexes: vec![
                SecondaryIndex {
                    index_name: "team-index".to_string(),
                    hash_attribute: "team".to_string(),
                    range_attribute: None,
                },
                SecondaryIndex {
                    index_name: "team-date-index".to_string(),
                    hash_attribute: "team".to_string(),
                    range_attribute: Some("date".to_string()),
                },
            ],
        }
    )]
    fn test_schema_from_description(
        #[case] description: types::TableDescription,
        #[case] expected: TableSchema,
    ) {
        let actual = TableSchema::from_description(&expected.table_name, &description).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_schema_without_hash_key() {
        let description = types::TableDescription::builder()
            .table_name("broken")
            .build();
        let err = TableSchema::from_description("broken", &description).unwrap_err();
        assert!(matches!(err, error::Error::MissingHashKey { ref table_name } if table_name == "broken"));
    }

    #[tokio::test]
    async fn test_resolve_describes_once() {
        let store = mock::MockStore::new();
        store.add_table(mock::description("events", "name", Some("date"), vec![]));
        let cache = SchemaCache::new();
        let first = cache.resolve(&store, "events").await.unwrap();
        let second = cache.resolve(&store, "events").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.describe_calls("events"), 1);
        assert!(cache.get("events").is_some());
    }

    #[tokio::test]
    async fn test_concurrent_resolve_is_coalesced() {
        let store = mock::MockStore::new();
        store.add_table(mock::description("events", "name", None, vec![]));
        let cache = SchemaCache::new();
        let (first, second) = tokio::join!(
            cache.resolve(&store, "events"),
            cache.resolve(&store, "events")
        );
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(store.describe_calls("events"), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_lookup() {
        let store = mock::MockStore::new();
        store.add_table(mock::description("events", "name", None, vec![]));
        let cache = SchemaCache::new();
        cache.resolve(&store, "events").await.unwrap();
        cache.invalidate("events");
        assert!(cache.get("events").is_none());
        cache.resolve(&store, "events").await.unwrap();
        cache.clear();
        cache.resolve(&store, "events").await.unwrap();
        assert_eq!(store.describe_calls("events"), 3);
    }

    #[tokio::test]
    async fn test_resolve_missing_table() {
        let store = mock::MockStore::new();
        let cache = SchemaCache::new();
        let err = cache.resolve(&store, "ghost").await.unwrap_err();
        match err {
            error::Error::SchemaLookup { table_name, source } => {
                assert_eq!(table_name, "ghost");
                assert!(source.is_resource_not_found());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(cache.get("ghost").is_none());
        assert!(
            !cache
                .slots
                .lock()
                .unwrap()
                .contains_key("ghost")
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_is_retried() {
        let store = mock::MockStore::new();
        let cache = SchemaCache::new();
        assert!(cache.resolve(&store, "events").await.is_err());
        store.add_table(mock::description("events", "name", None, vec![]));
        let schema = cache.resolve(&store, "events").await.unwrap();
        assert_eq!(schema.hash_key, "name");
        assert_eq!(store.describe_calls("events"), 2);
        assert_eq!(cache.slots.lock().unwrap().len(), 1);
    }
}
