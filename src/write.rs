//! Write requests: puts, updates, deletes and batched puts/deletes.

/// Batch write item operation for writing many items in store-sized batches.
pub mod batch_write_item;

/// Common utilities and types for write operations.
pub mod common;

/// Delete item operation for removing items from tables.
pub mod delete_item;

/// Put item operation for creating or replacing items.
pub mod put_item;

/// Update item operation for modifying existing items.
pub mod update_item;
