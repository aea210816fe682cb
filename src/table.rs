//! Table management requests.

/// Create table operation built from a table descriptor.
pub mod create_table;
