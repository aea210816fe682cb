use crate::read;

use aws_sdk_dynamodb::{Client, error, operation};

/// Request-level form of [`Scan`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanInput {
    /// Table, limit and projection.
    pub multiple_read_input: read::common::MultipleReadInput,
}

/// Reads every item of a table, up to the limit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scan {
    /// Table, limit and projection.
    pub multiple_read_args: read::common::MultipleReadArgs,
}

impl From<Scan> for ScanInput {
    fn from(scan: Scan) -> Self {
        Self {
            multiple_read_input: scan.multiple_read_args.into(),
        }
    }
}

impl ScanInput {
    /// Execute the Scan operation, following pages up to the limit.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_data_api.scan",
            skip_all,
            fields(table_name = %self.multiple_read_input.table_name),
            err
        )
    )]
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<read::common::ReadOutput, error::SdkError<operation::scan::ScanError>> {
        let limit = self.multiple_read_input.limit;
        let mut paginator = crate::apply_multiple_read_input!(client.scan(), self.multiple_read_input)
            .into_paginator()
            .send();
        crate::get_paginated_output!(paginator, limit)
    }
}
