use aws_sdk_dynamodb::{Client, error, operation, types};
use indexmap::IndexMap;

/// Capacity units used when a descriptor leaves them unset.
pub const DEFAULT_CAPACITY_UNITS: i64 = 1;

/// Attribute of the table's primary key.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyAttribute {
    /// Attribute name.
    pub name: String,
    /// Scalar type of the attribute.
    pub attribute_type: types::ScalarAttributeType,
    /// `Hash` for the partition key, `Range` for the sort key.
    pub key_type: types::KeyType,
}

/// Global secondary index of a new table.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalSecondaryIndex {
    /// Index name.
    pub name: String,
    /// Partition key attribute and its type.
    pub hash: (String, types::ScalarAttributeType),
    /// Sort key attribute and its type.
    pub range: Option<(String, types::ScalarAttributeType)>,
    /// Attributes copied into the index; `KeysOnly` when `None`.
    pub projection_type: Option<types::ProjectionType>,
    /// Non-key attributes projected with `ProjectionType::Include`.
    pub include_attributes: Vec<String>,
    /// Read capacity units, [`DEFAULT_CAPACITY_UNITS`] when `None`.
    pub read_units: Option<i64>,
    /// Write capacity units, [`DEFAULT_CAPACITY_UNITS`] when `None`.
    pub write_units: Option<i64>,
}

impl GlobalSecondaryIndex {
    /// Keys-only index with default capacity.
    pub fn new(
        name: impl Into<String>,
        hash: impl Into<String>,
        hash_type: types::ScalarAttributeType,
    ) -> Self {
        Self {
            name: name.into(),
            hash: (hash.into(), hash_type),
            range: None,
            projection_type: None,
            include_attributes: Vec::new(),
            read_units: None,
            write_units: None,
        }
    }

    /// Add a sort key to the index.
    pub fn with_range(
        mut self,
        range: impl Into<String>,
        range_type: types::ScalarAttributeType,
    ) -> Self {
        self.range = Some((range.into(), range_type));
        self
    }
}

/// Descriptor of a table to create.
///
/// ```rust
/// use dynamodb_data_api::table::create_table::{CreateTable, CreateTableInput, GlobalSecondaryIndex};
/// use aws_sdk_dynamodb::types::ScalarAttributeType;
///
/// let table = CreateTable::new("events", "name", ScalarAttributeType::S)
///     .with_range("date", ScalarAttributeType::S)
///     .with_index(GlobalSecondaryIndex::new("team-index", "team", ScalarAttributeType::S));
/// let input = CreateTableInput::try_from(table).unwrap();
/// assert_eq!(input.attribute_definitions.len(), 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CreateTable {
    /// Table name.
    pub table_name: String,
    /// Primary key attributes.
    pub key_schema: Vec<KeyAttribute>,
    /// Global secondary indexes.
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    /// Read capacity units, [`DEFAULT_CAPACITY_UNITS`] when `None`.
    pub read_units: Option<i64>,
    /// Write capacity units, [`DEFAULT_CAPACITY_UNITS`] when `None`.
    pub write_units: Option<i64>,
    /// Enables a stream of item changes with this view type.
    pub stream_view_type: Option<types::StreamViewType>,
}

impl CreateTable {
    /// Table keyed by a partition key only.
    pub fn new(
        table_name: impl Into<String>,
        hash: impl Into<String>,
        hash_type: types::ScalarAttributeType,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            key_schema: vec![KeyAttribute {
                name: hash.into(),
                attribute_type: hash_type,
                key_type: types::KeyType::Hash,
            }],
            global_secondary_indexes: Vec::new(),
            read_units: None,
            write_units: None,
            stream_view_type: None,
        }
    }

    /// Add a sort key.
    pub fn with_range(
        mut self,
        range: impl Into<String>,
        range_type: types::ScalarAttributeType,
    ) -> Self {
        self.key_schema.push(KeyAttribute {
            name: range.into(),
            attribute_type: range_type,
            key_type: types::KeyType::Range,
        });
        self
    }

    /// Add a global secondary index.
    pub fn with_index(mut self, index: GlobalSecondaryIndex) -> Self {
        self.global_secondary_indexes.push(index);
        self
    }
}

/// Request-level form of [`CreateTable`].
#[derive(Clone, Debug, PartialEq)]
pub struct CreateTableInput {
    /// Table name.
    pub table_name: String,
    /// One definition per attribute used by a key, first declaration wins.
    pub attribute_definitions: Vec<types::AttributeDefinition>,
    /// Primary key.
    pub key_schema: Vec<types::KeySchemaElement>,
    /// Global secondary indexes, `None` when there are none.
    pub global_secondary_indexes: Option<Vec<types::GlobalSecondaryIndex>>,
    /// Table throughput.
    pub provisioned_throughput: types::ProvisionedThroughput,
    /// Stream settings.
    pub stream_specification: Option<types::StreamSpecification>,
}

fn key_schema_element(
    name: &str,
    key_type: types::KeyType,
) -> Result<types::KeySchemaElement, error::BuildError> {
    types::KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
}

fn provisioned_throughput(
    read_units: Option<i64>,
    write_units: Option<i64>,
) -> Result<types::ProvisionedThroughput, error::BuildError> {
    types::ProvisionedThroughput::builder()
        .read_capacity_units(read_units.unwrap_or(DEFAULT_CAPACITY_UNITS))
        .write_capacity_units(write_units.unwrap_or(DEFAULT_CAPACITY_UNITS))
        .build()
}

impl TryFrom<CreateTable> for CreateTableInput {
    type Error = error::BuildError;

    fn try_from(create_table: CreateTable) -> Result<Self, Self::Error> {
        let mut attribute_types = IndexMap::new();
        let mut key_schema = Vec::with_capacity(create_table.key_schema.len());
        for attribute in create_table.key_schema {
            key_schema.push(key_schema_element(&attribute.name, attribute.key_type)?);
            attribute_types
                .entry(attribute.name)
                .or_insert(attribute.attribute_type);
        }
        let mut global_secondary_indexes =
            Vec::with_capacity(create_table.global_secondary_indexes.len());
        for index in create_table.global_secondary_indexes {
            let (hash, hash_type) = index.hash;
            let mut index_key_schema = vec![key_schema_element(&hash, types::KeyType::Hash)?];
            attribute_types.entry(hash).or_insert(hash_type);
            if let Some((range, range_type)) = index.range {
                index_key_schema.push(key_schema_element(&range, types::KeyType::Range)?);
                attribute_types.entry(range).or_insert(range_type);
            }
            let projection_type = index
                .projection_type
                .unwrap_or(types::ProjectionType::KeysOnly);
            let non_key_attributes = (projection_type == types::ProjectionType::Include)
                .then_some(index.include_attributes);
            let projection = types::Projection::builder()
                .projection_type(projection_type)
                .set_non_key_attributes(non_key_attributes)
                .build();
            let global_secondary_index = types::GlobalSecondaryIndex::builder()
                .index_name(index.name)
                .set_key_schema(Some(index_key_schema))
                .projection(projection)
                .provisioned_throughput(provisioned_throughput(index.read_units, index.write_units)?)
                .build()?;
            global_secondary_indexes.push(global_secondary_index);
        }
        let mut attribute_definitions = Vec::with_capacity(attribute_types.len());
        for (name, attribute_type) in attribute_types {
            let definition = types::AttributeDefinition::builder()
                .attribute_name(name)
                .attribute_type(attribute_type)
                .build()?;
            attribute_definitions.push(definition);
        }
        let stream_specification = create_table
            .stream_view_type
            .map(|stream_view_type| {
                types::StreamSpecification::builder()
                    .stream_enabled(true)
                    .stream_view_type(stream_view_type)
                    .build()
            })
            .transpose()?;
        Ok(Self {
            table_name: create_table.table_name,
            attribute_definitions,
            key_schema,
            global_secondary_indexes: (!global_secondary_indexes.is_empty())
                .then_some(global_secondary_indexes),
            provisioned_throughput: provisioned_throughput(
                create_table.read_units,
                create_table.write_units,
            )?,
            stream_specification,
        })
    }
}

impl CreateTableInput {
    /// Execute the CreateTable operation, returning the description of the new table.
    pub async fn send(
        self,
        client: &Client,
    ) -> Result<types::TableDescription, error::SdkError<operation::create_table::CreateTableError>>
    {
        let output = client
            .create_table()
            .table_name(self.table_name)
            .set_attribute_definitions(Some(self.attribute_definitions))
            .set_key_schema(Some(self.key_schema))
            .set_global_secondary_indexes(self.global_secondary_indexes)
            .provisioned_throughput(self.provisioned_throughput)
            .set_stream_specification(self.stream_specification)
            .send()
            .await?;
        output
            .table_description
            .ok_or_else(|| error::SdkError::construction_failure(error::BuildError::missing_field(
                "table_description",
                "CreateTable returned no table description",
            )))
    }
}
