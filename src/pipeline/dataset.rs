use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{DuctoError, Value, ValueType};

/**
 * The column definition
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /**
     * Column name
     */
    pub name: String,

    /**
     * Column type
     */
    pub column_type: ValueType,

    /**
     * Whether null values are allowed
     */
    pub nullable: bool,
}

impl Column {
    pub fn new<T>(name: T, column_type: ValueType) -> Self
    where
        T: ToString,
    {
        Self {
            name: name.to_string(),
            column_type,
            nullable: true,
        }
    }

    pub fn not_null<T>(name: T, column_type: ValueType) -> Self
    where
        T: ToString,
    {
        Self {
            name: name.to_string(),
            column_type,
            nullable: false,
        }
    }
}

/**
 * Schema is an ordered collection of columns with unique names
 */
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl<T> From<T> for Schema
where
    T: IntoIterator<Item = Column>,
{
    fn from(columns: T) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }
}

impl FromIterator<Column> for Schema {
    fn from_iter<T: IntoIterator<Item = Column>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl Schema {
    pub fn get_column_types(&self) -> Vec<ValueType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }

    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name == column_name)
    }

    /// Resolve a column name, failing with ColumnNotFound.
    pub fn require_index(&self, column_name: &str) -> Result<usize, DuctoError> {
        self.get_column_index(column_name)
            .ok_or_else(|| DuctoError::ColumnNotFound(column_name.to_string()))
    }

    /// Column names must be unique within a schema.
    pub fn validate(&self) -> Result<(), DuctoError> {
        for (i, c) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|o| o.name == c.name) {
                return Err(DuctoError::ValidationError(format!(
                    "Duplicated column name '{}'",
                    c.name
                )));
            }
        }
        Ok(())
    }

    pub fn dump(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} as {}", c.name, c.column_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/**
 * The DataSet interface
 * A DataSet is a sequence of rows, each row is a sequence of fields.
 * DataSet works like an iterator, it can only be consumed once.
 */
#[async_trait]
pub trait DataSet: Sync + Send {
    /**
     * Get the schema of the data set
     */
    fn schema(&self) -> &Schema;

    /**
     * Get the next row of the data set, returns None if there is no more row
     */
    async fn next(&mut self) -> Option<Vec<Value>>;

    /**
     * Drain all remaining rows of the data set
     */
    async fn eval(&mut self) -> (Schema, Vec<Vec<Value>>) {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row);
        }
        (self.schema().clone(), rows)
    }

    /**
     * Drain all rows, turning the first in-band error field into a failure
     */
    async fn try_eval(&mut self) -> Result<(Schema, Vec<Vec<Value>>), DuctoError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            for field in &row {
                if let Value::Error(e) = field {
                    return Err(e.clone());
                }
            }
            rows.push(row);
        }
        Ok((self.schema().clone(), rows))
    }
}

/**
 * Validate if the data set is aligned with the schema
 */
#[derive(Copy, Debug, Clone)]
pub enum ValidationMode {
    /**
     * Strict mode turns every field that doesn't match the schema into error
     */
    Strict,
    /**
     * Lenient mode tries to convert the field into the schema type
     */
    Lenient,
}

pub struct ValidatedDataSet {
    data_set: Box<dyn DataSet>,
    mode: ValidationMode,
}

impl ValidatedDataSet {
    pub fn new(data_set: Box<dyn DataSet>, mode: ValidationMode) -> Self {
        Self { data_set, mode }
    }
}

pub trait Validated {
    fn validated(self, mode: ValidationMode) -> Box<dyn DataSet>;
}

impl Validated for Box<dyn DataSet> {
    fn validated(self, mode: ValidationMode) -> Box<dyn DataSet> {
        Box::new(ValidatedDataSet::new(self, mode))
    }
}

#[async_trait]
impl DataSet for ValidatedDataSet {
    fn schema(&self) -> &Schema {
        self.data_set.schema()
    }

    async fn next(&mut self) -> Option<Vec<Value>> {
        self.data_set.next().await.map(|mut row| {
            // Make sure row is not longer than schema
            row.truncate(self.schema().columns.len());
            // Some fields may be missing
            let missing = row.len()..self.schema().columns.len();
            row.into_iter()
                .enumerate()
                .map(|(idx, v)| {
                    let column = &self.schema().columns[idx];
                    if column.column_type == v.value_type() {
                        v
                    } else if v.is_null() {
                        if column.nullable {
                            v
                        } else {
                            Value::Error(DuctoError::ValidationError(format!(
                                "Column {} is not nullable",
                                column.name
                            )))
                        }
                    } else {
                        let result = match self.mode {
                            ValidationMode::Strict => v.try_cast(column.column_type),
                            ValidationMode::Lenient => v.try_convert(column.column_type),
                        };
                        result.unwrap_or_else(Value::Error)
                    }
                })
                .chain(missing.map(|idx| {
                    // Fill missing fields with error
                    Value::Error(DuctoError::ValidationError(format!(
                        "Column {} is missing in the input data set",
                        self.schema().columns[idx].name,
                    )))
                }))
                .collect()
        })
    }
}

/**
 * Some common operations to create a data set
 */
pub struct DataSetCreator;

impl DataSetCreator {
    /**
     * Create an empty data set which contains no row
     */
    pub fn empty(schema: Schema) -> Box<dyn DataSet> {
        EagerDataSet::new(schema, vec![])
    }

    /**
     * Create a data set from a vector of rows
     */
    pub fn eager<T>(schema: Schema, rows: T) -> Box<dyn DataSet>
    where
        T: IntoIterator<Item = Vec<Value>>,
    {
        EagerDataSet::new(schema, rows.into_iter().collect())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct EagerDataSet {
    schema: Schema,
    rows: VecDeque<Vec<Value>>,
}

impl EagerDataSet {
    pub(crate) fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Box<Self> {
        Box::new(Self {
            schema,
            rows: rows.into(),
        })
    }
}

#[async_trait]
impl DataSet for EagerDataSet {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn next(&mut self) -> Option<Vec<Value>> {
        self.rows.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gen_schema() -> Schema {
        vec![
            Column::new("col1", ValueType::Int),
            Column::new("col2", ValueType::String),
            Column::new("col3", ValueType::Bool),
        ]
        .into()
    }

    fn gen_ds() -> Box<dyn DataSet> {
        DataSetCreator::eager(
            gen_schema(),
            vec![
                vec![Value::from(10), Value::from(100), Value::from(true)],
                vec![Value::from(20), Value::from("foo"), Value::from(true)],
                vec![Value::from(30), Value::Null, Value::from(false)],
            ],
        )
    }

    #[tokio::test]
    async fn test_strict_validate() {
        let (schema, rows) = gen_ds().validated(ValidationMode::Strict).eval().await;
        assert_eq!(schema, gen_schema());
        assert_eq!(rows.len(), 3);
        // Int in a string column cannot be cast in strict mode
        assert!(matches!(
            rows[0].as_slice(),
            [Value::Int(10), Value::Error(_), Value::Bool(true)]
        ));
        assert!(matches!(
            rows[1].as_slice(),
            [Value::Int(20), Value::String(_), Value::Bool(true)]
        ));
        // Nulls pass through nullable columns in both modes
        assert!(matches!(
            rows[2].as_slice(),
            [Value::Int(30), Value::Null, Value::Bool(false)]
        ));
    }

    #[tokio::test]
    async fn test_lenient_validate() {
        let (_, rows) = gen_ds().validated(ValidationMode::Lenient).eval().await;
        assert_eq!(rows.len(), 3);
        assert!(matches!(
            rows[0].as_slice(),
            [Value::Int(10), Value::String(_), Value::Bool(true)]
        ));
    }

    #[tokio::test]
    async fn test_not_null_column() {
        let schema = Schema::from(vec![Column::not_null("a", ValueType::Int)]);
        let (_, rows) = DataSetCreator::eager(schema, vec![vec![Value::Null]])
            .validated(ValidationMode::Strict)
            .eval()
            .await;
        assert!(matches!(rows[0].as_slice(), [Value::Error(_)]));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let schema = Schema::from(vec![
            Column::new("a", ValueType::Int),
            Column::new("a", ValueType::String),
        ]);
        assert!(schema.validate().is_err());
    }

    #[tokio::test]
    async fn test_try_eval_surfaces_error() {
        let schema = Schema::from(vec![Column::new("a", ValueType::Int)]);
        let err = DataSetCreator::eager(
            schema,
            vec![vec![Value::Error(DuctoError::Unknown("boom".into()))]],
        )
        .try_eval()
        .await;
        assert!(err.is_err());
    }
}
