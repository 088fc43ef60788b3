use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::{expression::Expression, Column, DataSet, DuctoError, Schema, Value};

use super::Transformation;

/// Computes one expression per row and writes it to a named column,
/// overwriting the column in place when it exists, appending otherwise.
#[derive(Debug)]
pub struct DeriveTransformation {
    column_name: String,
    target_index: usize,
    append: bool,
    expression: Arc<dyn Expression>,
    output_schema: Arc<Schema>,
}

impl DeriveTransformation {
    pub fn create(
        input_schema: &Schema,
        column_name: String,
        expression: Box<dyn Expression>,
    ) -> Result<Box<dyn Transformation>, DuctoError> {
        if column_name.is_empty() {
            return Err(DuctoError::ValidationError(
                "derive column name cannot be empty".to_string(),
            ));
        }
        let column_type = expression.get_output_type(&input_schema.get_column_types())?;
        let mut columns = input_schema.columns.clone();
        let (target_index, append) = match input_schema.get_column_index(&column_name) {
            Some(index) => {
                columns[index] = Column::new(column_name.clone(), column_type);
                (index, false)
            }
            None => {
                columns.push(Column::new(column_name.clone(), column_type));
                (columns.len() - 1, true)
            }
        };
        Ok(Box::new(Self {
            column_name,
            target_index,
            append,
            expression: expression.into(),
            output_schema: Arc::new(columns.into()),
        }))
    }
}

impl Transformation for DeriveTransformation {
    fn get_output_schema(&self, _input_schema: &Schema) -> Schema {
        self.output_schema.as_ref().clone()
    }

    fn transform(&self, dataset: Box<dyn DataSet>) -> Result<Box<dyn DataSet>, DuctoError> {
        Ok(Box::new(DerivedDataSet {
            input: dataset,
            target_index: self.target_index,
            append: self.append,
            expression: self.expression.clone(),
            output_schema: self.output_schema.clone(),
        }))
    }

    fn dump(&self) -> String {
        format!("derive {} = {}", self.column_name, self.expression.dump())
    }
}

struct DerivedDataSet {
    input: Box<dyn DataSet>,
    target_index: usize,
    append: bool,
    expression: Arc<dyn Expression>,
    output_schema: Arc<Schema>,
}

#[async_trait]
impl DataSet for DerivedDataSet {
    fn schema(&self) -> &Schema {
        &self.output_schema
    }

    async fn next(&mut self) -> Option<Vec<Value>> {
        let mut row = self.input.next().await?;
        let value = self.expression.eval(&row);
        if self.append {
            row.push(value);
        } else {
            row[self.target_index] = value;
        }
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{
        col, lit, Column, DataSetCreator, Schema, TransformOp, TransformStage, Value, ValueType,
    };

    #[tokio::test]
    async fn derive_appends_new_column() {
        let schema = Schema::from(vec![Column::new("a", ValueType::Int)]);
        let ds = DataSetCreator::eager(schema, vec![vec![Value::Int(2)], vec![Value::Int(3)]]);
        let mut out = TransformStage::apply(
            ds,
            &[TransformOp::derive("b", col("a").multiply(lit(10)))],
        )
        .unwrap();
        let (schema, rows) = out.eval().await;
        assert_eq!(schema.columns[1].name, "b");
        assert_eq!(rows[0], vec![Value::Int(2), Value::Int(20)]);
        assert_eq!(rows[1], vec![Value::Int(3), Value::Int(30)]);
    }

    #[tokio::test]
    async fn derive_overwrites_in_place() {
        let schema = Schema::from(vec![
            Column::new("a", ValueType::Int),
            Column::new("b", ValueType::Int),
        ]);
        let ds = DataSetCreator::eager(schema, vec![vec![Value::Int(2), Value::Int(9)]]);
        let mut out =
            TransformStage::apply(ds, &[TransformOp::derive("a", col("a").plus(lit(1)))]).unwrap();
        let (schema, rows) = out.eval().await;
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(rows[0], vec![Value::Int(3), Value::Int(9)]);
    }
}
