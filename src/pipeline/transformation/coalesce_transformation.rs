use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::{DataSet, DuctoError, Schema, Value};

use super::Transformation;

/// Replaces a column with the first non-null value among itself and a
/// list of fallback columns. All columns must exist, all-null stays null.
#[derive(Debug)]
pub struct CoalesceTransformation {
    column_name: String,
    fallback_names: Vec<String>,
    target_index: usize,
    fallback_indices: Vec<usize>,
}

impl CoalesceTransformation {
    pub fn create(
        input_schema: &Schema,
        column_name: String,
        fallback_columns: Vec<String>,
    ) -> Result<Box<dyn Transformation>, DuctoError> {
        let target_index = input_schema.require_index(&column_name)?;
        let fallback_indices = fallback_columns
            .iter()
            .map(|name| input_schema.require_index(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(Self {
            column_name,
            fallback_names: fallback_columns,
            target_index,
            fallback_indices,
        }))
    }
}

impl Transformation for CoalesceTransformation {
    fn get_output_schema(&self, input_schema: &Schema) -> Schema {
        input_schema.clone()
    }

    fn transform(&self, dataset: Box<dyn DataSet>) -> Result<Box<dyn DataSet>, DuctoError> {
        Ok(Box::new(CoalescedDataSet {
            input: dataset,
            target_index: self.target_index,
            fallback_indices: Arc::new(self.fallback_indices.clone()),
        }))
    }

    fn dump(&self) -> String {
        format!(
            "coalesce {} <- [{}]",
            self.column_name,
            self.fallback_names.join(", ")
        )
    }
}

struct CoalescedDataSet {
    input: Box<dyn DataSet>,
    target_index: usize,
    fallback_indices: Arc<Vec<usize>>,
}

#[async_trait]
impl DataSet for CoalescedDataSet {
    fn schema(&self) -> &Schema {
        self.input.schema()
    }

    async fn next(&mut self) -> Option<Vec<Value>> {
        let mut row = self.input.next().await?;
        if matches!(row[self.target_index], Value::Null) {
            for &index in self.fallback_indices.iter() {
                if !matches!(row[index], Value::Null) {
                    row[self.target_index] = row[index].clone();
                    break;
                }
            }
        }
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{
        Column, DataSetCreator, DuctoError, Schema, TransformOp, TransformStage, Value, ValueType,
    };

    #[tokio::test]
    async fn first_non_null_wins() {
        let schema = Schema::from(vec![
            Column::new("a", ValueType::String),
            Column::new("b", ValueType::String),
            Column::new("c", ValueType::String),
        ]);
        let ds = DataSetCreator::eager(
            schema,
            vec![
                vec![Value::Null, Value::Null, Value::from("x")],
                vec![Value::Null, Value::from("y"), Value::from("z")],
                vec![Value::from("k"), Value::from("y"), Value::from("z")],
                vec![Value::Null, Value::Null, Value::Null],
            ],
        );
        let mut out =
            TransformStage::apply(ds, &[TransformOp::coalesce("a", vec!["b", "c"])]).unwrap();
        let (_, rows) = out.eval().await;
        assert_eq!(rows[0][0], Value::from("x"));
        assert_eq!(rows[1][0], Value::from("y"));
        assert_eq!(rows[2][0], Value::from("k"));
        assert_eq!(rows[3][0], Value::Null);
    }

    #[tokio::test]
    async fn missing_fallback_column_fails_with_op_index() {
        let schema = Schema::from(vec![Column::new("a", ValueType::String)]);
        let ds = DataSetCreator::eager(schema, vec![vec![Value::Null]]);
        let err = TransformStage::apply(ds, &[TransformOp::coalesce("a", vec!["nope"])])
            .err()
            .unwrap();
        assert!(matches!(
            err,
            DuctoError::OpApply { index: 0, source } if matches!(*source, DuctoError::ColumnNotFound(_))
        ));
    }
}
