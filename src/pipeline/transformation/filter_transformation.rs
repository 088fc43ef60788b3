use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::{expression::Expression, DataSet, DuctoError, Schema, Value};

use super::Transformation;

/// Keeps only the rows whose predicate evaluates to true.
/// False, null (unknown), and evaluation errors all drop the row.
#[derive(Debug)]
pub struct FilterTransformation {
    pub predicate: Arc<dyn Expression>,
}

impl FilterTransformation {
    pub fn new(predicate: Box<dyn Expression>) -> Box<Self> {
        Box::new(Self {
            predicate: predicate.into(),
        })
    }
}

impl Transformation for FilterTransformation {
    fn get_output_schema(&self, input_schema: &Schema) -> Schema {
        input_schema.clone()
    }

    fn transform(&self, dataset: Box<dyn DataSet>) -> Result<Box<dyn DataSet>, DuctoError> {
        Ok(Box::new(FilteredDataSet {
            input: dataset,
            predicate: self.predicate.clone(),
        }))
    }

    fn dump(&self) -> String {
        format!("filter {}", self.predicate.dump())
    }
}

struct FilteredDataSet {
    input: Box<dyn DataSet>,
    predicate: Arc<dyn Expression>,
}

#[async_trait]
impl DataSet for FilteredDataSet {
    fn schema(&self) -> &Schema {
        self.input.schema()
    }

    async fn next(&mut self) -> Option<Vec<Value>> {
        loop {
            let row = self.input.next().await?;
            match self.predicate.eval(&row) {
                Value::Bool(true) => return Some(row),
                // False, unknown, and error all filter the row out
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{
        col, lit, Column, DataSetCreator, Schema, TransformOp, TransformStage, Value, ValueType,
    };

    #[tokio::test]
    async fn null_predicate_drops_row() {
        let schema = Schema::from(vec![
            Column::new("id", ValueType::String),
            Column::new("age", ValueType::Int),
        ]);
        let ds = DataSetCreator::eager(
            schema,
            vec![
                vec![Value::from("a"), Value::Int(17)],
                vec![Value::from("b"), Value::Null],
                vec![Value::from("c"), Value::Int(40)],
            ],
        );
        let mut out =
            TransformStage::apply(ds, &[TransformOp::filter(col("age").gt(lit(18)))]).unwrap();
        let (_, rows) = out.eval().await;
        assert_eq!(rows, vec![vec![Value::from("c"), Value::Int(40)]]);
    }
}
