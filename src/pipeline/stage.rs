use tracing::debug;

use super::expression::Expr;
use super::transformation::{
    CoalesceTransformation, DeriveTransformation, FilterTransformation, Transformation, WindowKind,
    WindowTransformation,
};
use super::{DataSet, DuctoError, Schema};

/// A declarative transform step. Column references are names, resolved
/// against the live schema when the op is applied, not when it is built.
#[derive(Clone, Debug)]
pub enum TransformOp {
    Filter(Expr),
    Derive {
        column: String,
        expr: Expr,
    },
    Coalesce {
        column: String,
        fallback_columns: Vec<String>,
    },
    Window {
        kind: WindowKind,
        partition_columns: Vec<String>,
        order_columns: Vec<String>,
        target_column: String,
    },
}

impl TransformOp {
    pub fn filter(predicate: Expr) -> Self {
        TransformOp::Filter(predicate)
    }

    pub fn derive<T: Into<String>>(column: T, expr: Expr) -> Self {
        TransformOp::Derive {
            column: column.into(),
            expr,
        }
    }

    pub fn coalesce<T, U>(column: T, fallback_columns: Vec<U>) -> Self
    where
        T: Into<String>,
        U: Into<String>,
    {
        TransformOp::Coalesce {
            column: column.into(),
            fallback_columns: fallback_columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn window<T, U>(
        kind: WindowKind,
        partition_columns: Vec<U>,
        order_columns: Vec<U>,
        target_column: T,
    ) -> Self
    where
        T: Into<String>,
        U: Into<String>,
    {
        TransformOp::Window {
            kind,
            partition_columns: partition_columns.into_iter().map(Into::into).collect(),
            order_columns: order_columns.into_iter().map(Into::into).collect(),
            target_column: target_column.into(),
        }
    }

    fn build(&self, input_schema: &Schema) -> Result<Box<dyn Transformation>, DuctoError> {
        match self {
            TransformOp::Filter(predicate) => {
                Ok(FilterTransformation::new(predicate.bind(input_schema)?) as Box<dyn Transformation>)
            }
            TransformOp::Derive { column, expr } => DeriveTransformation::create(
                input_schema,
                column.clone(),
                expr.bind(input_schema)?,
            ),
            TransformOp::Coalesce {
                column,
                fallback_columns,
            } => CoalesceTransformation::create(
                input_schema,
                column.clone(),
                fallback_columns.clone(),
            ),
            TransformOp::Window {
                kind,
                partition_columns,
                order_columns,
                target_column,
            } => WindowTransformation::create(
                input_schema,
                *kind,
                partition_columns.clone(),
                order_columns.clone(),
                target_column.clone(),
            ),
        }
    }
}

/// Applies an ordered list of ops, each one wrapping the dataset lazily.
pub struct TransformStage;

impl TransformStage {
    pub fn apply(
        mut dataset: Box<dyn DataSet>,
        ops: &[TransformOp],
    ) -> Result<Box<dyn DataSet>, DuctoError> {
        for (index, op) in ops.iter().enumerate() {
            let schema = dataset.schema().clone();
            let transformation = op.build(&schema).map_err(|e| e.in_op(index))?;
            debug!("Applying op {}: {}", index, transformation.dump());
            dataset = transformation
                .transform(dataset)
                .map_err(|e| e.in_op(index))?;
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{col, lit, Column, DataSetCreator, Value, ValueType};

    #[tokio::test]
    async fn ops_see_the_evolving_schema() {
        let schema = Schema::from(vec![Column::new("a", ValueType::Int)]);
        let ds = DataSetCreator::eager(
            schema,
            vec![vec![Value::Int(1)], vec![Value::Int(5)]],
        );
        // The second op references the column the first one created
        let mut out = TransformStage::apply(
            ds,
            &[
                TransformOp::derive("b", col("a").multiply(lit(2))),
                TransformOp::filter(col("b").gt(lit(5))),
            ],
        )
        .unwrap();
        let (_, rows) = out.eval().await;
        assert_eq!(rows, vec![vec![Value::Int(5), Value::Int(10)]]);
    }

    #[tokio::test]
    async fn bind_failure_carries_the_op_position() {
        let schema = Schema::from(vec![Column::new("a", ValueType::Int)]);
        let ds = DataSetCreator::eager(schema, vec![vec![Value::Int(1)]]);
        let err = TransformStage::apply(
            ds,
            &[
                TransformOp::filter(col("a").gt(lit(0))),
                TransformOp::filter(col("missing").gt(lit(0))),
            ],
        )
        .err()
        .unwrap();
        assert!(matches!(err, DuctoError::OpApply { index: 1, .. }));
    }
}
