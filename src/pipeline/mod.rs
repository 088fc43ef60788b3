mod dataset;
mod errors;
mod expression;
mod function;
mod operator;
mod stage;
mod transformation;
pub mod value;

pub use dataset::{
    Column, DataSet, DataSetCreator, Schema, Validated, ValidatedDataSet, ValidationMode,
};
pub use errors::{DuctoError, StageKind};
pub use expression::{col, lit, Expr, Expression};
pub use function::{binary_fn, get_function, nullary_fn, ternary_fn, unary_fn, var_fn, Function};
pub use stage::{TransformOp, TransformStage};
pub use transformation::{Transformation, WindowKind};
pub use value::{Value, ValueType, ValueTypeOf};
