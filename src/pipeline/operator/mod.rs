use std::fmt::Debug;

use super::{DuctoError, Value, ValueType};

mod comparison_op;
mod logical_op;
mod math_op;
mod unary_op;

pub use comparison_op::{
    EqualOperator, GreaterEqualOperator, GreaterThanOperator, LessEqualOperator, LessThanOperator,
    NotEqualOperator,
};
pub use logical_op::{AndOperator, OrOperator};
pub use math_op::{
    DivideOperator, MinusOperator, ModuloOperator, MultiplyOperator, PlusOperator,
};
pub use unary_op::{IsNotNullOperator, IsNullOperator, NegativeOperator, NotOperator};

pub trait Operator: Send + Sync + Debug {
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError>;

    fn eval(&self, arguments: Vec<Value>) -> Value;

    fn dump(&self, arguments: Vec<String>) -> String;
}
