use std::fmt::Debug;
use std::sync::Arc;

use super::function::get_function;
use super::operator::{
    AndOperator, DivideOperator, EqualOperator, GreaterEqualOperator, GreaterThanOperator,
    IsNotNullOperator, IsNullOperator, LessEqualOperator, LessThanOperator, MinusOperator,
    ModuloOperator, MultiplyOperator, NegativeOperator, NotEqualOperator, NotOperator, Operator,
    OrOperator, PlusOperator,
};
use super::{DuctoError, Function, Schema, Value, ValueType};

pub trait Expression: Debug + Send + Sync {
    fn get_output_type(&self, schema: &[ValueType]) -> Result<ValueType, DuctoError>;

    fn eval(&self, row: &[Value]) -> Value;

    fn dump(&self) -> String;
}

#[derive(Debug)]
pub struct ColumnExpression {
    pub column_name: String,
    pub column_index: usize,
}

impl Expression for ColumnExpression {
    fn get_output_type(&self, schema: &[ValueType]) -> Result<ValueType, DuctoError> {
        if self.column_index >= schema.len() {
            // The index is resolved against the live schema at bind time
            panic!("Column index out of range");
        }
        Ok(schema[self.column_index])
    }

    fn eval(&self, row: &[Value]) -> Value {
        if self.column_index >= row.len() {
            panic!("Column index out of range");
        }
        row[self.column_index].clone()
    }

    fn dump(&self) -> String {
        self.column_name.to_owned()
    }
}

#[derive(Debug)]
pub struct LiteralExpression {
    pub value: Value,
}

impl Expression for LiteralExpression {
    fn get_output_type(&self, _schema: &[ValueType]) -> Result<ValueType, DuctoError> {
        Ok(self.value.value_type())
    }

    fn eval(&self, _row: &[Value]) -> Value {
        self.value.clone()
    }

    fn dump(&self) -> String {
        self.value.dump()
    }
}

#[derive(Debug)]
pub struct OperatorExpression {
    pub operator: Box<dyn Operator>,
    pub arguments: Vec<Box<dyn Expression>>,
}

impl Expression for OperatorExpression {
    fn get_output_type(&self, schema: &[ValueType]) -> Result<ValueType, DuctoError> {
        self.operator.get_output_type(
            &self
                .arguments
                .iter()
                .map(|arg| arg.get_output_type(schema))
                .collect::<Result<Vec<ValueType>, DuctoError>>()?,
        )
    }

    fn eval(&self, row: &[Value]) -> Value {
        let mut args: Vec<Value> = Vec::with_capacity(self.arguments.len());
        for arg in &self.arguments {
            let arg_value = arg.eval(row);
            if arg_value.is_error() {
                // Shortcut on sub-expression error
                return arg_value;
            }
            args.push(arg_value);
        }
        self.operator.eval(args)
    }

    fn dump(&self) -> String {
        self.operator
            .dump(self.arguments.iter().map(|e| e.dump()).collect::<Vec<_>>())
    }
}

pub struct FunctionExpression {
    pub name: String,
    pub function: Box<dyn Function>,
    pub arguments: Vec<Box<dyn Expression>>,
}

impl Debug for FunctionExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionExpression")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .finish()
    }
}

impl Expression for FunctionExpression {
    fn get_output_type(&self, schema: &[ValueType]) -> Result<ValueType, DuctoError> {
        self.function.get_output_type(
            &self
                .arguments
                .iter()
                .map(|arg| arg.get_output_type(schema))
                .collect::<Result<Vec<ValueType>, DuctoError>>()?,
        )
    }

    fn eval(&self, row: &[Value]) -> Value {
        let mut args: Vec<Value> = Vec::with_capacity(self.arguments.len());
        for arg in &self.arguments {
            let arg_value = arg.eval(row);
            if arg_value.is_error() {
                return arg_value;
            }
            args.push(arg_value);
        }
        self.function.eval(args)
    }

    fn dump(&self) -> String {
        format!(
            "{}({})",
            self.name,
            self.arguments
                .iter()
                .map(|e| e.dump())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/**
 * An unbound expression tree. Column references are plain names; `bind`
 * resolves them against a concrete schema to produce an evaluable
 * `Expression`, failing with ColumnNotFound on a miss. Binding happens at
 * apply time, so a bad reference never fails at construction time.
 */
#[derive(Debug, Clone)]
pub enum Expr {
    Column(String),
    Literal(Value),
    UnaryOp(UnaryOpKind, Arc<Expr>),
    BinaryOp(BinaryOpKind, Arc<Expr>, Arc<Expr>),
    Function(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Not,
    Negative,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpKind {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOpKind {
    fn operator(&self) -> Box<dyn Operator> {
        match self {
            BinaryOpKind::Plus => Box::new(PlusOperator),
            BinaryOpKind::Minus => Box::new(MinusOperator),
            BinaryOpKind::Multiply => Box::new(MultiplyOperator),
            BinaryOpKind::Divide => Box::new(DivideOperator),
            BinaryOpKind::Modulo => Box::new(ModuloOperator),
            BinaryOpKind::Lt => Box::new(LessThanOperator),
            BinaryOpKind::Gt => Box::new(GreaterThanOperator),
            BinaryOpKind::Le => Box::new(LessEqualOperator),
            BinaryOpKind::Ge => Box::new(GreaterEqualOperator),
            BinaryOpKind::Eq => Box::new(EqualOperator),
            BinaryOpKind::Ne => Box::new(NotEqualOperator),
            BinaryOpKind::And => Box::new(AndOperator),
            BinaryOpKind::Or => Box::new(OrOperator),
        }
    }
}

impl UnaryOpKind {
    fn operator(&self) -> Box<dyn Operator> {
        match self {
            UnaryOpKind::Not => Box::new(NotOperator),
            UnaryOpKind::Negative => Box::new(NegativeOperator),
            UnaryOpKind::IsNull => Box::new(IsNullOperator),
            UnaryOpKind::IsNotNull => Box::new(IsNotNullOperator),
        }
    }
}

impl Expr {
    pub fn bind(&self, schema: &Schema) -> Result<Box<dyn Expression>, DuctoError> {
        match self {
            Expr::Column(name) => {
                let column_index = schema.require_index(name)?;
                Ok(Box::new(ColumnExpression {
                    column_name: name.clone(),
                    column_index,
                }))
            }
            Expr::Literal(value) => Ok(Box::new(LiteralExpression {
                value: value.clone(),
            })),
            Expr::UnaryOp(kind, arg) => Ok(Box::new(OperatorExpression {
                operator: kind.operator(),
                arguments: vec![arg.bind(schema)?],
            })),
            Expr::BinaryOp(kind, left, right) => Ok(Box::new(OperatorExpression {
                operator: kind.operator(),
                arguments: vec![left.bind(schema)?, right.bind(schema)?],
            })),
            Expr::Function(name, args) => {
                let function = get_function(name)?;
                Ok(Box::new(FunctionExpression {
                    name: name.clone(),
                    function,
                    arguments: args
                        .iter()
                        .map(|a| a.bind(schema))
                        .collect::<Result<Vec<_>, _>>()?,
                }))
            }
        }
    }

    fn binary(self, kind: BinaryOpKind, other: Expr) -> Expr {
        Expr::BinaryOp(kind, Arc::new(self), Arc::new(other))
    }

    pub fn plus(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Plus, other)
    }

    pub fn minus(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Minus, other)
    }

    pub fn multiply(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Multiply, other)
    }

    pub fn divide(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Divide, other)
    }

    pub fn modulo(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Modulo, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Lt, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Gt, other)
    }

    pub fn le(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Le, other)
    }

    pub fn ge(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Ge, other)
    }

    pub fn eq(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Eq, other)
    }

    pub fn ne(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Ne, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::And, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        self.binary(BinaryOpKind::Or, other)
    }

    pub fn not(self) -> Expr {
        Expr::UnaryOp(UnaryOpKind::Not, Arc::new(self))
    }

    pub fn neg(self) -> Expr {
        Expr::UnaryOp(UnaryOpKind::Negative, Arc::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::UnaryOp(UnaryOpKind::IsNull, Arc::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::UnaryOp(UnaryOpKind::IsNotNull, Arc::new(self))
    }

    pub fn call<T>(name: T, args: Vec<Expr>) -> Expr
    where
        T: ToString,
    {
        Expr::Function(name.to_string(), args)
    }
}

/// Reference a column by name.
pub fn col<T>(name: T) -> Expr
where
    T: ToString,
{
    Expr::Column(name.to_string())
}

/// A literal value.
pub fn lit<T>(value: T) -> Expr
where
    Value: From<T>,
{
    Expr::Literal(value.into())
}

#[cfg(test)]
mod tests {
    use crate::pipeline::{Column, Schema, Value, ValueType};

    use super::*;

    fn schema() -> Schema {
        Schema::from(vec![
            Column::new("a", ValueType::Int),
            Column::new("b", ValueType::Int),
        ])
    }

    #[test]
    fn bind_and_eval() {
        let e = col("a").gt(lit(42)).bind(&schema()).unwrap();
        assert_eq!(e.eval(&[100.into(), 0.into()]), true.into());
        assert_eq!(e.eval(&[21.into(), 0.into()]), false.into());
    }

    #[test]
    fn bind_missing_column_fails() {
        let err = col("nope").gt(lit(1)).bind(&schema()).unwrap_err();
        assert!(matches!(err, DuctoError::ColumnNotFound(_)));
    }

    #[test]
    fn null_predicate_is_unknown() {
        let e = col("a").gt(lit(18)).bind(&schema()).unwrap();
        assert_eq!(e.eval(&[Value::Null, 0.into()]), Value::Null);
    }

    #[test]
    fn function_call() {
        let e = Expr::call("upper", vec![col("a")]);
        let schema = Schema::from(vec![Column::new("a", ValueType::String)]);
        let e = e.bind(&schema).unwrap();
        assert_eq!(e.eval(&[Value::from("abc")]), Value::from("ABC"));
    }

    #[test]
    fn output_type_follows_operands() {
        let e = col("a").plus(col("b")).bind(&schema()).unwrap();
        assert_eq!(
            e.get_output_type(&[ValueType::Int, ValueType::Int]).unwrap(),
            ValueType::Int
        );
    }
}
