use crate::pipeline::{DuctoError, Value, ValueType};

use super::Operator;

#[derive(Clone, Debug, Default)]
pub struct PlusOperator;

impl Operator for PlusOperator {
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        if argument_types.len() != 2 {
            return Err(DuctoError::ArityError(
                "+".to_string(),
                argument_types.len(),
            ));
        }
        match argument_types {
            [ValueType::String, ValueType::String] => Ok(ValueType::String),
            [a, b] => numeric_output_type("+", *a, *b),
            _ => unreachable!("Unknown error."),
        }
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 2 {
            return Value::Error(DuctoError::ArityError("+".to_string(), arguments.len()));
        }

        match arguments.as_slice() {
            // Null operand makes the whole expression null
            [Value::Null, _] | [_, Value::Null] => Value::Null,

            [Value::Int(a), Value::Int(b)] => (a + b).into(),
            [Value::Int(a), Value::Long(b)] => (*a as i64 + b).into(),
            [Value::Int(a), Value::Float(b)] => (*a as f64 + *b as f64).into(),
            [Value::Int(a), Value::Double(b)] => (*a as f64 + b).into(),

            [Value::Long(a), Value::Int(b)] => (a + *b as i64).into(),
            [Value::Long(a), Value::Long(b)] => (a + b).into(),
            [Value::Long(a), Value::Float(b)] => (*a as f64 + *b as f64).into(),
            [Value::Long(a), Value::Double(b)] => (*a as f64 + b).into(),

            [Value::Float(a), Value::Int(b)] => (*a as f64 + *b as f64).into(),
            [Value::Float(a), Value::Long(b)] => (*a as f64 + *b as f64).into(),
            [Value::Float(a), Value::Float(b)] => (a + b).into(),
            [Value::Float(a), Value::Double(b)] => (*a as f64 + *b as f64).into(),

            [Value::Double(a), Value::Int(b)] => (a + *b as f64).into(),
            [Value::Double(a), Value::Long(b)] => (a + *b as f64).into(),
            [Value::Double(a), Value::Float(b)] => (a + *b as f64).into(),
            [Value::Double(a), Value::Double(b)] => (a + b).into(),

            // String concat
            [Value::String(a), Value::String(b)] => (format!("{}{}", a, b)).into(),

            // All other combinations are invalid
            [a, b] => Value::Error(DuctoError::TypeMismatch(
                "+".to_string(),
                a.value_type(),
                b.value_type(),
            )),

            // Shouldn't reach here
            _ => unreachable!("Unknown error."),
        }
    }

    fn dump(&self, arguments: Vec<String>) -> String {
        format!("({} + {})", arguments[0], arguments[1])
    }
}

fn numeric_output_type(
    op: &str,
    a: ValueType,
    b: ValueType,
) -> Result<ValueType, DuctoError> {
    match (a, b) {
        (ValueType::Int, ValueType::Int) => Ok(ValueType::Int),
        (ValueType::Int, ValueType::Long) | (ValueType::Long, ValueType::Int) => {
            Ok(ValueType::Long)
        }
        (ValueType::Long, ValueType::Long) => Ok(ValueType::Long),
        (ValueType::Float, ValueType::Float) => Ok(ValueType::Float),
        (x, y) if x.is_numeric() && y.is_numeric() => Ok(ValueType::Double),
        (x, y) => Err(DuctoError::TypeMismatch(op.to_string(), x, y)),
    }
}

macro_rules! binary_math_op {
    ($name:ident, $op_name:tt, $op:tt) => {
        binary_math_op!($name, $op_name, $op, false);
    };
    ($name:ident, $op_name:tt, $op:tt, $zero_divisor_is_null:literal) => {
        #[derive(Clone, Debug, Default)]
        pub struct $name;

        impl Operator for $name {
            fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
                if argument_types.len() != 2 {
                    return Err(DuctoError::ArityError(stringify!($op_name).to_string(), argument_types.len()));
                }
                numeric_output_type(stringify!($op_name), argument_types[0], argument_types[1])
            }

            fn eval(&self, arguments: Vec<Value>) -> Value {
                if arguments.len() != 2 {
                    return Value::Error(DuctoError::ArityError(stringify!($op_name).to_string(), arguments.len()));
                }

                // Integer division and modulo by zero yield null
                if $zero_divisor_is_null
                    && matches!(arguments.as_slice(), [_, Value::Int(0)] | [_, Value::Long(0)])
                {
                    return Value::Null;
                }

                match arguments.as_slice() {
                    [Value::Null, _] | [_, Value::Null] => Value::Null,

                    [Value::Int(a), Value::Int(b)] => (a $op b).into(),
                    [Value::Int(a), Value::Long(b)] => ((*a as i64) $op b).into(),
                    [Value::Int(a), Value::Float(b)] => ((*a as f64) $op (*b as f64)).into(),
                    [Value::Int(a), Value::Double(b)] => ((*a as f64) $op b).into(),

                    [Value::Long(a), Value::Int(b)] => (a $op (*b as i64)).into(),
                    [Value::Long(a), Value::Long(b)] => (a $op b).into(),
                    [Value::Long(a), Value::Float(b)] => ((*a as f64) $op (*b as f64)).into(),
                    [Value::Long(a), Value::Double(b)] => ((*a as f64) $op b).into(),

                    [Value::Float(a), Value::Int(b)] => ((*a as f64) $op (*b as f64)).into(),
                    [Value::Float(a), Value::Long(b)] => ((*a as f64) $op (*b as f64)).into(),
                    [Value::Float(a), Value::Float(b)] => (a $op b).into(),
                    [Value::Float(a), Value::Double(b)] => ((*a as f64) $op b).into(),

                    [Value::Double(a), Value::Int(b)] => (a $op (*b as f64)).into(),
                    [Value::Double(a), Value::Long(b)] => (a $op (*b as f64)).into(),
                    [Value::Double(a), Value::Float(b)] => (a $op (*b as f64)).into(),
                    [Value::Double(a), Value::Double(b)] => (a $op b).into(),

                    // All other combinations are invalid
                    [a, b] => Value::Error(DuctoError::TypeMismatch(
                        stringify!($op_name).to_string(),
                        a.value_type(),
                        b.value_type(),
                    )),

                    // Shouldn't reach here
                    _ => unreachable!("Unknown error."),
                }
            }

            fn dump(&self, arguments: Vec<String>) -> String {
                format!("({} {} {})", arguments[0], stringify!($op_name), arguments[1])
            }
        }
    };
}

binary_math_op!(MinusOperator, -, -);
binary_math_op!(MultiplyOperator, *, *);
binary_math_op!(DivideOperator, /, /, true);
binary_math_op!(ModuloOperator, %, %, true);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_widens() {
        assert_eq!(PlusOperator.eval(vec![1.into(), 2.into()]), 3.into());
        assert_eq!(
            PlusOperator.eval(vec![Value::Int(1), Value::Long(2)]),
            Value::Long(3)
        );
        assert_eq!(
            PlusOperator.eval(vec![Value::from("a"), Value::from("b")]),
            Value::from("ab")
        );
    }

    #[test]
    fn null_propagates() {
        assert_eq!(PlusOperator.eval(vec![Value::Null, 2.into()]), Value::Null);
        assert_eq!(
            MultiplyOperator.eval(vec![3.into(), Value::Null]),
            Value::Null
        );
    }

    #[test]
    fn zero_divisor_is_null() {
        assert_eq!(DivideOperator.eval(vec![7.into(), 0.into()]), Value::Null);
        assert_eq!(
            ModuloOperator.eval(vec![Value::Long(7), Value::Long(0)]),
            Value::Null
        );
        assert_eq!(DivideOperator.eval(vec![7.into(), 2.into()]), 3.into());
    }

    #[test]
    fn type_mismatch_is_error() {
        assert!(PlusOperator
            .eval(vec![Value::from(true), 2.into()])
            .is_error());
    }
}
