use crate::pipeline::{DuctoError, Value, ValueType};

use super::Operator;

fn bool_output_type(op: &str, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
    if argument_types.len() != 2 {
        return Err(DuctoError::ArityError(op.to_string(), argument_types.len()));
    }
    let ok = |t: ValueType| t == ValueType::Bool || t == ValueType::Null;
    if ok(argument_types[0]) && ok(argument_types[1]) {
        Ok(ValueType::Bool)
    } else {
        Err(DuctoError::TypeMismatch(
            op.to_string(),
            argument_types[0],
            argument_types[1],
        ))
    }
}

/**
 * Three-valued AND: false dominates, otherwise null is "unknown"
 */
#[derive(Clone, Debug, Default)]
pub struct AndOperator;

impl Operator for AndOperator {
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        bool_output_type("and", argument_types)
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 2 {
            return Value::Error(DuctoError::ArityError("and".to_string(), arguments.len()));
        }
        match arguments.as_slice() {
            [Value::Bool(false), _] | [_, Value::Bool(false)] => false.into(),
            [Value::Bool(true), Value::Bool(true)] => true.into(),
            [Value::Null, Value::Bool(true) | Value::Null]
            | [Value::Bool(true), Value::Null] => Value::Null,
            [a, b] => Value::Error(DuctoError::TypeMismatch(
                "and".to_string(),
                a.value_type(),
                b.value_type(),
            )),
            _ => unreachable!("Unknown error."),
        }
    }

    fn dump(&self, arguments: Vec<String>) -> String {
        format!("({} and {})", arguments[0], arguments[1])
    }
}

/**
 * Three-valued OR: true dominates, otherwise null is "unknown"
 */
#[derive(Clone, Debug, Default)]
pub struct OrOperator;

impl Operator for OrOperator {
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        bool_output_type("or", argument_types)
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 2 {
            return Value::Error(DuctoError::ArityError("or".to_string(), arguments.len()));
        }
        match arguments.as_slice() {
            [Value::Bool(true), _] | [_, Value::Bool(true)] => true.into(),
            [Value::Bool(false), Value::Bool(false)] => false.into(),
            [Value::Null, Value::Bool(false) | Value::Null]
            | [Value::Bool(false), Value::Null] => Value::Null,
            [a, b] => Value::Error(DuctoError::TypeMismatch(
                "or".to_string(),
                a.value_type(),
                b.value_type(),
            )),
            _ => unreachable!("Unknown error."),
        }
    }

    fn dump(&self, arguments: Vec<String>) -> String {
        format!("({} or {})", arguments[0], arguments[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kleene_and() {
        assert_eq!(
            AndOperator.eval(vec![Value::Null, false.into()]),
            false.into()
        );
        assert_eq!(AndOperator.eval(vec![Value::Null, true.into()]), Value::Null);
        assert_eq!(
            AndOperator.eval(vec![true.into(), true.into()]),
            true.into()
        );
    }

    #[test]
    fn kleene_or() {
        assert_eq!(OrOperator.eval(vec![Value::Null, true.into()]), true.into());
        assert_eq!(OrOperator.eval(vec![Value::Null, false.into()]), Value::Null);
        assert_eq!(
            OrOperator.eval(vec![false.into(), false.into()]),
            false.into()
        );
    }
}
