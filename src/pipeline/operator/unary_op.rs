use crate::pipeline::{DuctoError, Value, ValueType};

use super::Operator;

#[derive(Clone, Debug, Default)]
pub struct NotOperator;

impl Operator for NotOperator {
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        if argument_types.len() != 1 {
            return Err(DuctoError::ArityError("not".to_string(), argument_types.len()));
        }
        match argument_types[0] {
            ValueType::Bool | ValueType::Null => Ok(ValueType::Bool),
            t => Err(DuctoError::InvalidOperandType("not".to_string(), t)),
        }
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 1 {
            return Value::Error(DuctoError::ArityError("not".to_string(), arguments.len()));
        }
        match &arguments[0] {
            Value::Bool(v) => (!v).into(),
            // not(unknown) is unknown
            Value::Null => Value::Null,
            e @ Value::Error(_) => e.clone(),
            v => Value::Error(DuctoError::InvalidOperandType(
                "not".to_string(),
                v.value_type(),
            )),
        }
    }

    fn dump(&self, arguments: Vec<String>) -> String {
        format!("(not {})", arguments[0])
    }
}

#[derive(Clone, Debug, Default)]
pub struct NegativeOperator;

impl Operator for NegativeOperator {
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        if argument_types.len() != 1 {
            return Err(DuctoError::ArityError("-".to_string(), argument_types.len()));
        }
        match argument_types[0] {
            t if t.is_numeric() => Ok(t),
            ValueType::Null => Ok(ValueType::Null),
            t => Err(DuctoError::InvalidOperandType("-".to_string(), t)),
        }
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 1 {
            return Value::Error(DuctoError::ArityError("-".to_string(), arguments.len()));
        }
        match &arguments[0] {
            Value::Int(v) => (-v).into(),
            Value::Long(v) => (-v).into(),
            Value::Float(v) => (-v).into(),
            Value::Double(v) => (-v).into(),
            Value::Null => Value::Null,
            e @ Value::Error(_) => e.clone(),
            v => Value::Error(DuctoError::InvalidOperandType(
                "-".to_string(),
                v.value_type(),
            )),
        }
    }

    fn dump(&self, arguments: Vec<String>) -> String {
        format!("(-{})", arguments[0])
    }
}

#[derive(Clone, Debug, Default)]
pub struct IsNullOperator;

impl Operator for IsNullOperator {
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        if argument_types.len() != 1 {
            return Err(DuctoError::ArityError(
                "is null".to_string(),
                argument_types.len(),
            ));
        }
        Ok(ValueType::Bool)
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 1 {
            return Value::Error(DuctoError::ArityError(
                "is null".to_string(),
                arguments.len(),
            ));
        }
        arguments[0].is_null().into()
    }

    fn dump(&self, arguments: Vec<String>) -> String {
        format!("({} is null)", arguments[0])
    }
}

#[derive(Clone, Debug, Default)]
pub struct IsNotNullOperator;

impl Operator for IsNotNullOperator {
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        if argument_types.len() != 1 {
            return Err(DuctoError::ArityError(
                "is not null".to_string(),
                argument_types.len(),
            ));
        }
        Ok(ValueType::Bool)
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 1 {
            return Value::Error(DuctoError::ArityError(
                "is not null".to_string(),
                arguments.len(),
            ));
        }
        (!arguments[0].is_null()).into()
    }

    fn dump(&self, arguments: Vec<String>) -> String {
        format!("({} is not null)", arguments[0])
    }
}
