use crate::pipeline::{DuctoError, Value, ValueType};

use super::Operator;

fn comparable(a: ValueType, b: ValueType) -> bool {
    (a.is_numeric() && b.is_numeric())
        || (a == b)
        || a == ValueType::Null
        || b == ValueType::Null
}

macro_rules! compare_op {
    ($name:ident, $op:tt) => {
        #[derive(Clone, Debug, Default)]
        pub struct $name;

        impl Operator for $name {
            fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
                if argument_types.len() != 2 {
                    return Err(DuctoError::ArityError(stringify!($op).to_string(), argument_types.len()));
                }
                if comparable(argument_types[0], argument_types[1]) {
                    Ok(ValueType::Bool)
                } else {
                    Err(DuctoError::TypeMismatch(
                        stringify!($op).to_string(),
                        argument_types[0],
                        argument_types[1],
                    ))
                }
            }

            fn eval(&self, arguments: Vec<Value>) -> Value {
                if arguments.len() != 2 {
                    return Value::Error(DuctoError::ArityError(stringify!($op).to_string(), arguments.len()));
                }

                match arguments.as_slice() {
                    // Comparing against null is "unknown" in three-valued logic
                    [Value::Null, _] | [_, Value::Null] => Value::Null,

                    [a @ Value::Error(_), _] => a.clone(),
                    [_, b @ Value::Error(_)] => b.clone(),

                    [a, b] => match a.partial_cmp(b) {
                        Some(ord) => {
                            let ord_val = ord as i32;
                            (ord_val $op 0).into()
                        }
                        None => Value::Error(DuctoError::TypeMismatch(
                            stringify!($op).to_string(),
                            a.value_type(),
                            b.value_type(),
                        )),
                    },

                    // Shouldn't reach here
                    _ => unreachable!("Unknown error."),
                }
            }

            fn dump(&self, arguments: Vec<String>) -> String {
                format!("({} {} {})", arguments[0], stringify!($op), arguments[1])
            }
        }
    };
}

compare_op!(LessThanOperator, <);
compare_op!(GreaterThanOperator, >);
compare_op!(LessEqualOperator, <=);
compare_op!(GreaterEqualOperator, >=);
compare_op!(EqualOperator, ==);
compare_op!(NotEqualOperator, !=);
