use std::collections::HashMap;

use dyn_clonable::clonable;
use once_cell::sync::Lazy;

use super::{DuctoError, Value, ValueType};

mod datetime_functions;
mod function_wrapper;
mod string_functions;

use datetime_functions::*;
use string_functions::*;

pub use function_wrapper::{binary_fn, nullary_fn, ternary_fn, unary_fn, var_fn};

#[clonable]
pub trait Function: Send + Sync + Clone {
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError>;

    fn eval(&self, arguments: Vec<Value>) -> Value;
}

/**
 * The fixed catalogue of functions usable in Derive expressions:
 * arithmetic, string, and date functions.
 */
#[rustfmt::skip]
fn init_built_in_functions() -> HashMap<String, Box<dyn Function + 'static>> {
    let mut function_map: HashMap<String, Box<dyn Function + 'static>> = HashMap::new();
    // Arithmetic
    function_map.insert("abs".to_string(), unary_fn(f64::abs));
    function_map.insert("round".to_string(), unary_fn(f64::round));
    function_map.insert("floor".to_string(), unary_fn(f64::floor));
    function_map.insert("ceil".to_string(), unary_fn(f64::ceil));
    function_map.insert("pow".to_string(), binary_fn(f64::powf));
    function_map.insert("sqrt".to_string(), unary_fn(f64::sqrt));
    // String
    function_map.insert("upper".to_string(), unary_fn(|s: String| s.to_uppercase()));
    function_map.insert("lower".to_string(), unary_fn(|s: String| s.to_lowercase()));
    function_map.insert("trim".to_string(), unary_fn(|s: String| s.trim().to_string()));
    function_map.insert("length".to_string(), unary_fn(|s: String| s.chars().count() as i64));
    function_map.insert("concat".to_string(), var_fn(|v: Vec<String>| v.concat()));
    function_map.insert("substring".to_string(), ternary_fn(substring));
    function_map.insert("replace".to_string(), ternary_fn(|s: String, from: String, to: String| s.replace(&from, &to)));
    // Date
    function_map.insert("year".to_string(), unary_fn(year));
    function_map.insert("month".to_string(), unary_fn(month));
    function_map.insert("day".to_string(), unary_fn(day));
    function_map.insert("date_format".to_string(), binary_fn(date_format));
    function_map.insert("to_timestamp".to_string(), unary_fn(to_timestamp));
    function_map.insert("current_timestamp".to_string(), nullary_fn(chrono::Utc::now));
    function_map
}

static BUILT_IN_FUNCTIONS: Lazy<HashMap<String, Box<dyn Function>>> =
    Lazy::new(init_built_in_functions);

/// Look up a function in the built-in catalogue.
pub fn get_function(name: &str) -> Result<Box<dyn Function>, DuctoError> {
    BUILT_IN_FUNCTIONS
        .get(name)
        .cloned()
        .ok_or_else(|| DuctoError::UnknownFunction(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_lookup() {
        assert!(get_function("upper").is_ok());
        assert!(get_function("no_such_fn").is_err());
    }

    #[test]
    fn string_functions() {
        let f = get_function("substring").unwrap();
        assert_eq!(
            f.eval(vec![Value::from("cliente"), 0i64.into(), 4i64.into()]),
            Value::from("clie")
        );
        let f = get_function("concat").unwrap();
        assert_eq!(
            f.eval(vec![Value::from("a"), Value::from("b"), Value::from("c")]),
            Value::from("abc")
        );
    }

    #[test]
    fn null_arguments_yield_null() {
        let f = get_function("upper").unwrap();
        assert_eq!(f.eval(vec![Value::Null]), Value::Null);
        let f = get_function("concat").unwrap();
        assert_eq!(f.eval(vec![Value::from("a"), Value::Null]), Value::Null);
    }

    #[test]
    fn date_functions() {
        let f = get_function("to_timestamp").unwrap();
        let ts = f.eval(vec![Value::from("2024-05-06 07:08:09")]);
        assert!(matches!(ts, Value::DateTime(_)));
        let f = get_function("year").unwrap();
        assert_eq!(f.eval(vec![ts]), Value::Int(2024));
    }
}
