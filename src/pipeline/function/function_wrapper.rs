use std::marker::PhantomData;

use crate::pipeline::{DuctoError, Value, ValueType, ValueTypeOf};

use super::Function;

// SQL-style null propagation: a null argument makes the result null
// without invoking the wrapped function.
fn any_null(args: &[Value]) -> bool {
    args.iter().any(Value::is_null)
}

#[derive(Clone)]
struct NullaryFunctionWrapper<R, F>
where
    R: Into<Value> + Sync + Send + ValueTypeOf,
    F: Fn() -> R,
{
    function: F,
}

impl<R, F> Function for NullaryFunctionWrapper<R, F>
where
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn() -> R) + Sync + Send + Clone,
{
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        if !argument_types.is_empty() {
            return Err(DuctoError::InvalidArgumentCount(0, argument_types.len()));
        }
        Ok(R::value_type())
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if !arguments.is_empty() {
            return Value::Error(DuctoError::InvalidArgumentCount(0, arguments.len()));
        }
        (self.function)().into()
    }
}

/**
 * Wrap a nullary function into `Function` so it can be put in the catalogue.
 */
pub fn nullary_fn<R, F>(f: F) -> Box<impl Function>
where
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn() -> R) + Sync + Send + Clone,
{
    Box::new(NullaryFunctionWrapper { function: f })
}

#[derive(Clone)]
struct UnaryFunctionWrapper<A, R, F>
where
    A: Send + Sync + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf,
    F: Fn(A) -> R,
{
    function: F,
    _phantom: PhantomData<fn(A) -> R>,
}

impl<A, R, F> Function for UnaryFunctionWrapper<A, R, F>
where
    A: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn(A) -> R) + Sync + Send + Clone,
{
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        if argument_types.len() != 1 {
            return Err(DuctoError::InvalidArgumentCount(1, argument_types.len()));
        }
        Ok(R::value_type())
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 1 {
            return Value::Error(DuctoError::InvalidArgumentCount(1, arguments.len()));
        }
        if any_null(&arguments) {
            return Value::Null;
        }
        let mut args = arguments.into_iter();
        match args.next().unwrap().try_into() {
            Ok(a) => (self.function)(a).into(),
            Err(e) => Value::Error(e),
        }
    }
}

/**
 * Wrap a unary function into `Function` so it can be put in the catalogue.
 */
pub fn unary_fn<A, R, F>(f: F) -> Box<impl Function>
where
    A: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn(A) -> R) + Sync + Send + Clone,
{
    Box::new(UnaryFunctionWrapper {
        function: f,
        _phantom: PhantomData,
    })
}

#[derive(Clone)]
struct BinaryFunctionWrapper<A, B, R, F>
where
    A: Send + Sync + TryFrom<Value, Error = DuctoError>,
    B: Send + Sync + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf,
    F: Fn(A, B) -> R,
{
    function: F,
    _phantom: PhantomData<fn(A, B) -> R>,
}

impl<A, B, R, F> Function for BinaryFunctionWrapper<A, B, R, F>
where
    A: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    B: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn(A, B) -> R) + Sync + Send + Clone,
{
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        if argument_types.len() != 2 {
            return Err(DuctoError::InvalidArgumentCount(2, argument_types.len()));
        }
        Ok(R::value_type())
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 2 {
            return Value::Error(DuctoError::InvalidArgumentCount(2, arguments.len()));
        }
        if any_null(&arguments) {
            return Value::Null;
        }
        let mut args = arguments.into_iter();
        let a = match args.next().unwrap().try_into() {
            Ok(a) => a,
            Err(e) => return Value::Error(e),
        };
        let b = match args.next().unwrap().try_into() {
            Ok(b) => b,
            Err(e) => return Value::Error(e),
        };
        (self.function)(a, b).into()
    }
}

/**
 * Wrap a binary function into `Function` so it can be put in the catalogue.
 */
pub fn binary_fn<A, B, R, F>(f: F) -> Box<impl Function>
where
    A: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    B: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn(A, B) -> R) + Sync + Send + Clone,
{
    Box::new(BinaryFunctionWrapper {
        function: f,
        _phantom: PhantomData,
    })
}

#[derive(Clone)]
struct TernaryFunctionWrapper<A, B, C, R, F>
where
    A: Send + Sync + TryFrom<Value, Error = DuctoError>,
    B: Send + Sync + TryFrom<Value, Error = DuctoError>,
    C: Send + Sync + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf,
    F: Fn(A, B, C) -> R,
{
    function: F,
    _phantom: PhantomData<fn(A, B, C) -> R>,
}

impl<A, B, C, R, F> Function for TernaryFunctionWrapper<A, B, C, R, F>
where
    A: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    B: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    C: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn(A, B, C) -> R) + Sync + Send + Clone,
{
    fn get_output_type(&self, argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        if argument_types.len() != 3 {
            return Err(DuctoError::InvalidArgumentCount(3, argument_types.len()));
        }
        Ok(R::value_type())
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if arguments.len() != 3 {
            return Value::Error(DuctoError::InvalidArgumentCount(3, arguments.len()));
        }
        if any_null(&arguments) {
            return Value::Null;
        }
        let mut args = arguments.into_iter();
        let a = match args.next().unwrap().try_into() {
            Ok(a) => a,
            Err(e) => return Value::Error(e),
        };
        let b = match args.next().unwrap().try_into() {
            Ok(b) => b,
            Err(e) => return Value::Error(e),
        };
        let c = match args.next().unwrap().try_into() {
            Ok(c) => c,
            Err(e) => return Value::Error(e),
        };
        (self.function)(a, b, c).into()
    }
}

/**
 * Wrap a ternary function into `Function` so it can be put in the catalogue.
 */
pub fn ternary_fn<A, B, C, R, F>(f: F) -> Box<impl Function>
where
    A: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    B: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    C: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn(A, B, C) -> R) + Sync + Send + Clone,
{
    Box::new(TernaryFunctionWrapper {
        function: f,
        _phantom: PhantomData,
    })
}

#[derive(Clone)]
struct VariadicFunctionWrapper<A, R, F>
where
    A: Send + Sync + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf,
    F: Fn(Vec<A>) -> R,
{
    function: F,
    _phantom: PhantomData<fn(Vec<A>) -> R>,
}

impl<A, R, F> Function for VariadicFunctionWrapper<A, R, F>
where
    A: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn(Vec<A>) -> R) + Sync + Send + Clone,
{
    fn get_output_type(&self, _argument_types: &[ValueType]) -> Result<ValueType, DuctoError> {
        Ok(R::value_type())
    }

    fn eval(&self, arguments: Vec<Value>) -> Value {
        if any_null(&arguments) {
            return Value::Null;
        }
        let args: Result<Vec<A>, DuctoError> =
            arguments.into_iter().map(|v| v.try_into()).collect();
        match args {
            Ok(args) => (self.function)(args).into(),
            Err(e) => Value::Error(e),
        }
    }
}

/**
 * Wrap a variadic function into `Function` so it can be put in the catalogue.
 */
pub fn var_fn<A, R, F>(f: F) -> Box<impl Function>
where
    A: Send + Sync + Clone + TryFrom<Value, Error = DuctoError>,
    R: Into<Value> + Sync + Send + ValueTypeOf + Clone,
    F: (Fn(Vec<A>) -> R) + Sync + Send + Clone,
{
    Box::new(VariadicFunctionWrapper {
        function: f,
        _phantom: PhantomData,
    })
}
