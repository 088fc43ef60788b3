use std::{borrow::Cow, cmp::Ordering, fmt::Display};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::DuctoError;

/**
 * The type of a value
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Long,
    Float,
    Double,
    String,
    DateTime,
    /**
     * Error means this value is an error.
     */
    Error,
}

impl ValueType {
    /**
     * True if the value type is numeric, including int, long, float, and double.
     */
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::Int | ValueType::Long | ValueType::Float | ValueType::Double
        )
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Null => write!(f, "null"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Long => write!(f, "long"),
            ValueType::Float => write!(f, "float"),
            ValueType::Double => write!(f, "double"),
            ValueType::String => write!(f, "string"),
            ValueType::DateTime => write!(f, "datetime"),
            ValueType::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ValueType {
    type Err = DuctoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "null" => Ok(ValueType::Null),
            "bool" | "boolean" => Ok(ValueType::Bool),
            "int" | "integer" => Ok(ValueType::Int),
            "long" | "bigint" => Ok(ValueType::Long),
            "float" => Ok(ValueType::Float),
            "double" => Ok(ValueType::Double),
            "string" => Ok(ValueType::String),
            "datetime" | "timestamp" => Ok(ValueType::DateTime),
            _ => Err(DuctoError::ValidationError(format!(
                "Unknown value type '{}'",
                s
            ))),
        }
    }
}

/**
 * Value is the type of a single field in a record.
 */
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Cow<'static, str>),
    DateTime(DateTime<Utc>),
    Error(DuctoError),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(l0), Self::Bool(r0)) => l0 == r0,
            (Self::Int(l0), Self::Int(r0)) => l0 == r0,
            (Self::Long(l0), Self::Long(r0)) => l0 == r0,
            (Self::Float(l0), Self::Float(r0)) => l0 == r0,
            (Self::Double(l0), Self::Double(r0)) => l0 == r0,
            (Self::String(l0), Self::String(r0)) => l0 == r0,
            (Self::DateTime(l0), Self::DateTime(r0)) => l0 == r0,
            // Errors never compare equal, not even to themselves
            (Self::Error(_), Self::Error(_)) => false,
            _ => false,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i32)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Long(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Long(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Cow<'static, str>> for Value {
    fn from(value: Cow<'static, str>) -> Self {
        Value::String(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::String(value.into())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<DuctoError> for Value {
    fn from(value: DuctoError) -> Self {
        Value::Error(value)
    }
}

impl<T> From<Result<T, DuctoError>> for Value
where
    T: Into<Value>,
{
    fn from(value: Result<T, DuctoError>) -> Self {
        match value {
            Ok(v) => v.into(),
            Err(e) => e.into(),
        }
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(v),
            Value::Int(v) => serde_json::Value::Number(v.into()),
            Value::Long(v) => serde_json::Value::Number(v.into()),
            Value::Float(v) => serde_json::Number::from_f64(v as f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Double(v) => serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(v) => serde_json::Value::String(v.into()),
            Value::DateTime(v) => serde_json::Value::String(v.to_rfc3339()),
            Value::Error(_) => serde_json::Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(v) => v.into(),
            serde_json::Value::Number(v) => {
                if let Some(i) = v.as_i64() {
                    i.into()
                } else {
                    v.as_f64().unwrap_or(f64::NAN).into()
                }
            }
            serde_json::Value::String(v) => v.into(),
            // Nested structures are not part of the record model
            other => Value::Error(DuctoError::ValidationError(format!(
                "Unsupported JSON value {}",
                other
            ))),
        }
    }
}

impl Value {
    /**
     * Get the type of the value
     */
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Error(_) => ValueType::Error,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /**
     * Get the bool value, if the value is not a bool, return DuctoError::InvalidValueType
     */
    pub fn get_bool(&self) -> Result<bool, DuctoError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Error(e) => Err(e.clone()),
            _ => Err(DuctoError::InvalidValueType(
                self.value_type(),
                ValueType::Bool,
            )),
        }
    }

    /**
     * Get the int value, any other numeric types will be automatically converted
     * return DuctoError::InvalidValueType in any other cases
     */
    pub fn get_int(&self) -> Result<i32, DuctoError> {
        match self {
            Value::Int(v) => Ok(*v),
            Value::Long(v) => Ok(*v as i32),
            Value::Float(v) => Ok(*v as i32),
            Value::Double(v) => Ok(*v as i32),
            Value::Error(e) => Err(e.clone()),
            _ => Err(DuctoError::InvalidValueType(
                self.value_type(),
                ValueType::Int,
            )),
        }
    }

    /**
     * Get the long value, any other numeric types will be automatically converted
     * return DuctoError::InvalidValueType in any other cases
     */
    pub fn get_long(&self) -> Result<i64, DuctoError> {
        match self {
            Value::Int(v) => Ok(*v as i64),
            Value::Long(v) => Ok(*v),
            Value::Float(v) => Ok(*v as i64),
            Value::Double(v) => Ok(*v as i64),
            Value::Error(e) => Err(e.clone()),
            _ => Err(DuctoError::InvalidValueType(
                self.value_type(),
                ValueType::Long,
            )),
        }
    }

    /**
     * Get the double value, any other numeric types will be automatically converted
     * return DuctoError::InvalidValueType in any other cases
     */
    pub fn get_double(&self) -> Result<f64, DuctoError> {
        match self {
            Value::Int(v) => Ok(*v as f64),
            Value::Long(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v as f64),
            Value::Double(v) => Ok(*v),
            Value::Error(e) => Err(e.clone()),
            _ => Err(DuctoError::InvalidValueType(
                self.value_type(),
                ValueType::Double,
            )),
        }
    }

    /**
     * Get the string value, if the value is not a string, return DuctoError::InvalidValueType
     */
    pub fn get_string(&self) -> Result<Cow<str>, DuctoError> {
        match self {
            Value::String(v) => Ok(v.clone()),
            Value::Error(e) => Err(e.clone()),
            _ => Err(DuctoError::InvalidValueType(
                self.value_type(),
                ValueType::String,
            )),
        }
    }

    /**
     * Get the datetime value, if the value is not a datetime, return DuctoError::InvalidValueType
     */
    pub fn get_datetime(&self) -> Result<DateTime<Utc>, DuctoError> {
        match self {
            Value::DateTime(v) => Ok(*v),
            Value::Error(e) => Err(e.clone()),
            _ => Err(DuctoError::InvalidValueType(
                self.value_type(),
                ValueType::DateTime,
            )),
        }
    }

    pub fn get_error(&self) -> Result<(), DuctoError> {
        match self {
            Value::Error(e) => Err(e.clone()),
            _ => Ok(()),
        }
    }

    /**
     * Type cast, number types can be auto casted to each others, others are not
     */
    pub fn try_cast(self, value_type: ValueType) -> Result<Value, DuctoError> {
        if self.value_type() == value_type {
            return Ok(self);
        }
        match self {
            Value::Null => Ok(Value::Null),
            Value::Int(v) => match value_type {
                ValueType::Long => Ok((v as i64).into()),
                ValueType::Float => Ok((v as f32).into()),
                ValueType::Double => Ok((v as f64).into()),
                _ => Err(DuctoError::InvalidTypeCast(ValueType::Int, value_type)),
            },
            Value::Long(v) => match value_type {
                ValueType::Int => Ok((v as i32).into()),
                ValueType::Float => Ok((v as f32).into()),
                ValueType::Double => Ok((v as f64).into()),
                _ => Err(DuctoError::InvalidTypeCast(ValueType::Long, value_type)),
            },
            Value::Float(v) => match value_type {
                ValueType::Int => Ok((v as i32).into()),
                ValueType::Long => Ok((v as i64).into()),
                ValueType::Double => Ok((v as f64).into()),
                _ => Err(DuctoError::InvalidTypeCast(ValueType::Float, value_type)),
            },
            Value::Double(v) => match value_type {
                ValueType::Int => Ok((v as i32).into()),
                ValueType::Long => Ok((v as i64).into()),
                ValueType::Float => Ok((v as f32).into()),
                _ => Err(DuctoError::InvalidTypeCast(ValueType::Double, value_type)),
            },
            Value::Error(e) => Err(e),
            other => Err(DuctoError::InvalidTypeCast(other.value_type(), value_type)),
        }
    }

    /**
     * Type conversion, parses strings and stringifies scalars on top of casting
     */
    pub fn try_convert(self, value_type: ValueType) -> Result<Value, DuctoError> {
        if self.value_type() == value_type {
            return Ok(self);
        }
        match self {
            Value::Null => Ok(Value::Null),
            Value::Bool(v) => match value_type {
                ValueType::Int => Ok((if v { 1i32 } else { 0i32 }).into()),
                ValueType::Long => Ok((if v { 1i64 } else { 0i64 }).into()),
                ValueType::Float => Ok((if v { 1f32 } else { 0f32 }).into()),
                ValueType::Double => Ok((if v { 1f64 } else { 0f64 }).into()),
                ValueType::String => Ok((if v { "true" } else { "false" }).into()),
                _ => Err(DuctoError::InvalidTypeConversion(ValueType::Bool, value_type)),
            },
            Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_) => {
                match value_type {
                    ValueType::Bool => Ok((self.get_double()? != 0f64).into()),
                    ValueType::String => Ok(self.dump_raw().into()),
                    ValueType::Int | ValueType::Long | ValueType::Float | ValueType::Double => {
                        self.try_cast(value_type)
                    }
                    _ => Err(DuctoError::InvalidTypeConversion(
                        self.value_type(),
                        value_type,
                    )),
                }
            }
            Value::String(v) => Value::parse_as(&v, value_type)
                .map_err(|_| DuctoError::FormatError(v.to_string(), value_type)),
            Value::DateTime(v) => match value_type {
                ValueType::String => Ok(v.to_rfc3339().into()),
                ValueType::Long => Ok(v.timestamp().into()),
                _ => Err(DuctoError::InvalidTypeConversion(
                    ValueType::DateTime,
                    value_type,
                )),
            },
            Value::Error(e) => Err(e),
        }
    }

    /**
     * Parse a source text representation into a typed value.
     * Empty text parses to null for every type.
     */
    pub fn parse_as(text: &str, value_type: ValueType) -> Result<Value, DuctoError> {
        if text.is_empty() {
            return Ok(Value::Null);
        }
        let fail = || DuctoError::FormatError(text.to_string(), value_type);
        match value_type {
            ValueType::Null => Ok(Value::Null),
            ValueType::Bool => match text.to_lowercase().as_str() {
                "true" | "1" => Ok(true.into()),
                "false" | "0" => Ok(false.into()),
                _ => Err(fail()),
            },
            ValueType::Int => text.parse::<i32>().map(Value::from).map_err(|_| fail()),
            ValueType::Long => text.parse::<i64>().map(Value::from).map_err(|_| fail()),
            ValueType::Float => text.parse::<f32>().map(Value::from).map_err(|_| fail()),
            ValueType::Double => text.parse::<f64>().map(Value::from).map_err(|_| fail()),
            ValueType::String => Ok(text.to_string().into()),
            ValueType::DateTime => parse_datetime(text).ok_or_else(fail),
            ValueType::Error => Err(fail()),
        }
    }

    /**
     * Total ordering used by window sorts: null first, then typed values,
     * errors last. Numeric pairs that defeat `partial_cmp` (NaN operands)
     * fall back to `f64::total_cmp`, which sorts NaN above every finite
     * double; mismatched non-numeric types fall back to type order so the
     * sort stays total.
     */
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Error(_), Value::Error(_)) => Ordering::Equal,
            (Value::Error(_), _) => Ordering::Greater,
            (_, Value::Error(_)) => Ordering::Less,
            (l, r) => match l.partial_cmp(r) {
                Some(ordering) => ordering,
                None => match (l.get_double(), r.get_double()) {
                    (Ok(x), Ok(y)) => x.total_cmp(&y),
                    _ => type_rank(l).cmp(&type_rank(r)),
                },
            },
        }
    }

    pub fn dump(&self) -> String {
        match self {
            Value::String(v) => format!("\"{}\"", v),
            other => other.dump_raw(),
        }
    }

    /// Unquoted text form, also used for partition path values.
    pub fn dump_raw(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::String(v) => v.to_string(),
            Value::DateTime(v) => v.to_rfc3339(),
            Value::Error(e) => format!("{:?}", e),
        }
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_) => 2,
        Value::String(_) => 3,
        Value::DateTime(_) => 4,
        Value::Error(_) => 5,
    }
}

/// Accepts RFC3339, `YYYY-MM-DD HH:MM:SS`, and bare dates.
pub fn parse_datetime(text: &str) -> Option<Value> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).into());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt).into());
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?).into());
    }
    None
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
            (Value::Int(x), Value::Long(y)) => (*x as i64).partial_cmp(y),
            (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(&(*y as f64)),
            (Value::Int(x), Value::Double(y)) => (*x as f64).partial_cmp(y),

            (Value::Long(x), Value::Int(y)) => x.partial_cmp(&(*y as i64)),
            (Value::Long(x), Value::Long(y)) => x.partial_cmp(y),
            (Value::Long(x), Value::Float(y)) => (*x as f64).partial_cmp(&(*y as f64)),
            (Value::Long(x), Value::Double(y)) => (*x as f64).partial_cmp(y),

            (Value::Float(x), Value::Int(y)) => (*x as f64).partial_cmp(&(*y as f64)),
            (Value::Float(x), Value::Long(y)) => (*x as f64).partial_cmp(&(*y as f64)),
            (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
            (Value::Float(x), Value::Double(y)) => (*x as f64).partial_cmp(y),

            (Value::Double(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
            (Value::Double(x), Value::Long(y)) => x.partial_cmp(&(*y as f64)),
            (Value::Double(x), Value::Float(y)) => x.partial_cmp(&(*y as f64)),
            (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),

            (Value::Bool(x), Value::Bool(y)) => x.partial_cmp(y),
            (Value::String(x), Value::String(y)) => x.partial_cmp(y),
            (Value::DateTime(x), Value::DateTime(y)) => x.partial_cmp(y),

            _ => None,
        }
    }
}

/**
 * Static value type of a Rust type, used by the typed function wrappers.
 */
pub trait ValueTypeOf {
    fn value_type() -> ValueType;
}

impl ValueTypeOf for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }
}

impl ValueTypeOf for i32 {
    fn value_type() -> ValueType {
        ValueType::Int
    }
}

impl ValueTypeOf for i64 {
    fn value_type() -> ValueType {
        ValueType::Long
    }
}

impl ValueTypeOf for f32 {
    fn value_type() -> ValueType {
        ValueType::Float
    }
}

impl ValueTypeOf for f64 {
    fn value_type() -> ValueType {
        ValueType::Double
    }
}

impl ValueTypeOf for String {
    fn value_type() -> ValueType {
        ValueType::String
    }
}

impl ValueTypeOf for DateTime<Utc> {
    fn value_type() -> ValueType {
        ValueType::DateTime
    }
}

impl<T> ValueTypeOf for Option<T>
where
    T: ValueTypeOf,
{
    fn value_type() -> ValueType {
        T::value_type()
    }
}

impl TryFrom<Value> for bool {
    type Error = DuctoError;

    fn try_from(value: Value) -> Result<Self, DuctoError> {
        value.get_bool()
    }
}

impl TryFrom<Value> for i32 {
    type Error = DuctoError;

    fn try_from(value: Value) -> Result<Self, DuctoError> {
        value.get_int()
    }
}

impl TryFrom<Value> for i64 {
    type Error = DuctoError;

    fn try_from(value: Value) -> Result<Self, DuctoError> {
        value.get_long()
    }
}

impl TryFrom<Value> for f64 {
    type Error = DuctoError;

    fn try_from(value: Value) -> Result<Self, DuctoError> {
        value.get_double()
    }
}

impl TryFrom<Value> for String {
    type Error = DuctoError;

    fn try_from(value: Value) -> Result<Self, DuctoError> {
        value.get_string().map(|s| s.to_string())
    }
}

impl TryFrom<Value> for DateTime<Utc> {
    type Error = DuctoError;

    fn try_from(value: Value) -> Result<Self, DuctoError> {
        value.get_datetime()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_conv() {
        let v = Value::Int(1);
        assert_eq!(v.clone().try_convert(ValueType::Long).unwrap(), Value::Long(1));
        assert_eq!(
            v.clone().try_convert(ValueType::Double).unwrap(),
            Value::Double(1.0)
        );
        assert_eq!(v.clone().try_convert(ValueType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(
            v.clone().try_convert(ValueType::String).unwrap(),
            Value::from("1")
        );
        assert!(Value::from("abc").try_convert(ValueType::Int).is_err());
    }

    #[test]
    fn parse_typed() {
        assert_eq!(Value::parse_as("42", ValueType::Int).unwrap(), Value::Int(42));
        assert_eq!(Value::parse_as("", ValueType::Int).unwrap(), Value::Null);
        assert!(Value::parse_as("4x", ValueType::Int).is_err());
        assert_eq!(
            Value::parse_as("2.5", ValueType::Double).unwrap(),
            Value::Double(2.5)
        );
        assert!(matches!(
            Value::parse_as("2021-03-04 05:06:07", ValueType::DateTime).unwrap(),
            Value::DateTime(_)
        ));
    }

    #[test]
    fn total_order_nulls_first() {
        let mut vals = vec![Value::Int(3), Value::Null, Value::Int(1)];
        vals.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(vals, vec![Value::Null, Value::Int(1), Value::Int(3)]);
    }

    #[test]
    fn total_order_nan_sorts_last_among_numbers() {
        let mut vals = vec![
            Value::Double(f64::NAN),
            Value::Double(10.0),
            Value::Double(20.0),
        ];
        vals.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(vals[0], Value::Double(10.0));
        assert_eq!(vals[1], Value::Double(20.0));
        assert!(matches!(vals[2], Value::Double(v) if v.is_nan()));
        // NaN compares equal to itself so the order stays total
        assert_eq!(
            Value::Double(f64::NAN).total_cmp(&Value::Double(f64::NAN)),
            Ordering::Equal
        );
        assert_eq!(
            Value::Double(f64::NAN).total_cmp(&Value::Int(10)),
            Ordering::Greater
        );
    }

    #[test]
    fn cross_width_compare() {
        assert_eq!(
            Value::Int(2).partial_cmp(&Value::Double(2.0)),
            Some(Ordering::Equal)
        );
        assert!(Value::Long(3) > Value::Int(2));
    }
}
