use anyhow::{anyhow, Error};
use std::str::FromStr;

use crate::data::value::{Object, Value};

pub trait TryFromValue: Sized {
    fn try_from_value(value: &Value) -> Result<Self, Error>;
}

impl TryFromValue for Value {
    fn try_from_value(value: &Value) -> Result<Self, Error> {
        Ok(value.clone())
    }
}

impl TryFromValue for bool {
    fn try_from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Boolean(b) => Ok(*b),
            _ => Err(anyhow!("Cannot parse value into a boolean: {:?}", value)),
        }
    }
}

impl TryFromValue for String {
    fn try_from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Enum(s) => Ok(s.clone()),
            _ => Err(anyhow!("Cannot parse value into a string: {:?}", value)),
        }
    }
}

impl TryFromValue for i32 {
    fn try_from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Int(n) => i32::try_from(*n)
                .map_err(|_| anyhow!("Cannot parse value into an integer/i32: {}", n)),
            _ => Err(anyhow!("Cannot parse value into an integer/i32: {:?}", value)),
        }
    }
}

impl TryFromValue for i64 {
    fn try_from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Int(n) => Ok(*n),
            // `ID`s and big integers travel as strings.
            Value::String(s) => i64::from_str(s).map_err(Into::into),
            _ => Err(anyhow!("Cannot parse value into an integer/i64: {:?}", value)),
        }
    }
}

impl TryFromValue for u64 {
    fn try_from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Int(n) => u64::try_from(*n)
                .map_err(|_| anyhow!("Cannot parse value into an integer/u64: {}", n)),
            Value::String(s) => u64::from_str(s).map_err(Into::into),
            _ => Err(anyhow!("Cannot parse value into an integer/u64: {:?}", value)),
        }
    }
}

impl TryFromValue for f64 {
    fn try_from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Float(x) => Ok(*x),
            Value::Int(n) => Ok(*n as f64),
            _ => Err(anyhow!("Cannot parse value into a float: {:?}", value)),
        }
    }
}

impl<T> TryFromValue for Vec<T>
where
    T: TryFromValue,
{
    fn try_from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::List(values) => values.iter().try_fold(vec![], |mut values, value| {
                values.push(T::try_from_value(value)?);
                Ok(values)
            }),
            _ => Err(anyhow!("Cannot parse value into a vector: {:?}", value)),
        }
    }
}

pub trait ValueMap {
    fn get_required<T: TryFromValue>(&self, key: &str) -> Result<T, Error>;
    fn get_optional<T: TryFromValue>(&self, key: &str) -> Result<Option<T>, Error>;
}

impl ValueMap for Value {
    fn get_required<T: TryFromValue>(&self, key: &str) -> Result<T, Error> {
        match self {
            Value::Object(map) => map.get_required(key),
            _ => Err(anyhow!("value is not a map: {:?}", self)),
        }
    }

    fn get_optional<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: TryFromValue,
    {
        match self {
            Value::Object(map) => map.get_optional(key),
            _ => Err(anyhow!("value is not a map: {:?}", self)),
        }
    }
}

impl ValueMap for Object {
    fn get_required<T>(&self, key: &str) -> Result<T, Error>
    where
        T: TryFromValue,
    {
        self.get(key)
            .ok_or_else(|| anyhow!("Required field `{}` not set", key))
            .and_then(T::try_from_value)
    }

    fn get_optional<T>(&self, key: &str) -> Result<Option<T>, Error>
    where
        T: TryFromValue,
    {
        self.get(key).map_or(Ok(None), |value| match value {
            Value::Null => Ok(None),
            _ => T::try_from_value(value).map(Some),
        })
    }
}
