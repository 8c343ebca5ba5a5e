//! Conversions between typed rows and JSON objects.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::errors::ServiceError;

pub type Record = Map<String, Value>;

pub fn to_object<T: Serialize>(value: &T) -> Result<Record, ServiceError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(other) => Err(ServiceError::Db(format!("expected a JSON object, got {other}"))),
        Err(e) => Err(ServiceError::Db(e.to_string())),
    }
}

pub fn from_object<T: DeserializeOwned>(obj: Record) -> Result<T, ServiceError> {
    serde_json::from_value(Value::Object(obj)).map_err(|e| ServiceError::Db(e.to_string()))
}
