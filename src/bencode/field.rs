//! Typed access to dictionary fields, failing with errors that name the field.

use crate::bencode::value::{Dictionary, Value};
use crate::error::{Error, Result};

pub(crate) fn required<'a>(dict: &'a Dictionary, key: &str) -> Result<&'a Value> {
    dict.get(key.as_bytes()).ok_or_else(|| Error::missing(key))
}

pub(crate) fn wrong_type(name: &str, expected: &'static str, got: &Value) -> Error {
    Error::WrongFieldType {
        name: name.to_owned(),
        expected,
        got: got.type_name(),
    }
}

pub(crate) fn expect_dict<'a>(value: &'a Value, name: &str) -> Result<&'a Dictionary> {
    value
        .as_dict()
        .ok_or_else(|| wrong_type(name, "dictionary", value))
}

pub(crate) fn expect_list<'a>(value: &'a Value, name: &str) -> Result<&'a [Value]> {
    value.as_list().ok_or_else(|| wrong_type(name, "list", value))
}

pub(crate) fn expect_int(value: &Value, name: &str) -> Result<i64> {
    value
        .as_integer()
        .ok_or_else(|| wrong_type(name, "integer", value))
}

pub(crate) fn expect_bytes<'a>(value: &'a Value, name: &str) -> Result<&'a [u8]> {
    value
        .as_bytes()
        .ok_or_else(|| wrong_type(name, "byte string", value))
}

pub(crate) fn expect_str<'a>(value: &'a Value, name: &str) -> Result<&'a str> {
    std::str::from_utf8(expect_bytes(value, name)?)
        .map_err(|_| Error::invalid(name, "not valid utf-8"))
}

pub(crate) fn expect_u64(value: &Value, name: &str) -> Result<u64> {
    let n = expect_int(value, name)?;
    if n < 0 {
        return Err(Error::invalid(name, format!("must not be negative, got {}", n)));
    }
    Ok(n as u64)
}
