//! Typed views over generic records.
//!
//! The library never knows about concrete engine classes. Callers hand an ordered list of
//! [`ObjectFactory`] implementations to [`crate::asset::Asset::materialize_object`] and the
//! first one recognizing the schema type name builds the typed view. Without a match the
//! generic [`Value`] is returned.

use crate::{
    error::Result,
    value::{Record, Value},
};

/// Builds a typed view for records of certain schema types
pub trait ObjectFactory<T> {
    /// Whether this factory handles records of `type_name`
    fn recognizes(&self, type_name: &str) -> bool;

    /// Build the view from a decoded record
    fn materialize(&self, record: Record) -> Result<T>;
}

/// Outcome of materializing an object
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized<T> {
    /// A factory recognized the schema type
    Typed(T),
    /// No factory matched
    Generic(Value),
}

impl<T> Materialized<T> {
    pub fn typed(&self) -> Option<&T> {
        match self {
            Materialized::Typed(t) => Some(t),
            Materialized::Generic(_) => None,
        }
    }

    pub fn into_typed(self) -> Option<T> {
        match self {
            Materialized::Typed(t) => Some(t),
            Materialized::Generic(_) => None,
        }
    }

    pub fn generic(&self) -> Option<&Value> {
        match self {
            Materialized::Typed(_) => None,
            Materialized::Generic(v) => Some(v),
        }
    }
}

/// Hand `value` to the first factory recognizing its type
pub fn materialize<T>(value: Value, factories: &[&dyn ObjectFactory<T>]) -> Result<Materialized<T>> {
    let Value::Record(record) = value else {
        return Ok(Materialized::Generic(value));
    };

    match factories
        .iter()
        .find(|f| f.recognizes(record.type_name()))
    {
        Some(factory) => factory.materialize(record).map(Materialized::Typed),
        None => Ok(Materialized::Generic(Value::Record(record))),
    }
}
