//! Stage parameters.
//!
//! Each stage carries a [`ParamMap`] of JSON values keyed by parameter name.
//! Typed access goes through [`Param`] descriptors, which also supply the
//! default used when a value was never set.

use crate::error::{Result, StageError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Typed descriptor of a single stage parameter.
#[derive(Clone, Debug)]
pub struct Param<T> {
    pub name: &'static str,
    pub description: &'static str,
    pub default: T,
}

impl<T> Param<T> {
    pub const fn new(name: &'static str, description: &'static str, default: T) -> Self {
        Self {
            name,
            description,
            default,
        }
    }
}

/// Ordered map of parameter values.
///
/// Ordering is by name so that persisted metadata is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamMap {
    values: BTreeMap<String, Value>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a raw value by name, decoding it as `T`.
    ///
    /// Returns `Ok(None)` if the parameter is not set.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| StageError::InvalidParameter(format!("{}: {}", name, e))),
        }
    }

    /// Store `value` under `name`, replacing any previous value.
    ///
    /// # Errors
    /// Returns [`StageError::InvalidParameter`] if `value` cannot be read back
    /// from its JSON form, e.g. a non-finite float (JSON has no `NaN` or
    /// infinity, so it would be stored as `null`).
    pub fn set<T>(&mut self, name: &str, value: T) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        let value = serde_json::to_value(value)
            .map_err(|e| StageError::InvalidParameter(format!("{}: {}", name, e)))?;
        serde_json::from_value::<T>(value.clone()).map_err(|e| {
            StageError::InvalidParameter(format!("{}: value cannot be stored: {}", name, e))
        })?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Implemented by every stage: exposes its parameter map.
pub trait WithParams {
    fn param_map(&self) -> &ParamMap;

    fn param_map_mut(&mut self) -> &mut ParamMap;

    /// Current value of `param`, or its default when unset.
    ///
    /// # Errors
    /// Returns [`StageError::InvalidParameter`] if the stored value cannot be
    /// decoded as `T`.
    fn get<T>(&self, param: &Param<T>) -> Result<T>
    where
        T: DeserializeOwned + Clone,
        Self: Sized,
    {
        Ok(self
            .param_map()
            .get(param.name)?
            .unwrap_or_else(|| param.default.clone()))
    }

    /// Set `param` to `value`. Returns `self` for chaining.
    fn set<T>(&mut self, param: &Param<T>, value: T) -> Result<&mut Self>
    where
        T: Serialize + DeserializeOwned,
        Self: Sized,
    {
        self.param_map_mut().set(param.name, value)?;
        Ok(self)
    }
}
