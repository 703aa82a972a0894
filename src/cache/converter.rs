//! Caller-supplied conversion between a payload type and generic JSON

use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::error::BoxError;

type ToGeneric<T> = dyn Fn(&T) -> Result<Value, BoxError> + Send + Sync;
type FromGeneric<T> = dyn Fn(Value) -> Result<T, BoxError> + Send + Sync;

/// The pair of functions that move a payload to and from its JSON representation
///
/// The cache never inspects `T` itself; everything it persists goes through these.
pub struct Converters<T> {
    to_generic: Arc<ToGeneric<T>>,
    from_generic: Arc<FromGeneric<T>>,
}

impl<T> Converters<T> {
    /// Creates converters from two arbitrary functions
    pub fn new<F, G>(to_generic: F, from_generic: G) -> Self
    where
        F: Fn(&T) -> Result<Value, BoxError> + Send + Sync + 'static,
        G: Fn(Value) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            to_generic: Arc::new(to_generic),
            from_generic: Arc::new(from_generic),
        }
    }

    /// Converts a payload into its generic form
    pub fn to_generic(&self, data: &T) -> Result<Value, BoxError> {
        (self.to_generic)(data)
    }

    /// Rebuilds a payload from its generic form
    pub fn from_generic(&self, value: Value) -> Result<T, BoxError> {
        (self.from_generic)(value)
    }
}

impl<T> Converters<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Converters backed by the type's own serde implementation
    pub fn serde() -> Self {
        Self::new(
            |data: &T| serde_json::to_value(data).map_err(BoxError::from),
            |value| serde_json::from_value(value).map_err(BoxError::from),
        )
    }
}

impl<T> Clone for Converters<T> {
    fn clone(&self) -> Self {
        Self {
            to_generic: Arc::clone(&self.to_generic),
            from_generic: Arc::clone(&self.from_generic),
        }
    }
}

impl<T> fmt::Debug for Converters<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converters").finish_non_exhaustive()
    }
}
