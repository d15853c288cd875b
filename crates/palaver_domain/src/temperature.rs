use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// A newtype for temperature values with built-in validation
///
/// Temperature controls the randomness in the model's output:
/// - Lower values (e.g., 0.1) make responses more focused and deterministic
/// - Higher values (e.g., 0.9) make responses more diverse
/// - Valid range is 0.0 to 1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature(f32);

impl Temperature {
    /// Creates a new Temperature value, returning an error if outside the valid
    /// range (0.0 to 1.0)
    pub fn new(value: f32) -> crate::Result<Self> {
        if Self::is_valid(value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidTemperature(value))
        }
    }

    /// Returns true if the temperature value is within the valid range (0.0 to
    /// 1.0)
    pub fn is_valid(value: f32) -> bool {
        (0.0..=1.0).contains(&value)
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self(1.0)
    }
}

impl Deref for Temperature {
    type Target = f32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Temperature> for f32 {
    fn from(temp: Temperature) -> Self {
        temp.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Temperature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Two decimals is the resolution of the temperature control
        let value = (self.0 as f64 * 100.0).round() / 100.0;
        serializer.serialize_f64(value)
    }
}

impl<'de> Deserialize<'de> for Temperature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let value = f32::deserialize(deserializer)?;
        Self::new(value).map_err(|e| Error::custom(e.to_string()))
    }
}
