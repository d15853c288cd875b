use std::collections::BTreeMap;
use std::time::Duration;

use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use url::Url;

/// Default timeout applied to every request made to the inference service.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Shape of the upstream API contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ApiShape {
    /// `POST chat/completions` with delta frames terminated by `[DONE]`
    #[default]
    #[strum(serialize = "chat", serialize = "chat_completions")]
    Chat,
    /// `POST responses` with typed events
    Responses,
}

/// Connection details of the inference service.
#[derive(Clone, Debug, PartialEq, Setters)]
#[setters(into, strip_option)]
pub struct Provider {
    pub api: ApiShape,
    pub base_url: Url,
    pub key: Option<String>,
    /// Static headers sent with every request, e.g. `CompartmentId`
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl Provider {
    pub fn new(api: ApiShape, base_url: Url) -> Self {
        Self {
            api,
            base_url,
            key: None,
            headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn header(mut self, name: impl ToString, value: impl ToString) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_api_shape_from_str() {
        assert_eq!(ApiShape::from_str("chat").unwrap(), ApiShape::Chat);
        assert_eq!(ApiShape::from_str("chat_completions").unwrap(), ApiShape::Chat);
        assert_eq!(ApiShape::from_str("Responses").unwrap(), ApiShape::Responses);
        assert!(ApiShape::from_str("completions").is_err());
    }

    #[test]
    fn test_provider_defaults() {
        let fixture = Provider::new(
            ApiShape::Chat,
            Url::parse("http://localhost:4000/v1/").unwrap(),
        )
        .header("CompartmentId", "ocid1.compartment");

        assert_eq!(fixture.timeout, DEFAULT_TIMEOUT);
        assert_eq!(fixture.key, None);
        assert_eq!(
            fixture.headers.get("CompartmentId").map(String::as_str),
            Some("ocid1.compartment")
        );
    }
}
