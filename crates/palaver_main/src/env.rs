use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use palaver_domain::{ApiShape, ModelId, Provider};
use url::Url;

use crate::error::{Error, Result};

const BASE_URL: &str = "PALAVER_BASE_URL";
const API_KEY: &str = "PALAVER_API_KEY";
const MODEL: &str = "PALAVER_MODEL";
const API: &str = "PALAVER_API";
const COMPARTMENT_ID: &str = "PALAVER_COMPARTMENT_ID";
const TIMEOUT_SECS: &str = "PALAVER_TIMEOUT_SECS";

/// Header carrying the compartment of the inference service
pub const COMPARTMENT_HEADER: &str = "CompartmentId";

/// Settings read from the process environment at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    pub provider: Provider,
    pub model: ModelId,
    pub log_path: PathBuf,
}

impl Environment {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(Error::MissingEnv(name));
        let invalid = |name: &'static str, value: &str| Error::InvalidEnv {
            name,
            value: value.to_string(),
        };

        let base_url = require(BASE_URL)?;
        let base_url = Url::parse(base_url.trim()).map_err(|_| invalid(BASE_URL, &base_url))?;
        let key = require(API_KEY)?;
        let model = ModelId::new(require(MODEL)?.trim());

        let api = match get(API) {
            Some(value) => ApiShape::from_str(value.trim()).map_err(|_| invalid(API, &value))?,
            None => ApiShape::default(),
        };

        let mut provider = Provider::new(api, base_url).key(key.trim());

        if let Some(value) = get(TIMEOUT_SECS) {
            let secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| invalid(TIMEOUT_SECS, &value))?;
            provider = provider.timeout(Duration::from_secs(secs));
        }

        if let Some(compartment) = get(COMPARTMENT_ID) {
            provider = provider.header(COMPARTMENT_HEADER, compartment.trim());
        }

        Ok(Self { provider, model, log_path: log_path() })
    }
}

fn log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".palaver")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use palaver_domain::DEFAULT_TIMEOUT;
    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            (BASE_URL, "http://localhost:4000/v1/"),
            (API_KEY, "sk-test"),
            (MODEL, "gpt-oss"),
        ]
    }

    #[test]
    fn test_defaults() {
        let actual = Environment::from_lookup(lookup(&required())).unwrap();

        assert_eq!(actual.model, ModelId::new("gpt-oss"));
        assert_eq!(actual.provider.api, ApiShape::Chat);
        assert_eq!(actual.provider.base_url.as_str(), "http://localhost:4000/v1/");
        assert_eq!(actual.provider.key.as_deref(), Some("sk-test"));
        assert_eq!(actual.provider.timeout, DEFAULT_TIMEOUT);
        assert!(actual.provider.headers.is_empty());
    }

    #[test]
    fn test_optional_values() {
        let mut vars = required();
        vars.extend([
            (API, "responses"),
            (TIMEOUT_SECS, "120"),
            (COMPARTMENT_ID, "ocid1.compartment.oc1..example"),
        ]);

        let actual = Environment::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(actual.provider.api, ApiShape::Responses);
        assert_eq!(actual.provider.timeout, Duration::from_secs(120));
        assert_eq!(
            actual.provider.headers.get(COMPARTMENT_HEADER).map(String::as_str),
            Some("ocid1.compartment.oc1..example")
        );
    }

    #[test]
    fn test_missing_required_value() {
        let vars = [(BASE_URL, "http://localhost:4000/v1/"), (MODEL, "gpt-oss"), (API_KEY, " ")];
        let actual = Environment::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(actual, Error::MissingEnv(API_KEY)));
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [(TIMEOUT_SECS, "0"), (TIMEOUT_SECS, "soon"), (API, "graphql")] {
            let mut vars = required();
            vars.push((name, value));

            let actual = Environment::from_lookup(lookup(&vars)).unwrap_err();
            assert!(
                matches!(actual, Error::InvalidEnv { name: actual_name, .. } if actual_name == name),
                "{name}={value}"
            );
        }

        let vars = [(BASE_URL, "not a url"), (API_KEY, "sk-test"), (MODEL, "gpt-oss")];
        let actual = Environment::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(actual, Error::InvalidEnv { name: BASE_URL, .. }));
    }
}
