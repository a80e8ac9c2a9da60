//! Decoded report records as returned by the upstream `/decoded` endpoints.

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use std::fmt::Debug;

use crate::model::ResourceKind;

pub mod metar;
pub mod taf;

pub use metar::MetarRecord;
pub use taf::{ChangeIndicator, ForecastPeriod, ForecastRecord};

/// Cloud codes that carry no layer worth showing.
const NO_CLOUD_CODES: &[&str] = &["NSC", "NCD", "SKC", "CLR"];

/// A record type a fetcher can retrieve and cache.
pub trait Report: Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// ICAO code the record belongs to, as reported upstream.
    fn icao(&self) -> &str;
}

/// Envelope of every decoded response: `{ "data": [ ... ] }`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<R> {
    #[serde(default = "Vec::new")]
    pub data: Vec<R>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub code: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudLayer {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub base_feet_agl: Option<f64>,
}

impl CloudLayer {
    fn is_significant(&self) -> bool {
        let code = self.code.trim();
        !code.is_empty() && !NO_CLOUD_CODES.contains(&code)
    }
}

/// Visibility as the API reports it; values may be text such as "10,000+".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    #[serde(default, deserialize_with = "lenient_string")]
    pub miles: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub meters: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub degrees: Option<f64>,
    #[serde(default)]
    pub speed_kts: Option<f64>,
    #[serde(default)]
    pub gust_kts: Option<f64>,
}

/// Drops empty and "no significant cloud" layers while keeping order.
pub(crate) fn significant_clouds<'de, D>(deserializer: D) -> Result<Vec<CloudLayer>, D::Error>
where
    D: Deserializer<'de>,
{
    let layers: Option<Vec<CloudLayer>> = Option::deserialize(deserializer)?;
    Ok(layers
        .unwrap_or_default()
        .into_iter()
        .filter(CloudLayer::is_significant)
        .collect())
}

/// Accepts either a JSON string or number and keeps it as text.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
