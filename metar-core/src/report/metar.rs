use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CloudLayer, Condition, Report, Station, Visibility, Wind, significant_clouds};
use crate::model::ResourceKind;

/// One decoded METAR observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetarRecord {
    pub icao: String,
    #[serde(default)]
    pub station: Option<Station>,
    #[serde(default)]
    pub elevation: Option<Elevation>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub barometer: Option<Barometer>,
    #[serde(default)]
    pub wind: Option<Wind>,
    #[serde(default)]
    pub temperature: Option<Temperature>,
    #[serde(default)]
    pub dewpoint: Option<Temperature>,
    #[serde(default)]
    pub humidity: Option<Humidity>,
    #[serde(default)]
    pub observed: Option<String>,
    #[serde(default)]
    pub flight_category: Option<String>,
    #[serde(default, deserialize_with = "significant_clouds")]
    pub clouds: Vec<CloudLayer>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elevation {
    #[serde(default)]
    pub feet: Option<f64>,
    #[serde(default)]
    pub meters: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barometer {
    #[serde(default)]
    pub hg: Option<f64>,
    #[serde(default)]
    pub hpa: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    #[serde(default)]
    pub celsius: Option<f64>,
    #[serde(default)]
    pub fahrenheit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Humidity {
    #[serde(default)]
    pub percent: Option<f64>,
}

impl MetarRecord {
    pub fn station_name(&self) -> &str {
        self.station.as_ref().map(|s| s.name.as_str()).unwrap_or("")
    }

    /// Observation time, if the upstream timestamp parses.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed.as_deref().and_then(parse_timestamp)
    }
}

impl Report for MetarRecord {
    const KIND: ResourceKind = ResourceKind::Metar;

    fn icao(&self) -> &str {
        &self.icao
    }
}

/// Upstream timestamps come either as RFC 3339 or as naive UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|ndt| ndt.and_utc())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Envelope;

    #[test]
    fn decodes_metar_body() {
        let body = fixtures::metar_body("EHAM", "VFR");
        let envelope: Envelope<MetarRecord> = serde_json::from_str(&body).unwrap();
        let record = &envelope.data[0];

        assert_eq!(record.icao(), "EHAM");
        assert_eq!(record.station_name(), "Test Field EHAM");
        assert_eq!(record.flight_category.as_deref(), Some("VFR"));
        assert_eq!(record.wind.as_ref().and_then(|w| w.speed_kts), Some(12.0));
        assert_eq!(record.clouds.len(), 1);
        let observed = record.observed_at().map(|t| t.to_rfc3339());
        assert_eq!(observed.as_deref(), Some("2024-03-01T11:55:00+00:00"));
    }

    #[test]
    fn wind_is_optional() {
        let record: MetarRecord = serde_json::from_str(r#"{"icao":"EGKK"}"#).unwrap();
        assert!(record.wind.is_none());
        assert!(record.clouds.is_empty());
        assert_eq!(record.station_name(), "");
    }

    #[test]
    fn timestamps_accept_rfc3339() {
        assert!(parse_timestamp("2024-03-01T11:55:00Z").is_some());
        assert!(parse_timestamp("not a time").is_none());
    }
}
