use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    CloudLayer, Condition, Report, Station, Visibility, Wind, metar::parse_timestamp,
    significant_clouds,
};
use crate::model::ResourceKind;

/// One decoded TAF with its forecast periods in issue order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub icao: String,
    #[serde(default)]
    pub station: Option<Station>,
    #[serde(default)]
    pub timestamp: Option<ValidityWindow>,
    #[serde(default, rename = "forecast")]
    pub periods: Vec<ForecastPeriod>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidityWindow {
    #[serde(default)]
    pub issued: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    #[serde(default)]
    pub timestamp: Option<ValidityWindow>,
    #[serde(default)]
    pub change: Option<Change>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub wind: Option<Wind>,
    #[serde(default, deserialize_with = "significant_clouds")]
    pub clouds: Vec<CloudLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub indicator: Option<ChangeIndicator>,
}

/// BECMG, TEMPO, FM, PROB30 ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeIndicator {
    pub code: String,
    #[serde(default)]
    pub text: String,
}

impl ForecastRecord {
    pub fn station_name(&self) -> &str {
        self.station.as_ref().map(|s| s.name.as_str()).unwrap_or("")
    }
}

impl ForecastPeriod {
    pub fn valid_from(&self) -> Option<DateTime<Utc>> {
        let window = self.timestamp.as_ref()?;
        window.from.as_deref().and_then(parse_timestamp)
    }

    pub fn valid_to(&self) -> Option<DateTime<Utc>> {
        let window = self.timestamp.as_ref()?;
        window.to.as_deref().and_then(parse_timestamp)
    }

    pub fn change_indicator(&self) -> Option<&ChangeIndicator> {
        self.change.as_ref()?.indicator.as_ref()
    }
}

impl Report for ForecastRecord {
    const KIND: ResourceKind = ResourceKind::Taf;

    fn icao(&self) -> &str {
        &self.icao
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub fn taf_body(icao: &str) -> String {
        format!(
            r#"{{"results":1,"data":[{{
                "icao":"{icao}",
                "station":{{"name":"Test Field {icao}"}},
                "timestamp":{{"issued":"2024-03-01T11:00:00","from":"2024-03-01T12:00:00","to":"2024-03-02T18:00:00"}},
                "forecast":[
                    {{
                        "timestamp":{{"from":"2024-03-01T12:00:00","to":"2024-03-01T18:00:00"}},
                        "wind":{{"degrees":230,"speed_kts":14}},
                        "visibility":{{"miles":"Greater than 6","meters":"10,000+"}},
                        "clouds":[{{"code":"SCT","text":"Scattered","base_feet_agl":2500}}],
                        "conditions":[]
                    }},
                    {{
                        "timestamp":{{"from":"2024-03-01T18:00:00","to":"2024-03-02T02:00:00"}},
                        "change":{{"indicator":{{"code":"TEMPO","text":"Temporarily"}}}},
                        "conditions":[{{"code":"SHRA","text":"Rain showers"}}],
                        "clouds":[{{"code":"NSC","text":"No significant clouds"}}]
                    }}
                ],
                "raw_text":"TAF {icao} 011100Z 0112/0218 23014KT 9999 SCT025"
            }}]}}"#
        )
    }
}
