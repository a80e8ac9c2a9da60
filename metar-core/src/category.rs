use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{model::FetchState, report::MetarRecord};

/// Flight rules category as supplied by the upstream METAR decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FlightCategory {
    Vfr,
    Mvfr,
    Ifr,
    Lifr,
    #[default]
    Unknown,
}

impl FlightCategory {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "VFR" => FlightCategory::Vfr,
            "MVFR" => FlightCategory::Mvfr,
            "IFR" => FlightCategory::Ifr,
            "LIFR" => FlightCategory::Lifr,
            _ => FlightCategory::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightCategory::Vfr => "VFR",
            FlightCategory::Mvfr => "MVFR",
            FlightCategory::Ifr => "IFR",
            FlightCategory::Lifr => "LIFR",
            FlightCategory::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FlightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a single observation.
pub fn classify(record: &MetarRecord) -> FlightCategory {
    record
        .flight_category
        .as_deref()
        .map(FlightCategory::from_tag)
        .unwrap_or_default()
}

/// Category used for both METAR and TAF views of `icao`.
///
/// TAF periods are not classified on their own; the latest METAR for the same
/// airport is the only source.
pub fn category_for(icao: &str, metar: Option<&FetchState<MetarRecord>>) -> FlightCategory {
    match metar.and_then(FetchState::ready) {
        Some(record) if record.icao.eq_ignore_ascii_case(icao) => classify(record),
        _ => FlightCategory::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(icao: &str, category: Option<&str>) -> MetarRecord {
        let mut json = serde_json::json!({ "icao": icao });
        if let Some(cat) = category {
            json["flight_category"] = cat.into();
        }
        serde_json::from_value(json).unwrap()
    }

    fn tagged(tag: Option<&str>) -> FlightCategory {
        classify(&record("EHAM", tag))
    }

    #[test]
    fn reads_upstream_tag() {
        assert_eq!(tagged(Some("VFR")), FlightCategory::Vfr);
        assert_eq!(tagged(Some("mvfr")), FlightCategory::Mvfr);
        assert_eq!(tagged(Some("IFR")), FlightCategory::Ifr);
        assert_eq!(tagged(Some("LIFR")), FlightCategory::Lifr);
    }

    #[test]
    fn missing_or_odd_tag_is_unknown() {
        assert_eq!(tagged(None), FlightCategory::Unknown);
        assert_eq!(tagged(Some("SVFR")), FlightCategory::Unknown);
    }

    #[test]
    fn taf_view_uses_metar_of_same_airport_only() {
        let ready = FetchState::Ready(record("EHAM", Some("IFR")));
        let busy = FetchState::Loading;

        assert_eq!(category_for("EHAM", Some(&ready)), FlightCategory::Ifr);
        assert_eq!(category_for("EGKK", Some(&ready)), FlightCategory::Unknown);
        assert_eq!(category_for("EHAM", Some(&busy)), FlightCategory::Unknown);
        assert_eq!(category_for("EHAM", None), FlightCategory::Unknown);
    }
}
