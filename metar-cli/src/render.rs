//! Plain-text rendering of fetch states.

use chrono::{DateTime, Utc};
use metar_core::{
    FetchState, FlightCategory, ForecastRecord, MetarRecord, Phase, Snapshot, ViewMode, classify,
    report::{ForecastPeriod, Visibility, Wind},
};
use std::fmt::Write;

pub fn snapshot(snapshot: &Snapshot) -> String {
    let Some(code) = &snapshot.code else {
        return format!(
            "Waiting for a 4-letter ICAO code (input: '{}')",
            snapshot.input
        );
    };

    let category = snapshot.category;
    let body = match snapshot.mode {
        ViewMode::Metar => snapshot.metar.as_ref().map(metar),
        ViewMode::Taf => snapshot.taf.as_ref().map(|state| taf(state, category)),
    };

    match (snapshot.phase, body) {
        (Phase::Idle, _) | (_, None) => format!("{code}: nothing fetched yet"),
        (_, Some(body)) => body,
    }
}

pub fn metar(state: &FetchState<MetarRecord>) -> String {
    match state {
        FetchState::Loading => "Loading METAR...".to_string(),
        FetchState::Failed { kind, message } => failure(kind.title(), message),
        FetchState::Ready(record) => metar_report(record),
    }
}

pub fn taf(state: &FetchState<ForecastRecord>, category: FlightCategory) -> String {
    match state {
        FetchState::Loading => "Loading TAF...".to_string(),
        FetchState::Failed { kind, message } => failure(kind.title(), message),
        FetchState::Ready(record) => taf_report(record, category),
    }
}

fn failure(title: &str, message: &str) -> String {
    format!("{title}.\n{message}")
}

fn metar_report(record: &MetarRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} [{}]",
        record.icao,
        record.station_name(),
        classify(record)
    );

    if let Some(observed) = record.observed_at() {
        let _ = writeln!(out, "  observed   {}", zulu(observed));
    }
    if let Some(elevation) = record.elevation.as_ref().and_then(|e| e.feet) {
        let _ = writeln!(out, "  elevation  {elevation} ft");
    }
    if let Some(wind) = &record.wind {
        let _ = writeln!(out, "  wind       {}", wind_text(wind));
    }
    if let Some(vis) = &record.visibility {
        let _ = writeln!(out, "  visibility {}", visibility_text(vis));
    }
    if let Some(baro) = &record.barometer {
        let hpa = baro.hpa.map(|v| format!("{v} hPa")).unwrap_or_default();
        let hg = baro.hg.map(|v| format!("{v} inHg")).unwrap_or_default();
        let _ = writeln!(out, "  pressure   {hpa} {hg}");
    }
    let temp = record.temperature.as_ref().and_then(|t| t.celsius);
    let dew = record.dewpoint.as_ref().and_then(|t| t.celsius);
    if let (Some(temp), Some(dew)) = (temp, dew) {
        let _ = writeln!(out, "  temp/dew   {temp}°C / {dew}°C");
    }
    for layer in &record.clouds {
        let base = layer.base_feet_agl.map(|b| format!(" at {b} ft")).unwrap_or_default();
        let _ = writeln!(out, "  clouds     {}{base}", layer.code);
    }
    if let Some(raw) = &record.raw_text {
        let _ = write!(out, "  raw        {raw}");
    }

    out.trim_end().to_string()
}

fn taf_report(record: &ForecastRecord, category: FlightCategory) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "TAF {} {} [{}]",
        record.icao,
        record.station_name(),
        category
    );

    for period in &record.periods {
        let _ = writeln!(out, "{}", period_text(period));
    }

    out.trim_end().to_string()
}

fn period_text(period: &ForecastPeriod) -> String {
    let window = match (period.valid_from(), period.valid_to()) {
        (Some(from), Some(to)) => format!("{} - {}", zulu(from), zulu(to)),
        _ => "unknown window".to_string(),
    };
    let change = period.change_indicator().map(|c| format!(" {}", c.code)).unwrap_or_default();

    let mut parts = Vec::new();
    if let Some(wind) = &period.wind {
        parts.push(wind_text(wind));
    }
    if let Some(vis) = &period.visibility {
        parts.push(visibility_text(vis));
    }
    parts.extend(period.conditions.iter().map(|c| c.text.clone()));
    parts.extend(period.clouds.iter().map(|layer| match layer.base_feet_agl {
        Some(base) => format!("{} {base} ft", layer.code),
        None => layer.code.clone(),
    }));

    format!("  {window}{change}: {}", parts.join(", "))
}

fn wind_text(wind: &Wind) -> String {
    let dir = wind.degrees.map(|d| format!("{d:03.0}°")).unwrap_or_else(|| "VRB".to_string());
    let speed = wind.speed_kts.map(|s| format!("{s} kt")).unwrap_or_default();
    match wind.gust_kts {
        Some(gust) => format!("{dir} {speed} gusting {gust} kt"),
        None => format!("{dir} {speed}"),
    }
}

fn visibility_text(vis: &Visibility) -> String {
    match (&vis.meters, &vis.miles) {
        (Some(m), _) => format!("{m} m"),
        (None, Some(mi)) => format!("{mi} mi"),
        (None, None) => "n/a".to_string(),
    }
}

fn zulu(at: DateTime<Utc>) -> String {
    at.format("%d %H:%MZ").to_string()
}
