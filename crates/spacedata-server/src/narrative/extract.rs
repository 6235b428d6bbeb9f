//! Pulling a [`LandCoverEstimate`] out of free-form model output.

use serde_json::Value;

use crate::models::{LandCover, LandCoverChange, LandCoverEstimate};

pub const GEOGRAPHIC_ONLY_NOTE: &str =
    "Note: This analysis is based on geographic information only, not satellite imagery.";

const REQUIRED_KEYS: [&str; 3] = ["land_cover", "change", "insights"];
const MAX_CHANGE: f64 = 5.0;

/// Result of reading a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(LandCoverEstimate),
    Unparseable(String),
}

/// Extracts and normalizes an estimate from `text`.
///
/// The JSON object is taken from the first `{` to the last `}` (or the
/// whole text when there are none). Land cover is rescaled to sum to 100,
/// changes are clamped to ±5 and [`GEOGRAPHIC_ONLY_NOTE`] is appended to
/// the insights.
pub fn extract_estimate(text: &str) -> Extraction {
    let candidate = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    };

    let value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(e) => return Extraction::Unparseable(format!("invalid JSON: {e}")),
    };

    if let Some(missing) = REQUIRED_KEYS.iter().find(|key| value.get(**key).is_none()) {
        return Extraction::Unparseable(format!("missing key '{missing}'"));
    }

    let estimate: LandCoverEstimate = match serde_json::from_value(value) {
        Ok(estimate) => estimate,
        Err(e) => return Extraction::Unparseable(format!("unexpected shape: {e}")),
    };

    match normalize(estimate) {
        Ok(estimate) => Extraction::Parsed(estimate),
        Err(reason) => Extraction::Unparseable(reason),
    }
}

fn normalize(mut estimate: LandCoverEstimate) -> Result<LandCoverEstimate, String> {
    let LandCover { forest, urban, water } = estimate.land_cover;
    if [forest, urban, water].iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err("land cover values must be finite and non-negative".to_string());
    }
    let total = forest + urban + water;
    if total <= 0.0 {
        return Err(format!("land cover total {total} is not positive"));
    }

    let forest = round1(forest * 100.0 / total);
    let urban = round1(urban * 100.0 / total);
    let water = round1(100.0 - forest - urban).max(0.0);
    estimate.land_cover = LandCover { forest, urban, water };

    let LandCoverChange {
        forest_change,
        urban_change,
        water_change,
    } = estimate.change;
    estimate.change = LandCoverChange {
        forest_change: clamp_change(forest_change)?,
        urban_change: clamp_change(urban_change)?,
        water_change: clamp_change(water_change)?,
    };

    estimate.insights.push(GEOGRAPHIC_ONLY_NOTE.to_string());
    Ok(estimate)
}

fn clamp_change(value: f64) -> Result<f64, String> {
    if !value.is_finite() {
        return Err(format!("change value {value} is not finite"));
    }
    Ok(value.clamp(-MAX_CHANGE, MAX_CHANGE))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
