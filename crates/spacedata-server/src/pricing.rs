//! Price quotes for a data request, in FLR.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{AreaSelection, Polygon};

const NETWORK_FEE: f64 = 0.1;
const AI_ANALYSIS_MULTIPLIER: f64 = 1.25;
const PRICE_DIVISOR: f64 = 50_000.0;
const KM_PER_DEGREE: f64 = 111.0;
/// Discount for polygons that do not fill their bounding box.
const SHAPE_FACTOR: f64 = 0.8;

/// Body of `POST /api/pricing/quote`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(flatten)]
    pub selection: AreaSelection,
    #[serde(default)]
    pub ai_analysis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFactors {
    pub unit_price: f64,
    pub resolution: f64,
    pub area: f64,
    pub date_range: f64,
    pub ai_analysis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub data_type: String,
    pub area_km2: f64,
    pub factors: PriceFactors,
    pub base_price: f64,
    pub currency: &'static str,
}

/// Unit price and resolution multiplier per product type.
fn unit_price(data_type: &str) -> (f64, f64) {
    match data_type {
        "S2MSI2A" => (10.0, 1.5),
        "S1GRD" => (15.0, 1.3),
        "S3OLCI" => (5.0, 0.8),
        _ => (10.0, 1.0),
    }
}

/// Flat-earth bounding-box area in km², never below 1.
pub fn area_km2(polygon: Option<&Polygon>) -> f64 {
    let Some(bbox) = polygon.filter(|p| p.is_area()).and_then(Polygon::bounding_box) else {
        return 1.0;
    };
    let avg_lat = (bbox.south + bbox.north) / 2.0;
    let height = (bbox.north - bbox.south) * KM_PER_DEGREE;
    let width = (bbox.east - bbox.west) * KM_PER_DEGREE * avg_lat.to_radians().cos();
    (height * width * SHAPE_FACTOR).max(1.0)
}

/// 1.0 for a week, scaling linearly within [0.5, 2.0]. Unparseable dates give 1.0.
pub fn date_range_factor(start_date: &str, end_date: &str) -> f64 {
    let parse = |s: &str| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d");
    match (parse(start_date), parse(end_date)) {
        (Ok(start), Ok(end)) => {
            let days = (end - start).num_days().abs() + 1;
            (days as f64 / 7.0).clamp(0.5, 2.0)
        }
        _ => 1.0,
    }
}

pub fn quote(request: &QuoteRequest) -> PriceQuote {
    let selection = &request.selection;
    let (price, resolution) = unit_price(&selection.data_type);
    let area_km2 = area_km2(selection.polygon.as_ref());
    let area = (area_km2 / 100.0).max(0.5);
    let date_range = date_range_factor(&selection.start_date, &selection.end_date);
    let ai_analysis = if request.ai_analysis {
        AI_ANALYSIS_MULTIPLIER
    } else {
        1.0
    };

    let raw = (price * resolution * area * date_range * ai_analysis + NETWORK_FEE) / PRICE_DIVISOR;
    PriceQuote {
        data_type: selection.data_type.clone(),
        area_km2,
        factors: PriceFactors {
            unit_price: price,
            resolution,
            area,
            date_range,
            ai_analysis,
        },
        base_price: (raw * 100.0).round() / 100.0,
        currency: "FLR",
    }
}
