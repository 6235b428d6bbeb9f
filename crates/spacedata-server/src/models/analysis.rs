//! Land-cover estimate returned by the narrative generator.
//!
//! Field names match the JSON the model is asked to produce, so a parsed
//! reply deserializes straight into these types.

use serde::{Deserialize, Serialize};

/// Land-cover shares in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandCover {
    pub forest: f64,
    pub urban: f64,
    pub water: f64,
}

/// Recent change per class in percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandCoverChange {
    pub forest_change: f64,
    pub urban_change: f64,
    pub water_change: f64,
}

/// Structured estimate for a selected area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandCoverEstimate {
    pub land_cover: LandCover,
    pub change: LandCoverChange,
    pub insights: Vec<String>,
}

impl LandCoverEstimate {
    /// The fixed estimate used whenever the model cannot be reached or its
    /// reply cannot be used. Callers cannot tell it apart from a genuine
    /// "no data" answer.
    pub fn fallback(location_name: &str, start_date: &str, end_date: &str) -> Self {
        Self {
            land_cover: LandCover {
                forest: 33.3,
                urban: 33.3,
                water: 33.4,
            },
            change: LandCoverChange {
                forest_change: 0.0,
                urban_change: 0.0,
                water_change: 0.0,
            },
            insights: vec![
                format!("Analysis for {} from {} to {}.", location_name, start_date, end_date),
                "No detailed analysis available. Please try again later.".to_string(),
                "The system is still processing your request.".to_string(),
            ],
        }
    }

    pub fn land_cover_total(&self) -> f64 {
        self.land_cover.forest + self.land_cover.urban + self.land_cover.water
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_sums_to_100() {
        let estimate = LandCoverEstimate::fallback("Barcelona", "2023-04-15", "2023-04-22");
        assert!((estimate.land_cover_total() - 100.0).abs() < 1e-9);
        assert_eq!(estimate.insights[0], "Analysis for Barcelona from 2023-04-15 to 2023-04-22.");
        assert_eq!(estimate.insights.len(), 3);
    }

    #[test]
    fn test_wire_format_is_snake_case() {
        let json = serde_json::to_value(LandCoverEstimate::fallback("x", "a", "b")).unwrap();
        assert_eq!(json["land_cover"]["water"], 33.4);
        assert_eq!(json["change"]["urban_change"], 0.0);
    }
}
