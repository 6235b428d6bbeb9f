//! Catalog scene model.

use serde::{Deserialize, Serialize};

use super::area::BoundingBox;

/// One scene matched by a catalog search. No uniqueness is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Provider product identifier.
    pub id: String,
    /// Acquisition time as reported by the provider.
    pub datetime: Option<String>,
    /// `eo:cloud_cover`, 0 when the provider omits it.
    pub cloud_cover_percent: f64,
    /// First of thumbnail/preview/overview/browse that has an href.
    pub thumbnail_url: Option<String>,
    /// Scene footprint, when the provider reports a 2D box.
    pub bbox: Option<BoundingBox>,
    /// Untouched provider properties.
    pub raw_properties: serde_json::Value,
}
