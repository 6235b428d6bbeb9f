//! Area selection geometry.
//!
//! Polygons arrive from the browser as a JSON string of `[lat, lng]`
//! pairs. Everything downstream (catalog search, prompts, pricing) works
//! from the axis-aligned bounding box or the vertex centroid.

use serde::{Deserialize, Serialize};

/// Bounding box used when no usable polygon was supplied (Barcelona).
pub const DEFAULT_BBOX: BoundingBox = BoundingBox {
    west: 2.1,
    south: 41.3,
    east: 2.3,
    north: 41.5,
};

/// A single `[lat, lng]` vertex.
pub type LatLng = [f64; 2];

/// Ordered polygon vertices as `[lat, lng]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon(pub Vec<LatLng>);

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// User input for a data request. Not validated beyond presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSelection {
    pub polygon: Option<Polygon>,
    pub data_type: String,
    pub start_date: String,
    pub end_date: String,
}

impl Polygon {
    /// Parses the `coordinates` form field. Returns `None` for empty or malformed input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match serde_json::from_str::<Vec<LatLng>>(raw) {
            Ok(points) => Some(Polygon(points)),
            Err(e) => {
                tracing::warn!("Invalid coordinates format: {}", e);
                None
            }
        }
    }

    pub fn vertices(&self) -> &[LatLng] {
        &self.0
    }

    /// At least three vertices; anything less cannot enclose an area.
    pub fn is_area(&self) -> bool {
        self.0.len() >= 3
    }

    /// Min/max of the vertices, or `None` for an empty polygon.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let (first, rest) = self.0.split_first()?;
        let mut bbox = BoundingBox {
            west: first[1],
            south: first[0],
            east: first[1],
            north: first[0],
        };
        for [lat, lng] in rest {
            bbox.west = bbox.west.min(*lng);
            bbox.east = bbox.east.max(*lng);
            bbox.south = bbox.south.min(*lat);
            bbox.north = bbox.north.max(*lat);
        }
        Some(bbox)
    }

    /// Arithmetic mean of the vertices as `[lat, lng]`.
    pub fn centroid(&self) -> Option<LatLng> {
        if self.0.is_empty() {
            return None;
        }
        let n = self.0.len() as f64;
        let lat = self.0.iter().map(|p| p[0]).sum::<f64>() / n;
        let lng = self.0.iter().map(|p| p[1]).sum::<f64>() / n;
        Some([lat, lng])
    }
}

impl BoundingBox {
    /// `[west, south, east, north]`, the order STAC expects.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    pub fn from_array(values: [f64; 4]) -> Self {
        Self {
            west: values[0],
            south: values[1],
            east: values[2],
            north: values[3],
        }
    }

    pub fn contains(&self, [lat, lng]: LatLng) -> bool {
        lng >= self.west && lng <= self.east && lat >= self.south && lat <= self.north
    }

    /// Rough surface area in km² using a spherical Earth.
    pub fn area_km2(&self) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let lat_diff = (self.north - self.south).abs();
        let lng_diff = (self.east - self.west).abs();
        let avg_lat = (self.north + self.south) / 2.0;
        (std::f64::consts::PI / 180.0).powi(2)
            * EARTH_RADIUS_KM.powi(2)
            * lat_diff
            * lng_diff
            * avg_lat.to_radians().cos()
    }
}

impl Serialize for BoundingBox {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoundingBox {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <[f64; 4]>::deserialize(deserializer).map(BoundingBox::from_array)
    }
}

/// Bounding box for a catalog query: the polygon's box when it encloses
/// an area, otherwise [`DEFAULT_BBOX`].
pub fn search_bbox(polygon: Option<&Polygon>) -> BoundingBox {
    polygon
        .filter(|p| p.is_area())
        .and_then(Polygon::bounding_box)
        .unwrap_or(DEFAULT_BBOX)
}
