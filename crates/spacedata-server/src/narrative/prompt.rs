//! Prompt construction and geographic context for the assistant.

use crate::models::Polygon;

const WATER_KEYWORDS: [&str; 11] = [
    "sea",
    "ocean",
    "gulf",
    "bay",
    "strait",
    "channel",
    "mediterranean",
    "atlantic",
    "pacific",
    "indian ocean",
    "arctic",
];

/// At most this many nearby place names are quoted in a prompt.
const MAX_NEARBY: usize = 3;

/// Human-readable name for a product type code; unknown codes are returned as-is.
pub fn data_type_name(code: &str) -> &str {
    match code {
        "S2MSI2A" => "Sentinel-2 Level 2A (multispectral imagery)",
        "S1GRD" => "Sentinel-1 SAR (radar imagery)",
        "S3OLCI" => "Sentinel-3 OLCI (ocean and land color)",
        other => other,
    }
}

/// Vertex list and centroid of a selection, for polygons that enclose an area.
pub fn polygon_summary(polygon: &Polygon) -> Option<String> {
    if !polygon.is_area() {
        return None;
    }
    let [lat, lng] = polygon.centroid()?;
    let vertices = polygon
        .vertices()
        .iter()
        .map(|[lat, lng]| format!("[{lat:?}, {lng:?}]"))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(
        "The area being analyzed is defined by the following polygon coordinates:\n{vertices}\n\n\
         The center of this area is approximately at coordinates [{lat:.4}, {lng:.4}]."
    ))
}

pub fn mentions_water(address: &str) -> bool {
    let lower = address.to_lowercase();
    WATER_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Geographic context gathered by reverse-geocoding a selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaContext {
    /// Address of the centroid.
    pub centroid_address: Option<String>,
    /// Distinct sampled-vertex addresses other than the centroid's.
    pub nearby: Vec<String>,
    pub is_water_body: bool,
}

impl AreaContext {
    /// Classifies an area from its centroid address and the addresses of
    /// the sampled vertices (`None` where a lookup failed).
    ///
    /// The area counts as water when the centroid address names a water
    /// body, or when strictly more sampled vertices are water than land.
    pub fn classify(centroid_address: Option<String>, vertex_addresses: &[Option<String>]) -> Self {
        let Some(centroid) = centroid_address else {
            return Self::default();
        };

        let mut water = 0usize;
        let mut land = 0usize;
        let mut nearby: Vec<String> = Vec::new();
        for address in vertex_addresses.iter().flatten() {
            if mentions_water(address) {
                water += 1;
            } else {
                land += 1;
            }
            if *address != centroid && !nearby.contains(address) && nearby.len() < MAX_NEARBY {
                nearby.push(address.clone());
            }
        }

        let is_water_body = mentions_water(&centroid) || water > land;
        if is_water_body {
            tracing::info!("Detected water body near {} ({}/{} sampled points)", centroid, water, water + land);
        }

        Self {
            centroid_address: Some(centroid),
            nearby,
            is_water_body,
        }
    }

    /// Lines appended to the polygon summary.
    pub fn describe(&self) -> String {
        let Some(centroid) = &self.centroid_address else {
            return String::new();
        };
        let mut text = format!("\nThis area is located near or within: {centroid}");
        if !self.nearby.is_empty() {
            text.push_str(&format!("\nNearby areas include: {}", self.nearby.join(", ")));
        }
        if self.is_water_body {
            let name = if mentions_water(centroid) {
                centroid.as_str()
            } else {
                "sea or ocean"
            };
            text.push_str(&format!(
                "\n\nIMPORTANT: This area appears to be primarily a water body ({name})."
            ));
        }
        text
    }
}

/// Vertices sampled for the water heuristic (every other one).
pub fn sampled_vertices(polygon: &Polygon) -> impl Iterator<Item = [f64; 2]> + '_ {
    polygon.vertices().iter().step_by(2).copied()
}

pub struct ChatPrompt<'a> {
    pub data_type: &'a str,
    pub location_name: &'a str,
    pub start_date: &'a str,
    pub end_date: &'a str,
    pub polygon_info: &'a str,
    pub image_count: usize,
}

impl ChatPrompt<'_> {
    pub fn render(&self) -> String {
        let image_info = if self.image_count > 0 {
            format!(
                "You have access to {} satellite images for this area.",
                self.image_count
            )
        } else {
            String::new()
        };
        format!(
            "You are an AI assistant for SpaceData, a platform that provides satellite imagery and analysis.\n\
             You are currently helping a user analyze {} satellite data for {} from {} to {}.\n\n\
             {}\n{}\n\n\
             Your role is to provide expert insights and answer questions about the satellite data and the geographic area.\n\
             Be concise, informative, and scientifically accurate. Focus on providing valuable information about:\n\
             - Land cover and land use in the area\n\
             - Environmental changes and trends\n\
             - Geographic and ecological context\n\
             - Potential applications of this satellite data\n\n\
             If you don't know the answer to a specific question, acknowledge that and suggest what information might be helpful.\n\n\
             Keep responses under 200 words unless the user specifically asks for more detailed information.",
            data_type_name(self.data_type),
            self.location_name,
            self.start_date,
            self.end_date,
            self.polygon_info,
            image_info,
        )
    }
}

pub const HOME_ASSISTANT_PROMPT: &str = "You are an AI assistant for SpaceData, a platform that provides satellite imagery and analysis.\n\
Your role is to help users understand how to use the platform and guide them to connect their wallet \
and explore the available services.\n\n\
Be concise, helpful, and encouraging. Focus on explaining how the platform works and guiding users \
to take the next steps (connecting wallet and exploring services).\n\n\
Key features to highlight:\n\
- Users can connect their Flare wallet to pay for satellite data\n\
- The platform offers urban monitoring, agricultural insights, and coastal monitoring\n\
- Users can select specific areas on a map and date ranges for satellite imagery\n\
- AI analysis is available to provide insights on the satellite data\n\n\
Keep responses under 150 words.";

pub fn estimate_prompt(data_type: &str, polygon_info: &str, start_date: &str, end_date: &str) -> String {
    let product = data_type_name(data_type);
    format!(
        "You are an expert in geographic analysis and Earth observation.\n\n\
         {polygon_info}\n\n\
         The user is purchasing {product} data for this area.\n\n\
         Based ONLY on the geographic location information provided (without satellite imagery), \
         generate an educated estimate of the land cover and recent changes for this area.\n\n\
         Use your knowledge of world geography, typical land use patterns, and regional characteristics \
         to make your best estimate for the area described.\n\n\
         The analysis should cover the period from {start_date} to {end_date}.\n\n\
         IMPORTANT REQUIREMENTS:\n\
         - Land cover percentages MUST sum to exactly 100%\n\
         - Forest percentage should be between 10-70% depending on the location\n\
         - Urban percentage should be between 10-60% depending on the location\n\
         - Water percentage should be between 5-50% depending on the location\n\
         - Change percentages should be small, realistic values between -5% and +5%\n\n\
         Return your response as a JSON object with the following structure:\n\
         {{\n  \"land_cover\": {{\"forest\": float, \"urban\": float, \"water\": float}},\n  \
         \"change\": {{\"forest_change\": float, \"urban_change\": float, \"water_change\": float}},\n  \
         \"insights\": [string, ...]\n}}"
    )
}

pub const ESTIMATE_USER_MESSAGE: &str = "Please provide a geographic analysis for the area described.";

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(data_type_name("S1GRD"), "Sentinel-1 SAR (radar imagery)");
        assert_eq!(data_type_name("MYSTERY"), "MYSTERY");
    }

    #[test]
    fn test_estimate_prompt_names_product() {
        let prompt = estimate_prompt("S1GRD", "Polygon info", "2023-04-15", "2023-04-22");
        assert!(prompt.contains("purchasing Sentinel-1 SAR (radar imagery) data"));
        assert!(prompt.contains("from 2023-04-15 to 2023-04-22"));
        assert!(prompt.contains("Polygon info"));
    }

    #[test]
    fn test_polygon_summary_requires_area() {
        assert!(polygon_summary(&Polygon(vec![[1.0, 2.0], [3.0, 4.0]])).is_none());
        let summary =
            polygon_summary(&Polygon(vec![[41.3, 2.1], [41.3, 2.3], [41.5, 2.3], [41.5, 2.1]])).unwrap();
        assert!(summary.contains("[41.3, 2.1], [41.3, 2.3]"));
        assert!(summary.contains("[41.4000, 2.2000]"));
    }

    #[test]
    fn test_centroid_keyword_marks_water() {
        let context = AreaContext::classify(addr("Balearic Sea"), &[addr("Barcelona, Spain")]);
        assert!(context.is_water_body);
        assert!(context.describe().contains("IMPORTANT: This area appears to be primarily a water body (Balearic Sea)"));
    }

    #[test]
    fn test_vertex_majority_marks_water() {
        let context = AreaContext::classify(
            addr("Sitges, Spain"),
            &[addr("Mediterranean Sea"), addr("Mediterranean Sea"), addr("Sitges, Spain")],
        );
        assert!(context.is_water_body);
        assert!(context.describe().contains("(sea or ocean)"));
        assert_eq!(context.nearby, vec!["Mediterranean Sea".to_string()]);
    }

    #[test]
    fn test_tie_is_land() {
        let context = AreaContext::classify(
            addr("Lleida, Spain"),
            &[addr("Gulf of Lion"), addr("Lleida, Spain"), None],
        );
        assert!(!context.is_water_body);
        assert!(!context.describe().contains("IMPORTANT"));
    }

    #[test]
    fn test_nearby_is_distinct_and_capped() {
        let context = AreaContext::classify(
            addr("Center"),
            &[addr("A"), addr("A"), addr("B"), addr("Center"), addr("C"), addr("D")],
        );
        assert_eq!(context.nearby, vec!["A", "B", "C"]);
        assert!(context.describe().contains("Nearby areas include: A, B, C"));
    }

    #[test]
    fn test_no_centroid_address_means_no_context() {
        let context = AreaContext::classify(None, &[addr("Pacific Ocean")]);
        assert_eq!(context, AreaContext::default());
        assert_eq!(context.describe(), "");
    }

    #[test]
    fn test_sampled_vertices_are_even_indexes() {
        let polygon = Polygon(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]]);
        let sampled: Vec<_> = sampled_vertices(&polygon).collect();
        assert_eq!(sampled, vec![[0.0, 0.0], [2.0, 2.0], [4.0, 4.0]]);
    }
}
