//! AI assistant replies and land-cover estimates.
//!
//! Every public operation here is infallible from the caller's point of
//! view: failures are logged and replaced with fixed fallback text.

pub mod completion;
pub mod extract;
pub mod prompt;

use crate::geocoding::Geocoder;
use crate::models::{LandCoverEstimate, Polygon};

pub use completion::{ChatCompletionClient, Message};
pub use extract::{extract_estimate, Extraction, GEOGRAPHIC_ONLY_NOTE};
pub use prompt::{data_type_name, polygon_summary, AreaContext};

const TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 300;
const HOME_MAX_TOKENS: u32 = 200;
const ESTIMATE_MAX_TOKENS: u32 = 500;

pub const HOME_ASSISTANT_FALLBACK: &str = "I'm here to help you use SpaceData! You can connect your wallet using the button below, then explore our satellite data services. If you have specific questions about our urban monitoring, agricultural insights, or coastal monitoring services, feel free to ask.";

#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("AI service is not configured")]
    NotConfigured,

    #[error("AI request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed AI response: {0}")]
    Malformed(String),
}

/// Fallback chat reply naming the location.
pub fn chat_fallback(location_name: &str) -> String {
    format!(
        "I'm sorry, I encountered an issue while analyzing the satellite data for {location_name}. \
         The system is still processing your request. Please try again in a moment, or ask a \
         different question about the data or the region."
    )
}

/// What the results-page assistant knows about the current selection.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub data_type: String,
    pub location_name: String,
    pub start_date: String,
    pub end_date: String,
    pub polygon: Option<Polygon>,
    pub image_count: usize,
}

#[derive(Debug, Clone)]
pub struct EstimateContext {
    pub data_type: String,
    pub location_name: String,
    pub start_date: String,
    pub end_date: String,
    pub polygon: Option<Polygon>,
}

#[derive(Clone)]
pub struct NarrativeGenerator {
    completions: ChatCompletionClient,
    geocoder: Geocoder,
}

impl NarrativeGenerator {
    pub fn new(completions: ChatCompletionClient, geocoder: Geocoder) -> Self {
        Self {
            completions,
            geocoder,
        }
    }

    /// Answers a question about the selected data.
    pub async fn chat_reply(&self, query: &str, context: &ChatContext) -> String {
        let mut polygon_info = context
            .polygon
            .as_ref()
            .and_then(polygon_summary)
            .unwrap_or_default();

        if let Some([lat, lng]) = context
            .polygon
            .as_ref()
            .filter(|p| p.is_area())
            .and_then(Polygon::centroid)
        {
            if let Some(address) = self.geocoder.reverse_lookup(lat, lng).await {
                polygon_info.push_str(&format!("\nThis area is located near or within: {address}"));
            }
        }

        let system = prompt::ChatPrompt {
            data_type: &context.data_type,
            location_name: &context.location_name,
            start_date: &context.start_date,
            end_date: &context.end_date,
            polygon_info: &polygon_info,
            image_count: context.image_count,
        }
        .render();

        let messages = [Message::system(system), Message::user(query)];
        match self
            .completions
            .complete(&messages, CHAT_MAX_TOKENS, TEMPERATURE)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Error generating chat response: {}", e);
                chat_fallback(&context.location_name)
            }
        }
    }

    /// Answers a general question on the home page.
    pub async fn home_assistant_reply(&self, query: &str) -> String {
        let messages = [
            Message::system(prompt::HOME_ASSISTANT_PROMPT),
            Message::user(query),
        ];
        match self
            .completions
            .complete(&messages, HOME_MAX_TOKENS, TEMPERATURE)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Error generating home assistant response: {}", e);
                HOME_ASSISTANT_FALLBACK.to_string()
            }
        }
    }

    /// Land-cover estimate from geographic context alone. Returns
    /// [`LandCoverEstimate::fallback`] when there is no usable polygon or
    /// the model reply cannot be used.
    pub async fn structured_estimate(&self, context: &EstimateContext) -> LandCoverEstimate {
        let fallback = || {
            LandCoverEstimate::fallback(&context.location_name, &context.start_date, &context.end_date)
        };

        let Some(polygon) = context.polygon.as_ref() else {
            tracing::warn!("No polygon for {}, returning default estimate", context.location_name);
            return fallback();
        };
        let Some(mut polygon_info) = polygon_summary(polygon) else {
            tracing::warn!("Polygon has fewer than 3 vertices, returning default estimate");
            return fallback();
        };

        let area = self.area_context(polygon).await;
        polygon_info.push_str(&area.describe());
        tracing::info!("Generated polygon information for coordinates: {}", polygon_info);

        let messages = [
            Message::system(prompt::estimate_prompt(
                &context.data_type,
                &polygon_info,
                &context.start_date,
                &context.end_date,
            )),
            Message::user(prompt::ESTIMATE_USER_MESSAGE),
        ];

        let text = match self
            .completions
            .complete(&messages, ESTIMATE_MAX_TOKENS, TEMPERATURE)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Error calling AI service for estimate: {}", e);
                return fallback();
            }
        };

        match extract_estimate(&text) {
            Extraction::Parsed(estimate) => {
                tracing::info!("Generated land-cover estimate from geographic information");
                estimate
            }
            Extraction::Unparseable(reason) => {
                tracing::error!("Error parsing estimate: {}", reason);
                tracing::warn!("All analysis approaches failed, returning default results");
                fallback()
            }
        }
    }

    async fn area_context(&self, polygon: &Polygon) -> AreaContext {
        let Some([lat, lng]) = polygon.centroid() else {
            return AreaContext::default();
        };
        let Some(centroid_address) = self.geocoder.reverse_lookup(lat, lng).await else {
            return AreaContext::default();
        };

        let mut vertex_addresses = Vec::new();
        for [lat, lng] in prompt::sampled_vertices(polygon) {
            vertex_addresses.push(self.geocoder.reverse_lookup(lat, lng).await);
        }
        AreaContext::classify(Some(centroid_address), &vertex_addresses)
    }
}
