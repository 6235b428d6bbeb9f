//! Browser-facing pages and form handlers.
//!
//! Pages are minimal HTML shells. The results view is JSON so any
//! front end can render it.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::SearchQuery;
use crate::error::AppError;
use crate::models::{ChatTurn, LandCoverEstimate, Polygon};
use crate::narrative::{ChatContext, EstimateContext};
use crate::state::AppState;

pub const PLACEHOLDER_IMAGE: &str = "/static/placeholder.jpg";

const DEFAULT_DATA_TYPE: &str = "S2MSI2A";
const DEFAULT_START_DATE: &str = "2023-04-15";
const DEFAULT_END_DATE: &str = "2023-04-22";
const DEFAULT_LOCATION: &str = "Selected Area";
const DEFAULT_AREA_KM2: f64 = 100.0;
const RESULTS_SCENE_LIMIT: u32 = 5;
const SEED_QUESTION: &str = "What can you tell me about the urban development in this area?";

/// Creates the page router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/blockchain-test", get(blockchain_test))
        .route("/data-selection", get(data_selection))
        .route("/process-selection", post(process_selection))
        .route("/data-results", get(data_results))
        .route("/chat-message", post(chat_message))
        .with_state(state)
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n{body}\n</body>\n</html>\n"
    ))
}

/// Escapes text for inclusion in HTML element content or attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

async fn index() -> Html<String> {
    page(
        "SpaceData",
        "<h1>SpaceData</h1>\n<p><a href=\"/data-selection\">Select an area</a></p>",
    )
}

async fn blockchain_test() -> Html<String> {
    page(
        "SpaceData - Blockchain Test",
        "<h1>Blockchain Test</h1>\n<p>Configuration: <a href=\"/api/blockchain/config\">/api/blockchain/config</a></p>",
    )
}

#[derive(Debug, Deserialize)]
struct SelectionQuery {
    #[serde(default)]
    query: String,
}

async fn data_selection(Query(params): Query<SelectionQuery>) -> Html<String> {
    let query = escape_html(&params.query);
    page(
        "SpaceData - Data Selection",
        &format!(
            "<h1>Data Selection</h1>\n<form method=\"post\" action=\"/process-selection\">\n\
             <input type=\"hidden\" name=\"query\" value=\"{query}\">\n\
             <p id=\"assistant-query\">{query}</p>\n</form>"
        ),
    )
}

/// Data-selection form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionForm {
    pub data_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub coordinates: Option<String>,
    /// Checkbox; present means enabled.
    pub ai_analysis: Option<String>,
    pub tx_hash: Option<String>,
    pub request_id: Option<String>,
}

/// Query string of the results page.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ResultsParams {
    pub data_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub coordinates: Option<String>,
    pub ai_analysis: Option<String>,
    pub tx_hash: Option<String>,
    pub request_id: Option<String>,
    pub view: Option<String>,
}

/// Placeholder transaction hash for purchases made without a wallet.
fn generated_tx_hash() -> String {
    format!("0x{}", &Uuid::new_v4().simple().to_string()[..16])
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn process_selection(Form(form): Form<SelectionForm>) -> Result<Redirect, AppError> {
    let params = ResultsParams {
        data_type: Some(non_empty(form.data_type).unwrap_or_else(|| DEFAULT_DATA_TYPE.to_string())),
        start_date: Some(non_empty(form.start_date).unwrap_or_else(|| DEFAULT_START_DATE.to_string())),
        end_date: Some(non_empty(form.end_date).unwrap_or_else(|| DEFAULT_END_DATE.to_string())),
        coordinates: Some(form.coordinates.unwrap_or_default()),
        ai_analysis: Some(form.ai_analysis.is_some().to_string()),
        tx_hash: Some(non_empty(form.tx_hash).unwrap_or_else(generated_tx_hash)),
        request_id: Some(form.request_id.unwrap_or_default()),
        view: None,
    };

    let query = serde_urlencoded::to_string(&params)
        .map_err(|e| AppError::Internal(format!("Failed to encode results query: {e}")))?;
    Ok(Redirect::to(&format!("/data-results?{query}")))
}

/// Results view returned by `/data-results`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsView {
    pub data_type: String,
    pub start_date: String,
    pub end_date: String,
    pub coordinates: String,
    pub satellite_image_urls: Vec<String>,
    pub scene_ids: Vec<String>,
    pub cloud_cover: f64,
    pub area_size: f64,
    pub location_name: String,
    pub analysis: Option<LandCoverEstimate>,
    pub chat_messages: Vec<ChatTurn>,
    pub tx_hash: String,
    pub request_id: String,
    pub view: String,
}

/// Opening exchange shown beside a fresh analysis.
fn seed_conversation(estimate: &LandCoverEstimate) -> Vec<ChatTurn> {
    vec![
        ChatTurn::user(SEED_QUESTION),
        ChatTurn::ai(format!(
            "The urban areas cover approximately {}% of the region and have changed by {}% over the selected period.",
            estimate.land_cover.urban, estimate.change.urban_change
        )),
    ]
}

async fn data_results(
    State(state): State<AppState>,
    Query(params): Query<ResultsParams>,
) -> Json<ResultsView> {
    let data_type = non_empty(params.data_type).unwrap_or_else(|| DEFAULT_DATA_TYPE.to_string());
    let start_date = non_empty(params.start_date).unwrap_or_else(|| DEFAULT_START_DATE.to_string());
    let end_date = non_empty(params.end_date).unwrap_or_else(|| DEFAULT_END_DATE.to_string());
    let coordinates = params.coordinates.unwrap_or_default();
    let ai_analysis = params
        .ai_analysis
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(true);
    let polygon = Polygon::parse(&coordinates);

    let mut query = SearchQuery::new(&data_type, polygon.clone(), &start_date, &end_date);
    query.limit = RESULTS_SCENE_LIMIT;
    let scenes = state.catalog.search(&query).await;

    let mut satellite_image_urls: Vec<String> =
        scenes.iter().filter_map(|s| s.thumbnail_url.clone()).collect();
    if satellite_image_urls.is_empty() {
        tracing::warn!("No satellite images found, using placeholder");
        satellite_image_urls.push(PLACEHOLDER_IMAGE.to_string());
    }

    let first = scenes.first();
    let cloud_cover = first.map(|s| s.cloud_cover_percent).unwrap_or(0.0);
    let area_size = first
        .and_then(|s| s.bbox)
        .map(|bbox| bbox.area_km2().round())
        .unwrap_or(DEFAULT_AREA_KM2);

    let analysis = if ai_analysis {
        let context = EstimateContext {
            data_type: data_type.clone(),
            location_name: DEFAULT_LOCATION.to_string(),
            start_date: start_date.clone(),
            end_date: end_date.clone(),
            polygon,
        };
        Some(state.narrative.structured_estimate(&context).await)
    } else {
        None
    };
    let chat_messages = analysis.as_ref().map(seed_conversation).unwrap_or_default();

    Json(ResultsView {
        data_type,
        start_date,
        end_date,
        coordinates,
        satellite_image_urls,
        scene_ids: scenes.into_iter().map(|s| s.id).collect(),
        cloud_cover,
        area_size,
        location_name: DEFAULT_LOCATION.to_string(),
        analysis,
        chat_messages,
        tx_hash: params.tx_hash.unwrap_or_else(|| format!("0x{}", "0".repeat(16))),
        request_id: params.request_id.unwrap_or_default(),
        view: params.view.unwrap_or_else(|| "analysis".to_string()),
    })
}

#[derive(Debug, Serialize)]
struct ChatReply {
    response: String,
}

/// Chat form; fields are read from raw pairs so `image_urls[]` may repeat.
async fn chat_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let field = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };
    let image_count = fields.iter().filter(|(key, _)| key == "image_urls[]").count();

    let message = field("message").unwrap_or_default();
    let context = ChatContext {
        data_type: non_empty(field("data_type")).unwrap_or_else(|| DEFAULT_DATA_TYPE.to_string()),
        location_name: non_empty(field("location_name")).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        start_date: non_empty(field("start_date")).unwrap_or_else(|| DEFAULT_START_DATE.to_string()),
        end_date: non_empty(field("end_date")).unwrap_or_else(|| DEFAULT_END_DATE.to_string()),
        polygon: field("coordinates").as_deref().and_then(Polygon::parse),
        image_count,
    };

    let response = state.narrative.chat_reply(&message, &context).await;
    tracing::info!("Generated AI response for query: {}", message);

    let is_ajax = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "XMLHttpRequest");
    if is_ajax {
        Json(ChatReply { response }).into_response()
    } else {
        Redirect::to("/data-results").into_response()
    }
}
