pub mod config;
pub mod error;
pub mod validation;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use musicgen_core::compose::{encode_png_base64, render_cover, write_png_in};
use musicgen_core::{segment_bounds, CoverSettings, FontResolver};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::validation::{
    resolve_background_path, validate_cover_request, validate_font_name, validate_segment_request,
};

#[derive(Clone)]
pub struct AppState {
    pub fonts: Arc<FontResolver>,
    pub request_count: Arc<AtomicU64>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            fonts: Arc::new(FontResolver::new(config.fonts.clone())),
            request_count: Arc::new(AtomicU64::new(0)),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SegmentRequest {
    pub sample_rate: u32,
    pub num_frames: usize,
    #[serde(default = "default_segment_duration")]
    pub segment_duration: u32,
    #[serde(default = "default_overlap")]
    pub overlap: u32,
}

fn default_segment_duration() -> u32 {
    30
}

fn default_overlap() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SegmentInfo {
    pub start: usize,
    pub end: usize,
    pub start_secs: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub segments: Vec<SegmentInfo>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CoverResponse {
    pub path: String,
    pub image_base64: String,
    pub width: u32,
    pub height: u32,
}

/// Build the router with all routes mounted at `/` and under `/api`
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors)
        .into_inner();

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/segments", post(segments_endpoint))
        .route("/cover", post(cover_endpoint));

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state)
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let Some(allowed_origins) = allowed_origins else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        return base.allow_origin(Any);
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
        base.allow_origin(Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(AllowOrigin::list(origins))
    }
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = header.clone() {
        request.headers_mut().insert("x-request-id", value);
    }
    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn segments_endpoint(
    State(state): State<AppState>,
    Json(req): Json<SegmentRequest>,
) -> Result<Json<SegmentResponse>, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    validate_segment_request(req.sample_rate, req.num_frames, req.segment_duration, req.overlap)?;

    let rate = req.sample_rate as usize;
    let segments: Vec<SegmentInfo> = segment_bounds(
        req.num_frames,
        rate * req.segment_duration as usize,
        rate * req.overlap as usize,
    )
    .map_err(|e| ApiError::InvalidInput(e.to_string()))?
    .into_iter()
    .map(|r| SegmentInfo {
        start: r.start,
        end: r.end,
        start_secs: r.start as f64 / req.sample_rate as f64,
    })
    .collect();

    Ok(Json(SegmentResponse {
        count: segments.len(),
        segments,
    }))
}

pub async fn cover_endpoint(
    State(state): State<AppState>,
    Json(mut settings): Json<CoverSettings>,
) -> Result<Json<CoverResponse>, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    validate_cover_request(&settings.title, &settings.description, settings.width, settings.height)?;
    validate_font_name(&settings.font)?;
    if let Some(requested) = settings.background_path.take() {
        let allowed_dir = state.config.cover_background_dir.as_deref();
        settings.background_path = Some(resolve_background_path(&requested, allowed_dir)?);
    }

    let fonts = state.fonts.clone();
    let output_dir = state
        .config
        .cover_output_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);

    // Font downloads and PNG encoding block, keep them off the runtime
    let (path, image_base64, width, height) = tokio::task::spawn_blocking(move || {
        let cover = render_cover(&settings, &fonts);
        let path = write_png_in(&output_dir, &cover)?;
        let image_base64 = encode_png_base64(&cover)?;
        Ok::<_, ApiError>((path, image_base64, cover.width(), cover.height()))
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("Task join error: {e}")))??;

    info!("Cover rendered: {}x{} at {}", width, height, path.display());

    Ok(Json(CoverResponse {
        path: path.display().to_string(),
        image_base64,
        width,
        height,
    }))
}
