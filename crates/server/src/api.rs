//! JSON API for pricing, saving and browsing quotes, plus catalog administration.
//!
//! - `POST /api/quotes/calc`              price without saving
//! - `POST /api/quotes`                   price and save (201 with `{ id }`)
//! - `GET  /api/quotes?q=`                newest first, optional substring filter
//! - `GET  /api/quotes/{id}`              stored snapshot, never recomputed
//! - `GET  /api/quotes/{id}/text`         plain-text rendering
//! - `GET  /api/catalog`                  active materials and rates for quote forms
//! - `/api/admin/{rates,materials,shipping,packaging}` maintenance, guarded by
//!   `x-admin-token` when a token is configured

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, Request, State,
    },
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use printquote_core::config::AppConfig;
use printquote_core::domain::catalog::{
    Material, MaterialInput, PackagingRate, PackagingRateInput, RateConfig, ShippingRate,
    ShippingRateInput,
};
use printquote_core::domain::quote::{QuoteDetail, QuoteId, QuoteRequest, QuoteSummary};
use printquote_core::errors::{ApplicationError, InterfaceError};
use printquote_db::{PricedQuote, QuoteService};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Clone)]
pub struct ApiState {
    service: Arc<QuoteService>,
    config: Arc<AppConfig>,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    correlation_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ApplicationError> for ApiError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        match &value {
            ApplicationError::Domain(_) => {
                info!(
                    event_name = "api.request.rejected",
                    correlation_id = %correlation_id,
                    error = %value,
                    "request rejected"
                );
            }
            _ => {
                error!(
                    event_name = "api.request.failed",
                    correlation_id = %correlation_id,
                    error = %value,
                    "request failed"
                );
            }
        }
        Self(value.into_interface(correlation_id))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self(InterfaceError::BadRequest { message, correlation_id: Uuid::new_v4().to_string() })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedQuote {
    pub id: QuoteId,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub materials: Vec<Material>,
    pub shipping_rates: Vec<ShippingRate>,
    pub packaging_rates: Vec<PackagingRate>,
}

pub fn router(service: Arc<QuoteService>, config: Arc<AppConfig>) -> Router {
    let state = ApiState { service, config };

    let admin = Router::new()
        .route("/rates", get(get_rates).put(update_rates))
        .route("/materials", get(list_materials).post(create_material))
        .route("/materials/{id}", put(update_material))
        .route("/shipping", get(list_shipping).post(create_shipping))
        .route("/shipping/{id}", put(update_shipping))
        .route("/packaging", get(list_packaging).post(create_packaging))
        .route("/packaging/{id}", put(update_packaging))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin_token));

    Router::new()
        .route("/api/quotes/calc", post(calculate_quote))
        .route("/api/quotes", get(list_quotes).post(save_quote))
        .route("/api/quotes/{id}", get(quote_detail))
        .route("/api/quotes/{id}/text", get(quote_text))
        .route("/api/catalog", get(active_catalog))
        .nest("/api/admin", admin)
        .with_state(state)
}

async fn require_admin_token(
    State(state): State<ApiState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let candidate = headers.get(ADMIN_TOKEN_HEADER).and_then(|value| value.to_str().ok());
    if state.config.admin_token_matches(candidate) {
        return next.run(request).await;
    }

    let correlation_id = Uuid::new_v4().to_string();
    warn!(
        event_name = "api.admin.unauthorized",
        correlation_id = %correlation_id,
        path = %request.uri().path(),
        "admin request without a valid token"
    );
    ApiError(InterfaceError::Unauthorized {
        message: "missing or invalid admin token".to_string(),
        correlation_id,
    })
    .into_response()
}

async fn calculate_quote(
    State(state): State<ApiState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> ApiResult<Json<PricedQuote>> {
    let Json(request) = payload?;
    Ok(Json(state.service.price(request).await?))
}

async fn save_quote(
    State(state): State<ApiState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedQuote>)> {
    let Json(request) = payload?;
    let id = state.service.save(request).await?;
    Ok((StatusCode::CREATED, Json(CreatedQuote { id })))
}

async fn list_quotes(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<QuoteSummary>>> {
    let search = query.q.unwrap_or_default();
    Ok(Json(state.service.list_quotes(&search).await?))
}

async fn quote_detail(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<QuoteDetail>> {
    let Path(id) = id?;
    Ok(Json(state.service.detail(QuoteId(id)).await?))
}

async fn quote_text(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Response> {
    let Path(id) = id?;
    let text = state.service.text(QuoteId(id)).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response())
}

async fn active_catalog(State(state): State<ApiState>) -> ApiResult<Json<CatalogResponse>> {
    Ok(Json(CatalogResponse {
        materials: state.service.materials(true).await?,
        shipping_rates: state.service.shipping_rates(true).await?,
        packaging_rates: state.service.packaging_rates(true).await?,
    }))
}

async fn get_rates(State(state): State<ApiState>) -> ApiResult<Json<RateConfig>> {
    Ok(Json(state.service.rate_config().await?))
}

async fn update_rates(
    State(state): State<ApiState>,
    payload: Result<Json<RateConfig>, JsonRejection>,
) -> ApiResult<Json<RateConfig>> {
    let Json(config) = payload?;
    Ok(Json(state.service.update_rate_config(config).await?))
}

async fn list_materials(State(state): State<ApiState>) -> ApiResult<Json<Vec<Material>>> {
    Ok(Json(state.service.materials(false).await?))
}

async fn create_material(
    State(state): State<ApiState>,
    payload: Result<Json<MaterialInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Material>)> {
    let Json(input) = payload?;
    Ok((StatusCode::CREATED, Json(state.service.create_material(input).await?)))
}

async fn update_material(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MaterialInput>, JsonRejection>,
) -> ApiResult<Json<Material>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(Json(state.service.update_material(id, input).await?))
}

async fn list_shipping(State(state): State<ApiState>) -> ApiResult<Json<Vec<ShippingRate>>> {
    Ok(Json(state.service.shipping_rates(false).await?))
}

async fn create_shipping(
    State(state): State<ApiState>,
    payload: Result<Json<ShippingRateInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ShippingRate>)> {
    let Json(input) = payload?;
    Ok((StatusCode::CREATED, Json(state.service.create_shipping_rate(input).await?)))
}

async fn update_shipping(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ShippingRateInput>, JsonRejection>,
) -> ApiResult<Json<ShippingRate>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(Json(state.service.update_shipping_rate(id, input).await?))
}

async fn list_packaging(State(state): State<ApiState>) -> ApiResult<Json<Vec<PackagingRate>>> {
    Ok(Json(state.service.packaging_rates(false).await?))
}

async fn create_packaging(
    State(state): State<ApiState>,
    payload: Result<Json<PackagingRateInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PackagingRate>)> {
    let Json(input) = payload?;
    Ok((StatusCode::CREATED, Json(state.service.create_packaging_rate(input).await?)))
}

async fn update_packaging(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PackagingRateInput>, JsonRejection>,
) -> ApiResult<Json<PackagingRate>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(Json(state.service.update_packaging_rate(id, input).await?))
}
