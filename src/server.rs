use crate::domain::{CountryAggregate, RegionRecord};
use crate::error::TrackerError;
use crate::geocode::{Geocoder, PlaceDetails};
use crate::ingest::{IngestCycle, IngestReport};
use crate::query::QueryService;
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub struct AppState {
    pub query: QueryService,
    pub ingest: IngestCycle,
    pub geocoder: Arc<dyn Geocoder>,
}

/// Error shape returned to HTTP clients.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        let status = match &err {
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "covid-tracker",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Splits a `lat,lon` path segment into trimmed, non-empty halves.
fn parse_lat_lon(raw: &str) -> Option<(String, String)> {
    let mut parts = raw.split(',').map(str::trim);
    let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    if lat.is_empty() || lon.is_empty() {
        return None;
    }
    Some((lat.to_string(), lon.to_string()))
}

/// Resolves coordinates to a place and rejects anything outside the
/// country's scope.
async fn resolve_place(state: &AppState, lat: &str, lon: &str) -> Result<PlaceDetails, ApiError> {
    let place = state
        .geocoder
        .reverse(lat, lon)
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if !place.country.eq_ignore_ascii_case("india") {
        return Err(ApiError::bad_request("Coordinates should be within India"));
    }
    if place.state.is_empty() {
        return Err(ApiError::bad_request(
            "Unable to figure out the state for given coordinates",
        ));
    }
    Ok(place)
}

#[derive(Serialize)]
struct UserLocationStats {
    state: RegionRecord,
    country: CountryAggregate,
}

async fn user_location_stats(
    Extension(state): Extension<Arc<AppState>>,
    Path(lat_lon): Path<String>,
) -> Result<Json<UserLocationStats>, ApiError> {
    let (lat, lon) =
        parse_lat_lon(&lat_lon).ok_or_else(|| ApiError::bad_request("Invalid coordinates"))?;

    let place = resolve_place(&state, &lat, &lon).await?;

    let region = state.query.get_by_name(&place.state).await?;
    let country = state.query.country_total().await?;

    Ok(Json(UserLocationStats {
        state: region,
        country,
    }))
}

#[derive(Deserialize)]
struct PlaceQuery {
    #[serde(default)]
    lat: String,
    #[serde(default)]
    lng: String,
}

async fn user_place(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<PlaceQuery>,
) -> Result<Json<PlaceDetails>, ApiError> {
    let (lat, lng) = (params.lat.trim(), params.lng.trim());
    if lat.is_empty() || lng.is_empty() {
        return Err(ApiError::bad_request("Invalid coordinates"));
    }

    let place = resolve_place(&state, lat, lng).await?;
    Ok(Json(place))
}

async fn stats_by_codes(
    Extension(state): Extension<Arc<AppState>>,
    Path(codes): Path<String>,
) -> Result<Json<Vec<RegionRecord>>, ApiError> {
    let codes: Vec<String> = codes.split(',').map(|c| c.trim().to_string()).collect();
    for code in &codes {
        if code.is_empty() || code.len() > 2 {
            return Err(ApiError::bad_request(format!("Invalid state code: {code}")));
        }
    }

    let records = state.query.get_by_codes(&codes).await?;
    Ok(Json(records))
}

async fn update_covid_data(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<IngestReport>, ApiError> {
    let report = state.ingest.run().await?;
    Ok(Json(report))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/covid/user/:lat_lon", get(user_location_stats))
        .route("/user", get(user_place))
        .route("/covid/state/:codes", get(stats_by_codes))
        .route("/covid/update", post(update_covid_data))
        .layer(ServiceBuilder::new().layer(cors).layer(Extension(state)))
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Listening on http://{}", addr);
    Server::bind(&addr)
        .serve(router(state).into_make_service())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_coordinates() {
        assert_eq!(
            parse_lat_lon("12.97, 77.59"),
            Some(("12.97".to_string(), "77.59".to_string()))
        );
    }

    #[test]
    fn rejects_wrong_arity() {
        assert_eq!(parse_lat_lon("12.97"), None);
        assert_eq!(parse_lat_lon("12.97,77.59,0"), None);
    }

    #[test]
    fn rejects_empty_halves() {
        assert_eq!(parse_lat_lon(",77.59"), None);
        assert_eq!(parse_lat_lon("12.97, "), None);
    }
}
