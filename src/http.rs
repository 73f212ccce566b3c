use crate::backend::SlotBackend;
use crate::configuration::Configuration;
use crate::error::SlotError;
use crate::types::{normalize, Booking, Customer, Slot, SlotKey, DATE_REGEX, TIME_REGEX};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;
use validator::Validate;

#[derive(Clone)]
pub struct AppState<T: SlotBackend> {
    slot_backend: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct SlotRequest {
    #[serde(default)]
    #[validate(regex(path = *DATE_REGEX, message = "date must be YYYY-MM-DD"))]
    date: String,
    #[serde(default)]
    #[validate(regex(path = *TIME_REGEX, message = "time must be HH:MM"))]
    time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
struct BookingRequest {
    #[serde(default)]
    #[validate(regex(path = *DATE_REGEX, message = "date must be YYYY-MM-DD"))]
    date: String,
    #[serde(default)]
    #[validate(regex(path = *TIME_REGEX, message = "time must be HH:MM"))]
    time: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlotsQuery {
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct SlotResponse {
    message: &'static str,
    slot: Slot,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

impl IntoResponse for SlotError {
    fn into_response(self) -> Response {
        let status = match &self {
            SlotError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SlotError::AlreadyExists | SlotError::AlreadyBooked => StatusCode::CONFLICT,
            SlotError::NotFound => StatusCode::NOT_FOUND,
            SlotError::StorageUnavailable(details) => {
                error!(%details, "Storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.reason() }))).into_response()
    }
}

impl From<JsonRejection> for SlotError {
    fn from(rejection: JsonRejection) -> Self {
        SlotError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for SlotError {
    fn from(rejection: QueryRejection) -> Self {
        SlotError::InvalidInput(rejection.body_text())
    }
}

pub fn create_app<T: SlotBackend, C: Configuration>(slot_backend: T, configuration: C) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/times", get(get_slots))
        .route("/api/book", post(book_slot));

    let admin = Router::new()
        .route("/api/admin/add-time", post(add_slot))
        .route("/api/admin/delete-time", post(delete_slot))
        .route("/api/admin/bookings", get(get_bookings));

    let app = Router::new().merge(public).merge(admin);
    let app = match configuration.public_dir() {
        Some(public_dir) => app.fallback_service(ServeDir::new(public_dir)),
        None => app.route("/", get(banner)),
    };

    app.with_state(AppState { slot_backend })
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Backends block on locks, disk and database, so they run off the async workers.
async fn run_blocking<T, R, F>(slot_backend: T, operation: F) -> Result<R, SlotError>
where
    T: SlotBackend,
    R: Send + 'static,
    F: FnOnce(T) -> Result<R, SlotError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || operation(slot_backend))
        .await
        .map_err(|err| SlotError::StorageUnavailable(err.to_string()))?
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn banner() -> &'static str {
    "Slot booking API is running"
}

async fn get_slots<T: SlotBackend>(
    State(state): State<AppState<T>>,
    query: Result<Query<SlotsQuery>, QueryRejection>,
) -> Result<Json<Vec<Slot>>, SlotError> {
    let Query(query) = query?;
    let date = query.date.filter(|date| !date.is_empty());
    let slots = run_blocking(state.slot_backend, move |backend| {
        backend.slots(date.as_deref())
    })
    .await?;
    Ok(Json(slots))
}

async fn add_slot<T: SlotBackend>(
    State(state): State<AppState<T>>,
    payload: Result<Json<SlotRequest>, JsonRejection>,
) -> Result<Json<SlotResponse>, SlotError> {
    let Json(request) = payload?;
    request.validate()?;
    let key = SlotKey::new(request.date, request.time)?;

    let slot = run_blocking(state.slot_backend, move |backend| backend.add_slot(key)).await?;
    Ok(Json(SlotResponse {
        message: "Slot added",
        slot,
    }))
}

async fn delete_slot<T: SlotBackend>(
    State(state): State<AppState<T>>,
    payload: Result<Json<SlotRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, SlotError> {
    let Json(request) = payload?;
    request.validate()?;
    let key = SlotKey::new(request.date, request.time)?;

    run_blocking(state.slot_backend, move |backend| backend.delete_slot(&key)).await?;
    Ok(Json(MessageResponse {
        message: "Slot deleted",
    }))
}

async fn book_slot<T: SlotBackend>(
    State(state): State<AppState<T>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<SlotResponse>, SlotError> {
    let Json(mut request) = payload?;
    // Blank optional fields count as absent, whatever their length.
    request.phone = normalize(request.phone);
    request.note = normalize(request.note);
    request.validate()?;
    let key = SlotKey::new(request.date, request.time)?;
    let customer = Customer::new(request.name, request.phone, request.note)?;

    let slot = run_blocking(state.slot_backend, move |backend| {
        backend.book_slot(&key, customer)
    })
    .await?;
    Ok(Json(SlotResponse {
        message: "Booking confirmed",
        slot,
    }))
}

async fn get_bookings<T: SlotBackend>(
    State(state): State<AppState<T>>,
) -> Result<Json<Vec<Booking>>, SlotError> {
    let bookings = run_blocking(state.slot_backend, |backend| backend.bookings()).await?;
    Ok(Json(bookings))
}
