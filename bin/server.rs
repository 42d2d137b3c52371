// Freelancer Kit - Web Server
// REST API with Axum: masks, words, pricing and per-user document history

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use freelancer_kit::{
    amount_to_words, delete_document, format_amount, format_phone, format_tax_id, generate,
    get_stats, list_documents, load_profile, parse_amount, record_generated, reload_snapshot,
    save_profile, setup_database, Contract, DocumentKind, DocumentRecord,
    GeneratedDocument, KitError, PricingInput, Profile, Proposal, Receipt, Settings,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn fail(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
    )
        .into_response()
}

/// Map library errors to HTTP statuses; anything else is a 500
fn error_response(err: anyhow::Error) -> Response {
    let status = match err.downcast_ref::<KitError>() {
        Some(KitError::DocumentNotFound(_)) => StatusCode::NOT_FOUND,
        Some(KitError::MissingSnapshot(_)) => StatusCode::CONFLICT,
        Some(KitError::NegativeAmount(_))
        | Some(KitError::NotFinite)
        | Some(KitError::AmountTooLarge(_))
        | Some(KitError::CentsOutOfRange(_))
        | Some(KitError::AmountNotStorable(_))
        | Some(KitError::UnknownDocumentKind(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("request failed: {:#}", err);
    }

    fail(status, err.to_string())
}

/// Run `f` against the database and wrap its result
fn with_db<T, F>(state: &AppState, f: F) -> Response
where
    T: Serialize,
    F: FnOnce(&Connection) -> anyhow::Result<T>,
{
    let conn = match state.db.lock() {
        Ok(conn) => conn,
        Err(_) => {
            error!("database mutex poisoned");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, "database unavailable".to_string());
        }
    };

    match f(&conn) {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Deserialize)]
struct ValueQuery {
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct AmountQuery {
    amount: f64,
}

#[derive(Deserialize)]
struct HistoryQuery {
    tipo: Option<String>,
}

#[derive(Serialize)]
struct MaskResponse {
    input: String,
    masked: String,
}

#[derive(Serialize)]
struct GenerateResponse {
    record: DocumentRecord,
    filename: String,
    html: String,
    count: i64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    ApiResponse::ok("OK")
}

/// GET /api/format/amount?value=
async fn format_amount_handler(Query(q): Query<ValueQuery>) -> impl IntoResponse {
    let masked = format_amount(&q.value);
    ApiResponse::ok(MaskResponse { input: q.value, masked })
}

/// GET /api/parse/amount?value=
async fn parse_amount_handler(Query(q): Query<ValueQuery>) -> impl IntoResponse {
    ApiResponse::ok(parse_amount(&q.value))
}

/// GET /api/format/tax-id?value=
async fn format_tax_id_handler(Query(q): Query<ValueQuery>) -> impl IntoResponse {
    let masked = format_tax_id(&q.value);
    ApiResponse::ok(MaskResponse { input: q.value, masked })
}

/// GET /api/format/phone?value=
async fn format_phone_handler(Query(q): Query<ValueQuery>) -> impl IntoResponse {
    let masked = format_phone(&q.value);
    ApiResponse::ok(MaskResponse { input: q.value, masked })
}

/// GET /api/words?amount=
async fn words_handler(Query(q): Query<AmountQuery>) -> impl IntoResponse {
    match amount_to_words(q.amount) {
        Ok(words) => ApiResponse::ok(words),
        Err(e) => error_response(e.into()),
    }
}

/// POST /api/price
async fn price_handler(Json(input): Json<PricingInput>) -> impl IntoResponse {
    ApiResponse::ok(input.quote())
}

/// GET /api/users/:uid/profile
async fn get_profile(State(state): State<AppState>, Path(uid): Path<String>) -> impl IntoResponse {
    with_db(&state, |conn| Ok(load_profile(conn, &uid)?.unwrap_or_default()))
}

/// PUT /api/users/:uid/profile
async fn put_profile(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(mut profile): Json<Profile>,
) -> impl IntoResponse {
    profile.cpf_cnpj = format_tax_id(&profile.cpf_cnpj);
    profile.phone = format_phone(&profile.phone);

    with_db(&state, |conn| {
        save_profile(conn, &uid, &profile)?;
        Ok(profile.clone())
    })
}

/// GET /api/users/:uid/stats
async fn get_user_stats(State(state): State<AppState>, Path(uid): Path<String>) -> impl IntoResponse {
    with_db(&state, |conn| get_stats(conn, &uid))
}

/// GET /api/users/:uid/documents?tipo=
async fn get_documents(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
    let filter = match q.tipo.as_deref() {
        None | Some("todos") => None,
        Some(kind) => match kind.parse::<DocumentKind>() {
            Ok(kind) => Some(kind),
            Err(e) => return error_response(e.into()),
        },
    };

    with_db(&state, |conn| list_documents(conn, &uid, filter))
}

/// POST /api/users/:uid/generate/:kind - Generate, count and record a document
async fn post_document(
    State(state): State<AppState>,
    Path((uid, kind)): Path<(String, String)>,
    Json(form): Json<serde_json::Value>,
) -> impl IntoResponse {
    let kind = match kind.parse::<DocumentKind>() {
        Ok(kind) => kind,
        Err(e) => return error_response(e.into()),
    };

    with_db(&state, |conn| {
        let profile = load_profile(conn, &uid)?.unwrap_or_default();
        let now = Utc::now();

        let doc: GeneratedDocument = match kind {
            DocumentKind::Proposta => {
                let form: Proposal = serde_json::from_value(form).context("Invalid proposal")?;
                generate(&form, &profile, now)?
            }
            DocumentKind::Contrato => {
                let form: Contract = serde_json::from_value(form).context("Invalid contract")?;
                generate(&form, &profile, now)?
            }
            DocumentKind::Recibo => {
                let form: Receipt = serde_json::from_value(form).context("Invalid receipt")?;
                generate(&form, &profile, now)?
            }
        };

        let (count, record) = record_generated(conn, &uid, &doc, now)?;

        Ok(GenerateResponse {
            record,
            filename: doc.filename,
            html: doc.html,
            count,
        })
    })
}

/// GET /api/users/:uid/documents/:id/edit - Saved form data
async fn edit_document(
    State(state): State<AppState>,
    Path((uid, id)): Path<(String, String)>,
) -> impl IntoResponse {
    with_db(&state, |conn| reload_snapshot(conn, &uid, &id))
}

/// DELETE /api/users/:uid/documents/:id
async fn remove_document(
    State(state): State<AppState>,
    Path((uid, id)): Path<(String, String)>,
) -> impl IntoResponse {
    with_db(&state, |conn| {
        delete_document(conn, &uid, &id)?;
        Ok(id.clone())
    })
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    settings.init_logging()?;

    let conn = Connection::open(&settings.db_path)
        .with_context(|| format!("Failed to open database {:?}", settings.db_path))?;
    setup_database(&conn)?;
    info!(db = %settings.db_path.display(), "database opened");

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/format/amount", get(format_amount_handler))
        .route("/parse/amount", get(parse_amount_handler))
        .route("/format/tax-id", get(format_tax_id_handler))
        .route("/format/phone", get(format_phone_handler))
        .route("/words", get(words_handler))
        .route("/price", post(price_handler))
        .route("/users/:uid/profile", get(get_profile).put(put_profile))
        .route("/users/:uid/stats", get(get_user_stats))
        .route("/users/:uid/documents", get(get_documents))
        .route("/users/:uid/generate/:kind", post(post_document))
        .route("/users/:uid/documents/:id/edit", get(edit_document))
        .route("/users/:uid/documents/:id", axum::routing::delete(remove_document))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let listener = tokio::net::TcpListener::bind(&settings.server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.server_addr))?;

    info!(addr = %settings.server_addr, "server running");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
