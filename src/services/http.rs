use axum::{
    extract::rejection::JsonRejection,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{
    leads::LeadRequest, prizes::PrizeRequest, referrers::ReferrerRequest,
    reports::ReportRequest, ServiceError,
};
use crate::utils;

mod leads;
mod prizes;
mod referrers;
mod reports;

#[derive(Clone)]
pub struct AppState {
    pub referrer_channel: mpsc::Sender<ReferrerRequest>,
    pub lead_channel: mpsc::Sender<LeadRequest>,
    pub prize_channel: mpsc::Sender<PrizeRequest>,
    pub report_channel: mpsc::Sender<ReportRequest>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServiceError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ServiceError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ServiceError::Conflict(message) => (StatusCode::CONFLICT, message),
            ServiceError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Método não permitido".to_string(),
            ),
            other => {
                log::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Erro interno do servidor".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn invalid_payload(rejection: JsonRejection) -> ServiceError {
    ServiceError::Validation(format!("Dados inválidos: {}", rejection.body_text()))
}

/// Answers verbs a known path does not route. Plain `OPTIONS` requests get a
/// 200 so every endpoint can be probed; CORS preflights never reach here.
async fn method_fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    ServiceError::MethodNotAllowed.into_response()
}

async fn not_found(method: Method) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    ServiceError::NotFound("Rota não encontrada".to_string()).into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "message": "Campanha de indicações no ar",
        "timestamp": utils::format_timestamp(&utils::now()),
    }))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api = Router::new()
        .route("/health", get(health).fallback(method_fallback))
        .route(
            "/indicadores",
            get(referrers::list_referrers)
                .post(referrers::create_referrer)
                .fallback(method_fallback),
        )
        .route(
            "/indicadores/{id}",
            get(referrers::get_referrer).fallback(method_fallback),
        )
        .route(
            "/leads",
            get(leads::list_leads)
                .post(leads::create_leads)
                .fallback(method_fallback),
        )
        .route("/leads/{id}", get(leads::get_lead).fallback(method_fallback))
        .route(
            "/leads/indicador/{id}",
            get(leads::list_leads_by_referrer).fallback(method_fallback),
        )
        .route(
            "/leads/{id}/status",
            put(leads::update_lead_status).fallback(method_fallback),
        )
        .route(
            "/premios",
            get(prizes::list_prizes)
                .post(prizes::record_prize)
                .fallback(method_fallback),
        )
        .route(
            "/premios/catalogo",
            get(prizes::get_catalog).fallback(method_fallback),
        )
        .route(
            "/premios/sortear",
            post(prizes::draw_prize).fallback(method_fallback),
        )
        .route(
            "/premios/indicador/{id}",
            get(prizes::get_latest_prize).fallback(method_fallback),
        )
        .route("/stats", get(reports::get_stats).fallback(method_fallback))
        .route(
            "/exportar",
            get(reports::export_all).fallback(method_fallback),
        )
        .route(
            "/download/{tipo}",
            get(reports::download_table).fallback(method_fallback),
        );

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(listen: &str, state: AppState) -> Result<(), anyhow::Error> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
