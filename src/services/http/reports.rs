use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};

use super::AppState;
use crate::repositories::store::Table;
use crate::services::{self, reports::ReportRequest, ServiceError};

pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let stats = services::call("Http => Reports", &state.report_channel, |response| {
        ReportRequest::GetStats { response }
    })
    .await?;

    Ok(Json(stats))
}

pub async fn export_all(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let export = services::call("Http => Reports", &state.report_channel, |response| {
        ReportRequest::ExportAll { response }
    })
    .await?;

    Ok(Json(export))
}

pub async fn download_table(
    State(state): State<AppState>,
    Path(tipo): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let table: Table = tipo
        .parse()
        .map_err(|_| ServiceError::Validation(format!("Tipo inválido: {}", tipo)))?;

    let content = services::call("Http => Reports", &state.report_channel, |response| {
        ReportRequest::DownloadTable { table, response }
    })
    .await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", table.file_name()),
        ),
    ];

    Ok((headers, content))
}
