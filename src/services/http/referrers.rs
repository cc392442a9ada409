use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{invalid_payload, AppState};
use crate::models::referrers::NewReferrer;
use crate::services::{self, referrers::ReferrerRequest, ServiceError};

pub async fn list_referrers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let referrers = services::call("Http => Referrers", &state.referrer_channel, |response| {
        ReferrerRequest::ListReferrers { response }
    })
    .await?;

    Ok(Json(referrers))
}

pub async fn get_referrer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let referrer = services::call("Http => Referrers", &state.referrer_channel, |response| {
        ReferrerRequest::GetReferrer { id, response }
    })
    .await?;

    Ok(Json(referrer))
}

pub async fn create_referrer(
    State(state): State<AppState>,
    payload: Result<Json<NewReferrer>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(referrer) = payload.map_err(invalid_payload)?;

    let referrer = services::call("Http => Referrers", &state.referrer_channel, |response| {
        ReferrerRequest::CreateReferrer { referrer, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(referrer)))
}
