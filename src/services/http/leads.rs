use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{invalid_payload, AppState};
use crate::models::leads::{NewLeads, StatusUpdate};
use crate::services::{self, leads::LeadRequest, ServiceError};

pub async fn list_leads(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let leads = services::call("Http => Leads", &state.lead_channel, |response| {
        LeadRequest::ListLeads { response }
    })
    .await?;

    Ok(Json(leads))
}

pub async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let lead = services::call("Http => Leads", &state.lead_channel, |response| {
        LeadRequest::GetLead { id, response }
    })
    .await?;

    Ok(Json(lead))
}

pub async fn list_leads_by_referrer(
    State(state): State<AppState>,
    Path(referrer_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let leads = services::call("Http => Leads", &state.lead_channel, |response| {
        LeadRequest::ListLeadsByReferrer {
            referrer_id,
            response,
        }
    })
    .await?;

    Ok(Json(leads))
}

/// Accepts either a single lead keyed by referral code or a batch keyed by
/// referrer id. A batch is stored all-or-nothing.
pub async fn create_leads(
    State(state): State<AppState>,
    payload: Result<Json<NewLeads>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(leads) = payload.map_err(invalid_payload)?;

    let created = services::call("Http => Leads", &state.lead_channel, |response| {
        LeadRequest::CreateLeads { leads, response }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_lead_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let Json(update) = payload.map_err(invalid_payload)?;

    let lead = services::call("Http => Leads", &state.lead_channel, |response| {
        LeadRequest::UpdateLeadStatus {
            id,
            status: update.status,
            response,
        }
    })
    .await?;

    Ok(Json(lead))
}
