use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::referrers::ReferrerRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::models::leads::{CreatedLeads, Lead, LeadDraft, LeadStatus, NewLead, NewLeads};
use crate::models::referrers::Referrer;
use crate::repositories::{leads::LeadRepository, store::RecordStore};
use crate::utils::Generator;

pub enum LeadRequest {
    ListLeads {
        response: oneshot::Sender<Result<Vec<Lead>, ServiceError>>,
    },
    GetLead {
        id: String,
        response: oneshot::Sender<Result<Lead, ServiceError>>,
    },
    ListLeadsByReferrer {
        referrer_id: String,
        response: oneshot::Sender<Result<Vec<Lead>, ServiceError>>,
    },
    CreateLeads {
        leads: NewLeads,
        response: oneshot::Sender<Result<CreatedLeads, ServiceError>>,
    },
    UpdateLeadStatus {
        id: String,
        status: String,
        response: oneshot::Sender<Result<Lead, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct LeadRequestHandler {
    repository: LeadRepository,
    referrer_channel: mpsc::Sender<ReferrerRequest>,
}

impl LeadRequestHandler {
    pub fn new(
        store: Arc<RecordStore>,
        generator: Arc<dyn Generator>,
        referrer_channel: mpsc::Sender<ReferrerRequest>,
    ) -> Self {
        let repository = LeadRepository::new(store, generator);

        LeadRequestHandler {
            repository,
            referrer_channel,
        }
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, ServiceError> {
        self.repository
            .list_leads()
            .await
            .map_err(|e| ServiceError::from_repository("Leads", e))
    }

    async fn get_lead(&self, id: &str) -> Result<Lead, ServiceError> {
        self.repository
            .get_lead_by_id(id)
            .await
            .map_err(|e| ServiceError::from_repository("Leads", e))?
            .ok_or_else(|| ServiceError::NotFound("Lead não encontrado".to_string()))
    }

    async fn list_leads_by_referrer(&self, referrer_id: &str) -> Result<Vec<Lead>, ServiceError> {
        self.repository
            .list_leads_by_referrer(referrer_id)
            .await
            .map_err(|e| ServiceError::from_repository("Leads", e))
    }

    async fn create_leads(&self, leads: NewLeads) -> Result<CreatedLeads, ServiceError> {
        match leads {
            NewLeads::Batch(batch) => {
                let referrer_id = super::required("id_indicador", batch.referrer_id)?;
                if batch.leads.is_empty() {
                    return Err(ServiceError::Validation(
                        "Informe ao menos um lead".to_string(),
                    ));
                }

                let drafts = batch
                    .leads
                    .into_iter()
                    .map(validate_lead)
                    .collect::<Result<Vec<_>, _>>()?;

                let referrer = super::call("Leads => Referrers", &self.referrer_channel, |response| {
                    ReferrerRequest::GetReferrer {
                        id: referrer_id,
                        response,
                    }
                })
                .await?;

                let leads = self.insert_leads(&referrer, drafts).await?;
                Ok(CreatedLeads::Many(leads))
            }
            NewLeads::Single(single) => {
                let referral_code = super::required("codigoIndicacao", single.referral_code)?;
                let draft = validate_lead(single.lead)?;

                let referrer = super::call("Leads => Referrers", &self.referrer_channel, |response| {
                    ReferrerRequest::GetReferrerByCode {
                        referral_code,
                        response,
                    }
                })
                .await?;

                let mut leads = self.insert_leads(&referrer, vec![draft]).await?;
                leads
                    .pop()
                    .map(CreatedLeads::One)
                    .ok_or_else(|| ServiceError::Internal("Lead was not created".to_string()))
            }
        }
    }

    async fn insert_leads(
        &self,
        referrer: &Referrer,
        drafts: Vec<LeadDraft>,
    ) -> Result<Vec<Lead>, ServiceError> {
        let leads = self
            .repository
            .insert_leads(referrer, drafts)
            .await
            .map_err(|e| ServiceError::from_repository("Leads", e))
            .inspect_err(|e| log::warn!("Leads for referrer {} rejected: {}", referrer.id, e))?;

        log::info!("Created {} lead(s) for referrer {}.", leads.len(), referrer.id);
        Ok(leads)
    }

    async fn update_lead_status(&self, id: &str, status: &str) -> Result<Lead, ServiceError> {
        let status: LeadStatus = status.trim().parse().map_err(|_| {
            ServiceError::Validation(format!(
                "Status inválido: {}. Use PENDENTE, EM_ANALISE, APROVADO ou REJEITADO",
                status
            ))
        })?;

        let lead = self
            .repository
            .update_lead_status(id, status)
            .await
            .map_err(|e| ServiceError::from_repository("Leads", e))?;

        log::info!("Lead {} is now {}.", lead.id, lead.status);
        Ok(lead)
    }
}

fn validate_lead(lead: NewLead) -> Result<LeadDraft, ServiceError> {
    let name = super::required("nome", lead.name)?;
    let phone = super::required("telefone", lead.phone)?;
    let email = super::required("email", lead.email)?;
    let cpf = super::optional(lead.cpf);
    let value = lead
        .value
        .map(|value| value.to_money())
        .transpose()
        .map_err(|_| ServiceError::Validation("Valor inválido".to_string()))?
        .flatten();

    super::validate_name(&name)?;
    super::validate_phone(&phone)?;
    super::validate_email(&email)?;

    Ok(LeadDraft {
        name,
        cpf,
        phone,
        email,
        value,
    })
}

#[async_trait]
impl RequestHandler<LeadRequest> for LeadRequestHandler {
    async fn handle_request(&self, request: LeadRequest) {
        match request {
            LeadRequest::ListLeads { response } => {
                let leads = self.list_leads().await;
                let _ = response.send(leads);
            }
            LeadRequest::GetLead { id, response } => {
                let lead = self.get_lead(&id).await;
                let _ = response.send(lead);
            }
            LeadRequest::ListLeadsByReferrer {
                referrer_id,
                response,
            } => {
                let leads = self.list_leads_by_referrer(&referrer_id).await;
                let _ = response.send(leads);
            }
            LeadRequest::CreateLeads { leads, response } => {
                let created = self.create_leads(leads).await;
                let _ = response.send(created);
            }
            LeadRequest::UpdateLeadStatus {
                id,
                status,
                response,
            } => {
                let lead = self.update_lead_status(&id, &status).await;
                let _ = response.send(lead);
            }
        }
    }
}

pub struct LeadService;

impl LeadService {
    pub fn new() -> Self {
        LeadService {}
    }
}

#[async_trait]
impl Service<LeadRequest, LeadRequestHandler> for LeadService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::leads::{AmountInput, Money};

    fn new_lead(email: &str) -> NewLead {
        NewLead {
            name: Some("Carlos Souza".to_string()),
            cpf: None,
            phone: Some("11988887777".to_string()),
            email: Some(email.to_string()),
            value: Some(AmountInput::Text("100".to_string())),
        }
    }

    #[test]
    fn valid_lead_becomes_a_draft() {
        let draft = validate_lead(new_lead("c@x.com")).unwrap();

        assert_eq!(draft.email, "c@x.com");
        assert_eq!(draft.value, Some(Money::from_cents(10000)));
    }

    #[test]
    fn value_is_optional() {
        let mut lead = new_lead("c@x.com");
        lead.value = None;

        assert_eq!(validate_lead(lead).unwrap().value, None);
    }

    #[test]
    fn bad_value_and_missing_email_are_rejected() {
        let mut bad_value = new_lead("c@x.com");
        bad_value.value = Some(AmountInput::Text("muito".to_string()));
        let mut no_email = new_lead("c@x.com");
        no_email.email = None;

        assert!(matches!(
            validate_lead(bad_value),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            validate_lead(no_email),
            Err(ServiceError::Validation(_))
        ));
    }
}
