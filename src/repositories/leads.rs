use std::sync::Arc;

use super::csv::Record;
use super::store::{self, RecordStore, Table, TableRow};
use super::RepositoryError;
use crate::models::leads::{Lead, LeadDraft, LeadStatus, Money};
use crate::models::referrers::Referrer;
use crate::utils::{self, Generator};

impl TableRow for Lead {
    const TABLE: Table = Table::Leads;

    fn to_record(&self) -> Record {
        store::record([
            ("id", self.id.clone()),
            ("idIndicador", self.referrer_id.clone()),
            ("codigoIndicacao", self.referral_code.clone()),
            ("nome", self.name.clone()),
            ("cpf", self.cpf.clone().unwrap_or_default()),
            ("telefone", self.phone.clone()),
            ("email", self.email.clone()),
            (
                "valor",
                self.value.map(|value| value.to_string()).unwrap_or_default(),
            ),
            ("dataGeracao", utils::format_timestamp(&self.created_at)),
            ("status", self.status.to_string()),
        ])
    }

    fn from_record(mut record: Record) -> Result<Self, String> {
        let value = store::take_optional(&mut record, "valor")
            .map(|value| value.parse::<Money>())
            .transpose()?;
        // rows written before statuses existed have none
        let status = store::take_optional(&mut record, "status")
            .map(|status| status.parse::<LeadStatus>())
            .transpose()?
            .unwrap_or_default();

        Ok(Lead {
            id: store::take(&mut record, "id"),
            referrer_id: store::take(&mut record, "idIndicador"),
            referral_code: store::take(&mut record, "codigoIndicacao"),
            name: store::take(&mut record, "nome"),
            cpf: store::take_optional(&mut record, "cpf"),
            phone: store::take(&mut record, "telefone"),
            email: store::take(&mut record, "email"),
            value,
            created_at: utils::parse_timestamp(&store::take(&mut record, "dataGeracao"))?,
            status,
        })
    }
}

#[derive(Clone)]
pub struct LeadRepository {
    store: Arc<RecordStore>,
    generator: Arc<dyn Generator>,
}

impl LeadRepository {
    pub fn new(store: Arc<RecordStore>, generator: Arc<dyn Generator>) -> Self {
        Self { store, generator }
    }

    pub async fn list_leads(&self) -> Result<Vec<Lead>, RepositoryError> {
        Ok(self.store.load().await?)
    }

    pub async fn get_lead_by_id(&self, id: &str) -> Result<Option<Lead>, RepositoryError> {
        let leads = self.list_leads().await?;

        Ok(leads.into_iter().find(|lead| lead.id == id))
    }

    pub async fn list_leads_by_referrer(
        &self,
        referrer_id: &str,
    ) -> Result<Vec<Lead>, RepositoryError> {
        let leads = self.list_leads().await?;

        Ok(leads
            .into_iter()
            .filter(|lead| lead.referrer_id == referrer_id)
            .collect())
    }

    /// Appends all drafts for `referrer`, or none of them when any email is
    /// already taken, either in the table or earlier in the same batch.
    pub async fn insert_leads(
        &self,
        referrer: &Referrer,
        drafts: Vec<LeadDraft>,
    ) -> Result<Vec<Lead>, RepositoryError> {
        let generator = self.generator.clone();
        let referrer_id = referrer.id.clone();
        let referral_code = referrer.referral_code.clone();

        self.store
            .update(move |leads: &mut Vec<Lead>| {
                let mut created: Vec<Lead> = Vec::with_capacity(drafts.len());

                for draft in drafts {
                    if leads
                        .iter()
                        .chain(created.iter())
                        .any(|lead| utils::same_contact(&lead.email, &draft.email))
                    {
                        return Err(RepositoryError::Conflict(format!(
                            "Já existe um lead cadastrado com o e-mail {}",
                            draft.email
                        )));
                    }

                    created.push(Lead {
                        id: generator.new_id(),
                        referrer_id: referrer_id.clone(),
                        referral_code: referral_code.clone(),
                        name: draft.name,
                        cpf: draft.cpf,
                        phone: draft.phone,
                        email: draft.email,
                        value: draft.value,
                        created_at: utils::now(),
                        status: LeadStatus::default(),
                    });
                }

                leads.extend(created.iter().cloned());
                Ok(created)
            })
            .await
    }

    pub async fn update_lead_status(
        &self,
        id: &str,
        status: LeadStatus,
    ) -> Result<Lead, RepositoryError> {
        self.store
            .update(|leads: &mut Vec<Lead>| {
                let lead = leads
                    .iter_mut()
                    .find(|lead| lead.id == id)
                    .ok_or_else(|| RepositoryError::NotFound("Lead não encontrado".to_string()))?;

                lead.status = status;
                Ok(lead.clone())
            })
            .await
    }
}
