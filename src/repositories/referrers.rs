use std::sync::Arc;

use super::csv::Record;
use super::store::{self, RecordStore, Table, TableRow};
use super::RepositoryError;
use crate::models::referrers::Referrer;
use crate::utils::{self, Generator};

const REFERRAL_CODE_ATTEMPTS: usize = 5;

impl TableRow for Referrer {
    const TABLE: Table = Table::Referrers;

    fn to_record(&self) -> Record {
        store::record([
            ("id", self.id.clone()),
            ("nome", self.name.clone()),
            ("cpf", self.cpf.clone().unwrap_or_default()),
            ("telefone", self.phone.clone()),
            ("email", self.email.clone()),
            ("dataGeracao", utils::format_timestamp(&self.created_at)),
            ("codigoIndicacao", self.referral_code.clone()),
        ])
    }

    fn from_record(mut record: Record) -> Result<Self, String> {
        Ok(Referrer {
            id: store::take(&mut record, "id"),
            name: store::take(&mut record, "nome"),
            cpf: store::take_optional(&mut record, "cpf"),
            phone: store::take(&mut record, "telefone"),
            email: store::take(&mut record, "email"),
            created_at: utils::parse_timestamp(&store::take(&mut record, "dataGeracao"))?,
            referral_code: store::take(&mut record, "codigoIndicacao"),
        })
    }
}

#[derive(Clone)]
pub struct ReferrerRepository {
    store: Arc<RecordStore>,
    generator: Arc<dyn Generator>,
}

impl ReferrerRepository {
    pub fn new(store: Arc<RecordStore>, generator: Arc<dyn Generator>) -> Self {
        Self { store, generator }
    }

    pub async fn list_referrers(&self) -> Result<Vec<Referrer>, RepositoryError> {
        Ok(self.store.load().await?)
    }

    pub async fn get_referrer_by_id(&self, id: &str) -> Result<Option<Referrer>, RepositoryError> {
        let referrers = self.list_referrers().await?;

        Ok(referrers.into_iter().find(|referrer| referrer.id == id))
    }

    pub async fn get_referrer_by_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<Referrer>, RepositoryError> {
        let referral_code = referral_code.trim().to_uppercase();
        let referrers = self.list_referrers().await?;

        Ok(referrers
            .into_iter()
            .find(|referrer| referrer.referral_code == referral_code))
    }

    /// Appends a referrer unless its email is already registered.
    pub async fn insert_referrer(
        &self,
        name: String,
        cpf: Option<String>,
        phone: String,
        email: String,
    ) -> Result<Referrer, RepositoryError> {
        let generator = self.generator.clone();

        self.store
            .update(move |referrers: &mut Vec<Referrer>| {
                if referrers
                    .iter()
                    .any(|referrer| utils::same_contact(&referrer.email, &email))
                {
                    return Err(RepositoryError::Conflict(
                        "Já existe um indicador cadastrado com este e-mail".to_string(),
                    ));
                }

                let referral_code = unique_referral_code(generator.as_ref(), referrers)?;
                let referrer = Referrer {
                    id: generator.new_id(),
                    name,
                    cpf,
                    phone,
                    email,
                    created_at: utils::now(),
                    referral_code,
                };

                referrers.push(referrer.clone());
                Ok(referrer)
            })
            .await
    }
}

fn unique_referral_code(
    generator: &dyn Generator,
    referrers: &[Referrer],
) -> Result<String, RepositoryError> {
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        let code = generator.new_referral_code();
        if !referrers.iter().any(|referrer| referrer.referral_code == code) {
            return Ok(code);
        }
        log::warn!("Referral code collision on {}, retrying.", code);
    }

    Err(RepositoryError::Internal(
        "Could not generate a unique referral code".to_string(),
    ))
}
