use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::referrers::{NewReferrer, Referrer};
use crate::repositories::{referrers::ReferrerRepository, store::RecordStore};
use crate::utils::Generator;

pub enum ReferrerRequest {
    ListReferrers {
        response: oneshot::Sender<Result<Vec<Referrer>, ServiceError>>,
    },
    GetReferrer {
        id: String,
        response: oneshot::Sender<Result<Referrer, ServiceError>>,
    },
    GetReferrerByCode {
        referral_code: String,
        response: oneshot::Sender<Result<Referrer, ServiceError>>,
    },
    CreateReferrer {
        referrer: NewReferrer,
        response: oneshot::Sender<Result<Referrer, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct ReferrerRequestHandler {
    repository: ReferrerRepository,
}

impl ReferrerRequestHandler {
    pub fn new(store: Arc<RecordStore>, generator: Arc<dyn Generator>) -> Self {
        let repository = ReferrerRepository::new(store, generator);

        ReferrerRequestHandler { repository }
    }

    async fn list_referrers(&self) -> Result<Vec<Referrer>, ServiceError> {
        self.repository
            .list_referrers()
            .await
            .map_err(|e| ServiceError::from_repository("Referrers", e))
    }

    async fn get_referrer(&self, id: &str) -> Result<Referrer, ServiceError> {
        self.repository
            .get_referrer_by_id(id)
            .await
            .map_err(|e| ServiceError::from_repository("Referrers", e))?
            .ok_or_else(|| ServiceError::NotFound("Indicador não encontrado".to_string()))
    }

    async fn get_referrer_by_code(&self, referral_code: &str) -> Result<Referrer, ServiceError> {
        self.repository
            .get_referrer_by_code(referral_code)
            .await
            .map_err(|e| ServiceError::from_repository("Referrers", e))?
            .ok_or_else(|| ServiceError::NotFound("Código de indicação inválido".to_string()))
    }

    async fn create_referrer(&self, referrer: NewReferrer) -> Result<Referrer, ServiceError> {
        let name = super::required("nome", referrer.name)?;
        let phone = super::required("telefone", referrer.phone)?;
        let email = super::required("email", referrer.email)?;
        let cpf = super::optional(referrer.cpf);

        super::validate_name(&name)?;
        super::validate_phone(&phone)?;
        super::validate_email(&email)?;

        let referrer = self
            .repository
            .insert_referrer(name, cpf, phone, email)
            .await
            .map_err(|e| ServiceError::from_repository("Referrers", e))
            .inspect_err(|e| log::warn!("Referrer rejected: {}", e))?;

        log::info!(
            "Created referrer {} with referral code {}.",
            referrer.id,
            referrer.referral_code
        );
        Ok(referrer)
    }
}

#[async_trait]
impl RequestHandler<ReferrerRequest> for ReferrerRequestHandler {
    async fn handle_request(&self, request: ReferrerRequest) {
        match request {
            ReferrerRequest::ListReferrers { response } => {
                let referrers = self.list_referrers().await;
                let _ = response.send(referrers);
            }
            ReferrerRequest::GetReferrer { id, response } => {
                let referrer = self.get_referrer(&id).await;
                let _ = response.send(referrer);
            }
            ReferrerRequest::GetReferrerByCode {
                referral_code,
                response,
            } => {
                let referrer = self.get_referrer_by_code(&referral_code).await;
                let _ = response.send(referrer);
            }
            ReferrerRequest::CreateReferrer { referrer, response } => {
                let referrer = self.create_referrer(referrer).await;
                let _ = response.send(referrer);
            }
        }
    }
}

pub struct ReferrerService;

impl ReferrerService {
    pub fn new() -> Self {
        ReferrerService {}
    }
}

#[async_trait]
impl Service<ReferrerRequest, ReferrerRequestHandler> for ReferrerService {}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::utils::testing::SequenceGenerator;

    fn handler(dir: &TempDir) -> ReferrerRequestHandler {
        ReferrerRequestHandler::new(
            Arc::new(RecordStore::new(dir.path())),
            Arc::new(SequenceGenerator::new(&["ANA00001", "BIA00002"])),
        )
    }

    fn ana() -> NewReferrer {
        NewReferrer {
            name: Some("Ana Silva".to_string()),
            cpf: None,
            phone: Some("11999999999".to_string()),
            email: Some("ana@x.com".to_string()),
        }
    }

    #[tokio::test]
    async fn creates_and_finds_by_id_and_code() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir);

        let created = handler.create_referrer(ana()).await.unwrap();

        assert_eq!(handler.get_referrer(&created.id).await.unwrap(), created);
        assert_eq!(handler.get_referrer_by_code("ana00001").await.unwrap(), created);
    }

    #[tokio::test]
    async fn missing_field_is_a_validation_error() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir);
        let mut referrer = ana();
        referrer.phone = None;

        let result = handler.create_referrer(referrer).await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert!(handler.list_referrers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_signup_with_same_email_conflicts() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir);

        handler.create_referrer(ana()).await.unwrap();
        let again = handler.create_referrer(ana()).await;

        assert!(matches!(again, Err(ServiceError::Conflict(_))));
        assert_eq!(handler.list_referrers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_id_and_code_are_not_found() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir);

        assert!(matches!(
            handler.get_referrer("nope").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            handler.get_referrer_by_code("NOPE0000").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
