use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::repositories::{store::RecordStore, RepositoryError};
use crate::settings::Settings;
use crate::utils::{Generator, RandomGenerator};

pub mod http;
pub mod leads;
pub mod prizes;
pub mod referrers;
pub mod reports;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Repository error: {0} - {1}")]
    Repository(String, String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

impl ServiceError {
    /// Keeps business-rule failures visible to the caller and folds storage
    /// failures into a repository error tagged with the failing service.
    pub fn from_repository(service: &str, error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(message) => ServiceError::NotFound(message),
            RepositoryError::Conflict(message) => ServiceError::Conflict(message),
            RepositoryError::Validation(message) => ServiceError::Validation(message),
            other => ServiceError::Repository(service.to_string(), other.to_string()),
        }
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Sends a request built around a fresh response channel and waits for the
/// answer. `route` names both ends for error reports, e.g. `"Leads => Referrers"`.
pub async fn call<R, T>(
    route: &str,
    channel: &mpsc::Sender<R>,
    request: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> R,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(request(response_tx))
        .await
        .map_err(|e| ServiceError::Communication(route.to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication(route.to_string(), e.to_string()))?
}

pub fn required(field: &str, value: Option<String>) -> Result<String, ServiceError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ServiceError::Validation(format!("Campo obrigatório: {}", field)))
}

pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn validate_name(name: &str) -> Result<(), ServiceError> {
    let length = name.chars().count();
    if !(2..=100).contains(&length) {
        return Err(ServiceError::Validation(
            "Nome deve ter entre 2 e 100 caracteres".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), ServiceError> {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !(10..=11).contains(&digits) {
        return Err(ServiceError::Validation(
            "Telefone deve ter 10 ou 11 dígitos".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ServiceError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };

    if !valid {
        return Err(ServiceError::Validation("E-mail inválido".to_string()));
    }

    Ok(())
}

/// Spawns one request-handling service per entity and returns the channels
/// the HTTP layer talks to.
pub fn spawn_services(store: Arc<RecordStore>, generator: Arc<dyn Generator>) -> http::AppState {
    let (referrer_tx, mut referrer_rx) = mpsc::channel(512);
    let (lead_tx, mut lead_rx) = mpsc::channel(512);
    let (prize_tx, mut prize_rx) = mpsc::channel(512);
    let (report_tx, mut report_rx) = mpsc::channel(512);

    let mut referrer_service = referrers::ReferrerService::new();
    let mut lead_service = leads::LeadService::new();
    let mut prize_service = prizes::PrizeService::new();
    let mut report_service = reports::ReportService::new();

    log::info!("Starting referrer service.");
    let referrer_handler =
        referrers::ReferrerRequestHandler::new(store.clone(), generator.clone());
    tokio::spawn(async move {
        referrer_service
            .run(referrer_handler, &mut referrer_rx)
            .await;
    });

    log::info!("Starting lead service.");
    let lead_handler =
        leads::LeadRequestHandler::new(store.clone(), generator.clone(), referrer_tx.clone());
    tokio::spawn(async move {
        lead_service.run(lead_handler, &mut lead_rx).await;
    });

    log::info!("Starting prize service.");
    let prize_handler =
        prizes::PrizeRequestHandler::new(store.clone(), generator.clone(), referrer_tx.clone());
    tokio::spawn(async move {
        prize_service.run(prize_handler, &mut prize_rx).await;
    });

    log::info!("Starting report service.");
    let report_handler = reports::ReportRequestHandler::new(store, generator);
    tokio::spawn(async move {
        report_service.run(report_handler, &mut report_rx).await;
    });

    http::AppState {
        referrer_channel: referrer_tx,
        lead_channel: lead_tx,
        prize_channel: prize_tx,
        report_channel: report_tx,
    }
}

pub async fn start_services(settings: Settings, listen: &str) -> Result<(), anyhow::Error> {
    let store = Arc::new(RecordStore::new(&settings.storage.data_dir));
    let generator = Arc::new(RandomGenerator::new(
        settings.campaign.referral_code_length,
    ));
    log::info!("Storing tables in {}.", store.data_dir().display());

    let state = spawn_services(store, generator);

    log::info!("Starting HTTP server.");
    http::start_http_server(listen, state).await
}
