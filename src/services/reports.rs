use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::leads::{Lead, LeadStatus, Money};
use crate::models::reports::{Export, Stats, Totals};
use crate::repositories::leads::LeadRepository;
use crate::repositories::prizes::PrizeRepository;
use crate::repositories::referrers::ReferrerRepository;
use crate::repositories::store::{RecordStore, Table};
use crate::utils::Generator;

pub enum ReportRequest {
    GetStats {
        response: oneshot::Sender<Result<Stats, ServiceError>>,
    },
    ExportAll {
        response: oneshot::Sender<Result<Export, ServiceError>>,
    },
    DownloadTable {
        table: Table,
        response: oneshot::Sender<Result<Vec<u8>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct ReportRequestHandler {
    store: Arc<RecordStore>,
    referrers: ReferrerRepository,
    leads: LeadRepository,
    prizes: PrizeRepository,
}

impl ReportRequestHandler {
    pub fn new(store: Arc<RecordStore>, generator: Arc<dyn Generator>) -> Self {
        ReportRequestHandler {
            referrers: ReferrerRepository::new(store.clone(), generator.clone()),
            leads: LeadRepository::new(store.clone(), generator.clone()),
            prizes: PrizeRepository::new(store.clone(), generator),
            store,
        }
    }

    async fn get_stats(&self) -> Result<Stats, ServiceError> {
        let leads = self
            .leads
            .list_leads()
            .await
            .map_err(|e| ServiceError::from_repository("Reports", e))?;

        compute_stats(&leads)
    }

    async fn export_all(&self) -> Result<Export, ServiceError> {
        let (indicadores, leads, premios) = futures_util::try_join!(
            self.referrers.list_referrers(),
            self.leads.list_leads(),
            self.prizes.list_prizes(),
        )
        .map_err(|e| ServiceError::from_repository("Reports", e))?;

        let total = Totals {
            indicadores: indicadores.len(),
            leads: leads.len(),
            premios: premios.len(),
        };

        Ok(Export {
            indicadores,
            leads,
            premios,
            total,
        })
    }

    async fn download_table(&self, table: Table) -> Result<Vec<u8>, ServiceError> {
        self.store
            .read_raw(table)
            .await
            .map_err(|e| ServiceError::Repository("Reports".to_string(), e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound("Arquivo não encontrado".to_string()))
    }
}

pub fn compute_stats(leads: &[Lead]) -> Result<Stats, ServiceError> {
    let value_of = |lead: &Lead| lead.value.unwrap_or_default();
    let approved: Vec<&Lead> = leads
        .iter()
        .filter(|lead| lead.status == LeadStatus::Aprovado)
        .collect();
    let overflow = || ServiceError::Internal("Lead values overflow the stats total".to_string());

    let total_value = Money::checked_sum(leads.iter().map(value_of)).ok_or_else(overflow)?;
    let approved_value =
        Money::checked_sum(approved.iter().map(|lead| value_of(lead))).ok_or_else(overflow)?;

    Ok(Stats {
        total_leads: leads.len(),
        approved_leads: approved.len(),
        pending_leads: leads
            .iter()
            .filter(|lead| lead.status == LeadStatus::Pendente)
            .count(),
        total_value: total_value.as_f64(),
        approved_value: approved_value.as_f64(),
    })
}

#[async_trait]
impl RequestHandler<ReportRequest> for ReportRequestHandler {
    async fn handle_request(&self, request: ReportRequest) {
        match request {
            ReportRequest::GetStats { response } => {
                let stats = self.get_stats().await;
                let _ = response.send(stats);
            }
            ReportRequest::ExportAll { response } => {
                let export = self.export_all().await;
                let _ = response.send(export);
            }
            ReportRequest::DownloadTable { table, response } => {
                let content = self.download_table(table).await;
                let _ = response.send(content);
            }
        }
    }
}

pub struct ReportService;

impl ReportService {
    pub fn new() -> Self {
        ReportService {}
    }
}

#[async_trait]
impl Service<ReportRequest, ReportRequestHandler> for ReportService {}
