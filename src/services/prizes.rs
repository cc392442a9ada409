use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::referrers::ReferrerRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::models::prizes::{NewPrize, Prize, PrizeDraw, CATALOG};
use crate::models::referrers::Referrer;
use crate::repositories::{prizes::PrizeRepository, store::RecordStore};
use crate::utils::Generator;

pub enum PrizeRequest {
    ListPrizes {
        response: oneshot::Sender<Result<Vec<Prize>, ServiceError>>,
    },
    GetLatestPrize {
        referrer_id: String,
        response: oneshot::Sender<Result<Prize, ServiceError>>,
    },
    RecordPrize {
        prize: NewPrize,
        response: oneshot::Sender<Result<Prize, ServiceError>>,
    },
    DrawPrize {
        draw: PrizeDraw,
        response: oneshot::Sender<Result<Prize, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct PrizeRequestHandler {
    repository: PrizeRepository,
    generator: Arc<dyn Generator>,
    referrer_channel: mpsc::Sender<ReferrerRequest>,
}

impl PrizeRequestHandler {
    pub fn new(
        store: Arc<RecordStore>,
        generator: Arc<dyn Generator>,
        referrer_channel: mpsc::Sender<ReferrerRequest>,
    ) -> Self {
        let repository = PrizeRepository::new(store, generator.clone());

        PrizeRequestHandler {
            repository,
            generator,
            referrer_channel,
        }
    }

    async fn list_prizes(&self) -> Result<Vec<Prize>, ServiceError> {
        self.repository
            .list_prizes()
            .await
            .map_err(|e| ServiceError::from_repository("Prizes", e))
    }

    async fn get_latest_prize(&self, referrer_id: &str) -> Result<Prize, ServiceError> {
        self.repository
            .get_latest_prize(referrer_id)
            .await
            .map_err(|e| ServiceError::from_repository("Prizes", e))?
            .ok_or_else(|| ServiceError::NotFound("Nenhum prêmio encontrado".to_string()))
    }

    async fn record_prize(&self, prize: NewPrize) -> Result<Prize, ServiceError> {
        let referrer_id = super::required("id_indicador", prize.referrer_id)?;
        let description = super::required("premio_descricao", prize.description)?;
        let index = prize
            .index
            .ok_or_else(|| ServiceError::Validation("Campo obrigatório: premio_index".to_string()))?;

        let referrer = self.get_referrer(referrer_id).await?;
        self.award(&referrer, description, index).await
    }

    /// Server-side spin of the wheel: a uniform pick over the catalog.
    async fn draw_prize(&self, draw: PrizeDraw) -> Result<Prize, ServiceError> {
        let referrer_id = super::required("id_indicador", draw.referrer_id)?;
        let referrer = self.get_referrer(referrer_id).await?;

        let index = self.generator.draw_index(CATALOG.len());
        self.award(&referrer, CATALOG[index].to_string(), index as u32)
            .await
    }

    async fn get_referrer(&self, referrer_id: String) -> Result<Referrer, ServiceError> {
        super::call("Prizes => Referrers", &self.referrer_channel, |response| {
            ReferrerRequest::GetReferrer {
                id: referrer_id,
                response,
            }
        })
        .await
    }

    async fn award(
        &self,
        referrer: &Referrer,
        description: String,
        index: u32,
    ) -> Result<Prize, ServiceError> {
        let prize = self
            .repository
            .insert_prize(referrer.id.clone(), description, index)
            .await
            .map_err(|e| ServiceError::from_repository("Prizes", e))?;

        log::info!(
            "Referrer {} won prize {} ({}).",
            referrer.id,
            prize.index,
            prize.description
        );
        Ok(prize)
    }
}

#[async_trait]
impl RequestHandler<PrizeRequest> for PrizeRequestHandler {
    async fn handle_request(&self, request: PrizeRequest) {
        match request {
            PrizeRequest::ListPrizes { response } => {
                let prizes = self.list_prizes().await;
                let _ = response.send(prizes);
            }
            PrizeRequest::GetLatestPrize {
                referrer_id,
                response,
            } => {
                let prize = self.get_latest_prize(&referrer_id).await;
                let _ = response.send(prize);
            }
            PrizeRequest::RecordPrize { prize, response } => {
                let prize = self.record_prize(prize).await;
                let _ = response.send(prize);
            }
            PrizeRequest::DrawPrize { draw, response } => {
                let prize = self.draw_prize(draw).await;
                let _ = response.send(prize);
            }
        }
    }
}

pub struct PrizeService;

impl PrizeService {
    pub fn new() -> Self {
        PrizeService {}
    }
}

#[async_trait]
impl Service<PrizeRequest, PrizeRequestHandler> for PrizeService {}
