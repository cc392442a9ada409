use std::sync::Arc;

use super::csv::Record;
use super::store::{self, RecordStore, Table, TableRow};
use super::RepositoryError;
use crate::models::prizes::{Prize, CATALOG};
use crate::utils::{self, Generator};

impl TableRow for Prize {
    const TABLE: Table = Table::Prizes;

    fn to_record(&self) -> Record {
        store::record([
            ("id", self.id.clone()),
            ("id_indicador", self.referrer_id.clone()),
            ("premio_descricao", self.description.clone()),
            ("premio_index", self.index.to_string()),
            ("data_premiacao", utils::format_timestamp(&self.awarded_at)),
        ])
    }

    fn from_record(mut record: Record) -> Result<Self, String> {
        let index = store::take(&mut record, "premio_index");

        Ok(Prize {
            id: store::take(&mut record, "id"),
            referrer_id: store::take(&mut record, "id_indicador"),
            description: store::take(&mut record, "premio_descricao"),
            index: index
                .parse()
                .map_err(|_| format!("invalid prize index '{}'", index))?,
            awarded_at: utils::parse_timestamp(&store::take(&mut record, "data_premiacao"))?,
        })
    }
}

#[derive(Clone)]
pub struct PrizeRepository {
    store: Arc<RecordStore>,
    generator: Arc<dyn Generator>,
}

impl PrizeRepository {
    pub fn new(store: Arc<RecordStore>, generator: Arc<dyn Generator>) -> Self {
        Self { store, generator }
    }

    pub async fn list_prizes(&self) -> Result<Vec<Prize>, RepositoryError> {
        Ok(self.store.load().await?)
    }

    /// Most recently awarded prize of a referrer. Ties go to the later row.
    pub async fn get_latest_prize(&self, referrer_id: &str) -> Result<Option<Prize>, RepositoryError> {
        let prizes = self.list_prizes().await?;

        Ok(prizes
            .into_iter()
            .filter(|prize| prize.referrer_id == referrer_id)
            .max_by_key(|prize| prize.awarded_at))
    }

    pub async fn insert_prize(
        &self,
        referrer_id: String,
        description: String,
        index: u32,
    ) -> Result<Prize, RepositoryError> {
        if index as usize >= CATALOG.len() {
            return Err(RepositoryError::Validation(format!(
                "Índice de prêmio inválido: {}",
                index
            )));
        }

        let generator = self.generator.clone();

        self.store
            .update(move |prizes: &mut Vec<Prize>| {
                let prize = Prize {
                    id: generator.new_id(),
                    referrer_id,
                    description,
                    index,
                    awarded_at: utils::now(),
                };

                prizes.push(prize.clone());
                Ok(prize)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;
    use crate::utils::testing::SequenceGenerator;

    fn repository(dir: &TempDir) -> (Arc<RecordStore>, PrizeRepository) {
        let store = Arc::new(RecordStore::new(dir.path()));
        let repository = PrizeRepository::new(store.clone(), Arc::new(SequenceGenerator::new(&[])));
        (store, repository)
    }

    #[tokio::test]
    async fn latest_prize_is_the_newest_of_the_referrer() {
        let dir = TempDir::new().unwrap();
        let (store, repository) = repository(&dir);
        let base = utils::now();
        let prize = |id: &str, referrer_id: &str, index: u32, offset: i64| Prize {
            id: id.to_string(),
            referrer_id: referrer_id.to_string(),
            description: CATALOG[index as usize].to_string(),
            index,
            awarded_at: base + Duration::minutes(offset),
        };
        store
            .overwrite(&[
                prize("p1", "r1", 0, 0),
                prize("p2", "r1", 5, 10),
                prize("p3", "r1", 2, 5),
                prize("p4", "r2", 7, 20),
            ])
            .await
            .unwrap();

        let latest = repository.get_latest_prize("r1").await.unwrap().unwrap();

        assert_eq!(latest.id, "p2");
        assert!(repository.get_latest_prize("r9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn index_outside_catalog_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (_, repository) = repository(&dir);

        let result = repository
            .insert_prize("r1".to_string(), "Prêmio".to_string(), CATALOG.len() as u32)
            .await;

        assert!(matches!(result, Err(RepositoryError::Validation(_))));
        assert!(repository.list_prizes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inserted_prize_is_listed() {
        let dir = TempDir::new().unwrap();
        let (_, repository) = repository(&dir);

        let prize = repository
            .insert_prize("r1".to_string(), CATALOG[3].to_string(), 3)
            .await
            .unwrap();

        assert_eq!(repository.list_prizes().await.unwrap(), vec![prize]);
    }
}
