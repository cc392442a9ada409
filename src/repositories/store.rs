use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tokio::sync::Mutex;

use super::csv::{self, CsvError, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Referrers,
    Leads,
    Prizes,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::Referrers, Table::Leads, Table::Prizes];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Referrers => "indicadores",
            Table::Leads => "leads",
            Table::Prizes => "premios",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name())
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Referrers => &[
                "id",
                "nome",
                "cpf",
                "telefone",
                "email",
                "dataGeracao",
                "codigoIndicacao",
            ],
            Table::Leads => &[
                "id",
                "idIndicador",
                "codigoIndicacao",
                "nome",
                "cpf",
                "telefone",
                "email",
                "valor",
                "dataGeracao",
                "status",
            ],
            Table::Prizes => &[
                "id",
                "id_indicador",
                "premio_descricao",
                "premio_index",
                "data_premiacao",
            ],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|table| table.name() == s)
            .ok_or_else(|| format!("unknown table '{}'", s))
    }
}

/// A typed row of one table.
pub trait TableRow: Sized {
    const TABLE: Table;

    fn to_record(&self) -> Record;

    fn from_record(record: Record) -> Result<Self, String>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on table {table}: {source}")]
    Io {
        table: Table,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not decode table {table}: {source}")]
    Decode {
        table: Table,
        #[source]
        source: CsvError,
    },
    #[error("Invalid row in table {table}: {reason}")]
    Row { table: Table, reason: String },
}

/// File-backed tables, one CSV file per [`Table`] under `data_dir`.
///
/// Reads always go to disk. Writes replace the whole file through a rename,
/// and [`RecordStore::update`] serializes read-modify-write cycles per table.
pub struct RecordStore {
    data_dir: PathBuf,
    referrers_lock: Mutex<()>,
    leads_lock: Mutex<()>,
    prizes_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            log::warn!("Could not create data directory {}: {}", data_dir.display(), e);
        }

        Self {
            data_dir,
            referrers_lock: Mutex::new(()),
            leads_lock: Mutex::new(()),
            prizes_lock: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path(&self, table: Table) -> PathBuf {
        self.data_dir.join(table.file_name())
    }

    fn lock(&self, table: Table) -> &Mutex<()> {
        match table {
            Table::Referrers => &self.referrers_lock,
            Table::Leads => &self.leads_lock,
            Table::Prizes => &self.prizes_lock,
        }
    }

    pub async fn load_records(&self, table: Table) -> Result<Vec<Record>, StoreError> {
        match tokio::fs::read_to_string(self.path(table)).await {
            Ok(text) => csv::decode(&text).map_err(|source| StoreError::Decode { table, source }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(StoreError::Io { table, source }),
        }
    }

    pub async fn overwrite_records(
        &self,
        table: Table,
        records: &[Record],
    ) -> Result<(), StoreError> {
        if let Err(e) = tokio::fs::create_dir_all(&self.data_dir).await {
            log::warn!(
                "Could not create data directory {}: {}",
                self.data_dir.display(),
                e
            );
        }

        let path = self.path(table);
        let staging = path.with_extension("csv.tmp");
        let text = csv::encode(records, table.columns());

        tokio::fs::write(&staging, text)
            .await
            .map_err(|source| StoreError::Io { table, source })?;
        tokio::fs::rename(&staging, &path)
            .await
            .map_err(|source| StoreError::Io { table, source })?;

        log::debug!("Wrote {} rows to {}.", records.len(), path.display());
        Ok(())
    }

    pub async fn load<R: TableRow>(&self) -> Result<Vec<R>, StoreError> {
        self.load_records(R::TABLE)
            .await?
            .into_iter()
            .map(R::from_record)
            .collect::<Result<Vec<R>, String>>()
            .map_err(|reason| StoreError::Row {
                table: R::TABLE,
                reason,
            })
    }

    pub async fn overwrite<R: TableRow>(&self, rows: &[R]) -> Result<(), StoreError> {
        let records: Vec<Record> = rows.iter().map(TableRow::to_record).collect();
        self.overwrite_records(R::TABLE, &records).await
    }

    /// Loads the table, applies `mutate` and writes the result back while
    /// holding the table lock. Nothing is written when `mutate` fails.
    pub async fn update<R, T, E, F>(&self, mutate: F) -> Result<T, E>
    where
        R: TableRow,
        E: From<StoreError>,
        F: FnOnce(&mut Vec<R>) -> Result<T, E>,
    {
        let _guard = self.lock(R::TABLE).lock().await;

        let mut rows = self.load::<R>().await?;
        let output = mutate(&mut rows)?;
        self.overwrite(&rows).await?;

        Ok(output)
    }

    /// Raw file contents, `None` when the table was never written.
    pub async fn read_raw(&self, table: Table) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path(table)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { table, source }),
        }
    }
}

pub fn record<const N: usize>(fields: [(&str, String); N]) -> Record {
    fields
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
}

pub fn take(record: &mut Record, column: &str) -> String {
    record.remove(column).unwrap_or_default()
}

pub fn take_optional(record: &mut Record, column: &str) -> Option<String> {
    Some(take(record, column)).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::models::prizes::Prize;
    use crate::utils;

    fn prize(id: &str, index: u32) -> Prize {
        Prize {
            id: id.to_string(),
            referrer_id: "r1".to_string(),
            description: "Kit Premium".to_string(),
            index,
            awarded_at: utils::now(),
        }
    }

    #[tokio::test]
    async fn missing_table_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());

        assert!(store.load::<Prize>().await.unwrap().is_empty());
        assert!(store.read_raw(Table::Prizes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn creates_missing_data_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = RecordStore::new(&nested);

        assert!(nested.is_dir());
        store.overwrite::<Prize>(&[]).await.unwrap();
        assert!(store.path(Table::Prizes).is_file());
    }

    #[tokio::test]
    async fn overwrite_then_load_keeps_order() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        let rows = vec![prize("b", 1), prize("a", 0), prize("c", 7)];

        store.overwrite(&rows).await.unwrap();

        assert_eq!(store.load::<Prize>().await.unwrap(), rows);
    }

    #[tokio::test]
    async fn empty_overwrite_writes_header() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());

        store.overwrite::<Prize>(&[]).await.unwrap();
        let raw = store.read_raw(Table::Prizes).await.unwrap().unwrap();

        assert_eq!(
            String::from_utf8(raw).unwrap(),
            "id,id_indicador,premio_descricao,premio_index,data_premiacao\n"
        );
    }

    #[tokio::test]
    async fn failed_update_leaves_table_untouched() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        store.overwrite(&[prize("a", 0)]).await.unwrap();

        let result: Result<(), StoreError> = store
            .update(|rows: &mut Vec<Prize>| {
                rows.clear();
                Err(StoreError::Row {
                    table: Table::Prizes,
                    reason: "rejected".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.load::<Prize>().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_updates_do_not_lose_rows() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RecordStore::new(dir.path()));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .update(|rows: &mut Vec<Prize>| {
                            rows.push(prize(&format!("p{}", i), 0));
                            Ok::<_, StoreError>(())
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.load::<Prize>().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn malformed_table_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        std::fs::write(store.path(Table::Prizes), "id,premio_index\n\"x\",\"oops\n").unwrap();

        let result = store.load::<Prize>().await;

        assert!(matches!(result, Err(StoreError::Decode { .. })));
    }

    #[test]
    fn table_names_parse() {
        assert_eq!("leads".parse::<Table>(), Ok(Table::Leads));
        assert!("usuarios".parse::<Table>().is_err());
    }
}
