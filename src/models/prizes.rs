use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slices of the prize wheel, in wheel order.
pub const CATALOG: [&str; 8] = [
    "10% de Comissão Extra",
    "R$ 50 em Vale-Compras",
    "Consultoria Grátis",
    "Brinde Exclusivo",
    "R$ 100 em Desconto",
    "Kit Premium",
    "15% de Comissão Extra",
    "Acesso VIP 3 Meses",
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prize {
    pub id: String,
    #[serde(rename = "id_indicador")]
    pub referrer_id: String,
    #[serde(rename = "premio_descricao")]
    pub description: String,
    #[serde(rename = "premio_index")]
    pub index: u32,
    #[serde(rename = "data_premiacao")]
    pub awarded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewPrize {
    #[serde(rename = "id_indicador")]
    pub referrer_id: Option<String>,
    #[serde(rename = "premio_descricao")]
    pub description: Option<String>,
    #[serde(rename = "premio_index")]
    pub index: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PrizeDraw {
    #[serde(rename = "id_indicador")]
    pub referrer_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub index: u32,
    #[serde(rename = "descricao")]
    pub description: &'static str,
}

pub fn catalog() -> Vec<CatalogEntry> {
    CATALOG
        .iter()
        .enumerate()
        .map(|(index, description)| CatalogEntry {
            index: index as u32,
            description,
        })
        .collect()
}
