use serde::Serialize;

use super::{leads::Lead, prizes::Prize, referrers::Referrer};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stats {
    #[serde(rename = "totalLeads")]
    pub total_leads: usize,
    #[serde(rename = "leadsAprovados")]
    pub approved_leads: usize,
    #[serde(rename = "leadsPendentes")]
    pub pending_leads: usize,
    #[serde(rename = "valorTotalLeads")]
    pub total_value: f64,
    #[serde(rename = "valorLeadsAprovados")]
    pub approved_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Totals {
    pub indicadores: usize,
    pub leads: usize,
    pub premios: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct Export {
    pub indicadores: Vec<Referrer>,
    pub leads: Vec<Lead>,
    pub premios: Vec<Prize>,
    pub total: Totals,
}
