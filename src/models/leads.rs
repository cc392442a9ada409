use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    #[default]
    Pendente,
    EmAnalise,
    Aprovado,
    Rejeitado,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::Pendente,
        LeadStatus::EmAnalise,
        LeadStatus::Aprovado,
        LeadStatus::Rejeitado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pendente => "PENDENTE",
            LeadStatus::EmAnalise => "EM_ANALISE",
            LeadStatus::Aprovado => "APROVADO",
            LeadStatus::Rejeitado => "REJEITADO",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid lead status '{}'", s))
    }
}

/// Monetary amount in cents. Written as a fixed two-decimal string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Money(i64);

impl Money {
    /// R$ 1.000.000.000,00, the largest amount a lead may carry.
    pub const MAX: Money = Money(100_000_000_000);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `None` when the total does not fit in `i64` cents.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(0i64, |total, amount| total.checked_add(amount.0))
            .map(Money)
    }

    /// JSON numbers go through their shortest decimal form so they are held
    /// to the same two-digit rule as strings.
    fn from_decimal(value: f64) -> Result<Self, String> {
        if !value.is_finite() {
            return Err(format!("invalid amount {}", value));
        }

        value.to_string().parse()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Money {
    type Err = String;

    /// Accepts `100`, `100.5`, `100.50` and the Brazilian `100,50`. More than
    /// two decimal places, signs and amounts above [`Money::MAX`] are refused.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || format!("invalid amount '{}'", trimmed);

        let (units, fraction) = match trimmed.split_once(|c: char| c == '.' || c == ',') {
            Some((units, fraction)) => (units, fraction),
            None => (trimmed, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if units.is_empty() || !all_digits(units) || !all_digits(fraction) || fraction.len() > 2 {
            return Err(invalid());
        }

        let units: i64 = units.parse().map_err(|_| invalid())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        let cents = units
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction))
            .filter(|cents| *cents <= Money::MAX.0)
            .ok_or_else(invalid)?;

        Ok(Money(cents))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `valor` as sent by clients, either a JSON number or a numeric string.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    /// `None` for an empty string.
    pub fn to_money(&self) -> Result<Option<Money>, String> {
        match self {
            AmountInput::Number(value) => Money::from_decimal(*value).map(Some),
            AmountInput::Text(text) if text.trim().is_empty() => Ok(None),
            AmountInput::Text(text) => text.parse().map(Some),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Lead {
    pub id: String,
    #[serde(rename = "idIndicador")]
    pub referrer_id: String,
    #[serde(rename = "codigoIndicacao")]
    pub referral_code: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: String,
    pub email: String,
    #[serde(rename = "valor", skip_serializing_if = "Option::is_none")]
    pub value: Option<Money>,
    #[serde(rename = "dataGeracao")]
    pub created_at: DateTime<Utc>,
    pub status: LeadStatus,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewLead {
    #[serde(rename = "nome")]
    pub name: Option<String>,
    pub cpf: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "valor")]
    pub value: Option<AmountInput>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LeadBatch {
    #[serde(rename = "id_indicador")]
    pub referrer_id: Option<String>,
    pub leads: Vec<NewLead>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SingleLead {
    #[serde(rename = "codigoIndicacao")]
    pub referral_code: Option<String>,
    #[serde(flatten)]
    pub lead: NewLead,
}

/// Body of `POST /leads`: a batch for a known referrer id, or one lead
/// carrying the referral code it came from. A body with a `leads` key is
/// always read as a batch.
#[derive(Clone, Debug)]
pub enum NewLeads {
    Batch(LeadBatch),
    Single(SingleLead),
}

impl<'de> Deserialize<'de> for NewLeads {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let body = serde_json::Value::deserialize(deserializer)?;

        if body.get("leads").is_some() {
            serde_json::from_value(body)
                .map(NewLeads::Batch)
                .map_err(|e| de::Error::custom(format!("lote de leads: {}", e)))
        } else {
            serde_json::from_value(body)
                .map(NewLeads::Single)
                .map_err(de::Error::custom)
        }
    }
}

/// A lead that passed field validation and waits for the uniqueness check.
#[derive(Clone, Debug, PartialEq)]
pub struct LeadDraft {
    pub name: String,
    pub cpf: Option<String>,
    pub phone: String,
    pub email: String,
    pub value: Option<Money>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum CreatedLeads {
    One(Lead),
    Many(Vec<Lead>),
}

#[derive(Clone, Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip() {
        for status in LeadStatus::ALL {
            assert_eq!(status.as_str().parse::<LeadStatus>(), Ok(status));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::json!(status.as_str())
            );
        }
        assert!("INVALIDO".parse::<LeadStatus>().is_err());
        assert_eq!(LeadStatus::default(), LeadStatus::Pendente);
    }

    #[test]
    fn money_formats_with_two_decimals() {
        assert_eq!("100".parse::<Money>().unwrap().to_string(), "100.00");
        assert_eq!("50.5".parse::<Money>().unwrap().to_string(), "50.50");
        assert_eq!("1234,56".parse::<Money>().unwrap().cents(), 123456);
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
        assert!("abc".parse::<Money>().is_err());
        assert!("-3".parse::<Money>().is_err());
        assert!(",5".parse::<Money>().is_err());
    }

    #[test]
    fn money_refuses_a_third_decimal_place() {
        let text: AmountInput = serde_json::from_str("\"1.005\"").unwrap();
        let number: AmountInput = serde_json::from_str("1.005").unwrap();

        assert!(text.to_money().is_err());
        assert!(number.to_money().is_err());
        assert_eq!("1.01".parse::<Money>().unwrap().cents(), 101);
    }

    #[test]
    fn money_is_capped() {
        assert_eq!("1000000000".parse::<Money>(), Ok(Money::MAX));
        assert!("1000000000.01".parse::<Money>().is_err());
        assert!("99999999999999999999".parse::<Money>().is_err());

        let huge: AmountInput = serde_json::from_str("1e300").unwrap();
        assert!(huge.to_money().is_err());
    }

    #[test]
    fn sums_report_overflow() {
        let cents = [Money::from_cents(150), Money::from_cents(250)];
        let near_max = [Money::from_cents(i64::MAX - 1), Money::from_cents(2)];

        assert_eq!(Money::checked_sum(cents), Some(Money::from_cents(400)));
        assert_eq!(Money::checked_sum(near_max), None);
        assert_eq!(Money::checked_sum(Vec::<Money>::new()), Some(Money::default()));
    }

    #[test]
    fn amount_input_accepts_numbers_and_text() {
        let number: AmountInput = serde_json::from_str("99.9").unwrap();
        let text: AmountInput = serde_json::from_str("\"99,90\"").unwrap();
        let empty: AmountInput = serde_json::from_str("\"\"").unwrap();

        assert_eq!(number.to_money().unwrap(), Some(Money::from_cents(9990)));
        assert_eq!(text.to_money().unwrap(), Some(Money::from_cents(9990)));
        assert_eq!(empty.to_money().unwrap(), None);
    }

    #[test]
    fn lead_bodies_pick_their_shape() {
        let batch: NewLeads =
            serde_json::from_str(r#"{"id_indicador": "r1", "leads": [{"nome": "Ana"}]}"#).unwrap();
        let single: NewLeads =
            serde_json::from_str(r#"{"codigoIndicacao": "ABC12345", "nome": "Ana"}"#).unwrap();

        assert!(matches!(batch, NewLeads::Batch(ref b) if b.leads.len() == 1));
        match single {
            NewLeads::Single(single) => {
                assert_eq!(single.referral_code.as_deref(), Some("ABC12345"));
                assert_eq!(single.lead.name.as_deref(), Some("Ana"));
            }
            NewLeads::Batch(_) => panic!("expected a single lead"),
        }
    }

    #[test]
    fn malformed_batch_is_not_read_as_a_single_lead() {
        let leads_not_a_list =
            serde_json::from_str::<NewLeads>(r#"{"id_indicador": "r1", "leads": "x"}"#);
        let bad_value = serde_json::from_str::<NewLeads>(
            r#"{"id_indicador": "r1", "leads": [{"nome": "Ana", "valor": true}]}"#,
        );

        let error = leads_not_a_list.unwrap_err().to_string();
        assert!(error.starts_with("lote de leads"), "{}", error);
        assert!(!error.contains("codigoIndicacao"));
        assert!(bad_value.unwrap_err().to_string().starts_with("lote de leads"));
    }
}
