use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rand::Rng;
use uuid::Uuid;

const REFERRAL_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const DEFAULT_REFERRAL_CODE_LENGTH: usize = 8;

/// Source of record identifiers, referral codes and prize draws.
pub trait Generator: Send + Sync {
    fn new_id(&self) -> String;

    fn new_referral_code(&self) -> String;

    /// Picks an index in `0..len`. `len` is never zero.
    fn draw_index(&self, len: usize) -> usize;
}

#[derive(Clone, Debug)]
pub struct RandomGenerator {
    referral_code_length: usize,
}

impl RandomGenerator {
    pub fn new(referral_code_length: usize) -> Self {
        Self {
            referral_code_length: referral_code_length.max(4),
        }
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_REFERRAL_CODE_LENGTH)
    }
}

impl Generator for RandomGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().hyphenated().to_string()
    }

    fn new_referral_code(&self) -> String {
        let mut rng = rand::thread_rng();

        (0..self.referral_code_length)
            .map(|_| {
                let index = rng.gen_range(0..REFERRAL_CODE_ALPHABET.len());
                REFERRAL_CODE_ALPHABET[index] as char
            })
            .collect()
    }

    fn draw_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Current time truncated to milliseconds, the precision kept in the tables.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Reads an RFC 3339 timestamp, or a bare `YYYY-MM-DD` date as written by
/// older exports. An empty value reads as the epoch.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(DateTime::<Utc>::default());
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{}'", value))
}

/// Contact fields are compared trimmed and case-insensitively.
pub fn same_contact(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::Generator;

    /// Deterministic generator: ids count up, codes follow the given list and
    /// repeat the last one once exhausted.
    pub struct SequenceGenerator {
        codes: Vec<String>,
        next_id: AtomicUsize,
        next_code: AtomicUsize,
        draw: usize,
    }

    impl SequenceGenerator {
        pub fn new(codes: &[&str]) -> Self {
            Self {
                codes: codes.iter().map(|code| code.to_string()).collect(),
                next_id: AtomicUsize::new(1),
                next_code: AtomicUsize::new(0),
                draw: 0,
            }
        }

        pub fn with_draw(mut self, draw: usize) -> Self {
            self.draw = draw;
            self
        }
    }

    impl Generator for SequenceGenerator {
        fn new_id(&self) -> String {
            format!("id-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
        }

        fn new_referral_code(&self) -> String {
            let index = self.next_code.fetch_add(1, Ordering::SeqCst);
            self.codes
                .get(index)
                .or_else(|| self.codes.last())
                .cloned()
                .unwrap_or_else(|| format!("CODE{:04}", index))
        }

        fn draw_index(&self, len: usize) -> usize {
            self.draw % len
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn referral_codes_are_uppercase_alphanumeric() {
        let generator = RandomGenerator::default();

        for _ in 0..50 {
            let code = generator.new_referral_code();
            assert_eq!(code.len(), DEFAULT_REFERRAL_CODE_LENGTH);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn ids_do_not_repeat() {
        let generator = RandomGenerator::default();
        let first = generator.new_id();
        let second = generator.new_id();

        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn draw_stays_inside_range() {
        let generator = RandomGenerator::default();

        for _ in 0..100 {
            assert!(generator.draw_index(8) < 8);
        }
    }

    #[test]
    fn timestamp_round_trips_through_text() {
        let timestamp = now();
        let parsed = parse_timestamp(&format_timestamp(&timestamp)).unwrap();

        assert_eq!(parsed, timestamp);
    }

    #[test]
    fn bare_dates_read_as_midnight() {
        let parsed = parse_timestamp("2024-03-15").unwrap();

        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2024, 3, 15));
        assert_eq!(parsed.hour(), 0);
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_timestamp("ontem").is_err());
        assert_eq!(parse_timestamp("").unwrap(), DateTime::<Utc>::default());
    }

    #[test]
    fn contacts_compare_normalized() {
        assert!(same_contact("Ana@X.com ", "ana@x.com"));
        assert!(!same_contact("ana@x.com", "ana@y.com"));
    }
}
