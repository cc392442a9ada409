//! Flat-record codec for the table files.
//!
//! Every value is written quoted, with embedded quotes doubled. Reading is
//! quote-aware, so values containing commas, quotes or line breaks survive a
//! write/read cycle unchanged. Unquoted values are trimmed on read, which keeps
//! hand-edited files and older unquoted exports readable.

use std::collections::BTreeMap;

pub type Record = BTreeMap<String, String>;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CsvError {
    #[error("unterminated quoted field starting on line {0}")]
    UnterminatedQuote(usize),
}

pub fn encode(records: &[Record], columns: &[&str]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(columns.join(","));

    for record in records {
        let values: Vec<String> = columns
            .iter()
            .map(|column| quote(record.get(*column).map(String::as_str).unwrap_or("")))
            .collect();
        lines.push(values.join(","));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

pub fn decode(text: &str) -> Result<Vec<Record>, CsvError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut rows = split_rows(text)?.into_iter();
    let header: Vec<String> = match rows.next() {
        Some(header) => header
            .into_iter()
            .map(|column| column.trim().trim_matches('"').to_string())
            .collect(),
        None => return Ok(Vec::new()),
    };

    let records = rows
        .map(|values| {
            header
                .iter()
                .enumerate()
                .map(|(index, column)| {
                    (column.clone(), values.get(index).cloned().unwrap_or_default())
                })
                .collect()
        })
        .collect();

    Ok(records)
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn split_rows(text: &str) -> Result<Vec<Vec<String>>, CsvError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if !quoted && field.trim().is_empty() => {
                field.clear();
                quoted = true;
                in_quotes = true;
                quote_line = line;
            }
            ',' => row.push(finish_field(&mut field, &mut quoted)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                // blank lines carry no record
                if !(row.is_empty() && !quoted && field.trim().is_empty()) {
                    row.push(finish_field(&mut field, &mut quoted));
                    rows.push(std::mem::take(&mut row));
                }
                field.clear();
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote(quote_line));
    }

    if !row.is_empty() || quoted || !field.trim().is_empty() {
        row.push(finish_field(&mut field, &mut quoted));
        rows.push(row);
    }

    Ok(rows)
}

fn finish_field(field: &mut String, quoted: &mut bool) -> String {
    let value = std::mem::take(field);

    if std::mem::take(quoted) {
        value
    } else {
        value.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 3] = ["id", "nome", "email"];

    fn record(id: &str, nome: &str, email: &str) -> Record {
        Record::from([
            ("id".to_string(), id.to_string()),
            ("nome".to_string(), nome.to_string()),
            ("email".to_string(), email.to_string()),
        ])
    }

    #[test]
    fn empty_table_is_header_only() {
        let text = encode(&[], &COLUMNS);

        assert_eq!(text, "id,nome,email\n");
        assert!(decode(&text).unwrap().is_empty());
    }

    #[test]
    fn values_are_quoted_and_quotes_doubled() {
        let text = encode(&[record("1", "Ana \"Aninha\" Silva", "ana@x.com")], &COLUMNS);

        assert_eq!(
            text,
            "id,nome,email\n\"1\",\"Ana \"\"Aninha\"\" Silva\",\"ana@x.com\"\n"
        );
    }

    #[test]
    fn missing_fields_encode_as_empty() {
        let mut partial = Record::new();
        partial.insert("id".to_string(), "7".to_string());

        assert_eq!(encode(&[partial], &COLUMNS), "id,nome,email\n\"7\",\"\",\"\"\n");
    }

    #[test]
    fn round_trip_keeps_records_and_order() {
        let records = vec![
            record("1", "Ana Silva", "ana@x.com"),
            record("2", "Bruno Lima", "bruno@x.com"),
            record("3", "", "carla@x.com"),
        ];

        let decoded = decode(&encode(&records, &COLUMNS)).unwrap();

        assert_eq!(decoded, records);
    }

    #[test]
    fn round_trip_survives_commas_quotes_and_newlines() {
        let records = vec![record("1", "Silva, Ana \"A\"\nSegunda linha", " espaços ")];

        let decoded = decode(&encode(&records, &COLUMNS)).unwrap();

        assert_eq!(decoded, records);
    }

    #[test]
    fn short_lines_fill_trailing_fields_with_empty() {
        let decoded = decode("id,nome,email\n1,Ana\n").unwrap();

        assert_eq!(decoded, vec![record("1", "Ana", "")]);
    }

    #[test]
    fn unquoted_legacy_files_are_trimmed() {
        let decoded = decode("\"id\" , nome ,email\r\n 1 , Ana ,ana@x.com\r\n\r\n").unwrap();

        assert_eq!(decoded, vec![record("1", "Ana", "ana@x.com")]);
    }

    #[test]
    fn blank_text_decodes_to_nothing() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  \n\n").unwrap().is_empty());
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let result = decode("id,nome\n\"1\",\"Ana\n");

        assert_eq!(result, Err(CsvError::UnterminatedQuote(2)));
    }
}
