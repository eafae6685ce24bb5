use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::Amount;
use crate::gateway::{PaymentRequest, PaymentView, Submission};
use crate::model::CardDetails;

/// Errors that can occur when reading requests or writing payments
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open csv file: {0}")]
    Open(#[source] csv::Error),

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("failed to write csv: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush csv output: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    amount: i64,
    currency: String,
    card_number: String,
    expiry_date: String,
    card_holder: String,
    cvv: String,
    challenge_response: Option<String>,
    #[serde(default)]
    hook_url: Option<String>,
}

impl From<InputRow> for Submission {
    fn from(row: InputRow) -> Self {
        Submission {
            request: PaymentRequest {
                amount: Amount::from_minor(row.amount),
                currency: row.currency,
                card: CardDetails {
                    number: row.card_number,
                    expiry_date: row.expiry_date,
                    holder: row.card_holder,
                    cvv: row.cvv,
                },
                hook_url: row.hook_url.filter(|url| !url.is_empty()),
            },
            challenge_response: row.challenge_response.filter(|token| !token.is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    id: String,
    state: &'a str,
    amount: Amount,
    currency: &'a str,
    card_number: &'a str,
    expiry_date: &'a str,
    card_holder: &'a str,
    cvv: &'a str,
    acquiring_state: &'a str,
}

/// Read payment submissions from a csv file
///
/// Field values are kept as written (apart from surrounding whitespace);
/// validation happens in the gateway.
pub fn read_submissions(
    path: &Path,
) -> Result<impl Iterator<Item = Result<Submission, CsvError>> + use<>, CsvError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(CsvError::Open)?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            Ok(Submission::from(row))
        }))
}

/// Write payment views in csv format
pub fn write_payments<'a>(
    out: impl io::Write,
    views: impl IntoIterator<Item = &'a PaymentView>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(out);

    for view in views {
        let row = OutputRow {
            id: view.id.to_string(),
            state: view.state.as_str(),
            amount: view.amount,
            currency: &view.currency,
            card_number: &view.card_number,
            expiry_date: &view.expiry_date,
            card_holder: &view.card_holder,
            cvv: &view.cvv,
            acquiring_state: view.acquiring_state.map_or("", |s| s.as_str()),
        };
        writer.serialize(&row)?;
    }

    writer.flush()?;
    Ok(())
}
