//! Bank detection from CSV header rows
//!
//! Signatures are checked in order, most specific first. A weak single-header
//! rule for one bank must never shadow a stronger combination for another,
//! so the list order is the tie-break; there is no scoring.

use crate::models::Bank;

/// One test against the normalized (lower-cased, trimmed) header set
#[derive(Debug, Clone, Copy)]
enum Clue {
    /// Some header contains the text
    Contains(&'static str),
    /// Some header equals the text
    Exact(&'static str),
    /// At least one of the nested clues holds
    Either(&'static [Clue]),
}

impl Clue {
    fn holds(&self, headers: &[String]) -> bool {
        match self {
            Self::Contains(needle) => headers.iter().any(|h| h.contains(needle)),
            Self::Exact(name) => headers.iter().any(|h| h == name),
            Self::Either(clues) => clues.iter().any(|c| c.holds(headers)),
        }
    }
}

/// A bank signature: all clues must hold
#[derive(Debug, Clone, Copy)]
struct Signature {
    bank: Bank,
    clues: &'static [Clue],
}

const SIGNATURES: &[Signature] = &[
    // Monobank: MCC column plus "transaction details" is unique to it
    Signature {
        bank: Bank::Monobank,
        clues: &[Clue::Exact("mcc"), Clue::Contains("деталі операції")],
    },
    Signature {
        bank: Bank::Monobank,
        clues: &[Clue::Contains("дата і час операції")],
    },
    // PrivatBank (Privat24)
    Signature {
        bank: Bank::PrivatBank,
        clues: &[Clue::Contains("дата і час"), Clue::Contains("опис операції")],
    },
    // PrivatBank legacy export
    Signature {
        bank: Bank::PrivatBank,
        clues: &[Clue::Contains("деталі операції"), Clue::Exact("категорія")],
    },
    Signature {
        bank: Bank::Oschadbank,
        clues: &[
            Clue::Contains("призначення платежу"),
            Clue::Either(&[Clue::Contains("дебет"), Clue::Contains("кредит")]),
        ],
    },
    Signature {
        bank: Bank::Oschadbank,
        clues: &[Clue::Contains("призначення платежу")],
    },
    // Raiffeisen (iBank2)
    Signature {
        bank: Bank::Raiffeisen,
        clues: &[Clue::Contains("operation date")],
    },
    Signature {
        bank: Bank::Raiffeisen,
        clues: &[
            Clue::Either(&[Clue::Contains("document amount"), Clue::Contains("операція")]),
            Clue::Exact("amount"),
        ],
    },
    Signature {
        bank: Bank::Pumb,
        clues: &[Clue::Contains("дата документу"), Clue::Contains("призначення")],
    },
    Signature {
        bank: Bank::Pumb,
        clues: &[Clue::Either(&[Clue::Contains("пумб"), Clue::Contains("pumb")])],
    },
    // A-Bank: separate income/expense columns
    Signature {
        bank: Bank::ABank,
        clues: &[Clue::Either(&[Clue::Contains("прихід"), Clue::Contains("витрати")])],
    },
    Signature {
        bank: Bank::ABank,
        clues: &[Clue::Either(&[Clue::Contains("abank"), Clue::Contains("а-банк")])],
    },
];

/// Detect the bank that produced a CSV from its header row
///
/// Falls back to [`Bank::Generic`], whose extractor searches column names
/// heuristically.
pub fn detect_bank<S: AsRef<str>>(headers: &[S]) -> Bank {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.as_ref().trim().to_lowercase())
        .collect();

    let bank = SIGNATURES
        .iter()
        .find(|sig| sig.clues.iter().all(|clue| clue.holds(&normalized)))
        .map(|sig| sig.bank)
        .unwrap_or(Bank::Generic);

    tracing::debug!("Detected {} from {} CSV headers", bank, normalized.len());
    bank
}
