//! Per-bank field extraction from CSV rows
//!
//! Each bank has a fixed layout: accepted header spellings per field plus how
//! the amount is encoded (one signed column, a debit/credit pair, or an
//! unsigned magnitude with a D/C flag). Columns are resolved once against the
//! header row; each record is then read into a [`RawRow`] or rejected with a
//! typed [`RowRejection`].

use chrono::NaiveDateTime;
use csv::StringRecord;

use crate::models::{Bank, RawRow};
use crate::normalize::{parse_amount, parse_date};

/// Why a record produced no row
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowRejection {
    #[error("header row has no {0} column")]
    MissingColumn(&'static str),

    #[error("unparseable amount {0:?}")]
    UnparseableAmount(String),

    #[error("neither debit nor credit carries an amount")]
    NoMovement,
}

/// How header names are compared with a field's aliases
#[derive(Debug, Clone, Copy)]
enum Matching {
    /// Trimmed, case-insensitive equality; aliases tried in order
    Exact,
    /// First header containing any alias wins
    Substring,
}

#[derive(Debug, Clone, Copy)]
enum AmountLayout {
    Signed {
        amount: &'static [&'static str],
    },
    Flagged {
        amount: &'static [&'static str],
        flag: &'static [&'static str],
    },
    DebitCredit {
        debit: &'static [&'static str],
        credit: &'static [&'static str],
        credit_first: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct BankLayout {
    matching: Matching,
    date: &'static [&'static str],
    time: &'static [&'static str],
    description: &'static [&'static str],
    mcc: &'static [&'static str],
    amount: AmountLayout,
}

const MONOBANK: BankLayout = BankLayout {
    matching: Matching::Exact,
    date: &["Дата і час операції", "date"],
    time: &[],
    description: &["Деталі операції", "Опис", "description"],
    mcc: &["MCC"],
    amount: AmountLayout::Signed {
        amount: &["Сума", "Сума у валюті рахунку", "Сума (у валюті рахунку)", "amount"],
    },
};

const PRIVATBANK: BankLayout = BankLayout {
    matching: Matching::Exact,
    date: &["Дата і час", "Дата", "Date"],
    time: &["Час", "Time"],
    description: &[
        "Опис операції",
        "Деталі операції",
        "Деталі",
        "Призначення",
        "Description",
    ],
    mcc: &["MCC"],
    amount: AmountLayout::Signed {
        amount: &["Сума в гривні", "Сума", "Amount", "Сума у валюті"],
    },
};

const OSCHADBANK: BankLayout = BankLayout {
    matching: Matching::Exact,
    date: &["Дата операції", "Дата проведення", "Дата", "Date"],
    time: &[],
    description: &[
        "Призначення платежу",
        "Призначення",
        "Найменування контрагента",
        "Деталі",
    ],
    mcc: &[],
    amount: AmountLayout::DebitCredit {
        debit: &["Дебет", "Сума дебету", "Debit"],
        credit: &["Кредит", "Сума кредиту", "Credit"],
        credit_first: false,
    },
};

const RAIFFEISEN: BankLayout = BankLayout {
    matching: Matching::Exact,
    date: &["OPERATION DATE", "Дата операції", "Date"],
    time: &[],
    description: &["TRANSACTION DESCRIPTION", "Призначення", "Description", "Деталі"],
    mcc: &[],
    amount: AmountLayout::Flagged {
        amount: &["DOCUMENT AMOUNT", "Amount", "Сума", "Сума операції"],
        flag: &["DEBIT/CREDIT", "D/C", "Тип операції", "Type"],
    },
};

const PUMB: BankLayout = BankLayout {
    matching: Matching::Exact,
    date: &["Дата документу", "Дата операції", "Дата", "Date"],
    time: &[],
    description: &[
        "Призначення",
        "Призначення платежу",
        "Найменування контрагента",
        "Опис",
        "Description",
    ],
    mcc: &[],
    amount: AmountLayout::DebitCredit {
        debit: &["Дебет", "Сума дебету", "Debit", "Витрати"],
        credit: &["Кредит", "Сума кредиту", "Credit", "Надходження"],
        credit_first: false,
    },
};

const ABANK: BankLayout = BankLayout {
    matching: Matching::Exact,
    date: &["Дата", "Дата операції", "Дата і час", "Date"],
    time: &[],
    description: &["Опис", "Деталі", "Призначення", "Description", "Найменування"],
    mcc: &[],
    amount: AmountLayout::DebitCredit {
        debit: &["Витрати", "Витрата", "Списання", "Expense"],
        credit: &["Прихід", "Надходження", "Income", "Зарахування"],
        credit_first: true,
    },
};

const GENERIC: BankLayout = BankLayout {
    matching: Matching::Substring,
    date: &["date", "дата"],
    time: &[],
    description: &[
        "desc",
        "опис",
        "detail",
        "reference",
        "note",
        "призначення",
        "деталі",
    ],
    mcc: &["mcc"],
    amount: AmountLayout::Signed {
        amount: &["amount", "сума", "sum"],
    },
};

impl BankLayout {
    fn for_bank(bank: Bank) -> &'static BankLayout {
        match bank {
            Bank::Monobank => &MONOBANK,
            Bank::PrivatBank => &PRIVATBANK,
            Bank::Oschadbank => &OSCHADBANK,
            Bank::Raiffeisen => &RAIFFEISEN,
            Bank::Pumb => &PUMB,
            Bank::ABank => &ABANK,
            Bank::Generic => &GENERIC,
        }
    }

    fn resolve(&self, headers: &[String], aliases: &[&str]) -> Option<usize> {
        match self.matching {
            Matching::Exact => aliases.iter().find_map(|alias| {
                let alias = alias.to_lowercase();
                headers.iter().position(|h| *h == alias)
            }),
            Matching::Substring => headers
                .iter()
                .position(|h| aliases.iter().any(|alias| h.contains(alias))),
        }
    }
}

/// Resolved column positions for the amount encoding
#[derive(Debug, Clone, Copy, PartialEq)]
enum AmountColumns {
    Signed(Option<usize>),
    Flagged {
        amount: Option<usize>,
        flag: Option<usize>,
    },
    DebitCredit {
        debit: Option<usize>,
        credit: Option<usize>,
        credit_first: bool,
    },
}

/// Reads records of one CSV into raw rows for a given bank
#[derive(Debug, Clone)]
pub struct RowExtractor {
    bank: Bank,
    date: Option<usize>,
    time: Option<usize>,
    description: Option<usize>,
    mcc: Option<usize>,
    amount: AmountColumns,
}

impl RowExtractor {
    /// Resolve the bank's columns against a header row
    pub fn new(bank: Bank, headers: &StringRecord) -> Self {
        let layout = BankLayout::for_bank(bank);
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let resolve = |aliases: &[&str]| layout.resolve(&normalized, aliases);

        let amount = match layout.amount {
            AmountLayout::Signed { amount } => AmountColumns::Signed(resolve(amount)),
            AmountLayout::Flagged { amount, flag } => AmountColumns::Flagged {
                amount: resolve(amount),
                flag: resolve(flag),
            },
            AmountLayout::DebitCredit {
                debit,
                credit,
                credit_first,
            } => AmountColumns::DebitCredit {
                debit: resolve(debit),
                credit: resolve(credit),
                credit_first,
            },
        };

        let extractor = Self {
            bank,
            date: resolve(layout.date),
            time: resolve(layout.time),
            description: resolve(layout.description),
            mcc: resolve(layout.mcc),
            amount,
        };

        if !extractor.has_amount_columns() {
            tracing::warn!("{} headers have no amount column; every row will be skipped", bank);
        }
        extractor
    }

    pub fn bank(&self) -> Bank {
        self.bank
    }

    fn has_amount_columns(&self) -> bool {
        match self.amount {
            AmountColumns::Signed(amount) | AmountColumns::Flagged { amount, .. } => {
                amount.is_some()
            }
            AmountColumns::DebitCredit { debit, credit, .. } => debit.is_some() || credit.is_some(),
        }
    }

    /// Read one record
    ///
    /// An unparseable or missing date is replaced by `fallback_date`; only the
    /// amount decides whether the record is rejected.
    pub fn extract(
        &self,
        record: &StringRecord,
        fallback_date: NaiveDateTime,
    ) -> Result<RawRow, RowRejection> {
        let amount = self.read_amount(record)?;

        let mut date_raw = field(record, self.date).to_string();
        let time_raw = field(record, self.time);
        if !time_raw.is_empty() && !date_raw.contains(' ') {
            date_raw = format!("{} {}", date_raw, time_raw);
        }

        Ok(RawRow {
            date: parse_date(&date_raw).unwrap_or(fallback_date),
            amount,
            description: field(record, self.description).to_string(),
            mcc: field(record, self.mcc).to_string(),
        })
    }

    fn read_amount(&self, record: &StringRecord) -> Result<f64, RowRejection> {
        match self.amount {
            AmountColumns::Signed(column) => {
                let column = column.ok_or(RowRejection::MissingColumn("amount"))?;
                parse_required(field(record, Some(column)))
            }
            AmountColumns::Flagged { amount, flag } => {
                let column = amount.ok_or(RowRejection::MissingColumn("amount"))?;
                let value = parse_required(field(record, Some(column)))?;
                let flag = field(record, flag).to_uppercase();
                Ok(if flag.starts_with('D') {
                    -value.abs()
                } else if flag.starts_with('C') {
                    value.abs()
                } else {
                    value
                })
            }
            AmountColumns::DebitCredit {
                debit,
                credit,
                credit_first,
            } => {
                if debit.is_none() && credit.is_none() {
                    return Err(RowRejection::MissingColumn("debit/credit"));
                }
                let debit = parse_amount(field(record, debit))
                    .filter(|v| *v != 0.0)
                    .map(|v| -v.abs());
                let credit = parse_amount(field(record, credit))
                    .filter(|v| *v != 0.0)
                    .map(f64::abs);
                let picked = if credit_first {
                    credit.or(debit)
                } else {
                    debit.or(credit)
                };
                picked.ok_or(RowRejection::NoMovement)
            }
        }
    }
}

fn field(record: &StringRecord, column: Option<usize>) -> &str {
    column
        .and_then(|i| record.get(i))
        .map(str::trim)
        .unwrap_or("")
}

fn parse_required(raw: &str) -> Result<f64, RowRejection> {
    parse_amount(raw).ok_or_else(|| RowRejection::UnparseableAmount(raw.to_string()))
}
