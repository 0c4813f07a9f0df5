//! CSV statement import
//!
//! Supports auto-detection of:
//! - Monobank: `Дата і час операції`, `Деталі операції`, `MCC`, `Сума`
//! - PrivatBank: `Дата і час`, `Опис операції` (or the legacy `Дата`, `Час` layout)
//! - Oschadbank: `Призначення платежу` with `Дебет` / `Кредит`
//! - Raiffeisen: iBank2 `OPERATION DATE`, `DOCUMENT AMOUNT`, D/C flag
//! - PUMB: `Дата документу`, `Призначення`, `Дебет` / `Кредит`
//! - A-Bank: `Прихід` / `Витрати`
//! - anything else through a column-name heuristic

mod csv_import;
mod detect;
mod extract;

pub use csv_import::{detect_csv_bank, parse_csv};
pub use detect::detect_bank;
pub use extract::{RowExtractor, RowRejection};
