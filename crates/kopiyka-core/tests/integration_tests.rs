//! Integration tests for kopiyka-core
//!
//! These tests exercise the full bytes → detect → extract → categorize →
//! resolve workflow through the public API.

use chrono::NaiveDate;
use csv::StringRecord;
use kopiyka_core::{
    import::{detect_bank, RowExtractor},
    parse_amount,
    pdf::parse_layouts,
    test_utils::{
        abank_page, monobank_page, monobank_pdf, sample_categories, simple_pdf, StatementLine,
        TestContext,
    },
    Bank, Categorizer, Error, FlowType, InMemoryCatalog, KopiykaConfig, ParseResult,
    StatementIngestor,
};

fn ingestor() -> StatementIngestor {
    StatementIngestor::with_defaults().expect("Embedded rules should load")
}

/// Every emitted row satisfies the output contract
fn assert_row_invariants(result: &ParseResult) {
    let catalog = sample_categories();
    for row in &result.rows {
        assert!(row.amount >= 0.01, "Row below minimum: {:?}", row);
        if let Some(id) = &row.category_id {
            let category = catalog
                .iter()
                .find(|c| &c.id == id)
                .expect("Resolved id should come from the catalog");
            assert_eq!(category.flow_type, row.flow_type);
        }
        if let Some(description) = &row.description {
            assert!(description.chars().count() <= 255);
        }
    }
}

// =============================================================================
// CSV Workflow
// =============================================================================

#[test]
fn test_monobank_csv_supermarket_row() {
    let csv = "Дата і час операції,Деталі операції,MCC,Сума\n\
               01.01.2025 10:00,СУПЕРМАРКЕТ ABC,5411,-150.00\n";
    let result = ingestor()
        .parse_csv(csv.as_bytes(), "user-1", &sample_categories())
        .expect("Failed to parse CSV");

    assert_eq!(result.bank, Bank::Monobank);
    assert_eq!(result.rows.len(), 1);
    let row = &result.rows[0];
    assert_eq!(row.amount, 150.0);
    assert_eq!(row.flow_type, FlowType::Expense);
    assert_eq!(row.metadata.raw_category, "Supermarkets");
    assert_eq!(row.category_id.as_deref(), Some("exp-supermarkets"));
    assert!(!row.ignore_in_stats);
    assert_eq!(
        row.transaction_date,
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    );
    assert_row_invariants(&result);
}

#[test]
fn test_salary_credit_without_mcc() {
    let csv = "Date,Description,Amount\n2025-01-05,Зарплата за грудень,5000\n";
    let result = ingestor()
        .parse_csv(csv.as_bytes(), "u", &sample_categories())
        .expect("Failed to parse CSV");

    let row = &result.rows[0];
    assert_eq!(row.flow_type, FlowType::Income);
    assert_eq!(row.metadata.raw_category, "Salary");
    assert_eq!(row.category_id.as_deref(), Some("inc-salary"));
}

#[test]
fn test_debt_repayment_is_ignored_in_stats() {
    let csv = "Date,Description,Amount\n2025-01-05,повернення боргу 200,200\n";
    let result = ingestor()
        .parse_csv(csv.as_bytes(), "u", &sample_categories())
        .expect("Failed to parse CSV");

    let row = &result.rows[0];
    assert!(row.ignore_in_stats);
    assert_eq!(row.metadata.raw_category, "Other income");
    assert_eq!(row.flow_type, FlowType::Income);
}

#[test]
fn test_debit_credit_bank_csv() {
    let csv = "Дата операції,Призначення платежу,Дебет,Кредит\n\
               01.03.2024,Оплата АТБ,250.00,\n\
               02.03.2024,Зарплата,,\"12 000,50\"\n\
               03.03.2024,Порожній рядок,,\n";
    let result = ingestor()
        .parse_csv(csv.as_bytes(), "u", &sample_categories())
        .expect("Failed to parse CSV");

    assert_eq!(result.bank, Bank::Oschadbank);
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.rows[0].flow_type, FlowType::Expense);
    assert_eq!(result.rows[0].amount, 250.0);
    assert_eq!(result.rows[1].flow_type, FlowType::Income);
    assert_row_invariants(&result);
}

#[test]
fn test_reimport_produces_identical_hashes() {
    let csv = "Date,Description,Amount\n\
               2024-03-15,Coffee,-55.00\n\
               2024-03-15,Coffee,55.00\n";
    let ingestor = ingestor();
    let first = ingestor.parse_csv(csv.as_bytes(), "u", &[]).unwrap();
    let second = ingestor.parse_csv(csv.as_bytes(), "u", &[]).unwrap();

    let hashes: Vec<_> = first.rows.iter().map(|r| r.import_hash.clone()).collect();
    let again: Vec<_> = second.rows.iter().map(|r| r.import_hash.clone()).collect();
    assert_eq!(hashes, again);
    // Purchase and refund of the same amount stay distinct
    assert_ne!(hashes[0], hashes[1]);
}

#[test]
fn test_parse_for_user_uses_catalog() {
    let catalog = InMemoryCatalog::new(vec![]).with_user("alice", sample_categories());
    let csv = "Date,Description,Amount\n2024-03-15,Сільпо,-20\n";
    let ingestor = ingestor();

    let alice = ingestor
        .parse_for_user(csv.as_bytes(), "alice", &catalog)
        .unwrap();
    assert_eq!(alice.rows[0].category_id.as_deref(), Some("exp-supermarkets"));

    let bob = ingestor.parse_for_user(csv.as_bytes(), "bob", &catalog).unwrap();
    assert_eq!(bob.rows[0].category_id, None);
    assert_eq!(bob.rows[0].user_id, "bob");
}

// =============================================================================
// Building Blocks
// =============================================================================

#[test]
fn test_amount_normalization() {
    assert_eq!(parse_amount("1 500,00"), Some(1500.0));
    assert_eq!(parse_amount("-1500.50"), Some(-1500.5));
    assert_eq!(parse_amount("1,234,567"), Some(1234567.0));
    assert_eq!(parse_amount("abc"), None);
}

#[test]
fn test_mcc_signature_beats_weaker_rules() {
    let headers = ["Дата і час операції", "MCC", "Сума"];
    assert_eq!(detect_bank(&headers[..]), Bank::Monobank);
}

#[test]
fn test_debit_column_becomes_negative() {
    let headers = StringRecord::from(vec!["Дата операції", "Призначення платежу", "Дебет", "Кредит"]);
    let extractor = RowExtractor::new(Bank::Oschadbank, &headers);
    let record = StringRecord::from(vec!["01.03.2024", "Оплата", "250.00", ""]);
    let fallback = NaiveDate::from_ymd_opt(2026, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let raw = extractor.extract(&record, fallback).expect("Row should extract");
    assert_eq!(raw.amount, -250.0);
}

#[test]
fn test_categorization_is_deterministic() {
    let ingestor = ingestor();
    let categorizer: Categorizer<'_> = ingestor.categorizer();
    for (description, mcc) in [("Сільпо", ""), ("UBER", "4121"), ("щось дивне", ""), ("поділ рахунку", "")] {
        assert_eq!(
            categorizer.categorize(description, mcc),
            categorizer.categorize(description, mcc)
        );
    }
}

#[test]
fn test_sign_correction_is_noop_when_consistent() {
    let ingestor = ingestor();
    let categorizer = ingestor.categorizer();

    let expense = categorizer.categorize("Сільпо", "5411");
    assert_eq!(
        categorizer.correct_for_sign(expense.clone(), -10.0, "Сільпо"),
        expense
    );

    let income = categorizer.categorize("Зарплата", "");
    assert_eq!(
        categorizer.correct_for_sign(income.clone(), 10.0, "Зарплата"),
        income
    );
}

// =============================================================================
// PDF Workflow
// =============================================================================

#[test]
fn test_person_name_in_pdf_is_transfer() {
    let harness = TestContext::new();
    let page = monobank_page(&[StatementLine::new(
        "03.01.2026 09:00",
        "Іван Петренко",
        "5411",
        "-300.00",
    )]);
    let result = parse_layouts(&[page], &harness.context("u")).expect("Failed to parse pages");

    let row = &result.rows[0];
    assert_eq!(row.flow_type, FlowType::Transfer);
    assert_eq!(row.metadata.raw_category, "Transfer (to person)");
    assert_eq!(row.category_id.as_deref(), Some("tr-person"));
    assert_eq!(row.amount, 300.0);
    assert_row_invariants(&result);
}

#[test]
fn test_abank_pdf_pages() {
    let harness = TestContext::new();
    let page = abank_page(
        &[
            "Період: 01.01.2026 – 31.01.2026",
            "Баланс на кінець періоду: 10 500.25 UAH",
        ],
        &[
            StatementLine::new("31.01.2026 08:48", "Зарплата", "", "5 000.00"),
            StatementLine::new("31.01.2026 09:10", "Зняття готівки", "6011", "-1 000.00"),
        ],
    );
    let result = parse_layouts(&[page], &harness.context("u")).expect("Failed to parse pages");

    assert_eq!(result.bank, Bank::ABank);
    let totals = result.bank_totals.clone().expect("A-Bank carries totals");
    assert_eq!(totals.balance_end, Some(10500.25));
    assert_eq!(totals.period_from.as_deref(), Some("01.01.2026"));
    assert_eq!(totals.expenses, None);

    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].metadata.raw_category, "Salary");
    assert_eq!(result.rows[1].flow_type, FlowType::Transfer);
    assert_eq!(result.rows[1].metadata.is_outgoing, Some(true));
    assert_row_invariants(&result);
}

#[test]
fn test_unrecognized_pdf_is_fatal() {
    let pdf = simple_pdf("Statement of account");
    let err = ingestor()
        .parse_statement(&pdf, "u", &sample_categories())
        .expect_err("Unknown bank must not parse");
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn test_statement_routing_and_detection() {
    let ingestor = ingestor();
    let pdf = simple_pdf("monobank");
    assert_eq!(ingestor.detect(&pdf).unwrap(), Bank::Monobank);

    // Recognized but without transaction tables: empty success
    let result = ingestor
        .parse_statement(&pdf, "u", &sample_categories())
        .expect("Recognized PDF should parse");
    assert_eq!(result.bank, Bank::Monobank);
    assert!(result.rows.is_empty());

    let csv = "Дата документу,Призначення,Дебет,Кредит\n";
    assert_eq!(ingestor.detect(csv.as_bytes()).unwrap(), Bank::Pumb);
}

#[test]
fn test_real_pdf_statement_through_ingestor() {
    let config = KopiykaConfig::embedded().expect("Embedded config should load");
    let mut rules = config.rules;
    rules.pdf.date_headers.push("Date".to_string());
    let ingestor = StatementIngestor::new(config.ingest, rules);

    let pdf = monobank_pdf(&[
        StatementLine::new("10.02.2026 08:05", "Coffee Point", "5814", "-65.50"),
        StatementLine::new("11.02.2026 14:20", "Upwork payout", "", "12 400.00"),
    ]);
    assert_eq!(ingestor.detect(&pdf).unwrap(), Bank::Monobank);

    let result = ingestor
        .parse_statement(&pdf, "u", &sample_categories())
        .expect("Recognized PDF should parse");
    assert_eq!(result.bank, Bank::Monobank);
    assert_eq!(result.rows.len(), 2);

    assert_eq!(result.rows[0].amount, 65.5);
    assert_eq!(result.rows[0].flow_type, FlowType::Expense);
    assert_eq!(result.rows[0].metadata.raw_category, "Restaurants");
    assert_eq!(result.rows[0].category_id.as_deref(), Some("exp-restaurants"));

    assert_eq!(result.rows[1].amount, 12400.0);
    assert_eq!(result.rows[1].description.as_deref(), Some("Upwork payout"));
    assert_eq!(result.rows[1].flow_type, FlowType::Income);
    assert_eq!(result.rows[1].metadata.raw_category, "Freelance");
    assert_row_invariants(&result);
}
