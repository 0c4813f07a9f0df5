//! CLI command implementations

use std::fs;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use kopiyka_core::{
    pdf::SignAwareClassifier, CategoryRef, Classification, KopiykaConfig, ParseResult,
    StatementIngestor,
};

/// Build an ingestor from the rules override or the default locations
pub fn load_ingestor(rules: Option<&Path>) -> Result<StatementIngestor> {
    let config = KopiykaConfig::load(rules).context("Failed to load rules")?;
    if config.path.is_none() {
        tracing::debug!("Using built-in rules");
    }
    Ok(StatementIngestor::from_config(config))
}

/// Read a JSON category catalog; no file means an empty catalog
pub fn load_catalog(path: Option<&Path>) -> Result<Vec<CategoryRef>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read categories: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid category catalog: {}", path.display()))
}

/// Drive a command to completion on a fresh multi-threaded runtime
///
/// The runtime is shut down without joining blocking workers, so a parse
/// abandoned by its timeout cannot keep the process alive.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

/// Parse statement bytes on a blocking worker, bounded by `timeout`
pub async fn run_parse(
    ingestor: StatementIngestor,
    content: Vec<u8>,
    user: String,
    categories: Vec<CategoryRef>,
    timeout: Duration,
) -> Result<ParseResult> {
    let task = tokio::task::spawn_blocking(move || {
        ingestor.parse_statement(&content, &user, &categories)
    });

    let joined = tokio::time::timeout(timeout, task)
        .await
        .map_err(|_| anyhow::anyhow!("Parsing timed out after {}s", timeout.as_secs()))?;
    let result = joined.context("Parse worker failed")??;
    Ok(result)
}

pub async fn cmd_parse(
    rules: Option<&Path>,
    file: &Path,
    user: &str,
    categories: Option<&Path>,
    timeout_secs: u64,
) -> Result<()> {
    let ingestor = load_ingestor(rules)?;
    let catalog = load_catalog(categories)?;
    let content =
        fs::read(file).with_context(|| format!("Failed to open file: {}", file.display()))?;

    let result = run_parse(
        ingestor,
        content,
        user.to_string(),
        catalog,
        Duration::from_secs(timeout_secs),
    )
    .await
    .with_context(|| format!("Failed to parse {}", file.display()))?;

    if result.is_empty() {
        tracing::warn!(
            "No transactions found in {}, check that it is a bank export",
            file.display()
        );
    } else {
        tracing::info!(
            "Parsed {} {} transactions ({} skipped)",
            result.rows.len(),
            result.bank.label(),
            result.skipped
        );
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub fn cmd_detect(rules: Option<&Path>, file: &Path) -> Result<()> {
    let ingestor = load_ingestor(rules)?;
    let content =
        fs::read(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let bank = ingestor
        .detect(&content)
        .with_context(|| format!("Failed to detect bank for {}", file.display()))?;

    println!("{} ({})", bank.label(), bank.as_str());
    Ok(())
}

/// Classify one description the way the pipelines would
///
/// Without an amount only the categorizer runs; with one, CSV sign correction
/// is applied, or the PDF sign-aware rules when `pdf` is set.
pub fn classify_one(
    ingestor: &StatementIngestor,
    description: &str,
    mcc: &str,
    amount: Option<f64>,
    pdf: bool,
) -> Classification {
    let categorizer = ingestor.categorizer();
    match amount {
        Some(amount) if pdf => {
            SignAwareClassifier::new(categorizer).classify(amount, description, mcc)
        }
        Some(amount) => {
            let verdict = categorizer.categorize(description, mcc);
            categorizer.correct_for_sign(verdict, amount, description)
        }
        None => categorizer.categorize(description, mcc),
    }
}

pub fn cmd_categorize(
    rules: Option<&Path>,
    description: &str,
    mcc: &str,
    amount: Option<f64>,
    pdf: bool,
) -> Result<()> {
    let ingestor = load_ingestor(rules)?;
    let verdict = classify_one(&ingestor, description, mcc, amount, pdf);

    println!("Category:        {}", verdict.category);
    println!("Type:            {}", verdict.flow_type);
    println!("Ignore in stats: {}", verdict.ignore_in_stats);
    Ok(())
}
