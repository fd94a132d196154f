//! Bulkcart CLI

use std::{
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result};
use bulkcart::{
    config::CartConfig,
    fixtures::Fixture,
    formatting::{savings_sentence, summary, write_breakdown},
    ids::ProductUuid,
    logging::{LoggingConfig, init_subscriber},
    reconcile::{Reconciler, Reconciliation},
    solvers::{optimal_price, optimize_for_chosen_set},
};
use clap::{Args, Parser, Subcommand};
use humanize_duration::{Truncate, prelude::DurationExt};
use rustc_hash::FxHashMap;
use tabled::{builder::Builder, settings::Style};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "bulkcart", about = "Bulk set pricing and cart reconciliation", long_about = None)]
struct Cli {
    #[command(flatten)]
    logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Price a quantity of one product
    Quote(QuoteArgs),

    /// Revalidate a stored cart against a catalog
    Reconcile(ReconcileArgs),
}

#[derive(Debug, Args)]
struct QuoteArgs {
    /// Catalog YAML file
    #[arg(long)]
    catalog: PathBuf,

    /// Product key in the catalog
    #[arg(long)]
    product: String,

    /// Pieces, or number of sets when `--set` is given
    #[arg(long)]
    quantity: u32,

    /// Set key to buy whole sets of
    #[arg(long)]
    set: Option<String>,
}

#[derive(Debug, Args)]
struct ReconcileArgs {
    /// Catalog YAML file
    #[arg(long)]
    catalog: PathBuf,

    /// Stored cart YAML file
    #[arg(long)]
    cart: PathBuf,

    /// Cart engine config YAML file
    #[arg(long, env = "BULKCART_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_subscriber(&cli.logging)?;

    match cli.command {
        Commands::Quote(args) => quote(&args),
        Commands::Reconcile(args) => reconcile(&args).await,
    }
}

fn quote(args: &QuoteArgs) -> Result<()> {
    let mut fixture = Fixture::default();

    fixture
        .load_catalog_file(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;

    let product = fixture.product(&args.product)?;

    let started_at = Instant::now();

    let breakdown = match &args.set {
        Some(set) => {
            let set = fixture.set(&args.product, set)?;

            optimize_for_chosen_set(product, set.id, args.quantity)?
        }
        None => optimal_price(
            args.quantity,
            product.discounted_unit_price,
            product.reference_unit_price,
            &product.sets,
        )?,
    };

    let elapsed = started_at.elapsed();

    debug!(product = %product.id, quantity = args.quantity, "quoted");

    let mut out = io::stdout().lock();

    writeln!(out, "{}", product.name)?;
    write_breakdown(&mut out, &breakdown)?;

    if !breakdown.lines().is_empty() {
        writeln!(out, "\n {}", summary(&breakdown))?;
    }

    if let Some(sentence) = savings_sentence(&breakdown) {
        writeln!(out, " {sentence}")?;
    }

    writeln!(out, " Solved in {}", elapsed.human(Truncate::Nano))?;

    Ok(())
}

async fn reconcile(args: &ReconcileArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => CartConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CartConfig::default(),
    };

    let mut fixture = Fixture::default();

    fixture
        .load_catalog_file(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;

    let cart = fixture
        .load_cart_file(&args.cart)
        .with_context(|| format!("loading cart {}", args.cart.display()))?;

    let names: FxHashMap<ProductUuid, String> = fixture
        .products()
        .map(|product| (product.id, product.name.clone()))
        .collect();

    let reconciler = Reconciler::new(
        Arc::new(fixture.catalog()),
        config.currency()?,
        config.reconcile_settings(),
    );

    let started_at = Instant::now();
    let reconciliation = reconciler.reconcile(cart.lines).await;
    let elapsed = started_at.elapsed();

    let mut out = io::stdout().lock();

    writeln!(out, "Cart for {}", cart.owner)?;
    write_reconciliation(&mut out, &reconciliation, &names)?;
    writeln!(out, "\n Reconciled in {}", elapsed.human(Truncate::Nano))?;

    Ok(())
}

fn write_reconciliation(
    mut out: impl Write,
    reconciliation: &Reconciliation,
    names: &FxHashMap<ProductUuid, String>,
) -> io::Result<()> {
    let name = |product: &ProductUuid| {
        names
            .get(product)
            .cloned()
            .unwrap_or_else(|| product.to_string())
    };

    let mut valid = Builder::default();

    valid.push_record(["Product", "Qty", "Pieces", "Total", "Breakdown"]);

    for line in &reconciliation.valid {
        valid.push_record([
            name(&line.key.product),
            line.quantity.to_string(),
            line.breakdown.total_pieces().to_string(),
            line.breakdown.total_price().to_string(),
            summary(&line.breakdown),
        ]);
    }

    let mut table = valid.build();

    table.with(Style::modern_rounded());

    writeln!(out, "\nValid lines\n{table}")?;

    if !reconciliation.adjusted.is_empty() {
        writeln!(out, "\nAdjusted")?;

        for adjusted in &reconciliation.adjusted {
            let product = reconciliation
                .valid
                .iter()
                .find(|line| line.id == adjusted.line)
                .map_or_else(|| adjusted.line.to_string(), |line| name(&line.key.product));

            writeln!(out, " - {product}: {}", adjusted.change)?;
        }
    }

    if !reconciliation.invalid.is_empty() {
        writeln!(out, "\nRemoved")?;

        for invalid in &reconciliation.invalid {
            writeln!(out, " - {}: {}", name(&invalid.line.product), invalid.reason)?;
        }
    }

    Ok(())
}
