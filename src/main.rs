use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::info;

use folio::error::{FolioError, Result};
use folio::ingest::{read_income, read_statics, read_trades};
use folio::model::{ItdPnlMode, ReturnBasis};
use folio::periodic::Periodicity;
use folio::pipeline::{self, PipelineOptions};
use folio::pricing::csv_store::CsvPriceStore;
use folio::pricing::CachedPrices;
use folio::reports::current::{snapshot, CurrentHolding};
use folio::reports::{Artifact, ReportArgs, ReportKind};
use folio::utils::{format_currency, format_number, format_pct};

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Portfolio holdings and returns analytics")]
#[command(
    long_about = "Builds daily holdings, valuations and compounding returns from \
transaction, income and price files, and writes the selected report as CSV."
)]
struct Cli {
    /// Report to produce
    #[arg(value_enum)]
    report: ReportArg,

    /// Transactions CSV (date, position, reference, quantity, value)
    #[arg(long, default_value = "transactions.csv")]
    transactions: PathBuf,

    /// Income CSV (date, position, quantity, value)
    #[arg(long)]
    income: Option<PathBuf>,

    /// Static position metadata JSON
    #[arg(long = "static", default_value = "static.json")]
    static_file: PathBuf,

    /// Directory of <ticker>.csv price files
    #[arg(long, default_value = "prices")]
    prices_dir: PathBuf,

    /// Directory the report CSVs are written to
    #[arg(long, default_value = ".")]
    output: PathBuf,

    /// Treat this date as today (open positions extend to the last complete
    /// business day before it)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Business days to project forward (forward-projection report)
    #[arg(long, default_value_t = 260)]
    fwd_periods: usize,

    /// Resample the forward projection to this bucket width
    #[arg(long, value_enum)]
    fwd_resample: Option<PeriodicityArg>,

    /// ITD PnL formulation
    #[arg(long, value_enum, default_value_t = ItdPnlArg::BridgedDaily)]
    itd_pnl: ItdPnlArg,

    /// Daily-return formulation
    #[arg(long, value_enum, default_value_t = BasisArg::BookCost)]
    return_basis: BasisArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportArg {
    DailyDetails,
    DailySummary,
    MonthlySummary,
    QuarterlySummary,
    AnnualSummary,
    CurrentHoldings,
    ForwardProjection,
    All,
}

impl From<ReportArg> for ReportKind {
    fn from(arg: ReportArg) -> Self {
        match arg {
            ReportArg::DailyDetails => ReportKind::DailyDetails,
            ReportArg::DailySummary => ReportKind::DailySummary,
            ReportArg::MonthlySummary => ReportKind::MonthlySummary,
            ReportArg::QuarterlySummary => ReportKind::QuarterlySummary,
            ReportArg::AnnualSummary => ReportKind::AnnualSummary,
            ReportArg::CurrentHoldings => ReportKind::CurrentHoldings,
            ReportArg::ForwardProjection => ReportKind::ForwardProjection,
            ReportArg::All => ReportKind::All,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PeriodicityArg {
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl From<PeriodicityArg> for Periodicity {
    fn from(arg: PeriodicityArg) -> Self {
        match arg {
            PeriodicityArg::Weekly => Periodicity::Weekly,
            PeriodicityArg::Monthly => Periodicity::Monthly,
            PeriodicityArg::Quarterly => Periodicity::Quarterly,
            PeriodicityArg::Annual => Periodicity::Annual,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ItdPnlArg {
    BridgedDaily,
    IncomeOnly,
}

impl From<ItdPnlArg> for ItdPnlMode {
    fn from(arg: ItdPnlArg) -> Self {
        match arg {
            ItdPnlArg::BridgedDaily => ItdPnlMode::BridgedDaily,
            ItdPnlArg::IncomeOnly => ItdPnlMode::IncomeOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BasisArg {
    BookCost,
    CloseIncome,
}

impl From<BasisArg> for ReturnBasis {
    fn from(arg: BasisArg) -> Self {
        match arg {
            BasisArg::BookCost => ReturnBasis::BookCost,
            BasisArg::CloseIncome => ReturnBasis::CloseIncome,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let kind = ReportKind::from(cli.report);

    let trades = read_trades(&cli.transactions)?;
    let income = match &cli.income {
        Some(path) => read_income(path)?,
        None => Vec::new(),
    };
    let statics = read_statics(&cli.static_file)?;
    info!(
        "loaded {} trades, {} income events, {} static entries",
        trades.len(),
        income.len(),
        statics.len()
    );

    let provider = CachedPrices::new(CsvPriceStore::new(&cli.prices_dir));
    let opts = PipelineOptions {
        as_of: cli.as_of.unwrap_or_else(|| Local::now().date_naive()),
        itd_mode: cli.itd_pnl.into(),
        basis: cli.return_basis.into(),
    };

    let data = pipeline::run(
        &trades,
        &income,
        &statics,
        &provider,
        kind.required_measures(),
        opts,
    )?;
    if data.summary.is_empty() {
        println!("{}", "No holdings computed (empty input?)".yellow());
        return Ok(());
    }

    let report_args = ReportArgs {
        fwd_periods: cli.fwd_periods,
        fwd_periodicity: cli.fwd_resample.map(Into::into),
    };
    let artifacts = kind.generate(&data, &report_args);

    if kind == ReportKind::CurrentHoldings {
        print_holdings_table(&snapshot(&data));
    }
    for artifact in &artifacts {
        let path = write_csv(&cli.output, artifact)?;
        println!("{} {}", "wrote".green(), path.display());
    }
    Ok(())
}

fn print_holdings_table(holdings: &[CurrentHolding]) {
    let mut builder = Builder::default();
    builder.push_record([
        "Position",
        "First Acquired",
        "Quantity",
        "Book Cost",
        "Market Value",
        "Income",
        "Total PnL",
        "Total Return",
        "Annualised",
        "Years Held",
    ]);
    for h in holdings {
        builder.push_record([
            h.position.clone(),
            h.first_acquired.to_string(),
            format_number(h.quantity),
            format_currency(h.book_cost),
            format_currency(h.market_value),
            format_currency(h.income),
            format_currency(h.total_pnl),
            h.total_return_pct.map(format_pct).unwrap_or_default(),
            h.annualised_return_pct.map(format_pct).unwrap_or_default(),
            h.held_years.to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
}

fn write_csv(dir: &Path, artifact: &Artifact) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    let path = dir.join(format!("{}.csv", artifact.name));
    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| FolioError::Report(e.to_string()))
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(&artifact.headers)?;
    for row in &artifact.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(path)
}
