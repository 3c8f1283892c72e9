//! lotledger - Cost-basis reports over a JSON ledger snapshot.
//!
//! # Usage
//!
//! ```bash
//! lotledger ledger.json lots Brokerage
//! lotledger ledger.json gain Brokerage --metric percent --parts cash_in
//! lotledger ledger.json sell Brokerage 15 --method lifo
//! lotledger ledger.json roc Brokerage 5000.00 --date 2024-06-03
//! ```
//!
//! # Reports
//!
//! - `lots` - Show the lots held by an account
//! - `gain` - Show the aggregate gain of an account
//! - `annual` - Show the percent annual gain of each lot
//! - `sell` - Preview the lot changes of a sale
//! - `split` - Preview the lot changes of a split or merge
//! - `roc` - Preview a return of capital
//!
//! Previews never modify the snapshot.

use crate::options::{parse_key_value, GainPartsKind};
use crate::snapshot::SnapshotLedger;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use lotledger_booking::{
    build_return_of_capital_for, build_sale_change_set, build_split_change_set,
    fetch_lot_states, CapitalGainsPolicy, GainTerm, LotChangeSet, LotSelection, SnapshotRef,
    SpecificLotRequest, SplitRole,
};
use lotledger_core::{
    apply_change, checked_sum, AccountId, BaseValue, LotId, LotOriginSource, LotState,
};
use lotledger_gains::{
    calc_cash_in_percent_annual_gain, calc_gain, calc_percent_annual_gain,
    create_account_state_info, market_value, AccountStateInfo, GainMetric, GainParts,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Generate cost-basis reports from a ledger snapshot.
#[derive(Parser, Debug)]
#[command(name = "lotledger")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The snapshot file to process
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// The report to generate
    #[command(subcommand)]
    pub report: Report,

    /// Override a snapshot option
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value, global = true)]
    pub options: Vec<(String, String)>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text, global = true)]
    pub format: Format,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Aligned plain text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Gain metric argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    /// Output minus input, in currency units
    Absolute,
    /// Gain as a percent of the input
    Percent,
}

impl From<MetricArg> for GainMetric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::Absolute => Self::Absolute,
            MetricArg::Percent => Self::Percent,
        }
    }
}

/// Ordered lot selection argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    /// Oldest lots first
    Fifo,
    /// Newest lots first
    Lifo,
}

/// Available reports.
#[derive(Subcommand, Debug)]
pub enum Report {
    /// Show the lots held by an account
    Lots {
        /// Account id or name
        account: String,
        /// Valuation date (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Show the aggregate gain of an account
    Gain {
        /// Account id or name
        account: String,
        /// Valuation date (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Gain metric
        #[arg(short, long, value_enum, default_value_t = MetricArg::Absolute)]
        metric: MetricArg,
        /// Which cost basis counts as input (defaults to the gain_parts option)
        #[arg(short, long, value_enum)]
        parts: Option<GainPartsKind>,
    },
    /// Show the percent annual gain of each lot
    Annual {
        /// Account id or name
        account: String,
        /// Valuation date (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Which cost basis counts as input (defaults to the gain_parts option)
        #[arg(short, long, value_enum)]
        parts: Option<GainPartsKind>,
    },
    /// Preview the lot changes of a sale
    Sell {
        /// Account id or name
        account: String,
        /// Shares to sell
        quantity: String,
        /// Sale date (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Lot selection (defaults to the booking_method option)
        #[arg(short, long, value_enum, conflicts_with = "lots")]
        method: Option<MethodArg>,
        /// Sell from a specific lot; repeat for several lots
        #[arg(short, long = "lot", value_name = "LOT=QUANTITY", value_parser = parse_key_value)]
        lots: Vec<(String, String)>,
    },
    /// Preview the lot changes of a split (positive) or merge (negative)
    Split {
        /// Account id or name
        account: String,
        /// Change in the account's total shares
        #[arg(allow_hyphen_values = true)]
        delta: String,
        /// Snapshot date (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Preview a return of capital
    Roc {
        /// Account id or name
        account: String,
        /// Amount returned, in the account's currency
        amount: String,
        /// Distribution date (defaults to today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

/// Load a snapshot and apply command-line option overrides.
pub fn load(path: &Path, overrides: &[(String, String)]) -> Result<SnapshotLedger> {
    if !path.exists() {
        anyhow::bail!("file not found: {}", path.display());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut ledger = SnapshotLedger::from_json(&json)
        .with_context(|| format!("failed to load {}", path.display()))?;

    for (key, value) in overrides {
        ledger.options_mut().set(key, value);
    }
    for warning in &ledger.options().warnings {
        tracing::warn!(code = warning.code, option = %warning.option, "{}", warning.message);
    }
    Ok(ledger)
}

/// Run the requested report, writing it to `writer`.
pub async fn run<W: Write>(args: &Args, writer: &mut W) -> Result<()> {
    tracing::debug!(file = %args.file.display(), "loading snapshot");
    let ledger = load(&args.file, &args.options)?;
    let format = args.format;

    match &args.report {
        Report::Lots { account, date } => {
            let account = resolve_account(&ledger, account)?;
            report_lots(&ledger, account, report_date(*date), format, writer).await
        }
        Report::Gain {
            account,
            date,
            metric,
            parts,
        } => {
            let account = resolve_account(&ledger, account)?;
            let parts = parts.unwrap_or(ledger.options().gain_parts);
            let date = report_date(*date);
            report_gain(&ledger, account, date, (*metric).into(), parts, format, writer).await
        }
        Report::Annual {
            account,
            date,
            parts,
        } => {
            let account = resolve_account(&ledger, account)?;
            let parts = parts.unwrap_or(ledger.options().gain_parts);
            report_annual(&ledger, account, report_date(*date), parts, format, writer).await
        }
        Report::Sell {
            account,
            quantity,
            date,
            method,
            lots,
        } => {
            let account = resolve_account(&ledger, account)?;
            let sale = Sale {
                quantity,
                method: *method,
                lots,
            };
            report_sale(&ledger, account, report_date(*date), &sale, format, writer).await
        }
        Report::Split {
            account,
            delta,
            date,
        } => {
            let account = resolve_account(&ledger, account)?;
            report_split(&ledger, account, report_date(*date), delta, format, writer).await
        }
        Report::Roc {
            account,
            amount,
            date,
        } => {
            let account = resolve_account(&ledger, account)?;
            report_roc(&ledger, account, report_date(*date), amount, format, writer).await
        }
    }
}

fn report_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| chrono::Local::now().date_naive())
}

fn resolve_account(ledger: &SnapshotLedger, key: &str) -> Result<AccountId> {
    ledger
        .find_account(key)
        .with_context(|| format!("unknown account \"{key}\""))
}

fn account_info(
    ledger: &SnapshotLedger,
    account: AccountId,
    date: NaiveDate,
) -> Result<AccountStateInfo> {
    create_account_state_info(ledger, account, date)
        .with_context(|| format!("account {account} does not hold a priced item"))
}

fn parse_shares(info: &AccountStateInfo, text: &str) -> Result<BaseValue> {
    info.priced_item
        .quantity_definition
        .parse(text)
        .with_context(|| format!("invalid quantity \"{text}\""))
}

fn parse_amount(info: &AccountStateInfo, text: &str) -> Result<BaseValue> {
    info.currency
        .quantity_definition
        .parse(text)
        .with_context(|| format!("invalid amount \"{text}\""))
}

fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

fn write_header<W: Write>(writer: &mut W, title: &str) -> Result<()> {
    writeln!(writer, "{title}")?;
    writeln!(writer, "{}", "=".repeat(60))?;
    writeln!(writer)?;
    Ok(())
}

fn or_na(value: Option<impl ToString>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

// ============================================================================
// Lots
// ============================================================================

#[derive(Debug, Serialize)]
struct LotRow {
    lot_id: LotId,
    date_created: NaiveDate,
    origin: Option<String>,
    quantity: Decimal,
    cost_basis: Decimal,
    market_value: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct LotsReport {
    account: String,
    date: NaiveDate,
    price: Option<Decimal>,
    lots: Vec<LotRow>,
}

/// Generate a lots report.
async fn report_lots<W: Write>(
    ledger: &SnapshotLedger,
    account: AccountId,
    date: NaiveDate,
    format: Format,
    writer: &mut W,
) -> Result<()> {
    let info = account_info(ledger, account, date)?;
    let lots = fetch_lot_states(ledger, account, SnapshotRef::AsOf(date)).await?;

    let report = LotsReport {
        account: info.account.name.clone(),
        date,
        price: info.price,
        lots: lots
            .iter()
            .map(|lot| LotRow {
                lot_id: lot.lot_id(),
                date_created: lot.date_created(),
                origin: ledger.lot_origin(lot.lot_id()).map(|o| o.to_string()),
                quantity: info.quantity_to_decimal(lot.quantity()),
                cost_basis: info.amount_to_decimal(lot.cost_basis()),
                market_value: market_value(&info, lot.quantity())
                    .map(|v| info.amount_to_decimal(v)),
            })
            .collect(),
    };

    if format == Format::Json {
        return write_json(writer, &report);
    }

    write_header(
        writer,
        &format!(
            "Lots: {} ({}) as of {date}",
            report.account, info.priced_item.id
        ),
    )?;
    writeln!(
        writer,
        "{:>8}  {:<10}  {:<20} {:>14} {:>14} {:>14}",
        "Lot", "Created", "Origin", "Quantity", "Cost basis", "Value"
    )?;
    for row in &report.lots {
        writeln!(
            writer,
            "{:>8}  {:<10}  {:<20} {:>14} {:>14} {:>14}",
            row.lot_id.0,
            row.date_created,
            row.origin.as_deref().unwrap_or("unknown"),
            row.quantity,
            row.cost_basis,
            or_na(row.market_value)
        )?;
    }

    let quantity =
        checked_sum(lots.iter().map(LotState::quantity)).context("total quantity out of range")?;
    let cost_basis = checked_sum(lots.iter().map(LotState::cost_basis))
        .context("total cost basis out of range")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:<42} {:>14} {:>14} {:>14}",
        format!("Total ({} lots)", lots.len()),
        info.quantity_to_decimal(quantity),
        info.amount_to_decimal(cost_basis),
        or_na(market_value(&info, quantity).map(|v| info.amount_to_decimal(v)))
    )?;
    Ok(())
}

// ============================================================================
// Gain
// ============================================================================

#[derive(Debug, Serialize)]
struct GainReport {
    account: String,
    date: NaiveDate,
    parts: String,
    metric: GainMetric,
    price: Option<Decimal>,
    input: Option<Decimal>,
    output: Option<Decimal>,
    gain: Option<Decimal>,
}

/// Generate an aggregate gain report.
async fn report_gain<W: Write>(
    ledger: &SnapshotLedger,
    account: AccountId,
    date: NaiveDate,
    metric: GainMetric,
    parts: GainPartsKind,
    format: Format,
    writer: &mut W,
) -> Result<()> {
    let info = account_info(ledger, account, date)?;
    let lots = fetch_lot_states(ledger, account, SnapshotRef::AsOf(date)).await?;

    let gain_parts = match parts {
        GainPartsKind::Simple => GainParts::Simple,
        GainPartsKind::CashIn => GainParts::CashInOnly(ledger),
    };
    let precision = match metric {
        GainMetric::Absolute => info.currency.quantity_definition.decimal_places(),
        GainMetric::Percent => ledger.options().percent_precision,
    };
    let result = calc_gain(&info, &lots, &gain_parts, Some(metric), Some(precision));

    let report = GainReport {
        account: info.account.name.clone(),
        date,
        parts: parts.to_string(),
        metric,
        price: info.price,
        input: result.input_base_value.map(|v| info.amount_to_decimal(v)),
        output: result.output_base_value.map(|v| info.amount_to_decimal(v)),
        gain: result.gain,
    };

    if format == Format::Json {
        return write_json(writer, &report);
    }

    let currency = &info.currency.code;
    write_header(writer, &format!("Gain: {} as of {date}", report.account))?;
    writeln!(writer, "{:<20} {}", "Price:", or_na(report.price))?;
    writeln!(
        writer,
        "{:<20} {} {currency}",
        format!("Input ({parts}):"),
        or_na(report.input)
    )?;
    writeln!(writer, "{:<20} {} {currency}", "Output:", or_na(report.output))?;
    let unit = match metric {
        GainMetric::Absolute => format!(" {currency}"),
        GainMetric::Percent => "%".to_string(),
    };
    match report.gain {
        Some(gain) => writeln!(writer, "{:<20} {gain}{unit}", "Gain:")?,
        None => writeln!(writer, "{:<20} n/a", "Gain:")?,
    }
    Ok(())
}

// ============================================================================
// Annual gain
// ============================================================================

#[derive(Debug, Serialize)]
struct AnnualRow {
    lot_id: LotId,
    date_created: NaiveDate,
    method: &'static str,
    gain: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct AnnualReport {
    account: String,
    date: NaiveDate,
    parts: String,
    lots: Vec<AnnualRow>,
    weighted: Option<Decimal>,
}

/// Generate a percent annual gain report.
async fn report_annual<W: Write>(
    ledger: &SnapshotLedger,
    account: AccountId,
    date: NaiveDate,
    parts: GainPartsKind,
    format: Format,
    writer: &mut W,
) -> Result<()> {
    let info = account_info(ledger, account, date)?;
    let lots = fetch_lot_states(ledger, account, SnapshotRef::AsOf(date)).await?;
    let precision = Some(ledger.options().percent_precision);

    let result = match parts {
        GainPartsKind::Simple => calc_percent_annual_gain(&info, &lots, date, precision),
        GainPartsKind::CashIn => {
            calc_cash_in_percent_annual_gain(&info, &lots, ledger, date, precision)?
        }
    };

    let created = |lot_id: LotId| {
        lots.iter()
            .find(|lot| lot.lot_id() == lot_id)
            .map_or(date, LotState::date_created)
    };
    let report = AnnualReport {
        account: info.account.name.clone(),
        date,
        parts: parts.to_string(),
        lots: result
            .per_lot
            .iter()
            .map(|lot| AnnualRow {
                lot_id: lot.lot_id,
                date_created: created(lot.lot_id),
                method: if lot.is_straight_gain {
                    "straight"
                } else {
                    "compound"
                },
                gain: lot.gain,
            })
            .collect(),
        weighted: result.weighted,
    };

    if format == Format::Json {
        return write_json(writer, &report);
    }

    write_header(
        writer,
        &format!("Annual gain: {} as of {date} ({parts})", report.account),
    )?;
    writeln!(
        writer,
        "{:>8}  {:<10}  {:<10} {:>12}",
        "Lot", "Created", "Method", "Gain %"
    )?;
    for row in &report.lots {
        writeln!(
            writer,
            "{:>8}  {:<10}  {:<10} {:>12}",
            row.lot_id.0,
            row.date_created,
            row.method,
            or_na(row.gain)
        )?;
    }
    writeln!(writer)?;
    writeln!(writer, "{:<32} {:>12}", "Weighted", or_na(report.weighted))?;
    Ok(())
}

// ============================================================================
// Change previews
// ============================================================================

#[derive(Debug, Serialize)]
struct LotPreview {
    lot_id: LotId,
    date_created: NaiveDate,
    quantity_before: Decimal,
    quantity_after: Decimal,
    cost_basis_before: Decimal,
    cost_basis_after: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    term: Option<GainTerm>,
}

/// Apply each change of `set` to its lot and record the result.
fn preview_changes(
    info: &AccountStateInfo,
    lots: &[LotState],
    set: &LotChangeSet,
) -> Result<Vec<(LotState, LotState)>> {
    set.changes
        .iter()
        .map(|change| -> Result<(LotState, LotState)> {
            let lot = lots
                .iter()
                .find(|lot| lot.lot_id() == change.lot_id)
                .with_context(|| format!("change for unknown lot {}", change.lot_id))?;
            let after = apply_change(lot, change, set.is_cost_basis_adjustment)?;
            tracing::trace!(
                account = %info.account.id,
                lot = %lot.lot_id(),
                quantity = after.quantity(),
                cost_basis = after.cost_basis(),
                "previewed change"
            );
            Ok((lot.clone(), after))
        })
        .collect()
}

fn lot_preview(
    info: &AccountStateInfo,
    before: &LotState,
    after: &LotState,
    term: Option<GainTerm>,
) -> LotPreview {
    LotPreview {
        lot_id: before.lot_id(),
        date_created: before.date_created(),
        quantity_before: info.quantity_to_decimal(before.quantity()),
        quantity_after: info.quantity_to_decimal(after.quantity()),
        cost_basis_before: info.amount_to_decimal(before.cost_basis()),
        cost_basis_after: info.amount_to_decimal(after.cost_basis()),
        term,
    }
}

fn write_previews<W: Write>(writer: &mut W, previews: &[LotPreview]) -> Result<()> {
    writeln!(
        writer,
        "{:>8}  {:<10} {:>14} {:>14} {:>14} {:>14}",
        "Lot", "Created", "Qty before", "Qty after", "Basis before", "Basis after"
    )?;
    for row in previews {
        writeln!(
            writer,
            "{:>8}  {:<10} {:>14} {:>14} {:>14} {:>14}",
            row.lot_id.0,
            row.date_created,
            row.quantity_before,
            row.quantity_after,
            row.cost_basis_before,
            row.cost_basis_after
        )?;
    }
    Ok(())
}

// ============================================================================
// Sale
// ============================================================================

struct Sale<'a> {
    quantity: &'a str,
    method: Option<MethodArg>,
    lots: &'a [(String, String)],
}

#[derive(Debug, Serialize)]
struct SaleReport {
    account: String,
    date: NaiveDate,
    method: String,
    quantity: Decimal,
    lots: Vec<LotPreview>,
    proceeds: Option<Decimal>,
    long_term_gain: Option<Decimal>,
    short_term_gain: Option<Decimal>,
}

fn sale_selection(
    ledger: &SnapshotLedger,
    info: &AccountStateInfo,
    sale: &Sale<'_>,
) -> Result<LotSelection> {
    if !sale.lots.is_empty() {
        let requests = sale
            .lots
            .iter()
            .map(|(lot, quantity)| -> Result<SpecificLotRequest> {
                let lot_id = lot
                    .parse::<u64>()
                    .map(LotId)
                    .with_context(|| format!("invalid lot id \"{lot}\""))?;
                Ok(SpecificLotRequest {
                    lot_id,
                    quantity: parse_shares(info, quantity)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(LotSelection::Specific(requests));
    }
    Ok(match sale.method {
        Some(MethodArg::Fifo) => LotSelection::Fifo,
        Some(MethodArg::Lifo) => LotSelection::Lifo,
        None => ledger.options().booking_method.clone(),
    })
}

/// Generate a sale preview.
async fn report_sale<W: Write>(
    ledger: &SnapshotLedger,
    account: AccountId,
    date: NaiveDate,
    sale: &Sale<'_>,
    format: Format,
    writer: &mut W,
) -> Result<()> {
    let info = account_info(ledger, account, date)?;
    let quantity = parse_shares(&info, sale.quantity)?;
    let selection = sale_selection(ledger, &info, sale)?;

    let snapshot = SnapshotRef::AsOf(date);
    let change_set = build_sale_change_set(ledger, account, snapshot, quantity, &selection).await?;
    let lots = fetch_lot_states(ledger, account, snapshot).await?;
    let changed = preview_changes(&info, &lots, &change_set)?;

    let mut proceeds: Option<BaseValue> = Some(0);
    let mut long_term: Option<BaseValue> = Some(0);
    let mut short_term: Option<BaseValue> = Some(0);
    let mut previews = Vec::with_capacity(changed.len());
    for (before, after) in &changed {
        let term = ledger.gain_term(account, before.date_created(), date);
        let sold = before
            .quantity()
            .checked_sub(after.quantity())
            .context("sold quantity out of range")?;
        let released = before
            .cost_basis()
            .checked_sub(after.cost_basis())
            .context("released cost basis out of range")?;

        match market_value(&info, sold) {
            Some(value) => {
                proceeds = proceeds.and_then(|total| total.checked_add(value));
                let gain = value.checked_sub(released);
                let total = match term {
                    GainTerm::LongTerm => &mut long_term,
                    GainTerm::ShortTerm => &mut short_term,
                };
                *total = total.zip(gain).and_then(|(total, gain)| total.checked_add(gain));
            }
            None => {
                proceeds = None;
                long_term = None;
                short_term = None;
            }
        }
        previews.push(lot_preview(&info, before, after, Some(term)));
    }

    let report = SaleReport {
        account: info.account.name.clone(),
        date,
        method: selection.to_string(),
        quantity: info.quantity_to_decimal(quantity),
        lots: previews,
        proceeds: proceeds.map(|v| info.amount_to_decimal(v)),
        long_term_gain: long_term.map(|v| info.amount_to_decimal(v)),
        short_term_gain: short_term.map(|v| info.amount_to_decimal(v)),
    };

    if format == Format::Json {
        return write_json(writer, &report);
    }

    write_header(
        writer,
        &format!(
            "Sale: {} {} from {} on {date} ({})",
            report.quantity, info.priced_item.id, report.account, report.method
        ),
    )?;
    write_previews(writer, &report.lots)?;
    writeln!(writer)?;
    let currency = &info.currency.code;
    writeln!(writer, "{:<20} {} {currency}", "Proceeds:", or_na(report.proceeds))?;
    writeln!(
        writer,
        "{:<20} {} {currency}",
        "Long-term gain:",
        or_na(report.long_term_gain)
    )?;
    writeln!(
        writer,
        "{:<20} {} {currency}",
        "Short-term gain:",
        or_na(report.short_term_gain)
    )?;
    Ok(())
}

// ============================================================================
// Split
// ============================================================================

#[derive(Debug, Serialize)]
struct SplitReport {
    account: String,
    date: NaiveDate,
    delta: Decimal,
    lots: Vec<LotPreview>,
}

/// Generate a split or merge preview.
async fn report_split<W: Write>(
    ledger: &SnapshotLedger,
    account: AccountId,
    date: NaiveDate,
    delta: &str,
    format: Format,
    writer: &mut W,
) -> Result<()> {
    let info = account_info(ledger, account, date)?;
    let delta = parse_shares(&info, delta)?;

    let snapshot = SnapshotRef::AsOf(date);
    let change_set = build_split_change_set(ledger, account, snapshot, delta).await?;
    let lots = fetch_lot_states(ledger, account, snapshot).await?;
    let changed = preview_changes(&info, &lots, &change_set)?;

    let report = SplitReport {
        account: info.account.name.clone(),
        date,
        delta: info.quantity_to_decimal(delta),
        lots: changed
            .iter()
            .map(|(before, after)| lot_preview(&info, before, after, None))
            .collect(),
    };

    if format == Format::Json {
        return write_json(writer, &report);
    }

    let kind = if delta < 0 { "Merge" } else { "Split" };
    write_header(
        writer,
        &format!(
            "{kind}: {} {} in {} on {date}",
            report.delta, info.priced_item.id, report.account
        ),
    )?;
    write_previews(writer, &report.lots)?;
    Ok(())
}

// ============================================================================
// Return of capital
// ============================================================================

#[derive(Debug, Serialize)]
struct EntryRow {
    role: SplitRole,
    account: AccountId,
    amount: Decimal,
}

#[derive(Debug, Serialize)]
struct RocReport {
    account: String,
    date: NaiveDate,
    amount: Decimal,
    entries: Vec<EntryRow>,
    lots: Vec<LotPreview>,
}

/// Generate a return-of-capital preview.
async fn report_roc<W: Write>(
    ledger: &SnapshotLedger,
    account: AccountId,
    date: NaiveDate,
    amount: &str,
    format: Format,
    writer: &mut W,
) -> Result<()> {
    let info = account_info(ledger, account, date)?;
    let amount = parse_amount(&info, amount)?;

    let descriptor = build_return_of_capital_for(ledger, account, amount, date).await?;
    let lots = fetch_lot_states(ledger, account, SnapshotRef::AsOf(date)).await?;
    let changed = match descriptor
        .split(SplitRole::ReturnOfCapital)
        .and_then(|split| split.lot_changes.as_ref())
    {
        Some(change_set) => preview_changes(&info, &lots, change_set)?,
        None => Vec::new(),
    };

    let report = RocReport {
        account: info.account.name.clone(),
        date,
        amount: info.amount_to_decimal(amount),
        entries: descriptor
            .splits
            .iter()
            .map(|split| EntryRow {
                role: split.role,
                account: split.account,
                amount: info.amount_to_decimal(split.amount_base_value),
            })
            .collect(),
        lots: changed
            .iter()
            .map(|(before, after)| lot_preview(&info, before, after, None))
            .collect(),
    };

    if format == Format::Json {
        return write_json(writer, &report);
    }

    let currency = &info.currency.code;
    write_header(
        writer,
        &format!(
            "Return of capital: {} {currency} to {} on {date}",
            report.amount, report.account
        ),
    )?;
    for entry in &report.entries {
        writeln!(
            writer,
            "{:<28} {:>8} {:>14} {currency}",
            entry.role.to_string(),
            entry.account.0,
            entry.amount
        )?;
    }
    writeln!(writer)?;
    write_previews(writer, &report.lots)?;
    Ok(())
}
