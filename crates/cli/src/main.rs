// nomina CLI - payroll/pension roster reconciliation, headless

mod exit_codes;
mod util;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use log::warn;

use exit_codes::{EXIT_EMPTY_DATASET, EXIT_ERROR, EXIT_HEADER_NOT_FOUND, EXIT_SUCCESS, EXIT_USAGE};
use nomina_io::LoadError;
use nomina_recon::config::MergeConfig;
use nomina_recon::engine::{run, MergeInput, MergeOutput};
use nomina_recon::export::{date_stamp, plan_all, ExportFile, LayoutRegistry};
use nomina_recon::model::{table_rows, total_amount, Record};
use nomina_recon::schema;
use nomina_recon::split::split;
use nomina_recon::MergeError;
use util::format_currency;

#[derive(Parser)]
#[command(name = "nomina")]
#[command(about = "Reconcile payroll/pension extracts and build per-bank disbursement files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the biweekly payroll extract against the account roster
    #[command(after_help = "\
Examples:
  nomina merge --nuevo quincena.xlsx --base base.xlsx
  nomina merge --nuevo quincena.xlsx --base base.xlsx --efectivo efectivo.xlsx --split
  nomina merge --nuevo q.csv --base b.csv --split --por-proyecto --fecha 2025-03-14")]
    Merge {
        /// New/biweekly payroll extract
        #[arg(long)]
        nuevo: PathBuf,

        /// Account roster (base) extract
        #[arg(long)]
        base: PathBuf,

        /// Optional cash-payments extract
        #[arg(long)]
        efectivo: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,

        /// Add the Jardín/Otros project tier to the split
        #[arg(long)]
        por_proyecto: bool,
    },

    /// Merge the quincenal pension extract against the beneficiary roster
    #[command(after_help = "\
Examples:
  nomina pensiones --quincenal quincenal.xlsx --base beneficiarios.xlsx --split
  nomina pensiones --quincenal q.xlsx --base b.xlsx --modalidades mod.xlsx")]
    Pensiones {
        /// Quincenal pension extract
        #[arg(long)]
        quincenal: PathBuf,

        /// Beneficiary roster (base) extract
        #[arg(long)]
        base: PathBuf,

        /// Optional modality table keyed by tax id
        #[arg(long)]
        modalidades: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Validate a custom merge config without running it
    #[command(after_help = "\
Examples:
  nomina validate honorarios.toml")]
    Validate {
        /// Path to the TOML merge config
        config: PathBuf,
    },
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Also write the per-bank disbursement files
    #[arg(long)]
    split: bool,

    /// Run date driving the pay-period label and file stamps (default: today)
    #[arg(long)]
    fecha: Option<NaiveDate>,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Output file format
    #[arg(long, value_enum, default_value = "xlsx")]
    formato: Format,

    /// Print the run summary as JSON to stdout
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Xlsx,
    Csv,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Xlsx => "xlsx",
            Format::Csv => "csv",
        }
    }
}

struct CliError {
    code: u8,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: u8, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
            hint: None,
        }
    }
}

impl From<LoadError> for CliError {
    fn from(err: LoadError) -> Self {
        let code = match err {
            LoadError::HeaderNotFound { .. } => EXIT_HEADER_NOT_FOUND,
            _ => EXIT_ERROR,
        };
        CliError::new(code, err.to_string())
    }
}

impl From<MergeError> for CliError {
    fn from(err: MergeError) -> Self {
        let code = match err {
            MergeError::EmptyDataset { .. } => EXIT_EMPTY_DATASET,
            _ => EXIT_ERROR,
        };
        CliError::new(code, err.to_string())
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // clap renders its own help/usage text; help and version requests
            // are not usage errors.
            let is_usage_error = err.use_stderr();
            let _ = err.print();
            return ExitCode::from(if is_usage_error { EXIT_USAGE } else { EXIT_SUCCESS });
        }
    };

    let result = match cli.command {
        Commands::Merge {
            nuevo,
            base,
            efectivo,
            common,
            por_proyecto,
        } => {
            let config = if por_proyecto {
                MergeConfig::payroll_by_project()
            } else {
                MergeConfig::payroll()
            };
            cmd_merge(
                &config,
                FlowDictionaries::payroll(),
                &nuevo,
                &base,
                efectivo.as_deref(),
                None,
                &common,
            )
        }
        Commands::Pensiones {
            quincenal,
            base,
            modalidades,
            common,
        } => cmd_merge(
            &MergeConfig::pensions(),
            FlowDictionaries::pensions(),
            &quincenal,
            &base,
            None,
            modalidades.as_deref(),
            &common,
        ),
        Commands::Validate { config } => cmd_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(err.code)
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset loading
// ---------------------------------------------------------------------------

/// Load one extract and surface the non-blocking missing-column warning.
fn load_dataset(
    path: &Path,
    label: &str,
    required: &[&str],
    expected: &[&str],
) -> Result<Vec<Record>, CliError> {
    let records = nomina_io::load_records(path, required)?;
    eprintln!("{label}: {} filas ({})", records.len(), path.display());

    let missing = schema::missing_columns(&records, expected);
    if !missing.is_empty() {
        warn!("'{label}' missing expected columns: {}", missing.join(", "));
        eprintln!(
            "warning: '{label}' is missing expected columns: {} — continuing with blanks",
            missing.join(", ")
        );
    }
    Ok(records)
}

/// Per-flow column dictionaries: required detection columns and the full
/// expected set for the non-blocking warning.
struct FlowDictionaries {
    period_required: &'static [&'static str],
    period_expected: &'static [&'static str],
    base_required: &'static [&'static str],
    base_expected: &'static [&'static str],
}

impl FlowDictionaries {
    fn payroll() -> Self {
        FlowDictionaries {
            period_required: schema::REQUIRED_NEW_COLS,
            period_expected: schema::COL_NEW,
            base_required: schema::REQUIRED_BASE_COLS,
            base_expected: schema::COL_BASE,
        }
    }

    fn pensions() -> Self {
        FlowDictionaries {
            period_required: schema::REQUIRED_QUINCENAL_COLS,
            period_expected: schema::COL_QUINCENAL,
            base_required: schema::REQUIRED_BASE_PENSIONES_COLS,
            base_expected: schema::COL_BASE_PENSIONES,
        }
    }
}

// ---------------------------------------------------------------------------
// Merge command (both flows)
// ---------------------------------------------------------------------------

fn cmd_merge(
    config: &MergeConfig,
    dictionaries: FlowDictionaries,
    period_path: &Path,
    base_path: &Path,
    side_path: Option<&Path>,
    modality_path: Option<&Path>,
    args: &CommonArgs,
) -> Result<(), CliError> {
    let period = load_dataset(
        period_path,
        "periodo",
        dictionaries.period_required,
        dictionaries.period_expected,
    )?;
    let base = load_dataset(
        base_path,
        "base",
        dictionaries.base_required,
        dictionaries.base_expected,
    )?;

    let side = side_path
        .map(|path| load_dataset(path, "efectivo", schema::REQUIRED_CASH_COLS, schema::COL_CASH))
        .transpose()?;
    let modality = modality_path
        .map(|path| load_dataset(path, "modalidades", &["RFC", "MODALIDAD"], &["RFC", "MODALIDAD"]))
        .transpose()?;

    let input = MergeInput {
        period,
        base,
        side,
        modality,
    };
    let output = run(config, &input)?;

    let date = args
        .fecha
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    report_summary(config, &output, args)?;
    write_rosters(config, &output, date, args)?;

    if args.split {
        write_split_files(config, &output, date, args)?;
    }

    Ok(())
}

fn report_summary(
    config: &MergeConfig,
    output: &MergeOutput,
    args: &CommonArgs,
) -> Result<(), CliError> {
    let s = &output.summary;
    eprintln!(
        "{}: {} altas, {} bajas, {} filas fusionadas, total {}",
        config.name,
        s.additions,
        s.removals,
        s.merged,
        format_currency(s.total_amount),
    );

    if args.json {
        let json = serde_json::to_string_pretty(s)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }
    Ok(())
}

/// Write the merged roster plus the additions/removals/cash side tables.
fn write_rosters(
    config: &MergeConfig,
    output: &MergeOutput,
    date: NaiveDate,
    args: &CommonArgs,
) -> Result<(), CliError> {
    std::fs::create_dir_all(&args.out)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot create output dir: {e}")))?;

    let tables: [(&str, &[Record], &[String], usize); 4] = [
        (
            config.output.merged.as_str(),
            output.merged.as_slice(),
            config.export_columns.as_slice(),
            15,
        ),
        (
            config.output.additions.as_str(),
            output.additions.as_slice(),
            config.additions_columns.as_slice(),
            15,
        ),
        (
            config.output.removals.as_str(),
            output.removals.as_slice(),
            config.removals_columns.as_slice(),
            15,
        ),
        (
            config.output.cash.as_str(),
            output.cash_roster.as_slice(),
            config.export_columns.as_slice(),
            15,
        ),
    ];

    for (stem, records, columns, min_width) in tables {
        if records.is_empty() {
            continue;
        }
        let export = ExportFile {
            file_name: format!("{stem}_{}.{}", date_stamp(date), args.formato.extension()),
            sheet_name: stem.replace('_', " "),
            headers: columns.to_vec(),
            rows: table_rows(records, columns),
            min_column_width: min_width,
        };
        nomina_io::write_export(&args.out, &export)?;
        eprintln!("  escrito: {}", export.file_name);
    }

    Ok(())
}

/// Split the merged roster and write one disbursement file per bucket.
fn write_split_files(
    config: &MergeConfig,
    output: &MergeOutput,
    date: NaiveDate,
    args: &CommonArgs,
) -> Result<(), CliError> {
    let tree = split(config, &output.merged);
    if tree.is_empty() {
        eprintln!("no hay datos para separar: ninguna fila tiene banco");
        return Err(CliError::new(
            EXIT_EMPTY_DATASET,
            "no rows with a bank to split",
        ));
    }
    if tree.skipped_no_bank > 0 {
        eprintln!(
            "  {} fila(s) sin banco quedaron fuera de la separación",
            tree.skipped_no_bank
        );
    }

    for (key, bucket) in tree.iter() {
        eprintln!(
            "  {} — {} registros, {}",
            key.tiers().join(" → "),
            bucket.len(),
            format_currency(total_amount(bucket, &config.amount_column)),
        );
    }

    let registry = LayoutRegistry::default();
    let files = plan_all(&registry, config, &tree, date, args.formato.extension());
    for file in &files {
        nomina_io::write_export(&args.out, file)?;
        eprintln!("  escrito: {}", file.file_name);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Validate command
// ---------------------------------------------------------------------------

fn cmd_validate(path: &Path) -> Result<(), CliError> {
    let input = std::fs::read_to_string(path)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot read config: {e}")))?;
    match MergeConfig::from_toml(&input) {
        Ok(config) => {
            eprintln!(
                "valid: merge config '{}' — {} merged column(s), {} split level(s)",
                config.name,
                config.merged_columns.len(),
                config.split.levels.len(),
            );
            Ok(())
        }
        Err(e) => Err(CliError::new(EXIT_ERROR, e.to_string())),
    }
}
