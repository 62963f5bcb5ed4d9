// Gridworks CLI - headless faceting, filtering, and reconciliation

mod exit_codes;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand, ValueEnum};

use gridworks_changes::{
    join_rows, run_production, ChangeData, ChangeDataWriter, JsonChangeDataSerializer,
};
use gridworks_facet::engine::DEFAULT_CHOICE_LIMIT;
use gridworks_facet::{Engine, EngineConfig, EngineMode, FacetConfig};
use gridworks_io::error::ImportError;
use gridworks_model::{Cell, ColumnModel, ColumnReconConfig, Grid, Judgment, Recon};
use gridworks_recon::{LocalCandidateService, ReconProducer, StandardReconConfig};

use exit_codes::{EXIT_ERROR, EXIT_IO, EXIT_PARSE, EXIT_RECON_PARTIAL, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "gridworks")]
#[command(about = "Faceted browsing and reconciliation over tabular data (headless)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a facet configuration to a file and print JSON statistics
    #[command(after_help = "\
Examples:
  gridworks facets data.csv --config facets.json
  gridworks facets data.csv -c facets.json --mode records --key-column entity
  gridworks facets data.tsv -c facets.json --choice-limit 500 -o stats.json")]
    Facets {
        /// Input file (CSV/TSV, delimiter sniffed)
        input: PathBuf,

        /// Facet configuration: a JSON facet object or array of them
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// Whether predicates apply to rows or to records
        #[arg(long, value_enum, default_value_t = Mode::Rows)]
        mode: Mode,

        /// Key column for record grouping (records mode only)
        #[arg(long)]
        key_column: Option<String>,

        /// Maximum distinct choices a list facet reports
        #[arg(long, default_value_t = DEFAULT_CHOICE_LIMIT)]
        choice_limit: usize,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print the rows passing every facet's predicate as CSV
    #[command(after_help = "\
Examples:
  gridworks filter data.csv --config facets.json
  gridworks filter data.csv -c facets.json --mode records --key-column entity -o matching.csv")]
    Filter {
        /// Input file (CSV/TSV, delimiter sniffed)
        input: PathBuf,

        /// Facet configuration: a JSON facet object or array of them
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// Whether predicates apply to rows or to records
        #[arg(long, value_enum, default_value_t = Mode::Rows)]
        mode: Mode,

        /// Key column for record grouping (records mode only)
        #[arg(long)]
        key_column: Option<String>,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Reconcile a column against a local candidate table
    #[command(after_help = "\
Examples:
  gridworks reconcile data.csv --column name --candidates people.csv
  gridworks reconcile data.csv --column name --candidates people.csv \\
      --type-id Q5 --auto-match -o reconciled.csv

The candidate table is a CSV with header id,name,type[,type_name].
The output carries two extra columns with the matched id and name.")]
    Reconcile {
        /// Input file (CSV/TSV, delimiter sniffed)
        input: PathBuf,

        /// Column to reconcile
        #[arg(long)]
        column: String,

        /// Candidate table CSV
        #[arg(long)]
        candidates: PathBuf,

        /// Only accept candidates carrying this type
        #[arg(long)]
        type_id: Option<String>,

        /// Mark a judgement as matched when the top candidate is exact
        #[arg(long)]
        auto_match: bool,

        /// Maximum candidates kept per cell
        #[arg(long)]
        limit: Option<usize>,

        /// Where to persist change data (default: next to the output)
        #[arg(long)]
        changes: Option<PathBuf>,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Suppress the coverage report on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Rows,
    Records,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Facets {
            input,
            config,
            mode,
            key_column,
            choice_limit,
            output,
        } => cmd_facets(input, config, mode, key_column, choice_limit, output),
        Commands::Filter {
            input,
            config,
            mode,
            key_column,
            output,
        } => cmd_filter(input, config, mode, key_column, output),
        Commands::Reconcile {
            input,
            column,
            candidates,
            type_id,
            auto_match,
            limit,
            changes,
            output,
            quiet,
        } => cmd_reconcile(
            input, column, candidates, type_id, auto_match, limit, changes, output, quiet,
        ),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn run(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// shared plumbing
// ============================================================================

fn import_grid(path: &Path) -> Result<Grid, CliError> {
    gridworks_io::csv::import(path).map_err(|e| match e {
        ImportError::Io(_) => CliError::io(format!("cannot read {}: {e}", path.display())),
        other => CliError::parse(format!("{}: {other}", path.display())),
    })
}

/// The config file may hold one facet object or an array of them.
fn load_facet_configs(path: &Path) -> Result<Vec<FacetConfig>, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    if let Ok(configs) = serde_json::from_str::<Vec<FacetConfig>>(&text) {
        return Ok(configs);
    }
    match FacetConfig::from_json(&text) {
        Ok(config) => Ok(vec![config]),
        Err(e) => Err(CliError::parse(format!("{}: {e}", path.display()))
            .with_hint("expected a facet object or array, e.g. {\"type\": \"list\", ...}")),
    }
}

fn engine_config(
    mode: Mode,
    key_column: Option<String>,
    choice_limit: usize,
) -> Result<EngineConfig, CliError> {
    let mode = match (mode, key_column) {
        (Mode::Rows, None) => EngineMode::Rows,
        (Mode::Rows, Some(_)) => {
            return Err(CliError::args("--key-column requires --mode records"))
        }
        (Mode::Records, Some(key_column)) => EngineMode::Records { key_column },
        (Mode::Records, None) => {
            return Err(CliError::args("--mode records requires --key-column"))
        }
    };
    Ok(EngineConfig { mode, choice_limit })
}

fn write_output(output: Option<&Path>, content: &str) -> Result<(), CliError> {
    match output {
        Some(path) => fs::write(path, content)
            .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display()))),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{content}").map_err(|e| CliError::io(e.to_string()))
        }
    }
}

// ============================================================================
// facets
// ============================================================================

fn cmd_facets(
    input: PathBuf,
    config: PathBuf,
    mode: Mode,
    key_column: Option<String>,
    choice_limit: usize,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let grid = import_grid(&input)?;
    let facet_configs = load_facet_configs(&config)?;
    let engine_config = engine_config(mode, key_column, choice_limit)?;

    let engine = Engine::new(&grid, facet_configs, engine_config)
        .map_err(|e| CliError::args(e.to_string()))?;
    let result = engine.run();

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| CliError::run(e.to_string()))?;
    write_output(output.as_deref(), &json)
}

// ============================================================================
// filter
// ============================================================================

fn cmd_filter(
    input: PathBuf,
    config: PathBuf,
    mode: Mode,
    key_column: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let grid = import_grid(&input)?;
    let facet_configs = load_facet_configs(&config)?;
    let engine_config = engine_config(mode, key_column, DEFAULT_CHOICE_LIMIT)?;

    let engine = Engine::new(&grid, facet_configs, engine_config)
        .map_err(|e| CliError::args(e.to_string()))?;
    let indices = engine.matching_row_indices();

    match output {
        Some(path) => {
            let file = fs::File::create(&path)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            gridworks_io::csv::write_grid(&grid, Some(&indices), file)
        }
        None => {
            let stdout = io::stdout();
            gridworks_io::csv::write_grid(&grid, Some(&indices), stdout.lock())
        }
    }
    .map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// reconcile
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_reconcile(
    input: PathBuf,
    column: String,
    candidates: PathBuf,
    type_id: Option<String>,
    auto_match: bool,
    limit: Option<usize>,
    changes: Option<PathBuf>,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let grid = import_grid(&input)?;
    let column_index = grid
        .columns()
        .column_index(&column)
        .ok_or_else(|| CliError::args(format!("no column named {column:?} in input")))?;

    let service = LocalCandidateService::from_csv_path(&candidates)
        .map_err(|e| CliError::parse(format!("{}: {e}", candidates.display())))?;
    let service = match limit {
        Some(n) => service.with_limit(n),
        None => service,
    };

    let column_recon = ColumnReconConfig {
        service: "local".into(),
        type_id: type_id.clone(),
        type_name: None,
    };
    let recon_config = StandardReconConfig {
        service: "local".into(),
        column_name: column.clone(),
        type_id,
        type_name: None,
        auto_match,
        column_details: vec![],
        limit: limit.unwrap_or(0),
    };
    let producer = ReconProducer::new(recon_config, service, grid.columns())
        .map_err(|e| CliError::args(e.to_string()))?;

    let changes_path =
        changes.unwrap_or_else(|| default_changes_path(&input, output.as_deref()));
    let serializer = JsonChangeDataSerializer::<Recon>::new();
    let mut writer = ChangeDataWriter::create(&changes_path, grid.version())
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", changes_path.display())))?;
    let report = run_production(&grid, &producer, &serializer, &mut writer, &AtomicBool::new(false))
        .map_err(|e| CliError::run(e.to_string()))?;
    drop(writer);

    let data = ChangeData::load(&changes_path, &serializer)
        .map_err(|e| CliError::parse(format!("{}: {e}", changes_path.display())))?;
    let joined = join_rows(&grid, &data, |_, row, recon: &Recon| {
        row.with_cell(
            column_index,
            Cell::with_recon(row.value(column_index).clone(), recon.clone()),
        )
    })
    .map_err(|e| CliError::run(e.to_string()))?;

    let export = judgement_grid(&joined, column_index, &column, column_recon);
    match output {
        Some(path) => {
            let file = fs::File::create(&path)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            gridworks_io::csv::write_grid(&export, None, file)
        }
        None => {
            let stdout = io::stdout();
            gridworks_io::csv::write_grid(&export, None, stdout.lock())
        }
    }
    .map_err(|e| CliError::io(e.to_string()))?;

    if !quiet {
        let matched = matched_count(&joined, column_index);
        eprintln!(
            "reconciled {} of {} rows, {} matched",
            report.rows_covered, report.rows_total, matched
        );
        for failure in &report.failures {
            eprintln!(
                "  rows {}..{}: {}{}",
                failure.start_row,
                failure.start_row + failure.row_count as u64,
                failure.error,
                if failure.retryable { " (retryable)" } else { "" }
            );
        }
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError {
            code: EXIT_RECON_PARTIAL,
            message: format!(
                "only {} of {} rows reconciled",
                report.rows_covered, report.rows_total
            ),
            hint: Some(format!(
                "persisted rows are kept in {}; re-run to retry the rest",
                changes_path.display()
            )),
        })
    }
}

fn default_changes_path(input: &Path, output: Option<&Path>) -> PathBuf {
    output.unwrap_or(input).with_extension("changes")
}

/// The joined grid, widened with matched-id and matched-name columns so the
/// judgements survive CSV export; the reconciled column's metadata records
/// the service and type the run was constrained to.
fn judgement_grid(
    grid: &Grid,
    column_index: usize,
    column_name: &str,
    recon_config: ColumnReconConfig,
) -> Grid {
    let mut names: Vec<String> = grid
        .columns()
        .columns
        .iter()
        .map(|c| c.name.clone())
        .collect();
    names.push(format!("{column_name}_match_id"));
    names.push(format!("{column_name}_match_name"));
    let id_index = names.len() - 2;
    let name_index = names.len() - 1;

    let rows = grid
        .rows()
        .iter()
        .map(|row| {
            let matched = row
                .cell(column_index)
                .and_then(|c| c.recon.as_ref())
                .filter(|r| r.judgment == Judgment::Matched)
                .and_then(|r| r.matched.clone());
            match matched {
                Some(candidate) => row
                    .with_cell(id_index, Cell::text(candidate.id))
                    .with_cell(name_index, Cell::text(candidate.name)),
                None => row.with_cell(name_index, Cell::blank()),
            }
        })
        .collect();

    let mut columns = ColumnModel::from_names(&names);
    columns.columns[column_index].recon_config = Some(recon_config);
    Grid::new(columns, rows)
}

fn matched_count(grid: &Grid, column_index: usize) -> usize {
    grid.rows()
        .iter()
        .filter(|row| {
            row.cell(column_index)
                .and_then(|c| c.recon.as_ref())
                .map(|r| r.judgment == Judgment::Matched)
                .unwrap_or(false)
        })
        .count()
}
