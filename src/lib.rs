pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod fields;
pub mod io_utils;
pub mod loader;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod resolve;
pub mod table;

use std::{
    env,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, ReportFormat, SourceArgs},
    config::{Credentials, PipelineConfig},
    data::CensusTable,
    loader::LoadOptions,
    normalize::LabelMapping,
    persist::relational::RelationalStore,
    pipeline::{CleanOutcome, StoreTargets},
    resolve::MissingnessReport,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("census_etl", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => handle_clean(&args),
        Commands::Load(args) => handle_load(&args),
        Commands::Report(args) => handle_report(&args),
        Commands::Mapping(args) => handle_mapping(&args),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            PipelineConfig::load(path).with_context(|| format!("Loading config from {path:?}"))
        }
        None => Ok(PipelineConfig::default()),
    }
}

struct Prepared {
    config: PipelineConfig,
    input: PathBuf,
    cleaned: CleanOutcome,
}

fn prepare(source: &SourceArgs) -> Result<Prepared> {
    let config = load_config(source.config.as_deref())?;
    let input = source
        .input
        .clone()
        .or_else(|| config.input.clone())
        .ok_or_else(|| anyhow!("No input given: pass --input or set 'input' in the config"))?;
    let encoding = io_utils::resolve_encoding(
        source
            .input_encoding
            .as_deref()
            .or(config.input_encoding.as_deref()),
    )?;
    let sheet = source.sheet.as_deref().or(config.sheet.as_deref());
    info!(
        "Reading census table from '{}' with delimiter '{}'",
        input.display(),
        printable_delimiter(io_utils::resolve_input_delimiter(&input, source.delimiter))
    );

    let mapping = LabelMapping::with_overrides(&config.label_overrides);
    let changes = config
        .boundary_changes(source.new_region_list.as_deref(), encoding)
        .context("Resolving boundary changes")?;
    debug!("{} boundary change(s) configured", changes.len());

    let table = loader::load_table(
        &input,
        &LoadOptions {
            sheet,
            delimiter: source.delimiter,
            encoding,
        },
    )
    .with_context(|| format!("Loading census table from {input:?}"))?;
    let cleaned = pipeline::clean_table(table, &mapping, &changes)
        .with_context(|| format!("Cleaning census table from {input:?}"))?;
    Ok(Prepared {
        config,
        input,
        cleaned,
    })
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let prepared = prepare(&args.source)?;
    let output = args.output.as_deref();
    let delimiter = io_utils::resolve_output_delimiter(output, args.output_delimiter);
    write_table(&prepared.cleaned.table, output, delimiter)?;

    let rendered = render_missingness(&prepared.cleaned.missingness);
    // The cleaned table owns stdout when no output file is given.
    if output.is_none_or(io_utils::is_dash) {
        eprint!("{rendered}");
    } else {
        print!("{rendered}");
        info!(
            "Wrote {} cleaned row(s) to {:?}",
            prepared.cleaned.table.len(),
            output
        );
    }
    Ok(())
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let prepared = prepare(&args.source)?;
    let stores = &prepared.config.stores;
    let documents = args.stores.documents.as_ref().unwrap_or(&stores.documents);
    let database = args.stores.database.as_ref().unwrap_or(&stores.database);
    let credentials = args
        .stores
        .credentials
        .as_ref()
        .or(stores.credentials.as_ref())
        .map(|path| Credentials::load(path))
        .transpose()?;
    let source = prepared.input.display().to_string();

    let outcome = pipeline::persist(
        &prepared.cleaned.table,
        &StoreTargets {
            documents,
            database,
            credentials: credentials.as_ref(),
            source: &source,
        },
    );

    print!("{}", render_missingness(&prepared.cleaned.missingness));
    table::print_titled(
        "Load summary",
        &persist::summary_headers(),
        &persist::summary_rows(&outcome.reports),
    );
    if let Some(run_id) = outcome.run_id {
        info!("Load run {run_id} recorded in {database:?}");
    }
    if !outcome.is_complete() {
        let messages = outcome
            .failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>();
        bail!(
            "{} store(s) could not be loaded: {}",
            messages.len(),
            messages.join("; ")
        );
    }
    Ok(())
}

fn handle_report(args: &cli::ReportArgs) -> Result<()> {
    if args.list {
        let rows = report::CATALOG
            .iter()
            .map(|q| {
                vec![
                    q.name.to_string(),
                    format!("{:?}", q.scope).to_lowercase(),
                    q.title.to_string(),
                ]
            })
            .collect::<Vec<_>>();
        table::print_table(
            &["name".to_string(), "scope".to_string(), "title".to_string()],
            &rows,
        );
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    let database = args.database.as_ref().unwrap_or(&config.stores.database);
    let store = RelationalStore::open_existing(database)?;
    let outcomes = report::run_catalog(store.connection(), &args.only)?;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        ReportFormat::Table => {
            for outcome in &outcomes {
                report::write_table(&mut out, outcome)?;
            }
        }
        ReportFormat::Csv => {
            for outcome in &outcomes {
                report::write_csv(&mut out, outcome, io_utils::DEFAULT_CSV_DELIMITER)?;
            }
        }
        ReportFormat::Json => report::write_json(&mut out, &outcomes)?,
    }
    out.flush()?;
    info!(
        "Ran {} report(s) against {:?}, {} failed",
        outcomes.len(),
        database,
        failed
    );
    Ok(())
}

fn handle_mapping(args: &cli::MappingArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mapping = LabelMapping::with_overrides(&config.label_overrides);
    let rows = mapping
        .entries()
        .iter()
        .map(|(raw, canonical)| vec![raw.clone(), canonical.clone()])
        .collect::<Vec<_>>();
    table::print_table(&["raw".to_string(), "canonical".to_string()], &rows);
    Ok(())
}

fn render_missingness(report: &MissingnessReport) -> String {
    format!(
        "Missing data before and after filling ({} rows)\n{}\n",
        report.rows,
        table::render_table(&MissingnessReport::table_headers(), &report.table_rows())
    )
}

fn write_table(table: &CensusTable, output: Option<&Path>, delimiter: u8) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(output, delimiter)?;
    writer
        .write_record(table.headers())
        .context("Writing header row")?;
    for (idx, row) in table.rows().iter().enumerate() {
        let cells = row
            .iter()
            .map(|cell| cell.as_ref().map(|v| v.as_display()).unwrap_or_default());
        writer
            .write_record(cells.map(|c| c.into_owned()))
            .with_context(|| format!("Writing row {}", idx + 1))?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
