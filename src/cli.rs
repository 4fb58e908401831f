use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean, load and report on district-level census data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize labels, reconcile boundary changes and fill missing counts
    Clean(CleanArgs),
    /// Clean the input, then persist it into the document and relational stores
    Load(LoadArgs),
    /// Run the aggregate report catalog against the relational store
    Report(ReportArgs),
    /// Print the effective raw-to-canonical label mapping
    Mapping(MappingArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// YAML pipeline configuration
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Census workbook (.xlsx, .xls, .ods) or delimited file; `-` reads stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Worksheet to read from a workbook (defaults to the first)
    #[arg(long)]
    pub sheet: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of delimited input and list files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Newline-delimited list of districts that formed the new region
    #[arg(long = "new-region-list")]
    pub new_region_list: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// JSON Lines file backing the document store
    #[arg(long)]
    pub documents: Option<PathBuf>,
    /// SQLite database backing the relational store
    #[arg(long)]
    pub database: Option<PathBuf>,
    /// File holding `user:` and `password:` entries for the relational store
    #[arg(long)]
    pub credentials: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults by output extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub stores: StoreArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum ReportFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// YAML pipeline configuration
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// SQLite database backing the relational store
    #[arg(long)]
    pub database: Option<PathBuf>,
    /// Run only the named report (repeatable)
    #[arg(long = "only", action = clap::ArgAction::Append)]
    pub only: Vec<String>,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: ReportFormat,
    /// List the available reports instead of running them
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Args)]
pub struct MappingArgs {
    /// YAML pipeline configuration whose label overrides are merged in
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn report_accepts_repeated_only() {
        let cli = Cli::try_parse_from([
            "census-etl",
            "report",
            "--only",
            "total_population",
            "--only",
            "overall_literacy_rate",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Report(args) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.only.len(), 2);
        assert_eq!(args.format, ReportFormat::Json);
    }

    #[test]
    fn delimiter_names_are_recognised() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("::").is_err());
    }
}
