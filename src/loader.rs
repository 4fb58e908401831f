//! Reads the raw census table from a spreadsheet workbook or a delimited file.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    data::{CensusTable, Value, float_value, parse_cell},
    io_utils,
};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions<'a> {
    pub sheet: Option<&'a str>,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

pub fn load_table(path: &Path, options: &LoadOptions<'_>) -> Result<CensusTable> {
    let table = if is_workbook(path) {
        load_workbook(path, options.sheet)?
    } else {
        load_delimited(path, options.delimiter, options.encoding)?
    };
    info!(
        "Loaded {} district row(s) across {} column(s) from {:?}",
        table.len(),
        table.headers().len(),
        path
    );
    Ok(table)
}

pub fn load_delimited(
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<CensusTable> {
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    debug!(
        "Reading delimited input {:?} with delimiter '{}'",
        path,
        crate::printable_delimiter(delimiter)
    );
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)
        .with_context(|| format!("Reading headers from {path:?}"))?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();
    let mut table = CensusTable::new(headers);
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", idx + 2))?;
        let decoded = io_utils::decode_record(&record, encoding)
            .with_context(|| format!("Decoding row {}", idx + 2))?;
        table.push_row(decoded.iter().map(|cell| parse_cell(cell)).collect());
    }
    Ok(table)
}

pub fn load_workbook(path: &Path, sheet: Option<&str>) -> Result<CensusTable> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| anyhow!("Failed to open workbook {path:?}: {e}"))?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("Workbook {path:?} contains no sheets"))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| anyhow!("Failed to read sheet '{sheet_name}' in {path:?}: {e}"))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        bail!("Sheet '{sheet_name}' in {path:?} is empty");
    };
    let headers = header_row
        .iter()
        .map(|cell| match cell_value(cell) {
            Some(value) => value.as_display().trim().to_string(),
            None => String::new(),
        })
        .collect::<Vec<_>>();
    let mut table = CensusTable::new(headers);
    for row in rows {
        table.push_row(row.iter().map(cell_value).collect());
    }
    debug!("Read sheet '{sheet_name}' from {path:?}");
    Ok(table)
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) => parse_cell(s),
        Data::Float(n) => Some(float_value(*n)),
        Data::Int(n) => Some(Value::Integer(*n)),
        Data::Bool(b) => Some(Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string())),
        Data::Error(_) => None,
        Data::DateTime(dt) => Some(Value::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::Text(s.clone())),
    }
}
