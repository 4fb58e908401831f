//! Fixed catalog of aggregate reports over the relational store.
//!
//! Every report joins one fact table to `districts` (and `regions` for the
//! region-level ones) and aggregates per district or per region. Ratios use
//! floating-point division and yield NULL when the denominator is zero.

use std::io::Write;

use anyhow::{Context, Result};
use log::{debug, warn};
use rusqlite::{Connection, types::ValueRef};
use serde::Serialize;

use crate::{error::StoreError, io_utils, table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    District,
    Region,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fact {
    Census,
    Household,
}

impl Fact {
    fn table(self) -> &'static str {
        match self {
            Fact::Census => crate::persist::relational::CENSUS_DATA,
            Fact::Household => crate::persist::relational::HOUSEHOLD_DATA,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportQuery {
    pub name: &'static str,
    pub title: &'static str,
    pub scope: Scope,
    pub fact: Fact,
    /// Aggregate select list over the fact table, aliased `f`.
    pub select: &'static str,
}

impl ReportQuery {
    pub fn sql(&self) -> String {
        let (key, join) = match self.scope {
            Scope::District => ("d.district_name", ""),
            Scope::Region => (
                "r.region_name",
                " JOIN regions r ON r.region_id = d.region_id",
            ),
        };
        let label = match self.scope {
            Scope::District => "district",
            Scope::Region => "region",
        };
        format!(
            "SELECT {key} AS {label}, {select} FROM {fact} f JOIN districts d ON f.district_code = d.district_code{join} GROUP BY {key} ORDER BY {key}",
            select = self.select,
            fact = self.fact.table(),
        )
    }
}

const fn district(
    name: &'static str,
    title: &'static str,
    fact: Fact,
    select: &'static str,
) -> ReportQuery {
    ReportQuery {
        name,
        title,
        scope: Scope::District,
        fact,
        select,
    }
}

const fn region(
    name: &'static str,
    title: &'static str,
    fact: Fact,
    select: &'static str,
) -> ReportQuery {
    ReportQuery {
        name,
        title,
        scope: Scope::Region,
        fact,
        select,
    }
}

pub static CATALOG: [ReportQuery; 20] = [
    district(
        "total_population",
        "Total Population of Each District",
        Fact::Census,
        "SUM(f.population) AS total_population",
    ),
    district(
        "literate_males_females",
        "Literate Males and Females in Each District",
        Fact::Census,
        "SUM(f.literate_male) AS literate_males, SUM(f.literate_female) AS literate_females",
    ),
    district(
        "worker_percentage",
        "Worker Percentage in Each District",
        Fact::Census,
        "100.0 * (TOTAL(f.male_workers) + TOTAL(f.female_workers)) / NULLIF(SUM(f.population), 0) AS worker_percentage",
    ),
    district(
        "households_with_lpg_png",
        "Households with LPG or PNG as Cooking Fuel in Each District",
        Fact::Household,
        "SUM(f.lpg_or_png_households) AS households_with_lpg_png",
    ),
    district(
        "religious_composition",
        "Religious Composition of Each District",
        Fact::Census,
        "SUM(f.hindus) AS hindus, SUM(f.muslims) AS muslims, SUM(f.christians) AS christians, \
         SUM(f.sikhs) AS sikhs, SUM(f.buddhists) AS buddhists, SUM(f.jains) AS jains, \
         SUM(f.others_religions) AS other_religions, SUM(f.religion_not_stated) AS religion_not_stated",
    ),
    district(
        "households_with_internet",
        "Households with Internet Access in Each District",
        Fact::Household,
        "SUM(f.households_with_internet) AS households_with_internet",
    ),
    district(
        "educational_attainment_distribution",
        "Educational Attainment Distribution in Each District",
        Fact::Census,
        "SUM(f.below_primary_education) AS below_primary_education, \
         SUM(f.primary_education) AS primary_education, \
         SUM(f.middle_education) AS middle_education, \
         SUM(f.secondary_education) AS secondary_education, \
         SUM(f.higher_education) AS higher_education, \
         SUM(f.graduate_education) AS graduate_education, \
         SUM(f.other_education) AS other_education, \
         SUM(f.literate_education) AS literate_education, \
         SUM(f.illiterate_education) AS illiterate_education, \
         SUM(f.total_education) AS total_education",
    ),
    district(
        "households_with_transportation_modes",
        "Households with Access to Various Modes of Transportation in Each District",
        Fact::Household,
        "SUM(f.households_with_bicycle) AS bicycle, SUM(f.households_with_car_jeep_van) AS car, \
         SUM(f.households_with_radio_transistor) AS radio, SUM(f.households_with_television) AS television, \
         SUM(f.households_with_scooter_motorcycle_moped) AS bike",
    ),
    district(
        "condition_of_census_houses",
        "Condition of Occupied Census Houses in Each District",
        Fact::Household,
        "SUM(f.condition_of_occupied_census_houses_dilapidated_households) AS dilapidated, \
         SUM(f.households_with_separate_kitchen_cooking_inside_house) AS separate_kitchen, \
         SUM(f.having_bathing_facility_total_households) AS bathing_facility, \
         SUM(f.having_latrine_facility_within_the_premises_total_households) AS latrine_facility",
    ),
    district(
        "household_size_distribution",
        "Household Size Distribution in Each District",
        Fact::Household,
        "SUM(f.household_size_1_person_households) AS size_1_person, \
         SUM(f.household_size_2_persons_households) AS size_2_persons, \
         SUM(f.household_size_3_to_5_persons_households) AS size_3_5_persons, \
         SUM(f.household_size_6_8_persons_households) AS size_6_8_persons, \
         SUM(f.household_size_9_persons_and_above_households) AS size_9_persons_and_above",
    ),
    region(
        "total_households_in_each_state",
        "Total Number of Households in Each State",
        Fact::Household,
        "SUM(f.households) AS total_households",
    ),
    region(
        "households_with_latrine_facility_in_state",
        "Households with Latrine Facility within the Premises in Each State",
        Fact::Household,
        "SUM(f.having_latrine_facility_within_the_premises_total_households) AS households_with_latrine_facility",
    ),
    region(
        "average_household_size_in_state",
        "Average Household Size in Each State",
        Fact::Household,
        "AVG(f.household_size_2_persons_households) AS size_2_persons_households, \
         AVG(f.household_size_1_to_2_persons) AS size_1_to_2_persons_households, \
         AVG(f.household_size_3_persons_households) AS size_3_persons_households, \
         AVG(f.household_size_3_to_5_persons_households) AS size_3_to_5_persons_households, \
         AVG(f.household_size_4_persons_households) AS size_4_persons_households, \
         AVG(f.household_size_5_persons_households) AS size_5_persons_households, \
         AVG(f.household_size_6_8_persons_households) AS size_6_8_persons_households, \
         AVG(f.household_size_9_persons_and_above_households) AS size_9_persons_and_above_households",
    ),
    region(
        "households_owned_vs_rented_in_state",
        "Households Owned vs Rented in Each State",
        Fact::Household,
        "SUM(f.ownership_owned_households) AS owned_households, \
         SUM(f.ownership_rented_households) AS rented_households",
    ),
    region(
        "types_of_latrine_facilities_in_state",
        "Types of Latrine Facilities in Each State",
        Fact::Household,
        "SUM(f.type_of_latrine_facility_pit_latrine_households) AS pit_latrine, \
         SUM(f.latrine_flush_connected_other_system_households) AS flush_latrine, \
         SUM(f.type_of_latrine_facility_other_latrine_households) AS other_latrine, \
         SUM(f.latrine_nightsoil_open_drain_households) AS nightsoil_latrine, \
         SUM(f.no_latrine_open_source_households) AS no_latrine",
    ),
    region(
        "households_with_nearby_drinking_water",
        "Households with Drinking Water Sources Near the Premises in Each State",
        Fact::Household,
        "SUM(f.drinking_water_handpump_tubewell_borewell_households) AS households_with_nearby_drinking_water",
    ),
    region(
        "average_household_income_distribution",
        "Average Household Income Distribution in Each State",
        Fact::Census,
        "AVG(f.power_parity_less_than_rs_45000) AS avg_less_than_rs_45000, \
         AVG(f.power_parity_rs_45000_90000) AS avg_rs_45000_90000, \
         AVG(f.power_parity_rs_90000_150000) AS avg_rs_90000_150000, \
         AVG(f.power_parity_rs_45000_150000) AS avg_rs_45000_150000, \
         AVG(f.power_parity_rs_150000_240000) AS avg_rs_150000_240000, \
         AVG(f.power_parity_rs_240000_330000) AS avg_rs_240000_330000, \
         AVG(f.power_parity_rs_150000_330000) AS avg_rs_150000_330000, \
         AVG(f.power_parity_rs_330000_425000) AS avg_rs_330000_425000, \
         AVG(f.power_parity_rs_425000_545000) AS avg_rs_425000_545000, \
         AVG(f.power_parity_rs_330000_545000) AS avg_rs_330000_545000, \
         AVG(f.power_parity_above_rs_545000) AS avg_above_rs_545000, \
         AVG(f.total_power_parity) AS avg_total_power_parity",
    ),
    region(
        "percentage_of_married_couples_with_household_size",
        "Percentage of Married Couples with Different Household Sizes in Each State",
        Fact::Household,
        "100.0 * (TOTAL(f.married_couples_1_households) + TOTAL(f.married_couples_2_households) \
         + TOTAL(f.married_couples_3_households) + TOTAL(f.married_couples_3_or_more_households) \
         + TOTAL(f.married_couples_4_households) + TOTAL(f.married_couples_5_households)) \
         / NULLIF(SUM(f.households), 0) AS percentage_married_couples",
    ),
    region(
        "households_below_poverty_line",
        "Households Below Poverty Line in Each State",
        Fact::Census,
        "SUM(f.power_parity_less_than_rs_45000) AS households_below_poverty_line",
    ),
    region(
        "overall_literacy_rate",
        "Overall Literacy Rate in Each State",
        Fact::Census,
        "100.0 * TOTAL(f.literate_education) / NULLIF(SUM(f.population), 0) AS literacy_rate",
    ),
];

pub fn find(name: &str) -> Option<&'static ReportQuery> {
    CATALOG.iter().find(|q| q.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|q| q.name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub name: String,
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Result of one catalog entry. A failed query keeps its error so it can be
/// shown in place of the table.
#[derive(Debug)]
pub struct ReportOutcome {
    pub query: &'static ReportQuery,
    pub result: Result<ReportTable, StoreError>,
}

fn format_cell(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        ValueRef::Real(f) => format!("{f:.4}"),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

pub fn run_report(conn: &Connection, query: &ReportQuery) -> Result<ReportTable, StoreError> {
    let failed = |e: rusqlite::Error| StoreError::Query {
        name: query.name.to_string(),
        reason: e.to_string(),
    };
    let sql = query.sql();
    debug!("Report '{}': {}", query.name, sql);
    let mut stmt = conn.prepare(&sql).map_err(failed)?;
    let headers = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let width = headers.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(failed)?;
    while let Some(row) = cursor.next().map_err(failed)? {
        let cells = (0..width)
            .map(|idx| row.get_ref(idx).map(format_cell))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(failed)?;
        rows.push(cells);
    }
    Ok(ReportTable {
        name: query.name.to_string(),
        title: query.title.to_string(),
        headers,
        rows,
    })
}

/// Runs the selected reports, or the whole catalog when `only` is empty.
/// Failures are logged and carried in the outcome; the remaining reports still run.
pub fn run_catalog(conn: &Connection, only: &[String]) -> Result<Vec<ReportOutcome>> {
    let selected = if only.is_empty() {
        CATALOG.iter().collect::<Vec<_>>()
    } else {
        only.iter()
            .map(|name| {
                find(name).with_context(|| {
                    format!(
                        "Unknown report '{name}'. Available reports: {}",
                        names().collect::<Vec<_>>().join(", ")
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?
    };
    Ok(selected
        .into_iter()
        .map(|query| {
            let result = run_report(conn, query);
            if let Err(err) = &result {
                warn!("Report '{}' failed: {err}", query.name);
            }
            ReportOutcome { query, result }
        })
        .collect())
}

pub fn write_table(out: &mut dyn Write, outcome: &ReportOutcome) -> Result<()> {
    writeln!(out, "{}", outcome.query.title)?;
    match &outcome.result {
        Ok(report) => write!(out, "{}", table::render_table(&report.headers, &report.rows))?,
        Err(err) => writeln!(out, "error: {err}")?,
    }
    writeln!(out)?;
    Ok(())
}

pub fn write_csv(out: &mut dyn Write, outcome: &ReportOutcome, delimiter: u8) -> Result<()> {
    writeln!(out, "# {}", outcome.query.title)?;
    match &outcome.result {
        Ok(report) => {
            let mut writer = io_utils::csv_writer_for(&mut *out, delimiter);
            writer
                .write_record(&report.headers)
                .context("Writing report header")?;
            for row in &report.rows {
                writer.write_record(row).context("Writing report row")?;
            }
            writer.flush().context("Flushing report CSV")?;
        }
        Err(err) => writeln!(out, "# error: {err}")?,
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    name: &'a str,
    title: &'a str,
    scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<&'a [Vec<String>]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn write_json(out: &mut dyn Write, outcomes: &[ReportOutcome]) -> Result<()> {
    let reports = outcomes
        .iter()
        .map(|o| JsonReport {
            name: o.query.name,
            title: o.query.title,
            scope: o.query.scope,
            headers: o.result.as_ref().ok().map(|r| r.headers.as_slice()),
            rows: o.result.as_ref().ok().map(|r| r.rows.as_slice()),
            error: o.result.as_ref().err().map(|e| e.to_string()),
        })
        .collect::<Vec<_>>();
    serde_json::to_writer_pretty(&mut *out, &reports).context("Serializing reports to JSON")?;
    writeln!(out)?;
    Ok(())
}
