mod common;

use std::{fs, path::Path};

use assert_cmd::Command;
use census_etl::persist::relational::{DISTRICTS, LOAD_RUNS, REGIONS, RelationalStore};
use common::{TestWorkspace, fixture_path};
use predicates::str::contains;

fn census_etl() -> Command {
    Command::cargo_bin("census-etl").expect("binary exists")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open cleaned csv");
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("row").iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

fn cell<'a>(headers: &[String], row: &'a [String], name: &str) -> &'a str {
    let idx = headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("column {name}"));
    &row[idx]
}

#[test]
fn clean_writes_canonical_reconciled_and_filled_table() {
    let workspace = TestWorkspace::new();
    let output = workspace.join("cleaned.csv");
    census_etl()
        .args([
            "clean",
            "-i",
            path_str(&fixture_path("census_sample.csv")),
            "--new-region-list",
            path_str(&fixture_path("telangana.txt")),
            "-o",
            path_str(&output),
        ])
        .assert()
        .success()
        .stdout(contains("Missing_data_before(%)"))
        .stdout(contains("Households"));

    let (headers, rows) = read_output(&output);
    assert_eq!(&headers[..3], ["District_code", "State/UT", "District"]);
    assert_eq!(rows.len(), 6);

    let regions = rows
        .iter()
        .map(|r| cell(&headers, r, "State/UT"))
        .collect::<Vec<_>>();
    assert_eq!(
        regions,
        vec![
            "Jammu and Kashmir",
            "Ladakh",
            "Ladakh",
            "Telangana",
            "Kerala",
            "Kerala"
        ]
    );
    assert_eq!(cell(&headers, &rows[0], "Households"), "178438");
    assert_eq!(cell(&headers, &rows[1], "Population"), "133487");
    assert_eq!(cell(&headers, &rows[2], "Literate_Male"), "55309");
    assert_eq!(cell(&headers, &rows[3], "Female"), "1924748");
    assert_eq!(cell(&headers, &rows[5], "Literate"), "3000000");
    // Households and Households_Rural both missing: one pass cannot resolve them.
    assert_eq!(cell(&headers, &rows[5], "Households"), "");
    assert_eq!(cell(&headers, &rows[5], "Households_Rural"), "");
}

#[test]
fn clean_to_stdout_keeps_report_on_stderr() {
    census_etl()
        .args([
            "clean",
            "-i",
            path_str(&fixture_path("census_sample.csv")),
            "--new-region-list",
            path_str(&fixture_path("telangana.txt")),
        ])
        .assert()
        .success()
        .stdout(contains("District_code,State/UT,District"))
        .stderr(contains("Missing_data_after(%)"));
}

#[test]
fn clean_fails_on_missing_required_field() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "broken.csv",
        "District code,State name,District name,Population\n1,KERALA,Wayanad,817420\n",
    );
    census_etl()
        .args(["clean", "-i", path_str(&input), "--new-region-list"])
        .arg(fixture_path("telangana.txt"))
        .assert()
        .failure()
        .stderr(contains("required field 'Male' is missing"));
}

#[test]
fn clean_fails_on_duplicate_district_code() {
    let workspace = TestWorkspace::new();
    let contents = fs::read_to_string(fixture_path("census_sample.csv")).unwrap();
    let duplicated = contents.replace("\n2,JAMMU", "\n1,JAMMU");
    let input = workspace.write("dup.csv", &duplicated);
    census_etl()
        .args(["clean", "-i", path_str(&input), "--new-region-list"])
        .arg(fixture_path("telangana.txt"))
        .assert()
        .failure()
        .stderr(contains("duplicate value '1' in key field 'District_code'"));
}

#[test]
fn load_then_report_from_config_file() {
    let workspace = TestWorkspace::new();
    workspace.write("lists/telangana.txt", "Hyderabad\n");
    fs::copy(
        fixture_path("census_sample.csv"),
        workspace.join("census_2011.csv"),
    )
    .unwrap();
    workspace.write("creds.txt", "# loader account\nuser: census\npassword: hunter2\n");
    let config = workspace.write(
        "census.yml",
        "input: census_2011.csv\n\
         boundary_changes:\n\
         \x20 - region: Telangana\n\
         \x20   districts_file: lists/telangana.txt\n\
         \x20 - region: Ladakh\n\
         \x20   districts: [\"Leh(Ladakh)\", \"Kargil\"]\n\
         stores:\n\
         \x20 documents: out/census.jsonl\n\
         \x20 database: out/census.sqlite\n\
         \x20 credentials: creds.txt\n",
    );

    census_etl()
        .args(["load", "-c", path_str(&config)])
        .assert()
        .success()
        .stdout(contains("Load summary"))
        .stdout(contains("household_data"));

    let database = workspace.join("out/census.sqlite");
    let store = RelationalStore::open_existing(&database).expect("database written");
    assert_eq!(store.row_count(REGIONS).unwrap(), 4);
    assert_eq!(store.row_count(DISTRICTS).unwrap(), 6);
    assert_eq!(store.row_count(LOAD_RUNS).unwrap(), 1);
    assert_eq!(store.region_of(536).unwrap().as_deref(), Some("Telangana"));
    let documents = fs::read_to_string(workspace.join("out/census.jsonl")).unwrap();
    assert_eq!(documents.lines().count(), 6);

    census_etl()
        .args([
            "report",
            "-c",
            path_str(&config),
            "--only",
            "total_households_in_each_state",
            "--format",
            "csv",
        ])
        .assert()
        .success()
        .stdout(contains("# Total Number of Households in Each State"))
        .stdout(contains("region,total_households"))
        .stdout(contains("Ladakh,33000"))
        .stdout(contains("Kerala,900000"));
}

#[test]
fn load_reports_unreadable_credentials() {
    let workspace = TestWorkspace::new();
    let creds = workspace.write("creds.txt", "user: census\n");
    census_etl()
        .args([
            "load",
            "-i",
            path_str(&fixture_path("census_sample.csv")),
            "--new-region-list",
            path_str(&fixture_path("telangana.txt")),
            "--database",
            path_str(&workspace.join("census.sqlite")),
            "--documents",
            path_str(&workspace.join("census.jsonl")),
            "--credentials",
            path_str(&creds),
        ])
        .assert()
        .failure()
        .stderr(contains("Missing 'password' entry"));
}

#[test]
fn report_against_missing_database_fails() {
    let workspace = TestWorkspace::new();
    census_etl()
        .args(["report", "--database"])
        .arg(workspace.join("nothing.sqlite"))
        .assert()
        .failure()
        .stderr(contains("cannot reach relational store"));
}

#[test]
fn report_list_and_mapping_print_tables() {
    census_etl()
        .args(["report", "--list"])
        .assert()
        .success()
        .stdout(contains("overall_literacy_rate"))
        .stdout(contains("region"));
    census_etl()
        .arg("mapping")
        .assert()
        .success()
        .stdout(contains("State name"))
        .stdout(contains("State/UT"));
}
