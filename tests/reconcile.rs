mod common;

use census_etl::{
    fields,
    reconcile::{BoundaryChange, LADAKH, TELANGANA, reconcile},
};
use common::{District, TestWorkspace, canonical_table, column};
use encoding_rs::UTF_8;
use proptest::prelude::*;

fn regions(table: &census_etl::data::CensusTable) -> Vec<String> {
    let idx = column(table, fields::REGION);
    (0..table.len())
        .map(|row| table.text(row, idx).map(|r| r.into_owned()).unwrap_or_default())
        .collect()
}

#[test]
fn hyderabad_moves_to_telangana_from_list_file() {
    let workspace = TestWorkspace::new();
    let list = workspace.write("Telangana.txt", "Hyderabad\nWarangal\nAdilabad\n");
    let mut table = canonical_table(&[
        District::new(536, "Hyderabad", "Andhra Pradesh"),
        District::new(545, "Krishna", "Andhra Pradesh"),
        District::new(1, "Kupwara", "Jammu and Kashmir"),
        District::new(3, "Kargil", "Jammu and Kashmir"),
        District::new(2, "Leh(Ladakh)", "Jammu and Kashmir"),
    ]);
    let changes = vec![
        BoundaryChange::from_list_file(TELANGANA, &list, UTF_8).expect("read list"),
        BoundaryChange::ladakh(),
    ];
    let summary = reconcile(&mut table, &changes).expect("reconcile");

    assert_eq!(
        regions(&table),
        vec![
            "Telangana",
            "Andhra Pradesh",
            "Jammu and Kashmir",
            "Ladakh",
            "Ladakh"
        ]
    );
    assert_eq!(summary.reassigned.len(), 3);
    assert_eq!(summary.unmatched, vec!["Adilabad", "Warangal"]);
}

#[test]
fn missing_list_file_reports_the_region() {
    let workspace = TestWorkspace::new();
    let err = BoundaryChange::from_list_file(TELANGANA, &workspace.join("absent.txt"), UTF_8)
        .unwrap_err();
    assert!(format!("{err:#}").contains("Telangana"));
}

#[test]
fn later_change_wins_for_a_doubly_listed_district() {
    let mut table = canonical_table(&[District::new(3, "Kargil", "Jammu and Kashmir")]);
    let changes = vec![
        BoundaryChange::new(TELANGANA, ["Kargil"]),
        BoundaryChange::new(LADAKH, ["Kargil"]),
    ];
    reconcile(&mut table, &changes).expect("reconcile");
    assert_eq!(regions(&table), vec!["Ladakh"]);
}

#[test]
fn list_entries_match_district_names_exactly() {
    let workspace = TestWorkspace::new();
    let list = workspace.write("Telangana.txt", " Hyderabad \r\nWarangal\r\n");
    let mut table = canonical_table(&[
        District::new(536, "Hyderabad", "Andhra Pradesh"),
        District::new(537, "Warangal", "Andhra Pradesh"),
    ]);
    let changes = vec![BoundaryChange::from_list_file(TELANGANA, &list, UTF_8).expect("read list")];
    let summary = reconcile(&mut table, &changes).expect("reconcile");

    assert_eq!(regions(&table), vec!["Andhra Pradesh", "Telangana"]);
    assert_eq!(summary.unmatched, vec![" Hyderabad "]);
}

const NAMES: [&str; 6] = ["Hyderabad", "Krishna", "Kargil", "Kupwara", "Ernakulam", "Warangal"];

proptest! {
    #[test]
    fn reconciliation_is_idempotent_and_touches_only_listed_districts(
        listed in prop::sample::subsequence(NAMES.to_vec(), 0..=NAMES.len())
    ) {
        let districts = NAMES
            .iter()
            .enumerate()
            .map(|(idx, name)| District::new(idx as i64 + 1, name, "Old Region"))
            .collect::<Vec<_>>();
        let mut table = canonical_table(&districts);
        let changes = vec![BoundaryChange::new("New Region", listed.iter().copied())];

        reconcile(&mut table, &changes).expect("first pass");
        let once = table.clone();
        let summary = reconcile(&mut table, &changes).expect("second pass");
        prop_assert_eq!(&table, &once);
        prop_assert!(summary.reassigned.is_empty());

        for (name, region) in NAMES.iter().zip(regions(&table)) {
            let expected = if listed.contains(name) { "New Region" } else { "Old Region" };
            prop_assert_eq!(region, expected);
        }
    }
}
