mod common;

use census_etl::{
    data::{CensusTable, Value},
    fields::{self, Triple},
    resolve::{fill_triples, resolve_missing},
};
use common::{District, canonical_table, column};
use proptest::prelude::*;

const POPULATION: [Triple; 1] = [fields::TRIPLES[0]];

fn triple_table(triple: Triple, cells: [Option<i64>; 3]) -> CensusTable {
    CensusTable::with_rows(
        triple.fields().iter().map(|f| f.to_string()).collect(),
        vec![cells.iter().map(|c| c.map(Value::Integer)).collect()],
    )
}

fn cells(table: &CensusTable) -> Vec<Option<i64>> {
    (0..3).map(|col| table.count(0, col).expect("numeric")).collect()
}

fn any_triple() -> impl Strategy<Value = Triple> {
    prop::sample::select(fields::TRIPLES.to_vec())
}

#[test]
fn report_tracks_before_and_after_percentages() {
    let mut table = canonical_table(&[
        District::new(1, "Kupwara", "Jammu and Kashmir").population(None, Some(474190), Some(396164)),
        District::new(2, "Badgam", "Jammu and Kashmir").population(Some(753745), None, Some(355704)),
        District::new(3, "Leh(Ladakh)", "Ladakh").population(None, None, Some(54516)),
        District::new(4, "Kargil", "Ladakh"),
    ]);
    let report = resolve_missing(&mut table).expect("resolve");

    let population = report.field(fields::POPULATION).unwrap();
    assert_eq!(population.before_percent, 50.0);
    assert_eq!(population.after_percent, 25.0);
    assert_eq!(population.filled, 1);
    let male = report.field(fields::MALE).unwrap();
    assert_eq!(male.before_percent, 50.0);
    assert_eq!(male.after_percent, 25.0);

    let pop = column(&table, fields::POPULATION);
    let m = column(&table, fields::MALE);
    assert_eq!(table.count(0, pop).unwrap(), Some(870354));
    assert_eq!(table.count(1, m).unwrap(), Some(398041));
    assert_eq!(table.count(2, pop).unwrap(), None);

    let names = report.fields.iter().map(|f| f.field.as_str()).collect::<Vec<_>>();
    assert_eq!(names, fields::TRACKED_FIELDS.to_vec());
    assert_eq!(report.table_rows()[4][1], "50.00");
}

#[test]
fn float_counts_from_spreadsheets_are_accepted() {
    let mut table = CensusTable::with_rows(
        POPULATION[0].fields().iter().map(|f| f.to_string()).collect(),
        vec![vec![None, Some(Value::Float(100.0)), Some(Value::Integer(80))]],
    );
    fill_triples(&mut table, &POPULATION).expect("fill");
    assert_eq!(table.get(0, 0), Some(&Value::Integer(180)));
}

#[test]
fn text_in_a_count_field_is_rejected() {
    let mut table = CensusTable::with_rows(
        POPULATION[0].fields().iter().map(|f| f.to_string()).collect(),
        vec![vec![None, Some(Value::Text("n.a.".into())), Some(Value::Integer(80))]],
    );
    assert!(fill_triples(&mut table, &POPULATION).is_err());
}

#[test]
fn literate_male_is_back_derived_from_total() {
    let triple = fields::TRIPLES[1];
    let mut table = triple_table(triple, [Some(50), None, Some(20)]);
    let counts = fill_triples(&mut table, &[triple]).expect("fill");
    assert_eq!(cells(&table), vec![Some(50), Some(30), Some(20)]);
    assert_eq!(counts.get(fields::LITERATE_MALE), 1);
}

proptest! {
    #[test]
    fn single_missing_field_is_restored(
        triple in any_triple(),
        a in 0i64..10_000_000,
        b in 0i64..10_000_000,
        missing in 0usize..3,
    ) {
        let mut full = [Some(a + b), Some(a), Some(b)];
        let expected = full;
        full[missing] = None;
        let mut table = triple_table(triple, full);
        fill_triples(&mut table, &[triple]).expect("fill");
        prop_assert_eq!(cells(&table), expected.to_vec());
    }

    #[test]
    fn complete_rows_are_left_alone(
        triple in any_triple(),
        total in 0i64..1_000,
        a in 0i64..1_000,
        b in 0i64..1_000,
    ) {
        let mut table = triple_table(triple, [Some(total), Some(a), Some(b)]);
        let counts = fill_triples(&mut table, &[triple]).expect("fill");
        prop_assert_eq!(cells(&table), vec![Some(total), Some(a), Some(b)]);
        prop_assert!(counts.counts.is_empty());
    }

    #[test]
    fn two_missing_fields_leave_the_row_unresolved(
        triple in any_triple(),
        value in 0i64..1_000_000,
        present in 0usize..3,
    ) {
        let mut row = [None, None, None];
        row[present] = Some(value);
        let mut table = triple_table(triple, row);
        fill_triples(&mut table, &[triple]).expect("fill");
        let after = cells(&table);
        prop_assert_eq!(after.iter().filter(|c| c.is_none()).count(), 2);
        prop_assert_eq!(after[present], Some(value));
    }

    #[test]
    fn large_counts_never_wrap(
        triple in any_triple(),
        a in (i64::MAX / 2 + 1)..i64::MAX,
        b in (i64::MAX / 2 + 1)..i64::MAX,
    ) {
        let mut table = triple_table(triple, [None, Some(a), Some(b)]);
        fill_triples(&mut table, &[triple]).expect("fill");
        prop_assert_eq!(cells(&table), vec![None, Some(a), Some(b)]);
    }
}
