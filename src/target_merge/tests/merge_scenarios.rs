mod common;
use common::{default_merger, jan, open_merger, setup_workspace, table};

use std::fs;

use target_merge::schema::FieldSpec;
use target_merge::{CanonicalSchema, Error, MergerState, SaveOutcome, TargetMerger, build_lookup};

#[test]
fn first_merged_file_wins_for_overlapping_names() {
    let ws = setup_workspace();
    let mut merger = default_merger();

    let a = table(&["Name", "RA", "DEC"], &[&["T1", "10.0", "20.0"]]);
    let b = table(
        &["ID", "Right Ascension", "Declination", "Vmag"],
        &[&["T1", "10.1", "20.1", "12.0"]],
    );
    let c = table(
        &["target name", "ra", "dec", "Mag", "Epoch"],
        &[&["T2", "30.5", "-5.25", "9.8", "J2000"]],
    );

    assert_eq!(merger.merge_at(&a, "a.csv", jan(1)).unwrap(), 1);
    assert_eq!(merger.merge_at(&b, "b.csv", jan(2)).unwrap(), 1);
    assert_eq!(merger.merge_at(&c, "c.csv", jan(3)).unwrap(), 1);
    assert_eq!(merger.master().len(), 3);

    let outcome = merger.deduplicate_and_save(&ws.master).unwrap();
    assert_eq!(
        outcome,
        SaveOutcome::Saved {
            rows: 2,
            duplicates_removed: 1
        }
    );

    let t1 = &merger.master().records()[0];
    assert_eq!(t1.name(), Some("T1"));
    assert_eq!(t1.get("ra"), Some("10.0"));
    assert_eq!(t1.get("dec"), Some("20.0"));
    assert_eq!(t1.get("source_file"), Some("a.csv"));

    let text = fs::read_to_string(&ws.master).unwrap();
    insta::assert_snapshot!(text.trim_end(), @r"
    name,ra,dec,magnitude,v_mag,b_mag,r_mag,g_mag,i_mag,epoch,source_file,updated_at
    T1,10.0,20.0,,,,,,,,a.csv,2024-01-01T00:00:00Z
    T2,30.5,-5.25,9.8,,,,,,J2000,c.csv,2024-01-03T00:00:00Z
    ");
}

#[test]
fn missing_dec_fails_without_touching_master() {
    let mut merger = default_merger();
    merger
        .merge(&table(&["name", "ra", "dec"], &[&["T0", "1", "2"]]), "ok.csv")
        .unwrap();

    let bad = table(&["Name", "RA", "Dec_deg"], &[&["T1", "10.0", "20.0"]]);
    let err = merger.merge(&bad, "bad.csv").unwrap_err();
    match err {
        Error::SchemaValidation(e) => {
            assert_eq!(e.missing_fields, ["dec"]);
            assert_eq!(e.resolved_columns, ["name", "ra", "dec_deg"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(merger.master().len(), 1);
}

#[test]
fn padded_and_mixed_case_headers_resolve() {
    let schema = CanonicalSchema::from_specs(vec![
        FieldSpec::new("name", &[]),
        FieldSpec::new("ra", &["RA", "Right Ascension"]),
        FieldSpec::new("dec", &["Declination"]),
    ])
    .unwrap();
    let lookup = build_lookup(&schema, None).unwrap();
    assert_eq!(lookup.get("  ra  "), Some("ra"));
    assert_eq!(lookup.get("DEClination"), Some("dec"));

    let merger = TargetMerger::new(schema, lookup);
    let batch = merger
        .standardize(&table(&["NAME", "  ra  ", "DEClination"], &[&["T1", "1", "2"]]))
        .unwrap();
    assert_eq!(batch.columns(), ["name", "ra", "dec", "magnitude"]);
}

#[test]
fn persisted_rows_win_over_later_runs() {
    let ws = setup_workspace();

    let mut first = open_merger(&ws.master);
    assert_eq!(first.state(), MergerState::Loaded);
    first
        .merge_at(&table(&["name", "ra", "dec"], &[&["T1", "1.0", "2.0"]]), "run1.csv", jan(1))
        .unwrap();
    first.deduplicate_and_save(&ws.master).unwrap();

    let mut second = open_merger(&ws.master);
    assert_eq!(second.master().len(), 1);
    assert_eq!(second.master().records()[0].updated_at, Some(jan(1)));
    second
        .merge_at(
            &table(&["name", "ra", "dec"], &[&["T1", "9.0", "9.0"], &["T2", "3.0", "4.0"]]),
            "run2.csv",
            jan(2),
        )
        .unwrap();
    second.deduplicate_and_save(&ws.master).unwrap();

    let reloaded = open_merger(&ws.master);
    let rows: Vec<_> = reloaded
        .master()
        .records()
        .iter()
        .map(|r| (r.name().unwrap(), r.get("ra").unwrap(), r.get("source_file").unwrap()))
        .collect();
    assert_eq!(rows, [("T1", "1.0", "run1.csv"), ("T2", "3.0", "run2.csv")]);
}

#[test]
fn overrides_redirect_columns_during_merge() {
    let schema = CanonicalSchema::default();
    let mut overrides = target_merge::lookup::Overrides::new();
    overrides.insert("OBJ".into(), "name".into());
    overrides.insert("Mag".into(), "v_mag".into());
    let lookup = build_lookup(&schema, Some(&overrides)).unwrap();
    let mut merger = TargetMerger::new(schema, lookup);

    merger
        .merge(
            &table(&["obj", "ra", "dec", "MAG"], &[&["Sirius", "101.3", "-16.7", "-1.46"]]),
            "bright.csv",
        )
        .unwrap();
    let row = &merger.master().records()[0];
    assert_eq!(row.name(), Some("Sirius"));
    assert_eq!(row.get("v_mag"), Some("-1.46"));
    assert_eq!(row.get("magnitude"), None);
}
