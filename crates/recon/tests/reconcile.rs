//! End-to-end reconciliation: produce judgements against a local candidate
//! table, persist them, and join them back into the grid.

use std::sync::atomic::AtomicBool;

use gridworks_changes::{
    join_rows, run_production, ChangeData, ChangeDataWriter, JsonChangeDataSerializer,
};
use gridworks_model::{Cell, ColumnModel, Grid, Judgment, Recon, Row};
use gridworks_recon::{LocalCandidateService, ReconProducer, StandardReconConfig};

const TABLE: &str = "\
id,name,type,type_name
Q7259,Ada Lovelace,Q5,human
Q7251,Alan Turing,Q5,human
Q42,Douglas Adams,Q5,human
";

fn people_grid() -> Grid {
    let columns = ColumnModel::from_names(&["name", "born"]);
    Grid::new(
        columns,
        vec![
            Row::new(vec![Cell::text("Ada Lovelace"), Cell::text("1815")]),
            Row::new(vec![Cell::blank(), Cell::text("?")]),
            Row::new(vec![Cell::text("alan turing"), Cell::text("1912")]),
            Row::new(vec![Cell::text("Nobody Inparticular")]),
        ],
    )
}

fn config() -> StandardReconConfig {
    StandardReconConfig {
        service: "local".into(),
        column_name: "name".into(),
        type_id: Some("Q5".into()),
        type_name: Some("human".into()),
        auto_match: true,
        column_details: vec![],
        limit: 0,
    }
}

#[test]
fn reconcile_persist_and_join() {
    let grid = people_grid();
    let service = LocalCandidateService::from_csv_reader(TABLE.as_bytes()).unwrap();
    let producer = ReconProducer::new(config(), service, grid.columns()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recon.changes");
    let serializer = JsonChangeDataSerializer::<Recon>::new();
    let mut writer = ChangeDataWriter::create(&path, grid.version()).unwrap();
    let report = run_production(
        &grid,
        &producer,
        &serializer,
        &mut writer,
        &AtomicBool::new(false),
    )
    .unwrap();
    drop(writer);
    assert!(report.is_complete());

    let data = ChangeData::load(&path, &serializer).unwrap();
    assert_eq!(data.len(), 4);

    let joined = join_rows(&grid, &data, |_, row, recon: &Recon| {
        row.with_cell(0, Cell::with_recon(row.value(0).clone(), recon.clone()))
    })
    .unwrap();

    // exact name, case-insensitive, auto-matched
    let ada = joined.row(0).unwrap().cell(0).unwrap().recon.as_ref().unwrap();
    assert_eq!(ada.judgment, Judgment::Matched);
    assert_eq!(ada.matched.as_ref().unwrap().id, "Q7259");
    assert!(ada.features.name_match);
    assert!(ada.features.type_match);

    // blank cell never queried the service
    let blank = joined.row(1).unwrap().cell(0).unwrap().recon.as_ref().unwrap();
    assert!(blank.candidates.is_empty());
    assert_eq!(blank.judgment, Judgment::None);

    let alan = joined.row(2).unwrap().cell(0).unwrap().recon.as_ref().unwrap();
    assert_eq!(alan.matched.as_ref().unwrap().id, "Q7251");

    // no candidate table entry matches, so no judgement either
    let nobody = joined.row(3).unwrap().cell(0).unwrap().recon.as_ref().unwrap();
    assert!(nobody.matched.is_none());
    assert_eq!(nobody.judgment, Judgment::None);
}
