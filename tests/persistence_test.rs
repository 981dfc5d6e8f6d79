//! Saving a step history and replaying it onto a fresh session reproduces
//! the same generated script.

use gridscript::params::{RenameColumnParams, SortDirection, SortParams, StepParams};
use gridscript::persistence::AnalysisStore;

mod common;
use common::{empty_manager, import_params, write_csv};

#[test]
fn test_saved_analysis_replays_to_identical_script() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_csv(&dir, "people.csv", "name,age\nann,30\nbob,20\n");
    let store = AnalysisStore::with_dir(dir.path().join("analyses"));

    let mut manager = empty_manager();
    manager
        .execute_new_step("import", import_params(&[&file]))
        .unwrap();
    manager
        .execute_new_step(
            "rename",
            StepParams::RenameColumn(RenameColumnParams {
                sheet_index: 0,
                column_id: "age".to_string(),
                new_column_header: "years".to_string(),
            }),
        )
        .unwrap();
    manager
        .execute_new_step(
            "sort",
            StepParams::Sort(SortParams {
                sheet_index: 0,
                column_id: "age".to_string(),
                sort_direction: SortDirection::Descending,
            }),
        )
        .unwrap();

    store.save(&manager, "people analysis").unwrap();

    let loaded = store.load("people analysis").unwrap();
    let mut replayed = empty_manager();
    loaded.replay_onto(&mut replayed).unwrap();

    assert_eq!(replayed.transpiled_code(), manager.transpiled_code());
    assert_eq!(
        replayed.curr_state().column_ids.get_header_by_id(0, "age"),
        Some("years")
    );
}
