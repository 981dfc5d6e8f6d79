//! Editing a pivot reuses the original step id: the old pivot step and the
//! edits made on top of it are skipped, and the surviving edits replay
//! optimistically on the regenerated table.

use gridscript::params::{
    PivotAggregation, PivotParams, RenameColumnParams, StepParams,
};
use gridscript::step::skipped_step_indexes;

mod common;
use common::{empty_manager, import_params, write_csv};

fn pivot_params(destination: Option<usize>, aggregation: PivotAggregation) -> StepParams {
    StepParams::Pivot(PivotParams {
        sheet_index: 0,
        destination_sheet_index: destination,
        pivot_rows_column_ids: vec!["id".to_string()],
        pivot_columns_column_ids: vec!["key".to_string()],
        value_column_id: "value".to_string(),
        aggregation,
        flatten_column_headers: false,
        edits_to_replay: Vec::new(),
    })
}

#[test]
fn test_pivot_edit_replays_rename_and_skips_old_steps() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_csv(
        &dir,
        "long.csv",
        "id,key,value\na,x,1\na,y,2\nb,x,3\nb,y,4\n",
    );

    let mut manager = empty_manager();
    manager
        .execute_new_step("import", import_params(&[&file]))
        .unwrap();
    manager
        .execute_new_step("pivot-1", pivot_params(None, PivotAggregation::Sum))
        .unwrap();
    assert_eq!(manager.curr_state().df_names[1], "long_pivot");

    manager
        .execute_new_step(
            "rename",
            StepParams::RenameColumn(RenameColumnParams {
                sheet_index: 1,
                column_id: "x".to_string(),
                new_column_header: "total_x".to_string(),
            }),
        )
        .unwrap();

    // Edit the pivot: same step id, destination points at the pivot sheet.
    manager
        .execute_new_step("pivot-1", pivot_params(Some(1), PivotAggregation::Mean))
        .unwrap();

    // The old pivot and the rename are skipped; their effect lives inside
    // the new pivot step.
    assert_eq!(manager.all_steps().len(), 4);
    let skipped = skipped_step_indexes(manager.active_steps());
    assert!(skipped.contains(&1));
    assert!(skipped.contains(&2));

    // The rename survived the regeneration.
    assert_eq!(
        manager.curr_state().column_ids.get_header_by_id(1, "x"),
        Some("total_x")
    );

    // One pivot in the script, with the rename as replayed optional code.
    let script = manager.transpiled_code().to_script();
    assert_eq!(script.matches("pivot_table = ").count(), 1);
    assert!(script.contains("aggfunc='mean'"));
    assert!(!script.contains("aggfunc='sum'"));
    assert!(script.contains("total_x"));
}

#[test]
fn test_undo_of_pivot_edit_restores_old_pivot() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_csv(
        &dir,
        "long.csv",
        "id,key,value\na,x,1\na,y,2\nb,x,3\nb,y,4\n",
    );

    let mut manager = empty_manager();
    manager
        .execute_new_step("import", import_params(&[&file]))
        .unwrap();
    manager
        .execute_new_step("pivot-1", pivot_params(None, PivotAggregation::Sum))
        .unwrap();
    manager
        .execute_new_step("pivot-1", pivot_params(Some(1), PivotAggregation::Mean))
        .unwrap();
    assert!(manager
        .transpiled_code()
        .to_script()
        .contains("aggfunc='mean'"));

    // Undoing the edit brings the original pivot back, both in data and in
    // the generated code.
    manager.undo().unwrap();
    let script = manager.transpiled_code().to_script();
    assert!(script.contains("aggfunc='sum'"));
    assert!(!script.contains("aggfunc='mean'"));
    assert_eq!(manager.curr_state().dfs.len(), 2);
}

#[test]
fn test_second_pivot_edit_carries_earlier_replayed_edits() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_csv(
        &dir,
        "long.csv",
        "id,key,value\na,x,1\na,y,2\nb,x,3\nb,y,4\n",
    );

    let mut manager = empty_manager();
    manager
        .execute_new_step("import", import_params(&[&file]))
        .unwrap();
    manager
        .execute_new_step("pivot-1", pivot_params(None, PivotAggregation::Sum))
        .unwrap();
    manager
        .execute_new_step(
            "rename",
            StepParams::RenameColumn(RenameColumnParams {
                sheet_index: 1,
                column_id: "x".to_string(),
                new_column_header: "total_x".to_string(),
            }),
        )
        .unwrap();
    manager
        .execute_new_step("pivot-1", pivot_params(Some(1), PivotAggregation::Mean))
        .unwrap();
    // A second edit of the same pivot still replays the rename collected by
    // the first edit.
    manager
        .execute_new_step("pivot-1", pivot_params(Some(1), PivotAggregation::Max))
        .unwrap();

    assert_eq!(
        manager.curr_state().column_ids.get_header_by_id(1, "x"),
        Some("total_x")
    );
    let script = manager.transpiled_code().to_script();
    assert_eq!(script.matches("pivot_table = ").count(), 1);
    assert!(script.contains("aggfunc='max'"));
    assert!(script.contains("total_x"));
}
