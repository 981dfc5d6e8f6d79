//! Pivot step: aggregate a source sheet into a pivot table, either as a new
//! sheet or overwriting a previous pivot's destination.
//!
//! Editing a pivot reuses the original step's id, so the old pivot step is
//! skipped from the history; the edits users made on top of the old pivot
//! are collected at saturation time and replayed optimistically on the
//! regenerated table, stopping at the first edit that no longer applies.

use polars::lazy::frame::pivot::pivot_stable;
use polars::prelude::*;

use crate::chunks::{ChunkKind, CodeChunk};
use crate::codegen::first_unused_df_name;
use crate::errors::{StepError, StepResult};
use crate::params::{ColumnEdit, PivotAggregation, PivotParams, StepParams};
use crate::state::{DfSource, OverwriteSheetIndex, State};
use crate::step::{invariant_mismatch, modified_sheet_indexes, ExecutionData, Step};

use super::{apply_column_edit, chunk_kind_for_edit};

/// Collects the edits to replay on top of an overwritten pivot: the edits
/// that already survived the previous regeneration, plus any column edits
/// recorded since.
pub fn saturate(
    prev_state: &State,
    mut params: PivotParams,
    previous_steps: &[Step],
) -> StepResult<PivotParams> {
    let Some(destination) = params.destination_sheet_index else {
        return Ok(params);
    };
    // destination == dfs.len() is the replay case where the overwritten
    // pivot is excluded from the chain and the sheet is recreated fresh.
    if destination > prev_state.dfs.len() {
        return Err(StepError::NoSheet(destination));
    }

    let mut edits: Vec<ColumnEdit> = Vec::new();
    let mut starting_index = None;
    for (index, step) in previous_steps.iter().enumerate().rev() {
        match &step.params {
            StepParams::Pivot(earlier)
                if earlier.destination_sheet_index == Some(destination) =>
            {
                if let ExecutionData::Pivot { replayed_edits, .. } = &step.execution_data {
                    edits = replayed_edits.clone();
                }
                starting_index = Some(index);
                break;
            }
            StepParams::Pivot(_) if step.post_state.dfs.len() == destination + 1 => {
                starting_index = Some(index);
                break;
            }
            _ => {}
        }
    }

    if let Some(starting_index) = starting_index {
        for step in &previous_steps[starting_index + 1..] {
            if matches!(step.params, StepParams::Pivot(_)) {
                continue;
            }
            if !modified_sheet_indexes(&step.params).is_exactly(destination) {
                continue;
            }
            if let Some(edit) = column_edit_from_params(&step.params) {
                edits.push(edit);
            }
        }
    }

    params.edits_to_replay = edits;
    Ok(params)
}

fn column_edit_from_params(params: &StepParams) -> Option<ColumnEdit> {
    match params {
        StepParams::RenameColumn(p) if !p.new_column_header.is_empty() => {
            Some(ColumnEdit::RenameColumn {
                column_id: p.column_id.clone(),
                new_column_header: p.new_column_header.clone(),
            })
        }
        StepParams::DeleteColumns(p) => Some(ColumnEdit::DeleteColumns {
            column_ids: p.column_ids.clone(),
        }),
        StepParams::ReorderColumn(p) => Some(ColumnEdit::ReorderColumn {
            column_id: p.column_id.clone(),
            new_column_index: p.new_column_index,
        }),
        StepParams::Sort(p) => Some(ColumnEdit::Sort {
            column_id: p.column_id.clone(),
            sort_direction: p.sort_direction,
        }),
        StepParams::FilterColumn(p) => Some(ColumnEdit::FilterColumn {
            column_id: p.column_id.clone(),
            operator: p.operator,
            filters: p.filters.clone(),
        }),
        _ => None,
    }
}

pub fn execute(prev_state: &State, params: &PivotParams) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    // A destination equal to the sheet count appears when the overwritten
    // pivot is skipped from the execution chain: the regenerated pivot then
    // creates its sheet fresh at the same index.
    if let Some(destination) = params.destination_sheet_index {
        if destination > prev_state.dfs.len() {
            return Err(StepError::NoSheet(destination));
        }
    }
    if params.pivot_rows_column_ids.is_empty() && params.pivot_columns_column_ids.is_empty() {
        return Err(StepError::InvalidParameter(
            "a pivot needs at least one row or column".to_string(),
        ));
    }

    let df_name = &prev_state.df_names[params.sheet_index];
    let resolve = |ids: &[String]| -> StepResult<Vec<String>> {
        ids.iter()
            .map(|id| {
                prev_state
                    .column_ids
                    .header_or_err(params.sheet_index, id, df_name)
            })
            .collect()
    };
    let rows = resolve(&params.pivot_rows_column_ids)?;
    let columns = resolve(&params.pivot_columns_column_ids)?;
    let value = prev_state.column_ids.header_or_err(
        params.sheet_index,
        &params.value_column_id,
        df_name,
    )?;

    let pivoted = pivot_dataframe(
        &prev_state.dfs[params.sheet_index],
        &rows,
        &columns,
        &value,
        params.aggregation,
    )?;

    let overwrite_index = params
        .destination_sheet_index
        .filter(|&destination| destination < prev_state.dfs.len());
    let new_df_name = match overwrite_index {
        None => first_unused_df_name(&prev_state.df_names, &format!("{}_pivot", df_name)),
        Some(destination) => prev_state.df_names[destination].clone(),
    };

    let mut post_state = prev_state.clone();
    let destination = post_state.add_df_to_state(
        pivoted,
        DfSource::Pivoted,
        Some(new_df_name.clone()),
        None,
        overwrite_index.map(|sheet_index_to_overwrite| OverwriteSheetIndex {
            sheet_index_to_overwrite,
            attempt_to_save_filter_metadata: true,
        }),
    );

    // Replay the surviving edits on the regenerated table. Later edits may
    // assume earlier ones succeeded, so the first failure stops the replay.
    let mut replayed_edits = Vec::new();
    let mut optional_lines = Vec::new();
    let mut optional_imports = Vec::new();
    for edit in &params.edits_to_replay {
        let before_edit = post_state.clone();
        if apply_column_edit(&mut post_state, destination, edit).is_err() {
            post_state = before_edit;
            break;
        }
        let chunk = CodeChunk::new(before_edit, chunk_kind_for_edit(destination, edit));
        match chunk.code() {
            Ok((lines, imports)) => {
                optional_lines.push(String::new());
                optional_lines.push(format!("# {}", chunk.description_comment()));
                optional_lines.extend(lines);
                optional_imports.extend(imports);
                replayed_edits.push(edit.clone());
            }
            Err(_) => break,
        }
    }

    Ok((
        post_state,
        ExecutionData::Pivot {
            new_df_name,
            replayed_edits,
            optional_code: (optional_lines, optional_imports),
        },
    ))
}

pub fn transpile(
    prev_state: &State,
    params: &PivotParams,
    execution_data: &ExecutionData,
) -> StepResult<Vec<CodeChunk>> {
    let ExecutionData::Pivot {
        new_df_name,
        optional_code,
        ..
    } = execution_data
    else {
        return Err(invariant_mismatch("pivot"));
    };
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::Pivot {
            sheet_index: params.sheet_index,
            destination_sheet_index: params.destination_sheet_index,
            pivot_rows_column_ids: params.pivot_rows_column_ids.clone(),
            pivot_columns_column_ids: params.pivot_columns_column_ids.clone(),
            value_column_id: params.value_column_id.clone(),
            aggregation: params.aggregation,
            flatten_column_headers: params.flatten_column_headers,
            new_df_name: new_df_name.clone(),
        },
    )
    .with_optional_code(optional_code.clone())])
}

/// Runs the pivot natively. With pivot columns this is a real polars pivot;
/// without them it degrades to a stable group-by aggregation.
fn pivot_dataframe(
    df: &DataFrame,
    rows: &[String],
    columns: &[String],
    value: &str,
    aggregation: PivotAggregation,
) -> StepResult<DataFrame> {
    if columns.is_empty() {
        let keys: Vec<Expr> = rows.iter().map(|r| col(r.as_str())).collect();
        let aggregated = df
            .clone()
            .lazy()
            .group_by_stable(keys)
            .agg([apply_aggregation(col(value), aggregation)])
            .collect()?;
        return Ok(aggregated);
    }
    let on: Vec<&str> = columns.iter().map(String::as_str).collect();
    let index: Option<Vec<&str>> = if rows.is_empty() {
        None
    } else {
        Some(rows.iter().map(String::as_str).collect())
    };
    // pivot_stable everywhere: the unstable pivot may fall back with a
    // message on stdout, and column order must be deterministic for
    // generated code anyway.
    let pivoted = pivot_stable(
        df,
        on,
        index,
        Some([value]),
        true,
        Some(pivot_agg_expr(aggregation)),
        None,
    )?;
    Ok(pivoted)
}

fn apply_aggregation(expr: Expr, aggregation: PivotAggregation) -> Expr {
    match aggregation {
        PivotAggregation::Count => expr.len(),
        PivotAggregation::Sum => expr.sum(),
        PivotAggregation::Mean => expr.mean(),
        PivotAggregation::Median => expr.median(),
        PivotAggregation::Min => expr.min(),
        PivotAggregation::Max => expr.max(),
        PivotAggregation::Std => expr.std(1),
        PivotAggregation::First => expr.first(),
        PivotAggregation::Last => expr.last(),
    }
}

fn pivot_agg_expr(aggregation: PivotAggregation) -> Expr {
    apply_aggregation(col(PlSmallStr::from_static("")), aggregation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn long_state() -> State {
        let df = df!(
            "id" => ["a", "a", "b", "b"],
            "key" => ["x", "y", "x", "y"],
            "value" => [1i64, 2, 3, 4]
        )
        .unwrap();
        State::new(vec![df], None)
    }

    fn pivot_params() -> PivotParams {
        PivotParams {
            sheet_index: 0,
            destination_sheet_index: None,
            pivot_rows_column_ids: vec!["id".to_string()],
            pivot_columns_column_ids: vec!["key".to_string()],
            value_column_id: "value".to_string(),
            aggregation: PivotAggregation::Sum,
            flatten_column_headers: true,
            edits_to_replay: Vec::new(),
        }
    }

    #[test]
    fn test_pivot_creates_new_sheet() {
        let prev = long_state();
        let (post, execution_data) = execute(&prev, &pivot_params()).unwrap();
        assert_eq!(post.dfs.len(), 2);
        assert_eq!(post.df_names[1], "df1_pivot");
        assert_eq!(post.df_sources[1], DfSource::Pivoted);
        let names: Vec<String> = post.dfs[1]
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert!(names.contains(&"id".to_string()));
        assert!(names.contains(&"x".to_string()));
        assert!(names.contains(&"y".to_string()));
        match execution_data {
            ExecutionData::Pivot { new_df_name, .. } => {
                assert_eq!(new_df_name, "df1_pivot")
            }
            other => panic!("unexpected execution data {:?}", other),
        }
    }

    #[test]
    fn test_pivot_without_columns_group_by() {
        let prev = long_state();
        let mut params = pivot_params();
        params.pivot_columns_column_ids.clear();
        let (post, _) = execute(&prev, &params).unwrap();
        assert_eq!(post.dfs[1].height(), 2);
        assert_eq!(post.dfs[1].width(), 2);
    }

    #[test]
    fn test_pivot_needs_rows_or_columns() {
        let prev = long_state();
        let mut params = pivot_params();
        params.pivot_rows_column_ids.clear();
        params.pivot_columns_column_ids.clear();
        let err = execute(&prev, &params).unwrap_err();
        assert!(matches!(err, StepError::InvalidParameter(_)));
    }

    #[test]
    fn test_pivot_overwrite_replays_surviving_edits() {
        let prev = long_state();
        let (with_pivot, _) = execute(&prev, &pivot_params()).unwrap();

        // Edits made on top of the pivot: rename x -> total_x, then one
        // referencing a column the regenerated pivot will not have.
        let mut params = pivot_params();
        params.destination_sheet_index = Some(1);
        params.edits_to_replay = vec![
            ColumnEdit::RenameColumn {
                column_id: "x".to_string(),
                new_column_header: "total_x".to_string(),
            },
            ColumnEdit::DeleteColumns {
                column_ids: vec!["ghost".to_string()],
            },
            ColumnEdit::RenameColumn {
                column_id: "y".to_string(),
                new_column_header: "total_y".to_string(),
            },
        ];
        let (post, execution_data) = execute(&with_pivot, &params).unwrap();

        // Replay applied the first rename and stopped at the failing delete;
        // the rename after the failure was not attempted.
        assert!(post.column_ids.has_column_id(1, "x"));
        assert_eq!(post.column_ids.get_header_by_id(1, "x"), Some("total_x"));
        assert_eq!(post.column_ids.get_header_by_id(1, "y"), Some("y"));
        match execution_data {
            ExecutionData::Pivot {
                replayed_edits,
                optional_code,
                ..
            } => {
                assert_eq!(replayed_edits.len(), 1);
                let (lines, _) = optional_code;
                assert!(lines
                    .iter()
                    .any(|l| l.contains("rename") && l.contains("total_x")));
                assert!(!lines.iter().any(|l| l.contains("total_y")));
            }
            other => panic!("unexpected execution data {:?}", other),
        }
    }

    #[test]
    fn test_saturate_collects_edits_since_creation() {
        use crate::params::{RenameColumnParams, SortDirection, SortParams};
        use std::time::Duration;

        let prev = long_state();
        let (with_pivot, pivot_execution) = execute(&prev, &pivot_params()).unwrap();
        let pivot_step = Step {
            step_id: "pivot-1".to_string(),
            params: StepParams::Pivot(pivot_params()),
            prev_state: prev.clone(),
            post_state: with_pivot.clone(),
            execution_data: pivot_execution,
            processing_time: Duration::ZERO,
        };

        let rename_params = RenameColumnParams {
            sheet_index: 1,
            column_id: "x".to_string(),
            new_column_header: "total_x".to_string(),
        };
        let (after_rename, rename_execution) =
            super::super::column_steps::execute_rename(&with_pivot, &rename_params).unwrap();
        let rename_step = Step {
            step_id: "rename-1".to_string(),
            params: StepParams::RenameColumn(rename_params),
            prev_state: with_pivot.clone(),
            post_state: after_rename.clone(),
            execution_data: rename_execution,
            processing_time: Duration::ZERO,
        };

        // A sort on the source sheet must not be collected.
        let sort_step = Step {
            step_id: "sort-1".to_string(),
            params: StepParams::Sort(SortParams {
                sheet_index: 0,
                column_id: "id".to_string(),
                sort_direction: SortDirection::Ascending,
            }),
            prev_state: after_rename.clone(),
            post_state: after_rename.clone(),
            execution_data: ExecutionData::None,
            processing_time: Duration::ZERO,
        };

        let mut edited = pivot_params();
        edited.destination_sheet_index = Some(1);
        let saturated = saturate(
            &after_rename,
            edited,
            &[pivot_step, rename_step, sort_step],
        )
        .unwrap();
        assert_eq!(
            saturated.edits_to_replay,
            vec![ColumnEdit::RenameColumn {
                column_id: "x".to_string(),
                new_column_header: "total_x".to_string(),
            }]
        );
    }

    #[test]
    fn test_transpile_includes_optional_code() {
        let prev = long_state();
        let params = pivot_params();
        let (_, mut execution_data) = execute(&prev, &params).unwrap();
        if let ExecutionData::Pivot { optional_code, .. } = &mut execution_data {
            optional_code.0.push("# replayed".to_string());
        }
        let chunks = transpile(&prev, &params, &execution_data).unwrap();
        let (optional_lines, _) = chunks[0].optional_code_that_successfully_executed();
        assert_eq!(optional_lines, &vec!["# replayed".to_string()]);

        let (lines, imports) = chunks[0].code().unwrap();
        assert!(lines.iter().any(|l| l.contains("pivot_table")));
        assert_eq!(imports, vec!["import pandas as pd".to_string()]);
    }
}
