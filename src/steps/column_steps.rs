//! Column-level steps: add, delete, rename, reorder.

use polars::prelude::*;

use crate::chunks::{ChunkKind, CodeChunk};
use crate::column_ids::column_id_for_header;
use crate::errors::{StepError, StepResult};
use crate::params::{
    AddColumnParams, DeleteColumnsParams, RenameColumnParams, ReorderColumnParams,
};
use crate::state::State;
use crate::step::{invariant_mismatch, ExecutionData};

use super::{delete_df_columns, rename_df_column, reorder_df_column};

pub fn execute_add(
    prev_state: &State,
    params: &AddColumnParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    if prev_state
        .column_ids
        .get_id_by_header(params.sheet_index, &params.column_header)
        .is_some()
    {
        return Err(StepError::ColumnExists(params.column_header.clone()));
    }

    let width = prev_state.dfs[params.sheet_index].width() as i64;
    let column_header_index =
        if params.column_header_index < 0 || params.column_header_index >= width {
            -1
        } else {
            params.column_header_index
        };

    let mut post_state = prev_state.clone();
    let mut df = post_state.dfs[params.sheet_index].clone();
    let series = Series::new(
        params.column_header.as_str().into(),
        vec![0i64; df.height()],
    );
    if column_header_index == -1 {
        df.with_column(series)?;
    } else {
        df.insert_column(column_header_index as usize, series)?;
    }
    post_state.dfs[params.sheet_index] = df;
    post_state.add_columns_to_state(params.sheet_index, &[params.column_header.clone()]);

    let new_column_id = column_id_for_header(&params.column_header);
    Ok((
        post_state,
        ExecutionData::AddColumn {
            column_header_index,
            new_column_id,
        },
    ))
}

pub fn transpile_add(
    prev_state: &State,
    params: &AddColumnParams,
    execution_data: &ExecutionData,
) -> StepResult<Vec<CodeChunk>> {
    let ExecutionData::AddColumn {
        column_header_index,
        new_column_id,
    } = execution_data
    else {
        return Err(invariant_mismatch("add_column"));
    };
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::AddColumn {
            sheet_index: params.sheet_index,
            column_header: params.column_header.clone(),
            column_header_index: *column_header_index,
            new_column_id: new_column_id.clone(),
        },
    )])
}

pub fn execute_delete(
    prev_state: &State,
    params: &DeleteColumnsParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    let mut post_state = prev_state.clone();
    delete_df_columns(&mut post_state, params.sheet_index, &params.column_ids)?;
    Ok((post_state, ExecutionData::None))
}

pub fn transpile_delete(
    prev_state: &State,
    params: &DeleteColumnsParams,
) -> StepResult<Vec<CodeChunk>> {
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::DeleteColumns {
            sheet_index: params.sheet_index,
            column_ids: params.column_ids.clone(),
        },
    )])
}

pub fn execute_rename(
    prev_state: &State,
    params: &RenameColumnParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    let df_name = prev_state.df_names[params.sheet_index].clone();
    prev_state
        .column_ids
        .header_or_err(params.sheet_index, &params.column_id, &df_name)?;

    // Renaming to the empty string is recorded but changes nothing, so the
    // history stays consistent with what the user did in the UI.
    if params.new_column_header.is_empty() {
        let post_state = prev_state.clone();
        return Ok((
            post_state,
            ExecutionData::RenameColumn {
                renames: vec![(params.column_id.clone(), String::new())],
            },
        ));
    }

    let mut post_state = prev_state.clone();
    rename_df_column(
        &mut post_state,
        params.sheet_index,
        &params.column_id,
        &params.new_column_header,
    )?;
    Ok((
        post_state,
        ExecutionData::RenameColumn {
            renames: vec![(params.column_id.clone(), params.new_column_header.clone())],
        },
    ))
}

pub fn transpile_rename(
    prev_state: &State,
    params: &RenameColumnParams,
    execution_data: &ExecutionData,
) -> StepResult<Vec<CodeChunk>> {
    if params.new_column_header.is_empty() {
        return Ok(vec![CodeChunk::new(prev_state.clone(), ChunkKind::NoOp)]);
    }
    let ExecutionData::RenameColumn { renames } = execution_data else {
        return Err(invariant_mismatch("rename_column"));
    };
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::RenameColumns {
            sheet_index: params.sheet_index,
            renames: renames.clone(),
        },
    )])
}

pub fn execute_reorder(
    prev_state: &State,
    params: &ReorderColumnParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    let mut post_state = prev_state.clone();
    reorder_df_column(
        &mut post_state,
        params.sheet_index,
        &params.column_id,
        params.new_column_index,
    )?;
    Ok((post_state, ExecutionData::None))
}

pub fn transpile_reorder(
    prev_state: &State,
    params: &ReorderColumnParams,
) -> StepResult<Vec<CodeChunk>> {
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::ReorderColumn {
            sheet_index: params.sheet_index,
            column_id: params.column_id.clone(),
            new_column_index: params.new_column_index,
        },
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn base_state() -> State {
        let df = df!("a" => [1, 2], "b" => [3, 4]).unwrap();
        State::new(vec![df], None)
    }

    #[test]
    fn test_add_column_appends_zeros() {
        let prev = base_state();
        let params = AddColumnParams {
            sheet_index: 0,
            column_header: "c".to_string(),
            column_header_index: 99,
        };
        let (post, execution_data) = execute_add(&prev, &params).unwrap();
        assert_eq!(post.dfs[0].width(), 3);
        assert_eq!(
            post.dfs[0].column("c").unwrap().get(0).unwrap(),
            AnyValue::Int64(0)
        );
        // Out-of-range index clamps to append.
        assert!(matches!(
            execution_data,
            ExecutionData::AddColumn {
                column_header_index: -1,
                ..
            }
        ));
        // prev untouched.
        assert_eq!(prev.dfs[0].width(), 2);
    }

    #[test]
    fn test_add_column_at_index_inserts() {
        let prev = base_state();
        let params = AddColumnParams {
            sheet_index: 0,
            column_header: "c".to_string(),
            column_header_index: 0,
        };
        let (post, _) = execute_add(&prev, &params).unwrap();
        let names: Vec<String> = post.dfs[0]
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_add_duplicate_header_fails() {
        let prev = base_state();
        let params = AddColumnParams {
            sheet_index: 0,
            column_header: "a".to_string(),
            column_header_index: -1,
        };
        let err = execute_add(&prev, &params).unwrap_err();
        assert!(matches!(err, StepError::ColumnExists(_)));
    }

    #[test]
    fn test_rename_to_existing_fails_without_state_change() {
        let prev = base_state();
        let params = RenameColumnParams {
            sheet_index: 0,
            column_id: "a".to_string(),
            new_column_header: "b".to_string(),
        };
        let err = execute_rename(&prev, &params).unwrap_err();
        assert!(matches!(err, StepError::ColumnExists(_)));
        assert_eq!(prev.column_ids.get_header_by_id(0, "a"), Some("a"));
    }

    #[test]
    fn test_rename_to_empty_records_but_changes_nothing() {
        let prev = base_state();
        let params = RenameColumnParams {
            sheet_index: 0,
            column_id: "a".to_string(),
            new_column_header: String::new(),
        };
        let (post, _) = execute_rename(&prev, &params).unwrap();
        assert_eq!(post.column_ids.get_header_by_id(0, "a"), Some("a"));

        let chunks = transpile_rename(&prev, &params, &ExecutionData::None).unwrap();
        assert_eq!(chunks.len(), 1);
        let (lines, imports) = chunks[0].code().unwrap();
        assert!(lines.is_empty());
        assert!(imports.is_empty());
    }

    #[test]
    fn test_delete_columns_updates_df_and_metadata() {
        let prev = base_state();
        let params = DeleteColumnsParams {
            sheet_index: 0,
            column_ids: vec!["a".to_string()],
        };
        let (post, _) = execute_delete(&prev, &params).unwrap();
        assert_eq!(post.dfs[0].width(), 1);
        assert!(!post.column_ids.has_column_id(0, "a"));
        assert!(!post.column_filters[0].contains_key("a"));
    }

    #[test]
    fn test_delete_unknown_column_fails() {
        let prev = base_state();
        let params = DeleteColumnsParams {
            sheet_index: 0,
            column_ids: vec!["ghost".to_string()],
        };
        let err = execute_delete(&prev, &params).unwrap_err();
        assert!(matches!(err, StepError::NoColumn { .. }));
    }

    #[test]
    fn test_reorder_moves_column() {
        let prev = base_state();
        let params = ReorderColumnParams {
            sheet_index: 0,
            column_id: "b".to_string(),
            new_column_index: 0,
        };
        let (post, _) = execute_reorder(&prev, &params).unwrap();
        let names: Vec<String> = post.dfs[0]
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["b", "a"]);

        let chunks = transpile_reorder(&prev, &params).unwrap();
        let (lines, _) = chunks[0].code().unwrap();
        assert_eq!(lines, vec!["df1 = df1[['b', 'a']]"]);
    }
}
