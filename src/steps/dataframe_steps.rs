//! Whole-sheet steps: delete, rename, duplicate.

use crate::chunks::{ChunkKind, CodeChunk};
use crate::codegen::{first_unused_df_name, make_valid_df_name};
use crate::errors::StepResult;
use crate::params::{
    DataframeDeleteParams, DataframeDuplicateParams, DataframeRenameParams,
};
use crate::state::{DfSource, State};
use crate::step::{invariant_mismatch, ExecutionData};

/// Captures the name of the sheet about to be deleted, so the transpiled
/// chunk can describe it after the sheet is gone.
pub fn saturate_delete(
    prev_state: &State,
    mut params: DataframeDeleteParams,
) -> StepResult<DataframeDeleteParams> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    params.old_dataframe_name = Some(prev_state.df_names[params.sheet_index].clone());
    Ok(params)
}

pub fn execute_delete(
    prev_state: &State,
    params: &DataframeDeleteParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    let mut post_state = prev_state.clone();
    post_state.delete_dataframe_from_state(params.sheet_index);
    Ok((post_state, ExecutionData::None))
}

pub fn transpile_delete(
    prev_state: &State,
    params: &DataframeDeleteParams,
) -> StepResult<Vec<CodeChunk>> {
    let old_dataframe_name = params
        .old_dataframe_name
        .clone()
        .or_else(|| prev_state.df_names.get(params.sheet_index).cloned())
        .unwrap_or_default();
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::DataframeDelete {
            sheet_indexes: vec![params.sheet_index],
            old_dataframe_names: vec![old_dataframe_name],
        },
    )])
}

pub fn saturate_rename(
    prev_state: &State,
    mut params: DataframeRenameParams,
) -> StepResult<DataframeRenameParams> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    params.old_dataframe_name = Some(prev_state.df_names[params.sheet_index].clone());
    Ok(params)
}

pub fn execute_rename(
    prev_state: &State,
    params: &DataframeRenameParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    let old_name = &prev_state.df_names[params.sheet_index];

    // No change requested: record the step without touching anything.
    if *old_name == params.new_dataframe_name {
        return Ok((
            prev_state.clone(),
            ExecutionData::DataframeRename {
                new_dataframe_name: params.new_dataframe_name.clone(),
            },
        ));
    }

    let mut post_state = prev_state.clone();
    let sanitized = make_valid_df_name(&params.new_dataframe_name);
    let new_name = first_unused_df_name(&post_state.df_names, &sanitized);
    post_state.df_names[params.sheet_index] = new_name.clone();
    Ok((
        post_state,
        ExecutionData::DataframeRename {
            new_dataframe_name: new_name,
        },
    ))
}

pub fn transpile_rename(
    prev_state: &State,
    params: &DataframeRenameParams,
    execution_data: &ExecutionData,
) -> StepResult<Vec<CodeChunk>> {
    let ExecutionData::DataframeRename { new_dataframe_name } = execution_data else {
        return Err(invariant_mismatch("dataframe_rename"));
    };
    let old_dataframe_name = params
        .old_dataframe_name
        .clone()
        .or_else(|| prev_state.df_names.get(params.sheet_index).cloned())
        .unwrap_or_default();
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::DataframeRename {
            sheet_index: params.sheet_index,
            old_dataframe_name,
            new_dataframe_name: new_dataframe_name.clone(),
        },
    )])
}

pub fn execute_duplicate(
    prev_state: &State,
    params: &DataframeDuplicateParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    let mut post_state = prev_state.clone();
    let copy = post_state.dfs[params.sheet_index].clone();
    let base = format!("{}_copy", post_state.df_names[params.sheet_index]);
    let new_name = first_unused_df_name(&post_state.df_names, &base);
    let format = post_state.df_formats[params.sheet_index].clone();
    post_state.add_df_to_state(
        copy,
        DfSource::Duplicated,
        Some(new_name.clone()),
        Some(format),
        None,
    );
    Ok((
        post_state,
        ExecutionData::DataframeDuplicate { new_df_name: new_name },
    ))
}

pub fn transpile_duplicate(
    prev_state: &State,
    params: &DataframeDuplicateParams,
    execution_data: &ExecutionData,
) -> StepResult<Vec<CodeChunk>> {
    let ExecutionData::DataframeDuplicate { new_df_name } = execution_data else {
        return Err(invariant_mismatch("dataframe_duplicate"));
    };
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::DataframeDuplicate {
            sheet_index: params.sheet_index,
            new_df_name: new_df_name.clone(),
        },
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StepError;
    use polars::prelude::*;

    fn base_state() -> State {
        let a = df!("x" => [1i64]).unwrap();
        let b = df!("y" => [2i64]).unwrap();
        State::new(vec![a, b], None)
    }

    #[test]
    fn test_delete_saturates_old_name() {
        let prev = base_state();
        let params = saturate_delete(
            &prev,
            DataframeDeleteParams {
                sheet_index: 1,
                old_dataframe_name: None,
            },
        )
        .unwrap();
        assert_eq!(params.old_dataframe_name.as_deref(), Some("df2"));

        let (post, _) = execute_delete(&prev, &params).unwrap();
        assert_eq!(post.df_names, vec!["df1"]);
    }

    #[test]
    fn test_delete_missing_sheet_fails() {
        let prev = base_state();
        let err = execute_delete(
            &prev,
            &DataframeDeleteParams {
                sheet_index: 7,
                old_dataframe_name: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StepError::NoSheet(7)));
    }

    #[test]
    fn test_rename_sanitizes_and_deduplicates() {
        let prev = base_state();
        let params = DataframeRenameParams {
            sheet_index: 1,
            new_dataframe_name: "my data!".to_string(),
            old_dataframe_name: Some("df2".to_string()),
        };
        let (post, execution_data) = execute_rename(&prev, &params).unwrap();
        assert_eq!(post.df_names[1], "my_data");
        match execution_data {
            ExecutionData::DataframeRename { new_dataframe_name } => {
                assert_eq!(new_dataframe_name, "my_data");
            }
            other => panic!("unexpected execution data {:?}", other),
        }
    }

    #[test]
    fn test_rename_unchanged_emits_no_code() {
        let prev = base_state();
        let params = DataframeRenameParams {
            sheet_index: 0,
            new_dataframe_name: "df1".to_string(),
            old_dataframe_name: Some("df1".to_string()),
        };
        let (post, execution_data) = execute_rename(&prev, &params).unwrap();
        assert_eq!(post.df_names[0], "df1");
        let chunks = transpile_rename(&prev, &params, &execution_data).unwrap();
        let (lines, _) = chunks[0].code().unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_duplicate_names_copy() {
        let prev = base_state();
        let params = DataframeDuplicateParams { sheet_index: 0 };
        let (post, execution_data) = execute_duplicate(&prev, &params).unwrap();
        assert_eq!(post.df_names, vec!["df1", "df2", "df1_copy"]);
        assert_eq!(post.df_sources[2], DfSource::Duplicated);

        let chunks = transpile_duplicate(&prev, &params, &execution_data).unwrap();
        let (lines, _) = chunks[0].code().unwrap();
        assert_eq!(lines, vec!["df1_copy = df1.copy(deep=True)"]);
        assert_eq!(chunks[0].source_sheet_indexes(), vec![0]);
    }
}
