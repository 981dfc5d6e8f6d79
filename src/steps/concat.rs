//! Vertical concatenation of sheets into a new sheet.

use std::collections::HashSet;

use polars::prelude::*;

use crate::chunks::{ChunkKind, CodeChunk};
use crate::codegen::first_unused_df_name;
use crate::errors::StepResult;
use crate::params::{ConcatJoin, ConcatParams};
use crate::state::{DfSource, State};
use crate::step::{invariant_mismatch, ExecutionData};

pub fn execute(prev_state: &State, params: &ConcatParams) -> StepResult<(State, ExecutionData)> {
    for &sheet_index in &params.sheet_indexes {
        prev_state.sheet_index_or_err(sheet_index)?;
    }

    let new_df_name = first_unused_df_name(&prev_state.df_names, "df_concat");
    let concatenated = concat_sheets(prev_state, params)?;

    let mut post_state = prev_state.clone();
    post_state.add_df_to_state(
        concatenated,
        DfSource::Concatenated,
        Some(new_df_name.clone()),
        None,
        None,
    );
    Ok((post_state, ExecutionData::Concat { new_df_name }))
}

pub fn transpile(
    prev_state: &State,
    params: &ConcatParams,
    execution_data: &ExecutionData,
) -> StepResult<Vec<CodeChunk>> {
    let ExecutionData::Concat { new_df_name } = execution_data else {
        return Err(invariant_mismatch("concat"));
    };
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::Concat {
            join: params.join,
            ignore_index: params.ignore_index,
            sheet_indexes: params.sheet_indexes.clone(),
            new_df_name: new_df_name.clone(),
        },
    )])
}

fn concat_sheets(prev_state: &State, params: &ConcatParams) -> StepResult<DataFrame> {
    if params.sheet_indexes.is_empty() {
        return Ok(DataFrame::empty());
    }
    match params.join {
        ConcatJoin::Outer => {
            let frames: Vec<LazyFrame> = params
                .sheet_indexes
                .iter()
                .map(|&i| prev_state.dfs[i].clone().lazy())
                .collect();
            Ok(concat_lf_diagonal(frames, UnionArgs::default())?.collect()?)
        }
        ConcatJoin::Inner => {
            let first = &prev_state.dfs[params.sheet_indexes[0]];
            let mut common: Vec<String> = first
                .get_column_names()
                .iter()
                .map(|n| n.to_string())
                .collect();
            for &sheet_index in &params.sheet_indexes[1..] {
                let names: HashSet<String> = prev_state.dfs[sheet_index]
                    .get_column_names()
                    .iter()
                    .map(|n| n.to_string())
                    .collect();
                common.retain(|name| names.contains(name));
            }
            if common.is_empty() {
                return Ok(DataFrame::empty());
            }
            let mut out = first.select(common.clone())?;
            for &sheet_index in &params.sheet_indexes[1..] {
                out = out.vstack(&prev_state.dfs[sheet_index].select(common.clone())?)?;
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn two_sheet_state() -> State {
        let a = df!("x" => [1i64, 2], "y" => [3i64, 4]).unwrap();
        let b = df!("x" => [5i64], "z" => [6i64]).unwrap();
        State::new(vec![a, b], None)
    }

    #[test]
    fn test_concat_inner_keeps_common_columns() {
        let prev = two_sheet_state();
        let params = ConcatParams {
            join: ConcatJoin::Inner,
            ignore_index: true,
            sheet_indexes: vec![0, 1],
        };
        let (post, execution_data) = execute(&prev, &params).unwrap();
        assert_eq!(post.dfs.len(), 3);
        let result = &post.dfs[2];
        assert_eq!(result.width(), 1);
        assert_eq!(result.height(), 3);
        assert_eq!(post.df_sources[2], DfSource::Concatenated);
        assert!(matches!(execution_data, ExecutionData::Concat { .. }));
    }

    #[test]
    fn test_concat_outer_unions_columns() {
        let prev = two_sheet_state();
        let params = ConcatParams {
            join: ConcatJoin::Outer,
            ignore_index: true,
            sheet_indexes: vec![0, 1],
        };
        let (post, _) = execute(&prev, &params).unwrap();
        let result = &post.dfs[2];
        assert_eq!(result.width(), 3);
        assert_eq!(result.height(), 3);
    }

    #[test]
    fn test_concat_of_nothing_creates_empty_sheet() {
        let prev = two_sheet_state();
        let params = ConcatParams {
            join: ConcatJoin::Inner,
            ignore_index: false,
            sheet_indexes: vec![],
        };
        let (post, execution_data) = execute(&prev, &params).unwrap();
        assert_eq!(post.dfs.len(), 3);
        assert_eq!(post.dfs[2].height(), 0);
        assert_eq!(post.df_names[2], "df_concat");

        // The chunk declares the single new sheet index and no sources.
        let chunks = transpile(&prev, &params, &execution_data).unwrap();
        assert_eq!(chunks[0].created_sheet_indexes(), Some(vec![2]));
        assert!(chunks[0].source_sheet_indexes().is_empty());
        let (lines, _) = chunks[0].code().unwrap();
        assert_eq!(lines, vec!["df_concat = pd.DataFrame()"]);
    }

    #[test]
    fn test_concat_name_deduplicates() {
        let mut prev = two_sheet_state();
        prev.df_names[0] = "df_concat".to_string();
        let params = ConcatParams {
            join: ConcatJoin::Outer,
            ignore_index: true,
            sheet_indexes: vec![0, 1],
        };
        let (post, _) = execute(&prev, &params).unwrap();
        assert_eq!(post.df_names[2], "df_concat_1");
    }
}
