//! Sort and filter steps.
//!
//! A filter step replaces the whole filter set of one column; the steps
//! manager skips any earlier filter step on the same column, so only the
//! latest filter contributes generated code.

use crate::chunks::{ChunkKind, CodeChunk};
use crate::errors::StepResult;
use crate::params::{FilterColumnParams, SortParams};
use crate::state::State;
use crate::step::ExecutionData;

use super::{filter_df, sort_df};

pub fn execute_sort(
    prev_state: &State,
    params: &SortParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    let mut post_state = prev_state.clone();
    sort_df(
        &mut post_state,
        params.sheet_index,
        &params.column_id,
        params.sort_direction,
    )?;
    Ok((post_state, ExecutionData::None))
}

pub fn transpile_sort(prev_state: &State, params: &SortParams) -> StepResult<Vec<CodeChunk>> {
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::Sort {
            sheet_index: params.sheet_index,
            column_id: params.column_id.clone(),
            sort_direction: params.sort_direction,
        },
    )])
}

pub fn execute_filter(
    prev_state: &State,
    params: &FilterColumnParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    let mut post_state = prev_state.clone();
    filter_df(
        &mut post_state,
        params.sheet_index,
        &params.column_id,
        params.operator,
        &params.filters,
    )?;
    Ok((post_state, ExecutionData::None))
}

pub fn transpile_filter(
    prev_state: &State,
    params: &FilterColumnParams,
) -> StepResult<Vec<CodeChunk>> {
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::FilterColumn {
            sheet_index: params.sheet_index,
            column_id: params.column_id.clone(),
            operator: params.operator,
            filters: params.filters.clone(),
        },
    )])
}
