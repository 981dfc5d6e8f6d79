//! Graph steps. Graphs are pure UI metadata: the steps are recorded and
//! replayable, but none of them contributes statements to the generated
//! script, so they all transpile to empty chunks.

use crate::chunks::{ChunkKind, CodeChunk};
use crate::errors::{StepError, StepResult};
use crate::params::{GraphDeleteParams, GraphParams, GraphRenameParams};
use crate::state::{GraphData, State};
use crate::step::ExecutionData;

fn graph_position(state: &State, graph_id: &str) -> Option<usize> {
    state.graph_data.iter().position(|g| g.graph_id == graph_id)
}

fn first_unused_graph_tab_name(state: &State) -> String {
    let mut n = state.graph_data.len();
    loop {
        let candidate = format!("graph{}", n);
        if !state.graph_data.iter().any(|g| g.graph_tab_name == candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Creates a graph, or reconfigures the one with the same id.
pub fn execute_graph(
    prev_state: &State,
    params: &GraphParams,
) -> StepResult<(State, ExecutionData)> {
    prev_state.sheet_index_or_err(params.sheet_index)?;
    let df_name = &prev_state.df_names[params.sheet_index];
    for column_id in params
        .x_axis_column_ids
        .iter()
        .chain(&params.y_axis_column_ids)
    {
        prev_state
            .column_ids
            .header_or_err(params.sheet_index, column_id, df_name)?;
    }

    let mut post_state = prev_state.clone();
    match graph_position(&post_state, &params.graph_id) {
        Some(position) => {
            let existing = &mut post_state.graph_data[position];
            existing.graph_type = params.graph_type.clone();
            existing.sheet_index = params.sheet_index;
            existing.x_axis_column_ids = params.x_axis_column_ids.clone();
            existing.y_axis_column_ids = params.y_axis_column_ids.clone();
        }
        None => {
            let graph_tab_name = params
                .graph_tab_name
                .clone()
                .unwrap_or_else(|| first_unused_graph_tab_name(&post_state));
            post_state.graph_data.push(GraphData {
                graph_id: params.graph_id.clone(),
                graph_tab_name,
                graph_type: params.graph_type.clone(),
                sheet_index: params.sheet_index,
                x_axis_column_ids: params.x_axis_column_ids.clone(),
                y_axis_column_ids: params.y_axis_column_ids.clone(),
            });
        }
    }
    Ok((post_state, ExecutionData::None))
}

pub fn transpile_graph(prev_state: &State) -> StepResult<Vec<CodeChunk>> {
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::Empty {
            display_name: "Created graph".to_string(),
            description: "Created a graph".to_string(),
            optimize_right: true,
        },
    )])
}

pub fn saturate_rename(prev_state: &State, mut params: GraphRenameParams) -> GraphRenameParams {
    if let Some(position) = graph_position(prev_state, &params.graph_id) {
        params.old_graph_tab_name =
            Some(prev_state.graph_data[position].graph_tab_name.clone());
    }
    params
}

pub fn execute_rename(
    prev_state: &State,
    params: &GraphRenameParams,
) -> StepResult<(State, ExecutionData)> {
    let position = graph_position(prev_state, &params.graph_id).ok_or_else(|| {
        StepError::InvalidParameter(format!("no graph with id {:?}", params.graph_id))
    })?;

    // An empty or unchanged name is recorded but changes nothing.
    let old_name = &prev_state.graph_data[position].graph_tab_name;
    if params.new_graph_tab_name.is_empty() || params.new_graph_tab_name == *old_name {
        return Ok((prev_state.clone(), ExecutionData::None));
    }

    let mut post_state = prev_state.clone();
    post_state.graph_data[position].graph_tab_name = params.new_graph_tab_name.clone();
    Ok((post_state, ExecutionData::None))
}

pub fn transpile_rename(prev_state: &State) -> StepResult<Vec<CodeChunk>> {
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::Empty {
            display_name: "Renamed graph".to_string(),
            description: "Renamed a graph".to_string(),
            optimize_right: true,
        },
    )])
}

pub fn execute_delete(
    prev_state: &State,
    params: &GraphDeleteParams,
) -> StepResult<(State, ExecutionData)> {
    let position = graph_position(prev_state, &params.graph_id).ok_or_else(|| {
        StepError::InvalidParameter(format!("no graph with id {:?}", params.graph_id))
    })?;
    let mut post_state = prev_state.clone();
    post_state.graph_data.remove(position);
    Ok((post_state, ExecutionData::None))
}

pub fn transpile_delete(prev_state: &State) -> StepResult<Vec<CodeChunk>> {
    Ok(vec![CodeChunk::new(
        prev_state.clone(),
        ChunkKind::Empty {
            display_name: "Deleted graph".to_string(),
            description: "Deleted a graph".to_string(),
            optimize_right: true,
        },
    )])
}
