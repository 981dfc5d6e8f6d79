//! One executed user action, and the registry that dispatches it.
//!
//! A `Step` binds validated parameters to the states before and after its
//! execution, plus the execution data its transpilation needs. Dispatch is
//! a closed match over the `StepParams` registry: there is no dynamic
//! step-type lookup beyond the serde tag, and an unknown type surfaces as a
//! typed unsupported-step error.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::chunks::{CodeAndImports, CodeChunk};
use crate::column_ids::ColumnId;
use crate::errors::{StepError, StepResult};
use crate::params::{ColumnEdit, StepParams};
use crate::state::State;
use crate::steps;

/// Every supported step type with its current version. Persistence checks
/// incoming analyses against this table.
pub const STEP_CATALOG: &[(&str, u32)] = &[
    ("simple_import", 2),
    ("add_column", 2),
    ("delete_columns", 3),
    ("rename_column", 2),
    ("reorder_column", 2),
    ("sort", 2),
    ("filter_column", 4),
    ("concat", 1),
    ("pivot", 8),
    ("dataframe_delete", 1),
    ("dataframe_rename", 1),
    ("dataframe_duplicate", 1),
    ("graph", 4),
    ("graph_rename", 1),
    ("graph_delete", 1),
];

pub fn is_supported_step(step_type: &str, step_version: u32) -> bool {
    STEP_CATALOG
        .iter()
        .any(|&(name, version)| name == step_type && version == step_version)
}

/// Which sheets a step changed, used to decide what needs re-rendering.
/// `All` covers steps that add sheets; `Sheets(∅)` means no sheet content
/// changed (graph edits, deletes where every index shifts anyway).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModifiedIndexes {
    All,
    Sheets(BTreeSet<usize>),
}

impl ModifiedIndexes {
    pub fn none() -> Self {
        ModifiedIndexes::Sheets(BTreeSet::new())
    }

    pub fn single(sheet_index: usize) -> Self {
        ModifiedIndexes::Sheets(BTreeSet::from([sheet_index]))
    }

    pub fn is_exactly(&self, sheet_index: usize) -> bool {
        matches!(self, ModifiedIndexes::Sheets(set) if set.len() == 1 && set.contains(&sheet_index))
    }
}

/// Data computed during execution that transpilation needs later. This is
/// the only channel between the two: `transpile` never re-derives
/// execution-time results, and a shape mismatch is a transpile-invariant
/// failure.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ExecutionData {
    #[default]
    None,
    SimpleImport {
        delimiters: Vec<String>,
        encodings: Vec<String>,
        skiprows: Vec<usize>,
        new_df_names: Vec<String>,
    },
    AddColumn {
        column_header_index: i64,
        new_column_id: ColumnId,
    },
    RenameColumn {
        renames: Vec<(ColumnId, String)>,
    },
    Concat {
        new_df_name: String,
    },
    Pivot {
        new_df_name: String,
        replayed_edits: Vec<ColumnEdit>,
        optional_code: CodeAndImports,
    },
    DataframeRename {
        new_dataframe_name: String,
    },
    DataframeDuplicate {
        new_df_name: String,
    },
}

/// One executed, history-recorded user action.
#[derive(Clone, Debug)]
pub struct Step {
    /// Steps can overwrite each other by id (editing a pivot reuses the
    /// original pivot step's id, skipping it from the history).
    pub step_id: String,
    pub params: StepParams,
    pub prev_state: State,
    pub post_state: State,
    pub execution_data: ExecutionData,
    /// Wall-clock time spent executing the data transformation.
    pub processing_time: Duration,
}

impl Step {
    pub fn step_type(&self) -> &'static str {
        self.params.step_type()
    }

    pub fn step_version(&self) -> u32 {
        self.params.step_version()
    }

    /// Transpiles this step against its recorded prev state.
    pub fn transpile(&self) -> StepResult<Vec<CodeChunk>> {
        transpile(&self.prev_state, &self.params, &self.execution_data)
    }

    /// Indexes of earlier steps this step makes obsolete.
    pub fn step_indexes_to_skip(&self, earlier_steps: &[Step]) -> BTreeSet<usize> {
        indexes_skipped_by(&self.step_id, &self.params, earlier_steps)
    }
}

/// True for the column-level step types whose effect on a pivot sheet can
/// be absorbed into a pivot overwrite (and replayed optimistically).
fn is_column_edit_on(params: &StepParams, sheet_index: usize) -> bool {
    match params {
        StepParams::RenameColumn(p) => p.sheet_index == sheet_index,
        StepParams::DeleteColumns(p) => p.sheet_index == sheet_index,
        StepParams::ReorderColumn(p) => p.sheet_index == sheet_index,
        StepParams::Sort(p) => p.sheet_index == sheet_index,
        StepParams::FilterColumn(p) => p.sheet_index == sheet_index,
        _ => false,
    }
}

/// True when a later step with `later_id`/`later_params` makes an earlier
/// step obsolete: same step id (pivot overwrites), or a filter on the same
/// sheet and column (refiltering replaces the old filter).
pub fn makes_obsolete(
    later_id: &str,
    later_params: &StepParams,
    earlier_id: &str,
    earlier_params: &StepParams,
) -> bool {
    if later_id == earlier_id {
        return true;
    }
    if let (StepParams::FilterColumn(later), StepParams::FilterColumn(earlier)) =
        (later_params, earlier_params)
    {
        return later.sheet_index == earlier.sheet_index
            && later.column_id == earlier.column_id;
    }
    false
}

/// Indexes of earlier steps a step with this id and params makes obsolete.
///
/// Besides the pairwise rules, a pivot overwrite absorbs the column edits
/// recorded between the overwritten pivot (same step id) and itself: their
/// effect now lives inside the new pivot step as replayed edits, so they
/// contribute neither state nor code on their own.
pub fn indexes_skipped_by(
    step_id: &str,
    params: &StepParams,
    earlier_steps: &[Step],
) -> BTreeSet<usize> {
    let plan: Vec<(&str, &StepParams)> = earlier_steps
        .iter()
        .map(|s| (s.step_id.as_str(), &s.params))
        .chain(std::iter::once((step_id, params)))
        .collect();
    let mut skipped = skipped_plan_indexes(&plan);
    skipped.remove(&earlier_steps.len());
    skipped
}

/// The skip set of a whole history: every step index made obsolete by some
/// later step in the list.
pub fn skipped_step_indexes(steps: &[Step]) -> BTreeSet<usize> {
    let plan: Vec<(&str, &StepParams)> = steps
        .iter()
        .map(|s| (s.step_id.as_str(), &s.params))
        .collect();
    skipped_plan_indexes(&plan)
}

/// Skip set over (step id, params) pairs, usable before steps exist.
pub fn skipped_plan_indexes(plan: &[(&str, &StepParams)]) -> BTreeSet<usize> {
    let mut skipped = BTreeSet::new();
    for (later_index, (later_id, later_params)) in plan.iter().enumerate() {
        for (earlier_index, (earlier_id, earlier_params)) in
            plan[..later_index].iter().enumerate()
        {
            if makes_obsolete(later_id, later_params, earlier_id, earlier_params) {
                skipped.insert(earlier_index);
            }
        }
        if let StepParams::Pivot(pivot) = later_params {
            if let Some(destination) = pivot.destination_sheet_index {
                let overwritten = plan[..later_index]
                    .iter()
                    .rposition(|(id, _)| id == later_id);
                if let Some(overwritten) = overwritten {
                    for (index, (_, earlier_params)) in plan
                        .iter()
                        .enumerate()
                        .take(later_index)
                        .skip(overwritten + 1)
                    {
                        if is_column_edit_on(earlier_params, destination) {
                            skipped.insert(index);
                        }
                    }
                }
            }
        }
    }
    skipped
}

/// Fills in derivable parameters (pre-delete names, pivot replay edits)
/// before execution, so undo and replay have full context later.
pub fn saturate(
    prev_state: &State,
    params: StepParams,
    previous_steps: &[Step],
) -> StepResult<StepParams> {
    match params {
        StepParams::DataframeDelete(p) => Ok(StepParams::DataframeDelete(
            steps::dataframe_steps::saturate_delete(prev_state, p)?,
        )),
        StepParams::DataframeRename(p) => Ok(StepParams::DataframeRename(
            steps::dataframe_steps::saturate_rename(prev_state, p)?,
        )),
        StepParams::Pivot(p) => Ok(StepParams::Pivot(steps::pivot::saturate(
            prev_state,
            p,
            previous_steps,
        )?)),
        StepParams::GraphRename(p) => Ok(StepParams::GraphRename(
            steps::graph::saturate_rename(prev_state, p),
        )),
        other => Ok(other),
    }
}

/// Validates and executes a step against `prev_state`, returning the new
/// state and execution data. Never mutates `prev_state`: either the step
/// fully succeeds, or the error leaves the world untouched.
pub fn execute(prev_state: &State, params: &StepParams) -> StepResult<(State, ExecutionData)> {
    match params {
        StepParams::SimpleImport(p) => steps::simple_import::execute(prev_state, p),
        StepParams::AddColumn(p) => steps::column_steps::execute_add(prev_state, p),
        StepParams::DeleteColumns(p) => steps::column_steps::execute_delete(prev_state, p),
        StepParams::RenameColumn(p) => steps::column_steps::execute_rename(prev_state, p),
        StepParams::ReorderColumn(p) => steps::column_steps::execute_reorder(prev_state, p),
        StepParams::Sort(p) => steps::sort_filter::execute_sort(prev_state, p),
        StepParams::FilterColumn(p) => steps::sort_filter::execute_filter(prev_state, p),
        StepParams::Concat(p) => steps::concat::execute(prev_state, p),
        StepParams::Pivot(p) => steps::pivot::execute(prev_state, p),
        StepParams::DataframeDelete(p) => {
            steps::dataframe_steps::execute_delete(prev_state, p)
        }
        StepParams::DataframeRename(p) => {
            steps::dataframe_steps::execute_rename(prev_state, p)
        }
        StepParams::DataframeDuplicate(p) => {
            steps::dataframe_steps::execute_duplicate(prev_state, p)
        }
        StepParams::Graph(p) => steps::graph::execute_graph(prev_state, p),
        StepParams::GraphRename(p) => steps::graph::execute_rename(prev_state, p),
        StepParams::GraphDelete(p) => steps::graph::execute_delete(prev_state, p),
    }
}

/// Pure mapping from (prior state, params, execution data) to code chunks.
/// Touches no live data.
pub fn transpile(
    prev_state: &State,
    params: &StepParams,
    execution_data: &ExecutionData,
) -> StepResult<Vec<CodeChunk>> {
    match params {
        StepParams::SimpleImport(p) => {
            steps::simple_import::transpile(prev_state, p, execution_data)
        }
        StepParams::AddColumn(p) => {
            steps::column_steps::transpile_add(prev_state, p, execution_data)
        }
        StepParams::DeleteColumns(p) => steps::column_steps::transpile_delete(prev_state, p),
        StepParams::RenameColumn(p) => {
            steps::column_steps::transpile_rename(prev_state, p, execution_data)
        }
        StepParams::ReorderColumn(p) => steps::column_steps::transpile_reorder(prev_state, p),
        StepParams::Sort(p) => steps::sort_filter::transpile_sort(prev_state, p),
        StepParams::FilterColumn(p) => steps::sort_filter::transpile_filter(prev_state, p),
        StepParams::Concat(p) => steps::concat::transpile(prev_state, p, execution_data),
        StepParams::Pivot(p) => steps::pivot::transpile(prev_state, p, execution_data),
        StepParams::DataframeDelete(p) => {
            steps::dataframe_steps::transpile_delete(prev_state, p)
        }
        StepParams::DataframeRename(p) => {
            steps::dataframe_steps::transpile_rename(prev_state, p, execution_data)
        }
        StepParams::DataframeDuplicate(p) => {
            steps::dataframe_steps::transpile_duplicate(prev_state, p, execution_data)
        }
        StepParams::Graph(_) => steps::graph::transpile_graph(prev_state),
        StepParams::GraphRename(_) => steps::graph::transpile_rename(prev_state),
        StepParams::GraphDelete(_) => steps::graph::transpile_delete(prev_state),
    }
}

/// Which sheets a step with these params modifies.
pub fn modified_sheet_indexes(params: &StepParams) -> ModifiedIndexes {
    match params {
        StepParams::SimpleImport(_)
        | StepParams::Concat(_)
        | StepParams::DataframeDuplicate(_) => ModifiedIndexes::All,
        StepParams::Pivot(p) => match p.destination_sheet_index {
            None => ModifiedIndexes::All,
            Some(destination) => ModifiedIndexes::single(destination),
        },
        StepParams::AddColumn(p) => ModifiedIndexes::single(p.sheet_index),
        StepParams::DeleteColumns(p) => ModifiedIndexes::single(p.sheet_index),
        StepParams::RenameColumn(p) => ModifiedIndexes::single(p.sheet_index),
        StepParams::ReorderColumn(p) => ModifiedIndexes::single(p.sheet_index),
        StepParams::Sort(p) => ModifiedIndexes::single(p.sheet_index),
        StepParams::FilterColumn(p) => ModifiedIndexes::single(p.sheet_index),
        StepParams::DataframeRename(p) => ModifiedIndexes::single(p.sheet_index),
        // Indexes shift under a delete; nothing that survives changed.
        StepParams::DataframeDelete(_) => ModifiedIndexes::none(),
        StepParams::Graph(_) | StepParams::GraphRename(_) | StepParams::GraphDelete(_) => {
            ModifiedIndexes::none()
        }
    }
}

/// Helper for performers whose transpile requires execution data of a
/// particular shape.
pub(crate) fn invariant_mismatch(step_type: &str) -> StepError {
    StepError::TranspileInvariant(format!(
        "{} step received execution data of the wrong shape",
        step_type
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{FilterColumnParams, LogicalOperator, SortParams};

    #[test]
    fn test_catalog_matches_param_versions() {
        let params = StepParams::Sort(SortParams {
            sheet_index: 0,
            column_id: "a".to_string(),
            sort_direction: crate::params::SortDirection::Ascending,
        });
        assert!(is_supported_step(params.step_type(), params.step_version()));
        assert!(!is_supported_step("sort", 99));
        assert!(!is_supported_step("telepathy", 1));
    }

    #[test]
    fn test_filter_steps_on_same_column_skip_older() {
        let filter = |id: &str, step_id: &str| Step {
            step_id: step_id.to_string(),
            params: StepParams::FilterColumn(FilterColumnParams {
                sheet_index: 0,
                column_id: id.to_string(),
                operator: LogicalOperator::And,
                filters: Vec::new(),
            }),
            prev_state: State::default(),
            post_state: State::default(),
            execution_data: ExecutionData::None,
            processing_time: Duration::ZERO,
        };
        let steps = vec![filter("a", "s1"), filter("b", "s2"), filter("a", "s3")];
        let skipped = skipped_step_indexes(&steps);
        assert_eq!(skipped, BTreeSet::from([0]));
    }

    #[test]
    fn test_same_step_id_skips_older() {
        let sort = |step_id: &str| Step {
            step_id: step_id.to_string(),
            params: StepParams::Sort(SortParams {
                sheet_index: 0,
                column_id: "a".to_string(),
                sort_direction: crate::params::SortDirection::Ascending,
            }),
            prev_state: State::default(),
            post_state: State::default(),
            execution_data: ExecutionData::None,
            processing_time: Duration::ZERO,
        };
        let steps = vec![sort("same"), sort("other"), sort("same")];
        assert_eq!(skipped_step_indexes(&steps), BTreeSet::from([0]));
    }
}
