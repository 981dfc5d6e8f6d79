//! The frozen snapshot every step executes against.
//!
//! A `State` is immutable by convention: once it has been handed to a step
//! as `prev_state` it is never mutated again. Steps that change the sheet
//! set build a new `State` from a clone, so the previous snapshot stays a
//! frozen witness of the world before the step ran.

use std::collections::HashMap;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::codegen::first_unused_df_name;
use crate::column_ids::{ColumnId, ColumnIdMap};
use crate::errors::{StepError, StepResult};
use crate::params::FilterSet;

/// Where a sheet came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DfSource {
    /// Supplied by the caller at session start.
    Passed,
    Imported,
    Pivoted,
    Concatenated,
    Duplicated,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    #[default]
    PlainText,
    Currency,
    Percentage,
    Scientific,
}

/// Display formatting for one sheet. Carried metadata only; nothing in the
/// step catalog generates formatting code.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataframeFormat {
    pub columns: HashMap<ColumnId, NumberFormat>,
}

/// Metadata for one graph tab. Graphs never contribute generated code; the
/// array exists so graph steps are recorded and replayable.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphData {
    pub graph_id: String,
    pub graph_tab_name: String,
    pub graph_type: String,
    pub sheet_index: usize,
    pub x_axis_column_ids: Vec<ColumnId>,
    pub y_axis_column_ids: Vec<ColumnId>,
}

/// Arguments for replacing an existing sheet in `add_df_to_state`.
#[derive(Clone, Copy, Debug)]
pub struct OverwriteSheetIndex {
    pub sheet_index_to_overwrite: usize,
    /// Keep filter metadata for column ids that survive the overwrite, so
    /// regenerating a pivot does not wipe filters the user set on it.
    pub attempt_to_save_filter_metadata: bool,
}

/// Snapshot of all sheets and their per-sheet metadata.
///
/// Invariant: every per-sheet collection has the same length and index
/// order as `dfs`. The mutation helpers below are the only code that
/// changes the sheet set, and each keeps all collections in lock-step.
#[derive(Clone, Debug, Default)]
pub struct State {
    pub dfs: Vec<DataFrame>,
    pub df_names: Vec<String>,
    pub df_sources: Vec<DfSource>,
    pub column_ids: ColumnIdMap,
    pub column_formulas: Vec<HashMap<ColumnId, Vec<String>>>,
    pub column_filters: Vec<HashMap<ColumnId, FilterSet>>,
    pub df_formats: Vec<DataframeFormat>,
    pub graph_data: Vec<GraphData>,
    pub user_defined_functions: Vec<String>,
    pub user_defined_importers: Vec<String>,
    pub user_defined_editors: Vec<String>,
}

impl State {
    /// Builds the session-start state from caller-supplied dataframes.
    /// Names default to `df1`, `df2`, ... when not provided.
    pub fn new(dfs: Vec<DataFrame>, df_names: Option<Vec<String>>) -> Self {
        let df_names = df_names
            .unwrap_or_else(|| (1..=dfs.len()).map(|i| format!("df{}", i)).collect());
        debug_assert_eq!(df_names.len(), dfs.len());

        let column_ids = ColumnIdMap::new(&dfs);
        let column_formulas = (0..dfs.len())
            .map(|i| {
                column_ids
                    .column_ids(i)
                    .into_iter()
                    .map(|id| (id, Vec::new()))
                    .collect()
            })
            .collect();
        let column_filters = (0..dfs.len())
            .map(|i| {
                column_ids
                    .column_ids(i)
                    .into_iter()
                    .map(|id| (id, FilterSet::default()))
                    .collect()
            })
            .collect();
        let df_formats = dfs.iter().map(|_| DataframeFormat::default()).collect();
        let df_sources = dfs.iter().map(|_| DfSource::Passed).collect();

        Self {
            dfs,
            df_names,
            df_sources,
            column_ids,
            column_formulas,
            column_filters,
            df_formats,
            graph_data: Vec::new(),
            user_defined_functions: Vec::new(),
            user_defined_importers: Vec::new(),
            user_defined_editors: Vec::new(),
        }
    }

    pub fn has_sheet_index(&self, sheet_index: usize) -> bool {
        sheet_index < self.dfs.len()
    }

    pub fn sheet_index_or_err(&self, sheet_index: usize) -> StepResult<()> {
        if self.has_sheet_index(sheet_index) {
            Ok(())
        } else {
            Err(StepError::NoSheet(sheet_index))
        }
    }

    /// Appends a new sheet, or replaces the sheet named by `overwrite`,
    /// keeping every per-sheet collection in sync. Returns the sheet index
    /// the dataframe landed at.
    pub fn add_df_to_state(
        &mut self,
        new_df: DataFrame,
        df_source: DfSource,
        df_name: Option<String>,
        df_format: Option<DataframeFormat>,
        overwrite: Option<OverwriteSheetIndex>,
    ) -> usize {
        match overwrite {
            None => {
                let name = match df_name {
                    Some(name) => name,
                    None => first_unused_df_name(
                        &self.df_names,
                        &format!("df{}", self.df_names.len() + 1),
                    ),
                };
                let column_ids = self.column_ids.add_df(&new_df, None);
                self.dfs.push(new_df);
                self.df_names.push(name);
                self.df_sources.push(df_source);
                self.column_formulas.push(
                    column_ids
                        .iter()
                        .map(|id| (id.clone(), Vec::new()))
                        .collect(),
                );
                self.column_filters.push(
                    column_ids
                        .iter()
                        .map(|id| (id.clone(), FilterSet::default()))
                        .collect(),
                );
                self.df_formats.push(df_format.unwrap_or_default());
                self.dfs.len() - 1
            }
            Some(overwrite) => {
                let sheet_index = overwrite.sheet_index_to_overwrite;
                let column_ids = self.column_ids.add_df(&new_df, Some(sheet_index));
                self.dfs[sheet_index] = new_df;
                if let Some(name) = df_name {
                    self.df_names[sheet_index] = name;
                }
                self.df_sources[sheet_index] = df_source;
                self.column_formulas[sheet_index] = column_ids
                    .iter()
                    .map(|id| (id.clone(), Vec::new()))
                    .collect();
                let new_filters = if overwrite.attempt_to_save_filter_metadata {
                    let old_filters = &self.column_filters[sheet_index];
                    column_ids
                        .iter()
                        .map(|id| {
                            let filters =
                                old_filters.get(id).cloned().unwrap_or_default();
                            (id.clone(), filters)
                        })
                        .collect()
                } else {
                    column_ids
                        .iter()
                        .map(|id| (id.clone(), FilterSet::default()))
                        .collect()
                };
                self.column_filters[sheet_index] = new_filters;
                self.df_formats[sheet_index] = df_format.unwrap_or_default();
                sheet_index
            }
        }
    }

    /// Removes a sheet, popping the same index from every per-sheet
    /// collection. Graphs sourced from the deleted sheet are dropped and
    /// later graph sheet references shift down.
    pub fn delete_dataframe_from_state(&mut self, sheet_index: usize) {
        self.column_ids.remove_df(sheet_index);
        self.column_formulas.remove(sheet_index);
        self.column_filters.remove(sheet_index);
        self.df_formats.remove(sheet_index);
        self.dfs.remove(sheet_index);
        self.df_names.remove(sheet_index);
        self.df_sources.remove(sheet_index);
        self.graph_data.retain(|g| g.sheet_index != sheet_index);
        for graph in &mut self.graph_data {
            if graph.sheet_index > sheet_index {
                graph.sheet_index -= 1;
            }
        }
    }

    /// Registers new columns on a sheet, tracking the metadata each column
    /// carries. Returns the new ids in order.
    pub fn add_columns_to_state(
        &mut self,
        sheet_index: usize,
        column_headers: &[String],
    ) -> Vec<ColumnId> {
        let mut new_ids = Vec::with_capacity(column_headers.len());
        for header in column_headers {
            let id = self.column_ids.add_column_header(sheet_index, header);
            self.column_formulas[sheet_index].insert(id.clone(), Vec::new());
            self.column_filters[sheet_index].insert(id.clone(), FilterSet::default());
            new_ids.push(id);
        }
        new_ids
    }

    /// Drops a column's metadata from a sheet.
    pub fn remove_column_from_state(&mut self, sheet_index: usize, column_id: &str) {
        self.column_ids.remove_column_id(sheet_index, column_id);
        self.column_formulas[sheet_index].remove(column_id);
        self.column_filters[sheet_index].remove(column_id);
        self.df_formats[sheet_index].columns.remove(column_id);
    }
}
