//! The generated-code intermediate representation.
//!
//! Every step transpiles to one or more `CodeChunk`s: the pandas statements
//! for that step plus the metadata the optimizer needs to merge, elide, or
//! reorder them. The one-subclass-per-operation hierarchy of a dynamic
//! language becomes a closed payload enum here; the capability set
//! (code, created/edited/source indexes, combination, reordering) lives on
//! the wrapper and dispatches by variant.

mod combine;

use crate::codegen::{py_bool, py_raw_str, py_str, py_str_dict, py_str_list};
use crate::column_ids::ColumnId;
use crate::errors::{StepError, StepResult};
use crate::params::{
    ConcatJoin, FilterCondition, LogicalOperator, ParamSubtype, ParamType, ParamValue,
    PivotAggregation, SortDirection,
};
use crate::state::State;

/// Generated lines plus the import statements they rely on.
pub type CodeAndImports = (Vec<String>, Vec<String>);

pub const IMPORT_PANDAS: &str = "import pandas as pd";

/// Payload of one code chunk.
#[derive(Clone, Debug)]
pub enum ChunkKind {
    /// Generates nothing and is always optimized out.
    NoOp,
    /// Generates nothing but keeps a name and description in the step list
    /// (graph edits and other UI-only actions).
    Empty {
        display_name: String,
        description: String,
        optimize_right: bool,
    },
    SimpleImport {
        file_names: Vec<String>,
        delimiters: Vec<String>,
        encodings: Vec<String>,
        skiprows: Vec<usize>,
        new_df_names: Vec<String>,
    },
    AddColumn {
        sheet_index: usize,
        column_header: String,
        column_header_index: i64,
        new_column_id: ColumnId,
    },
    DeleteColumns {
        sheet_index: usize,
        column_ids: Vec<ColumnId>,
    },
    RenameColumns {
        sheet_index: usize,
        /// column id -> new header, in application order.
        renames: Vec<(ColumnId, String)>,
    },
    ReorderColumn {
        sheet_index: usize,
        column_id: ColumnId,
        new_column_index: usize,
    },
    Sort {
        sheet_index: usize,
        column_id: ColumnId,
        sort_direction: SortDirection,
    },
    FilterColumn {
        sheet_index: usize,
        column_id: ColumnId,
        operator: LogicalOperator,
        filters: Vec<FilterCondition>,
    },
    Concat {
        join: ConcatJoin,
        ignore_index: bool,
        sheet_indexes: Vec<usize>,
        new_df_name: String,
    },
    Pivot {
        sheet_index: usize,
        destination_sheet_index: Option<usize>,
        pivot_rows_column_ids: Vec<ColumnId>,
        pivot_columns_column_ids: Vec<ColumnId>,
        value_column_id: ColumnId,
        aggregation: PivotAggregation,
        flatten_column_headers: bool,
        new_df_name: String,
    },
    DataframeDelete {
        sheet_indexes: Vec<usize>,
        old_dataframe_names: Vec<String>,
    },
    DataframeRename {
        sheet_index: usize,
        old_dataframe_name: String,
        new_dataframe_name: String,
    },
    DataframeDuplicate {
        sheet_index: usize,
        new_df_name: String,
    },
}

/// One step's generated code, bound to the state the step ran against.
///
/// `prev_state` must be the state immediately preceding the owning step;
/// when two chunks combine, the replacement adopts the earliest surviving
/// `prev_state` so header and name lookups resolve against the world the
/// combined code actually runs in.
#[derive(Clone, Debug)]
pub struct CodeChunk {
    pub prev_state: State,
    /// Best-effort code replayed on top of this chunk's result. Only the
    /// prefix that actually succeeded during execution is recorded.
    pub optional_code: CodeAndImports,
    pub kind: ChunkKind,
}

impl CodeChunk {
    pub fn new(prev_state: State, kind: ChunkKind) -> Self {
        Self {
            prev_state,
            optional_code: (Vec::new(), Vec::new()),
            kind,
        }
    }

    pub fn with_optional_code(mut self, optional_code: CodeAndImports) -> Self {
        self.optional_code = optional_code;
        self
    }

    fn df_name(&self, sheet_index: usize) -> StepResult<&str> {
        self.prev_state
            .df_names
            .get(sheet_index)
            .map(String::as_str)
            .ok_or_else(|| {
                StepError::TranspileInvariant(format!(
                    "chunk references sheet {} missing from its prev_state",
                    sheet_index
                ))
            })
    }

    fn header(&self, sheet_index: usize, column_id: &str) -> StepResult<String> {
        self.prev_state
            .column_ids
            .get_header_by_id(sheet_index, column_id)
            .map(String::from)
            .ok_or_else(|| {
                StepError::TranspileInvariant(format!(
                    "chunk references column {:?} missing from sheet {}",
                    column_id, sheet_index
                ))
            })
    }

    pub fn display_name(&self) -> String {
        match &self.kind {
            ChunkKind::NoOp => "NoOp".to_string(),
            ChunkKind::Empty { display_name, .. } => display_name.clone(),
            ChunkKind::SimpleImport { .. } => "Imported".to_string(),
            ChunkKind::AddColumn { .. } => "Added column".to_string(),
            ChunkKind::DeleteColumns { .. } => "Deleted columns".to_string(),
            ChunkKind::RenameColumns { .. } => "Renamed columns".to_string(),
            ChunkKind::ReorderColumn { .. } => "Reordered column".to_string(),
            ChunkKind::Sort { .. } => "Sorted a column".to_string(),
            ChunkKind::FilterColumn { .. } => "Filtered a column".to_string(),
            ChunkKind::Concat { .. } => "Concatenated".to_string(),
            ChunkKind::Pivot { .. } => "Pivoted".to_string(),
            ChunkKind::DataframeDelete { .. } => "Deleted dataframe".to_string(),
            ChunkKind::DataframeRename { .. } => "Renamed dataframe".to_string(),
            ChunkKind::DataframeDuplicate { .. } => "Duplicated dataframe".to_string(),
        }
    }

    /// Human-readable comment rendered above the chunk's code. Falls back
    /// to column ids when a header no longer resolves, since comments must
    /// never fail a transpile.
    pub fn description_comment(&self) -> String {
        match &self.kind {
            ChunkKind::NoOp => "No operation".to_string(),
            ChunkKind::Empty { description, .. } => description.clone(),
            ChunkKind::SimpleImport { file_names, .. } => {
                let bases: Vec<&str> = file_names
                    .iter()
                    .map(|f| f.rsplit(['/', '\\']).next().unwrap_or(f))
                    .collect();
                format!("Imported {}", bases.join(", "))
            }
            ChunkKind::AddColumn { column_header, .. } => {
                format!("Added column {}", column_header)
            }
            ChunkKind::DeleteColumns {
                sheet_index,
                column_ids,
            } => {
                let headers: Vec<String> = column_ids
                    .iter()
                    .map(|id| {
                        self.header(*sheet_index, id)
                            .unwrap_or_else(|_| id.clone())
                    })
                    .collect();
                format!("Deleted columns {}", headers.join(", "))
            }
            ChunkKind::RenameColumns { renames, .. } => {
                let new_headers: Vec<&str> =
                    renames.iter().map(|(_, h)| h.as_str()).collect();
                format!("Renamed columns {}", new_headers.join(", "))
            }
            ChunkKind::ReorderColumn {
                sheet_index,
                column_id,
                ..
            } => {
                let header = self
                    .header(*sheet_index, column_id)
                    .unwrap_or_else(|_| column_id.clone());
                format!("Reordered column {}", header)
            }
            ChunkKind::Sort {
                sheet_index,
                column_id,
                sort_direction,
            } => {
                let header = self
                    .header(*sheet_index, column_id)
                    .unwrap_or_else(|_| column_id.clone());
                let direction = match sort_direction {
                    SortDirection::Ascending => "ascending",
                    SortDirection::Descending => "descending",
                    SortDirection::None => "no",
                };
                format!("Sorted {} in {} order", header, direction)
            }
            ChunkKind::FilterColumn {
                sheet_index,
                column_id,
                ..
            } => {
                let header = self
                    .header(*sheet_index, column_id)
                    .unwrap_or_else(|_| column_id.clone());
                format!("Filtered {}", header)
            }
            ChunkKind::Concat {
                sheet_indexes,
                new_df_name,
                ..
            } => format!(
                "Concatenated {} dataframes into {}",
                sheet_indexes.len(),
                new_df_name
            ),
            ChunkKind::Pivot {
                sheet_index,
                new_df_name,
                ..
            } => {
                let source = self
                    .df_name(*sheet_index)
                    .unwrap_or("a dataframe")
                    .to_string();
                format!("Pivoted {} into {}", source, new_df_name)
            }
            ChunkKind::DataframeDelete {
                old_dataframe_names,
                ..
            } => format!("Deleted {}", old_dataframe_names.join(", ")),
            ChunkKind::DataframeRename {
                old_dataframe_name,
                new_dataframe_name,
                ..
            } => format!("Renamed {} to {}", old_dataframe_name, new_dataframe_name),
            ChunkKind::DataframeDuplicate { sheet_index, .. } => {
                let source = self
                    .df_name(*sheet_index)
                    .unwrap_or("a dataframe")
                    .to_string();
                format!("Duplicated {}", source)
            }
        }
    }

    /// The mandatory statements and imports. Every returned line must
    /// succeed when the generated script runs; a chunk that cannot render
    /// consistently is a fatal transpile-invariant failure.
    pub fn code(&self) -> StepResult<CodeAndImports> {
        match &self.kind {
            ChunkKind::NoOp | ChunkKind::Empty { .. } => Ok((Vec::new(), Vec::new())),
            ChunkKind::SimpleImport {
                file_names,
                delimiters,
                encodings,
                skiprows,
                new_df_names,
            } => {
                if delimiters.len() != file_names.len()
                    || encodings.len() != file_names.len()
                    || skiprows.len() != file_names.len()
                    || new_df_names.len() != file_names.len()
                {
                    return Err(StepError::TranspileInvariant(
                        "import chunk has mismatched per-file settings".to_string(),
                    ));
                }
                let mut lines = Vec::with_capacity(file_names.len());
                for (index, (file_name, df_name)) in
                    file_names.iter().zip(new_df_names).enumerate()
                {
                    lines.push(read_csv_line(
                        file_name,
                        df_name,
                        &delimiters[index],
                        &encodings[index],
                        skiprows[index],
                    ));
                }
                Ok((lines, vec![IMPORT_PANDAS.to_string()]))
            }
            ChunkKind::AddColumn {
                sheet_index,
                column_header,
                column_header_index,
                ..
            } => {
                let df_name = self.df_name(*sheet_index)?;
                let line = if *column_header_index == -1 {
                    format!("{}[{}] = 0", df_name, py_str(column_header))
                } else {
                    format!(
                        "{}.insert({}, {}, 0)",
                        df_name,
                        column_header_index,
                        py_str(column_header)
                    )
                };
                Ok((vec![line], Vec::new()))
            }
            ChunkKind::DeleteColumns {
                sheet_index,
                column_ids,
            } => {
                let df_name = self.df_name(*sheet_index)?;
                let headers: StepResult<Vec<String>> = column_ids
                    .iter()
                    .map(|id| self.header(*sheet_index, id))
                    .collect();
                let line = format!(
                    "{}.drop({}, axis=1, inplace=True)",
                    df_name,
                    py_str_list(&headers?)
                );
                Ok((vec![line], Vec::new()))
            }
            ChunkKind::RenameColumns {
                sheet_index,
                renames,
            } => {
                let df_name = self.df_name(*sheet_index)?;
                let mut pairs = Vec::with_capacity(renames.len());
                for (column_id, new_header) in renames {
                    pairs.push((self.header(*sheet_index, column_id)?, new_header.clone()));
                }
                let line = format!(
                    "{}.rename(columns={}, inplace=True)",
                    df_name,
                    py_str_dict(&pairs)
                );
                Ok((vec![line], Vec::new()))
            }
            ChunkKind::ReorderColumn {
                sheet_index,
                column_id,
                new_column_index,
            } => {
                let df_name = self.df_name(*sheet_index)?;
                let moved = self.header(*sheet_index, column_id)?;
                let mut order: Vec<String> = self.prev_state.dfs[*sheet_index]
                    .get_column_names()
                    .iter()
                    .map(|n| n.to_string())
                    .collect();
                order.retain(|h| h != &moved);
                let index = (*new_column_index).min(order.len());
                order.insert(index, moved);
                let line = format!("{} = {}[{}]", df_name, df_name, py_str_list(&order));
                Ok((vec![line], Vec::new()))
            }
            ChunkKind::Sort {
                sheet_index,
                column_id,
                sort_direction,
            } => {
                if *sort_direction == SortDirection::None {
                    return Ok((Vec::new(), Vec::new()));
                }
                let df_name = self.df_name(*sheet_index)?;
                let header = self.header(*sheet_index, column_id)?;
                let ascending = *sort_direction == SortDirection::Ascending;
                let na_position = if ascending { "first" } else { "last" };
                let line = format!(
                    "{} = {}.sort_values(by={}, ascending={}, na_position={})",
                    df_name,
                    df_name,
                    py_str(&header),
                    py_bool(ascending),
                    py_str(na_position)
                );
                Ok((vec![line], Vec::new()))
            }
            ChunkKind::FilterColumn {
                sheet_index,
                column_id,
                operator,
                filters,
            } => {
                if filters.is_empty() {
                    return Ok((Vec::new(), Vec::new()));
                }
                let df_name = self.df_name(*sheet_index)?;
                let header = self.header(*sheet_index, column_id)?;
                let conditions: Vec<String> = filters
                    .iter()
                    .map(|f| filter_condition_code(df_name, &header, f))
                    .collect();
                let mask = if conditions.len() == 1 {
                    conditions.into_iter().next().unwrap()
                } else {
                    let joiner = match operator {
                        LogicalOperator::And => " & ",
                        LogicalOperator::Or => " | ",
                    };
                    conditions
                        .iter()
                        .map(|c| format!("({})", c))
                        .collect::<Vec<_>>()
                        .join(joiner)
                };
                let line = format!("{} = {}[{}]", df_name, df_name, mask);
                let imports = if filters.iter().any(is_datetime_condition) {
                    vec![IMPORT_PANDAS.to_string()]
                } else {
                    Vec::new()
                };
                Ok((vec![line], imports))
            }
            ChunkKind::Concat {
                join,
                ignore_index,
                sheet_indexes,
                new_df_name,
            } => {
                if sheet_indexes.is_empty() {
                    return Ok((
                        vec![format!("{} = pd.DataFrame()", new_df_name)],
                        vec![IMPORT_PANDAS.to_string()],
                    ));
                }
                let names: StepResult<Vec<&str>> = sheet_indexes
                    .iter()
                    .map(|&i| self.df_name(i))
                    .collect();
                let line = format!(
                    "{} = pd.concat([{}], join={}, ignore_index={})",
                    new_df_name,
                    names?.join(", "),
                    py_str(join.as_str()),
                    py_bool(*ignore_index)
                );
                Ok((vec![line], vec![IMPORT_PANDAS.to_string()]))
            }
            ChunkKind::Pivot {
                sheet_index,
                pivot_rows_column_ids,
                pivot_columns_column_ids,
                value_column_id,
                aggregation,
                flatten_column_headers,
                new_df_name,
                ..
            } => {
                let source = self.df_name(*sheet_index)?;
                let rows: StepResult<Vec<String>> = pivot_rows_column_ids
                    .iter()
                    .map(|id| self.header(*sheet_index, id))
                    .collect();
                let rows = rows?;
                let columns: StepResult<Vec<String>> = pivot_columns_column_ids
                    .iter()
                    .map(|id| self.header(*sheet_index, id))
                    .collect();
                let columns = columns?;
                let value = self.header(*sheet_index, value_column_id)?;

                let mut used = rows.clone();
                used.extend(columns.iter().cloned());
                if !used.contains(&value) {
                    used.push(value.clone());
                }

                let mut lines = vec![format!(
                    "tmp_df = {}[{}]",
                    source,
                    py_str_list(&used)
                )];
                let mut args = vec![format!("index={}", py_str_list(&rows))];
                if !columns.is_empty() {
                    args.push(format!("columns={}", py_str_list(&columns)));
                }
                args.push(format!("values={}", py_str_list(std::slice::from_ref(&value))));
                args.push(format!("aggfunc={}", py_str(aggregation.as_str())));
                lines.push(format!(
                    "pivot_table = tmp_df.pivot_table({})",
                    args.join(", ")
                ));
                if *flatten_column_headers && !columns.is_empty() {
                    lines.push(
                        "pivot_table.columns = ['_'.join(map(str, col)).strip('_') \
                         if isinstance(col, tuple) else str(col) for col in pivot_table.columns]"
                            .to_string(),
                    );
                }
                lines.push(format!("{} = pivot_table.reset_index()", new_df_name));
                Ok((lines, vec![IMPORT_PANDAS.to_string()]))
            }
            // The generated script never deletes variables; the chunk exists
            // so the optimizer can cascade deletes through earlier chunks.
            ChunkKind::DataframeDelete { .. } => Ok((Vec::new(), Vec::new())),
            ChunkKind::DataframeRename {
                old_dataframe_name,
                new_dataframe_name,
                ..
            } => {
                if old_dataframe_name == new_dataframe_name {
                    return Ok((Vec::new(), Vec::new()));
                }
                Ok((
                    vec![format!("{} = {}", new_dataframe_name, old_dataframe_name)],
                    Vec::new(),
                ))
            }
            ChunkKind::DataframeDuplicate {
                sheet_index,
                new_df_name,
            } => {
                let old = self.df_name(*sheet_index)?;
                Ok((
                    vec![format!("{} = {}.copy(deep=True)", new_df_name, old)],
                    Vec::new(),
                ))
            }
        }
    }

    /// Best-effort lines replayed on top of this chunk; already filtered to
    /// the prefix that executed successfully.
    pub fn optional_code_that_successfully_executed(&self) -> &CodeAndImports {
        &self.optional_code
    }

    /// Sheet indexes this chunk creates. `None` means unknown: the chunk
    /// opts out of delete-cascade optimization.
    pub fn created_sheet_indexes(&self) -> Option<Vec<usize>> {
        match &self.kind {
            ChunkKind::SimpleImport { new_df_names, .. } => {
                let start = self.prev_state.dfs.len();
                Some((start..start + new_df_names.len()).collect())
            }
            ChunkKind::Concat { .. } | ChunkKind::DataframeDuplicate { .. } => {
                Some(vec![self.prev_state.dfs.len()])
            }
            ChunkKind::Pivot {
                destination_sheet_index,
                ..
            } => match destination_sheet_index {
                // A destination at or past the end of prev_state's sheets
                // means the pivot creates its sheet here.
                Some(destination) if *destination < self.prev_state.dfs.len() => None,
                _ => Some(vec![self.prev_state.dfs.len()]),
            },
            _ => None,
        }
    }

    /// Sheet indexes this chunk edits in place. `None` means unknown.
    pub fn edited_sheet_indexes(&self) -> Option<Vec<usize>> {
        match &self.kind {
            ChunkKind::AddColumn { sheet_index, .. }
            | ChunkKind::DeleteColumns { sheet_index, .. }
            | ChunkKind::RenameColumns { sheet_index, .. }
            | ChunkKind::ReorderColumn { sheet_index, .. }
            | ChunkKind::Sort { sheet_index, .. }
            | ChunkKind::FilterColumn { sheet_index, .. }
            | ChunkKind::DataframeRename { sheet_index, .. } => Some(vec![*sheet_index]),
            ChunkKind::Pivot {
                destination_sheet_index: Some(destination),
                ..
            } if *destination < self.prev_state.dfs.len() => Some(vec![*destination]),
            _ => None,
        }
    }

    /// Sheet indexes feeding any created sheet. Empty means the created
    /// sheets have no in-state sources (a file import).
    pub fn source_sheet_indexes(&self) -> Vec<usize> {
        match &self.kind {
            ChunkKind::Concat { sheet_indexes, .. } => sheet_indexes.clone(),
            ChunkKind::DataframeDuplicate { sheet_index, .. }
            | ChunkKind::Pivot { sheet_index, .. } => vec![*sheet_index],
            _ => Vec::new(),
        }
    }

    /// Parameters eligible for later UI-driven substitution, rendered the
    /// way they appear in the generated code. Only imports expose any.
    pub fn parameterizable_params(&self) -> Vec<(ParamValue, ParamType, ParamSubtype)> {
        match &self.kind {
            ChunkKind::SimpleImport { file_names, .. } => file_names
                .iter()
                .map(|file_name| {
                    (
                        py_raw_str(file_name),
                        ParamType::Import,
                        ParamSubtype::FileNameImportCsv,
                    )
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Conservative reordering check: true only when swapping this chunk
    /// with `other` provably cannot change behavior. No-op and empty chunks
    /// always refuse, since their `prev_state` is only valid at their
    /// original position.
    pub fn can_be_reordered_with(&self, other: &CodeChunk) -> bool {
        if matches!(self.kind, ChunkKind::NoOp | ChunkKind::Empty { .. })
            || matches!(other.kind, ChunkKind::NoOp | ChunkKind::Empty { .. })
        {
            return false;
        }

        let other_edited = other.edited_sheet_indexes();

        // Don't reorder if the other chunk edits what this chunk created.
        if let (Some(created), Some(edited)) = (self.created_sheet_indexes(), &other_edited) {
            if edited.iter().any(|index| created.contains(index)) {
                return false;
            }
        }

        // Don't reorder two chunks editing the same sheet set.
        if let (Some(edited), Some(other_edited)) =
            (self.edited_sheet_indexes(), &other_edited)
        {
            let mut a = edited;
            let mut b = other_edited.clone();
            a.sort_unstable();
            b.sort_unstable();
            if a == b {
                return false;
            }
        }

        // Don't reorder if the other chunk edits where this chunk pulls from.
        if let Some(edited) = &other_edited {
            let sources = self.source_sheet_indexes();
            if edited.iter().any(|index| sources.contains(index)) {
                return false;
            }
        }

        true
    }

    /// Explicit per-variant summary for logs and assertions.
    pub fn debug_summary(&self) -> String {
        match &self.kind {
            ChunkKind::NoOp => "NoOp".to_string(),
            ChunkKind::Empty { display_name, .. } => format!("Empty({})", display_name),
            ChunkKind::SimpleImport {
                file_names,
                new_df_names,
                ..
            } => format!(
                "SimpleImport(files={:?}, names={:?})",
                file_names, new_df_names
            ),
            ChunkKind::AddColumn {
                sheet_index,
                column_header,
                ..
            } => format!("AddColumn(sheet={}, header={:?})", sheet_index, column_header),
            ChunkKind::DeleteColumns {
                sheet_index,
                column_ids,
            } => format!("DeleteColumns(sheet={}, ids={:?})", sheet_index, column_ids),
            ChunkKind::RenameColumns {
                sheet_index,
                renames,
            } => format!("RenameColumns(sheet={}, renames={:?})", sheet_index, renames),
            ChunkKind::ReorderColumn {
                sheet_index,
                column_id,
                new_column_index,
            } => format!(
                "ReorderColumn(sheet={}, id={:?}, to={})",
                sheet_index, column_id, new_column_index
            ),
            ChunkKind::Sort {
                sheet_index,
                column_id,
                ..
            } => format!("Sort(sheet={}, id={:?})", sheet_index, column_id),
            ChunkKind::FilterColumn {
                sheet_index,
                column_id,
                filters,
                ..
            } => format!(
                "FilterColumn(sheet={}, id={:?}, conditions={})",
                sheet_index,
                column_id,
                filters.len()
            ),
            ChunkKind::Concat {
                sheet_indexes,
                new_df_name,
                ..
            } => format!("Concat(sheets={:?}, into={})", sheet_indexes, new_df_name),
            ChunkKind::Pivot {
                sheet_index,
                destination_sheet_index,
                new_df_name,
                ..
            } => format!(
                "Pivot(sheet={}, destination={:?}, into={})",
                sheet_index, destination_sheet_index, new_df_name
            ),
            ChunkKind::DataframeDelete {
                sheet_indexes,
                old_dataframe_names,
            } => format!(
                "DataframeDelete(sheets={:?}, names={:?})",
                sheet_indexes, old_dataframe_names
            ),
            ChunkKind::DataframeRename {
                sheet_index,
                old_dataframe_name,
                new_dataframe_name,
            } => format!(
                "DataframeRename(sheet={}, {} -> {})",
                sheet_index, old_dataframe_name, new_dataframe_name
            ),
            ChunkKind::DataframeDuplicate {
                sheet_index,
                new_df_name,
            } => format!(
                "DataframeDuplicate(sheet={}, into={})",
                sheet_index, new_df_name
            ),
        }
    }
}

/// Renders one `pd.read_csv` call, eliding parameters at their pandas
/// defaults (comma separator, utf-8, no skipped rows).
pub fn read_csv_line(
    file_name: &str,
    df_name: &str,
    delimiter: &str,
    encoding: &str,
    skiprows: usize,
) -> String {
    let mut params = Vec::new();
    if delimiter != "," {
        params.push(format!("sep={}", py_str(delimiter)));
    }
    if !encoding.eq_ignore_ascii_case("utf-8") {
        params.push(format!("encoding={}", py_str(encoding)));
    }
    if skiprows != 0 {
        params.push(format!("skiprows={}", skiprows));
    }
    if params.is_empty() {
        format!("{} = pd.read_csv({})", df_name, py_raw_str(file_name))
    } else {
        format!(
            "{} = pd.read_csv({}, {})",
            df_name,
            py_raw_str(file_name),
            params.join(", ")
        )
    }
}

fn is_datetime_condition(condition: &FilterCondition) -> bool {
    matches!(
        condition,
        FilterCondition::DatetimeExactly(_)
            | FilterCondition::DatetimeGreater(_)
            | FilterCondition::DatetimeLess(_)
    )
}

/// One pandas boolean-mask expression for a filter condition.
fn filter_condition_code(df_name: &str, header: &str, condition: &FilterCondition) -> String {
    let column = format!("{}[{}]", df_name, py_str(header));
    match condition {
        FilterCondition::NumberExactly(v) => format!("{} == {}", column, v),
        FilterCondition::NumberNotExactly(v) => format!("{} != {}", column, v),
        FilterCondition::NumberGreater(v) => format!("{} > {}", column, v),
        FilterCondition::NumberGreaterThanOrEqual(v) => format!("{} >= {}", column, v),
        FilterCondition::NumberLess(v) => format!("{} < {}", column, v),
        FilterCondition::NumberLessThanOrEqual(v) => format!("{} <= {}", column, v),
        FilterCondition::StringContains(v) => format!(
            "{}.str.contains({}, na=False, regex=False)",
            column,
            py_str(v)
        ),
        FilterCondition::StringDoesNotContain(v) => format!(
            "~{}.str.contains({}, na=False, regex=False)",
            column,
            py_str(v)
        ),
        FilterCondition::StringExactly(v) => format!("{} == {}", column, py_str(v)),
        FilterCondition::StringNotExactly(v) => format!("{} != {}", column, py_str(v)),
        FilterCondition::StringStartsWith(v) => {
            format!("{}.str.startswith({}, na=False)", column, py_str(v))
        }
        FilterCondition::StringEndsWith(v) => {
            format!("{}.str.endswith({}, na=False)", column, py_str(v))
        }
        FilterCondition::BooleanIsTrue => format!("{} == True", column),
        FilterCondition::BooleanIsFalse => format!("{} == False", column),
        FilterCondition::DatetimeExactly(v) => {
            format!("{} == pd.to_datetime({})", column, py_str(v))
        }
        FilterCondition::DatetimeGreater(v) => {
            format!("{} > pd.to_datetime({})", column, py_str(v))
        }
        FilterCondition::DatetimeLess(v) => {
            format!("{} < pd.to_datetime({})", column, py_str(v))
        }
        FilterCondition::Empty => format!("{}.isna()", column),
        FilterCondition::NotEmpty => format!("{}.notnull()", column),
    }
}
