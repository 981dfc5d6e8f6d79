//! Validated step parameters.
//!
//! Each step type carries its own parameter struct, collected into the
//! closed `StepParams` enum. The serde tag doubles as the persisted
//! `step_type` string, so saving and replaying analyses round-trips through
//! the same schema the registry dispatches on.

use serde::{Deserialize, Serialize};

use crate::column_ids::ColumnId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
    /// A recorded sort that applies no ordering. Generates no code.
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
}

/// One filter condition on a column. Datetime values are ISO-8601 strings
/// (`YYYY-MM-DDTHH:MM:SS`), validated at execution time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", content = "value", rename_all = "snake_case")]
pub enum FilterCondition {
    NumberExactly(f64),
    NumberNotExactly(f64),
    NumberGreater(f64),
    NumberGreaterThanOrEqual(f64),
    NumberLess(f64),
    NumberLessThanOrEqual(f64),
    StringContains(String),
    StringDoesNotContain(String),
    StringExactly(String),
    StringNotExactly(String),
    StringStartsWith(String),
    StringEndsWith(String),
    BooleanIsTrue,
    BooleanIsFalse,
    DatetimeExactly(String),
    DatetimeGreater(String),
    DatetimeLess(String),
    Empty,
    NotEmpty,
}

/// The active filters of one column: conditions joined by And/Or.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub operator: LogicalOperator,
    pub filters: Vec<FilterCondition>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            operator: LogicalOperator::And,
            filters: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcatJoin {
    Inner,
    Outer,
}

impl ConcatJoin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Outer => "outer",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotAggregation {
    Count,
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Std,
    First,
    Last,
}

impl PivotAggregation {
    /// The pandas aggfunc name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Std => "std",
            Self::First => "first",
            Self::Last => "last",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimpleImportParams {
    pub file_names: Vec<String>,
    /// When absent, the importer sniffs a delimiter per file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiters: Option<Vec<String>>,
    /// When absent, the importer probes the encoding per file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encodings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skiprows: Option<Vec<usize>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddColumnParams {
    pub sheet_index: usize,
    pub column_header: String,
    /// Position for the new column; out of range means "append".
    pub column_header_index: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteColumnsParams {
    pub sheet_index: usize,
    pub column_ids: Vec<ColumnId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenameColumnParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
    pub new_column_header: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReorderColumnParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
    pub new_column_index: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
    pub sort_direction: SortDirection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterColumnParams {
    pub sheet_index: usize,
    pub column_id: ColumnId,
    pub operator: LogicalOperator,
    pub filters: Vec<FilterCondition>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConcatParams {
    pub join: ConcatJoin,
    pub ignore_index: bool,
    pub sheet_indexes: Vec<usize>,
}

/// One column-level edit that can be replayed on top of a regenerated
/// sheet. Saturation collects these from the steps that edited the old
/// pivot; execution re-applies them best-effort, stopping at the first
/// failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum ColumnEdit {
    RenameColumn {
        column_id: ColumnId,
        new_column_header: String,
    },
    DeleteColumns {
        column_ids: Vec<ColumnId>,
    },
    ReorderColumn {
        column_id: ColumnId,
        new_column_index: usize,
    },
    Sort {
        column_id: ColumnId,
        sort_direction: SortDirection,
    },
    FilterColumn {
        column_id: ColumnId,
        operator: LogicalOperator,
        filters: Vec<FilterCondition>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PivotParams {
    pub sheet_index: usize,
    /// Set when this pivot overwrites an earlier pivot's sheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_sheet_index: Option<usize>,
    pub pivot_rows_column_ids: Vec<ColumnId>,
    pub pivot_columns_column_ids: Vec<ColumnId>,
    pub value_column_id: ColumnId,
    pub aggregation: PivotAggregation,
    pub flatten_column_headers: bool,
    /// Filled by saturation: the edits made on top of the overwritten pivot,
    /// replayed optimistically after regeneration.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits_to_replay: Vec<ColumnEdit>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataframeDeleteParams {
    pub sheet_index: usize,
    /// Captured by saturate so undo/replay keeps the name after the sheet
    /// is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_dataframe_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataframeRenameParams {
    pub sheet_index: usize,
    pub new_dataframe_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_dataframe_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataframeDuplicateParams {
    pub sheet_index: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphParams {
    pub graph_id: String,
    pub graph_type: String,
    pub sheet_index: usize,
    pub x_axis_column_ids: Vec<ColumnId>,
    pub y_axis_column_ids: Vec<ColumnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_tab_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphRenameParams {
    pub graph_id: String,
    pub new_graph_tab_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_graph_tab_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphDeleteParams {
    pub graph_id: String,
}

/// The closed step-parameter registry. The serde tag is the persisted
/// step-type string; unknown tags fail deserialization and surface as
/// unsupported-step errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "snake_case")]
pub enum StepParams {
    SimpleImport(SimpleImportParams),
    AddColumn(AddColumnParams),
    DeleteColumns(DeleteColumnsParams),
    RenameColumn(RenameColumnParams),
    ReorderColumn(ReorderColumnParams),
    Sort(SortParams),
    FilterColumn(FilterColumnParams),
    Concat(ConcatParams),
    Pivot(PivotParams),
    DataframeDelete(DataframeDeleteParams),
    DataframeRename(DataframeRenameParams),
    DataframeDuplicate(DataframeDuplicateParams),
    Graph(GraphParams),
    GraphRename(GraphRenameParams),
    GraphDelete(GraphDeleteParams),
}

impl StepParams {
    pub fn step_type(&self) -> &'static str {
        match self {
            Self::SimpleImport(_) => "simple_import",
            Self::AddColumn(_) => "add_column",
            Self::DeleteColumns(_) => "delete_columns",
            Self::RenameColumn(_) => "rename_column",
            Self::ReorderColumn(_) => "reorder_column",
            Self::Sort(_) => "sort",
            Self::FilterColumn(_) => "filter_column",
            Self::Concat(_) => "concat",
            Self::Pivot(_) => "pivot",
            Self::DataframeDelete(_) => "dataframe_delete",
            Self::DataframeRename(_) => "dataframe_rename",
            Self::DataframeDuplicate(_) => "dataframe_duplicate",
            Self::Graph(_) => "graph",
            Self::GraphRename(_) => "graph_rename",
            Self::GraphDelete(_) => "graph_delete",
        }
    }

    /// Bumped whenever the parameter schema of a step changes.
    pub fn step_version(&self) -> u32 {
        match self {
            Self::SimpleImport(_) => 2,
            Self::AddColumn(_) => 2,
            Self::DeleteColumns(_) => 3,
            Self::RenameColumn(_) => 2,
            Self::ReorderColumn(_) => 2,
            Self::Sort(_) => 2,
            Self::FilterColumn(_) => 4,
            Self::Concat(_) => 1,
            Self::Pivot(_) => 8,
            Self::DataframeDelete(_) => 1,
            Self::DataframeRename(_) => 1,
            Self::DataframeDuplicate(_) => 1,
            Self::Graph(_) => 4,
            Self::GraphRename(_) => 1,
            Self::GraphDelete(_) => 1,
        }
    }
}

/// A parameter value eligible for later UI-driven substitution, as rendered
/// in the generated code.
pub type ParamValue = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Import,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSubtype {
    FileNameImportCsv,
}
