//! The step-performer catalog.
//!
//! One module per family of step types. Each performer validates its
//! parameters against the previous state, executes the real data work with
//! polars, and transpiles to pandas code chunks. The shared column
//! operations live here so pivot regeneration can replay edits through the
//! exact same code paths the original steps used.

pub mod column_steps;
pub mod concat;
pub mod dataframe_steps;
pub mod graph;
pub mod pivot;
pub mod simple_import;
pub mod sort_filter;

use polars::prelude::*;

use crate::chunks::ChunkKind;
use crate::column_ids::ColumnId;
use crate::errors::{StepError, StepResult};
use crate::params::{ColumnEdit, FilterCondition, LogicalOperator, SortDirection};
use crate::state::State;

/// Renames one column in place, keeping the id stable. Fails before any
/// mutation when the id is unknown or the target header is taken.
pub(crate) fn rename_df_column(
    state: &mut State,
    sheet_index: usize,
    column_id: &ColumnId,
    new_header: &str,
) -> StepResult<()> {
    let df_name = state.df_names[sheet_index].clone();
    let old_header = state
        .column_ids
        .header_or_err(sheet_index, column_id, &df_name)?;
    if state
        .column_ids
        .get_id_by_header(sheet_index, new_header)
        .is_some()
    {
        return Err(StepError::ColumnExists(new_header.to_string()));
    }
    let mut df = state.dfs[sheet_index].clone();
    df.rename(&old_header, new_header.into())?;
    state.dfs[sheet_index] = df;
    state
        .column_ids
        .set_column_header(sheet_index, column_id, new_header);
    Ok(())
}

/// Drops columns by id, from the dataframe and every metadata map.
pub(crate) fn delete_df_columns(
    state: &mut State,
    sheet_index: usize,
    column_ids: &[ColumnId],
) -> StepResult<()> {
    let df_name = state.df_names[sheet_index].clone();
    let mut deleted_headers = Vec::with_capacity(column_ids.len());
    for column_id in column_ids {
        deleted_headers.push(state.column_ids.header_or_err(
            sheet_index,
            column_id,
            &df_name,
        )?);
    }
    let kept: Vec<String> = state.dfs[sheet_index]
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .filter(|name| !deleted_headers.contains(name))
        .collect();
    let selected = state.dfs[sheet_index].select(kept)?;
    state.dfs[sheet_index] = selected;
    for column_id in column_ids {
        state.remove_column_from_state(sheet_index, column_id);
    }
    Ok(())
}

/// Moves one column to a new position, clamping past-the-end indexes.
pub(crate) fn reorder_df_column(
    state: &mut State,
    sheet_index: usize,
    column_id: &ColumnId,
    new_column_index: usize,
) -> StepResult<()> {
    let df_name = state.df_names[sheet_index].clone();
    let header = state
        .column_ids
        .header_or_err(sheet_index, column_id, &df_name)?;
    let mut order: Vec<String> = state.dfs[sheet_index]
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    order.retain(|h| h != &header);
    let index = new_column_index.min(order.len());
    order.insert(index, header);
    let selected = state.dfs[sheet_index].select(order)?;
    state.dfs[sheet_index] = selected;
    Ok(())
}

/// Sorts by one column. Ascending puts nulls first, matching the ordering
/// of the generated pandas code.
pub(crate) fn sort_df(
    state: &mut State,
    sheet_index: usize,
    column_id: &ColumnId,
    direction: SortDirection,
) -> StepResult<()> {
    let df_name = state.df_names[sheet_index].clone();
    let header = state
        .column_ids
        .header_or_err(sheet_index, column_id, &df_name)?;
    if direction == SortDirection::None {
        return Ok(());
    }
    let descending = direction == SortDirection::Descending;
    let sorted = state.dfs[sheet_index].sort(
        [header.as_str()],
        SortMultipleOptions::default()
            .with_order_descending(descending)
            .with_nulls_last(descending),
    )?;
    state.dfs[sheet_index] = sorted;
    Ok(())
}

/// Replaces the filter set of one column and applies it to the sheet.
pub(crate) fn filter_df(
    state: &mut State,
    sheet_index: usize,
    column_id: &ColumnId,
    operator: LogicalOperator,
    filters: &[FilterCondition],
) -> StepResult<()> {
    let df_name = state.df_names[sheet_index].clone();
    let header = state
        .column_ids
        .header_or_err(sheet_index, column_id, &df_name)?;

    let mut combined: Option<Expr> = None;
    for condition in filters {
        let expr = filter_condition_expr(&header, condition)?;
        combined = Some(match combined {
            Some(acc) => match operator {
                LogicalOperator::And => acc.and(expr),
                LogicalOperator::Or => acc.or(expr),
            },
            None => expr,
        });
    }
    if let Some(expr) = combined {
        let filtered = state.dfs[sheet_index].clone().lazy().filter(expr).collect()?;
        state.dfs[sheet_index] = filtered;
    }
    state.column_filters[sheet_index].insert(
        column_id.clone(),
        crate::params::FilterSet {
            operator,
            filters: filters.to_vec(),
        },
    );
    Ok(())
}

/// Builds the polars expression for one filter condition.
fn filter_condition_expr(header: &str, condition: &FilterCondition) -> StepResult<Expr> {
    let column = col(header);
    Ok(match condition {
        FilterCondition::NumberExactly(v) => column.eq(lit(*v)),
        FilterCondition::NumberNotExactly(v) => column.neq(lit(*v)),
        FilterCondition::NumberGreater(v) => column.gt(lit(*v)),
        FilterCondition::NumberGreaterThanOrEqual(v) => column.gt_eq(lit(*v)),
        FilterCondition::NumberLess(v) => column.lt(lit(*v)),
        FilterCondition::NumberLessThanOrEqual(v) => column.lt_eq(lit(*v)),
        FilterCondition::StringContains(v) => {
            column.str().contains_literal(lit(v.as_str()))
        }
        FilterCondition::StringDoesNotContain(v) => {
            column.str().contains_literal(lit(v.as_str())).not()
        }
        FilterCondition::StringExactly(v) => column.eq(lit(v.as_str())),
        FilterCondition::StringNotExactly(v) => column.neq(lit(v.as_str())),
        FilterCondition::StringStartsWith(v) => column.str().starts_with(lit(v.as_str())),
        FilterCondition::StringEndsWith(v) => column.str().ends_with(lit(v.as_str())),
        FilterCondition::BooleanIsTrue => column.eq(lit(true)),
        FilterCondition::BooleanIsFalse => column.eq(lit(false)),
        FilterCondition::DatetimeExactly(v) => column.eq(datetime_expr(v)?),
        FilterCondition::DatetimeGreater(v) => column.gt(datetime_expr(v)?),
        FilterCondition::DatetimeLess(v) => column.lt(datetime_expr(v)?),
        FilterCondition::Empty => column.is_null(),
        FilterCondition::NotEmpty => column.is_not_null(),
    })
}

/// Parses an ISO datetime (or date) literal into a datetime expression.
/// Invalid values fail validation before any state is touched.
fn datetime_expr(value: &str) -> StepResult<Expr> {
    let format = if value.contains('T') {
        chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").map_err(|_| {
            StepError::InvalidParameter(format!("invalid datetime literal {:?}", value))
        })?;
        "%Y-%m-%dT%H:%M:%S"
    } else {
        chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            StepError::InvalidParameter(format!("invalid date literal {:?}", value))
        })?;
        "%Y-%m-%d"
    };
    let options = StrptimeOptions {
        format: Some(format.into()),
        ..Default::default()
    };
    Ok(lit(value)
        .str()
        .to_datetime(Some(TimeUnit::Microseconds), None, options, lit("raise")))
}

/// Applies a replayable column edit through the same helpers the original
/// steps used.
pub(crate) fn apply_column_edit(
    state: &mut State,
    sheet_index: usize,
    edit: &ColumnEdit,
) -> StepResult<()> {
    match edit {
        ColumnEdit::RenameColumn {
            column_id,
            new_column_header,
        } => rename_df_column(state, sheet_index, column_id, new_column_header),
        ColumnEdit::DeleteColumns { column_ids } => {
            delete_df_columns(state, sheet_index, column_ids)
        }
        ColumnEdit::ReorderColumn {
            column_id,
            new_column_index,
        } => reorder_df_column(state, sheet_index, column_id, *new_column_index),
        ColumnEdit::Sort {
            column_id,
            sort_direction,
        } => sort_df(state, sheet_index, column_id, *sort_direction),
        ColumnEdit::FilterColumn {
            column_id,
            operator,
            filters,
        } => filter_df(state, sheet_index, column_id, *operator, filters),
    }
}

/// The chunk payload whose generated code performs the given edit.
pub(crate) fn chunk_kind_for_edit(sheet_index: usize, edit: &ColumnEdit) -> ChunkKind {
    match edit {
        ColumnEdit::RenameColumn {
            column_id,
            new_column_header,
        } => ChunkKind::RenameColumns {
            sheet_index,
            renames: vec![(column_id.clone(), new_column_header.clone())],
        },
        ColumnEdit::DeleteColumns { column_ids } => ChunkKind::DeleteColumns {
            sheet_index,
            column_ids: column_ids.clone(),
        },
        ColumnEdit::ReorderColumn {
            column_id,
            new_column_index,
        } => ChunkKind::ReorderColumn {
            sheet_index,
            column_id: column_id.clone(),
            new_column_index: *new_column_index,
        },
        ColumnEdit::Sort {
            column_id,
            sort_direction,
        } => ChunkKind::Sort {
            sheet_index,
            column_id: column_id.clone(),
            sort_direction: *sort_direction,
        },
        ColumnEdit::FilterColumn {
            column_id,
            operator,
            filters,
        } => ChunkKind::FilterColumn {
            sheet_index,
            column_id: column_id.clone(),
            operator: *operator,
            filters: filters.clone(),
        },
    }
}
