//! Stable column identifiers.
//!
//! Every column header is assigned a static `column_id` the first time it is
//! seen, and all per-column metadata is keyed by id, not by header. Renaming
//! or reordering a column leaves its id untouched, so the rest of the
//! analysis can keep pointing at the same column.

use std::collections::HashMap;

use polars::prelude::DataFrame;

use crate::errors::{StepError, StepResult};

pub type ColumnId = String;

/// The id minted for a header. Ids are just the header text at mint time;
/// they only diverge from headers after a rename.
pub fn column_id_for_header(header: &str) -> ColumnId {
    header.to_string()
}

/// Per-sheet bidirectional mapping between column ids and column headers.
///
/// The two maps for a sheet are always updated together; the per-sheet
/// vectors are kept in lock-step with `State.dfs` by the state mutation
/// helpers.
#[derive(Debug, Clone, Default)]
pub struct ColumnIdMap {
    id_to_header: Vec<HashMap<ColumnId, String>>,
    header_to_id: Vec<HashMap<String, ColumnId>>,
}

impl ColumnIdMap {
    pub fn new(dfs: &[DataFrame]) -> Self {
        let mut map = Self::default();
        for df in dfs {
            map.add_df(df, None);
        }
        map
    }

    pub fn num_sheets(&self) -> usize {
        self.id_to_header.len()
    }

    /// Registers the columns of a dataframe. With `sheet_index` set, replaces
    /// that sheet's mapping (overwrite import / regenerated pivot); otherwise
    /// appends a new sheet. Returns the ids in column order.
    pub fn add_df(&mut self, df: &DataFrame, sheet_index: Option<usize>) -> Vec<ColumnId> {
        let mut id_to_header = HashMap::new();
        let mut header_to_id = HashMap::new();
        let mut ids = Vec::with_capacity(df.width());
        for name in df.get_column_names() {
            let header = name.to_string();
            let id = column_id_for_header(&header);
            id_to_header.insert(id.clone(), header.clone());
            header_to_id.insert(header, id.clone());
            ids.push(id);
        }
        match sheet_index {
            Some(index) => {
                self.id_to_header[index] = id_to_header;
                self.header_to_id[index] = header_to_id;
            }
            None => {
                self.id_to_header.push(id_to_header);
                self.header_to_id.push(header_to_id);
            }
        }
        ids
    }

    /// Registers a single new column on an existing sheet and returns its id.
    pub fn add_column_header(&mut self, sheet_index: usize, header: &str) -> ColumnId {
        let id = column_id_for_header(header);
        self.id_to_header[sheet_index].insert(id.clone(), header.to_string());
        self.header_to_id[sheet_index].insert(header.to_string(), id.clone());
        id
    }

    /// Drops the mapping of a whole sheet. Later sheets shift down by one.
    pub fn remove_df(&mut self, sheet_index: usize) {
        self.id_to_header.remove(sheet_index);
        self.header_to_id.remove(sheet_index);
    }

    /// Points an existing id at a new header (a rename). The id survives.
    pub fn set_column_header(&mut self, sheet_index: usize, column_id: &str, new_header: &str) {
        if let Some(old_header) = self.id_to_header[sheet_index].get(column_id).cloned() {
            self.header_to_id[sheet_index].remove(&old_header);
        }
        self.id_to_header[sheet_index].insert(column_id.to_string(), new_header.to_string());
        self.header_to_id[sheet_index].insert(new_header.to_string(), column_id.to_string());
    }

    /// Removes a single column id from a sheet (a column delete).
    pub fn remove_column_id(&mut self, sheet_index: usize, column_id: &str) {
        if let Some(header) = self.id_to_header[sheet_index].remove(column_id) {
            self.header_to_id[sheet_index].remove(&header);
        }
    }

    pub fn has_column_id(&self, sheet_index: usize, column_id: &str) -> bool {
        self.id_to_header
            .get(sheet_index)
            .is_some_and(|m| m.contains_key(column_id))
    }

    pub fn get_header_by_id(&self, sheet_index: usize, column_id: &str) -> Option<&str> {
        self.id_to_header
            .get(sheet_index)
            .and_then(|m| m.get(column_id))
            .map(String::as_str)
    }

    pub fn get_id_by_header(&self, sheet_index: usize, header: &str) -> Option<&str> {
        self.header_to_id
            .get(sheet_index)
            .and_then(|m| m.get(header))
            .map(String::as_str)
    }

    /// Header lookup that surfaces a typed error naming the dataframe, for
    /// use inside step validation.
    pub fn header_or_err(
        &self,
        sheet_index: usize,
        column_id: &str,
        df_name: &str,
    ) -> StepResult<String> {
        self.get_header_by_id(sheet_index, column_id)
            .map(String::from)
            .ok_or_else(|| StepError::NoColumn {
                column_id: column_id.to_string(),
                df_name: df_name.to_string(),
            })
    }

    /// All ids of a sheet, unordered.
    pub fn column_ids(&self, sheet_index: usize) -> Vec<ColumnId> {
        self.id_to_header
            .get(sheet_index)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn two_sheet_map() -> ColumnIdMap {
        let a = df!("x" => [1, 2], "y" => [3, 4]).unwrap();
        let b = df!("name" => ["ann", "bob"]).unwrap();
        ColumnIdMap::new(&[a, b])
    }

    #[test]
    fn ids_match_headers_at_creation() {
        let map = two_sheet_map();
        assert_eq!(map.get_header_by_id(0, "x"), Some("x"));
        assert_eq!(map.get_id_by_header(1, "name"), Some("name"));
        assert_eq!(map.num_sheets(), 2);
    }

    #[test]
    fn rename_keeps_id_stable() {
        let mut map = two_sheet_map();
        map.set_column_header(0, "x", "weight");
        assert_eq!(map.get_header_by_id(0, "x"), Some("weight"));
        assert_eq!(map.get_id_by_header(0, "weight"), Some("x"));
        assert_eq!(map.get_id_by_header(0, "x"), None);
    }

    #[test]
    fn remove_df_shifts_sheets() {
        let mut map = two_sheet_map();
        map.remove_df(0);
        assert_eq!(map.num_sheets(), 1);
        assert_eq!(map.get_header_by_id(0, "name"), Some("name"));
    }

    #[test]
    fn remove_column_id_clears_both_directions() {
        let mut map = two_sheet_map();
        map.remove_column_id(0, "y");
        assert!(!map.has_column_id(0, "y"));
        assert_eq!(map.get_id_by_header(0, "y"), None);
        assert!(map.has_column_id(0, "x"));
    }
}
