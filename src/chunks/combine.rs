//! Chunk combination rules.
//!
//! Given adjacent chunks `[A, B]`, `A.combine_right(B)` and
//! `B.combine_left(A)` each return a single replacement chunk or `None`.
//! Right combinations run first across the whole sequence; left
//! combinations express the rules that flow backwards, chiefly the
//! dataframe-delete cascade where one delete can retroactively erase every
//! chunk that only fed the deleted sheet.

use std::collections::HashSet;

use super::{ChunkKind, CodeChunk};

impl CodeChunk {
    /// `[A, B] -> [A.combine_right(B)]` when `self` (A) can absorb the
    /// following chunk. The replacement keeps A's `prev_state`, the
    /// earliest surviving one.
    pub fn combine_right(&self, other: &CodeChunk) -> Option<CodeChunk> {
        match (&self.kind, &other.kind) {
            // A no-op always hands its place to whatever follows.
            (ChunkKind::NoOp, _) => Some(rebind(other, self)),
            (ChunkKind::Empty { optimize_right, .. }, _) => {
                if *optimize_right {
                    Some(rebind(other, self))
                } else {
                    None
                }
            }
            (
                ChunkKind::SimpleImport {
                    file_names,
                    delimiters,
                    encodings,
                    skiprows,
                    new_df_names,
                },
                ChunkKind::SimpleImport {
                    file_names: other_files,
                    delimiters: other_delimiters,
                    encodings: other_encodings,
                    skiprows: other_skiprows,
                    new_df_names: other_names,
                },
            ) => Some(CodeChunk::new(
                self.prev_state.clone(),
                ChunkKind::SimpleImport {
                    file_names: concat_vecs(file_names, other_files),
                    delimiters: concat_vecs(delimiters, other_delimiters),
                    encodings: concat_vecs(encodings, other_encodings),
                    skiprows: concat_vecs(skiprows, other_skiprows),
                    new_df_names: concat_vecs(new_df_names, other_names),
                },
            )),
            (
                ChunkKind::AddColumn {
                    sheet_index,
                    new_column_id,
                    ..
                },
                ChunkKind::DeleteColumns {
                    sheet_index: delete_sheet,
                    column_ids,
                },
            ) if sheet_index == delete_sheet && column_ids.contains(new_column_id) => {
                if column_ids.len() == 1 {
                    Some(CodeChunk::new(self.prev_state.clone(), ChunkKind::NoOp))
                } else {
                    let remaining: Vec<String> = column_ids
                        .iter()
                        .filter(|id| *id != new_column_id)
                        .cloned()
                        .collect();
                    Some(CodeChunk::new(
                        self.prev_state.clone(),
                        ChunkKind::DeleteColumns {
                            sheet_index: *delete_sheet,
                            column_ids: remaining,
                        },
                    ))
                }
            }
            (
                ChunkKind::AddColumn {
                    sheet_index,
                    column_header_index,
                    new_column_id,
                    ..
                },
                ChunkKind::RenameColumns {
                    sheet_index: rename_sheet,
                    renames,
                },
            ) if sheet_index == rename_sheet
                && renames.len() == 1
                && renames[0].0 == *new_column_id =>
            {
                Some(CodeChunk::new(
                    self.prev_state.clone(),
                    ChunkKind::AddColumn {
                        sheet_index: *sheet_index,
                        column_header: renames[0].1.clone(),
                        column_header_index: *column_header_index,
                        new_column_id: new_column_id.clone(),
                    },
                ))
            }
            (
                ChunkKind::RenameColumns {
                    sheet_index,
                    renames,
                },
                ChunkKind::RenameColumns {
                    sheet_index: other_sheet,
                    renames: other_renames,
                },
            ) if sheet_index == other_sheet => {
                let mut merged = renames.clone();
                for (id, header) in other_renames {
                    match merged.iter_mut().find(|(existing, _)| existing == id) {
                        Some(entry) => entry.1 = header.clone(),
                        None => merged.push((id.clone(), header.clone())),
                    }
                }
                Some(CodeChunk::new(
                    self.prev_state.clone(),
                    ChunkKind::RenameColumns {
                        sheet_index: *sheet_index,
                        renames: merged,
                    },
                ))
            }
            (
                ChunkKind::RenameColumns {
                    sheet_index,
                    renames,
                },
                ChunkKind::DeleteColumns {
                    sheet_index: delete_sheet,
                    column_ids,
                },
            ) if sheet_index == delete_sheet => {
                let deleted: HashSet<&str> = column_ids.iter().map(String::as_str).collect();
                if renames.iter().all(|(id, _)| deleted.contains(id.as_str())) {
                    // Every renamed column is deleted anyway; keep only the
                    // delete, resolved against the pre-rename state.
                    Some(CodeChunk::new(
                        self.prev_state.clone(),
                        ChunkKind::DeleteColumns {
                            sheet_index: *delete_sheet,
                            column_ids: column_ids.clone(),
                        },
                    ))
                } else {
                    None
                }
            }
            (
                ChunkKind::DeleteColumns {
                    sheet_index,
                    column_ids,
                },
                ChunkKind::DeleteColumns {
                    sheet_index: other_sheet,
                    column_ids: other_ids,
                },
            ) if sheet_index == other_sheet => {
                let mut merged = column_ids.clone();
                for id in other_ids {
                    if !merged.contains(id) {
                        merged.push(id.clone());
                    }
                }
                Some(CodeChunk::new(
                    self.prev_state.clone(),
                    ChunkKind::DeleteColumns {
                        sheet_index: *sheet_index,
                        column_ids: merged,
                    },
                ))
            }
            (
                ChunkKind::ReorderColumn {
                    sheet_index,
                    column_id,
                    ..
                },
                ChunkKind::ReorderColumn {
                    sheet_index: other_sheet,
                    column_id: other_id,
                    new_column_index,
                },
            ) if sheet_index == other_sheet && column_id == other_id => {
                // Two moves of the same column collapse to the later one.
                Some(CodeChunk::new(
                    self.prev_state.clone(),
                    ChunkKind::ReorderColumn {
                        sheet_index: *sheet_index,
                        column_id: column_id.clone(),
                        new_column_index: *new_column_index,
                    },
                ))
            }
            (
                ChunkKind::DataframeDelete {
                    sheet_indexes,
                    old_dataframe_names,
                },
                ChunkKind::DataframeDelete {
                    sheet_indexes: other_indexes,
                    old_dataframe_names: other_names,
                },
            ) => {
                // The later delete's indexes are relative to a state where the
                // earlier deletes already happened; re-base them so both sets
                // name sheets of the earlier prev_state.
                let mut rebased = other_indexes.clone();
                for &first in sheet_indexes {
                    for index in rebased.iter_mut() {
                        if first <= *index {
                            *index += 1;
                        }
                    }
                }
                let mut combined_indexes = sheet_indexes.clone();
                combined_indexes.extend(rebased);
                let mut combined_names = old_dataframe_names.clone();
                combined_names.extend(other_names.iter().cloned());
                Some(CodeChunk::new(
                    self.prev_state.clone(),
                    ChunkKind::DataframeDelete {
                        sheet_indexes: combined_indexes,
                        old_dataframe_names: combined_names,
                    },
                ))
            }
            _ => None,
        }
    }

    /// `[A, B] -> [B.combine_left(A)]` when `self` (B) can absorb the
    /// preceding chunk. The replacement adopts A's `prev_state`.
    pub fn combine_left(&self, other: &CodeChunk) -> Option<CodeChunk> {
        match &self.kind {
            ChunkKind::DataframeDelete {
                sheet_indexes,
                old_dataframe_names,
            } => {
                // Dataframe renames shift names underneath the delete; the
                // combination is not worth its complexity, so skip it.
                if matches!(other.kind, ChunkKind::DataframeRename { .. }) {
                    return None;
                }

                let deleted: HashSet<usize> = sheet_indexes.iter().copied().collect();

                if let Some(created) = other.created_sheet_indexes() {
                    let created_set: HashSet<usize> = created.iter().copied().collect();
                    if created_set == deleted {
                        // All the delete removes is what the other chunk
                        // created; both disappear.
                        return Some(CodeChunk::new(
                            other.prev_state.clone(),
                            ChunkKind::NoOp,
                        ));
                    }
                    if created_set.is_subset(&deleted) {
                        // Drop the created sheets from the delete and skip
                        // the creator entirely.
                        let mut remaining_indexes = Vec::new();
                        let mut remaining_names = Vec::new();
                        for (index, name) in
                            sheet_indexes.iter().zip(old_dataframe_names)
                        {
                            if !created_set.contains(index) {
                                remaining_indexes.push(*index);
                                remaining_names.push(name.clone());
                            }
                        }
                        return Some(CodeChunk::new(
                            other.prev_state.clone(),
                            ChunkKind::DataframeDelete {
                                sheet_indexes: remaining_indexes,
                                old_dataframe_names: remaining_names,
                            },
                        ));
                    }
                }

                if let Some(edited) = other.edited_sheet_indexes() {
                    if edited.iter().all(|index| deleted.contains(index)) {
                        // The other chunk only edited sheets this delete
                        // removes; the edit never needs to happen.
                        return Some(CodeChunk::new(
                            other.prev_state.clone(),
                            self.kind.clone(),
                        ));
                    }
                }

                None
            }
            ChunkKind::DataframeRename {
                sheet_index,
                new_dataframe_name,
                ..
            } => match &other.kind {
                ChunkKind::DataframeRename {
                    sheet_index: earlier_sheet,
                    old_dataframe_name: earlier_old,
                    ..
                } if earlier_sheet == sheet_index => Some(CodeChunk::new(
                    other.prev_state.clone(),
                    ChunkKind::DataframeRename {
                        sheet_index: *sheet_index,
                        old_dataframe_name: earlier_old.clone(),
                        new_dataframe_name: new_dataframe_name.clone(),
                    },
                )),
                ChunkKind::Pivot {
                    destination_sheet_index,
                    ..
                } if *sheet_index
                    == destination_sheet_index.unwrap_or(other.prev_state.dfs.len()) =>
                {
                    let mut kind = other.kind.clone();
                    if let ChunkKind::Pivot { new_df_name, .. } = &mut kind {
                        *new_df_name = new_dataframe_name.clone();
                    }
                    Some(
                        CodeChunk::new(other.prev_state.clone(), kind)
                            .with_optional_code(other.optional_code.clone()),
                    )
                }
                ChunkKind::SimpleImport { .. } => {
                    let created = other.created_sheet_indexes()?;
                    if !created.contains(sheet_index) {
                        return None;
                    }
                    let mut kind = other.kind.clone();
                    if let ChunkKind::SimpleImport { new_df_names, .. } = &mut kind {
                        let offset = sheet_index - other.prev_state.dfs.len();
                        new_df_names[offset] = new_dataframe_name.clone();
                    }
                    Some(CodeChunk::new(other.prev_state.clone(), kind))
                }
                ChunkKind::Concat { .. } if *sheet_index == other.prev_state.dfs.len() => {
                    let mut kind = other.kind.clone();
                    if let ChunkKind::Concat { new_df_name, .. } = &mut kind {
                        *new_df_name = new_dataframe_name.clone();
                    }
                    Some(CodeChunk::new(other.prev_state.clone(), kind))
                }
                ChunkKind::DataframeDuplicate { .. }
                    if *sheet_index == other.prev_state.dfs.len() =>
                {
                    let mut kind = other.kind.clone();
                    if let ChunkKind::DataframeDuplicate { new_df_name, .. } = &mut kind {
                        *new_df_name = new_dataframe_name.clone();
                    }
                    Some(CodeChunk::new(other.prev_state.clone(), kind))
                }
                _ => None,
            },
            ChunkKind::DeleteColumns {
                sheet_index,
                column_ids,
            } => match &other.kind {
                ChunkKind::ReorderColumn {
                    sheet_index: reorder_sheet,
                    column_id,
                    ..
                } if reorder_sheet == sheet_index && column_ids.contains(column_id) => {
                    Some(CodeChunk::new(
                        other.prev_state.clone(),
                        ChunkKind::DeleteColumns {
                            sheet_index: *sheet_index,
                            column_ids: column_ids.clone(),
                        },
                    ))
                }
                ChunkKind::AddColumn {
                    sheet_index: add_sheet,
                    new_column_id,
                    ..
                } if add_sheet == sheet_index && column_ids.contains(new_column_id) => {
                    let remaining: Vec<String> = column_ids
                        .iter()
                        .filter(|id| *id != new_column_id)
                        .cloned()
                        .collect();
                    if remaining.is_empty() {
                        Some(CodeChunk::new(other.prev_state.clone(), ChunkKind::NoOp))
                    } else {
                        Some(CodeChunk::new(
                            other.prev_state.clone(),
                            ChunkKind::DeleteColumns {
                                sheet_index: *sheet_index,
                                column_ids: remaining,
                            },
                        ))
                    }
                }
                ChunkKind::RenameColumns {
                    sheet_index: rename_sheet,
                    renames,
                } if rename_sheet == sheet_index => {
                    let deleted: HashSet<&str> =
                        column_ids.iter().map(String::as_str).collect();
                    let overlap = renames
                        .iter()
                        .filter(|(id, _)| deleted.contains(id.as_str()))
                        .count();
                    if overlap == 0 || overlap != renames.len() {
                        // Partial overlap leaves a rename the delete does
                        // not cover; don't optimize.
                        return None;
                    }
                    Some(CodeChunk::new(
                        other.prev_state.clone(),
                        ChunkKind::DeleteColumns {
                            sheet_index: *sheet_index,
                            column_ids: column_ids.clone(),
                        },
                    ))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

/// Clones a chunk with its `prev_state` rebound to the earlier chunk's.
fn rebind(chunk: &CodeChunk, earlier: &CodeChunk) -> CodeChunk {
    let mut rebound = chunk.clone();
    rebound.prev_state = earlier.prev_state.clone();
    rebound
}

fn concat_vecs<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend(a.iter().cloned());
    out.extend(b.iter().cloned());
    out
}
