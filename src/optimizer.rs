//! Fixed-point code-chunk optimization.
//!
//! Three passes over the chunk sequence, repeated until nothing changes:
//! right combinations (splice and rescan from the affected position), then
//! left combinations, then a reorder pass that moves a chunk backwards past
//! provably-safe neighbors when doing so sets up another combination. The
//! passes run over an indexable worklist, not by rebuilding lists
//! recursively, so long histories optimize in predictable time.

use crate::chunks::CodeChunk;

/// Optimizes chunks down to the smallest sequence with the same effects.
/// Running this on already-optimized input returns it unchanged.
pub fn optimize_code_chunks(mut chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
    loop {
        let combined_right = combine_right_pass(&mut chunks);
        let combined_left = combine_left_pass(&mut chunks);
        let reordered = reorder_pass(&mut chunks);
        if !combined_right && !combined_left && !reordered {
            break;
        }
    }
    chunks
}

/// One left-to-right sweep attempting `A.combine_right(B)` on each adjacent
/// pair. A successful splice rescans from the position before it, since the
/// replacement may now combine with its new predecessor.
fn combine_right_pass(chunks: &mut Vec<CodeChunk>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i + 1 < chunks.len() {
        if let Some(combined) = chunks[i].combine_right(&chunks[i + 1]) {
            chunks.splice(i..i + 2, [combined]);
            changed = true;
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
    changed
}

/// Same sweep with `B.combine_left(A)`. Only runs once no right
/// combination applies anywhere; delete cascades live here.
fn combine_left_pass(chunks: &mut Vec<CodeChunk>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i + 1 < chunks.len() {
        if let Some(combined) = chunks[i + 1].combine_left(&chunks[i]) {
            chunks.splice(i..i + 2, [combined]);
            changed = true;
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
    changed
}

/// Walks each chunk backwards past neighbors it can provably swap with,
/// stopping at the first position where a combination with the chunk two
/// back becomes possible. Swaps only happen when they enable a combination;
/// pure reordering is never worth the churn.
fn reorder_pass(chunks: &mut Vec<CodeChunk>) -> bool {
    if chunks.len() < 3 {
        return false;
    }

    let mut reordered = false;
    let mut result: Vec<CodeChunk> = chunks.drain(..2).collect();

    for chunk in chunks.drain(..) {
        let mut insert_at = None;
        let mut distance = 1;
        while distance < result.len() {
            let one_back = &result[result.len() - distance];
            let two_back = &result[result.len() - distance - 1];

            if !(one_back.can_be_reordered_with(&chunk)
                && chunk.can_be_reordered_with(one_back))
            {
                break;
            }

            let combines = two_back.combine_right(&chunk).is_some()
                || chunk.combine_right(two_back).is_some();
            if combines {
                insert_at = Some(result.len() - distance);
                break;
            }
            distance += 1;
        }

        match insert_at {
            Some(position) => {
                result.insert(position, chunk);
                reordered = true;
            }
            None => result.push(chunk),
        }
    }

    *chunks = result;
    reordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::ChunkKind;
    use crate::params::SortDirection;
    use crate::state::{DfSource, State};
    use polars::prelude::*;

    fn one_sheet_state() -> State {
        let df = df!("a" => [1, 2], "b" => [3, 4]).unwrap();
        State::new(vec![df], None)
    }

    fn noop(state: &State) -> CodeChunk {
        CodeChunk::new(state.clone(), ChunkKind::NoOp)
    }

    fn sort_chunk(state: &State, sheet_index: usize) -> CodeChunk {
        CodeChunk::new(
            state.clone(),
            ChunkKind::Sort {
                sheet_index,
                column_id: "a".to_string(),
                sort_direction: SortDirection::Ascending,
            },
        )
    }

    fn rename_chunk(state: &State, from: &str, to: &str) -> CodeChunk {
        CodeChunk::new(
            state.clone(),
            ChunkKind::RenameColumns {
                sheet_index: 0,
                renames: vec![(from.to_string(), to.to_string())],
            },
        )
    }

    #[test]
    fn test_noops_collapse_away() {
        let state = one_sheet_state();
        let chunks = vec![noop(&state), noop(&state), sort_chunk(&state, 0)];
        let optimized = optimize_code_chunks(chunks);
        assert_eq!(optimized.len(), 1);
        assert!(matches!(optimized[0].kind, ChunkKind::Sort { .. }));
    }

    #[test]
    fn test_trailing_noop_survives_alone() {
        // A lone trailing no-op has nothing to absorb; it just stays, and
        // contributes no code.
        let state = one_sheet_state();
        let optimized = optimize_code_chunks(vec![noop(&state)]);
        assert_eq!(optimized.len(), 1);
        let (lines, imports) = optimized[0].code().unwrap();
        assert!(lines.is_empty());
        assert!(imports.is_empty());
    }

    #[test]
    fn test_rename_chain_collapses_to_one() {
        let state = one_sheet_state();
        let chunks = vec![
            rename_chunk(&state, "a", "x"),
            rename_chunk(&state, "b", "y"),
            rename_chunk(&state, "a", "z"),
        ];
        let optimized = optimize_code_chunks(chunks);
        assert_eq!(optimized.len(), 1);
        match &optimized[0].kind {
            ChunkKind::RenameColumns { renames, .. } => {
                assert_eq!(
                    renames,
                    &vec![
                        ("a".to_string(), "z".to_string()),
                        ("b".to_string(), "y".to_string()),
                    ]
                );
            }
            other => panic!("expected rename, got {:?}", other),
        }
    }

    #[test]
    fn test_optimizer_is_idempotent() {
        let state = one_sheet_state();
        let chunks = vec![
            rename_chunk(&state, "a", "x"),
            sort_chunk(&state, 0),
            CodeChunk::new(
                state.clone(),
                ChunkKind::DataframeDelete {
                    sheet_indexes: vec![0],
                    old_dataframe_names: vec!["df1".to_string()],
                },
            ),
        ];
        let once = optimize_code_chunks(chunks);
        let summaries: Vec<String> = once.iter().map(|c| c.debug_summary()).collect();
        let twice = optimize_code_chunks(once);
        let summaries_again: Vec<String> =
            twice.iter().map(|c| c.debug_summary()).collect();
        assert_eq!(summaries, summaries_again);
    }

    #[test]
    fn test_reorder_brings_combinable_chunks_together() {
        // rename(sheet 0), sort(sheet 1), rename(sheet 0): the second rename
        // can hop over the unrelated sort and merge with the first.
        let mut state = one_sheet_state();
        state.add_df_to_state(
            df!("a" => [9]).unwrap(),
            DfSource::Passed,
            None,
            None,
            None,
        );
        let chunks = vec![
            rename_chunk(&state, "a", "x"),
            sort_chunk(&state, 1),
            rename_chunk(&state, "b", "y"),
        ];
        let optimized = optimize_code_chunks(chunks);
        assert_eq!(optimized.len(), 2);
        match &optimized[0].kind {
            ChunkKind::RenameColumns { renames, .. } => assert_eq!(renames.len(), 2),
            other => panic!("expected merged rename first, got {:?}", other),
        }
        assert!(matches!(optimized[1].kind, ChunkKind::Sort { .. }));
    }

    #[test]
    fn test_delete_cascade_erases_feeding_chunks() {
        // duplicate sheet 0 -> sort the copy -> delete the copy. Everything
        // cancels: the duplicate created it, the sort only edited it.
        let state = one_sheet_state();
        let duplicate = CodeChunk::new(
            state.clone(),
            ChunkKind::DataframeDuplicate {
                sheet_index: 0,
                new_df_name: "df1_copy".to_string(),
            },
        );
        let mut post = state.clone();
        post.add_df_to_state(
            df!("a" => [1]).unwrap(),
            DfSource::Duplicated,
            Some("df1_copy".to_string()),
            None,
            None,
        );
        let sort = sort_chunk(&post, 1);
        let delete = CodeChunk::new(
            post,
            ChunkKind::DataframeDelete {
                sheet_indexes: vec![1],
                old_dataframe_names: vec!["df1_copy".to_string()],
            },
        );
        let optimized = optimize_code_chunks(vec![duplicate, sort, delete]);
        assert_eq!(optimized.len(), 1);
        assert!(matches!(optimized[0].kind, ChunkKind::NoOp));
    }
}
