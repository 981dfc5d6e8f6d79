//! Turning the step history into the final script.
//!
//! Transpilation is always a total recomputation: every active step is
//! re-transpiled and the whole chunk sequence is re-optimized, so the
//! generated code can never drift out of sync with the step list.

use crate::chunks::CodeChunk;
use crate::errors::StepResult;
use crate::optimizer::optimize_code_chunks;
use crate::step::{skipped_step_indexes, Step};

pub const IN_PREVIOUS_STEP_COMMENT: &str =
    "# You're viewing a previous step. Redo the later steps to see the full analysis.";

/// The reproducible script: statements plus the deduplicated imports they
/// need, each executable top to bottom against pandas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranspiledCode {
    pub imports: Vec<String>,
    pub code: Vec<String>,
}

impl TranspiledCode {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.code.is_empty()
    }

    /// The full script text: imports, a blank line, then the statements.
    pub fn to_script(&self) -> String {
        let mut lines = Vec::with_capacity(self.imports.len() + self.code.len() + 1);
        lines.extend(self.imports.iter().cloned());
        if !self.imports.is_empty() && !self.code.is_empty() {
            lines.push(String::new());
        }
        lines.extend(self.code.iter().cloned());
        lines.join("\n")
    }
}

/// Transpiles every active step (skipped steps excluded) and optionally
/// optimizes the chunk sequence.
pub fn get_code_chunks(steps: &[Step], optimize: bool) -> StepResult<Vec<CodeChunk>> {
    let skipped = skipped_step_indexes(steps);
    let mut chunks = Vec::new();
    for (index, step) in steps.iter().enumerate() {
        if skipped.contains(&index) {
            continue;
        }
        chunks.extend(step.transpile()?);
    }
    if optimize {
        Ok(optimize_code_chunks(chunks))
    } else {
        Ok(chunks)
    }
}

/// Renders the active steps to the final script. `has_redo_tail` appends a
/// marker comment when a historical step is checked out.
pub fn transpile_steps(
    steps: &[Step],
    has_redo_tail: bool,
    add_comments: bool,
    optimize: bool,
) -> StepResult<TranspiledCode> {
    let chunks = get_code_chunks(steps, optimize)?;

    let mut imports = Vec::new();
    let mut code = Vec::new();
    for chunk in &chunks {
        let (lines, chunk_imports) = chunk.code()?;
        let (optional_lines, optional_imports) =
            chunk.optional_code_that_successfully_executed();

        if !lines.is_empty() {
            if add_comments {
                code.push(format!("# {}", chunk.description_comment()));
            }
            code.extend(lines);
            code.extend(optional_lines.iter().cloned());
            code.push(String::new());
        }
        imports.extend(chunk_imports);
        imports.extend(optional_imports.iter().cloned());
    }

    if has_redo_tail {
        code.push(IN_PREVIOUS_STEP_COMMENT.to_string());
    }

    Ok(TranspiledCode {
        imports: dedup_preserving_order(imports),
        code,
    })
}

fn dedup_preserving_order(lines: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    lines
        .into_iter()
        .filter(|line| seen.insert(line.clone()))
        .collect()
}
