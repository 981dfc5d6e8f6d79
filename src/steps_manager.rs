//! The step-history orchestrator: owns the ordered step list and the
//! current pointer, drives execution and replay, and keeps the transpiled
//! script in sync with every history change.

use std::time::Instant;

use polars::prelude::DataFrame;

use crate::errors::StepResult;
use crate::params::StepParams;
use crate::state::State;
use crate::step::{self, indexes_skipped_by, skipped_step_indexes, ExecutionData, Step};
use crate::transpile::{transpile_steps, TranspiledCode};

pub struct StepsManager {
    initial_state: State,
    /// The full history, including steps later ones have made obsolete.
    /// Skipped steps stay in the list (their execution data seeds pivot
    /// replays); they are excluded from execution chains and transpiles.
    steps: Vec<Step>,
    /// Number of steps currently applied. Undo moves this back without
    /// discarding the tail; appending a new step truncates it.
    curr_step_idx: usize,
    add_comments: bool,
    optimize: bool,
    transpiled: TranspiledCode,
}

impl StepsManager {
    /// Starts a session from caller-supplied dataframes.
    pub fn new(dfs: Vec<DataFrame>, df_names: Option<Vec<String>>) -> StepResult<Self> {
        let mut manager = Self {
            initial_state: State::new(dfs, df_names),
            steps: Vec::new(),
            curr_step_idx: 0,
            add_comments: true,
            optimize: true,
            transpiled: TranspiledCode::default(),
        };
        manager.retranspile()?;
        Ok(manager)
    }

    pub fn set_code_options(&mut self, add_comments: bool, optimize: bool) -> StepResult<()> {
        self.add_comments = add_comments;
        self.optimize = optimize;
        self.retranspile()
    }

    /// The state the next step would execute against.
    pub fn curr_state(&self) -> &State {
        let skipped = skipped_step_indexes(self.active_steps());
        self.active_steps()
            .iter()
            .enumerate()
            .rev()
            .find(|(index, _)| !skipped.contains(index))
            .map(|(_, step)| &step.post_state)
            .unwrap_or(&self.initial_state)
    }

    pub fn initial_state(&self) -> &State {
        &self.initial_state
    }

    /// Applied steps up to the current pointer, including skipped ones.
    pub fn active_steps(&self) -> &[Step] {
        &self.steps[..self.curr_step_idx]
    }

    pub fn all_steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn curr_step_idx(&self) -> usize {
        self.curr_step_idx
    }

    pub fn has_redo_tail(&self) -> bool {
        self.curr_step_idx < self.steps.len()
    }

    /// The generated script, kept current with every history change.
    pub fn transpiled_code(&self) -> &TranspiledCode {
        &self.transpiled
    }

    /// Validates, executes, and records a new step. Appending invalidates
    /// any redo tail. On failure nothing changes: no history entry, no
    /// state mutation, no re-transpilation.
    pub fn execute_new_step(
        &mut self,
        step_id: impl Into<String>,
        params: StepParams,
    ) -> StepResult<()> {
        let step_id = step_id.into();
        let newly_skipped = indexes_skipped_by(&step_id, &params, self.active_steps());
        let already_skipped = skipped_step_indexes(self.active_steps());

        if newly_skipped.is_subset(&already_skipped) {
            // Fast path: the new step invalidates nothing, so it executes
            // directly against the current state.
            let prev_state = self.curr_state().clone();
            let saturated = step::saturate(&prev_state, params, self.active_steps())?;
            let started = Instant::now();
            let (post_state, execution_data) = step::execute(&prev_state, &saturated)?;
            let step = Step {
                step_id,
                params: saturated,
                prev_state,
                post_state,
                execution_data,
                processing_time: started.elapsed(),
            };
            self.steps.truncate(self.curr_step_idx);
            self.steps.push(step);
            self.curr_step_idx = self.steps.len();
        } else {
            // The new step makes earlier steps obsolete; rebuild the whole
            // chain so every surviving step's states reflect the new skip
            // set. Only on success does the rebuilt history replace the old.
            let mut plan: Vec<(String, StepParams, Option<Step>)> = self
                .active_steps()
                .iter()
                .map(|s| (s.step_id.clone(), s.params.clone(), Some(s.clone())))
                .collect();
            plan.push((step_id, params, None));
            let replayed = replay(&self.initial_state, plan)?;
            self.steps = replayed;
            self.curr_step_idx = self.steps.len();
        }
        self.retranspile()
    }

    /// Moves the pointer back one step. The future steps stay available
    /// for redo until a new step is appended.
    pub fn undo(&mut self) -> StepResult<()> {
        if self.curr_step_idx == 0 {
            return Ok(());
        }
        self.checkout_step_by_index(self.curr_step_idx - 1)
    }

    /// Moves the pointer forward one step if a redo tail exists.
    pub fn redo(&mut self) -> StepResult<()> {
        if !self.has_redo_tail() {
            return Ok(());
        }
        self.checkout_step_by_index(self.curr_step_idx + 1)
    }

    /// Jumps the pointer to an arbitrary position and replays the active
    /// prefix, so post-states reflect the skip set visible at the pointer.
    pub fn checkout_step_by_index(&mut self, step_index: usize) -> StepResult<()> {
        let step_index = step_index.min(self.steps.len());
        let plan: Vec<(String, StepParams, Option<Step>)> = self.steps[..step_index]
            .iter()
            .map(|s| (s.step_id.clone(), s.params.clone(), Some(s.clone())))
            .collect();
        let replayed = replay(&self.initial_state, plan)?;
        self.steps.splice(..step_index, replayed);
        self.curr_step_idx = step_index;
        self.retranspile()
    }

    /// Resets the history to the initial state.
    pub fn clear(&mut self) -> StepResult<()> {
        self.steps.clear();
        self.curr_step_idx = 0;
        self.retranspile()
    }

    fn retranspile(&mut self) -> StepResult<()> {
        self.transpiled = transpile_steps(
            self.active_steps(),
            self.has_redo_tail(),
            self.add_comments,
            self.optimize,
        )?;
        Ok(())
    }
}

/// Re-executes a planned history from the initial state. Steps skipped by
/// later plan entries keep their recorded states and do not execute; every
/// surviving step re-saturates and re-executes in order.
fn replay(
    initial_state: &State,
    plan: Vec<(String, StepParams, Option<Step>)>,
) -> StepResult<Vec<Step>> {
    let plan_refs: Vec<(&str, &StepParams)> = plan
        .iter()
        .map(|(step_id, params, _)| (step_id.as_str(), params))
        .collect();
    let skipped = step::skipped_plan_indexes(&plan_refs);

    let mut replayed: Vec<Step> = Vec::with_capacity(plan.len());
    let mut current_state = initial_state.clone();

    for (index, (step_id, params, recorded)) in plan.iter().enumerate() {
        if skipped.contains(&index) {
            // Keep the recorded step for context (ids, execution data);
            // it contributes neither state nor code.
            if let Some(recorded) = recorded {
                replayed.push(recorded.clone());
                continue;
            }
        }

        let prev_state = current_state.clone();
        let saturated = step::saturate(&prev_state, params.clone(), &replayed)?;
        let started = Instant::now();
        let (post_state, execution_data) = step::execute(&prev_state, &saturated)?;
        current_state = post_state.clone();
        replayed.push(Step {
            step_id: step_id.clone(),
            params: saturated,
            prev_state,
            post_state,
            execution_data,
            processing_time: started.elapsed(),
        });
    }
    Ok(replayed)
}

/// The execution data of a step, by id, if it is in the history.
pub fn execution_data_for_step<'a>(
    manager: &'a StepsManager,
    step_id: &str,
) -> Option<&'a ExecutionData> {
    manager
        .all_steps()
        .iter()
        .rev()
        .find(|step| step.step_id == step_id)
        .map(|step| &step.execution_data)
}
