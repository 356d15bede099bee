// Label orchestrator: Holding(label) -> Transitioning(label, next) -> Holding(next).
// Driven by the same host tick as the sequencer, but on its own durations.
// Phase deadlines advance by exactly one duration, so a late tick never
// stretches the cycle.

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::events::{ControlHandle, ControlRequest, Emitter, SubscriptionId};
use crate::types::{interval_micros, OrchestratorConfig, OrchestratorState, Timestamp};

/// Most phase changes a single tick will process.
pub const MAX_CATCH_UP_PHASES: usize = 1000;

pub struct TransitionOrchestrator<C: Clock> {
    clock: C,
    labels: Vec<String>,
    hold_us: u64,
    transition_us: u64,
    current_index: usize,
    /// Target of the running morph; `Some` only while transitioning.
    next_index: Option<usize>,
    running: bool,
    deadline: Option<Timestamp>,
    /// Time left in the interrupted phase, kept across a pause.
    paused_remaining_us: Option<u64>,
    last_emitted: Option<OrchestratorState>,
    emitter: Emitter<OrchestratorState>,
    control: ControlHandle,
    destroyed: bool,
}

impl<C: Clock> TransitionOrchestrator<C> {
    pub fn new(config: OrchestratorConfig, clock: C) -> Result<Self, EngineError> {
        let hold_us = interval_micros("hold duration", config.hold_duration_ms)?;
        let transition_us = interval_micros("transition duration", config.transition_duration_ms)?;
        debug!(
            "TransitionOrchestrator created: labels={}, hold_us={}, transition_us={}",
            config.labels.len(),
            hold_us,
            transition_us
        );
        Ok(TransitionOrchestrator {
            clock,
            labels: config.labels,
            hold_us,
            transition_us,
            current_index: 0,
            next_index: None,
            running: false,
            deadline: None,
            paused_remaining_us: None,
            last_emitted: None,
            emitter: Emitter::new(),
            control: ControlHandle::default(),
            destroyed: false,
        })
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&OrchestratorState) + 'static,
    {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    pub fn control_handle(&self) -> ControlHandle {
        self.control.clone()
    }

    pub fn start(&mut self) {
        if self.destroyed || self.running || self.labels.is_empty() {
            return;
        }
        let now = self.clock.now();
        let wait_us = match self.paused_remaining_us.take() {
            Some(remaining) => remaining,
            None => self.phase_duration_us(),
        };
        self.deadline = Some(now.saturating_add_micros(wait_us));
        self.running = true;
        debug!(
            "TransitionOrchestrator started at label {} (next phase in {}us)",
            self.current_index, wait_us
        );
    }

    pub fn pause(&mut self) {
        if !self.running {
            return;
        }
        let now = self.clock.now();
        let remaining = self.deadline.map_or(0, |deadline| deadline.micros_since(now));
        self.paused_remaining_us = Some(remaining);
        self.running = false;
        self.deadline = None;
        debug!("TransitionOrchestrator paused with {}us left in phase", remaining);
    }

    pub fn stop(&mut self) {
        if !self.running && self.paused_remaining_us.is_none() {
            return;
        }
        self.running = false;
        self.deadline = None;
        self.paused_remaining_us = None;
        debug!("TransitionOrchestrator stopped at label {}", self.current_index);
    }

    /// Stops and returns to the first label, holding.
    pub fn reset(&mut self) {
        self.stop();
        self.current_index = 0;
        self.next_index = None;
        self.emit_state();
    }

    /// Processes every phase whose deadline has passed. Returns the number of
    /// phase changes.
    pub fn tick(&mut self) -> usize {
        self.apply_control();
        if !self.running {
            return 0;
        }
        if self.labels.is_empty() {
            self.stop();
            return 0;
        }

        let now = self.clock.now();
        let mut changes = 0;
        while let Some(deadline) = self.deadline {
            if !self.running || now < deadline {
                break;
            }
            if changes == MAX_CATCH_UP_PHASES {
                let rearmed = now.saturating_add_micros(self.phase_duration_us());
                self.deadline = Some(rearmed);
                warn!(
                    "TransitionOrchestrator fell behind by more than {} phases; re-armed",
                    MAX_CATCH_UP_PHASES
                );
                break;
            }

            match self.next_index.take() {
                Some(next) => {
                    self.current_index = next;
                    self.deadline = Some(deadline.saturating_add_micros(self.hold_us));
                }
                None => {
                    self.next_index = Some((self.current_index + 1) % self.labels.len());
                    self.deadline = Some(deadline.saturating_add_micros(self.transition_us));
                }
            }
            changes += 1;
            self.emit_state();
        }
        changes
    }

    /// Replaces the label list. An empty list stops the orchestrator.
    pub fn set_labels(&mut self, labels: Vec<String>) {
        self.labels = labels;
        if self.current_index >= self.labels.len() {
            self.current_index = 0;
        }
        if self.labels.is_empty() {
            self.next_index = None;
            self.stop();
        } else if self.next_index.is_some() {
            self.next_index = Some((self.current_index + 1) % self.labels.len());
        }
        self.emit_state();
    }

    /// New durations apply from the next phase that is armed.
    pub fn set_durations(&mut self, hold_ms: f64, transition_ms: f64) -> Result<(), EngineError> {
        let hold_us = interval_micros("hold duration", hold_ms)?;
        let transition_us = interval_micros("transition duration", transition_ms)?;
        self.hold_us = hold_us;
        self.transition_us = transition_us;
        Ok(())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn state(&self) -> OrchestratorState {
        let label = |index: usize| self.labels.get(index).cloned();
        OrchestratorState {
            current_label: label(self.current_index).unwrap_or_default(),
            next_label: self.next_index.and_then(label),
            is_transitioning: self.next_index.is_some(),
            current_index: self.current_index,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stops and drops every listener. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop();
        self.emitter.clear();
        self.destroyed = true;
        debug!("TransitionOrchestrator destroyed");
    }

    fn phase_duration_us(&self) -> u64 {
        if self.next_index.is_some() {
            self.transition_us
        } else {
            self.hold_us
        }
    }

    fn emit_state(&mut self) {
        let state = self.state();
        if self.last_emitted.as_ref() == Some(&state) {
            return;
        }
        self.emitter.emit(&state);
        self.last_emitted = Some(state);
        self.apply_control();
    }

    fn apply_control(&mut self) {
        match self.control.take() {
            Some(ControlRequest::Pause) => self.pause(),
            Some(ControlRequest::Stop) => self.stop(),
            Some(ControlRequest::Destroy) => self.destroy(),
            None => {}
        }
    }
}

impl<C: Clock> std::fmt::Debug for TransitionOrchestrator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionOrchestrator")
            .field("labels", &self.labels)
            .field("hold_us", &self.hold_us)
            .field("transition_us", &self.transition_us)
            .field("state", &self.state())
            .field("running", &self.running)
            .finish()
    }
}
