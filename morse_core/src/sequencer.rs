// Frame sequencer: plays a list of patterns at a fixed tempo.
//
// The host calls `FrameSequencer::tick` from its animation callback. Each
// tick adds the elapsed time to an accumulator and consumes it one tempo
// interval at a time, so a late callback catches up instead of drifting. All
// arithmetic is in integer microseconds.
//
// During a catch-up burst only the final frame of the tick is reported as
// "frame changed"; every wrap past the end still reports "cycle completed".

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::events::{ControlHandle, ControlRequest, Emitter, SubscriptionId};
use crate::types::{interval_micros, Iterations, Pattern, SequencerConfig, SequencerState, Timestamp};

/// Most frames a single tick will advance. Whole intervals beyond this are
/// dropped; the sub-interval remainder is kept.
pub const MAX_CATCH_UP_FRAMES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequencerEvent {
    FrameChanged { index: usize, pattern: Pattern },
    /// `iteration` is the number of completed passes, starting at 1.
    CycleCompleted { iteration: u32 },
    SequenceCompleted,
}

pub struct FrameSequencer<C: Clock> {
    clock: C,
    frames: Vec<Pattern>,
    tempo_us: u64,
    iterations: Iterations,
    current_index: usize,
    current_iteration: u32,
    running: bool,
    /// Time of the last tick (or start). `None` while stopped.
    anchor: Option<Timestamp>,
    paused_at: Option<Timestamp>,
    accumulated_us: u64,
    emitter: Emitter<SequencerEvent>,
    control: ControlHandle,
    destroyed: bool,
}

impl<C: Clock> FrameSequencer<C> {
    pub fn new(frames: Vec<Pattern>, config: SequencerConfig, clock: C) -> Result<Self, EngineError> {
        let tempo_us = interval_micros("tempo", config.tempo_ms)?;
        debug!(
            "FrameSequencer created: frames={}, tempo_us={}, iterations={:?}",
            frames.len(),
            tempo_us,
            config.iterations
        );
        Ok(FrameSequencer {
            clock,
            frames,
            tempo_us,
            iterations: config.iterations,
            current_index: 0,
            current_iteration: 0,
            running: false,
            anchor: None,
            paused_at: None,
            accumulated_us: 0,
            emitter: Emitter::new(),
            control: ControlHandle::default(),
            destroyed: false,
        })
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SequencerEvent) + 'static,
    {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Handle for pausing or stopping from inside a listener.
    pub fn control_handle(&self) -> ControlHandle {
        self.control.clone()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn start(&mut self) {
        if self.destroyed || self.running || self.frames.is_empty() {
            return;
        }
        let now = self.clock.now();
        match self.paused_at.take() {
            Some(paused_at) => {
                // Shift the anchor past the pause so the offset into the
                // current interval is unchanged.
                let paused_for = now.micros_since(paused_at);
                let anchor = self.anchor.unwrap_or(paused_at);
                self.anchor = Some(anchor.saturating_add_micros(paused_for));
                debug!("FrameSequencer resumed after {}us at frame {}", paused_for, self.current_index);
            }
            None => {
                self.anchor = Some(now);
                debug!("FrameSequencer started at frame {}", self.current_index);
            }
        }
        self.running = true;
    }

    pub fn pause(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.paused_at = Some(self.clock.now());
        debug!("FrameSequencer paused at frame {}", self.current_index);
    }

    /// Halts playback. The frame index is kept; the next `start` takes a
    /// fresh timing anchor.
    pub fn stop(&mut self) {
        if !self.running && self.anchor.is_none() && self.paused_at.is_none() {
            return;
        }
        self.running = false;
        self.anchor = None;
        self.paused_at = None;
        self.accumulated_us = 0;
        debug!("FrameSequencer stopped at frame {}", self.current_index);
    }

    /// Back to frame 0, iteration 0. Running state is left alone.
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.current_iteration = 0;
        self.accumulated_us = 0;
        self.paused_at = None;
        if self.running {
            self.anchor = Some(self.clock.now());
        } else {
            self.anchor = None;
        }
        self.emit_current_frame();
    }

    /// Advances by the time elapsed since the last tick. Returns the number
    /// of frames advanced.
    pub fn tick(&mut self) -> usize {
        self.apply_control();
        if !self.running {
            return 0;
        }
        if self.frames.is_empty() {
            self.stop();
            return 0;
        }

        let now = self.clock.now();
        let anchor = self.anchor.unwrap_or(now);
        self.accumulated_us = self.accumulated_us.saturating_add(now.micros_since(anchor));
        self.anchor = Some(now);

        let tempo = self.tempo_us;
        let mut advanced = 0;
        let mut completed = false;
        while self.running && self.accumulated_us >= tempo && advanced < MAX_CATCH_UP_FRAMES {
            self.accumulated_us -= tempo;
            advanced += 1;
            if self.advance_frame() {
                completed = true;
                break;
            }
        }

        if self.running && self.accumulated_us >= tempo {
            let dropped = self.accumulated_us / tempo;
            self.accumulated_us %= tempo;
            warn!(
                "FrameSequencer fell behind by more than {} frames; dropped {} intervals",
                MAX_CATCH_UP_FRAMES, dropped
            );
        }

        if advanced > 0 && !completed && !self.destroyed {
            self.emit_current_frame();
        }
        advanced
    }

    /// Takes effect on the next tick.
    pub fn set_tempo(&mut self, tempo_ms: f64) -> Result<(), EngineError> {
        self.tempo_us = interval_micros("tempo", tempo_ms)?;
        Ok(())
    }

    pub fn tempo_ms(&self) -> f64 {
        self.tempo_us as f64 / 1000.0
    }

    pub fn set_frames(&mut self, frames: Vec<Pattern>) {
        self.frames = frames;
        if self.current_index >= self.frames.len() {
            self.current_index = 0;
        }
        if self.frames.is_empty() {
            self.stop();
        }
        self.emit_current_frame();
    }

    pub fn set_iterations(&mut self, iterations: Iterations) {
        self.iterations = iterations;
    }

    pub fn frames(&self) -> &[Pattern] {
        &self.frames
    }

    pub fn current_pattern(&self) -> Option<&Pattern> {
        self.frames.get(self.current_index)
    }

    /// Fraction of the whole run played so far; 0 for an endless run or an
    /// empty frame list.
    pub fn progress(&self) -> f64 {
        match self.iterations {
            Iterations::Finite(count) if !self.frames.is_empty() => {
                let len = self.frames.len() as f64;
                let played = f64::from(self.current_iteration) * len + self.current_index as f64;
                played / (len * f64::from(count))
            }
            _ => 0.0,
        }
    }

    pub fn state(&self) -> SequencerState {
        SequencerState {
            current_frame_index: self.current_index,
            current_iteration: self.current_iteration,
            is_running: self.running,
            accumulated_drift_ms: self.accumulated_us as f64 / 1000.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Stops playback and drops frames and listeners. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop();
        self.frames.clear();
        self.emitter.clear();
        self.destroyed = true;
        debug!("FrameSequencer destroyed");
    }

    /// Moves to the next frame. Returns true when the run has completed.
    fn advance_frame(&mut self) -> bool {
        self.current_index += 1;
        if self.current_index < self.frames.len() {
            return false;
        }

        self.current_index = 0;
        self.current_iteration = self.current_iteration.saturating_add(1);
        let iteration = self.current_iteration;
        let finished = self.iterations.is_reached(iteration);
        if finished {
            self.stop();
        }

        self.dispatch(SequencerEvent::CycleCompleted { iteration });
        if finished {
            debug!("FrameSequencer completed after {} iterations", iteration);
            self.dispatch(SequencerEvent::SequenceCompleted);
        }
        finished
    }

    fn emit_current_frame(&mut self) {
        let index = self.current_index;
        let pattern = match self.frames.get(index) {
            Some(pattern) if pattern.is_valid() => pattern.clone(),
            Some(_) => {
                trace!("FrameSequencer skipped malformed frame {}", index);
                return;
            }
            None => return,
        };
        self.dispatch(SequencerEvent::FrameChanged { index, pattern });
    }

    fn dispatch(&mut self, event: SequencerEvent) {
        self.emitter.emit(&event);
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

impl<C: Clock> std::fmt::Debug for FrameSequencer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSequencer")
            .field("frames", &self.frames.len())
            .field("tempo_us", &self.tempo_us)
            .field("iterations", &self.iterations)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::generators;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn frames(count: usize) -> Vec<Pattern> {
        (0..count).map(|i| Pattern::empty(4).with_cell(0, i % 4, true)).collect()
    }

    fn config(tempo_ms: f64, iterations: Iterations) -> SequencerConfig {
        SequencerConfig { tempo_ms, iterations }
    }

    fn recorded(seq: &mut FrameSequencer<ManualClock>) -> Rc<RefCell<Vec<SequencerEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        seq.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        log
    }

    fn frame_indices(log: &[SequencerEvent]) -> Vec<usize> {
        log.iter()
            .filter_map(|event| match event {
                SequencerEvent::FrameChanged { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn rejects_bad_tempo_and_clamps_small_tempo() {
        let clock = ManualClock::new();
        assert!(FrameSequencer::new(frames(2), config(-5.0, Iterations::Infinite), clock.clone()).is_err());
        assert!(FrameSequencer::new(frames(2), config(f64::NAN, Iterations::Infinite), clock.clone()).is_err());

        let mut seq = FrameSequencer::new(frames(2), config(1.0, Iterations::Infinite), clock).unwrap();
        assert_eq!(seq.tempo_ms(), 16.0);
        seq.set_tempo(5.0).unwrap();
        assert_eq!(seq.tempo_ms(), 16.0);
        assert!(seq.set_tempo(f64::INFINITY).is_err());
    }

    #[test]
    fn advances_one_frame_per_tempo() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(3), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        let log = recorded(&mut seq);
        seq.start();

        clock.advance_millis(99.0);
        assert_eq!(seq.tick(), 0);
        clock.advance_millis(1.0);
        assert_eq!(seq.tick(), 1);
        clock.advance_millis(100.0);
        seq.tick();

        assert_eq!(frame_indices(&log.borrow()), vec![1, 2]);
        assert_eq!(seq.state().current_frame_index, 2);
        assert_eq!(seq.state().accumulated_drift_ms, 0.0);
    }

    #[test]
    fn start_is_noop_when_empty_or_running() {
        let clock = ManualClock::new();
        let mut empty = FrameSequencer::new(Vec::new(), SequencerConfig::default(), clock.clone()).unwrap();
        empty.start();
        assert!(!empty.is_running());

        let mut seq = FrameSequencer::new(frames(2), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        seq.start();
        clock.advance_millis(50.0);
        seq.start();
        clock.advance_millis(50.0);
        assert_eq!(seq.tick(), 1);
    }

    #[test]
    fn catch_up_emits_only_final_frame_but_every_cycle() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(3), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        let log = recorded(&mut seq);
        seq.start();

        clock.advance_millis(750.0);
        assert_eq!(seq.tick(), 7);

        let log = log.borrow();
        assert_eq!(
            *log,
            vec![
                SequencerEvent::CycleCompleted { iteration: 1 },
                SequencerEvent::CycleCompleted { iteration: 2 },
                SequencerEvent::FrameChanged { index: 1, pattern: frames(3)[1].clone() },
            ]
        );
        assert_eq!(seq.state().accumulated_drift_ms, 50.0);
    }

    #[test]
    fn catch_up_is_bounded_per_tick() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(4), config(16.0, Iterations::Infinite), clock.clone()).unwrap();
        seq.start();

        // One hour stall.
        clock.advance_millis(3_600_000.0 + 5.0);
        assert_eq!(seq.tick(), MAX_CATCH_UP_FRAMES);
        let state = seq.state();
        assert!(state.accumulated_drift_ms < 16.0);
        assert_eq!(state.current_iteration, 250);

        clock.advance_millis(16.0);
        assert_eq!(seq.tick(), 1);
    }

    #[test]
    fn finite_run_completes_and_stops() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(2), config(100.0, Iterations::Finite(2)), clock.clone()).unwrap();
        let log = recorded(&mut seq);
        seq.start();

        for _ in 0..10 {
            clock.advance_millis(100.0);
            seq.tick();
        }

        let log = log.borrow();
        let tail: Vec<_> = log.iter().rev().take(2).cloned().collect();
        assert_eq!(
            tail,
            vec![SequencerEvent::SequenceCompleted, SequencerEvent::CycleCompleted { iteration: 2 }]
        );
        assert_eq!(log.iter().filter(|e| **e == SequencerEvent::SequenceCompleted).count(), 1);
        assert!(!seq.is_running());
        assert_eq!(seq.state().current_iteration, 2);
        assert_eq!(seq.progress(), 1.0);
    }

    #[test]
    fn progress_counts_played_frames() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(4), config(100.0, Iterations::Finite(2)), clock.clone()).unwrap();
        assert_eq!(seq.progress(), 0.0);
        seq.start();
        clock.advance_millis(300.0);
        seq.tick();
        assert_eq!(seq.progress(), 3.0 / 8.0);

        seq.set_iterations(Iterations::Infinite);
        assert_eq!(seq.progress(), 0.0);
    }

    #[test]
    fn pause_resume_keeps_offset_into_interval() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(3), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        seq.start();

        clock.advance_millis(60.0);
        seq.tick();
        clock.advance_millis(20.0);
        seq.pause();
        assert!(seq.is_paused());
        seq.pause();

        clock.advance_millis(5000.0);
        assert_eq!(seq.tick(), 0);
        seq.start();
        assert!(!seq.is_paused());

        // 80ms were already played; 20 more finish the interval.
        clock.advance_millis(19.0);
        assert_eq!(seq.tick(), 0);
        clock.advance_millis(1.0);
        assert_eq!(seq.tick(), 1);
    }

    #[test]
    fn stop_keeps_index_but_not_timing() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(3), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        seq.start();
        clock.advance_millis(150.0);
        seq.tick();
        seq.stop();
        seq.stop();
        assert_eq!(seq.state().current_frame_index, 1);
        assert_eq!(seq.state().accumulated_drift_ms, 0.0);

        clock.advance_millis(1000.0);
        seq.start();
        clock.advance_millis(99.0);
        assert_eq!(seq.tick(), 0);
        clock.advance_millis(1.0);
        assert_eq!(seq.tick(), 1);
        assert_eq!(seq.state().current_frame_index, 2);
    }

    #[test]
    fn reset_rewinds_and_reemits() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(3), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        let log = recorded(&mut seq);
        seq.start();
        clock.advance_millis(450.0);
        seq.tick();

        seq.reset();
        let state = seq.state();
        assert_eq!((state.current_frame_index, state.current_iteration), (0, 0));
        assert_eq!(state.accumulated_drift_ms, 0.0);
        assert!(state.is_running);
        assert_eq!(frame_indices(&log.borrow()).last(), Some(&0));
    }

    #[test]
    fn set_frames_wraps_index_and_reemits() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(5), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        let log = recorded(&mut seq);
        seq.start();
        clock.advance_millis(300.0);
        seq.tick();

        seq.set_frames(frames(4));
        assert_eq!(seq.state().current_frame_index, 3);
        seq.set_frames(frames(2));
        assert_eq!(seq.state().current_frame_index, 0);
        assert_eq!(frame_indices(&log.borrow()), vec![3, 3, 0]);

        seq.set_frames(Vec::new());
        assert!(!seq.is_running());
        assert!(seq.current_pattern().is_none());
    }

    #[test]
    fn malformed_frames_advance_silently() {
        let clock = ManualClock::new();
        let jagged = Pattern::from_rows(vec![vec![true, false], vec![true]]);
        let list = vec![generators::cross(3), jagged, generators::diagonal(3)];
        let mut seq = FrameSequencer::new(list, config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        let log = recorded(&mut seq);
        seq.start();
        for _ in 0..2 {
            clock.advance_millis(100.0);
            seq.tick();
        }
        assert_eq!(frame_indices(&log.borrow()), vec![2]);
        assert_eq!(seq.state().current_frame_index, 2);
    }

    #[test]
    fn stop_from_listener_halts_within_the_tick() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(2), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        let handle = seq.control_handle();
        let cycles = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&cycles);
        seq.subscribe(move |event| {
            if let SequencerEvent::CycleCompleted { .. } = event {
                *counter.borrow_mut() += 1;
                handle.stop();
            }
        });
        seq.start();

        clock.advance_millis(1000.0);
        assert_eq!(seq.tick(), 2);
        assert!(!seq.is_running());
        assert_eq!(*cycles.borrow(), 1);

        clock.advance_millis(1000.0);
        assert_eq!(seq.tick(), 0);
    }

    #[test]
    fn pause_from_listener_resumes_later() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(4), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        let handle = seq.control_handle();
        seq.subscribe(move |event| {
            if let SequencerEvent::FrameChanged { index: 2, .. } = event {
                handle.pause();
            }
        });
        seq.start();
        for _ in 0..3 {
            clock.advance_millis(100.0);
            seq.tick();
        }
        assert!(seq.is_paused());
        assert_eq!(seq.state().current_frame_index, 2);

        seq.start();
        clock.advance_millis(100.0);
        assert_eq!(seq.tick(), 1);
    }

    #[test]
    fn destroy_drops_listeners() {
        let clock = ManualClock::new();
        let mut seq = FrameSequencer::new(frames(2), config(100.0, Iterations::Infinite), clock.clone()).unwrap();
        let log = recorded(&mut seq);
        seq.start();
        seq.destroy();
        seq.destroy();
        seq.start();
        clock.advance_millis(500.0);
        assert_eq!(seq.tick(), 0);
        seq.set_frames(frames(2));
        assert!(log.borrow().is_empty());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Irregular ticks never lose or gain frames: after any sequence
            /// of ticks the frames played equal elapsed / tempo, and the
            /// leftover drift stays below one tempo.
            #[test]
            fn drift_is_bounded(
                tempo_ms in 16u64..250,
                ticks in prop::collection::vec(0u64..400_000, 1..60),
            ) {
                let clock = ManualClock::new();
                let mut seq = FrameSequencer::new(
                    frames(7),
                    config(tempo_ms as f64, Iterations::Infinite),
                    clock.clone(),
                ).unwrap();
                seq.start();

                let mut elapsed_us = 0u64;
                for step in ticks {
                    clock.advance_micros(step);
                    elapsed_us += step;
                    seq.tick();
                }

                let tempo_us = tempo_ms * 1000;
                let state = seq.state();
                let played = state.current_iteration as u64 * 7 + state.current_frame_index as u64;
                prop_assert_eq!(played, elapsed_us / tempo_us);
                prop_assert!(state.accumulated_drift_ms * 1000.0 < tempo_us as f64);
            }

            #[test]
            fn frame_events_follow_index_order(tick_ms in prop::collection::vec(1u64..120, 1..80)) {
                let clock = ManualClock::new();
                let mut seq = FrameSequencer::new(frames(5), config(50.0, Iterations::Infinite), clock.clone()).unwrap();
                let log = recorded(&mut seq);
                seq.start();
                for ms in tick_ms {
                    clock.advance_millis(ms as f64);
                    seq.tick();
                }

                let mut cycles = 0u32;
                for event in log.borrow().iter() {
                    if let SequencerEvent::CycleCompleted { iteration } = event {
                        cycles += 1;
                        prop_assert_eq!(*iteration, cycles);
                    }
                }
                prop_assert_eq!(cycles, seq.state().current_iteration);
            }
        }
    }
}
