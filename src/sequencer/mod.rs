//! Sequencer core - transport state machine, step cursor and tempo

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::pattern::PatternGrid;

pub mod playback;

use playback::{PlaybackEvent, SampleTrigger, TickShared};

pub const BPM_MIN: u32 = 60;
pub const BPM_MAX: u32 = 240;

/// Current tempo in beats per minute, shared lock-free between the UI
/// thread and the tick thread. Always within [`BPM_MIN`]..=[`BPM_MAX`].
#[derive(Clone)]
pub struct TempoControl {
    bpm: Arc<AtomicU32>,
}

impl TempoControl {
    pub fn new(bpm: u32) -> Self {
        Self {
            bpm: Arc::new(AtomicU32::new(bpm.clamp(BPM_MIN, BPM_MAX))),
        }
    }

    pub fn set(&self, bpm: u32) {
        self.bpm.store(bpm.clamp(BPM_MIN, BPM_MAX), Ordering::SeqCst);
    }

    pub fn get(&self) -> u32 {
        self.bpm.load(Ordering::SeqCst)
    }

    /// Duration of one sixteenth note at the current tempo. Recomputed from
    /// the live BPM on every call, never cached, so a tempo change applies
    /// at the next tick boundary.
    pub fn step_delay(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.get()) / 4.0)
    }
}

impl Default for TempoControl {
    fn default() -> Self {
        Self::new(120)
    }
}

/// Transport state machine and owner of the step cursor.
///
/// `start` spawns a dedicated tick thread; `stop` cancels the pending tick
/// and joins it, so no new tick begins after `stop` returns. The cursor
/// survives a stop - restarting resumes from the halted step - and only
/// `reset` rewinds it to 0. Highlight changes are reported as
/// [`PlaybackEvent`]s drained via [`poll_events`](Self::poll_events).
pub struct Sequencer {
    running: Arc<AtomicBool>,
    cursor: Arc<AtomicUsize>,
    grid: Arc<Mutex<PatternGrid>>,
    tempo: TempoControl,
    event_tx: Sender<PlaybackEvent>,
    event_rx: Receiver<PlaybackEvent>,
    worker: Option<JoinHandle<()>>,
}

impl Sequencer {
    pub fn new(grid: Arc<Mutex<PatternGrid>>, tempo: TempoControl) -> Self {
        let (event_tx, event_rx) = channel();
        Self {
            running: Arc::new(AtomicBool::new(false)),
            cursor: Arc::new(AtomicUsize::new(0)),
            grid,
            tempo,
            event_tx,
            event_rx,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn current_step(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Transitions Stopped -> Running and spawns the tick thread, with the
    /// first tick due immediately. A no-op while already Running; the
    /// atomic swap guarantees a second tick stream can never start.
    pub fn start<T: SampleTrigger>(&mut self, sink: T) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = TickShared {
            running: Arc::clone(&self.running),
            cursor: Arc::clone(&self.cursor),
            grid: Arc::clone(&self.grid),
            tempo: self.tempo.clone(),
            events: self.event_tx.clone(),
        };
        self.worker = Some(thread::spawn(move || playback::run(shared, sink)));
        log::debug!("sequencer started at step {}", self.current_step());
    }

    /// Transitions to Stopped from any state. Cancels the pending tick and
    /// joins the tick thread: once this returns no further tick fires (at
    /// most the one already in flight has drained). Clears the highlight,
    /// not the pattern data.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("tick thread panicked");
            }
        }
        let _ = self.event_tx.send(PlaybackEvent::HighlightCleared);
        log::debug!("sequencer stopped at step {}", self.current_step());
    }

    /// Rewinds the cursor to step 0, clears the pattern data and the
    /// highlight. Does NOT stop playback: a running sequencer carries on
    /// from step 0 over the now-empty grid.
    pub fn reset(&mut self) {
        self.cursor.store(0, Ordering::SeqCst);
        self.grid.lock().unwrap().clear();
        let _ = self.event_tx.send(PlaybackEvent::HighlightCleared);
        log::debug!("sequencer reset");
    }

    /// Drains queued events without blocking.
    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.stop();
    }
}
