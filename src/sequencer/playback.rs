//! The tick loop - timing, highlight events and sample triggering

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::SampleBank;
use crate::pattern::{PatternGrid, STEP_COUNT};
use crate::sequencer::TempoControl;

/// Highlight changes pushed to the UI, one `StepChanged` per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Highlight `step` and un-highlight `prev` for all instruments.
    StepChanged { step: usize, prev: usize },
    /// No step is highlighted any more (sent on stop and reset).
    HighlightCleared,
}

/// The seam between the tick loop and the audio backend. Implementations
/// must return promptly; the tick thread calls this inline.
pub trait SampleTrigger: Send + 'static {
    fn trigger(&self, instrument: usize);
}

impl SampleTrigger for Arc<SampleBank> {
    fn trigger(&self, instrument: usize) {
        SampleBank::trigger(self, instrument);
    }
}

/// State handed to the tick thread at start.
pub(crate) struct TickShared {
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) cursor: Arc<AtomicUsize>,
    pub(crate) grid: Arc<Mutex<PatternGrid>>,
    pub(crate) tempo: TempoControl,
    pub(crate) events: Sender<PlaybackEvent>,
}

/// Upper bound on one timer sleep; a stop request is noticed within this.
const CANCEL_POLL: Duration = Duration::from_millis(2);

/// Runs until the run flag drops. The first tick fires immediately; each
/// subsequent deadline is advanced by the tick's own fresh step delay, so
/// timing does not drift however long the loop runs.
pub(crate) fn run<T: SampleTrigger>(shared: TickShared, sink: T) {
    let mut next_tick = Instant::now();
    while shared.running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now < next_tick {
            thread::sleep((next_tick - now).min(CANCEL_POLL));
            continue;
        }

        next_tick += tick_once(&shared, &sink);

        // after a stall (suspend, debugger) realign instead of bursting
        let now = Instant::now();
        if next_tick < now {
            next_tick = now;
        }
    }
}

/// One tick: read the live tempo, emit the highlight pair, trigger every
/// instrument active at the current step, advance the cursor. Returns the
/// delay until the next tick.
pub(crate) fn tick_once<T: SampleTrigger>(shared: &TickShared, sink: &T) -> Duration {
    let delay = shared.tempo.step_delay();

    let step = shared.cursor.load(Ordering::SeqCst);
    let prev = (step + STEP_COUNT - 1) % STEP_COUNT;
    let _ = shared.events.send(PlaybackEvent::StepChanged { step, prev });

    {
        let grid = shared.grid.lock().unwrap();
        for row in 0..grid.rows() {
            if grid.get(row, step) {
                sink.trigger(row);
            }
        }
    }

    // advance unless a reset rewound the cursor mid-tick; the reset wins
    let next = (step + 1) % STEP_COUNT;
    let _ = shared
        .cursor
        .compare_exchange(step, next, Ordering::SeqCst, Ordering::SeqCst);

    delay
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, Receiver};

    #[derive(Clone, Default)]
    struct RecordingSink {
        hits: Arc<Mutex<Vec<usize>>>,
    }

    impl SampleTrigger for RecordingSink {
        fn trigger(&self, instrument: usize) {
            self.hits.lock().unwrap().push(instrument);
        }
    }

    fn shared_with(grid: PatternGrid) -> (TickShared, Receiver<PlaybackEvent>) {
        let (events, rx) = channel();
        let shared = TickShared {
            running: Arc::new(AtomicBool::new(true)),
            cursor: Arc::new(AtomicUsize::new(0)),
            grid: Arc::new(Mutex::new(grid)),
            tempo: TempoControl::default(),
            events,
        };
        (shared, rx)
    }

    #[test]
    fn tick_emits_highlight_pair_and_advances() {
        let (shared, rx) = shared_with(PatternGrid::new(2));
        let sink = RecordingSink::default();

        tick_once(&shared, &sink);
        assert_eq!(
            rx.try_recv().unwrap(),
            PlaybackEvent::StepChanged { step: 0, prev: 15 }
        );
        assert_eq!(shared.cursor.load(Ordering::SeqCst), 1);

        tick_once(&shared, &sink);
        assert_eq!(
            rx.try_recv().unwrap(),
            PlaybackEvent::StepChanged { step: 1, prev: 0 }
        );
    }

    #[test]
    fn tick_triggers_only_rows_active_at_the_current_step() {
        let mut grid = PatternGrid::new(3);
        grid.toggle(0, 0);
        grid.toggle(2, 0);
        grid.toggle(1, 5); // other step, must stay silent
        let (shared, _rx) = shared_with(grid);
        let sink = RecordingSink::default();

        tick_once(&shared, &sink);
        assert_eq!(*sink.hits.lock().unwrap(), vec![0, 2]);
    }

    #[test]
    fn cursor_wraps_after_last_step() {
        let (shared, rx) = shared_with(PatternGrid::new(1));
        shared.cursor.store(STEP_COUNT - 1, Ordering::SeqCst);
        let sink = RecordingSink::default();

        tick_once(&shared, &sink);
        assert_eq!(
            rx.try_recv().unwrap(),
            PlaybackEvent::StepChanged { step: 15, prev: 14 }
        );
        assert_eq!(shared.cursor.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tick_returns_the_live_step_delay() {
        let (shared, _rx) = shared_with(PatternGrid::new(1));
        let sink = RecordingSink::default();

        shared.tempo.set(120);
        assert_eq!(tick_once(&shared, &sink), Duration::from_millis(125));
        shared.tempo.set(240);
        assert_eq!(tick_once(&shared, &sink), Duration::from_micros(62_500));
    }

    #[test]
    fn grid_change_applies_on_the_next_pass() {
        let (shared, _rx) = shared_with(PatternGrid::new(1));
        let sink = RecordingSink::default();

        tick_once(&shared, &sink); // step 0, cell off: silent
        assert!(sink.hits.lock().unwrap().is_empty());

        shared.grid.lock().unwrap().toggle(0, 0);
        for _ in 1..STEP_COUNT {
            tick_once(&shared, &sink); // steps 1..=15
        }
        assert!(sink.hits.lock().unwrap().is_empty());

        tick_once(&shared, &sink); // back at step 0, cell now on
        assert_eq!(*sink.hits.lock().unwrap(), vec![0]);
    }

    #[test]
    fn reset_between_ticks_wins_over_the_advance() {
        let (shared, _rx) = shared_with(PatternGrid::new(1));
        let sink = RecordingSink::default();

        for _ in 0..5 {
            tick_once(&shared, &sink);
        }
        assert_eq!(shared.cursor.load(Ordering::SeqCst), 5);

        shared.cursor.store(0, Ordering::SeqCst); // what reset() does
        tick_once(&shared, &sink);
        assert_eq!(shared.cursor.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn two_full_loops_of_the_reference_kick_pattern() {
        let mut grid = PatternGrid::new(4);
        for step in [0, 4, 8, 12] {
            grid.toggle(0, step);
        }
        let (shared, rx) = shared_with(grid);
        let sink = RecordingSink::default();

        let mut kick_steps = Vec::new();
        for _ in 0..(2 * STEP_COUNT) {
            let before = sink.hits.lock().unwrap().len();
            tick_once(&shared, &sink);
            if sink.hits.lock().unwrap().len() > before {
                if let PlaybackEvent::StepChanged { step, .. } = rx.try_iter().last().unwrap() {
                    kick_steps.push(step);
                }
            }
        }

        assert_eq!(kick_steps, vec![0, 4, 8, 12, 0, 4, 8, 12]);
        let hits = sink.hits.lock().unwrap();
        assert_eq!(hits.len(), 8);
        assert!(hits.iter().all(|&instrument| instrument == 0));
    }
}
