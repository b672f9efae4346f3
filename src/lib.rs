//! beatgrid - a step-sequencer drum machine library
//!
//! The core components of a grid drum machine:
//! - Pattern grid: the instrument-by-step boolean matrix
//! - Sample bank: decoded samples with fire-and-forget triggering
//! - Tempo control: shared BPM and step timing
//! - Sequencer: the transport state machine and its tick thread

pub mod audio;
pub mod pattern;
pub mod sequencer;

// Re-export commonly used types
pub use audio::{LoadError, LoadedSample, SampleBank};
pub use pattern::{PatternGrid, STEP_COUNT};
pub use sequencer::playback::{PlaybackEvent, SampleTrigger};
pub use sequencer::{Sequencer, TempoControl, BPM_MAX, BPM_MIN};
