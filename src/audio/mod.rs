//! Sample storage and fire-and-forget playback using rodio

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::{Decoder, OutputStreamHandle, Source};

/// Why a sample file could not be bound to an instrument slot.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot open {}: {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {}: {}", .path.display(), .source)]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
}

/// A sample decoded up front into f32 frames. Cloning is cheap (the frame
/// buffer is shared), and each clone is an independent playback voice.
#[derive(Clone)]
pub struct LoadedSample {
    channels: u16,
    sample_rate: u32,
    frames: Arc<Vec<f32>>,
    cursor: usize,
}

impl LoadedSample {
    /// Opens and fully decodes an audio file.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_owned(),
            source,
        })?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|source| LoadError::Decode {
            path: path.to_owned(),
            source,
        })?;

        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let frames: Vec<f32> = decoder.convert_samples().collect();

        Ok(Self {
            channels,
            sample_rate,
            frames: Arc::new(frames),
            cursor: 0,
        })
    }

    /// A fresh voice over the shared frame buffer, rewound to the start.
    fn voice(&self) -> Self {
        Self {
            channels: self.channels,
            sample_rate: self.sample_rate,
            frames: Arc::clone(&self.frames),
            cursor: 0,
        }
    }
}

impl Iterator for LoadedSample {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let frame = self.frames.get(self.cursor).copied();
        self.cursor += 1;
        frame
    }
}

impl Source for LoadedSample {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let per_channel = self.frames.len() as u64 / u64::from(self.channels.max(1));
        Some(Duration::from_micros(
            per_channel * 1_000_000 / u64::from(self.sample_rate.max(1)),
        ))
    }
}

/// One sample slot per instrument. Loading replaces a slot's binding only
/// after the new file has decoded; triggering submits an independent voice
/// to the output mixer and returns immediately.
pub struct SampleBank {
    slots: Mutex<Vec<Option<LoadedSample>>>,
    output: Option<OutputStreamHandle>,
}

impl SampleBank {
    pub fn new(slot_count: usize, output: OutputStreamHandle) -> Self {
        Self {
            slots: Mutex::new(vec![None; slot_count]),
            output: Some(output),
        }
    }

    /// A bank with no audio device; loads still work, triggers are no-ops.
    pub fn detached(slot_count: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; slot_count]),
            output: None,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_loaded(&self, instrument: usize) -> bool {
        self.slots.lock().unwrap()[instrument].is_some()
    }

    /// Decodes `path` and binds it to `instrument`. On failure the slot's
    /// previous binding (if any) is left untouched.
    ///
    /// Panics on an out-of-range instrument index.
    pub fn load(&self, instrument: usize, path: &Path) -> Result<(), LoadError> {
        let sample = LoadedSample::from_path(path)?;
        self.slots.lock().unwrap()[instrument] = Some(sample);
        Ok(())
    }

    /// Fire-and-forget playback of the bound sample. A no-op when the slot
    /// is empty or the bank has no audio device; overlapping triggers each
    /// get their own voice. Playback errors are logged and swallowed so the
    /// sequencer loop never stalls on audio.
    ///
    /// Panics on an out-of-range instrument index.
    pub fn trigger(&self, instrument: usize) {
        let Some(output) = &self.output else {
            return;
        };
        let voice = match self.slots.lock().unwrap()[instrument] {
            Some(ref sample) => sample.voice(),
            None => return,
        };
        if let Err(err) = output.play_raw(voice) {
            log::warn!("dropped trigger for instrument {}: {}", instrument, err);
        }
    }
}
