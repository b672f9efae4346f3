#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use beatgrid::{
    PatternGrid, PlaybackEvent, SampleBank, Sequencer, TempoControl, BPM_MAX, BPM_MIN, STEP_COUNT,
};

#[cfg(feature = "gui")]
use std::path::Path;
#[cfg(feature = "gui")]
use std::sync::{Arc, Mutex};

#[cfg(feature = "gui")]
const INSTRUMENTS: [&str; 4] = ["Kick", "Snare", "HiHat", "Clap"];

#[cfg(feature = "gui")]
const DEFAULT_SAMPLES: [&str; 4] = ["kick.wav", "snare.wav", "hihat.wav", "clap.wav"];

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([860.0, 420.0])
            .with_title("beatgrid - drum machine"),
        ..Default::default()
    };

    eframe::run_native(
        "beatgrid",
        options,
        Box::new(|_cc| Ok(Box::new(DrumMachineApp::new()))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct DrumMachineApp {
    grid: Arc<Mutex<PatternGrid>>,
    tempo: TempoControl,
    bank: Arc<SampleBank>,
    sequencer: Sequencer,
    // keeps the audio device open for the lifetime of the app
    _stream: Option<rodio::OutputStream>,

    // UI state
    highlight: Option<usize>,
    status: Option<String>,
}

#[cfg(feature = "gui")]
impl DrumMachineApp {
    fn new() -> Self {
        let (stream, bank) = match rodio::OutputStream::try_default() {
            Ok((stream, handle)) => (Some(stream), SampleBank::new(INSTRUMENTS.len(), handle)),
            Err(err) => {
                log::error!("no audio output available: {}", err);
                (None, SampleBank::detached(INSTRUMENTS.len()))
            }
        };
        let bank = Arc::new(bank);

        for (slot, file) in DEFAULT_SAMPLES.iter().enumerate() {
            if let Err(err) = bank.load(slot, Path::new(file)) {
                log::warn!("default sample for {}: {}", INSTRUMENTS[slot], err);
            }
        }

        let grid = Arc::new(Mutex::new(PatternGrid::new(INSTRUMENTS.len())));
        let tempo = TempoControl::default();
        let sequencer = Sequencer::new(Arc::clone(&grid), tempo.clone());

        Self {
            grid,
            tempo,
            bank,
            sequencer,
            _stream: stream,
            highlight: None,
            status: None,
        }
    }

    fn handle_playback_events(&mut self) {
        for event in self.sequencer.poll_events() {
            match event {
                PlaybackEvent::StepChanged { step, .. } => self.highlight = Some(step),
                PlaybackEvent::HighlightCleared => self.highlight = None,
            }
        }
    }

    fn load_sample(&mut self, instrument: usize) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("WAV audio", &["wav"])
            .pick_file()
        else {
            return;
        };

        match self.bank.load(instrument, &path) {
            Ok(()) => {
                log::info!(
                    "loaded {} sample from {}",
                    INSTRUMENTS[instrument],
                    path.display()
                );
                self.status = None;
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn cell_fill(active: bool, current: bool) -> egui::Color32 {
        if active && current {
            egui::Color32::YELLOW
        } else if active {
            egui::Color32::from_rgb(100, 180, 100)
        } else if current {
            egui::Color32::from_rgb(80, 80, 40)
        } else {
            egui::Color32::from_rgb(60, 60, 60)
        }
    }
}

#[cfg(feature = "gui")]
impl eframe::App for DrumMachineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.handle_playback_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("beatgrid");
            ui.add_space(10.0);

            // Transport controls
            ui.horizontal(|ui| {
                if self.sequencer.is_running() {
                    if ui.button("⏹ Stop").clicked() {
                        self.sequencer.stop();
                    }
                } else if ui.button("▶ Start").clicked() {
                    self.sequencer.start(Arc::clone(&self.bank));
                }

                if ui.button("Reset").clicked() {
                    self.sequencer.reset();
                }
                if ui.button("Random").clicked() {
                    self.grid.lock().unwrap().randomize();
                }

                ui.add_space(20.0);

                ui.label("BPM:");
                let mut bpm = self.tempo.get();
                if ui
                    .add(egui::Slider::new(&mut bpm, BPM_MIN..=BPM_MAX))
                    .changed()
                {
                    self.tempo.set(bpm);
                }
            });

            ui.add_space(20.0);

            // Step grid
            let mut toggled: Vec<(usize, usize)> = Vec::new();
            {
                let grid = self.grid.lock().unwrap();
                for (row, name) in INSTRUMENTS.iter().enumerate() {
                    ui.horizontal(|ui| {
                        ui.add_sized([60.0, 28.0], egui::Label::new(*name));
                        for step in 0..STEP_COUNT {
                            let active = grid.get(row, step);
                            let current = self.highlight == Some(step);
                            let button = egui::Button::new("")
                                .min_size(egui::vec2(28.0, 28.0))
                                .fill(Self::cell_fill(active, current));
                            if ui.add(button).clicked() {
                                toggled.push((row, step));
                            }
                        }
                    });
                }
            }
            if !toggled.is_empty() {
                let mut grid = self.grid.lock().unwrap();
                for (row, step) in toggled {
                    grid.toggle(row, step);
                }
            }

            ui.add_space(10.0);
            ui.separator();

            // Sample loading
            ui.horizontal(|ui| {
                for (slot, name) in INSTRUMENTS.iter().enumerate() {
                    if ui.button(format!("Load {} Sample", name)).clicked() {
                        self.load_sample(slot);
                    }
                }
            });

            let unloaded: Vec<&str> = INSTRUMENTS
                .iter()
                .enumerate()
                .filter(|&(slot, _)| !self.bank.is_loaded(slot))
                .map(|(_, name)| *name)
                .collect();
            if !unloaded.is_empty() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    format!("⚠ No sample loaded: {}", unloaded.join(", ")),
                );
            }

            if let Some(status) = &self.status {
                ui.colored_label(egui::Color32::RED, status);
            }
        });
    }
}
