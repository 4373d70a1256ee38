//! # Solfa - Movable-Doh Ear Training GUI
//!
//! This module contains the main GUI application for Solfa. It shows the
//! detected pitch, note name, and movable-doh solfège syllable in real
//! time, with a selector for the root note that "do" lands on.
//!
//! ## Architecture
//! - **Main Thread**: Iced application hosting the detection loop
//! - **Audio Thread**: cpal stream callback handing frame snapshots to the core
//! - **Pacing**: 16 ms timer subscription driving the single-flight loop
//! - **Updates**: Crossbeam channel pushing per-tick detection updates

mod pacing;
mod ui;

use crossbeam_channel::Receiver;
use iced::{self, Element, Subscription, Theme};
use serde::{Deserialize, Serialize};

use pacing::FrameTimer;
use solfa_core::audio::CaptureSession;
use solfa_core::scheduler::{DetectionLoop, LoopState};
use solfa_core::DetectionUpdate;
use ui::main_display::create_main_view;

/// Where the selected root note is remembered between sessions.
const SETTINGS_PATH: &str = "solfa_settings.json";

/// Main entry point for the Solfa application.
pub fn main() -> iced::Result {
    eprintln!("[MAIN] Starting Solfa...");
    let result = iced::application("Solfa", SolfaApp::update, SolfaApp::view)
        .subscription(SolfaApp::subscription)
        .theme(SolfaApp::theme)
        .run();
    eprintln!("[MAIN] Application finished with result: {:?}", result);
    result
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    /// Start/stop toggle pressed.
    ToggleDetection,
    /// One of the twelve root selector buttons pressed.
    RootSelected(&'static str),
    /// Timer tick for driving the detection loop and display updates.
    Tick,
}

/// UI-specific data needed for rendering the interface.
#[derive(Debug, Clone, Default)]
pub struct AppDisplayData {
    /// Whether detection is currently running.
    pub active: bool,
    /// Last confident frequency, already formatted.
    pub pitch_display: String,
    /// Last confident note name.
    pub note: String,
    /// Last confident solfège syllable.
    pub syllable: String,
    /// Magnitude spectrum of the most recent analyzed frame.
    pub spectrum: Vec<f32>,
    /// Currently selected root note, flat-spelled.
    pub root: String,
    /// Capture failure to surface, if starting the session failed.
    pub capture_error: Option<String>,
}

/// Main application state for Solfa.
struct SolfaApp {
    /// The core detection loop, driven from the timer subscription.
    detection: DetectionLoop<FrameTimer, CaptureSession>,
    /// Channel on which the loop publishes per-tick updates.
    updates: Receiver<DetectionUpdate>,
    /// Single source of truth for all display data.
    display: AppDisplayData,
}

impl Default for SolfaApp {
    fn default() -> Self {
        eprintln!("[MAIN] Creating SolfaApp...");
        let (updates_tx, updates_rx) = crossbeam_channel::unbounded();
        let mut detection = DetectionLoop::new(FrameTimer::default(), updates_tx);

        // Restore the previously selected root, if there is one.
        match load_settings(SETTINGS_PATH) {
            Ok(settings) => detection.set_root(&settings.root),
            Err(e) => eprintln!("[MAIN] No saved settings ({}), using defaults", e),
        }

        let display = AppDisplayData {
            root: detection.root().to_string(),
            ..AppDisplayData::default()
        };

        Self {
            detection,
            updates: updates_rx,
            display,
        }
    }
}

impl SolfaApp {
    /// Handles application state updates based on incoming messages.
    fn update(&mut self, message: Message) {
        match message {
            Message::ToggleDetection => {
                if self.detection.loop_state() == LoopState::Idle {
                    match self.detection.start(CaptureSession::connect) {
                        Ok(()) => {
                            eprintln!("[MAIN] Detection started");
                            self.display.capture_error = None;
                        }
                        Err(e) => {
                            eprintln!("[MAIN] Could not start capture: {}", e);
                            self.display.capture_error =
                                Some(format!("Microphone unavailable: {}", e));
                        }
                    }
                } else {
                    eprintln!("[MAIN] Detection stopped");
                    self.detection.stop();
                }
                self.display.active = self.detection.state().active;
            }
            Message::RootSelected(root) => {
                self.detection.set_root(root);
                self.display.root = self.detection.root().to_string();
                let settings = Settings {
                    root: self.display.root.clone(),
                };
                if let Err(e) = save_settings(&settings, SETTINGS_PATH) {
                    eprintln!("[MAIN] Error saving settings: {}", e);
                }
            }
            Message::Tick => {
                // Drive the detection loop at display-refresh cadence,
                // then drain whatever it published.
                self.detection.on_frame();
                let mut updates = Vec::new();
                while let Ok(update) = self.updates.try_recv() {
                    updates.push(update);
                }
                for update in updates {
                    self.apply_update(update);
                }
            }
        }
    }

    /// Folds one published update into the display data.
    ///
    /// The spectrum refreshes on every analyzed frame; the reading only
    /// changes when the tick produced a confident, in-range detection.
    fn apply_update(&mut self, update: DetectionUpdate) {
        if let Some(detection) = update.detection {
            self.display.pitch_display = detection.pitch_display;
            self.display.note = detection.note;
            self.display.syllable = detection.syllable.to_string();
        }
        self.display.spectrum = update.spectrum;
    }

    /// Renders the main application interface.
    ///
    /// Delegates all UI rendering to the main_display module, keeping
    /// this function focused on application logic only.
    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display)
    }

    /// Creates a subscription for continuous application updates.
    ///
    /// Returns a timer subscription that fires every 16ms (60 FPS); each
    /// firing is one display refresh as far as the frame pacer is
    /// concerned.
    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(std::time::Duration::from_millis(16)).map(|_| Message::Tick)
    }

    /// Returns the application theme.
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

// --- Settings persistence ---

/// User settings carried across sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Settings {
    /// Selected root note, flat-spelled.
    root: String,
}

/// Saves the settings to a JSON file.
///
/// # Arguments
/// * `settings` - The settings to save
/// * `path` - File path to write (e.g., "solfa_settings.json")
fn save_settings(settings: &Settings, path: &str) -> anyhow::Result<()> {
    let json_string = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json_string)?;
    Ok(())
}

/// Loads settings from a JSON file.
///
/// # Arguments
/// * `path` - File path to load the settings from
fn load_settings(path: &str) -> anyhow::Result<Settings> {
    let data = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&data)?;
    Ok(settings)
}
