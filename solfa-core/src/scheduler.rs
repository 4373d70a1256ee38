//! # Detection Scheduler Module
//!
//! The single-flight control loop that ties capture, pitch detection, note
//! naming, and solfège mapping together. Exactly one tick request is
//! outstanding at any time: the pending handle is cleared the moment a
//! tick begins and a new request is only issued once none is pending, so
//! tick chains can never overlap or publish out of order.
//!
//! The loop is generic over its two external collaborators: a
//! [`TickSource`] (the host's frame-pacing primitive) and a
//! [`FrameSource`] (the capture session), which keeps the whole state
//! machine testable with simulated implementations.

use anyhow::Result;
use crossbeam_channel::Sender;

use crate::{Detection, DetectionState, DetectionUpdate, fft, pitch, solfege, tuning};

/// Minimum RMS amplitude handed to the estimator as its silence gate.
pub const AMPLITUDE_THRESHOLD: f32 = 0.01;

/// Ceiling on plausible detections, in Hz. Estimates at or above this are
/// treated like undetected pitch: skip the tick, keep scheduling.
const MAX_FREQUENCY: f32 = 7000.0;

/// Root note selected before the user picks one.
pub const DEFAULT_ROOT: &str = "C";

/// The host-side frame-pacing primitive.
///
/// `request_tick` arms a single future invocation and returns a handle
/// that can cancel it; the host decides when an armed request actually
/// fires (typically once per display refresh).
pub trait TickSource {
    type Handle: Copy + PartialEq;

    /// Arms one tick invocation and returns its cancellation handle.
    fn request_tick(&mut self) -> Self::Handle;

    /// Revokes a scheduled tick that has not fired yet.
    fn cancel_tick(&mut self, handle: Self::Handle);

    /// Consumes the armed request behind `handle` if it fires on the
    /// current frame. A cancelled or superseded handle returns false.
    fn fire(&mut self, handle: Self::Handle) -> bool;
}

/// The capture collaborator as seen by the detection loop.
pub trait FrameSource {
    /// Copies the newest frame snapshot into `frame` and returns the
    /// session sample rate, or `None` when no new frame has arrived
    /// since the last read.
    fn read_frame(&mut self, frame: &mut Vec<f32>) -> Option<u32>;
}

/// Detection loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No capture active.
    Idle,
    /// Capture connected, no tick scheduled yet.
    Armed,
    /// Exactly one tick request outstanding, nothing published so far.
    TickPending,
    /// Tick pending and detection state has been published at least once.
    Running,
}

/// The detection-and-scheduling loop.
///
/// Owns the published [`DetectionState`], the reused analysis buffer, and
/// the single-flight pending marker. All methods run on the host's
/// cooperative thread; the only concurrent party is the capture stream
/// callback on the far side of the [`FrameSource`] snapshot handoff.
pub struct DetectionLoop<T: TickSource, C: FrameSource> {
    ticks: T,
    pending: Option<T::Handle>,
    capture: Option<C>,
    loop_state: LoopState,
    root: &'static str,
    // One analysis buffer, reused every tick.
    frame: Vec<f32>,
    state: DetectionState,
    updates: Sender<DetectionUpdate>,
}

impl<T: TickSource, C: FrameSource> DetectionLoop<T, C> {
    /// Creates an idle loop that will publish updates into `updates`.
    pub fn new(ticks: T, updates: Sender<DetectionUpdate>) -> Self {
        Self {
            ticks,
            pending: None,
            capture: None,
            loop_state: LoopState::Idle,
            root: DEFAULT_ROOT,
            frame: Vec::new(),
            state: DetectionState::default(),
            updates,
        }
    }

    /// The published detection state (last confident reading + active flag).
    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    /// The current state-machine position.
    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    /// The current root note, flat-spelled.
    pub fn root(&self) -> &'static str {
        self.root
    }

    /// Starts detection by requesting a capture connection.
    ///
    /// On success the loop moves through `Armed` and arms the first tick.
    /// A connection failure is returned for the caller to surface and
    /// leaves the loop `Idle`; there is no automatic retry. Starting an
    /// already-started loop does nothing.
    pub fn start(&mut self, connect: impl FnOnce() -> Result<C>) -> Result<()> {
        if self.loop_state != LoopState::Idle {
            return Ok(());
        }
        let capture = connect()?;
        self.capture = Some(capture);
        self.loop_state = LoopState::Armed;
        self.state.active = true;
        self.arm_next_tick();
        Ok(())
    }

    /// Stops detection: cancels any scheduled tick and disconnects the
    /// capture stream from the analysis sink. The last published reading
    /// stays visible; only publication stops.
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.ticks.cancel_tick(handle);
        }
        self.capture = None;
        self.loop_state = LoopState::Idle;
        self.state.active = false;
    }

    /// Changes the root note.
    ///
    /// Cancels a scheduled-but-unfired tick and immediately arms a fresh
    /// one, so no stale-root computation can publish and no cadence is
    /// lost. A tick that already fired completes with the root it read.
    /// Unknown spellings are logged and ignored.
    pub fn set_root(&mut self, root: &str) {
        let Some(index) = solfege::pitch_class_index(root) else {
            eprintln!("[DETECT] Ignoring unknown root spelling: {:?}", root);
            return;
        };
        self.root = tuning::NOTE_NAMES[index];

        if let Some(handle) = self.pending.take() {
            self.ticks.cancel_tick(handle);
            self.arm_next_tick();
        }
    }

    /// Entry point for the frame-pacing host, invoked once per display
    /// refresh. Runs at most one detection tick.
    pub fn on_frame(&mut self) {
        let Some(handle) = self.pending else { return };
        if !self.ticks.fire(handle) {
            return;
        }
        // The pending marker clears the moment the tick begins; rearming
        // afterwards is what keeps exactly one request in flight.
        self.pending = None;
        self.run_tick();
        self.arm_next_tick();
    }

    /// Single-flight guard: request the next tick only while none is
    /// outstanding.
    fn arm_next_tick(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.ticks.request_tick());
            if self.loop_state == LoopState::Armed {
                self.loop_state = LoopState::TickPending;
            }
        }
    }

    /// One complete tick: read the latest frame, run the analysis
    /// pipeline, publish the outcome.
    fn run_tick(&mut self) {
        let Some(capture) = self.capture.as_mut() else {
            return;
        };
        let Some(sample_rate) = capture.read_frame(&mut self.frame) else {
            // No new snapshot yet; keep cadence and try again next tick.
            return;
        };

        let spectrum = fft::magnitude_spectrum(&self.frame);
        let detection = self.detect(sample_rate);

        if let Some(detection) = &detection {
            self.state.pitch_display = detection.pitch_display.clone();
            self.state.note = detection.note.clone();
            self.state.syllable = detection.syllable.to_string();
            if self.loop_state == LoopState::TickPending {
                self.loop_state = LoopState::Running;
            }
        }

        // A closed channel just means the presentation side went away.
        let _ = self.updates.send(DetectionUpdate { detection, spectrum });
    }

    /// Runs estimator, namer, and mapper over the current frame.
    ///
    /// `None` covers every skip-and-continue outcome: no confident pitch,
    /// a frequency outside the plausible range, and the
    /// tables-out-of-sync defect (which is additionally logged and
    /// asserted, since it can never occur for well-formed input).
    fn detect(&self, sample_rate: u32) -> Option<Detection> {
        let frequency = pitch::estimate_pitch(&self.frame, sample_rate, AMPLITUDE_THRESHOLD)?;
        if frequency <= 0.0 || frequency >= MAX_FREQUENCY {
            return None;
        }

        let note = tuning::note_name(frequency);
        let Some(syllable) = solfege::syllable_for(&note, self.root) else {
            eprintln!("[DETECT] No syllable for {} over root {}", note, self.root);
            debug_assert!(false, "syllable lookup failed for a well-formed note");
            return None;
        };

        Some(Detection {
            pitch_display: format!("{:.2}", frequency),
            note,
            syllable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Receiver;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    const SAMPLE_RATE: u32 = 44100;
    const FRAME_SIZE: usize = 2048;

    /// Shared view into a simulated frame pacer, so tests can observe
    /// requests and cancellations while the loop owns the source.
    #[derive(Default)]
    struct TickLog {
        next_handle: u64,
        armed: Option<u64>,
        requests: usize,
        cancels: usize,
    }

    #[derive(Clone, Default)]
    struct FakeTicks(Rc<RefCell<TickLog>>);

    impl TickSource for FakeTicks {
        type Handle = u64;

        fn request_tick(&mut self) -> u64 {
            let mut log = self.0.borrow_mut();
            assert!(
                log.armed.is_none(),
                "second tick requested while one is outstanding"
            );
            log.next_handle += 1;
            log.armed = Some(log.next_handle);
            log.requests += 1;
            log.next_handle
        }

        fn cancel_tick(&mut self, handle: u64) {
            let mut log = self.0.borrow_mut();
            if log.armed == Some(handle) {
                log.armed = None;
                log.cancels += 1;
            }
        }

        fn fire(&mut self, handle: u64) -> bool {
            let mut log = self.0.borrow_mut();
            if log.armed == Some(handle) {
                log.armed = None;
                true
            } else {
                false
            }
        }
    }

    struct FakeFrames {
        frames: VecDeque<Vec<f32>>,
    }

    impl FakeFrames {
        fn with_frames(frames: Vec<Vec<f32>>) -> Self {
            Self {
                frames: frames.into(),
            }
        }
    }

    impl FrameSource for FakeFrames {
        fn read_frame(&mut self, frame: &mut Vec<f32>) -> Option<u32> {
            let next = self.frames.pop_front()?;
            frame.clear();
            frame.extend_from_slice(&next);
            Some(SAMPLE_RATE)
        }
    }

    fn sine_frame(freq: f32) -> Vec<f32> {
        (0..FRAME_SIZE)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                0.5 * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    fn started_loop(
        frames: Vec<Vec<f32>>,
    ) -> (
        DetectionLoop<FakeTicks, FakeFrames>,
        FakeTicks,
        Receiver<DetectionUpdate>,
    ) {
        let ticks = FakeTicks::default();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut detection = DetectionLoop::new(ticks.clone(), tx);
        detection
            .start(move || Ok(FakeFrames::with_frames(frames)))
            .unwrap();
        (detection, ticks, rx)
    }

    #[test]
    fn start_arms_exactly_one_tick() {
        let (detection, ticks, _rx) = started_loop(vec![]);
        assert_eq!(detection.loop_state(), LoopState::TickPending);
        assert!(detection.state().active);
        let log = ticks.0.borrow();
        assert_eq!(log.requests, 1);
        assert!(log.armed.is_some());
    }

    #[test]
    fn failed_connection_leaves_the_loop_idle() {
        let ticks = FakeTicks::default();
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut detection: DetectionLoop<FakeTicks, FakeFrames> =
            DetectionLoop::new(ticks.clone(), tx);

        let result = detection.start(|| Err(anyhow::anyhow!("permission denied")));

        assert!(result.is_err());
        assert_eq!(detection.loop_state(), LoopState::Idle);
        assert!(!detection.state().active);
        assert_eq!(ticks.0.borrow().requests, 0);
    }

    #[test]
    fn confident_tick_publishes_and_rearms() {
        let (mut detection, ticks, rx) = started_loop(vec![sine_frame(440.0)]);

        detection.on_frame();

        let update = rx.try_recv().expect("tick publishes an update");
        let reading = update.detection.expect("440 Hz sine is confidently detected");
        assert_eq!(reading.note, "A4");
        assert_eq!(reading.syllable, "la");
        assert!(!update.spectrum.is_empty());

        assert_eq!(detection.loop_state(), LoopState::Running);
        assert_eq!(detection.state().note, "A4");
        assert_eq!(detection.state().syllable, "la");

        // Exactly one fresh request after the tick completed.
        let log = ticks.0.borrow();
        assert_eq!(log.requests, 2);
        assert!(log.armed.is_some());
    }

    #[test]
    fn silent_tick_skips_publication_but_keeps_cadence() {
        let (mut detection, ticks, rx) = started_loop(vec![vec![0.0; FRAME_SIZE]]);

        detection.on_frame();

        let update = rx.try_recv().expect("spectrum still refreshes");
        assert!(update.detection.is_none());
        // Nothing confident was published, so the loop has not reached
        // Running and the state triple is untouched.
        assert_eq!(detection.loop_state(), LoopState::TickPending);
        assert_eq!(detection.state().note, "");
        assert_eq!(ticks.0.borrow().requests, 2);
    }

    #[test]
    fn out_of_range_frequency_is_not_published() {
        // ~7.2 kHz is detectable but above the plausible ceiling.
        let (mut detection, _ticks, rx) = started_loop(vec![sine_frame(7200.0)]);

        detection.on_frame();

        let update = rx.try_recv().unwrap();
        assert!(update.detection.is_none());
        assert_eq!(detection.state().note, "");
    }

    #[test]
    fn tick_without_a_new_frame_keeps_scheduling() {
        let (mut detection, ticks, rx) = started_loop(vec![]);

        detection.on_frame();

        assert!(rx.try_recv().is_err());
        let log = ticks.0.borrow();
        assert_eq!(log.requests, 2);
        assert!(log.armed.is_some());
    }

    #[test]
    fn rapid_fire_ticks_never_overlap() {
        let frames = (0..20).map(|_| sine_frame(330.0)).collect();
        let (mut detection, ticks, rx) = started_loop(frames);

        // FakeTicks panics if a second request is ever armed on top of an
        // outstanding one, so pumping hard exercises the guard directly.
        for _ in 0..50 {
            detection.on_frame();
        }

        let log = ticks.0.borrow();
        assert_eq!(log.requests, 51);
        assert_eq!(rx.try_iter().count(), 20);
    }

    #[test]
    fn root_change_cancels_the_scheduled_tick_and_rearms() {
        let (mut detection, ticks, rx) = started_loop(vec![sine_frame(440.0)]);
        let armed_before = ticks.0.borrow().armed;

        detection.set_root("D");

        {
            let log = ticks.0.borrow();
            assert_eq!(log.cancels, 1);
            assert!(log.armed.is_some());
            assert_ne!(log.armed, armed_before);
        }

        // The next published syllable reflects the new root: A over D.
        detection.on_frame();
        let update = rx.try_recv().unwrap();
        assert_eq!(update.detection.unwrap().syllable, "sol");
    }

    #[test]
    fn sharp_root_spellings_are_normalized() {
        let (mut detection, _ticks, _rx) = started_loop(vec![]);
        detection.set_root("F#");
        assert_eq!(detection.root(), "Gb");
    }

    #[test]
    fn unknown_root_spelling_is_ignored() {
        let (mut detection, ticks, _rx) = started_loop(vec![]);
        detection.set_root("H");
        assert_eq!(detection.root(), "C");
        assert_eq!(ticks.0.borrow().cancels, 0);
    }

    #[test]
    fn stop_cancels_and_preserves_the_last_reading() {
        let (mut detection, ticks, _rx) = started_loop(vec![sine_frame(440.0)]);
        detection.on_frame();

        detection.stop();

        assert_eq!(detection.loop_state(), LoopState::Idle);
        assert!(!detection.state().active);
        // Last reading stays visible after stopping.
        assert_eq!(detection.state().note, "A4");
        let log = ticks.0.borrow();
        assert_eq!(log.cancels, 1);
        assert!(log.armed.is_none());
    }

    #[test]
    fn stopped_loop_ignores_frames_and_can_restart() {
        let (mut detection, ticks, rx) = started_loop(vec![sine_frame(440.0)]);
        detection.stop();

        detection.on_frame();
        assert!(rx.try_recv().is_err());

        detection
            .start(|| Ok(FakeFrames::with_frames(vec![sine_frame(262.0)])))
            .unwrap();
        assert_eq!(detection.loop_state(), LoopState::TickPending);

        detection.on_frame();
        let update = rx.try_recv().unwrap();
        let reading = update.detection.unwrap();
        assert_eq!(reading.note, "C4");
        assert_eq!(reading.syllable, "do");
        let _ = ticks;
    }
}
