//! Beat scheduler: tempo, meter and beat phase.
//!
//! The scheduler decides *which* beat it is and tells its subscribers. It does
//! not play sounds or draw anything; hosts hang that off [`BeatScheduler::on_beat`].

use std::time::Duration;

use log::{debug, trace};

use crate::error::MetronomeError;
use crate::store::Song;
use crate::tempo::Tempo;
use crate::time_signature::TimeSignature;
use crate::timer::{Timer, TimerHandle};

/// One beat, as delivered to subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeatEvent {
    /// Position in the measure, starting at 1.
    pub phase: u32,
    pub is_first_beat: bool,
}

type BeatHandler = Box<dyn FnMut(&BeatEvent)>;

pub struct BeatScheduler<T: Timer> {
    timer: T,
    tempo: Tempo,
    time_signature: TimeSignature,
    // 0 means no beat of the current measure has fired yet.
    phase: u32,
    handle: Option<TimerHandle>,
    handlers: Vec<BeatHandler>,
}

impl<T: Timer> BeatScheduler<T> {
    pub fn new(timer: T) -> Self {
        Self::with_settings(timer, Tempo::default(), TimeSignature::default())
    }

    pub fn with_settings(timer: T, tempo: Tempo, time_signature: TimeSignature) -> Self {
        Self {
            timer,
            tempo,
            time_signature,
            phase: 0,
            handle: None,
            handlers: Vec::new(),
        }
    }

    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    /// The beat most recently emitted in this measure, `None` before the
    /// first beat or right after a meter change.
    pub fn phase(&self) -> Option<u32> {
        (self.phase > 0).then_some(self.phase)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.tempo.interval()
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Changes the tempo. Out-of-range values are rejected and leave the
    /// scheduler exactly as it was. While running, the next beat is pushed
    /// out to one new interval from now.
    pub fn set_tempo(&mut self, bpm: u32) -> Result<(), MetronomeError> {
        self.apply_tempo(Tempo::new(bpm)?);
        Ok(())
    }

    /// Nudges the tempo by `delta`, stopping at the range limits.
    pub fn adjust_tempo(&mut self, delta: i32) -> Tempo {
        let tempo = Tempo::clamped(self.tempo.bpm() as i64 + delta as i64);
        if tempo != self.tempo {
            self.apply_tempo(tempo);
        }
        self.tempo
    }

    fn apply_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
        if let Some(handle) = self.handle {
            self.timer.reschedule(handle, tempo.interval());
        }
        debug!("tempo set to {} ({} ms)", tempo, tempo.interval_ms());
    }

    /// Changes the meter. The next beat starts a fresh measure.
    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = time_signature;
        self.phase = 0;
        debug!("time signature set to {}", time_signature);
    }

    /// Loads a saved song's tempo and meter.
    pub fn apply_song(&mut self, song: &Song) -> Result<(), MetronomeError> {
        self.set_tempo(song.tempo.bpm())?;
        self.set_time_signature(song.time_signature);
        debug!("applied song {:?}", song.name);
        Ok(())
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.handle = Some(self.timer.schedule_repeating(self.tempo.interval()));
        debug!("started at {} in {}", self.tempo, self.time_signature);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.timer.cancel(handle);
            debug!("stopped at beat {}", self.phase);
        }
    }

    pub fn toggle(&mut self) -> bool {
        if self.is_running() {
            self.stop();
        } else {
            self.start();
        }
        self.is_running()
    }

    pub fn on_beat<F>(&mut self, handler: F)
    where
        F: FnMut(&BeatEvent) + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Runs any tick the timer says is due and returns how many ran.
    pub fn pump(&mut self) -> usize {
        let Some(handle) = self.handle else {
            return 0;
        };
        let mut ticks = 0;
        while self.timer.poll(handle) {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    fn tick(&mut self) {
        self.phase += 1;
        if self.phase > self.time_signature.beats_per_measure() {
            self.phase = 1;
        }

        let event = BeatEvent {
            phase: self.phase,
            is_first_beat: self.phase == 1,
        };
        trace!("beat {}/{}", event.phase, self.time_signature.beats_per_measure());

        for handler in &mut self.handlers {
            handler(&event);
        }
    }
}
