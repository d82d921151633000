use std::collections::HashMap;
use std::f32::consts::PI;

use log::warn;
use rand::Rng;
use rodio::{OutputStream, Sink, buffer::SamplesBuffer};

use crate::error::AudioError;
use crate::scheduler::BeatEvent;
use crate::utilities::sound_type::SoundType;

pub const SAMPLE_RATE: u32 = 44100;

/// Shape of a synthesized click.
pub(crate) struct Voice {
    pub duration_ms: u32,
    /// (frequency Hz, amplitude) pairs summed together.
    pub partials: &'static [(f32, f32)],
    /// Exponential decay rate; 0 holds the level flat.
    pub decay: f32,
    /// Exponential pitch fall rate applied to every partial.
    pub pitch_drop: f32,
    pub noise: f32,
}

pub(crate) fn render(voice: &Voice) -> Vec<f32> {
    let samples = (SAMPLE_RATE * voice.duration_ms / 1000) as usize;
    let dt = 1.0 / SAMPLE_RATE as f32;
    let mut rng = rand::thread_rng();
    let mut phases = vec![0.0f32; voice.partials.len()];

    let mut wave = Vec::with_capacity(samples);
    for i in 0..samples {
        let t = i as f32 * dt;
        let envelope = (-t * voice.decay).exp();
        let bend = (-t * voice.pitch_drop).exp();

        let mut sample = 0.0;
        for (phase, &(freq, amp)) in phases.iter_mut().zip(voice.partials) {
            sample += phase.sin() * amp;
            *phase = (*phase + 2.0 * PI * freq * bend * dt) % (2.0 * PI);
        }
        if voice.noise > 0.0 {
            sample += rng.gen_range(-1.0f32..1.0) * voice.noise;
        }
        wave.push(sample * envelope);
    }
    wave
}

pub struct SoundCache {
    sounds: HashMap<SoundType, Vec<f32>>,
}

impl SoundCache {
    pub fn new() -> Self {
        let sounds = SoundType::ALL
            .iter()
            .map(|&sound_type| (sound_type, sound_type.create_sound()))
            .collect();
        Self { sounds }
    }

    pub fn get_sound(&self, sound_type: SoundType) -> &[f32] {
        self.sounds.get(&sound_type).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for SoundCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the accent or regular click for a beat and scales it by volume.
pub struct BeatSounds {
    cache: SoundCache,
    pub regular: SoundType,
    pub first_beat: SoundType,
    volume: u32,
}

impl BeatSounds {
    pub fn new(regular: SoundType, first_beat: SoundType, volume: u32) -> Self {
        Self {
            cache: SoundCache::new(),
            regular,
            first_beat,
            volume: volume.min(100),
        }
    }

    pub fn volume(&self) -> u32 {
        self.volume
    }

    pub fn adjust_volume(&mut self, change: i32) -> u32 {
        self.volume = (self.volume as i32 + change).clamp(0, 100) as u32;
        self.volume
    }

    pub fn sound_for(&self, event: &BeatEvent) -> SoundType {
        if event.is_first_beat {
            self.first_beat
        } else {
            self.regular
        }
    }

    pub fn samples_for(&self, event: &BeatEvent) -> Vec<f32> {
        let gain = self.volume as f32 / 100.0;
        self.cache
            .get_sound(self.sound_for(event))
            .iter()
            .map(|&sample| sample * gain)
            .collect()
    }
}

/// Something that makes a beat audible.
pub trait AudioSink {
    fn play_beat(&mut self, event: &BeatEvent);
}

/// Plays beats on the default output device.
pub struct RodioSink {
    _stream: OutputStream,
    sink: Sink,
    pub sounds: BeatSounds,
}

impl RodioSink {
    pub fn new(sounds: BeatSounds) -> Result<Self, AudioError> {
        let (stream, stream_handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&stream_handle)?;
        Ok(Self {
            _stream: stream,
            sink,
            sounds,
        })
    }
}

impl AudioSink for RodioSink {
    fn play_beat(&mut self, event: &BeatEvent) {
        let samples = self.sounds.samples_for(event);
        if samples.is_empty() {
            warn!("no samples for {:?}", self.sounds.sound_for(event));
            return;
        }
        self.sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples));
    }
}
