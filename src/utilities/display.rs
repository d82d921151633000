use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::{
    cursor, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use crate::scheduler::BeatEvent;
use crate::tempo::Tempo;
use crate::time_signature::TimeSignature;
use crate::utilities::sound_type::SoundType;

pub const DEFAULT_FLASH: Duration = Duration::from_millis(100);

const TITLE_ROW: u16 = 1;
const FLASH_ROW: u16 = 3;
const MEASURE_ROW: u16 = 5;
const BPM_ROW: u16 = 7;
const SIGNATURE_ROW: u16 = 8;
const STATUS_ROW: u16 = 9;
const SOUND_ROW: u16 = 11;
const VOLUME_ROW: u16 = 12;
const SONG_ROW: u16 = 14;
const CONTROLS_ROW: u16 = 16;

const IDLE_LABEL: &str = "Metronome";
const BEAT_LABEL: &str = "Beat!";

/// Keeps the beat indicator lit for a fixed time after each beat, however
/// fast or slow the tempo.
#[derive(Debug, Clone)]
pub struct BeatFlash {
    hold: Duration,
    lit_at: Option<Instant>,
    last: Option<BeatEvent>,
}

impl BeatFlash {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            lit_at: None,
            last: None,
        }
    }

    pub fn trigger(&mut self, event: BeatEvent, now: Instant) {
        self.lit_at = Some(now);
        self.last = Some(event);
    }

    pub fn is_lit(&self, now: Instant) -> bool {
        self.lit_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.hold)
    }

    pub fn label(&self, now: Instant) -> &'static str {
        if self.is_lit(now) { BEAT_LABEL } else { IDLE_LABEL }
    }

    pub fn last(&self) -> Option<BeatEvent> {
        self.last
    }

    /// Forgets the last beat, e.g. when the measure restarts.
    pub fn clear(&mut self) {
        self.lit_at = None;
        self.last = None;
    }
}

impl Default for BeatFlash {
    fn default() -> Self {
        Self::new(DEFAULT_FLASH)
    }
}

/// Everything the screen shows, captured once per frame.
pub struct View<'a> {
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
    pub running: bool,
    pub flash: &'a BeatFlash,
    pub regular_sound: SoundType,
    pub first_beat_sound: SoundType,
    pub volume: u32,
    pub song: Option<&'a str>,
    pub audio: bool,
}

fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * width as f64).round()) as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

pub fn render<W: Write>(writer: &mut W, view: &View<'_>, now: Instant) -> io::Result<()> {
    queue!(
        writer,
        Clear(ClearType::All),
        cursor::MoveTo(2, TITLE_ROW),
        SetAttribute(Attribute::Bold),
        SetForegroundColor(Color::Magenta),
        Print("METRONOME"),
        ResetColor,
        SetAttribute(Attribute::Reset),
    )?;

    let lit = view.flash.is_lit(now);
    let accent = view.flash.last().is_some_and(|beat| beat.is_first_beat);
    let flash_bg = match (lit, accent) {
        (true, true) => Color::Red,
        (true, false) => Color::Blue,
        (false, _) => Color::White,
    };
    queue!(
        writer,
        cursor::MoveTo(2, FLASH_ROW),
        SetBackgroundColor(flash_bg),
        SetForegroundColor(Color::Black),
        Print(format!("  {:^11}  ", view.flash.label(now))),
        ResetColor,
    )?;

    queue!(writer, cursor::MoveTo(2, MEASURE_ROW))?;
    let current = view.flash.last().map(|beat| beat.phase);
    for beat in 1..=view.time_signature.beats_per_measure() {
        let color = match current {
            Some(phase) if phase == beat && beat == 1 => Color::Red,
            Some(phase) if phase == beat => Color::Green,
            _ => Color::DarkGrey,
        };
        queue!(
            writer,
            SetForegroundColor(color),
            Print(format!("[{}] ", beat)),
        )?;
    }
    queue!(writer, ResetColor)?;

    let bpm = view.tempo.bpm();
    let span = (Tempo::MAX_BPM - Tempo::MIN_BPM) as f64;
    let meter = progress_bar((bpm - Tempo::MIN_BPM) as f64 / span, 20);
    queue!(
        writer,
        cursor::MoveTo(2, BPM_ROW),
        SetForegroundColor(Color::Yellow),
        Print(format!("{:>8}  ", view.tempo.to_string())),
        SetForegroundColor(Color::DarkGrey),
        Print(meter),
        ResetColor,
        cursor::MoveTo(2, SIGNATURE_ROW),
        Print(format!("Time signature: {}", view.time_signature)),
        cursor::MoveTo(2, STATUS_ROW),
        Print("Status: "),
        SetForegroundColor(if view.running { Color::Green } else { Color::Red }),
        Print(if view.running { "RUNNING" } else { "STOPPED" }),
        ResetColor,
    )?;

    let volume = if view.audio {
        format!("Volume: {}% {}", view.volume, progress_bar(view.volume as f64 / 100.0, 10))
    } else {
        "Volume: no audio device".to_string()
    };
    queue!(
        writer,
        cursor::MoveTo(2, SOUND_ROW),
        Print(format!(
            "Sound: {}  Accent: {}",
            view.regular_sound.name(),
            view.first_beat_sound.name()
        )),
        cursor::MoveTo(2, VOLUME_ROW),
        Print(volume),
    )?;

    if let Some(song) = view.song {
        queue!(
            writer,
            cursor::MoveTo(2, SONG_ROW),
            SetForegroundColor(Color::Cyan),
            Print(format!("Song: {}", song)),
            ResetColor,
        )?;
    }

    let controls = [
        "SPACE  start/stop      Up/Down  BPM +/-5     Left/Right  BPM +/-1",
        "M      next meter      S/A      sound +/-    X/Z         accent +/-",
        "V/C    volume +/-      N/P      next/prev song            Q  quit",
    ];
    for (i, line) in controls.iter().enumerate() {
        queue!(
            writer,
            cursor::MoveTo(2, CONTROLS_ROW + i as u16),
            SetForegroundColor(Color::DarkGrey),
            Print(line),
            ResetColor,
        )?;
    }

    writer.flush()
}
