use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::{
    cursor,
    event::{Event, KeyCode, KeyEventKind, poll, read},
    execute,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode},
};
use log::{info, warn};

use metronome::config::{default_log_path, open_log_file};
use metronome::utilities::display::{BeatFlash, View, render};
use metronome::utilities::sound::{AudioSink, BeatSounds, RodioSink};
use metronome::{
    BeatEvent, BeatScheduler, ConfigManager, IntervalTimer, PlaylistStore, Settings, Song,
    SqliteStore, SystemClock, Tempo, TimeSignature,
};

/// Terminal metronome with accented first beats and saved playlists.
#[derive(Parser, Debug)]
#[command(name = "metronome", version)]
struct Args {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Playlist database (overrides the settings file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append logs to this file (the terminal UI always logs to a file)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the metronome (the default)
    Run(RunArgs),
    /// Manage saved playlists
    #[command(subcommand)]
    Playlist(PlaylistCommand),
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Starting tempo in BPM (30-240)
    #[arg(short, long)]
    bpm: Option<u32>,

    /// Starting time signature: 3/4, 4/4, 5/4 or 6/8
    #[arg(short, long)]
    signature: Option<TimeSignature>,

    /// Load songs from this playlist
    #[arg(short, long)]
    playlist: Option<String>,

    /// Start on this song of the playlist
    #[arg(long, requires = "playlist")]
    song: Option<String>,

    /// Wait for SPACE instead of starting immediately
    #[arg(long)]
    paused: bool,
}

#[derive(Subcommand, Debug)]
enum PlaylistCommand {
    /// List playlists
    List,
    /// Create an empty playlist
    Create { name: String },
    /// Delete a playlist and its songs
    Delete { name: String },
    /// Show the songs of a playlist
    Show { name: String },
    /// Add a song to a playlist
    Add {
        playlist: String,
        song: String,
        bpm: u32,
        #[arg(default_value = "4/4")]
        signature: TimeSignature,
    },
    /// Remove a song from a playlist
    Remove { playlist: String, song: String },
}

struct App {
    scheduler: BeatScheduler<IntervalTimer<SystemClock>>,
    beats: mpsc::Receiver<BeatEvent>,
    flash: BeatFlash,
    audio: Option<RodioSink>,
    songs: Vec<Song>,
    song_index: Option<usize>,
}

impl App {
    fn new(settings: &Settings, songs: Vec<Song>, song_index: Option<usize>) -> Self {
        let timer = IntervalTimer::system();
        let mut scheduler = BeatScheduler::with_settings(timer, settings.bpm, settings.time_signature);

        let (beat_tx, beats) = mpsc::channel();
        scheduler.on_beat(move |event| {
            let _ = beat_tx.send(*event);
        });

        let sounds = BeatSounds::new(
            settings.regular_sound,
            settings.first_beat_sound,
            settings.volume,
        );
        let audio = match RodioSink::new(sounds) {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!("running without sound: {}", e);
                None
            }
        };

        let mut app = Self {
            scheduler,
            beats,
            flash: BeatFlash::new(Duration::from_millis(settings.flash_ms)),
            audio,
            songs,
            song_index: None,
        };
        if let Some(index) = song_index {
            app.select_song(index);
        }
        app
    }

    fn select_song(&mut self, index: usize) {
        let Some(song) = self.songs.get(index) else {
            return;
        };
        match self.scheduler.apply_song(song) {
            Ok(()) => {
                info!("loaded song {:?}", song.name);
                self.song_index = Some(index);
                self.flash.clear();
            }
            Err(e) => warn!("cannot load song {:?}: {}", song.name, e),
        }
    }

    fn step_song(&mut self, forward: bool) {
        if self.songs.is_empty() {
            return;
        }
        let len = self.songs.len();
        let next = match (self.song_index, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        self.select_song(next);
    }

    /// Delivers due beats to the speaker and the flash. Returns true if any fired.
    fn pump(&mut self, now: Instant) -> bool {
        self.scheduler.pump();
        let mut fired = false;
        while let Ok(event) = self.beats.try_recv() {
            if let Some(audio) = self.audio.as_mut() {
                audio.play_beat(&event);
            }
            self.flash.trigger(event, now);
            fired = true;
        }
        fired
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.scheduler.toggle();
            }
            KeyCode::Up => {
                self.scheduler.adjust_tempo(5);
            }
            KeyCode::Down => {
                self.scheduler.adjust_tempo(-5);
            }
            KeyCode::Right => {
                self.scheduler.adjust_tempo(1);
            }
            KeyCode::Left => {
                self.scheduler.adjust_tempo(-1);
            }
            KeyCode::Char('m') => {
                let next = self.scheduler.time_signature().next();
                self.scheduler.set_time_signature(next);
                self.flash.clear();
            }
            KeyCode::Char('n') => self.step_song(true),
            KeyCode::Char('p') => self.step_song(false),
            KeyCode::Char(c) => {
                if let Some(audio) = self.audio.as_mut() {
                    let sounds = &mut audio.sounds;
                    match c {
                        's' => sounds.regular = sounds.regular.next(),
                        'a' => sounds.regular = sounds.regular.prev(),
                        'x' => sounds.first_beat = sounds.first_beat.next(),
                        'z' => sounds.first_beat = sounds.first_beat.prev(),
                        'v' => {
                            sounds.adjust_volume(10);
                        }
                        'c' => {
                            sounds.adjust_volume(-10);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        true
    }

    fn draw<W: Write>(&self, writer: &mut W, settings: &Settings, now: Instant) -> io::Result<()> {
        let (regular_sound, first_beat_sound, volume) = match &self.audio {
            Some(audio) => (audio.sounds.regular, audio.sounds.first_beat, audio.sounds.volume()),
            None => (settings.regular_sound, settings.first_beat_sound, settings.volume),
        };
        let view = View {
            tempo: self.scheduler.tempo(),
            time_signature: self.scheduler.time_signature(),
            running: self.scheduler.is_running(),
            flash: &self.flash,
            regular_sound,
            first_beat_sound,
            volume,
            song: self
                .song_index
                .and_then(|i| self.songs.get(i))
                .map(|song| song.name.as_str()),
            audio: self.audio.is_some(),
        };
        render(writer, &view, now)
    }

    /// The settings to remember for next time.
    fn remembered(&self, settings: &Settings) -> Settings {
        let mut next = Settings {
            bpm: self.scheduler.tempo(),
            time_signature: self.scheduler.time_signature(),
            ..settings.clone()
        };
        if let Some(audio) = &self.audio {
            next.regular_sound = audio.sounds.regular;
            next.first_beat_sound = audio.sounds.first_beat;
            next.volume = audio.sounds.volume();
        }
        next
    }
}

fn run_loop(app: &mut App, settings: &Settings) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(io::stdout());
    let mut was_lit = false;
    let mut dirty = true;

    loop {
        let now = Instant::now();
        if app.pump(now) {
            dirty = true;
        }

        let lit = app.flash.is_lit(now);
        if dirty || lit != was_lit {
            app.draw(&mut writer, settings, now)?;
            was_lit = lit;
            dirty = false;
        }

        if poll(Duration::from_millis(0))? {
            if let Event::Key(key_event) = read()? {
                if key_event.kind == KeyEventKind::Press {
                    if !app.handle_key(key_event.code) {
                        break;
                    }
                    dirty = true;
                }
            }
        }

        thread::sleep(Duration::from_millis(1));
    }
    Ok(())
}

fn open_store(settings: &Settings) -> anyhow::Result<SqliteStore> {
    let path = settings.database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    SqliteStore::open(&path).with_context(|| format!("opening {}", path.display()))
}

fn run(mut manager: ConfigManager, mut settings: Settings, args: RunArgs) -> anyhow::Result<()> {
    if let Some(bpm) = args.bpm {
        settings.bpm = Tempo::new(bpm)?;
    }
    if let Some(signature) = args.signature {
        settings.time_signature = signature;
    }

    let (songs, song_index) = match &args.playlist {
        Some(playlist) => {
            let store = open_store(&settings)?;
            let songs = store.songs(playlist)?;
            let index = match &args.song {
                Some(name) => Some(
                    songs
                        .iter()
                        .position(|song| &song.name == name)
                        .with_context(|| format!("no song {:?} in playlist {:?}", name, playlist))?,
                ),
                None if songs.is_empty() => None,
                None => Some(0),
            };
            (songs, index)
        }
        None => (Vec::new(), None),
    };

    let mut app = App::new(&settings, songs, song_index);
    if settings.autostart && !args.paused {
        app.scheduler.start();
    }

    enable_raw_mode()?;
    execute!(io::stdout(), cursor::Hide, Clear(ClearType::All))?;
    let result = run_loop(&mut app, &settings);
    restore_terminal()?;
    result?;

    let mut remembered = app.remembered(&settings);
    remembered.database_path = manager.settings().database_path.clone();
    if let Err(e) = manager.update(remembered) {
        warn!("could not save settings: {}", e);
    }
    Ok(())
}

/// Leaves raw mode even when the screen cannot be reset.
fn restore_terminal() -> io::Result<()> {
    restore_with(
        || execute!(io::stdout(), cursor::Show, Clear(ClearType::All), cursor::MoveTo(0, 0)),
        disable_raw_mode,
    )
}

fn restore_with(
    reset_screen: impl FnOnce() -> io::Result<()>,
    leave_raw_mode: impl FnOnce() -> io::Result<()>,
) -> io::Result<()> {
    let reset = reset_screen();
    let left = leave_raw_mode();
    reset.and(left)
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_filter = if verbose { "debug" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if let Some(path) = log_file {
        let file = open_log_file(path).with_context(|| format!("opening log file {}", path.display()))?;
        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .write_style(env_logger::WriteStyle::Never);
    }
    builder.init();
    Ok(())
}

fn playlist(settings: &Settings, command: PlaylistCommand) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    match command {
        PlaylistCommand::List => {
            for name in store.list_playlists()? {
                println!("{}", name);
            }
        }
        PlaylistCommand::Create { name } => {
            store.create_playlist(&name)?;
            println!("Created playlist {:?}", name);
        }
        PlaylistCommand::Delete { name } => {
            store.delete_playlist(&name)?;
            println!("Deleted playlist {:?}", name);
        }
        PlaylistCommand::Show { name } => {
            let playlist = store.playlist(&name)?;
            println!("{}", playlist.name);
            for (i, song) in playlist.songs.iter().enumerate() {
                println!("  {:>2}. {:<30} {:>8} {}", i + 1, song.name, song.tempo.to_string(), song.time_signature);
            }
        }
        PlaylistCommand::Add {
            playlist,
            song,
            bpm,
            signature,
        } => {
            let song = Song::new(song, Tempo::new(bpm)?, signature);
            store.add_song(&playlist, &song)?;
            println!("Added {:?} ({}, {}) to {:?}", song.name, song.tempo, song.time_signature, playlist);
        }
        PlaylistCommand::Remove { playlist, song } => {
            store.remove_song(&playlist, &song)?;
            println!("Removed {:?} from {:?}", song, playlist);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Raw mode would swallow stderr, so the terminal UI logs to a file.
    let uses_terminal = !matches!(args.command, Some(Command::Playlist(_)));
    let log_file = args
        .log_file
        .clone()
        .or_else(|| uses_terminal.then(default_log_path));
    init_logging(args.verbose, log_file.as_deref())?;

    let mut manager = ConfigManager::new(args.config);
    let mut settings = manager
        .load()
        .with_context(|| format!("loading settings from {}", manager.path().display()))?;
    if let Some(database) = args.database {
        settings.database_path = Some(database);
    }

    match args.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(run_args) => run(manager, settings, run_args),
        Command::Playlist(command) => playlist(&settings, command),
    }
}
