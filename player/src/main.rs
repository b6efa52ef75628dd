//! Lunaboy - Standalone Player
//!
//! Runs the emulation core headless: audio goes to the default output
//! device, frames are counted and the last one can be saved as a PNG.
//!
//! # Usage
//!
//! ```bash
//! lunaboy-player lib.wasm game.gb
//! lunaboy-player lib.wasm --preinstalled tetris.gb --seconds 30
//! lunaboy-player lib.wasm game.gb --unthrottled --mute --screenshot last.png
//! lunaboy-player lib.wasm game.gb --hold KeyI --seconds 2
//! lunaboy-player lib.wasm --list-roms
//! ```

mod audio_output;
mod screenshot;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};

use lunaboy_core::config::{self, Config};
use lunaboy_core::{
    AudioFeed, Command, Event, FrameSnapshot, RomLibrary, SessionHandle, SessionThread,
    WasmCoreLoader, audio_channel,
};

use audio_output::AudioOutput;

#[derive(Parser)]
#[command(name = "lunaboy-player")]
#[command(author, version, about = "Lunaboy - headless player for the emulation core")]
struct Args {
    /// Core module to load (lib.wasm)
    core: PathBuf,

    /// ROM file to play
    #[arg(required_unless_present_any = ["preinstalled", "list_roms"])]
    rom: Option<PathBuf>,

    /// Play a ROM from the preinstalled ROM directory instead of a file
    #[arg(long, value_name = "NAME", conflicts_with = "rom")]
    preinstalled: Option<String>,

    /// List the preinstalled ROMs and exit
    #[arg(long)]
    list_roms: bool,

    /// Run one frame per tick as fast as possible
    #[arg(long)]
    unthrottled: bool,

    /// Stop after this many seconds (runs until an error otherwise)
    #[arg(long)]
    seconds: Option<f64>,

    /// Do not open an audio device
    #[arg(long)]
    mute: bool,

    /// Hold a key for the whole run (e.g. KeyI for Start); repeatable
    #[arg(long = "hold", value_name = "CODE")]
    hold: Vec<String>,

    /// Save the last frame as a PNG on exit
    #[arg(long, value_name = "FILE")]
    screenshot: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// How the ROM reaches the core
enum RomSource {
    Bytes(Vec<u8>),
    Preinstalled(String),
}

impl RomSource {
    fn into_command(self) -> Command {
        match self {
            RomSource::Bytes(bytes) => Command::LoadRom(bytes),
            RomSource::Preinstalled(name) => Command::LoadPreinstalledRom(name),
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_from(path)?,
        None => config::load()?,
    };
    config.core.wasm_path = args.core.clone();
    config.driver.throttle &= !args.unthrottled;
    config.audio.muted |= args.mute;

    if args.list_roms {
        list_roms(&RomLibrary::new(config.core.rom_dir.clone()));
        return Ok(());
    }

    let rom = match (&args.rom, &args.preinstalled) {
        (_, Some(name)) => RomSource::Preinstalled(name.clone()),
        (Some(path), None) => RomSource::Bytes(
            std::fs::read(path).with_context(|| format!("Failed to read ROM {}", path.display()))?,
        ),
        (None, None) => bail!("No ROM given"),
    };

    let (mut feed, sink) = audio_channel(&config.audio);
    let _output = if config.audio.muted {
        None
    } else {
        match AudioOutput::new(sink) {
            Ok(output) => {
                info!(
                    "Audio output: {} Hz, {} channels",
                    output.sample_rate(),
                    output.channels()
                );
                Some(output)
            }
            Err(e) => {
                warn!("Audio disabled: {:#}", e);
                feed.set_muted(true);
                None
            }
        }
    };

    let loader = WasmCoreLoader::new(config.core.clone());
    let session = SessionThread::spawn(&config, loader).context("Failed to spawn session thread")?;

    let last_frame = run(&session, &args, &config, rom, &mut feed)?;

    session.send(Command::StopCore);
    drop(session);

    if let Some(path) = &args.screenshot {
        match &last_frame {
            Some(frame) => screenshot::save_png(path, frame)?,
            None => warn!("No frame was produced; skipping screenshot"),
        }
    }
    if feed.dropped_samples() > 0 {
        debug!("{} audio samples dropped on the way to the device", feed.dropped_samples());
    }
    Ok(())
}

fn list_roms(library: &RomLibrary) {
    let names = library.list();
    if names.is_empty() {
        println!("No preinstalled ROMs in {}", library.root().display());
        return;
    }
    println!("Preinstalled ROMs in {}:", library.root().display());
    for name in names {
        println!("  {name}");
    }
}

/// Boot the core and pump events until the deadline or an error.
///
/// Mirrors the page boot order: initCore, then on `Initialized` set the
/// pacing mode, load the ROM and start.
fn run(
    session: &SessionHandle,
    args: &Args,
    config: &Config,
    rom: RomSource,
    feed: &mut AudioFeed,
) -> Result<Option<FrameSnapshot>> {
    let deadline = args
        .seconds
        .map(|secs| Instant::now() + Duration::from_secs_f64(secs.max(0.0)));
    let mut rom = Some(rom);
    let mut last_frame = None;
    let mut frames_this_second = 0u32;
    let mut second_start = Instant::now();

    session.send(Command::InitCore);

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        match session.event_timeout(Duration::from_millis(100)) {
            Some(Event::Initialized) => {
                let Some(rom) = rom.take() else {
                    continue;
                };
                info!("Core initialized, starting");
                session.send(Command::SetThrottle(config.driver.throttle));
                session.send(rom.into_command());
                for code in &args.hold {
                    session.send(Command::KeyEvent {
                        code: code.clone(),
                        pressed: true,
                    });
                }
                session.send(Command::StartCore);
            }
            Some(Event::PixelData(frame)) => {
                frames_this_second += 1;
                last_frame = Some(frame);
            }
            Some(Event::AudioData(batch)) => {
                feed.enqueue(batch);
            }
            Some(Event::Error(message)) => bail!("{message}"),
            None => {
                if !session.is_alive() {
                    bail!("Session thread exited unexpectedly");
                }
            }
        }

        let elapsed = second_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            info!(
                "{:.1} fps, {} audio samples queued",
                f64::from(frames_this_second) / elapsed.as_secs_f64(),
                feed.queued_samples()
            );
            frames_this_second = 0;
            second_start = Instant::now();
        }
    }

    Ok(last_frame)
}
