//! Emulation driver
//!
//! Owns the core, the input latch and the driver-side audio staging ring.
//! Each tick runs clock → core step → audio drain → frame publish, then
//! reschedules itself through [`TickScheduler`]. Ticks are cooperative: the
//! driver is `&mut` for the whole tick, so a tick can never nest or overlap.

use tracing::{debug, error, info, trace};

use crate::audio::AudioRingBuffer;
use crate::clock::{EmulationClock, MonotonicTime, PacingMode, TimeSource};
use crate::config::Config;
use crate::emulation::EmulationCore;
use crate::error::{CoreFault, RomLoadError, RuntimeFault};
use crate::input::InputLatch;
use crate::layout::{FRAMEBUFFER_SIZE, required_memory};
use crate::transport::{AudioBatch, Event, EventSink, FrameSnapshot};

mod scheduler;


pub use scheduler::{TickScheduler, TickTicket};

/// Result of presenting a ticket to [`Driver::run_tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale ticket or stopped driver: nothing ran
    Skipped,
    /// Running without a ROM: rescheduled without touching the core
    Idle,
    /// The core was stepped
    Ran(TickReport),
}

/// Diagnostics for one tick that stepped the core
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Zero-based tick index
    pub tick: u64,
    pub cycles: u64,
    pub substeps: u32,
    pub frames: u32,
    /// Stereo frames published in this tick's audio batch
    pub audio_frames: usize,
    /// Owed time dropped by the catch-up cap
    pub discarded_nanos: u64,
    pub frame_published: bool,
}

/// Paces one emulation core for one session
pub struct Driver<C, T = MonotonicTime> {
    core: Option<C>,
    clock: EmulationClock,
    time: T,
    input: InputLatch,
    staging: AudioRingBuffer,
    scheduler: TickScheduler,
    mode: PacingMode,
    max_rom_bytes: usize,
    loaded: bool,
    running: bool,
    ticks: u64,
}

impl<C: EmulationCore> Driver<C> {
    pub fn new(config: &Config) -> Self {
        Self::with_time(config, MonotonicTime)
    }
}

impl<C: EmulationCore, T: TimeSource> Driver<C, T> {
    pub fn with_time(config: &Config, time: T) -> Self {
        let clock = EmulationClock::new(config.clock, time.now());
        Self {
            core: None,
            clock,
            time,
            input: InputLatch::new(),
            staging: AudioRingBuffer::new(config.audio.ring_capacity_frames),
            scheduler: TickScheduler::new(),
            mode: PacingMode::from_throttle(config.driver.throttle),
            max_rom_bytes: config.core.max_rom_bytes,
            loaded: false,
            running: false,
            ticks: 0,
        }
    }

    /// Install a freshly initialized core. Any loaded ROM and held keys are
    /// forgotten.
    pub fn attach_core(&mut self, core: C) {
        self.stop();
        self.core = Some(core);
        self.loaded = false;
        self.staging.clear();
        self.input.release_all();
        debug!("Core attached ({} bytes of memory)", self.core_memory_size());
    }

    pub fn core(&self) -> Option<&C> {
        self.core.as_ref()
    }

    pub fn core_mut(&mut self) -> Option<&mut C> {
        self.core.as_mut()
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    pub fn clock(&self) -> &EmulationClock {
        &self.clock
    }

    /// Ticks completed since the driver was created
    pub fn ticks_completed(&self) -> u64 {
        self.ticks
    }

    /// The ticket the session should present next, if a tick is due
    pub fn pending_tick(&self) -> Option<TickTicket> {
        self.scheduler.pending()
    }

    /// Stage `rom` in core memory and boot it.
    ///
    /// On failure the driver is stopped and left unloaded.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), RomLoadError> {
        self.loaded = false;
        let result = self.try_load_rom(rom);
        match &result {
            Ok(()) => {
                self.loaded = true;
                self.staging.clear();
                self.clock.reset(self.time.now());
                info!("ROM loaded ({} bytes)", rom.len());
            }
            Err(e) => {
                self.unload();
                error!("ROM load failed: {}", e);
            }
        }
        result
    }

    /// Stop and forget the loaded ROM
    pub fn unload(&mut self) {
        self.stop();
        self.loaded = false;
    }

    fn try_load_rom(&mut self, rom: &[u8]) -> Result<(), RomLoadError> {
        let core = self.core.as_mut().ok_or(RomLoadError::CoreNotInitialized)?;
        if rom.is_empty() {
            return Err(RomLoadError::Empty);
        }
        if rom.len() > self.max_rom_bytes {
            return Err(RomLoadError::Oversized {
                len: rom.len(),
                max: self.max_rom_bytes,
            });
        }

        let required = required_memory(rom.len());
        let current = core.memory_size();
        if current < required {
            core.grow_memory(required - current)?;
        }
        core.write_memory(0, rom)?;
        core.init(rom.len())?;
        Ok(())
    }

    /// Apply a key event to the input latch. Unknown codes are ignored.
    pub fn set_input(&mut self, code: &str, pressed: bool) -> bool {
        let known = self.input.apply(code, pressed);
        if !known {
            trace!("Ignoring unmapped key code {:?}", code);
        }
        known
    }

    /// Switch pacing mode. Always rebases the clock, so the switch never
    /// produces a burst.
    pub fn set_throttle(&mut self, enabled: bool) {
        self.mode = PacingMode::from_throttle(enabled);
        self.clock.reset(self.time.now());
        debug!("Pacing mode set to {:?}", self.mode);
    }

    /// Start ticking. Returns the first ticket, or `None` if already running.
    pub fn start(&mut self) -> Option<TickTicket> {
        if self.running {
            return None;
        }
        self.running = true;
        self.clock.reset(self.time.now());
        debug!("Driver started");
        self.scheduler.schedule()
    }

    /// Stop ticking and cancel the pending tick
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.scheduler.cancel();
        debug!("Driver stopped after {} ticks", self.ticks);
    }

    /// Run one tick if `ticket` is still current.
    ///
    /// A fault stops the driver; the tick is not retried.
    pub fn run_tick<S: EventSink>(
        &mut self,
        ticket: TickTicket,
        events: &mut S,
    ) -> Result<TickOutcome, RuntimeFault> {
        if !self.running || !self.scheduler.accept(ticket) {
            trace!("Skipping stale tick {:?}", ticket);
            return Ok(TickOutcome::Skipped);
        }

        let outcome = if self.loaded {
            match self.step_core(events) {
                Ok(report) => TickOutcome::Ran(report),
                Err(fault) => {
                    // Audio from sub-steps before the fault belongs to an aborted tick
                    self.staging.clear();
                    self.stop();
                    let fault = RuntimeFault {
                        tick: self.ticks,
                        fault,
                    };
                    error!("{}", fault);
                    return Err(fault);
                }
            }
        } else {
            TickOutcome::Idle
        };

        self.ticks += 1;
        self.scheduler.schedule();
        Ok(outcome)
    }

    fn step_core<S: EventSink>(&mut self, events: &mut S) -> Result<TickReport, CoreFault> {
        let mut report = TickReport {
            tick: self.ticks,
            ..TickReport::default()
        };
        let Some(core) = self.core.as_mut() else {
            return Ok(report);
        };
        let staging = &mut self.staging;

        core.set_input(self.input.snapshot())?;

        match self.mode {
            PacingMode::Throttled => {
                let now = self.time.now();
                let advance = self.clock.advance(now, |cycles| -> Result<u32, CoreFault> {
                    let frames = core.step(cycles)?;
                    drain_audio(core, staging)?;
                    Ok(frames)
                })?;
                report.cycles = advance.cycles;
                report.substeps = advance.substeps;
                report.frames = advance.frames;
                report.discarded_nanos = advance.discarded_nanos;
            }
            PacingMode::Unthrottled => {
                core.run_frame()?;
                drain_audio(core, staging)?;
                report.frames = 1;
            }
        }

        if !staging.is_empty() {
            let samples = staging.drain_interleaved();
            report.audio_frames = samples.len() / 2;
            events.publish(Event::AudioData(AudioBatch::from(samples)));
        }

        if report.frames > 0 {
            let pixels = core.read_pixels()?;
            let snapshot = FrameSnapshot::copy_from(pixels).ok_or(CoreFault::OutOfBounds {
                offset: 0,
                len: FRAMEBUFFER_SIZE,
                size: pixels.len(),
            })?;
            events.publish(Event::PixelData(snapshot));
            report.frame_published = true;
        }

        trace!(
            "Tick {}: {} cycles in {} substeps, {} frames, {} audio frames",
            report.tick, report.cycles, report.substeps, report.frames, report.audio_frames
        );
        Ok(report)
    }

    fn core_memory_size(&self) -> usize {
        self.core.as_ref().map_or(0, |core| core.memory_size())
    }
}

/// Move whatever the core produced since the last drain into `staging`
fn drain_audio<C: EmulationCore>(core: &mut C, staging: &mut AudioRingBuffer) -> Result<(), CoreFault> {
    let samples = core.pop_audio()?;
    if samples > 0 {
        staging.push(core.read_audio(samples)?.frames());
    }
    Ok(())
}
