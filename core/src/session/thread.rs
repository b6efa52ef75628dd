//! Session thread implementation
//!
//! Runs the driver's cooperative tick loop, handling commands between ticks.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::{MonotonicTime, PacingMode, TimeSource};
use crate::config::Config;
use crate::driver::{Driver, TickOutcome};
use crate::emulation::CoreLoader;
use crate::error::HostError;
use crate::rom::RomLibrary;
use crate::transport::{Command, Event, EventSink};

use super::handle::SessionHandle;

/// Session thread state
pub struct SessionThread<L: CoreLoader, T: TimeSource> {
    commands: Receiver<Command>,
    events: Sender<Event>,
    driver: Driver<L::Core, T>,
    loader: L,
    roms: RomLibrary,
    idle_wait: Duration,
}

impl<L> SessionThread<L, MonotonicTime>
where
    L: CoreLoader + Send + 'static,
{
    /// Spawn a session paced by the monotonic clock
    pub fn spawn(config: &Config, loader: L) -> std::io::Result<SessionHandle> {
        Self::spawn_with_time(config, loader, MonotonicTime)
    }
}

impl<L, T> SessionThread<L, T>
where
    L: CoreLoader + Send + 'static,
    T: TimeSource + Send + 'static,
{
    /// Spawn the session thread
    ///
    /// The driver and core are created on the session thread, so the core
    /// itself never crosses threads.
    pub fn spawn_with_time(
        config: &Config,
        loader: L,
        time: T,
    ) -> std::io::Result<SessionHandle> {
        let (command_tx, commands) = mpsc::channel::<Command>();
        let (events, event_rx) = mpsc::channel::<Event>();
        let config = config.clone();

        let handle = thread::Builder::new()
            .name("emu-driver".into())
            .spawn(move || {
                let mut session = Self {
                    commands,
                    events,
                    driver: Driver::with_time(&config, time),
                    loader,
                    roms: RomLibrary::new(config.core.rom_dir.clone()),
                    idle_wait: config.driver.idle_wait(),
                };
                session.run();
            })?;

        Ok(SessionHandle {
            tx: Some(command_tx),
            events: event_rx,
            handle: Some(handle),
        })
    }

    /// Main loop
    ///
    /// Blocks for commands while nothing is scheduled, waits briefly between
    /// throttled (or idle) ticks, and only polls between unthrottled ones.
    fn run(&mut self) {
        debug!("Session thread started");

        loop {
            let unthrottled =
                self.driver.mode() == PacingMode::Unthrottled && self.driver.is_loaded();
            let next = match self.driver.pending_tick() {
                None => self.commands.recv().map(Some).map_err(|_| ()),
                Some(_) if unthrottled => match self.commands.try_recv() {
                    Ok(command) => Ok(Some(command)),
                    Err(TryRecvError::Empty) => Ok(None),
                    Err(TryRecvError::Disconnected) => Err(()),
                },
                Some(_) => match self.commands.recv_timeout(self.idle_wait) {
                    Ok(command) => Ok(Some(command)),
                    Err(RecvTimeoutError::Timeout) => Ok(None),
                    Err(RecvTimeoutError::Disconnected) => Err(()),
                },
            };

            match next {
                Ok(Some(command)) => {
                    self.handle_command(command);
                    // Drain the backlog so a burst of commands lands before the next tick
                    while let Ok(command) = self.commands.try_recv() {
                        self.handle_command(command);
                    }
                }
                Ok(None) => {}
                Err(()) => {
                    debug!("Session thread exiting (channel disconnected)");
                    break;
                }
            }

            self.tick();
        }

        self.driver.stop();
        debug!(
            "Session thread finished after {} ticks",
            self.driver.ticks_completed()
        );
    }

    fn tick(&mut self) {
        let Some(ticket) = self.driver.pending_tick() else {
            return;
        };
        match self.driver.run_tick(ticket, &mut self.events) {
            Ok(TickOutcome::Ran(report)) if report.discarded_nanos > 0 => {
                debug!(
                    "Tick {} dropped {:.1}ms of owed emulation",
                    report.tick,
                    report.discarded_nanos as f64 / 1e6
                );
            }
            Ok(_) => {}
            Err(fault) => self.report(fault.into()),
        }
    }

    /// Handle one command, funnelling any failure into an error event
    fn handle_command(&mut self, command: Command) {
        if let Err(e) = self.dispatch(command) {
            warn!("{}", e);
            self.report(e);
        }
    }

    fn report(&mut self, error: HostError) {
        self.events.publish(Event::Error(error.to_string()));
    }

    fn dispatch(&mut self, command: Command) -> Result<(), HostError> {
        match command {
            Command::InitCore => {
                let core = self.loader.load()?;
                self.driver.attach_core(core);
                info!("Core initialized");
                self.events.publish(Event::Initialized);
            }
            Command::StartCore => {
                self.driver.start();
            }
            Command::StopCore => self.driver.stop(),
            Command::LoadRom(bytes) => self.driver.load_rom(&bytes)?,
            Command::LoadPreinstalledRom(name) => {
                let bytes = match self.roms.fetch(&name) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        self.driver.unload();
                        return Err(e.into());
                    }
                };
                self.driver.load_rom(&bytes)?;
            }
            Command::SetThrottle(enabled) => self.driver.set_throttle(enabled),
            Command::KeyEvent { code, pressed } => {
                self.driver.set_input(&code, pressed);
            }
        }
        Ok(())
    }
}
