//! Session thread tests

use std::time::{Duration, Instant};

use super::*;
use crate::config::Config;
use crate::test_utils::{FakeCore, FakeLoader, ManualTime};
use crate::transport::{Command, Event};

const WAIT: Duration = Duration::from_secs(5);

fn config_with_roms(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.core.rom_dir = dir.path().to_path_buf();
    config
}

fn rom_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("x"), vec![0x42; 32 * 1024]).unwrap();
    dir
}

/// Wait for the first event matching `pred`, calling `between` while waiting
fn wait_for(
    session: &SessionHandle,
    mut between: impl FnMut(),
    pred: impl Fn(&Event) -> bool,
) -> Option<Event> {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        between();
        if let Some(event) = session.event_timeout(Duration::from_millis(5))
            && pred(&event)
        {
            return Some(event);
        }
    }
    None
}

fn error_message(session: &SessionHandle) -> String {
    match wait_for(session, || {}, |e| matches!(e, Event::Error(_))) {
        Some(Event::Error(message)) => message,
        other => panic!("expected an error event, got {other:?}"),
    }
}

// ============================================================================
// Boot sequence
// ============================================================================

#[test]
fn test_init_core_sends_initialized() {
    let session = SessionThread::spawn(&Config::default(), FakeLoader::default()).unwrap();
    assert!(session.send(Command::InitCore));

    let event = session.event_timeout(WAIT);
    assert!(matches!(event, Some(Event::Initialized)));
}

#[test]
fn test_end_to_end_unthrottled_frame() {
    let roms = rom_dir();
    let session = SessionThread::spawn(&config_with_roms(&roms), FakeLoader::default()).unwrap();

    session.send(Command::InitCore);
    assert!(matches!(session.event_timeout(WAIT), Some(Event::Initialized)));

    session.send(Command::SetThrottle(false));
    session.send(Command::LoadPreinstalledRom("x".into()));
    session.send(Command::StartCore);

    let frame = wait_for(&session, || {}, |e| matches!(e, Event::PixelData(_)));
    match frame {
        Some(Event::PixelData(frame)) => assert_eq!(frame.pixels()[0], 1),
        other => panic!("expected a frame, got {other:?}"),
    }
}

#[test]
fn test_throttled_session_follows_time() {
    let time = ManualTime::new();
    let clock = time.clone();
    let session =
        SessionThread::spawn_with_time(&Config::default(), FakeLoader::default(), time).unwrap();

    session.send(Command::InitCore);
    session.send(Command::LoadRom(vec![1; 1024]));
    session.send(Command::StartCore);

    // One frame is ~16.7 ms of emulated time
    let frame = wait_for(
        &session,
        || clock.advance(Duration::from_millis(2)),
        |e| matches!(e, Event::PixelData(_)),
    );
    assert!(frame.is_some());
}

// ============================================================================
// Error reporting
// ============================================================================

#[test]
fn test_init_failure_reports_error() {
    let session = SessionThread::spawn(&Config::default(), FakeLoader::failing()).unwrap();
    session.send(Command::InitCore);

    let message = error_message(&session);
    assert!(message.contains("init_extern"), "{message}");
}

#[test]
fn test_load_before_init_reports_error() {
    let session = SessionThread::spawn(&Config::default(), FakeLoader::default()).unwrap();
    session.send(Command::LoadRom(vec![1, 2, 3]));

    let message = error_message(&session);
    assert!(message.contains("not initialized"), "{message}");
}

#[test]
fn test_invalid_preinstalled_name_reports_error() {
    let roms = rom_dir();
    let session = SessionThread::spawn(&config_with_roms(&roms), FakeLoader::default()).unwrap();
    session.send(Command::InitCore);
    session.send(Command::LoadPreinstalledRom("../x".into()));

    let message = error_message(&session);
    assert!(message.contains("../x"), "{message}");
}

#[test]
fn test_missing_preinstalled_rom_reports_error() {
    let roms = rom_dir();
    let session = SessionThread::spawn(&config_with_roms(&roms), FakeLoader::default()).unwrap();
    session.send(Command::InitCore);
    session.send(Command::LoadPreinstalledRom("absent.gb".into()));

    let message = error_message(&session);
    assert!(message.contains("Failed to fetch rom"), "{message}");
}

#[test]
fn test_runtime_fault_reports_error_once() {
    let time = ManualTime::new();
    let clock = time.clone();
    let template = FakeCore::new().failing_step_at(0);
    let session =
        SessionThread::spawn_with_time(&Config::default(), FakeLoader::new(template), time)
            .unwrap();

    session.send(Command::InitCore);
    session.send(Command::LoadRom(vec![1; 1024]));
    session.send(Command::StartCore);

    let fault = wait_for(
        &session,
        || clock.advance(Duration::from_millis(1)),
        |e| matches!(e, Event::Error(_)),
    );
    match fault {
        Some(Event::Error(message)) => assert!(message.contains("Emulation stopped"), "{message}"),
        other => panic!("expected a fault, got {other:?}"),
    }

    // Stopped: no retry, no further events
    clock.advance(Duration::from_millis(50));
    assert!(session.event_timeout(Duration::from_millis(50)).is_none());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_drop_joins_running_session() {
    let roms = rom_dir();
    let session = SessionThread::spawn(&config_with_roms(&roms), FakeLoader::default()).unwrap();
    session.send(Command::InitCore);
    session.send(Command::SetThrottle(false));
    session.send(Command::LoadPreinstalledRom("x".into()));
    session.send(Command::StartCore);
    assert!(session.is_alive());

    drop(session);
}
