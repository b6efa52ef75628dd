//! Driver session thread
//!
//! ```text
//! UI thread                          Session thread ("emu-driver")
//!     │                                    │
//! [SessionHandle::send]──(Command)──►[dispatch between ticks]
//!     │                              [Driver::run_tick]
//! [SessionHandle::events]◄──(Event)──[publish PixelData / AudioData / Error]
//! ```
//!
//! The session owns the only [`Driver`](crate::driver::Driver) and the only
//! core. Commands are handled strictly between ticks; the UI side never
//! touches driver state directly.

mod handle;
mod thread;

pub use handle::SessionHandle;
pub use thread::SessionThread;

#[cfg(test)]
mod tests;
