//! The silent-abort signal.
//!
//! A handler that wants to stop processing without producing an error
//! response calls [`abort`]. The panic guard and the timeout supervisor
//! recognise the payload and swallow it without logging.

use std::any::Any;

/// Panic payload marking a deliberate, silent abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortHandler;

/// Aborts the current handler.
///
/// Unwinds with an [`AbortHandler`] payload. The panic hook is not invoked,
/// so nothing is printed to stderr.
pub fn abort() -> ! {
    std::panic::resume_unwind(Box::new(AbortHandler))
}

/// Returns `true` if a caught panic payload is the silent-abort signal.
#[must_use]
pub fn is_abort(payload: &(dyn Any + Send)) -> bool {
    payload.is::<AbortHandler>()
}
