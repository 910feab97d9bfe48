//! Scoped capture of the process-wide standard output stream.
//!
//! The stdout file descriptor is a single shared mutable resource, so all
//! redirection goes through one exclusive slot: a second scoped call blocks
//! until the first completes. The original destination is restored on every
//! exit path, including a panic inside the wrapped action. No timeout is
//! provided; an action that never returns holds the slot indefinitely, and
//! callers needing bounded latency must wrap their own.

use crate::config::types::{CaptureLimits, Result, SessionError};
use nix::libc::STDOUT_FILENO;
use nix::unistd::{close, dup, dup2};
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;

/// Exclusive ownership of the process-wide redirection slot
static CAPTURE_SLOT: Mutex<()> = Mutex::new(());

/// Set when stdout restoration failed. Every later capture would start from
/// an inconsistent destination, so the slot refuses to operate once set.
static SLOT_POISONED: AtomicBool = AtomicBool::new(false);

/// Scoped, exclusive redirection of the process-wide output stream
pub struct OutputCapture;

impl OutputCapture {
    /// Redirect stdout into an in-memory buffer while `action` runs.
    ///
    /// Returns the captured bytes together with the action's value. Nothing
    /// the action writes to stdout leaks to the process's real output. A
    /// panic inside `action` still restores stdout, then resumes unwinding.
    pub fn scoped<T>(action: impl FnOnce() -> T) -> Result<(Vec<u8>, T)> {
        Self::scoped_with(&CaptureLimits::default(), action)
    }

    /// [`OutputCapture::scoped`] with explicit capture limits
    pub fn scoped_with<T>(
        limits: &CaptureLimits,
        action: impl FnOnce() -> T,
    ) -> Result<(Vec<u8>, T)> {
        // The action runs under catch_unwind, so a panic never unwinds while
        // the guard is held; recover from poison anyway rather than disable
        // capture for the rest of the process.
        let _slot = CAPTURE_SLOT.lock().unwrap_or_else(|e| e.into_inner());

        if SLOT_POISONED.load(Ordering::SeqCst) {
            return Err(SessionError::CapturePoisoned(
                "a previous capture failed to restore stdout".to_string(),
            ));
        }

        // Substitute sink. Failure here happens before any swap, so there is
        // nothing to restore.
        let (read_end, write_end) = nix::unistd::pipe()?;

        // Bytes buffered so far belong to the real stdout, not the capture.
        std::io::stdout().flush()?;

        let saved = dup(STDOUT_FILENO)?;
        if let Err(err) = dup2(write_end.as_raw_fd(), STDOUT_FILENO) {
            let _ = close(saved);
            return Err(err.into());
        }

        // Drain on a separate thread so a chatty action cannot deadlock
        // against a full pipe buffer.
        let max_bytes = limits.max_bytes;
        let drain = thread::spawn(move || drain_pipe(File::from(read_end), max_bytes));

        let outcome = catch_unwind(AssertUnwindSafe(action));

        // Push anything still buffered into the pipe before swapping back.
        let _ = std::io::stdout().flush();

        if let Err(err) = dup2(saved, STDOUT_FILENO) {
            // Process-wide output state is now inconsistent for every future
            // capture. Non-recoverable: poison the slot and surface loudly.
            SLOT_POISONED.store(true, Ordering::SeqCst);
            let _ = close(saved);
            log::error!(
                "FATAL: failed to restore stdout after capture: {}; \
                 refusing all further captures in this process",
                err
            );
            match outcome {
                Ok(_) => return Err(SessionError::CapturePoisoned(err.to_string())),
                Err(payload) => resume_unwind(payload),
            }
        }
        let _ = close(saved);

        // Closing our write end delivers EOF to the drain thread.
        drop(write_end);
        let buffer = drain.join().map_err(|_| {
            SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "capture drain thread panicked",
            ))
        })?;

        match outcome {
            Ok(value) => Ok((buffer, value)),
            Err(payload) => resume_unwind(payload),
        }
    }
}

/// Read everything written to the substitute sink until EOF, retaining at
/// most `max_bytes`. Reading continues past the limit so the writing side
/// never blocks on a full pipe.
fn drain_pipe(mut pipe: File, max_bytes: usize) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut truncated = false;

    loop {
        match pipe.read(&mut chunk) {
            Ok(0) => break, // EOF - writer closed
            Ok(n) => {
                if truncated {
                    continue;
                }
                if buffer.len() + n > max_bytes {
                    let remaining = max_bytes - buffer.len();
                    buffer.extend_from_slice(&chunk[..remaining]);
                    truncated = true;
                    log::warn!("capture truncated at {} bytes", max_bytes);
                } else {
                    buffer.extend_from_slice(&chunk[..n]);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }

    buffer
}
