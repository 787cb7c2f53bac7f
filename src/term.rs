// ABOUTME: Scoped raw-mode guard for interactive attach sessions.
// ABOUTME: Restores the terminal on every exit path, including panics.

use std::io;

/// Puts the calling terminal into raw mode for the lifetime of the guard.
///
/// Raw mode is required while container stdio is being streamed so keystrokes
/// reach the remote shell unmangled. Dropping the guard restores cooked mode;
/// holding terminal state in a guard (instead of a flag plus a restore call)
/// means error and cancellation paths cannot leak a broken terminal.
#[derive(Debug)]
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn enter() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self { active: true })
    }

    /// Current terminal size as (columns, rows), if a tty is attached.
    pub fn size() -> Option<(u16, u16)> {
        crossterm::terminal::size().ok()
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = crossterm::terminal::disable_raw_mode() {
                tracing::warn!("failed to restore terminal mode: {e}");
            }
        }
    }
}
