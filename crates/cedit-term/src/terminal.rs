// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode and guaranteed restoration.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr, cfget*speed), atexit, and raw fd writes. These are the standard
// POSIX interfaces for terminal control; there is no safe alternative. Each
// unsafe block is minimal.
#![allow(unsafe_code)]
//
// This module owns the terminal's raw state. `RawMode::enter` snapshots the
// line discipline, switches it to raw byte-at-a-time input with a one
// decisecond read timeout, and hands back a guard that restores the snapshot
// when dropped.
//
// Dropping is not enough on its own. The fatal-error path leaves through
// `std::process::exit`, which runs no destructors, and a panic may unwind
// past the guard's owner. So the snapshot is also parked in a process-wide
// backup, and two hooks restore from it:
//
//   - an `atexit` handler, which `exit()` runs on every path out of the
//     process, including `die()`;
//   - a panic hook, which shows the cursor and restores before the default
//     handler prints the panic message.
//
// Restores are idempotent: the first successful one clears the backup.

use std::io;
use std::os::unix::io::RawFd;
use std::sync::{Mutex, Once};

use tracing::{debug, info, warn};

use crate::error::TermError;

// ─── TerminalSettings ───────────────────────────────────────────────────────

/// Snapshot of a terminal's line-discipline configuration.
///
/// Opaque: the only things anyone does with it are apply it back
/// and compare it against another snapshot.
#[derive(Clone, Copy)]
pub struct TerminalSettings {
    termios: libc::termios,
}

impl TerminalSettings {
    /// Read the current attributes of `fd` (`tcgetattr`).
    ///
    /// # Errors
    ///
    /// Returns [`TermError::GetAttributes`] if `fd` is not a terminal or the
    /// query fails.
    pub fn capture(fd: RawFd) -> Result<Self, TermError> {
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &raw mut termios) } != 0 {
            return Err(TermError::GetAttributes(io::Error::last_os_error()));
        }
        Ok(Self { termios })
    }

    /// Apply these attributes to `fd` (`tcsetattr` with `TCSAFLUSH`).
    ///
    /// Pending unread input is discarded, matching what a full-screen program
    /// expects when it switches modes.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::SetAttributes`] if the call fails.
    pub fn apply(&self, fd: RawFd) -> Result<(), TermError> {
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const self.termios) } != 0 {
            return Err(TermError::SetAttributes(io::Error::last_os_error()));
        }
        Ok(())
    }

    /// The raw-mode variant of these settings.
    ///
    /// Input: no break signal, no CR→NL, no parity check, no 8th-bit strip,
    /// no XON/XOFF. Output: no post-processing. Local: no echo, no canonical
    /// line editing, no INTR/QUIT/SUSP signals, no extended input processing.
    /// 8-bit characters. `VMIN=0`, `VTIME=1`: a read returns as soon as a
    /// byte is available, or empty-handed after one decisecond.
    #[must_use]
    pub fn to_raw(&self) -> Self {
        let mut raw = self.termios;
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN);
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = 1;
        Self { termios: raw }
    }

    /// Whether canonical input and echo are both off.
    #[must_use]
    pub const fn is_raw(&self) -> bool {
        self.termios.c_lflag & (libc::ICANON | libc::ECHO) == 0
    }

    fn speeds(&self) -> (libc::speed_t, libc::speed_t) {
        unsafe {
            (
                libc::cfgetispeed(&raw const self.termios),
                libc::cfgetospeed(&raw const self.termios),
            )
        }
    }
}

impl PartialEq for TerminalSettings {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (&self.termios, &other.termios);
        a.c_iflag == b.c_iflag
            && a.c_oflag == b.c_oflag
            && a.c_cflag == b.c_cflag
            && a.c_lflag == b.c_lflag
            && a.c_cc == b.c_cc
            && self.speeds() == other.speeds()
    }
}

impl Eq for TerminalSettings {}

impl std::fmt::Debug for TerminalSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = &self.termios;
        f.debug_struct("TerminalSettings")
            .field("iflag", &format_args!("{:#o}", t.c_iflag))
            .field("oflag", &format_args!("{:#o}", t.c_oflag))
            .field("cflag", &format_args!("{:#o}", t.c_cflag))
            .field("lflag", &format_args!("{:#o}", t.c_lflag))
            .field("vmin", &t.c_cc[libc::VMIN])
            .field("vtime", &t.c_cc[libc::VTIME])
            .finish()
    }
}

// ─── Exit-Safe Terminal Restore ─────────────────────────────────────────────

/// Global backup of the original settings for the exit and panic hooks.
///
/// The [`RawMode`] guard owns its own copy, but `atexit` handlers and panic
/// hooks can't reach it. This backup (behind a [`Mutex`], not `static mut`)
/// lets them restore without the guard.
static SETTINGS_BACKUP: Mutex<Option<(RawFd, TerminalSettings)>> = Mutex::new(None);

/// Restore the terminal from the global backup. Best-effort, ignores errors.
///
/// Safe to call any number of times: it is a no-op once the backup has been
/// consumed.
pub fn restore_from_backup() {
    if let Ok(mut guard) = SETTINGS_BACKUP.lock() {
        if let Some((fd, original)) = guard.take() {
            let _ = original.apply(fd);
        }
    }
}

fn store_backup(fd: RawFd, original: TerminalSettings) {
    if let Ok(mut guard) = SETTINGS_BACKUP.lock() {
        *guard = Some((fd, original));
    }
}

fn clear_backup(fd: RawFd) {
    if let Ok(mut guard) = SETTINGS_BACKUP.lock() {
        if guard.as_ref().is_some_and(|(saved, _)| *saved == fd) {
            *guard = None;
        }
    }
}

extern "C" fn restore_at_exit() {
    restore_from_backup();
}

/// Exit hook guard — `atexit` registration happens at most once per process.
static EXIT_HOOK_INSTALLED: Once = Once::new();

fn install_exit_hook() {
    EXIT_HOOK_INSTALLED.call_once(|| {
        if unsafe { libc::atexit(restore_at_exit) } != 0 {
            warn!("atexit registration failed; relying on drop and panic hook");
        }
    });
}

/// Bytes written straight to fd 1 from the panic hook: make the cursor visible.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[?25h";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Without this, a panic in raw mode leaves the user's terminal broken: no
/// echo, no line editing, no way to read the error message. The hook writes
/// directly to fd 1 (bypassing Rust's stdout lock, which the panicking frame
/// may hold), restores termios, then delegates to the original handler.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            unsafe {
                let _ = libc::write(
                    libc::STDOUT_FILENO,
                    EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
                    EMERGENCY_RESTORE.len(),
                );
            }
            restore_from_backup();
            original(info);
        }));
    });
}

// ─── RawMode ────────────────────────────────────────────────────────────────

/// Raw-mode session guard.
///
/// Created by [`enter`](Self::enter); the terminal is restored by
/// [`restore`](Self::restore), by dropping the guard, or (if the process
/// exits without either) by the `atexit` hook.
///
/// # Example
///
/// ```no_run
/// use cedit_term::terminal::RawMode;
///
/// let mut session = RawMode::enter()?;
/// // ... read keys, paint frames ...
/// session.restore()?;
/// # Ok::<(), cedit_term::TermError>(())
/// ```
#[derive(Debug)]
pub struct RawMode {
    fd: RawFd,
    original: TerminalSettings,
    active: bool,
}

impl RawMode {
    /// Put the controlling terminal (stdin) into raw mode.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin is not a terminal or its attributes cannot
    /// be read or changed.
    pub fn enter() -> Result<Self, TermError> {
        Self::enter_fd(libc::STDIN_FILENO)
    }

    /// Put the terminal behind `fd` into raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::GetAttributes`] if `fd` is not a terminal, or
    /// [`TermError::SetAttributes`] if raw settings cannot be applied.
    pub fn enter_fd(fd: RawFd) -> Result<Self, TermError> {
        let original = TerminalSettings::capture(fd)?;

        // Hooks and backup go in before the terminal is touched, so a
        // failure anywhere after this point still restores.
        install_exit_hook();
        install_panic_hook();
        store_backup(fd, original);

        if let Err(e) = original.to_raw().apply(fd) {
            clear_backup(fd);
            return Err(e);
        }

        info!(fd, "entered raw mode");
        debug!(?original, "saved terminal settings");

        Ok(Self {
            fd,
            original,
            active: true,
        })
    }

    /// The settings captured before raw mode was entered.
    #[inline]
    #[must_use]
    pub const fn original(&self) -> &TerminalSettings {
        &self.original
    }

    /// Whether raw mode is still in effect.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Reapply the captured settings.
    ///
    /// Idempotent: restoring an already-restored session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::SetAttributes`] if the settings cannot be applied.
    pub fn restore(&mut self) -> Result<(), TermError> {
        if !self.active {
            return Ok(());
        }
        self.original.apply(self.fd)?;
        clear_backup(self.fd);
        self.active = false;
        info!(fd = self.fd, "restored terminal settings");
        Ok(())
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if self.active {
            let _ = self.restore();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{File, OpenOptions};
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::AsRawFd;

    /// A pseudo-terminal pair. The slave end behaves like a real terminal
    /// for termios purposes, so raw mode can be exercised without a TTY.
    struct Pty {
        master: RawFd,
        slave: File,
    }

    impl Pty {
        fn open() -> Self {
            unsafe {
                let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
                assert!(master >= 0, "posix_openpt failed");
                assert_eq!(libc::grantpt(master), 0, "grantpt failed");
                assert_eq!(libc::unlockpt(master), 0, "unlockpt failed");

                let mut name = [0 as libc::c_char; 128];
                assert_eq!(
                    libc::ptsname_r(master, name.as_mut_ptr(), name.len()),
                    0,
                    "ptsname_r failed"
                );
                let path = std::ffi::CStr::from_ptr(name.as_ptr())
                    .to_str()
                    .unwrap()
                    .to_owned();

                let slave = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .custom_flags(libc::O_NOCTTY)
                    .open(path)
                    .unwrap();

                Self { master, slave }
            }
        }

        fn fd(&self) -> RawFd {
            self.slave.as_raw_fd()
        }
    }

    impl Drop for Pty {
        fn drop(&mut self) {
            unsafe {
                libc::close(self.master);
            }
        }
    }

    // ── TerminalSettings ────────────────────────────────────────────

    #[test]
    fn to_raw_clears_input_flags() {
        let pty = Pty::open();
        let raw = TerminalSettings::capture(pty.fd()).unwrap().to_raw();
        let t = raw.termios;
        for flag in [libc::BRKINT, libc::ICRNL, libc::INPCK, libc::ISTRIP, libc::IXON] {
            assert_eq!(t.c_iflag & flag, 0);
        }
    }

    #[test]
    fn to_raw_clears_output_and_local_flags() {
        let pty = Pty::open();
        let raw = TerminalSettings::capture(pty.fd()).unwrap().to_raw();
        let t = raw.termios;
        assert_eq!(t.c_oflag & libc::OPOST, 0);
        for flag in [libc::ECHO, libc::ICANON, libc::ISIG, libc::IEXTEN] {
            assert_eq!(t.c_lflag & flag, 0);
        }
        assert_eq!(t.c_cflag & libc::CS8, libc::CS8);
    }

    #[test]
    fn to_raw_sets_decisecond_read_timeout() {
        let pty = Pty::open();
        let raw = TerminalSettings::capture(pty.fd()).unwrap().to_raw();
        assert_eq!(raw.termios.c_cc[libc::VMIN], 0);
        assert_eq!(raw.termios.c_cc[libc::VTIME], 1);
        assert!(raw.is_raw());
    }

    #[test]
    fn to_raw_leaves_the_original_untouched() {
        let pty = Pty::open();
        let original = TerminalSettings::capture(pty.fd()).unwrap();
        let copy = original;
        let _ = original.to_raw();
        assert_eq!(original, copy);
        assert_ne!(original, original.to_raw());
    }

    #[test]
    fn capture_fails_on_non_terminal() {
        let devnull = File::open("/dev/null").unwrap();
        let err = TerminalSettings::capture(devnull.as_raw_fd()).unwrap_err();
        assert!(matches!(err, TermError::GetAttributes(_)));
    }

    #[test]
    fn debug_shows_timeout_fields() {
        let pty = Pty::open();
        let raw = TerminalSettings::capture(pty.fd()).unwrap().to_raw();
        let s = format!("{raw:?}");
        assert!(s.contains("vmin: 0"));
        assert!(s.contains("vtime: 1"));
    }

    // ── RawMode ─────────────────────────────────────────────────────

    #[test]
    fn enter_then_restore_round_trips() {
        let pty = Pty::open();
        let before = TerminalSettings::capture(pty.fd()).unwrap();

        let mut session = RawMode::enter_fd(pty.fd()).unwrap();
        assert!(session.is_active());
        assert_eq!(*session.original(), before);

        let during = TerminalSettings::capture(pty.fd()).unwrap();
        assert!(during.is_raw());
        assert_eq!(during, before.to_raw());

        session.restore().unwrap();
        assert!(!session.is_active());
        assert_eq!(TerminalSettings::capture(pty.fd()).unwrap(), before);
    }

    #[test]
    fn drop_restores() {
        let pty = Pty::open();
        let before = TerminalSettings::capture(pty.fd()).unwrap();
        {
            let _session = RawMode::enter_fd(pty.fd()).unwrap();
            assert!(TerminalSettings::capture(pty.fd()).unwrap().is_raw());
        }
        assert_eq!(TerminalSettings::capture(pty.fd()).unwrap(), before);
    }

    #[test]
    fn restore_is_idempotent() {
        let pty = Pty::open();
        let before = TerminalSettings::capture(pty.fd()).unwrap();
        let mut session = RawMode::enter_fd(pty.fd()).unwrap();
        session.restore().unwrap();
        session.restore().unwrap();
        assert_eq!(TerminalSettings::capture(pty.fd()).unwrap(), before);
    }

    #[test]
    fn enter_fails_on_non_terminal() {
        let devnull = File::open("/dev/null").unwrap();
        let err = RawMode::enter_fd(devnull.as_raw_fd()).unwrap_err();
        assert!(matches!(err, TermError::GetAttributes(_)));
    }

    #[test]
    fn emergency_restore_shows_cursor() {
        assert_eq!(EMERGENCY_RESTORE, b"\x1b[?25h");
    }
}
