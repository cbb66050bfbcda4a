//! Subprocess pipe management (L0).
//!
//! This module owns the raw child process: spawning it with redirected
//! stdin/stdout, line-oriented reads with a timeout, line writes, and a
//! disciplined quit/SIGTERM/SIGKILL shutdown sequence.

use std::io::{Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use nix::poll::{PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::error::{BadankError, Result};

const DESTROY_GRACE_MS: u64 = 100;
const SIGTERM_WAIT_MS: u64 = 500;
const SIGKILL_WAIT_MS: u64 = 100;

/// A line-oriented text pipe to a child process.
///
/// Commands are tokenised on whitespace only; quoted arguments are not
/// supported (mirrors the reference implementation's `split(command, " ")`).
pub struct TextProgram {
    child: Child,
    pid: u32,
    stdin: ChildStdin,
    stdout: ChildStdout,
    quit_sent: bool,
}

impl TextProgram {
    /// Spawn `command` (whitespace-tokenised) with an optional working directory.
    pub fn spawn(command: &str, dir: Option<&Path>) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| BadankError::Config("empty engine command".to_string()))?;
        let args: Vec<&str> = parts.collect();

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        // SAFETY: setsid() is async-signal-safe and is the only call made
        // between fork and exec here.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(std::io::Error::from)?;
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;
        let pid = child.id();
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        debug!(pid, command, "spawned subprocess");

        Ok(Self {
            child,
            pid,
            stdin,
            stdout,
            quit_sent: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Write one line, appending a trailing newline.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        let line = format!("{text}\n");
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Read one line, blocking up to `timeout_ms` (or indefinitely if `None`).
    ///
    /// `\r` bytes are dropped. Returns `Ok(None)` if the deadline elapses
    /// before a newline arrives, or if the child closed its stdout (EOF).
    pub fn read_line(&mut self, timeout_ms: Option<u64>) -> Result<Option<String>> {
        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        let mut buffer = String::new();
        let mut byte = [0u8; 1];

        loop {
            let fd: BorrowedFd = self.stdout.as_fd();
            let timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(None);
                    }
                    PollTimeout::from(remaining.as_millis().min(u16::MAX as u128) as u16)
                }
                None => PollTimeout::NONE,
            };

            let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
            let rc = nix::poll::poll(&mut fds, timeout)
                .map_err(|e| BadankError::Io(std::io::Error::from(e)))?;

            if rc == 0 {
                return Ok(None);
            }

            match self.stdout.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    let c = byte[0];
                    if c == b'\r' {
                        continue;
                    }
                    if c == b'\n' {
                        return Ok(Some(buffer));
                    }
                    buffer.push(c as char);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(BadankError::Io(e)),
            }
        }
    }
}

impl Drop for TextProgram {
    fn drop(&mut self) {
        if !self.quit_sent {
            let _ = self.write_line("quit");
            self.quit_sent = true;
        }
        std::thread::sleep(Duration::from_millis(DESTROY_GRACE_MS));

        let pid = Pid::from_raw(self.pid as i32);

        for round in 0..3 {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => {}
                Err(e) => {
                    warn!(pid = self.pid, error = %e, "waitpid failed during shutdown");
                    return;
                }
            }

            match round {
                0 => {
                    debug!(pid = self.pid, "sending SIGTERM");
                    let _ = signal::kill(pid, Signal::SIGTERM);
                    std::thread::sleep(Duration::from_millis(SIGTERM_WAIT_MS));
                }
                1 => {
                    debug!(pid = self.pid, "sending SIGKILL");
                    let _ = signal::kill(pid, Signal::SIGKILL);
                    std::thread::sleep(Duration::from_millis(SIGKILL_WAIT_MS));
                }
                _ => {
                    warn!(pid = self.pid, "failed to terminate process, leaking zombie");
                }
            }
        }
    }
}
