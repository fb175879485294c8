//! Unidirectional byte channels between the orchestrator and its workloads.
//!
//! Every channel end is created close-on-exec. A child therefore keeps only
//! the ends explicitly wired onto its standard streams (the `dup2` performed
//! for stdin/stdout clears the flag on the copy) and every other end, its own
//! or another workload's, is closed when the program image loads.

use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::process::Stdio;

use crate::error::{Error, Result};

/// One pipe: a single producer end and a single consumer end.
///
/// Ends are handed out with [`take_read`](Self::take_read) and
/// [`take_write`](Self::take_write); whatever remains is closed on drop.
#[derive(Debug)]
pub struct Channel {
    read: Option<OwnedFd>,
    write: Option<OwnedFd>,
}

impl Channel {
    /// Create a channel. Fails only on descriptor exhaustion.
    pub fn create() -> Result<Self> {
        let (read, write) = cloexec_pipe().map_err(Error::ChannelCreate)?;
        Ok(Self {
            read: Some(read),
            write: Some(write),
        })
    }

    /// Take the consumer end, leaving `None` behind.
    pub fn take_read(&mut self) -> Option<OwnedFd> {
        self.read.take()
    }

    /// Take the producer end, leaving `None` behind.
    pub fn take_write(&mut self) -> Option<OwnedFd> {
        self.write.take()
    }

    /// Close the consumer end if this channel still holds it.
    pub fn close_read(&mut self) {
        self.read = None;
    }

    /// Close the producer end if this channel still holds it.
    pub fn close_write(&mut self) {
        self.write = None;
    }

    /// Consume the channel, keeping only its consumer end as a `File`.
    pub fn into_reader(mut self) -> Option<File> {
        self.close_write();
        self.read.take().map(File::from)
    }
}

/// Redirections applied to a workload's standard streams at launch.
///
/// Unwired stdin reads from `/dev/null` so workloads never compete with the
/// operator console; unwired stdout is inherited.
#[derive(Debug, Default)]
pub struct Wiring {
    stdin: Option<OwnedFd>,
    stdout: Option<OwnedFd>,
}

impl Wiring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the workload's stdin from `fd`.
    pub fn stdin(mut self, fd: Option<OwnedFd>) -> Self {
        self.stdin = fd;
        self
    }

    /// Send the workload's stdout into `fd`.
    pub fn stdout(mut self, fd: Option<OwnedFd>) -> Self {
        self.stdout = fd;
        self
    }

    pub(crate) fn into_stdio(self) -> (Stdio, Stdio) {
        let stdin = self.stdin.map_or_else(Stdio::null, Stdio::from);
        let stdout = self.stdout.map_or_else(Stdio::inherit, Stdio::from);
        (stdin, stdout)
    }
}

/// Both ends are close-on-exec from the start, so a process forked by
/// another thread can never inherit them.
#[cfg(target_os = "linux")]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as RawFd; 2];
    let ret = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

#[cfg(not(target_os = "linux"))]
fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as RawFd; 2];
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    // Own both ends before anything else can fail.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    set_cloexec(&read)?;
    set_cloexec(&write)?;
    Ok((read, write))
}

#[cfg(not(target_os = "linux"))]
fn set_cloexec(fd: &OwnedFd) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(raw, libc::F_GETFD);
        if flags < 0 || libc::fcntl(raw, libc::F_SETFD, flags | libc::FD_CLOEXEC) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Switch a descriptor to non-blocking mode.
pub fn set_nonblocking(fd: &impl AsRawFd) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(raw, libc::F_GETFL);
        if flags < 0 || libc::fcntl(raw, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
