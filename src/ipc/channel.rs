use std::fs::File;
use std::io::Read;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::process::ChildStdout;

use nix::errno::Errno;
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::poll::{PollFd, PollFlags, poll};

use crate::utils::prelude::*;

/// One non-blocking read attempt on a move channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelRead {
    /// One move octet was consumed.
    Octet(u8),
    /// Nothing buffered right now.
    NotReady,
    /// The player closed its end; no more octets will ever arrive.
    Closed,
}

/// The master's receiving end of one player's move stream.
///
/// Wraps the read side of the player's stdout pipe, switched to
/// non-blocking after spawn so a single poll loop can service all players.
pub struct MoveChannel {
    file: Option<File>,
}

impl MoveChannel {
    pub fn new(file: File) -> Result<MoveChannel> {
        set_nonblocking(file.as_raw_fd())?;
        Ok(MoveChannel { file: Some(file) })
    }

    pub fn from_child(stdout: ChildStdout) -> Result<MoveChannel> {
        MoveChannel::new(File::from(OwnedFd::from(stdout)))
    }

    pub fn fd(&self) -> Option<RawFd> {
        self.file.as_ref().map(|f| f.as_raw_fd())
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Drops the pipe end. Further reads report `Closed`.
    pub fn close(&mut self) {
        self.file = None;
    }

    /// Pulls at most one octet. An `Err` is a non-transient read failure;
    /// the caller retires the channel.
    pub fn read_octet(&mut self) -> Result<ChannelRead> {
        let Some(file) = self.file.as_mut() else {
            return Ok(ChannelRead::Closed);
        };

        let mut octet = [0u8; 1];
        match file.read(&mut octet) {
            Ok(0) => {
                self.close();
                Ok(ChannelRead::Closed)
            }
            Ok(_) => Ok(ChannelRead::Octet(octet[0])),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(ChannelRead::NotReady),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(ChannelRead::NotReady),
            Err(e) => Err(e).context("player channel read"),
        }
    }
}

fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = fcntl(fd, FcntlArg::F_GETFL).context("fcntl(F_GETFL)")?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags)).context("fcntl(F_SETFL)")?;
    Ok(())
}

/// The outcome of one bounded readiness wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// These members of the watch set have data (or a hangup) pending.
    Ready(Vec<usize>),
    TimedOut,
    /// A signal landed mid-wait; the caller re-checks its flags.
    Interrupted,
}

/// Waits for any of the watched descriptors to become readable. Entries
/// are `(player index, fd)`; the result reports player indices. Hangups
/// count as readable so EOFs are consumed promptly.
pub fn wait_ready(watch: &[(usize, RawFd)], timeout: Duration) -> Result<Readiness> {
    let mut fds: Vec<PollFd> = watch
        .iter()
        .map(|&(_, fd)| PollFd::new(fd, PollFlags::POLLIN))
        .collect();

    // round up so a sub-millisecond remainder still sleeps
    let timeout_ms = timeout.as_micros().div_ceil(1000).min(i32::MAX as u128) as i32;
    match poll(&mut fds, timeout_ms) {
        Ok(0) => Ok(Readiness::TimedOut),
        Ok(_) => {
            let pending = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;
            let ready = watch
                .iter()
                .zip(&fds)
                .filter(|(_, pollfd)| {
                    pollfd
                        .revents()
                        .is_some_and(|revents| revents.intersects(pending))
                })
                .map(|(&(player, _), _)| player)
                .collect();
            Ok(Readiness::Ready(ready))
        }
        Err(Errno::EINTR) => Ok(Readiness::Interrupted),
        Err(e) => Err(e).context("poll"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::FromRawFd;

    fn pipe_channel() -> (MoveChannel, RawFd) {
        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        let file = unsafe { File::from_raw_fd(read_end) };
        (MoveChannel::new(file).unwrap(), write_end)
    }

    #[test]
    fn idle_channels_are_not_ready() {
        let (mut channel, write_end) = pipe_channel();
        assert_eq!(channel.read_octet().unwrap(), ChannelRead::NotReady);

        let watch = [(0, channel.fd().unwrap())];
        let ready = wait_ready(&watch, Duration::from_millis(10)).unwrap();
        assert_eq!(ready, Readiness::TimedOut);

        nix::unistd::close(write_end).unwrap();
    }

    #[test]
    fn octets_flow_one_at_a_time() {
        let (mut channel, write_end) = pipe_channel();
        nix::unistd::write(write_end, &[0x03, 0x07]).unwrap();

        let watch = [(4, channel.fd().unwrap())];
        match wait_ready(&watch, Duration::from_millis(100)).unwrap() {
            Readiness::Ready(players) => assert_eq!(players, vec![4]),
            other => panic!("expected readiness, got {other:?}"),
        }

        assert_eq!(channel.read_octet().unwrap(), ChannelRead::Octet(0x03));
        assert_eq!(channel.read_octet().unwrap(), ChannelRead::Octet(0x07));
        assert_eq!(channel.read_octet().unwrap(), ChannelRead::NotReady);

        nix::unistd::close(write_end).unwrap();
    }

    #[test]
    fn hangup_reads_as_closed() {
        let (mut channel, write_end) = pipe_channel();
        nix::unistd::close(write_end).unwrap();

        let watch = [(0, channel.fd().unwrap())];
        assert!(matches!(
            wait_ready(&watch, Duration::from_millis(100)).unwrap(),
            Readiness::Ready(_)
        ));

        assert_eq!(channel.read_octet().unwrap(), ChannelRead::Closed);
        assert!(!channel.is_open());
        assert_eq!(channel.read_octet().unwrap(), ChannelRead::Closed);
    }
}
