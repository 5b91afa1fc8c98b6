//! Execution-event source - netlink proc connector attach
//!
//! The monitor core is fed by an OS-level "process executed" notification
//! stream. On Linux that is the netlink process connector: subscribe to the
//! `CN_IDX_PROC` multicast group and resolve each `PROC_EVENT_EXEC` pid to
//! its executable path through `/proc/<pid>/exe`. Subscribing requires
//! `CAP_NET_ADMIN`; any setup failure is fatal to the program.
//!
//! The connector structs libc does not export (`cn_msg`, `proc_event`) are
//! built and parsed manually from native-endian bytes, which also sidesteps
//! the unaligned placement of the event payload inside the datagram.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;

use thiserror::Error;
use tracing::debug;

// include/uapi/linux/connector.h
const CN_IDX_PROC: u32 = 1;
const CN_VAL_PROC: u32 = 1;
const NLMSG_DONE: u16 = 3;
const NLMSG_HDR_LEN: usize = 16;
const CN_MSG_LEN: usize = 20;

// include/uapi/linux/cn_proc.h
const PROC_CN_MCAST_LISTEN: u32 = 1;
const PROC_CN_MCAST_IGNORE: u32 = 2;
const PROC_EVENT_EXEC: u32 = 0x0000_0002;
/// Offset of the event union within `struct proc_event` (after what, cpu,
/// timestamp_ns).
const EVENT_DATA_OFFSET: usize = 16;

/// Setup failures while attaching to the event source. All fatal: the
/// program exits with code 1, there is no retry.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to open netlink connector socket: {0}")]
    Socket(#[source] io::Error),
    #[error("failed to bind netlink connector socket: {0}")]
    Bind(#[source] io::Error),
    #[error("failed to subscribe to process events: {0}")]
    Subscribe(#[source] io::Error),
}

/// One observed execution attempt.
#[derive(Debug, Clone)]
pub struct ExecEvent {
    pub pid: i32,
    /// Raw executable path bytes, unbounded; the monitor truncates.
    pub path: Vec<u8>,
}

/// A stream of process-execution events.
pub trait ExecEventSource {
    /// Block for the next datagram. `Ok(None)` means the datagram carried
    /// no usable exec event (other event kind, ack, vanished pid) and the
    /// caller should simply poll again.
    fn next_event(&mut self) -> io::Result<Option<ExecEvent>>;
}

/// Netlink process-connector subscription.
pub struct ProcConnector {
    fd: OwnedFd,
}

impl ProcConnector {
    /// Open, bind and subscribe. Each step maps to its own fatal
    /// [`SetupError`] variant so the failure is attributable.
    pub fn attach() -> Result<Self, SetupError> {
        let raw = unsafe {
            libc::socket(
                libc::PF_NETLINK,
                libc::SOCK_DGRAM,
                libc::NETLINK_CONNECTOR,
            )
        };
        if raw < 0 {
            return Err(SetupError::Socket(io::Error::last_os_error()));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut addr: libc::sockaddr_nl = unsafe { std::mem::zeroed() };
        addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
        addr.nl_pid = std::process::id();
        addr.nl_groups = CN_IDX_PROC;
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(SetupError::Bind(io::Error::last_os_error()));
        }

        let conn = Self { fd };
        conn.send_mcast_op(PROC_CN_MCAST_LISTEN)
            .map_err(SetupError::Subscribe)?;
        debug!("subscribed to proc connector exec events");
        Ok(conn)
    }

    fn send_mcast_op(&self, op: u32) -> io::Result<()> {
        let msg = build_mcast_msg(op);
        let sent = unsafe {
            libc::send(
                self.fd.as_raw_fd(),
                msg.as_ptr() as *const libc::c_void,
                msg.len(),
                0,
            )
        };
        if sent < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl ExecEventSource for ProcConnector {
    fn next_event(&mut self) -> io::Result<Option<ExecEvent>> {
        let mut buf = [0u8; 1024];
        let n = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        let Some(pid) = parse_exec_pid(&buf[..n as usize]) else {
            return Ok(None);
        };

        // The pid may already be gone; a failed read is a non-event, same
        // as a truncated path read at the original tracepoint.
        match std::fs::read_link(format!("/proc/{}/exe", pid)) {
            Ok(path) => Ok(Some(ExecEvent {
                pid,
                path: path.as_os_str().as_bytes().to_vec(),
            })),
            Err(_) => Ok(None),
        }
    }
}

impl Drop for ProcConnector {
    fn drop(&mut self) {
        // Best-effort unsubscribe; the socket closes either way.
        let _ = self.send_mcast_op(PROC_CN_MCAST_IGNORE);
    }
}

/// Serialize the nlmsghdr + cn_msg + op subscription datagram.
fn build_mcast_msg(op: u32) -> Vec<u8> {
    let total = NLMSG_HDR_LEN + CN_MSG_LEN + 4;
    let mut msg = Vec::with_capacity(total);
    // struct nlmsghdr
    msg.extend_from_slice(&(total as u32).to_ne_bytes()); // nlmsg_len
    msg.extend_from_slice(&NLMSG_DONE.to_ne_bytes()); // nlmsg_type
    msg.extend_from_slice(&0u16.to_ne_bytes()); // nlmsg_flags
    msg.extend_from_slice(&0u32.to_ne_bytes()); // nlmsg_seq
    msg.extend_from_slice(&std::process::id().to_ne_bytes()); // nlmsg_pid
    // struct cn_msg
    msg.extend_from_slice(&CN_IDX_PROC.to_ne_bytes());
    msg.extend_from_slice(&CN_VAL_PROC.to_ne_bytes());
    msg.extend_from_slice(&0u32.to_ne_bytes()); // seq
    msg.extend_from_slice(&0u32.to_ne_bytes()); // ack
    msg.extend_from_slice(&4u16.to_ne_bytes()); // payload len
    msg.extend_from_slice(&0u16.to_ne_bytes()); // flags
    // payload
    msg.extend_from_slice(&op.to_ne_bytes());
    msg
}

/// Pull the exec'ing pid out of one connector datagram, or None if it is
/// not a `PROC_EVENT_EXEC` message.
fn parse_exec_pid(buf: &[u8]) -> Option<i32> {
    if read_u16(buf, 4)? != NLMSG_DONE {
        return None;
    }
    let event = buf.get(NLMSG_HDR_LEN + CN_MSG_LEN..)?;
    if read_u32(event, 0)? != PROC_EVENT_EXEC {
        return None;
    }
    // union: struct exec_proc_event { __kernel_pid_t process_pid, process_tgid; }
    let pid = read_u32(event, EVENT_DATA_OFFSET)? as i32;
    Some(pid)
}

fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset + 2)?;
    Some(u16::from_ne_bytes(bytes.try_into().ok()?))
}

fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset + 4)?;
    Some(u32::from_ne_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datagram(what: u32, pid: u32) -> Vec<u8> {
        let mut buf = build_mcast_msg(0); // reuse header layout, patch below
        buf.truncate(NLMSG_HDR_LEN + CN_MSG_LEN);
        // struct proc_event: what, cpu, timestamp_ns, event data
        buf.extend_from_slice(&what.to_ne_bytes());
        buf.extend_from_slice(&0u32.to_ne_bytes()); // cpu
        buf.extend_from_slice(&0u64.to_ne_bytes()); // timestamp_ns
        buf.extend_from_slice(&pid.to_ne_bytes()); // process_pid
        buf.extend_from_slice(&pid.to_ne_bytes()); // process_tgid
        buf
    }

    #[test]
    fn test_parses_exec_event_pid() {
        let buf = datagram(PROC_EVENT_EXEC, 4242);
        assert_eq!(parse_exec_pid(&buf), Some(4242));
    }

    #[test]
    fn test_ignores_other_event_kinds() {
        // PROC_EVENT_FORK
        let buf = datagram(0x0000_0001, 4242);
        assert_eq!(parse_exec_pid(&buf), None);
    }

    #[test]
    fn test_ignores_short_datagrams() {
        assert_eq!(parse_exec_pid(&[]), None);
        assert_eq!(parse_exec_pid(&[0u8; 8]), None);
        // Header only, no event payload
        let mut buf = datagram(PROC_EVENT_EXEC, 1);
        buf.truncate(NLMSG_HDR_LEN + CN_MSG_LEN + 4);
        assert_eq!(parse_exec_pid(&buf), None);
    }

    #[test]
    fn test_subscription_message_layout() {
        let msg = build_mcast_msg(PROC_CN_MCAST_LISTEN);
        assert_eq!(msg.len(), NLMSG_HDR_LEN + CN_MSG_LEN + 4);
        assert_eq!(read_u32(&msg, 0), Some(msg.len() as u32)); // nlmsg_len
        assert_eq!(read_u16(&msg, 4), Some(NLMSG_DONE));
        assert_eq!(read_u32(&msg, NLMSG_HDR_LEN), Some(CN_IDX_PROC));
        assert_eq!(
            read_u32(&msg, NLMSG_HDR_LEN + CN_MSG_LEN),
            Some(PROC_CN_MCAST_LISTEN)
        );
    }
}
