use notesync_core::{NoteError, NoteResult};
use reqwest::Url;
use std::fmt::Debug;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Current reachability of the remote service. Read fresh on every call.
pub trait Connectivity: Debug {
    fn is_online(&self) -> bool;
}

/// A flag flipped by the caller. Backs `--offline` and tests.
#[derive(Debug, Default)]
pub struct ToggleConnectivity {
    online: AtomicBool,
}

impl ToggleConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for ToggleConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Reachability by opening a TCP connection to the server's host and port.
#[derive(Debug, Clone)]
pub struct ProbeConnectivity {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ProbeConnectivity {
    pub fn for_server(server_url: &str, timeout: Duration) -> NoteResult<Self> {
        let url = Url::parse(server_url).map_err(|err| {
            NoteError::usage(format!("invalid server URL '{server_url}': {err}"))
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| NoteError::usage(format!("server URL '{server_url}' has no host")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url.port_or_known_default().ok_or_else(|| {
            NoteError::usage(format!("server URL '{server_url}' has no known port"))
        })?;

        Ok(Self {
            host,
            port,
            timeout,
        })
    }

    fn addresses(&self) -> Vec<SocketAddr> {
        match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs.collect(),
            Err(err) => {
                tracing::debug!(host = %self.host, error = %err, "connectivity probe could not resolve host");
                Vec::new()
            }
        }
    }
}

impl Connectivity for ProbeConnectivity {
    fn is_online(&self) -> bool {
        let online = self
            .addresses()
            .iter()
            .any(|addr| TcpStream::connect_timeout(addr, self.timeout).is_ok());
        tracing::debug!(host = %self.host, port = self.port, online, "connectivity probe");
        online
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    CameOnline,
    WentOffline,
}

/// Turns successive reachability reads into edge events.
#[derive(Debug, Clone)]
pub struct ConnectivityWatch {
    last: bool,
}

impl ConnectivityWatch {
    pub fn new(initially_online: bool) -> Self {
        Self {
            last: initially_online,
        }
    }

    pub fn is_online(&self) -> bool {
        self.last
    }

    pub fn observe(&mut self, online: bool) -> Option<ConnectivityEvent> {
        if online == self.last {
            return None;
        }

        self.last = online;
        let event = if online {
            ConnectivityEvent::CameOnline
        } else {
            ConnectivityEvent::WentOffline
        };
        tracing::info!(?event, "connectivity changed");
        Some(event)
    }

    pub fn poll(&mut self, connectivity: &dyn Connectivity) -> Option<ConnectivityEvent> {
        self.observe(connectivity.is_online())
    }
}
