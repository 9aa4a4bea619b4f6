//! Bridge-link descriptor mini-language.
//!
//! A descriptor names one co-simulation link to an independently simulated PCI peer:
//!
//! ```text
//! connect:<socket_path>[:sync][:sync_interval=<N>][:latency=<N>]
//! listen:<socket_path>:<shm_path>[:sync][:sync_interval=<N>][:latency=<N>]
//! ```
//!
//! Fields are colon-delimited. The mode token fixes how many positional fields follow
//! (one for `connect`, two for `listen`); every remaining field must be one of the three
//! modifiers, in any order. Modifier values are forwarded verbatim; their units belong to
//! the bridge transport. A repeated modifier overrides the earlier occurrence.
//!
//! ```
//! use fsbricks_core::bridge::{ConnectionDescriptor, LinkMode};
//!
//! let d: ConnectionDescriptor = "listen:/tmp/a.sock:/tmp/a.shm:sync:latency=500"
//!     .parse()
//!     .unwrap();
//! assert_eq!(d.mode(), LinkMode::Listen);
//! assert_eq!(d.shm_path(), Some("/tmp/a.shm"));
//! assert_eq!(d.link_latency.as_deref(), Some("500"));
//! assert_eq!(d.to_string(), "listen:/tmp/a.sock:/tmp/a.shm:sync:latency=500");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::common::error::{DescriptorError, DescriptorFault};

const SYNC: &str = "sync";
const SYNC_INTERVAL: &str = "sync_interval=";
const LATENCY: &str = "latency=";

/// Which side of the link this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Dial an already-listening peer.
    Connect,
    /// Expose a socket and shared-memory region and wait for a peer.
    Listen,
}

impl LinkMode {
    /// The mode token as written in a descriptor.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Listen => "listen",
        }
    }

    /// Number of positional fields following the mode token.
    pub const fn positional_fields(self) -> usize {
        match self {
            Self::Connect => 1,
            Self::Listen => 2,
        }
    }
}

/// Transport endpoint; a shared-memory path exists exactly when listening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LinkEndpoint {
    /// Dial the peer's Unix socket.
    Connect {
        /// Peer's Unix socket.
        socket_path: String,
    },
    /// Listen on a Unix socket and offer a shared-memory region.
    Listen {
        /// Local Unix socket.
        socket_path: String,
        /// Shared-memory region offered to the peer.
        shm_path: String,
    },
}

/// A parsed, immutable bridge-link descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDescriptor {
    /// Where and how to reach the peer.
    pub endpoint: LinkEndpoint,
    /// Lock-step synchronisation with the peer.
    pub sync: bool,
    /// Raw synchronisation barrier interval.
    pub sync_interval: Option<String>,
    /// Raw modelled wire delay.
    pub link_latency: Option<String>,
}

impl ConnectionDescriptor {
    /// Descriptor for dialing `socket_path`, unsynchronised.
    pub fn connect(socket_path: impl Into<String>) -> Self {
        Self {
            endpoint: LinkEndpoint::Connect {
                socket_path: socket_path.into(),
            },
            sync: false,
            sync_interval: None,
            link_latency: None,
        }
    }

    /// Descriptor for listening on `socket_path` with `shm_path`, unsynchronised.
    pub fn listen(socket_path: impl Into<String>, shm_path: impl Into<String>) -> Self {
        Self {
            endpoint: LinkEndpoint::Listen {
                socket_path: socket_path.into(),
                shm_path: shm_path.into(),
            },
            sync: false,
            sync_interval: None,
            link_latency: None,
        }
    }

    /// Which side of the link this descriptor describes.
    pub const fn mode(&self) -> LinkMode {
        match self.endpoint {
            LinkEndpoint::Connect { .. } => LinkMode::Connect,
            LinkEndpoint::Listen { .. } => LinkMode::Listen,
        }
    }

    /// The Unix socket path.
    pub fn socket_path(&self) -> &str {
        match &self.endpoint {
            LinkEndpoint::Connect { socket_path } | LinkEndpoint::Listen { socket_path, .. } => {
                socket_path
            }
        }
    }

    /// The shared-memory path, present only in listen mode.
    pub fn shm_path(&self) -> Option<&str> {
        match &self.endpoint {
            LinkEndpoint::Connect { .. } => None,
            LinkEndpoint::Listen { shm_path, .. } => Some(shm_path),
        }
    }

    /// Parses one descriptor, stopping at the first violation.
    ///
    /// # Errors
    ///
    /// Returns a [`DescriptorError`] carrying `input` when the mode is unknown, a
    /// positional field is missing, or a trailing field matches no modifier.
    pub fn parse(input: &str) -> Result<Self, DescriptorError> {
        let malformed = |fault| DescriptorError {
            input: input.to_string(),
            fault,
        };

        let mut fields = input.split(':');
        let mode = match fields.next().unwrap_or_default() {
            "connect" => LinkMode::Connect,
            "listen" => LinkMode::Listen,
            other => return Err(malformed(DescriptorFault::UnknownMode(other.to_string()))),
        };

        let mut found = 0;
        let mut positional = || {
            let field = fields.next();
            if field.is_some() {
                found += 1;
            }
            field.map(str::to_string).ok_or(DescriptorFault::MissingPositional {
                mode: mode.token(),
                expected: mode.positional_fields(),
                found,
            })
        };
        let endpoint = match mode {
            LinkMode::Connect => LinkEndpoint::Connect {
                socket_path: positional().map_err(malformed)?,
            },
            LinkMode::Listen => LinkEndpoint::Listen {
                socket_path: positional().map_err(malformed)?,
                shm_path: positional().map_err(malformed)?,
            },
        };

        let mut descriptor = Self {
            endpoint,
            sync: false,
            sync_interval: None,
            link_latency: None,
        };
        for field in fields {
            if field == SYNC {
                descriptor.sync = true;
            } else if let Some(value) = field.strip_prefix(SYNC_INTERVAL) {
                descriptor.sync_interval = Some(value.to_string());
            } else if let Some(value) = field.strip_prefix(LATENCY) {
                descriptor.link_latency = Some(value.to_string());
            } else {
                return Err(malformed(DescriptorFault::UnknownModifier(field.to_string())));
            }
        }

        debug!(
            mode = mode.token(),
            socket = descriptor.socket_path(),
            sync = descriptor.sync,
            "parsed bridge descriptor"
        );
        Ok(descriptor)
    }
}

impl FromStr for ConnectionDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionDescriptor {
    /// Writes the canonical form: positional fields, then `sync`, `sync_interval`, `latency`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.endpoint {
            LinkEndpoint::Connect { socket_path } => write!(f, "connect:{socket_path}")?,
            LinkEndpoint::Listen {
                socket_path,
                shm_path,
            } => write!(f, "listen:{socket_path}:{shm_path}")?,
        }
        if self.sync {
            write!(f, ":{SYNC}")?;
        }
        if let Some(interval) = &self.sync_interval {
            write!(f, ":{SYNC_INTERVAL}{interval}")?;
        }
        if let Some(latency) = &self.link_latency {
            write!(f, ":{LATENCY}{latency}")?;
        }
        Ok(())
    }
}

/// Parses every descriptor in order, failing on the first malformed one.
///
/// # Errors
///
/// Returns the [`DescriptorError`] of the first malformed descriptor; nothing parsed
/// before it is returned.
pub fn parse_descriptors<S: AsRef<str>>(
    inputs: &[S],
) -> Result<Vec<ConnectionDescriptor>, DescriptorError> {
    inputs
        .iter()
        .map(|s| ConnectionDescriptor::parse(s.as_ref()))
        .collect()
}
