//! Connection registry: one entry per open socket with its identity state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

/// Process-unique connection id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Identity state machine: `Unidentified -> Registering -> Device`.
/// `Registering -> Unidentified` on registration failure; `Device` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Unidentified,
    Registering,
    Device(Arc<str>),
}

/// Coarse role, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Unidentified,
    Observer,
    Device,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unidentified => "unidentified",
            Role::Observer => "observer",
            Role::Device => "device",
        }
    }
}

/// Result of trying to start a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginRegistration {
    Started,
    /// Already registering or already a device; carries the current identity.
    Busy(Identity),
    Gone,
}

/// What remained of a connection when it was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departed {
    pub identity: Identity,
    pub role: Role,
}

struct ConnEntry {
    tx: mpsc::Sender<Message>,
    identity: Identity,
    structured: bool,
}

impl ConnEntry {
    fn role(&self) -> Role {
        match (&self.identity, self.structured) {
            (Identity::Device(_), _) => Role::Device,
            (_, true) => Role::Observer,
            (_, false) => Role::Unidentified,
        }
    }
}

/// Connection registry: `ConnId -> (outbound sender, identity)`.
///
/// Every mutation is a single map-entry operation; nothing here awaits.
pub struct ConnectionRegistry {
    conns: DashMap<ConnId, ConnEntry>,
    seq: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            conns: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Register a freshly opened connection as `Unidentified`.
    pub fn insert(&self, tx: mpsc::Sender<Message>) -> ConnId {
        let id = ConnId(self.seq.fetch_add(1, Ordering::Relaxed));
        self.conns.insert(
            id,
            ConnEntry {
                tx,
                identity: Identity::Unidentified,
                structured: false,
            },
        );
        id
    }

    pub fn remove(&self, conn: ConnId) -> Option<Departed> {
        self.conns.remove(&conn).map(|(_, e)| Departed {
            role: e.role(),
            identity: e.identity,
        })
    }

    pub fn contains(&self, conn: ConnId) -> bool {
        self.conns.contains_key(&conn)
    }

    pub fn len(&self) -> usize {
        self.conns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conns.is_empty()
    }

    pub fn identity(&self, conn: ConnId) -> Option<Identity> {
        self.conns.get(&conn).map(|e| e.identity.clone())
    }

    pub fn role(&self, conn: ConnId) -> Option<Role> {
        self.conns.get(&conn).map(|e| e.role())
    }

    pub fn device_count(&self) -> usize {
        self.conns
            .iter()
            .filter(|e| matches!(e.value().identity, Identity::Device(_)))
            .count()
    }

    /// Record that the connection spoke the structured protocol.
    pub fn mark_structured(&self, conn: ConnId) {
        if let Some(mut e) = self.conns.get_mut(&conn) {
            e.structured = true;
        }
    }

    pub fn sender(&self, conn: ConnId) -> Option<mpsc::Sender<Message>> {
        self.conns.get(&conn).map(|e| e.tx.clone())
    }

    /// Snapshot of senders for every connection except `except`.
    pub fn recipients(&self, except: Option<ConnId>) -> Vec<(ConnId, mpsc::Sender<Message>)> {
        self.conns
            .iter()
            .filter(|e| Some(*e.key()) != except)
            .map(|e| (*e.key(), e.value().tx.clone()))
            .collect()
    }

    /// `Unidentified -> Registering`, atomically.
    pub fn begin_registration(&self, conn: ConnId) -> BeginRegistration {
        let Some(mut e) = self.conns.get_mut(&conn) else {
            return BeginRegistration::Gone;
        };
        match &e.identity {
            Identity::Unidentified => {
                e.identity = Identity::Registering;
                BeginRegistration::Started
            }
            other => BeginRegistration::Busy(other.clone()),
        }
    }

    /// `Registering -> Device(id)`. False if the connection closed or is no
    /// longer registering; the id is then discarded.
    pub fn complete_registration(&self, conn: ConnId, device_id: Arc<str>) -> bool {
        let Some(mut e) = self.conns.get_mut(&conn) else {
            return false;
        };
        if e.identity != Identity::Registering {
            return false;
        }
        e.identity = Identity::Device(device_id);
        true
    }

    /// `Registering -> Unidentified` after a failed registration.
    pub fn abort_registration(&self, conn: ConnId) -> bool {
        let Some(mut e) = self.conns.get_mut(&conn) else {
            return false;
        };
        if e.identity != Identity::Registering {
            return false;
        }
        e.identity = Identity::Unidentified;
        true
    }
}
