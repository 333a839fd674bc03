//! # Connection Registry
//!
//! Tracks live websocket connections grouped by user identity. A user may hold any number
//! of connections (one per device or tab); each connection belongs to exactly one group.
//!
//! ## Identity lifecycle:
//! 1. **Register**: the initial group is the authenticated identity, else a non-blank
//!    `userId` query parameter, else the connection's own id (`conn-N`).
//! 2. **Re-key**: `set_user_id` moves the connection to a new group. Leaving the old group
//!    and joining the new one happen under one write lock, so a concurrent `send_to_group`
//!    sees the connection in exactly one of them.
//! 3. **Disconnect**: the connection leaves its group; empty groups are dropped.
//!
//! Outbound frames are shared as `Arc<ServerMessage>`. Fanning one alert out to many
//! connections clones a pointer, not the payload. A send to a connection whose receiver is
//! gone prunes that connection.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::message::ServerMessage;
use crate::error::RegistryError;

/// Unique id of a transport session within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What a freshly registered connection needs to serve its socket.
#[derive(Debug)]
pub struct Registration {
    pub id: ConnectionId,
    pub group: String,
    pub receiver: mpsc::UnboundedReceiver<Arc<ServerMessage>>,
}

struct ConnectionEntry {
    group: String,
    sender: mpsc::UnboundedSender<Arc<ServerMessage>>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

impl Inner {
    fn join(&mut self, id: ConnectionId, group: &str) {
        self.groups.entry(group.to_string()).or_default().insert(id);
    }

    fn leave(&mut self, id: ConnectionId, group: &str) {
        if let Some(members) = self.groups.get_mut(group) {
            members.remove(&id);
            if members.is_empty() {
                self.groups.remove(group);
            }
        }
    }

    fn remove(&mut self, id: ConnectionId) -> Option<ConnectionEntry> {
        let entry = self.connections.remove(&id)?;
        self.leave(id, &entry.group);
        Some(entry)
    }
}

/// Process-scoped registry of live connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Initial group for a connection.
    pub fn resolve_identity(authenticated: Option<&str>, query_user_id: Option<&str>, id: ConnectionId) -> String {
        authenticated
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| query_user_id.map(str::trim).filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }

    /// Registers a new connection and places it in its initial group.
    pub fn register(&self, authenticated: Option<&str>, query_user_id: Option<&str>) -> Registration {
        let id = self.next_connection_id();
        let group = Self::resolve_identity(authenticated, query_user_id, id);
        let (sender, receiver) = mpsc::unbounded_channel();

        {
            let mut inner = self.inner.write();
            inner.connections.insert(
                id,
                ConnectionEntry {
                    group: group.clone(),
                    sender,
                },
            );
            inner.join(id, &group);
        }

        info!(connection_id = %id, user_id = %group, "Connection registered");
        Registration { id, group, receiver }
    }

    /// # Set User Id
    ///
    /// Moves `id` into the group `user_id` and returns the group it left. Re-setting the
    /// current group is a no-op.
    ///
    /// # Errors
    /// `EmptyUserId` for a blank id, `UnknownConnection` when `id` is not registered.
    pub fn set_user_id(&self, id: ConnectionId, user_id: &str) -> Result<String, RegistryError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(RegistryError::EmptyUserId);
        }

        let mut inner = self.inner.write();
        let previous = inner
            .connections
            .get_mut(&id)
            .map(|entry| std::mem::replace(&mut entry.group, user_id.to_string()))
            .ok_or_else(|| RegistryError::UnknownConnection(id.to_string()))?;

        if previous != user_id {
            inner.leave(id, &previous);
            inner.join(id, user_id);
            debug!(connection_id = %id, from = %previous, to = %user_id, "Connection re-keyed");
        }

        Ok(previous)
    }

    /// Removes `id`. Returns whether it was registered.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.inner.write().remove(id);
        match removed {
            Some(entry) => {
                info!(connection_id = %id, user_id = %entry.group, "Connection closed");
                true
            }
            None => false,
        }
    }

    /// # Send To Group
    ///
    /// Queues `message` on every connection in `group` at the time of the call and returns
    /// how many accepted it. Connections whose socket task has ended are pruned.
    pub fn send_to_group(&self, group: &str, message: Arc<ServerMessage>) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        {
            let inner = self.inner.read();
            let Some(members) = inner.groups.get(group) else {
                return 0;
            };
            for id in members {
                let Some(entry) = inner.connections.get(id) else {
                    continue;
                };
                if entry.sender.send(Arc::clone(&message)).is_ok() {
                    delivered += 1;
                } else {
                    dead.push(*id);
                }
            }
        }

        if !dead.is_empty() {
            let mut inner = self.inner.write();
            for id in dead {
                inner.remove(id);
                debug!(connection_id = %id, user_id = group, "Pruned dead connection");
            }
        }

        delivered
    }

    /// Connections currently in `group`, in id order.
    pub fn group_members(&self, group: &str) -> Vec<ConnectionId> {
        let mut members: Vec<ConnectionId> = self
            .inner
            .read()
            .groups
            .get(group)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// The group `id` currently belongs to.
    pub fn group_of(&self, id: ConnectionId) -> Option<String> {
        self.inner.read().connections.get(&id).map(|e| e.group.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }

    pub fn group_count(&self) -> usize {
        self.inner.read().groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pong() -> Arc<ServerMessage> {
        Arc::new(ServerMessage::Pong)
    }

    #[test]
    fn initial_identity_precedence() {
        let id = ConnectionId(7);
        assert_eq!(ConnectionRegistry::resolve_identity(Some("auth"), Some("query"), id), "auth");
        assert_eq!(ConnectionRegistry::resolve_identity(None, Some("query"), id), "query");
        assert_eq!(ConnectionRegistry::resolve_identity(None, Some("   "), id), "conn-7");
        assert_eq!(ConnectionRegistry::resolve_identity(Some(""), None, id), "conn-7");
    }

    #[test]
    fn anonymous_connection_is_grouped_under_its_own_id() {
        let registry = ConnectionRegistry::new();
        let reg = registry.register(None, None);

        assert_eq!(reg.group, reg.id.to_string());
        assert_eq!(registry.group_members(&reg.group), vec![reg.id]);
    }

    #[test]
    fn set_user_id_moves_connection_between_groups() {
        let registry = ConnectionRegistry::new();
        let reg = registry.register(None, None);
        let anonymous = reg.group.clone();

        let previous = registry.set_user_id(reg.id, "alice").unwrap();

        assert_eq!(previous, anonymous);
        assert!(registry.group_members(&anonymous).is_empty());
        assert_eq!(registry.group_members("alice"), vec![reg.id]);
        assert_eq!(registry.group_of(reg.id).as_deref(), Some("alice"));
        assert_eq!(registry.group_count(), 1);
    }

    #[test]
    fn re_keyed_connection_only_receives_new_group_traffic() {
        let registry = ConnectionRegistry::new();
        let mut reg = registry.register(None, Some("alice"));
        registry.set_user_id(reg.id, "bob").unwrap();

        assert_eq!(registry.send_to_group("alice", pong()), 0);
        assert_eq!(registry.send_to_group("bob", pong()), 1);
        assert_eq!(*reg.receiver.try_recv().unwrap(), ServerMessage::Pong);
        assert!(reg.receiver.try_recv().is_err());
    }

    #[test]
    fn blank_or_unknown_set_user_id_is_rejected() {
        let registry = ConnectionRegistry::new();
        let reg = registry.register(None, Some("alice"));

        assert_eq!(registry.set_user_id(reg.id, " "), Err(RegistryError::EmptyUserId));
        assert_eq!(registry.group_of(reg.id).as_deref(), Some("alice"));
        assert!(matches!(
            registry.set_user_id(ConnectionId(999), "bob"),
            Err(RegistryError::UnknownConnection(_))
        ));
    }

    #[test]
    fn every_device_of_a_user_receives_the_frame() {
        let registry = ConnectionRegistry::new();
        let mut phone = registry.register(None, Some("alice"));
        let mut laptop = registry.register(None, Some("alice"));
        let mut other = registry.register(None, Some("carol"));

        assert_eq!(registry.send_to_group("alice", pong()), 2);
        assert!(phone.receiver.try_recv().is_ok());
        assert!(laptop.receiver.try_recv().is_ok());
        assert!(other.receiver.try_recv().is_err());
    }

    #[test]
    fn disconnect_removes_connection_and_empty_group() {
        let registry = ConnectionRegistry::new();
        let reg = registry.register(None, Some("alice"));

        assert!(registry.disconnect(reg.id));
        assert!(!registry.disconnect(reg.id));
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.group_count(), 0);
        assert_eq!(registry.send_to_group("alice", pong()), 0);
    }

    #[test]
    fn dropped_receivers_are_pruned_on_send() {
        let registry = ConnectionRegistry::new();
        let gone = registry.register(None, Some("alice"));
        let _alive = registry.register(None, Some("alice"));
        drop(gone.receiver);

        assert_eq!(registry.send_to_group("alice", pong()), 1);
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.group_of(gone.id), None);
    }

    #[test]
    fn re_keying_never_exposes_zero_or_two_groups() {
        let registry = Arc::new(ConnectionRegistry::new());
        let reg = registry.register(None, Some("a"));
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let writer = {
            let registry = Arc::clone(&registry);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                for i in 0..50_000 {
                    let target = if i % 2 == 0 { "b" } else { "a" };
                    registry.set_user_id(reg.id, target).unwrap();
                }
                done.store(true, Ordering::Release);
            })
        };

        loop {
            let finished = done.load(Ordering::Acquire);
            {
                let inner = registry.inner.read();
                let count = ["a", "b"]
                    .iter()
                    .filter(|g| inner.groups.get(**g).is_some_and(|m| m.contains(&reg.id)))
                    .count();
                assert_eq!(count, 1, "connection seen in {count} groups mid re-key");
            }
            if finished {
                break;
            }
        }

        writer.join().unwrap();
        assert_eq!(registry.group_count(), 1);
    }

    #[test]
    fn unknown_group_is_a_silent_no_op() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.send_to_group("bob", pong()), 0);
    }
}
