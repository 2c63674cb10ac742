//! Opaque handles to host-managed actors
//!
//! The core never owns or resolves actors. Hosts hand out [`ActorRef`]s
//! (weak handles) at entry construction or mutation time; commands that need
//! to turn names into handles receive an [`ActorResolver`] from the host.

use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    /// Create a new random ActorId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Host-side actor (a player, an NPC, a console...)
pub trait Actor: Send + Sync + fmt::Debug {
    /// Stable identifier
    fn id(&self) -> ActorId;

    /// Display name
    fn name(&self) -> &str;

    /// Whether the actor can currently receive messages
    fn is_online(&self) -> bool {
        true
    }

    /// Deliver a message to the actor
    fn send_message(&self, message: &str);
}

/// Non-owning handle to a host actor.
///
/// Equality is by [`ActorId`]; the handle stays printable after the actor
/// itself is gone.
#[derive(Clone)]
pub struct ActorRef {
    id: ActorId,
    name: String,
    actor: Weak<dyn Actor>,
}

impl ActorRef {
    /// Create a handle without taking ownership of the actor
    pub fn new(actor: &Arc<dyn Actor>) -> Self {
        Self {
            id: actor.id(),
            name: actor.name().to_string(),
            actor: Arc::downgrade(actor),
        }
    }

    /// Identifier of the referenced actor
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Name captured when the handle was created
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Access the actor if the host still holds it
    pub fn get(&self) -> Option<Arc<dyn Actor>> {
        self.actor.upgrade()
    }

    /// Whether the actor still exists and is online
    pub fn is_online(&self) -> bool {
        self.get().map(|actor| actor.is_online()).unwrap_or(false)
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActorRef {}

impl fmt::Debug for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a@{}", self.name)
    }
}

impl From<&Arc<dyn Actor>> for ActorRef {
    fn from(actor: &Arc<dyn Actor>) -> Self {
        Self::new(actor)
    }
}

/// Host lookup from names to actor handles, handed to commands that take
/// actor names as arguments.
pub trait ActorResolver: Send + Sync {
    /// Resolve a single actor name; `None` when no such actor exists
    fn resolve(&self, name: &str) -> Option<ActorRef>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug)]
    struct Dummy {
        id: ActorId,
        inbox: Mutex<Vec<String>>,
    }

    impl Actor for Dummy {
        fn id(&self) -> ActorId {
            self.id
        }

        fn name(&self) -> &str {
            "dummy"
        }

        fn send_message(&self, message: &str) {
            self.inbox.lock().push(message.to_string());
        }
    }

    #[test]
    fn test_handle_does_not_keep_actor_alive() {
        let actor: Arc<dyn Actor> = Arc::new(Dummy {
            id: ActorId::new(),
            inbox: Mutex::new(Vec::new()),
        });
        let handle = ActorRef::new(&actor);
        assert!(handle.is_online());

        drop(actor);
        assert!(handle.get().is_none());
        assert!(!handle.is_online());
        assert_eq!(handle.to_string(), "a@dummy");
    }
}
