//! Replication policy seam
//!
//! The replication coordinator proper (elections, sync sources, majority
//! commit) lives outside this layer. The catalog asks it three questions:
//! is replication on at all, is a given namespace replicated, and may this
//! node accept writes for a database right now.

use coral_core::types::{DatabaseName, Namespace};

/// Whether replication is configured for this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationMode {
    /// No replication; nothing is logged for replay.
    None,
    /// Member of a replica set.
    ReplicaSet,
}

/// Answers the catalog's replication questions.
pub trait ReplicationPolicy: Send + Sync {
    /// The node's replication mode.
    fn mode(&self) -> ReplicationMode;

    /// Whether mutations of `ns` are recorded in the operation log.
    ///
    /// Renames may not change a collection's replication eligibility, so the
    /// validator compares this for source and target.
    fn is_replicated(&self, ns: &Namespace) -> bool;

    /// Whether this node currently accepts writes for `db`.
    fn can_accept_writes_for(&self, db: &DatabaseName) -> bool;
}

/// Policy of an unreplicated standalone node.
pub struct Standalone;

impl ReplicationPolicy for Standalone {
    fn mode(&self) -> ReplicationMode {
        ReplicationMode::None
    }

    fn is_replicated(&self, _ns: &Namespace) -> bool {
        false
    }

    fn can_accept_writes_for(&self, _db: &DatabaseName) -> bool {
        true
    }
}

/// Policy of a replica-set member. The `local` database is never replicated.
pub struct ReplicaSetMember {
    primary: bool,
}

impl ReplicaSetMember {
    /// A member currently acting as primary.
    pub fn primary() -> Self {
        ReplicaSetMember { primary: true }
    }

    /// A member currently acting as secondary; it accepts no user writes.
    pub fn secondary() -> Self {
        ReplicaSetMember { primary: false }
    }
}

impl ReplicationPolicy for ReplicaSetMember {
    fn mode(&self) -> ReplicationMode {
        ReplicationMode::ReplicaSet
    }

    fn is_replicated(&self, ns: &Namespace) -> bool {
        ns.db.as_str() != "local"
    }

    fn can_accept_writes_for(&self, _db: &DatabaseName) -> bool {
        self.primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_replicates_nothing() {
        let p = Standalone;
        assert_eq!(p.mode(), ReplicationMode::None);
        assert!(!p.is_replicated(&Namespace::new("sales", "orders")));
        assert!(p.can_accept_writes_for(&DatabaseName::new("sales")));
    }

    #[test]
    fn test_replica_set_member_excludes_local() {
        let p = ReplicaSetMember::primary();
        assert!(p.is_replicated(&Namespace::new("sales", "orders")));
        assert!(!p.is_replicated(&Namespace::new("local", "startup_log")));
    }

    #[test]
    fn test_secondary_rejects_writes() {
        let p = ReplicaSetMember::secondary();
        assert!(!p.can_accept_writes_for(&DatabaseName::new("sales")));
    }
}
