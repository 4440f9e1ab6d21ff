// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use serde::{Deserialize, Serialize};

use crate::util::Union;
use crate::HashSet;

/// A snapshot of the voting membership of the cluster.
///
/// Three shapes occur in the log, distinguishable by the predicates below:
///
/// * *normal*: only `servers` is populated; a single voting set.
/// * *old-new*: both sets are populated; the transitional joint configuration
///   in which commits require majorities of both.
/// * *new*: only `new_servers` is populated; the phase-two entry announcing
///   the target voter set. Committing it settles the cluster on
///   `new_servers` alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    /// The current voter set.
    pub servers: HashSet<u64>,
    /// The target voter set during a membership change.
    pub new_servers: Option<HashSet<u64>>,
}

impl Membership {
    /// Creates a single-configuration membership over the given voters.
    pub fn new(servers: impl IntoIterator<Item = u64>) -> Membership {
        Membership {
            servers: servers.into_iter().collect(),
            new_servers: None,
        }
    }

    /// Creates the joint membership over the current and the target voter
    /// sets.
    pub fn old_new(
        servers: impl IntoIterator<Item = u64>,
        new_servers: impl IntoIterator<Item = u64>,
    ) -> Membership {
        Membership {
            servers: servers.into_iter().collect(),
            new_servers: Some(new_servers.into_iter().collect()),
        }
    }

    /// Creates the phase-two membership carrying only the target voter set.
    pub fn incoming(new_servers: impl IntoIterator<Item = u64>) -> Membership {
        Membership {
            servers: HashSet::default(),
            new_servers: Some(new_servers.into_iter().collect()),
        }
    }

    /// Whether this is a plain single-configuration membership.
    #[inline]
    pub fn is_normal(&self) -> bool {
        !self.servers.is_empty() && self.new_servers.is_none()
    }

    /// Whether this is the transitional joint configuration.
    #[inline]
    pub fn is_old_new(&self) -> bool {
        !self.servers.is_empty() && self.new_servers.as_ref().map_or(false, |s| !s.is_empty())
    }

    /// Whether this is the phase-two configuration announcing the target
    /// voter set.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.servers.is_empty() && self.new_servers.as_ref().map_or(false, |s| !s.is_empty())
    }

    /// Check if an id is a voter in either set.
    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        self.servers.contains(&id)
            || self.new_servers.as_ref().map_or(false, |s| s.contains(&id))
    }

    /// Returns an iterator over the union of both voter sets.
    pub fn ids(&self) -> Union<'_> {
        match self.new_servers {
            Some(ref new_servers) => Union::new(&self.servers, new_servers),
            None => Union::new(&self.servers, &self.servers),
        }
    }

    /// The single-configuration membership a transitional membership settles
    /// into: `new_servers` promoted to `servers`. `None` when there is no
    /// target set.
    pub fn settled(&self) -> Option<Membership> {
        self.new_servers.as_ref().map(|s| Membership {
            servers: s.clone(),
            new_servers: None,
        })
    }
}

/// An indexed, immutable log record.
///
/// `conf` snapshots the membership in force at this entry's index; for a
/// configuration-change entry it is the configuration being introduced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Position in the log. Strictly monotonic across the log.
    pub index: u64,
    /// Leader term under which the entry was appended.
    pub term: u64,
    /// Opaque payload to apply to the state machine once committed.
    pub data: Vec<u8>,
    /// The membership governing this entry's commit.
    pub conf: Membership,
}

impl Entry {
    /// Creates an entry with an empty payload.
    pub fn new(index: u64, term: u64, conf: Membership) -> Entry {
        Entry {
            index,
            term,
            data: Vec::new(),
            conf,
        }
    }
}
