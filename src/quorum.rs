// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

pub mod joint;
pub mod majority;

use crate::errors::Result;
use crate::types::Membership;

pub use self::joint::JointCondition;
pub use self::majority::MajorityCondition;

/// The commit predicate attached to one inflight entry.
///
/// A condition tracks which voters have acknowledged replication of the
/// entry and decides when the commit threshold is met. The tracker never
/// inspects the variant; configuration shape is decided once, at
/// construction.
#[derive(Clone, Debug, PartialEq)]
pub enum CommitCondition {
    /// A majority of a single voter set.
    Majority(MajorityCondition),
    /// Majorities of both halves of a joint configuration.
    Joint(JointCondition),
}

impl CommitCondition {
    /// Builds the condition an entry governed by `conf` must satisfy.
    pub fn new(conf: &Membership) -> CommitCondition {
        if conf.new_servers.is_none() {
            CommitCondition::Majority(MajorityCondition::new(conf.servers.clone()))
        } else {
            CommitCondition::Joint(JointCondition::new(conf))
        }
    }

    /// Records a replication acknowledgement from `id`.
    pub fn add_vote(&mut self, id: u64) -> Result<()> {
        match self {
            CommitCondition::Majority(c) => c.add_vote(id),
            CommitCondition::Joint(c) => c.add_vote(id),
        }
    }

    /// Whether enough voters have acknowledged replication.
    #[inline]
    pub fn is_committed(&self) -> bool {
        match self {
            CommitCondition::Majority(c) => c.is_committed(),
            CommitCondition::Joint(c) => c.is_committed(),
        }
    }

    /// Check if an id is a voter of this condition.
    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        match self {
            CommitCondition::Majority(c) => c.contains(id),
            CommitCondition::Joint(c) => c.contains(id),
        }
    }
}
