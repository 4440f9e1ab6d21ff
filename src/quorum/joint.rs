// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use crate::errors::{Error, Result};
use crate::quorum::MajorityCondition;
use crate::types::Membership;

/// The commit condition of a joint configuration.
///
/// Composes the outgoing (current) and incoming (target) voter sets; the
/// entry commits only when both halves reach their own majority. A voter
/// present in both halves acknowledges in both with a single vote.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JointCondition {
    pub(crate) incoming: MajorityCondition,
    pub(crate) outgoing: MajorityCondition,
}

impl JointCondition {
    /// Creates the condition for an entry governed by a transitional
    /// membership. An absent target set leaves that half empty, which is
    /// trivially satisfied.
    pub fn new(conf: &Membership) -> JointCondition {
        JointCondition {
            incoming: MajorityCondition::new(conf.new_servers.clone().unwrap_or_default()),
            outgoing: MajorityCondition::new(conf.servers.clone()),
        }
    }

    /// Records an acknowledgement from `id` in every half that knows it.
    ///
    /// A failure in the second half does not roll back a vote already
    /// recorded in the first; votes only accumulate toward commit, so the
    /// asymmetry cannot un-commit anything.
    pub fn add_vote(&mut self, id: u64) -> Result<()> {
        let mut voted = false;
        if self.outgoing.contains(id) {
            self.outgoing.add_vote(id)?;
            voted = true;
        }
        if self.incoming.contains(id) {
            self.incoming.add_vote(id)?;
            voted = true;
        }
        if voted {
            Ok(())
        } else {
            Err(Error::UnknownPeer(id))
        }
    }

    /// Whether both halves have reached their majority.
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.incoming.is_committed() && self.outgoing.is_committed()
    }

    /// Check if an id is a voter in either half.
    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        self.incoming.contains(id) || self.outgoing.contains(id)
    }
}
