// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use crate::errors::{Error, Result};
use crate::util::majority;
use crate::HashSet;

/// A set of voters that decides one entry by majority.
///
/// Each voter may acknowledge the entry at most once; the condition is met
/// when a strict majority of the voter set has acknowledged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MajorityCondition {
    voters: HashSet<u64>,
    votes: HashSet<u64>,
}

impl MajorityCondition {
    /// Creates a condition over the given voters.
    pub fn new(voters: HashSet<u64>) -> MajorityCondition {
        MajorityCondition {
            voters,
            votes: HashSet::default(),
        }
    }

    /// Check if an id is a voter.
    #[inline]
    pub fn contains(&self, id: u64) -> bool {
        self.voters.contains(&id)
    }

    /// Records an acknowledgement from `id`.
    pub fn add_vote(&mut self, id: u64) -> Result<()> {
        if !self.voters.contains(&id) {
            return Err(Error::UnknownPeer(id));
        }
        if !self.votes.insert(id) {
            return Err(Error::DuplicateVote(id));
        }
        Ok(())
    }

    /// Whether a majority of the voters has acknowledged.
    pub fn is_committed(&self) -> bool {
        if self.voters.is_empty() {
            // An empty voter set is trivially satisfied. This plays well with
            // joint conditions which, when one half is empty, should behave
            // like the other half.
            return true;
        }
        self.votes.len() >= majority(self.voters.len())
    }

    /// The number of acknowledgements recorded so far.
    #[inline]
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}
