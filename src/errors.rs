// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::{cmp, error, result};

quick_error! {
    /// The base error type for the crate.
    #[derive(Debug)]
    pub enum Error {
        /// An entry was offered to the inflight tracker with an index that
        /// does not advance the log.
        NonMonotonicIndex(index: u64, max_index: u64) {
            display("log index {} is not greater than the accepted maximum {}", index, max_index)
        }
        /// The peer is not a member of the configuration in question.
        UnknownPeer(id: u64) {
            display("peer {} is not in the cluster", id)
        }
        /// A replication report did not advance the peer's match index.
        InvalidMatchIndex(peer: u64, index: u64, matched: u64) {
            display("invalid match index {} for peer {}, not greater than {}", index, peer, matched)
        }
        /// The peer has already voted on this entry.
        DuplicateVote(id: u64) {
            display("peer {} has already voted", id)
        }
        /// A batch operation was invoked with nothing in it.
        EmptyBatch {
            display("no inflight entry to add")
        }
        /// The member-change state machine received an event that its
        /// current phase forbids.
        ProtocolViolation(desc: String) {
            display("protocol violation: {}", desc)
        }
        /// A storage error occurred.
        Store(err: StorageError) {
            from()
            cause(err)
            display("storage error: {}", err)
        }
    }
}

impl cmp::PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        match (self, other) {
            (&Error::NonMonotonicIndex(i1, m1), &Error::NonMonotonicIndex(i2, m2)) => {
                i1 == i2 && m1 == m2
            }
            (&Error::UnknownPeer(id1), &Error::UnknownPeer(id2)) => id1 == id2,
            (&Error::InvalidMatchIndex(p1, i1, m1), &Error::InvalidMatchIndex(p2, i2, m2)) => {
                p1 == p2 && i1 == i2 && m1 == m2
            }
            (&Error::DuplicateVote(id1), &Error::DuplicateVote(id2)) => id1 == id2,
            (&Error::EmptyBatch, &Error::EmptyBatch) => true,
            (&Error::ProtocolViolation(ref d1), &Error::ProtocolViolation(ref d2)) => d1 == d2,
            (&Error::Store(ref e1), &Error::Store(ref e2)) => e1 == e2,
            _ => false,
        }
    }
}

quick_error! {
    /// An error with the storage.
    #[derive(Debug)]
    pub enum StorageError {
        /// The requested entry is not available.
        Unavailable {
            display("log entry unavailable")
        }
        /// Some other error occurred.
        Other(err: Box<dyn error::Error + Sync + Send>) {
            from()
            cause(err.as_ref())
            display("unknown error {:?}", err)
        }
    }
}

impl cmp::PartialEq for StorageError {
    fn eq(&self, other: &StorageError) -> bool {
        matches!(
            (self, other),
            (&StorageError::Unavailable, &StorageError::Unavailable)
        )
    }
}

/// A result type that wraps up the errors of this crate.
pub type Result<T> = result::Result<T, Error>;
