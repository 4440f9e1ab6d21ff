// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::collections::VecDeque;
use std::mem;
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use slog::Logger;

use crate::errors::{Error, Result};
use crate::quorum::CommitCondition;
use crate::types::{Entry, Membership};
use crate::HashMap;

/// The outcome of one proposal, delivered exactly once through its result
/// sink.
#[derive(Clone, Debug, PartialEq)]
pub enum ProposalResult {
    /// The entry was replicated by a quorum and committed.
    Committed {
        /// Log position of the committed entry.
        index: u64,
        /// Term under which it committed.
        term: u64,
    },
    /// The proposal was abandoned before it could commit, e.g. because
    /// leadership was lost.
    Dropped,
}

/// The sending half of a proposal's one-shot result channel.
///
/// Delivery consumes the sender: each request receives exactly one outcome.
/// The channel is buffered for that one message, so delivery never blocks
/// even when the proposer has already given up and dropped its receiver.
#[derive(Debug)]
pub struct ResultSender {
    tx: Sender<ProposalResult>,
}

impl ResultSender {
    /// Delivers the outcome. Never blocks; an abandoned receiver is ignored.
    pub fn deliver(self, result: ProposalResult) {
        let _ = self.tx.try_send(result);
    }
}

/// The receiving half of a proposal's one-shot result channel.
#[derive(Debug)]
pub struct ResultReceiver {
    rx: Receiver<ProposalResult>,
}

impl ResultReceiver {
    /// Blocks until the outcome arrives or `timeout` elapses. `None` on
    /// timeout or when the sender was dropped without delivering.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProposalResult> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Returns the outcome if it has already been delivered.
    pub fn try_recv(&self) -> Option<ProposalResult> {
        self.rx.try_recv().ok()
    }
}

/// Creates the one-shot channel carried by an [`InflightRequest`].
pub fn result_channel() -> (ResultSender, ResultReceiver) {
    let (tx, rx) = bounded(1);
    (ResultSender { tx }, ResultReceiver { rx })
}

/// A proposed log entry paired with the channel its outcome is delivered
/// through.
#[derive(Debug)]
pub struct InflightRequest {
    /// The entry appended to the local log and dispatched for replication.
    pub entry: Entry,
    /// Where to deliver the single outcome event.
    pub result_sink: ResultSender,
}

impl InflightRequest {
    /// Pairs an entry with its result sink.
    pub fn new(entry: Entry, result_sink: ResultSender) -> InflightRequest {
        InflightRequest { entry, result_sink }
    }
}

/// One pending entry and the commit predicate it must satisfy.
#[derive(Debug, Getters)]
pub struct InflightEntry {
    /// The pending request.
    pub request: InflightRequest,
    /// The commit predicate, constructed from the configuration governing
    /// the entry.
    #[get = "pub"]
    condition: CommitCondition,
}

impl InflightEntry {
    /// Builds the entry, deriving the condition from the request's
    /// configuration snapshot.
    pub fn new(request: InflightRequest) -> InflightEntry {
        let condition = CommitCondition::new(&request.entry.conf);
        InflightEntry { request, condition }
    }

    #[inline]
    fn index(&self) -> u64 {
        self.request.entry.index
    }
}

struct InflightState {
    max_index: u64,
    to_commit: VecDeque<InflightEntry>,
    committed: Vec<InflightEntry>,
    match_indexes: HashMap<u64, u64>,
}

impl InflightState {
    fn rebuild_match_indexes(&mut self, conf: &Membership) {
        let mut match_indexes = HashMap::default();
        for id in conf.ids() {
            let matched = self.match_indexes.get(&id).cloned().unwrap_or(0);
            match_indexes.insert(id, matched);
        }
        self.match_indexes = match_indexes;
    }
}

/// The leader-side ledger of uncommitted and just-committed entries.
///
/// The tracker absorbs per-peer replication acknowledgements, advances each
/// pending entry's commit condition, and promotes a contiguous prefix of
/// entries to committed once their conditions are met. It is shared between
/// the proposal path and the replication completion path; every public
/// operation takes the single internal mutex for its whole body and never
/// blocks on anything else.
pub struct Inflight {
    state: Mutex<InflightState>,
    logger: Logger,
}

impl Inflight {
    /// Creates a tracker for the given membership. All match indexes start
    /// at 0.
    pub fn new(conf: &Membership, logger: &Logger) -> Inflight {
        let mut match_indexes = HashMap::default();
        for id in conf.ids() {
            match_indexes.insert(id, 0);
        }
        Inflight {
            state: Mutex::new(InflightState {
                max_index: 0,
                to_commit: VecDeque::new(),
                committed: Vec::new(),
                match_indexes,
            }),
            logger: logger.clone(),
        }
    }

    /// Resets the tracker for a fresh term of leadership: forgets all
    /// pending and committed entries and zeroes every match index while
    /// keeping the membership.
    pub fn init(&self) {
        let mut state = self.state.lock().unwrap();
        state.max_index = 0;
        state.to_commit.clear();
        state.committed.clear();
        for matched in state.match_indexes.values_mut() {
            *matched = 0;
        }
    }

    /// Rebuilds the match-index map to cover exactly the peers of `conf`.
    ///
    /// Peers that remain keep their match index, new peers start at 0,
    /// departed peers are dropped. Pending entries are untouched: each keeps
    /// the condition built from the configuration at its own log index.
    pub fn change_member(&self, conf: &Membership) {
        let mut state = self.state.lock().unwrap();
        state.rebuild_match_indexes(conf);
        debug!(self.logger, "rebuilt match indexes for new membership";
            "peers" => state.match_indexes.len());
    }

    /// Registers one entry awaiting replication. Its index must be strictly
    /// greater than every index accepted before.
    pub fn add(&self, request: InflightRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let index = request.entry.index;
        if index <= state.max_index {
            return Err(Error::NonMonotonicIndex(index, state.max_index));
        }
        state.max_index = index;
        state.to_commit.push_back(InflightEntry::new(request));
        Ok(())
    }

    /// Registers a batch of entries. The batch must be non-empty and
    /// strictly ascending, starting above every index accepted before.
    /// Either all entries are accepted or the tracker is left unchanged.
    pub fn add_all(&self, entries: Vec<InflightEntry>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if entries.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let mut last = state.max_index;
        for entry in &entries {
            if entry.index() <= last {
                return Err(Error::NonMonotonicIndex(entry.index(), last));
            }
            last = entry.index();
        }
        state.max_index = last;
        state.to_commit.extend(entries);
        Ok(())
    }

    /// Absorbs the acknowledgement that `peer` has replicated the log
    /// through `new_match_index`.
    ///
    /// Votes are cast for the entries the acknowledgement newly covers,
    /// `(old_match, new_match]`. A vote a condition refuses (the peer joined
    /// after the entry was created, or an overlapping report) is skipped;
    /// idempotent replication reports must not poison progress. The longest
    /// satisfied prefix of pending entries then moves to the committed
    /// queue; returns true iff that prefix is non-empty.
    pub fn replicate(&self, peer: u64, new_match_index: u64) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let matched = match state.match_indexes.get(&peer) {
            Some(matched) => *matched,
            None => return Err(Error::UnknownPeer(peer)),
        };
        if new_match_index <= matched {
            return Err(Error::InvalidMatchIndex(peer, new_match_index, matched));
        }

        for entry in state.to_commit.iter_mut() {
            let index = entry.request.entry.index;
            if index > new_match_index {
                break;
            }
            if index <= matched {
                continue;
            }
            if let Err(e) = entry.condition.add_vote(peer) {
                debug!(self.logger, "vote not counted";
                    "peer" => peer, "index" => index, "err" => %e);
            }
        }

        state.match_indexes.insert(peer, new_match_index);

        let mut promoted = 0;
        loop {
            let ready = match state.to_commit.front() {
                Some(entry) => {
                    entry.index() <= new_match_index && entry.condition.is_committed()
                }
                None => false,
            };
            if !ready {
                break;
            }
            if let Some(entry) = state.to_commit.pop_front() {
                state.committed.push(entry);
                promoted += 1;
            }
        }
        if promoted > 0 {
            debug!(self.logger, "entries reached quorum";
                "count" => promoted, "peer" => peer, "match_index" => new_match_index);
        }
        Ok(promoted > 0)
    }

    /// Drains and returns the entries committed since the previous drain,
    /// in commit order. The caller applies them and delivers each outcome
    /// through the entry's result sink.
    pub fn get_committed(&self) -> Vec<InflightEntry> {
        let mut state = self.state.lock().unwrap();
        mem::take(&mut state.committed)
    }

    /// The highest log index the tracker has accepted, or 0.
    pub fn max_index(&self) -> u64 {
        self.state.lock().unwrap().max_index
    }

    /// The match index recorded for `peer`, if it is a member.
    pub fn match_index(&self, peer: u64) -> Option<u64> {
        self.state.lock().unwrap().match_indexes.get(&peer).cloned()
    }

    /// The number of entries still awaiting their quorum.
    pub fn pending_count(&self) -> usize {
        self.state.lock().unwrap().to_commit.len()
    }

    /// The number of committed entries not yet drained.
    pub fn committed_count(&self) -> usize {
        self.state.lock().unwrap().committed.len()
    }
}
