// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

/*!

The commit-tracking core of a Raft consensus node: the leader-side inflight
ledger that decides when replicated entries are committed, and the
follower-side state machine that walks a node through a joint-consensus
membership change.

## Tracking proposals to commit

A leader appends an entry to its local log, registers it with the
[`Inflight`] tracker, and dispatches AppendEntries RPCs to its peers. Each
acknowledgement feeds back into [`Inflight::replicate`], which advances the
entry's commit condition; once a majority (or, during a membership change,
majorities of both the old and the new voter sets) has acknowledged, the
entry is promoted and surfaces through [`Inflight::get_committed`] for the
apply loop to consume. Every request carries a one-shot result channel
through which the proposer learns its outcome.

```rust
use rafted::{default_logger, result_channel, Entry, Inflight, InflightRequest};
use rafted::{Membership, ProposalResult};
use std::time::Duration;

let conf = Membership::new(vec![1, 2, 3]);
let inflight = Inflight::new(&conf, &default_logger());

// Propose an entry. The client keeps the receiving half.
let (tx, rx) = result_channel();
inflight
    .add(InflightRequest::new(Entry::new(1, 1, conf.clone()), tx))
    .unwrap();

// Peer 1 acknowledges: one vote, no quorum yet.
assert!(!inflight.replicate(1, 1).unwrap());
// Peer 2 completes the majority.
assert!(inflight.replicate(2, 1).unwrap());

// The apply loop drains the committed entries and answers the clients.
for entry in inflight.get_committed() {
    let index = entry.request.entry.index;
    let term = entry.request.entry.term;
    entry
        .request
        .result_sink
        .deliver(ProposalResult::Committed { index, term });
}
assert_eq!(
    rx.recv_timeout(Duration::from_millis(100)),
    Some(ProposalResult::Committed { index: 1, term: 1 })
);
```

## Membership changes

A membership change replaces the voter set `{old}` with `{new}` through a
transitional joint configuration `{old, new}` that requires overlapping
quorums. Entries governed by the joint configuration build a
[`CommitCondition`] over both sets, so the tracker commits them only when
each half reaches its own majority.

On followers, [`MemberChange`] mirrors the phases as a small hierarchical
state machine driven by the configuration entries the node observes:

```text
Follower -> OldNewConfigSeen -> OldNewConfigCommitted -> NewConfigSeen -> Follower
```

Each transition is guarded; a configuration entry arriving in the wrong
phase is a protocol violation, never a silent repair. When the new
configuration's entry commits, the settled single-configuration membership
is pushed to the node's [`ConfigManager`](storage::ConfigManager) and the
change is complete.

*/

#![deny(missing_docs)]
#![recursion_limit = "128"]

#[macro_use]
extern crate getset;
#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate slog;

mod errors;
mod inflight;
mod member_change;
mod quorum;
pub mod storage;
mod types;
pub mod util;

pub use self::errors::{Error, Result, StorageError};
pub use self::inflight::{
    result_channel, Inflight, InflightEntry, InflightRequest, ProposalResult, ResultReceiver,
    ResultSender,
};
pub use self::member_change::{MemberChange, MemberChangeEvent, MemberChangeStatus, StateId};
pub use self::quorum::{CommitCondition, JointCondition, MajorityCondition};
pub use self::storage::{ConfigManager, Log, MemConfigManager, MemLog};
pub use self::types::{Entry, Membership};
pub use self::util::majority;

/// The default logger we fall back to when passed `None` in external facing
/// constructors and in tests.
#[cfg(any(test, feature = "default-logger"))]
pub fn default_logger() -> slog::Logger {
    use slog::Drain;
    use std::sync::Mutex;

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build();
    let drain = slog_envlogger::new(drain);
    let logger = slog::Logger::root(Mutex::new(drain).fuse(), o!());
    if let Some(case) = std::thread::current()
        .name()
        .and_then(|v| v.split(':').last())
    {
        logger.new(o!("case" => case.to_string()))
    } else {
        logger.new(o!())
    }
}

type DefaultHashBuilder = std::hash::BuildHasherDefault<fxhash::FxHasher>;
type HashMap<K, V> = std::collections::HashMap<K, V, DefaultHashBuilder>;
type HashSet<K> = std::collections::HashSet<K, DefaultHashBuilder>;
