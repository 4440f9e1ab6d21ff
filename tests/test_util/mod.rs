// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use rafted::{result_channel, Entry, InflightRequest, Membership, ResultReceiver};

/// Builds a proposal for an empty-payload entry, returning the request and
/// the client's half of the result channel.
pub fn propose(index: u64, term: u64, conf: &Membership) -> (InflightRequest, ResultReceiver) {
    let (tx, rx) = result_channel();
    let request = InflightRequest::new(Entry::new(index, term, conf.clone()), tx);
    (request, rx)
}
