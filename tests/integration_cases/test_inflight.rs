// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use std::time::Duration;

use rafted::{default_logger, Inflight, Membership, ProposalResult};

use crate::test_util::propose;

fn deliver_committed(inflight: &Inflight) -> usize {
    let committed = inflight.get_committed();
    let count = committed.len();
    for entry in committed {
        let index = entry.request.entry.index;
        let term = entry.request.entry.term;
        entry
            .request
            .result_sink
            .deliver(ProposalResult::Committed { index, term });
    }
    count
}

#[test]
fn test_commit_flow_delivers_results() {
    let conf = Membership::new(vec![1, 2, 3]);
    let inflight = Inflight::new(&conf, &default_logger());

    let mut receivers = Vec::new();
    for index in 1..=3 {
        let (request, rx) = propose(index, 2, &conf);
        inflight.add(request).unwrap();
        receivers.push(rx);
    }

    // Peers 1 and 2 replicate through index 2: entries 1 and 2 commit,
    // entry 3 stays pending.
    assert!(!inflight.replicate(1, 2).unwrap());
    assert!(inflight.replicate(2, 2).unwrap());
    assert_eq!(deliver_committed(&inflight), 2);

    for (i, rx) in receivers.iter().take(2).enumerate() {
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(100)),
            Some(ProposalResult::Committed {
                index: i as u64 + 1,
                term: 2,
            })
        );
    }
    // The third client sees nothing yet; it would time out and retry.
    assert_eq!(receivers[2].recv_timeout(Duration::from_millis(10)), None);

    // A second peer reaches index 3 and completes the quorum.
    assert!(!inflight.replicate(3, 3).unwrap());
    assert!(inflight.replicate(1, 3).unwrap());
    assert_eq!(deliver_committed(&inflight), 1);
    assert_eq!(
        receivers[2].recv_timeout(Duration::from_millis(100)),
        Some(ProposalResult::Committed { index: 3, term: 2 })
    );
}

#[test]
fn test_joint_entry_requires_both_majorities() {
    // Cluster moving from {1,2,3} to {3,4,5}.
    let joint = Membership::old_new(vec![1, 2, 3], vec![3, 4, 5]);
    let inflight = Inflight::new(&joint, &default_logger());
    let (request, rx) = propose(1, 5, &joint);
    inflight.add(request).unwrap();

    // The old majority alone must not commit.
    assert!(!inflight.replicate(1, 1).unwrap());
    assert!(!inflight.replicate(2, 1).unwrap());
    assert_eq!(rx.try_recv(), None);

    // One acknowledgement from the new set is still short of its majority.
    assert!(!inflight.replicate(4, 1).unwrap());
    // The second completes it.
    assert!(inflight.replicate(5, 1).unwrap());
    assert_eq!(deliver_committed(&inflight), 1);
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(100)),
        Some(ProposalResult::Committed { index: 1, term: 5 })
    );
}

#[test]
fn test_membership_change_extends_tracking() {
    let old = Membership::new(vec![1, 2, 3]);
    let joint = Membership::old_new(vec![1, 2, 3], vec![3, 4, 5]);
    let inflight = Inflight::new(&old, &default_logger());

    // One plain entry under the old configuration, then the joint entry.
    let (request, _rx1) = propose(1, 1, &old);
    inflight.add(request).unwrap();
    let (request, _rx2) = propose(2, 1, &joint);
    inflight.add(request).unwrap();
    inflight.change_member(&joint);
    assert_eq!(inflight.match_index(4), Some(0));
    assert_eq!(inflight.match_index(5), Some(0));

    // The old-config entry still commits by the old majority alone; the
    // joint entry stays pending.
    assert!(!inflight.replicate(1, 2).unwrap());
    assert!(inflight.replicate(2, 2).unwrap());
    assert_eq!(inflight.get_committed().len(), 1);
    assert_eq!(inflight.pending_count(), 1);

    // The joint entry additionally needs a majority of the new set.
    assert!(!inflight.replicate(4, 2).unwrap());
    assert!(inflight.replicate(5, 2).unwrap());
    assert_eq!(inflight.get_committed().len(), 1);
}
