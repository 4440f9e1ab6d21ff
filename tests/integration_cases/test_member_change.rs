// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

use rafted::storage::{ConfigManager, Log};
use rafted::{
    default_logger, Entry, MemConfigManager, MemLog, MemberChange, MemberChangeEvent,
    MemberChangeStatus, Membership, StateId,
};

#[test]
fn test_three_phase_member_change() {
    let log = MemLog::new();
    let config_manager = MemConfigManager::with_config(Membership::new(vec![1, 2, 3]));
    let mut machine = MemberChange::new(log.clone(), config_manager.clone(), &default_logger());

    // Some normal traffic precedes the change.
    log.append(vec![Entry::new(1, 1, Membership::new(vec![1, 2, 3]))])
        .unwrap();

    // Phase one: the joint entry is appended, then commits.
    let joint = Membership::old_new(vec![1, 2, 3], vec![3, 4, 5]);
    let joint_entry = Entry::new(2, 1, joint.clone());
    log.append(vec![joint_entry.clone()]).unwrap();
    machine
        .handle(&MemberChangeEvent::LogEntryAppend {
            conf: joint.clone(),
        })
        .unwrap();
    assert_eq!(machine.status(), MemberChangeStatus::OldNewConfigSeen);

    machine
        .handle(&MemberChangeEvent::LogEntryCommit { entry: joint_entry })
        .unwrap();
    assert_eq!(machine.status(), MemberChangeStatus::OldNewConfigCommitted);

    // Phase two: the new-config entry is appended; the status lags behind
    // the state until the entry commits.
    let new_conf = Membership::incoming(vec![3, 4, 5]);
    let new_entry = Entry::new(3, 1, new_conf.clone());
    log.append(vec![new_entry.clone()]).unwrap();
    machine
        .handle(&MemberChangeEvent::LogEntryAppend {
            conf: new_conf.clone(),
        })
        .unwrap();
    assert_eq!(machine.state(), StateId::NewConfigSeen);
    assert_eq!(machine.status(), MemberChangeStatus::OldNewConfigCommitted);

    machine
        .handle(&MemberChangeEvent::LogEntryCommit { entry: new_entry })
        .unwrap();
    assert_eq!(machine.state(), StateId::Follower);
    assert_eq!(machine.status(), MemberChangeStatus::NotInMemberChange);

    // The registry settles on the new voter set after the last entry.
    assert_eq!(
        config_manager.config_at(3).unwrap(),
        Membership::new(vec![1, 2, 3])
    );
    assert_eq!(
        config_manager.config_at(4).unwrap(),
        Membership::new(vec![3, 4, 5])
    );
    assert_eq!(
        config_manager.last_config().unwrap(),
        Membership::new(vec![3, 4, 5])
    );
}

#[test]
fn test_next_step_drives_phase_two() {
    let log = MemLog::new();
    let config_manager = MemConfigManager::with_config(Membership::new(vec![1, 2, 3]));
    let mut machine = MemberChange::new(log.clone(), config_manager.clone(), &default_logger());

    let joint = Membership::old_new(vec![1, 2, 3], vec![3, 4, 5]);
    let joint_entry = Entry::new(1, 2, joint.clone());
    log.append(vec![joint_entry.clone()]).unwrap();
    machine
        .handle(&MemberChangeEvent::LogEntryAppend { conf: joint })
        .unwrap();
    machine
        .handle(&MemberChangeEvent::LogEntryCommit { entry: joint_entry })
        .unwrap();

    // The leader announces phase two; the target configuration is recorded
    // for the next log position.
    let new_conf = Membership::incoming(vec![3, 4, 5]);
    machine
        .handle(&MemberChangeEvent::NextStep {
            conf: new_conf.clone(),
        })
        .unwrap();
    assert_eq!(machine.status(), MemberChangeStatus::NewConfigSeen);
    assert_eq!(config_manager.last_config().unwrap(), new_conf);

    // The corresponding entry is appended and commits.
    let new_entry = Entry::new(2, 2, new_conf);
    log.append(vec![new_entry.clone()]).unwrap();
    machine
        .handle(&MemberChangeEvent::LogEntryCommit { entry: new_entry })
        .unwrap();
    assert_eq!(machine.status(), MemberChangeStatus::NotInMemberChange);
    assert_eq!(
        config_manager.last_config().unwrap(),
        Membership::new(vec![3, 4, 5])
    );
}
