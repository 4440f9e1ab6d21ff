// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

//! The follower-side membership-change state machine.
//!
//! A membership change runs through joint consensus: the cluster first
//! commits the transitional old-new configuration, then commits the new
//! configuration, and only then drops the old voter set. The state machine
//! here walks a follower through those phases in lockstep with the
//! configuration entries it observes in its log, so the follower can never
//! skip the joint phase or settle on the new voter set early.
//!
//! States form a small hierarchy. The three phase states defer events they
//! do not handle to the inert `MemberChange` parent, which defers to the
//! base `Follower`; events nobody handles are dropped there. Dispatch walks
//! the parent chain explicitly rather than through virtual calls.

use slog::Logger;

use crate::errors::{Error, Result};
use crate::storage::{ConfigManager, Log};
use crate::types::{Entry, Membership};

/// Events that drive the membership-change state machine.
#[derive(Clone, Debug)]
pub enum MemberChangeEvent {
    /// A configuration-bearing entry has been appended to the local log,
    /// not necessarily committed yet.
    LogEntryAppend {
        /// The configuration the entry introduces.
        conf: Membership,
    },
    /// A configuration-bearing entry has become committed.
    LogEntryCommit {
        /// The committed entry.
        entry: Entry,
    },
    /// The leader has announced the next phase of the membership change.
    NextStep {
        /// The phase-two configuration, carrying only the target voter set.
        conf: Membership,
    },
}

/// The membership-change phase the local node believes it is in.
///
/// Mutated only by the state machine while it handles an event on its
/// dispatch thread; read elsewhere through [`MemberChange::status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberChangeStatus {
    /// No membership change is underway.
    NotInMemberChange,
    /// The transitional old-new configuration is in the log.
    OldNewConfigSeen,
    /// The transitional configuration is committed.
    OldNewConfigCommitted,
    /// The new configuration is in the log.
    NewConfigSeen,
}

/// State tags of the follower sub-hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateId {
    /// The base follower state; the root of this sub-hierarchy.
    Follower,
    /// Inert parent of the three phase states. Handles nothing itself.
    MemberChange,
    /// A joint configuration entry is in the log, awaiting commit.
    OldNewConfigSeen,
    /// The joint configuration entry is committed.
    OldNewConfigCommitted,
    /// The new configuration entry is in the log, awaiting commit.
    NewConfigSeen,
}

impl StateId {
    /// The parent of this state in the hierarchy, `None` at the root.
    pub fn parent(self) -> Option<StateId> {
        match self {
            StateId::Follower => None,
            StateId::MemberChange => Some(StateId::Follower),
            StateId::OldNewConfigSeen
            | StateId::OldNewConfigCommitted
            | StateId::NewConfigSeen => Some(StateId::MemberChange),
        }
    }
}

enum Outcome {
    Handled,
    Defer,
}

/// The follower-side membership-change state machine.
///
/// Owns handles to the local log and configuration registry; the in-memory
/// implementations are internally shared, so a cloned handle can be given to
/// the machine while the rest of the node keeps its own.
pub struct MemberChange<L: Log, C: ConfigManager> {
    state: StateId,
    status: MemberChangeStatus,
    log: L,
    config_manager: C,
    logger: Logger,
}

impl<L: Log, C: ConfigManager> MemberChange<L, C> {
    /// Creates the machine in the base follower state.
    pub fn new(log: L, config_manager: C, logger: &Logger) -> MemberChange<L, C> {
        MemberChange {
            state: StateId::Follower,
            status: MemberChangeStatus::NotInMemberChange,
            log,
            config_manager,
            logger: logger.clone(),
        }
    }

    /// The current state tag.
    #[inline]
    pub fn state(&self) -> StateId {
        self.state
    }

    /// The current membership-change status.
    #[inline]
    pub fn status(&self) -> MemberChangeStatus {
        self.status
    }

    /// A reference to the log handle.
    #[inline]
    pub fn log(&self) -> &L {
        &self.log
    }

    /// A reference to the configuration-registry handle.
    #[inline]
    pub fn config_manager(&self) -> &C {
        &self.config_manager
    }

    /// Dispatches one event.
    ///
    /// The event is offered to the current state first; states that do not
    /// handle it defer up the parent chain. An event nobody handles is
    /// dropped. Guard failures surface as [`Error::ProtocolViolation`] and
    /// leave the machine unchanged.
    pub fn handle(&mut self, event: &MemberChangeEvent) -> Result<()> {
        let mut state = self.state;
        loop {
            let outcome = match state {
                StateId::OldNewConfigSeen => self.handle_old_new_seen(event)?,
                StateId::OldNewConfigCommitted => self.handle_old_new_committed(event)?,
                StateId::NewConfigSeen => self.handle_new_seen(event)?,
                StateId::MemberChange => Outcome::Defer,
                StateId::Follower => self.handle_follower(event)?,
            };
            match outcome {
                Outcome::Handled => return Ok(()),
                Outcome::Defer => match state.parent() {
                    Some(parent) => state = parent,
                    None => {
                        debug!(self.logger, "event dropped";
                            "state" => ?self.state, "event" => ?event);
                        return Ok(());
                    }
                },
            }
        }
    }

    fn handle_follower(&mut self, event: &MemberChangeEvent) -> Result<Outcome> {
        match event {
            MemberChangeEvent::LogEntryAppend { conf } if conf.is_old_new() => {
                if self.status != MemberChangeStatus::NotInMemberChange {
                    return Err(Error::ProtocolViolation(format!(
                        "old-new config appended while already in member change, status {:?}",
                        self.status
                    )));
                }
                self.status = MemberChangeStatus::OldNewConfigSeen;
                self.transition(StateId::OldNewConfigSeen);
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Defer),
        }
    }

    fn handle_old_new_seen(&mut self, event: &MemberChangeEvent) -> Result<Outcome> {
        match event {
            MemberChangeEvent::LogEntryCommit { entry } => {
                if !entry.conf.is_old_new() {
                    return Err(Error::ProtocolViolation(format!(
                        "expected old-new config entry at commit, got {:?}",
                        entry.conf
                    )));
                }
                if self.status != MemberChangeStatus::OldNewConfigSeen {
                    return Err(Error::ProtocolViolation(format!(
                        "old-new config committed in status {:?}",
                        self.status
                    )));
                }
                self.status = MemberChangeStatus::OldNewConfigCommitted;
                self.transition(StateId::OldNewConfigCommitted);
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Defer),
        }
    }

    fn handle_old_new_committed(&mut self, event: &MemberChangeEvent) -> Result<Outcome> {
        match event {
            MemberChangeEvent::NextStep { conf } => {
                if !conf.is_new() {
                    return Err(Error::ProtocolViolation(format!(
                        "next member-change step needs a new config, got {:?}",
                        conf
                    )));
                }
                if self.status != MemberChangeStatus::OldNewConfigCommitted {
                    return Err(Error::ProtocolViolation(format!(
                        "member-change next step in status {:?}",
                        self.status
                    )));
                }
                let last_index = self.log.last_index()?;
                self.config_manager
                    .push_config(last_index + 1, conf.clone())?;
                self.status = MemberChangeStatus::NewConfigSeen;
                self.transition(StateId::NewConfigSeen);
                Ok(Outcome::Handled)
            }
            MemberChangeEvent::LogEntryAppend { conf } if conf.is_new() => {
                // The status deliberately stays at OldNewConfigCommitted
                // until the entry commits; the commit guard checks the
                // pre-transition value.
                self.transition(StateId::NewConfigSeen);
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Defer),
        }
    }

    fn handle_new_seen(&mut self, event: &MemberChangeEvent) -> Result<Outcome> {
        match event {
            MemberChangeEvent::LogEntryCommit { entry } => {
                if !entry.conf.is_new() {
                    return Err(Error::ProtocolViolation(format!(
                        "expected new config entry at commit, got {:?}",
                        entry.conf
                    )));
                }
                if self.status != MemberChangeStatus::OldNewConfigCommitted
                    && self.status != MemberChangeStatus::NewConfigSeen
                {
                    return Err(Error::ProtocolViolation(format!(
                        "new config committed in status {:?}",
                        self.status
                    )));
                }
                let settled = match entry.conf.settled() {
                    Some(settled) => settled,
                    None => {
                        return Err(Error::ProtocolViolation(
                            "new config entry carries no target voter set".to_owned(),
                        ));
                    }
                };
                let last_index = self.log.last_index()?;
                self.config_manager.push_config(last_index + 1, settled)?;
                self.status = MemberChangeStatus::NotInMemberChange;
                self.transition(StateId::Follower);
                Ok(Outcome::Handled)
            }
            _ => Ok(Outcome::Defer),
        }
    }

    fn transition(&mut self, to: StateId) {
        debug!(self.logger, "state transition"; "from" => ?self.state, "to" => ?to);
        self.state = to;
    }
}
