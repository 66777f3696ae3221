//! A single replica: command log, key/value state and status flags

use crate::{Command, CommandValue};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Result of applying one command to a replica's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The key was set
    Applied,
    /// The command lacked a key or a value; state unchanged
    Rejected,
}

/// One participant of the replicated state machine
#[derive(Debug, Clone)]
pub struct ReplicaNode {
    id: usize,
    log: Vec<Command>,
    state: BTreeMap<String, CommandValue>,
    is_leader: bool,
    is_active: bool,
    /// Committed log positions already reflected in `state`
    applied: usize,
}

impl ReplicaNode {
    /// A fresh active follower with an empty log and state
    pub fn new(id: usize) -> Self {
        Self {
            id,
            log: Vec::new(),
            state: BTreeMap::new(),
            is_leader: false,
            is_active: true,
            applied: 0,
        }
    }

    pub(crate) fn restore(
        id: usize,
        log: Vec<Command>,
        state: BTreeMap<String, CommandValue>,
        is_leader: bool,
        is_active: bool,
    ) -> Self {
        let applied = log.len();
        Self {
            id,
            log,
            state,
            is_leader,
            is_active,
            applied,
        }
    }

    /// Record a proposed command without applying it
    pub fn append(&mut self, command: Command) {
        self.log.push(command);
    }

    /// Set `state[key] = value` for a well-formed command.
    ///
    /// Only the network's commit procedure calls this.
    pub(crate) fn apply(&mut self, command: &Command) -> ApplyOutcome {
        match (&command.value, command.key.is_empty()) {
            (Some(value), false) => {
                debug!("[Node {}] state updated: {}", self.id, command);
                self.state.insert(command.key.clone(), value.clone());
                ApplyOutcome::Applied
            }
            _ => {
                warn!("[Node {}] rejected malformed command {}", self.id, command);
                ApplyOutcome::Rejected
            }
        }
    }

    /// Apply the part of `committed` this replica has not applied yet.
    ///
    /// A shrunken committed prefix rewinds the applied index to its length.
    /// Returns the number of commands processed.
    pub(crate) fn apply_committed(&mut self, committed: &[Command]) -> usize {
        if self.applied > committed.len() {
            self.applied = committed.len();
        }

        if let Some(legacy_start) = self.legacy_index_mismatch(committed.len()) {
            warn!(
                "[Node {}] applied index {} differs from state size {}",
                self.id, self.applied, legacy_start
            );
        }

        let pending = &committed[self.applied..];
        for command in pending {
            self.apply(command);
        }
        self.applied = committed.len();
        pending.len()
    }

    /// The state-size index, when it would start applying somewhere other
    /// than the applied counter within a committed prefix of `committed_len`
    fn legacy_index_mismatch(&self, committed_len: usize) -> Option<usize> {
        let legacy_start = self.state.len();
        (legacy_start != self.applied && legacy_start <= committed_len).then_some(legacy_start)
    }

    pub(crate) fn truncate_log(&mut self, len: usize) {
        self.log.truncate(len);
    }

    pub(crate) fn install_state(&mut self, state: BTreeMap<String, CommandValue>) {
        self.state = state;
    }

    pub(crate) fn set_leader(&mut self, is_leader: bool) {
        self.is_leader = is_leader;
    }

    pub(crate) fn activate(&mut self) {
        self.is_active = true;
    }

    pub(crate) fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn log(&self) -> &[Command] {
        &self.log
    }

    pub fn state(&self) -> &BTreeMap<String, CommandValue> {
        &self.state
    }

    /// Look up one key of the replica state
    pub fn get(&self, key: &str) -> Option<&CommandValue> {
        self.state.get(key)
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn applied(&self) -> usize {
        self.applied
    }
}
