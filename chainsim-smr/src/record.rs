//! Structured network snapshots and their JSON file store

use crate::{Command, CommandValue, ReplicaNode, ReplicatedLogNetwork, Result, SmrError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Persisted form of one replica
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: usize,
    pub log: Vec<Command>,
    pub state: BTreeMap<String, CommandValue>,
    pub leader: bool,
    /// Records written without this flag load as active
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Persisted form of the whole network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub nodes: Vec<NodeRecord>,
    pub leader_index: usize,
}

impl ReplicatedLogNetwork {
    /// Snapshot every replica into a record
    pub fn to_record(&self) -> NetworkRecord {
        NetworkRecord {
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeRecord {
                    node_id: node.id(),
                    log: node.log().to_vec(),
                    state: node.state().clone(),
                    leader: node.is_leader(),
                    active: node.is_active(),
                })
                .collect(),
            leader_index: self.leader_index,
        }
    }

    /// Rebuild a network from a record.
    ///
    /// Leader flags are derived from `leader_index`; a record whose flags
    /// disagree is loaded with a warning.
    pub fn from_record(record: NetworkRecord) -> Result<Self> {
        if record.nodes.is_empty() {
            return Err(SmrError::InvalidRecord("no nodes".to_string()));
        }
        if record.leader_index >= record.nodes.len() {
            return Err(SmrError::InvalidRecord(format!(
                "leader index {} out of range for {} nodes",
                record.leader_index,
                record.nodes.len()
            )));
        }

        let leader_index = record.leader_index;
        let nodes = record
            .nodes
            .into_iter()
            .enumerate()
            .map(|(position, node)| {
                let is_leader = position == leader_index;
                if node.leader != is_leader {
                    warn!(
                        "Node {} leader flag {} disagrees with leader index {}",
                        node.node_id, node.leader, leader_index
                    );
                }
                ReplicaNode::restore(node.node_id, node.log, node.state, is_leader, node.active)
            })
            .collect();

        Ok(Self {
            nodes,
            leader_index,
        })
    }
}

/// JSON file holding one [`NetworkRecord`]
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record; `Ok(None)` when there is nothing to load
    pub fn load(&self) -> Result<Option<NetworkRecord>> {
        if !self.path.exists() {
            warn!("Network snapshot {} not found", self.path.display());
            return Ok(None);
        }

        let data = fs::read(&self.path)?;
        let record = serde_json::from_slice::<NetworkRecord>(&data)?;
        info!(
            "Loaded network of {} nodes from {}",
            record.nodes.len(),
            self.path.display()
        );
        Ok(Some(record))
    }

    /// Write the record through a temporary file and rename it into place
    pub fn save(&self, record: &NetworkRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(record)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &self.path)?;
        info!("Saved network snapshot to {}", self.path.display());
        Ok(())
    }
}
