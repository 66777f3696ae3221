//! Leader-based replication across a set of replicas

use crate::{Command, ReplicaNode, Result, SmrError};
use tracing::{debug, info, warn};

/// What a successful commit did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitOutcome {
    /// Length of the log prefix every active follower agrees on
    pub committed: usize,
    /// Commands newly applied, summed over all active replicas
    pub applied: usize,
}

/// Result of one consensus round
#[derive(Debug)]
pub enum RoundOutcome {
    /// The command was broadcast and a commit ran
    Advanced {
        /// Leader that drove the round
        leader: usize,
        commit: CommitOutcome,
    },
    /// The round stopped early; state after the failing step is unchanged
    Failed { reason: SmrError },
}

impl RoundOutcome {
    pub fn is_advanced(&self) -> bool {
        matches!(self, RoundOutcome::Advanced { .. })
    }
}

/// A set of replicas with one leader
#[derive(Debug, Clone)]
pub struct ReplicatedLogNetwork {
    pub(crate) nodes: Vec<ReplicaNode>,
    pub(crate) leader_index: usize,
}

impl ReplicatedLogNetwork {
    /// Create `nodes_count` replicas with node 0 as leader
    pub fn new(nodes_count: usize) -> Result<Self> {
        if nodes_count == 0 {
            return Err(SmrError::NoActiveNodes);
        }

        let mut nodes: Vec<ReplicaNode> = (0..nodes_count).map(ReplicaNode::new).collect();
        nodes[0].set_leader(true);
        info!("Created network of {} nodes, leader 0", nodes_count);

        Ok(Self {
            nodes,
            leader_index: 0,
        })
    }

    /// Append `command` to every active follower's log.
    ///
    /// The leader does not append to its own log.
    pub fn broadcast(&mut self, command: &Command) {
        for node in self.nodes.iter_mut() {
            if node.is_active() && !node.is_leader() {
                node.append(command.clone());
            }
        }
        debug!("Broadcast {} from leader {}", command, self.leader_index);
    }

    /// Commit the log prefix every active follower agrees on.
    ///
    /// Every active replica truncates its log to that prefix and applies the
    /// committed commands it has not applied yet, in order.
    pub fn commit(&mut self) -> Result<CommitOutcome> {
        if self.active_count() == 0 {
            return Err(SmrError::NoActiveNodes);
        }

        let quorum: Vec<&[Command]> = self
            .nodes
            .iter()
            .filter(|node| node.is_active() && !node.is_leader())
            .map(|node| node.log())
            .collect();

        let Some(reference) = quorum.first().copied() else {
            debug!("No active followers, nothing to commit");
            return Ok(CommitOutcome::default());
        };

        let shortest = quorum.iter().map(|log| log.len()).min().unwrap_or(0);
        let committed_len = (0..shortest)
            .take_while(|&i| quorum.iter().all(|log| log[i] == reference[i]))
            .count();
        let committed: Vec<Command> = reference[..committed_len].to_vec();

        let mut applied = 0;
        for node in self.nodes.iter_mut().filter(|node| node.is_active()) {
            node.truncate_log(committed_len);
            applied += node.apply_committed(&committed);
        }

        debug!("Committed prefix of {} commands, {} applies", committed_len, applied);
        Ok(CommitOutcome {
            committed: committed_len,
            applied,
        })
    }

    /// Change leader if needed, broadcast `command`, then commit.
    ///
    /// Failures are logged and returned as [`RoundOutcome::Failed`].
    pub fn run_round(&mut self, command: Command) -> RoundOutcome {
        match self.try_round(&command) {
            Ok(commit) => RoundOutcome::Advanced {
                leader: self.leader_index,
                commit,
            },
            Err(reason) => {
                warn!("Consensus round for {} failed: {}", command, reason);
                RoundOutcome::Failed { reason }
            }
        }
    }

    fn try_round(&mut self, command: &Command) -> Result<CommitOutcome> {
        command.validate()?;

        if !self.nodes[self.leader_index].is_active() {
            self.change_leader()?;
        }

        self.broadcast(command);
        self.commit()
    }

    /// Move leadership to the next active node, wrapping around
    pub fn change_leader(&mut self) -> Result<usize> {
        if self.active_count() == 0 {
            return Err(SmrError::NoActiveNodes);
        }

        let count = self.nodes.len();
        let mut next = (self.leader_index + 1) % count;
        while !self.nodes[next].is_active() {
            next = (next + 1) % count;
        }

        let old_leader = self.leader_index;
        self.nodes[old_leader].set_leader(false);
        self.leader_index = next;
        self.nodes[next].set_leader(true);

        info!(
            "Leader changed from node {} to node {}",
            self.nodes[old_leader].id(),
            self.nodes[next].id()
        );
        Ok(self.nodes[next].id())
    }

    /// Deactivate the listed nodes. Unknown ids fail before anything changes.
    pub fn partition(&mut self, node_ids: &[usize]) -> Result<()> {
        let positions = node_ids
            .iter()
            .map(|&id| self.position(id))
            .collect::<Result<Vec<_>>>()?;

        for position in positions {
            self.nodes[position].deactivate();
        }
        info!("Partitioned nodes {:?}", node_ids);
        Ok(())
    }

    /// Reactivate a node with a copy of the leader's current state.
    ///
    /// The node's log is kept as it was; it is not replayed.
    pub fn recover(&mut self, node_id: usize) -> Result<()> {
        let position = self.position(node_id)?;
        let snapshot = self.nodes[self.leader_index].state().clone();

        let node = &mut self.nodes[position];
        node.install_state(snapshot);
        node.activate();

        info!(
            "Recovered node {} from leader {} state",
            node_id, self.leader_index
        );
        Ok(())
    }

    /// Add an active, empty follower and return its id
    pub fn add_node(&mut self) -> usize {
        let id = self
            .nodes
            .iter()
            .map(|node| node.id() + 1)
            .max()
            .unwrap_or(0);
        self.nodes.push(ReplicaNode::new(id));
        info!("Added node {}", id);
        id
    }

    fn position(&self, node_id: usize) -> Result<usize> {
        self.nodes
            .iter()
            .position(|node| node.id() == node_id)
            .ok_or(SmrError::UnknownNode(node_id))
    }

    pub fn nodes(&self) -> &[ReplicaNode] {
        &self.nodes
    }

    pub fn node(&self, node_id: usize) -> Option<&ReplicaNode> {
        self.nodes.iter().find(|node| node.id() == node_id)
    }

    pub fn leader_index(&self) -> usize {
        self.leader_index
    }

    pub fn leader(&self) -> &ReplicaNode {
        &self.nodes[self.leader_index]
    }

    pub fn active_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommandValue;

    #[test]
    fn test_network_creation() {
        let network = ReplicatedLogNetwork::new(5).unwrap();
        assert_eq!(network.len(), 5);
        assert_eq!(network.leader_index(), 0);
        assert!(network.leader().is_leader());
        assert_eq!(network.nodes().iter().filter(|n| n.is_leader()).count(), 1);
        assert!(ReplicatedLogNetwork::new(0).is_err());
    }

    #[test]
    fn test_broadcast_skips_leader() {
        let mut network = ReplicatedLogNetwork::new(3).unwrap();
        network.broadcast(&Command::new("x", 1));

        assert!(network.nodes()[0].log().is_empty());
        assert_eq!(network.nodes()[1].log().len(), 1);
        assert_eq!(network.nodes()[2].log().len(), 1);
    }

    #[test]
    fn test_round_commits_everywhere() {
        let mut network = ReplicatedLogNetwork::new(5).unwrap();
        let outcome = network.run_round(Command::new("x", 1));

        match outcome {
            RoundOutcome::Advanced { leader, commit } => {
                assert_eq!(leader, 0);
                assert_eq!(commit.committed, 1);
                assert_eq!(commit.applied, 5);
            }
            RoundOutcome::Failed { reason } => panic!("round failed: {}", reason),
        }

        for node in network.nodes() {
            assert_eq!(node.get("x"), Some(&CommandValue::Integer(1)));
        }
        assert!(network.leader().log().is_empty());
    }

    #[test]
    fn test_commit_stops_at_disagreement() {
        let mut network = ReplicatedLogNetwork::new(3).unwrap();
        network.nodes[1].append(Command::new("a", 1));
        network.nodes[2].append(Command::new("a", 1));
        network.nodes[1].append(Command::new("b", 2));
        network.nodes[2].append(Command::new("b", 3));

        let outcome = network.commit().unwrap();

        assert_eq!(outcome.committed, 1);
        for node in network.nodes() {
            assert_eq!(node.get("a"), Some(&CommandValue::Integer(1)));
            assert!(node.get("b").is_none());
        }
        assert_eq!(network.nodes()[1].log().len(), 1);
    }

    #[test]
    fn test_malformed_command_rejected_at_boundary() {
        let mut network = ReplicatedLogNetwork::new(3).unwrap();
        let outcome = network.run_round(Command::new("", 1));

        assert!(matches!(
            outcome,
            RoundOutcome::Failed {
                reason: SmrError::InvalidCommand(_)
            }
        ));
        assert!(network.nodes().iter().all(|n| n.log().is_empty()));
    }

    #[test]
    fn test_change_leader_skips_inactive() {
        let mut network = ReplicatedLogNetwork::new(4).unwrap();
        network.partition(&[1, 2]).unwrap();

        assert_eq!(network.change_leader().unwrap(), 3);
        assert_eq!(network.leader_index(), 3);
        assert!(!network.nodes()[0].is_leader());
        assert_eq!(network.nodes().iter().filter(|n| n.is_leader()).count(), 1);

        // Wraps around to node 0
        assert_eq!(network.change_leader().unwrap(), 0);
    }

    #[test]
    fn test_no_active_nodes() {
        let mut network = ReplicatedLogNetwork::new(2).unwrap();
        network.partition(&[0, 1]).unwrap();

        assert!(matches!(network.change_leader(), Err(SmrError::NoActiveNodes)));
        assert!(matches!(network.commit(), Err(SmrError::NoActiveNodes)));
        assert!(matches!(
            network.run_round(Command::new("x", 1)),
            RoundOutcome::Failed {
                reason: SmrError::NoActiveNodes
            }
        ));
        assert_eq!(network.leader_index(), 0);
    }

    #[test]
    fn test_partition_unknown_node_changes_nothing() {
        let mut network = ReplicatedLogNetwork::new(3).unwrap();
        assert!(matches!(
            network.partition(&[1, 9]),
            Err(SmrError::UnknownNode(9))
        ));
        assert_eq!(network.active_count(), 3);
    }

    #[test]
    fn test_round_with_inactive_leader_elects_new_one() {
        let mut network = ReplicatedLogNetwork::new(3).unwrap();
        network.partition(&[0]).unwrap();

        let outcome = network.run_round(Command::new("k", "v"));

        assert!(matches!(outcome, RoundOutcome::Advanced { leader: 1, .. }));
        assert_eq!(network.leader_index(), 1);
        assert_eq!(
            network.nodes()[2].get("k"),
            Some(&CommandValue::Text("v".to_string()))
        );
        // The partitioned node saw nothing
        assert!(network.nodes()[0].state().is_empty());
    }

    #[test]
    fn test_add_node() {
        let mut network = ReplicatedLogNetwork::new(5).unwrap();
        let id = network.add_node();

        assert_eq!(id, 5);
        let node = network.node(5).unwrap();
        assert!(node.is_active());
        assert!(!node.is_leader());
        assert!(node.state().is_empty());
    }
}
