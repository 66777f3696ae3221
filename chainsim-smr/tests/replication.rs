//! Integration tests for the replicated-log network

use chainsim_smr::*;
use proptest::prelude::*;

#[test]
fn test_five_node_round_scenario() {
    let mut network = ReplicatedLogNetwork::new(5).unwrap();

    let outcome = network.run_round(Command::new("x", 1));
    assert!(outcome.is_advanced());

    for node in network.nodes().iter().filter(|n| n.is_active()) {
        assert_eq!(node.get("x"), Some(&CommandValue::Integer(1)));
    }
    // The leader never appends to its own log via broadcast
    assert!(network.node(0).unwrap().log().is_empty());
}

#[test]
fn test_partition_and_recover_installs_leader_state() {
    let mut network = ReplicatedLogNetwork::new(5).unwrap();
    network.run_round(Command::new("x", 1));

    network.partition(&[3]).unwrap();
    network.run_round(Command::new("y", 2));
    network.run_round(Command::new("z", "three"));

    let lagging = network.node(3).unwrap();
    assert!(lagging.get("y").is_none());
    assert_eq!(lagging.log().len(), 1);

    network.recover(3).unwrap();

    let recovered = network.node(3).unwrap();
    assert!(recovered.is_active());
    assert_eq!(recovered.state(), network.leader().state());
    // Only the state snapshot is installed; the log still lags
    assert_eq!(recovered.log().len(), 1);
}

#[test]
fn test_leader_partition_then_rounds_continue() {
    let mut network = ReplicatedLogNetwork::new(4).unwrap();
    network.run_round(Command::new("a", 1));

    network.partition(&[0]).unwrap();
    let outcome = network.run_round(Command::new("b", 2));
    assert!(matches!(outcome, RoundOutcome::Advanced { leader: 1, .. }));

    for id in 1..4 {
        assert_eq!(
            network.node(id).unwrap().get("b"),
            Some(&CommandValue::Integer(2))
        );
    }
    assert_eq!(
        network.nodes().iter().filter(|n| n.is_leader() && n.is_active()).count(),
        1
    );
}

#[test]
fn test_added_node_joins_later_rounds() {
    let mut network = ReplicatedLogNetwork::new(3).unwrap();
    network.run_round(Command::new("a", 1));

    let id = network.add_node();
    assert_eq!(id, 3);

    // The newcomer's empty log disagrees with the others at position 0,
    // so this round commits nothing and every log is cut back to empty
    let outcome = network.run_round(Command::new("b", 2));
    assert!(matches!(
        outcome,
        RoundOutcome::Advanced {
            commit: CommitOutcome { committed: 0, .. },
            ..
        }
    ));

    // From here on every follower log starts out identical
    network.run_round(Command::new("c", 3));
    for node in network.nodes() {
        assert_eq!(node.get("c"), Some(&CommandValue::Integer(3)));
    }
}

#[test]
fn test_saved_network_reloads() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let store = SnapshotStore::new(temp_dir.path().join("blockchain_data.json"));

    let mut network = ReplicatedLogNetwork::new(5).unwrap();
    network.run_round(Command::new("x", 1));
    network.partition(&[4]).unwrap();
    store.save(&network.to_record()).unwrap();

    let record = store.load().unwrap().expect("snapshot present");
    let mut reloaded = ReplicatedLogNetwork::from_record(record).unwrap();

    assert_eq!(reloaded.active_count(), 4);
    reloaded.run_round(Command::new("y", 2));
    assert_eq!(
        reloaded.node(1).unwrap().get("y"),
        Some(&CommandValue::Integer(2))
    );
}

fn command_strategy() -> impl Strategy<Value = Command> {
    ("[a-e]", any::<i64>()).prop_map(|(key, value)| Command::new(key, value))
}

proptest! {
    /// With every node active, identical broadcasts leave identical state everywhere
    #[test]
    fn prop_all_active_nodes_converge(
        nodes in 1usize..7,
        commands in prop::collection::vec(command_strategy(), 1..12),
    ) {
        let mut network = ReplicatedLogNetwork::new(nodes).unwrap();
        for command in commands {
            let outcome = network.run_round(command);
            prop_assert!(outcome.is_advanced());
        }

        let leader_state = network.leader().state().clone();
        for node in network.nodes() {
            prop_assert_eq!(node.state(), &leader_state);
        }
    }

    /// Recovery always installs the leader's state at recovery time
    #[test]
    fn prop_recovered_state_equals_leader(
        before in prop::collection::vec(command_strategy(), 0..5),
        during in prop::collection::vec(command_strategy(), 0..5),
        victim in 1usize..5,
    ) {
        let mut network = ReplicatedLogNetwork::new(5).unwrap();
        for command in before {
            network.run_round(command);
        }
        network.partition(&[victim]).unwrap();
        for command in during {
            network.run_round(command);
        }

        network.recover(victim).unwrap();
        let recovered = network.node(victim).unwrap().state().clone();
        prop_assert_eq!(&recovered, network.leader().state());
    }
}
