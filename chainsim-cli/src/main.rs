//! chainsim command-line driver
//!
//! Runs the proof-of-work, replicated-log and proof-of-stake simulators
//! in-process and prints what happened.

use anyhow::{Context, Result};
use chainsim_core::{ActionHistory, SimConfig};
use chainsim_pos::ProofOfStakeChain;
use chainsim_pow::{ProofOfWorkBlock, ProofOfWorkChain, SignedTransaction, TransactionSigner};
use chainsim_smr::{Command, ReplicatedLogNetwork, RoundOutcome, SnapshotStore};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Consensus simulator
#[derive(Parser)]
#[command(name = "chainsim")]
#[command(about = "Proof-of-work, replicated log and proof-of-stake simulators")]
#[command(version = chainsim_core::CHAINSIM_VERSION)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a transfer on one node, mine it and sync a second node
    Pow {
        #[arg(long, default_value = "Alice")]
        sender: String,
        #[arg(long, default_value = "Bob")]
        recipient: String,
        #[arg(long, default_value_t = 10.0)]
        amount: f64,
        /// Most blocks to mine; mining stops once the pool is empty
        #[arg(long, default_value_t = 1)]
        blocks: u64,
    },

    /// Drive the replicated key/value network
    Smr {
        /// Commands to replicate, one round each
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Node ids to partition before the rounds
        #[arg(long, value_delimiter = ',')]
        partition: Vec<usize>,
        /// Node ids to recover after the rounds
        #[arg(long, value_delimiter = ',')]
        recover: Vec<usize>,
        /// Followers to add before the rounds
        #[arg(long, default_value_t = 0)]
        add_nodes: usize,
        /// Start from the saved snapshot
        #[arg(long)]
        load: bool,
        /// Save a snapshot afterwards
        #[arg(long)]
        save: bool,
    },

    /// Produce stake-weighted blocks and measure attacker influence
    Pos {
        #[arg(long, default_value_t = 10)]
        blocks: u64,
        #[arg(long, default_value = "Attacker")]
        attacker: String,
        /// Selection rounds for the attack simulation
        #[arg(long)]
        simulate: Option<u64>,
        /// Consecutive blocks the attacker forges before normal production
        #[arg(long, default_value_t = 0)]
        forge: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(SimConfig::default_config_path);
    let config = load_or_init_config(&config_path)?;

    let mut history = ActionHistory::new();

    match cli.command {
        Commands::Pow {
            sender,
            recipient,
            amount,
            blocks,
        } => handle_pow(&config, &mut history, sender, recipient, amount, blocks)?,
        Commands::Smr {
            set,
            partition,
            recover,
            add_nodes,
            load,
            save,
        } => handle_smr(
            &config,
            &mut history,
            &set,
            &partition,
            &recover,
            add_nodes,
            load,
            save,
        )?,
        Commands::Pos {
            blocks,
            attacker,
            simulate,
            forge,
        } => handle_pos(&config, &mut history, blocks, &attacker, simulate, forge)?,
    }

    if config.history.enabled {
        history
            .save_to_file(&config.history.path)
            .with_context(|| format!("writing history to {}", config.history.path.display()))?;
        info!(
            "Saved {} actions to {}",
            history.len(),
            config.history.path.display()
        );
    }

    Ok(())
}

fn load_or_init_config(path: &Path) -> Result<SimConfig> {
    if path.exists() {
        let config = SimConfig::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        return Ok(config);
    }

    let config = SimConfig::default();
    match config.save_to_file(path) {
        Ok(()) => info!("Wrote default configuration to {}", path.display()),
        Err(e) => warn!("Could not write default configuration: {}", e),
    }
    Ok(config)
}

fn handle_pow(
    config: &SimConfig,
    history: &mut ActionHistory,
    sender: String,
    recipient: String,
    amount: f64,
    blocks: u64,
) -> Result<()> {
    let mut node_a = ProofOfWorkChain::from_config(&config.pow)?;
    let mut node_b = ProofOfWorkChain::from_config(&config.pow)?;

    let signer = TransactionSigner::generate();
    let transaction = SignedTransaction::new(sender, recipient, amount)?;
    let signature = transaction.sign(&signer)?;
    println!("Signed {} -> {} ({})", transaction.sender, transaction.recipient, amount);
    println!("  Public key: {}", hex::encode(signer.public_key().as_bytes()));
    println!("  Signature: {}", hex::encode(&signature));

    node_a.submit_signed(transaction, &signature, &signer.public_key())?;
    history.record(format!("Submitted signed transaction of {}", amount));

    for block in mine_pending(&mut node_a, blocks)? {
        println!(
            "Mined block {} (nonce {}, {} transactions): {}",
            block.index,
            block.nonce,
            block.transactions.len(),
            block.hash
        );
        history.record(format!("Mined block {}", block.index));
    }

    let replaced = node_b.sync_from(&node_a);
    history.record(format!("Node B sync, replaced: {}", replaced));

    for (name, node) in [("A", &node_a), ("B", &node_b)] {
        println!(
            "\nNode {} chain ({} blocks, valid: {})",
            name,
            node.len(),
            node.is_valid_chain()
        );
        for block in node.blocks() {
            println!(
                "  #{} prev {} hash {}",
                block.index, block.previous_hash, block.hash
            );
        }
    }

    Ok(())
}

/// Seal up to `max_blocks` blocks, refusing to mine an empty pool
fn mine_pending(chain: &mut ProofOfWorkChain, max_blocks: u64) -> Result<Vec<ProofOfWorkBlock>> {
    let mut mined = Vec::new();
    for _ in 0..max_blocks {
        if chain.pending().is_empty() {
            warn!(
                "No pending transactions, stopping after {} of {} blocks",
                mined.len(),
                max_blocks
            );
            break;
        }
        mined.push(chain.seal_block()?);
    }
    Ok(mined)
}

#[allow(clippy::too_many_arguments)]
fn handle_smr(
    config: &SimConfig,
    history: &mut ActionHistory,
    set: &[String],
    partition: &[usize],
    recover: &[usize],
    add_nodes: usize,
    load: bool,
    save: bool,
) -> Result<()> {
    let store = SnapshotStore::new(&config.smr.snapshot_path);

    let loaded = if load { store.load()? } else { None };
    let mut network = match loaded {
        Some(record) => ReplicatedLogNetwork::from_record(record)?,
        None => ReplicatedLogNetwork::new(config.smr.nodes)?,
    };

    for _ in 0..add_nodes {
        let id = network.add_node();
        history.record(format!("Added node {}", id));
    }

    if !partition.is_empty() {
        network.partition(partition)?;
        history.record(format!("Partitioned nodes {:?}", partition));
    }

    for raw in set {
        let command = Command::parse(raw)?;
        match network.run_round(command) {
            RoundOutcome::Advanced { leader, commit } => {
                println!(
                    "Round {}: leader {}, committed {}, applied {}",
                    raw, leader, commit.committed, commit.applied
                );
                history.record(format!("Consensus round for {}", raw));
            }
            RoundOutcome::Failed { reason } => {
                println!("Round {} failed: {}", raw, reason);
                history.record(format!("Failed round for {}: {}", raw, reason));
            }
        }
    }

    for &id in recover {
        network.recover(id)?;
        history.record(format!("Recovered node {}", id));
    }

    println!("\nNetwork ({} of {} active):", network.active_count(), network.len());
    for node in network.nodes() {
        let state = node
            .state()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  Node {}{}{}: log {} | {{{}}}",
            node.id(),
            if node.is_leader() { " (leader)" } else { "" },
            if node.is_active() { "" } else { " [partitioned]" },
            node.log().len(),
            state
        );
    }

    if save {
        store.save(&network.to_record())?;
        println!("\nSnapshot saved to {}", store.path().display());
        history.record("Saved network snapshot");
    }

    Ok(())
}

fn handle_pos(
    config: &SimConfig,
    history: &mut ActionHistory,
    blocks: u64,
    attacker: &str,
    simulate: Option<u64>,
    forge: u32,
) -> Result<()> {
    let mut chain = ProofOfStakeChain::from_config(&config.pos)?;

    for _ in 0..forge {
        let record = chain.produce_block_as(attacker)?;
        history.record(format!("{} forged block {}", attacker, chain.len()));
        println!("Forged block {} by {}", chain.len(), record.validator_name);
    }

    for _ in 0..blocks {
        let record = chain.produce_block()?;
        println!(
            "Block {} by {} (balance {:.2})",
            chain.len(),
            record.validator_name,
            record.balance
        );
    }
    history.record(format!("Produced {} blocks", blocks));

    for event in chain.slash_events() {
        println!(
            "Slashed {} by {:.2} at height {}",
            event.validator_name, event.penalty, event.height
        );
    }

    println!("\nValidators:");
    for stats in chain.validator_stats() {
        println!(
            "  {:<10} weight {:>8.2} blocks {:>3} balance {:>8.2} deposit {:>6.2}{}",
            stats.name,
            stats.weight,
            stats.blocks,
            stats.balance,
            stats.deposit,
            if stats.slashed { " [slashed]" } else { "" }
        );
    }

    if let Some(rounds) = simulate {
        let report = chain.simulate(attacker, rounds)?;
        history.record(format!("Simulated {} rounds for {}", rounds, attacker));
        println!(
            "\nAttack simulation: {} of {} rounds to {} ({:.1}%), {} honest",
            report.attacker_blocks,
            report.rounds,
            report.attacker,
            report.attacker_share() * 100.0,
            report.honest_blocks
        );
        if report.attacker_controls_network() {
            println!("{} controls the network", report.attacker);
        } else {
            println!("Honest validators keep the majority");
        }
    }

    Ok(())
}
