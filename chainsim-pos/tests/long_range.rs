//! Integration tests for stake-weighted production and slashing

use chainsim_core::{PosConfig, SimConfig, ValidatorSpec};
use chainsim_pos::constants::MIN_WEIGHT;
use chainsim_pos::*;
use proptest::prelude::*;
use rand::rngs::mock::StepRng;

fn default_validators() -> Vec<Validator> {
    PosConfig::default()
        .validators
        .iter()
        .map(|spec| {
            let mut validator = Validator::new(spec.name.clone(), spec.balance);
            validator.stake(spec.stake).unwrap();
            validator
        })
        .collect()
}

#[test]
fn test_heaviest_validator_is_caught_on_third_block() {
    // Every draw lands at the top of the range, which the Attacker
    // (listed last) owns while it is unslashed
    let mut chain = ProofOfStakeChain::with_rng(default_validators(), StepRng::new(u64::MAX, 0));

    for _ in 0..3 {
        let record = chain.produce_block().unwrap();
        assert_eq!(record.validator_name, "Attacker");
    }

    assert_eq!(chain.slash_events().len(), 1);
    let event = &chain.slash_events()[0];
    assert_eq!(event.validator_name, "Attacker");
    assert_eq!(event.height, 3);
    assert_eq!(event.penalty, 37.5);

    let attacker = chain.validator("Attacker").unwrap();
    assert!(attacker.is_slashed());
    assert_eq!(attacker.weight(), 0.0);
    assert_eq!(attacker.deposit(), 12.5);
    // 250 after staking, 3 rewards, half the penalty refunded
    assert_eq!(attacker.balance(), 271.75);

    // Selection moves on to the last unslashed validator
    let record = chain.produce_block().unwrap();
    assert_eq!(record.validator_name, "Node4");
    assert_eq!(chain.slash_events().len(), 1);
}

#[test]
fn test_forced_attack_with_default_set() {
    let config = PosConfig {
        seed: Some(11),
        ..PosConfig::default()
    };
    let mut chain = ProofOfStakeChain::from_config(&config).unwrap();

    chain.produce_block_as("Attacker").unwrap();
    chain.produce_block_as("Attacker").unwrap();
    chain.produce_block_as("Attacker").unwrap();

    let stats = chain
        .validator_stats()
        .into_iter()
        .find(|s| s.name == "Attacker")
        .unwrap();
    assert!(stats.slashed);
    assert_eq!(stats.blocks, 3);
    assert_eq!(stats.deposit, 12.5);

    for _ in 0..8 {
        let record = chain.produce_block().unwrap();
        assert_ne!(record.validator_name, "Attacker");
    }
}

#[test]
fn test_simulation_favours_heavy_stake() {
    let config = PosConfig {
        seed: Some(2024),
        ..PosConfig::default()
    };
    let mut chain = ProofOfStakeChain::from_config(&config).unwrap();

    let report = chain.simulate("Attacker", 2_000).unwrap();

    // Attacker holds 300 of 800 weight
    let share = report.attacker_share();
    assert!(share > 0.3 && share < 0.45, "share {}", share);
    assert!(!report.attacker_controls_network());
}

#[test]
fn test_huge_balances_report_overflow_instead_of_panicking() {
    let mut config = SimConfig::default();
    config.pos.validators = ["A", "B"]
        .iter()
        .map(|name| ValidatorSpec {
            name: name.to_string(),
            balance: f64::MAX,
            stake: 0.0,
        })
        .collect();
    config.validate().unwrap();

    let mut chain = ProofOfStakeChain::from_config(&config.pos).unwrap();

    assert!(matches!(
        chain.produce_block(),
        Err(PosError::WeightOverflow(_))
    ));
    assert!(chain.is_empty());
}

fn validator_set() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((1.0f64..1000.0, 0.0f64..1.0), 1..6)
}

proptest! {
    /// Weights respect the slashing rule after any production sequence
    #[test]
    fn prop_weights_and_slashing_invariants(
        set in validator_set(),
        seed in any::<u64>(),
        blocks in 0usize..40,
    ) {
        let validators: Vec<Validator> = set
            .iter()
            .enumerate()
            .map(|(i, (balance, ratio))| {
                let mut validator = Validator::new(format!("V{}", i), *balance);
                let stake = balance * ratio;
                if stake > 0.0 {
                    validator.stake(stake).unwrap();
                }
                validator
            })
            .collect();
        let mut chain = ProofOfStakeChain::with_seed(validators, seed);

        for _ in 0..blocks {
            match chain.produce_block() {
                Ok(_) => {}
                Err(PosError::NoActiveValidators) => break,
                Err(other) => prop_assert!(false, "unexpected error {}", other),
            }
        }

        for validator in chain.validators() {
            if validator.is_slashed() {
                prop_assert_eq!(validator.weight(), 0.0);
            } else {
                prop_assert!(validator.weight() >= MIN_WEIGHT);
            }
            prop_assert!(validator.deposit() >= 0.0);
        }

        // No block after a slash comes from the slashed validator
        for event in chain.slash_events() {
            let later = &chain.chain()[event.height..];
            prop_assert!(later.iter().all(|b| b.validator_name != event.validator_name));
        }
    }

    /// Selection never returns a slashed validator
    #[test]
    fn prop_selection_skips_slashed(
        set in validator_set(),
        slashed_mask in prop::collection::vec(any::<bool>(), 6),
        seed in any::<u64>(),
    ) {
        let validators: Vec<Validator> = set
            .iter()
            .enumerate()
            .map(|(i, (balance, _))| {
                let mut validator = Validator::new(format!("V{}", i), *balance);
                if slashed_mask[i] {
                    validator.slash(0.0);
                }
                validator
            })
            .collect();
        let any_unslashed = validators.iter().any(|v| !v.is_slashed());
        let mut chain = ProofOfStakeChain::with_seed(validators, seed);

        for _ in 0..10 {
            match chain.select_validator() {
                Ok(selected) => prop_assert!(!selected.is_slashed()),
                Err(err) => {
                    prop_assert!(!any_unslashed);
                    prop_assert!(matches!(err, PosError::NoActiveValidators));
                }
            }
        }
    }
}
