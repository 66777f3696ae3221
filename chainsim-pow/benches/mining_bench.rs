//! Mining and validation benchmarks

use chainsim_pow::{ProofOfWorkBlock, ProofOfWorkChain, SignedTransaction, TransactionSigner};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn sample_transactions() -> Vec<SignedTransaction> {
    (1..=10)
        .map(|i| SignedTransaction::new("Alice", "Bob", i as f64).unwrap())
        .collect()
}

fn benchmark_mining(c: &mut Criterion) {
    let template = ProofOfWorkBlock::new(1, "0".repeat(64), 1.0, sample_transactions());

    c.bench_function("mine_difficulty_2", |b| {
        b.iter(|| {
            let mut block = template.clone();
            block.mine(black_box(2));
            black_box(block);
        })
    });

    c.bench_function("compute_hash", |b| {
        b.iter(|| black_box(template.compute_hash()))
    });
}

fn benchmark_validation(c: &mut Criterion) {
    let mut chain = ProofOfWorkChain::new(1).unwrap();
    for tx in sample_transactions() {
        chain.submit(tx).unwrap();
        chain.seal_block().unwrap();
    }

    c.bench_function("validate_chain_11_blocks", |b| {
        b.iter(|| black_box(ProofOfWorkChain::is_valid(black_box(chain.blocks()), 1)))
    });
}

fn benchmark_signing(c: &mut Criterion) {
    let signer = TransactionSigner::generate();
    let tx = SignedTransaction::new("Alice", "Bob", 10.0).unwrap();
    let signature = tx.sign(&signer).unwrap();

    c.bench_function("sign_transaction", |b| {
        b.iter(|| black_box(tx.sign(black_box(&signer)).unwrap()))
    });

    c.bench_function("verify_transaction", |b| {
        b.iter(|| {
            black_box(SignedTransaction::verify(
                black_box(&tx),
                black_box(&signature),
                &signer.public_key(),
            ))
        })
    });
}

criterion_group!(benches, benchmark_mining, benchmark_validation, benchmark_signing);
criterion_main!(benches);
