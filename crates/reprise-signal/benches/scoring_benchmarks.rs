//! Benchmarks for the similarity scoring hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reprise_core::types::Embedding;
use reprise_signal::{ContextSimilarityScorer, ExchangeView};

fn synthetic_embedding(seed: u64, dims: usize) -> Embedding {
    // Cheap deterministic pseudo-random vector.
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut data = Vec::with_capacity(dims);
    for _ in 0..dims {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        data.push(((state >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0);
    }
    Embedding::new(data)
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let a = synthetic_embedding(1, 384);
    let b = synthetic_embedding(2, 384);
    c.bench_function("cosine_similarity_384", |bench| {
        bench.iter(|| black_box(&a).cosine_similarity(black_box(&b)))
    });
}

fn bench_window_scoring(c: &mut Criterion) {
    let query = synthetic_embedding(0, 384);
    let stored: Vec<(Embedding, Embedding)> = (1..=5)
        .map(|i| (synthetic_embedding(i, 384), synthetic_embedding(i + 100, 384)))
        .collect();
    let views: Vec<ExchangeView> = stored
        .iter()
        .map(|(user, response)| ExchangeView {
            user_message: "top artists by sales",
            assistant_response: "AC/DC leads with 1000 sales",
            user_embedding: Some(user),
            response_embedding: Some(response),
        })
        .collect();
    let scorer = ContextSimilarityScorer::new(5, 0.3);

    c.bench_function("score_embedding_window_5", |bench| {
        bench.iter(|| scorer.score_embedding(black_box(&query), black_box(&views)))
    });
    c.bench_function("score_lexical_window_5", |bench| {
        bench.iter(|| scorer.score_lexical(black_box("best selling artists"), black_box(&views)))
    });
}

criterion_group!(benches, bench_cosine_similarity, bench_window_scoring);
criterion_main!(benches);
