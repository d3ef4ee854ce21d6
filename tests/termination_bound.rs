//! Randomized runs: whatever the evaluator says, the loop stops within the
//! configured number of rewrites.

mod common;

use common::{Builder, CountingRewriter, ScriptedEvaluator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use adaptive_rag::graph::Termination;
use adaptive_rag::rag::DocumentType;

#[tokio::test]
async fn iteration_count_never_exceeds_cap() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0003);

    for _ in 0..200 {
        let max_iterations: u32 = rng.random_range(0..=5);
        let scores: Vec<f32> = (0..8).map(|_| rng.random_range(0.0..1.0)).collect();

        let orchestrator = Builder::with_texts(&[
            ("Solar module datasheet", DocumentType::Technical),
            ("Feed-in tariff policy", DocumentType::Policy),
        ])
        .await
        .evaluator(ScriptedEvaluator::new(&scores))
        .rewriter(CountingRewriter::default())
        .max_iterations(max_iterations)
        .build();

        let result = orchestrator.run("solar tariff", None).await.unwrap();
        assert!(result.iterations_used <= max_iterations);

        let first_relevant = scores.iter().position(|s| *s >= 0.75);
        match first_relevant {
            Some(pass) if pass as u32 <= max_iterations => {
                assert_eq!(result.termination, Termination::Relevant);
                assert_eq!(result.iterations_used, pass as u32);
            }
            _ => {
                assert_eq!(result.termination, Termination::IterationCap);
                assert_eq!(result.iterations_used, max_iterations);
                assert!(result.low_confidence);
            }
        }
    }
}
