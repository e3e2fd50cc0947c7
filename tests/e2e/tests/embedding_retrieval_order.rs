//! Scenario: embedding-ranked STM recall returns the closest turn first,
//! not just the most recent one.

use memoria_core::stm::Role;
use memoria_e2e_tests::harness::TestHarness;

fn unit(dim: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[axis] = 1.0;
    v
}

#[tokio::test]
async fn embedding_retrieval_order() {
    let mut harness = TestHarness::new();
    harness.config.stm_max = 10;
    let harness = harness.build();
    let stm = harness.orchestrator.stm();

    for (i, label) in ["e1", "e2", "e3", "e4", "e5"].iter().enumerate() {
        stm.add(Role::User, label.to_string(), Some(unit(5, i)), None, vec![]);
    }

    let ranked = stm.get_recent(5, Some(&unit(5, 2)));
    assert_eq!(ranked[0].turn.content, "e3");
    assert!(ranked[0].similarity > 0.99);
}
