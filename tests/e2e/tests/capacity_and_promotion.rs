//! Scenario: STM eviction and STM->MTM promotional boundaries stay exact
//! across a run that crosses both.

use memoria_core::stm::Role;
use memoria_e2e_tests::harness::TestHarness;

#[tokio::test]
async fn capacity_and_promotion() {
    let mut harness = TestHarness::new();
    harness.config.stm_max = 3;
    harness.config.summarize_every = 3;
    let harness = harness.build();
    let orch = &harness.orchestrator;

    for i in 1..=6 {
        orch.add_message(Role::User, &format!("T{i}")).await.unwrap();
    }

    let recent = orch.stm().get_recent(10, None);
    let contents: Vec<_> = recent.iter().map(|s| s.turn.content.clone()).collect();
    assert_eq!(contents, vec!["T4", "T5", "T6"]);

    assert_eq!(orch.mtm().len(), 2);
    let chunks = orch.mtm().get_recent_chunks(2);
    assert_eq!(chunks[0].source_turn_ids.len(), 3);
    assert_eq!(chunks[1].source_turn_ids.len(), 3);
    assert!(chunks[0].summary.contains("T1"));
    assert!(chunks[1].summary.contains("T6"));
}
