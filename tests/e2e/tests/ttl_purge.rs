//! Scenario: a turn past its TTL is purged at the next read, regardless of
//! whether anything else has been inserted since.

use memoria_core::stm::Role;
use memoria_e2e_tests::harness::TestHarness;

#[tokio::test]
async fn ttl_purge() {
    let mut harness = TestHarness::new();
    harness.config.stm_ttl_seconds = 1;
    let harness = harness.build();
    let orch = &harness.orchestrator;

    orch.add_message(Role::User, "T1").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    orch.add_message(Role::User, "T2").await.unwrap();

    let recent = orch.stm().get_recent(5, None);
    let contents: Vec<_> = recent.iter().map(|s| s.turn.content.clone()).collect();
    assert_eq!(contents, vec!["T2"]);
}
