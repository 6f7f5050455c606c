//! Dispatcher Tests
//!
//! Validation, response shapes and strategy overrides at the request boundary.

use crate::common::*;

#[test]
fn unknown_resource_is_rejected_without_side_effects() {
    for kind in StrategyKind::ALL {
        let tally = open(kind, 0, 0);
        let store_before = tally.metrics().store;
        let cache_before = tally.metrics().cache;

        for raw in [0, 2, u64::MAX] {
            let response = tally.respond(raw);
            assert_eq!(response.status_code(), 400, "{} id={}", kind, raw);
            assert!(tally.increment(raw).unwrap_err().is_rejection());
        }

        assert_eq!(tally.metrics().store, store_before, "{}", kind);
        assert_eq!(tally.metrics().cache, cache_before, "{}", kind);
        assert_eq!(tally.metrics().coordination.requests, 0);
    }
}

#[test]
fn success_response_uses_wire_field_names() {
    let tally = open(StrategyKind::Atomic, 0, 0);
    let response = tally.respond(1);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "status": "success",
            "post_id": 1,
            "final_view_count_reported": 1
        })
    );
}

#[test]
fn rejected_response_json() {
    let tally = open(StrategyKind::Atomic, 0, 0);
    let json = serde_json::to_value(tally.respond(7)).unwrap();
    assert_eq!(json["status"], "rejected");
    assert!(json["error"].as_str().unwrap().contains("7"));
}

#[test]
fn explicit_strategy_overrides_configured_one() {
    let tally = open(StrategyKind::Naive, 0, 0);
    tally.increment_with(StrategyKind::WriteInvalidate, 1).unwrap();
    assert_eq!(tally.snapshot(1).unwrap().cached, None);
    tally.increment(1).unwrap();
    assert_eq!(tally.snapshot(1).unwrap().cached, Some(2));
}

#[test]
fn multiple_resources_are_independent() {
    let tally = Tally::builder()
        .resources([1, 2])
        .strategy(StrategyKind::ResourceLock)
        .delay_ms(0)
        .open()
        .unwrap();
    tally.increment(1).unwrap();
    tally.increment(2).unwrap();
    tally.increment(2).unwrap();
    assert_eq!(tally.snapshot(1).unwrap().durable, 1);
    assert_eq!(tally.snapshot(2).unwrap().durable, 2);
}

#[test]
fn config_file_opens_tally() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.toml");
    std::fs::write(
        &path,
        "resources = [4]\nseed = 9\n[cache]\nkey_prefix = \"article\"\n[strategy]\nkind = \"atomic\"\ndelay_ms = 0\n",
    )
    .unwrap();

    let tally = Tally::from_config_file(&path).unwrap();
    assert_eq!(tally.strategy(), StrategyKind::Atomic);
    assert_eq!(tally.increment(4).unwrap(), 10);
    let key = tallydb::CacheKey::new("article:4:view_count");
    assert_eq!(tally_core::Cache::get(tally.cache(), &key).unwrap(), Some(10));
}

#[test]
fn bad_config_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tally.toml");
    std::fs::write(&path, "[strategy]\nkind = 3\n").unwrap();
    assert!(matches!(Tally::from_config_file(&path), Err(Error::Config(_))));
}
