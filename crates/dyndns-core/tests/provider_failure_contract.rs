//! Contract Test: Provider Failures
//!
//! Constraints verified:
//! - Read failures become ProviderError and never lead to a write
//! - Write rejections become ProviderError
//! - Provider calls are bounded by the configured timeout
//! - Nothing is retried inside the reconciler
//! - Provider detail never reaches the response body
//!
//! If this test fails, infrastructure faults leak or hang requests.

mod common;

use common::*;
use dyndns_core::{ReconciliationResult, StatusMapping, UpdateResponse};
use dyndns_core::response::{OPAQUE_FAILURE_MESSAGE, ReturnStatus};
use std::time::Duration;

#[tokio::test]
async fn read_failure_is_reported_without_writing() {
    let provider = MockDnsProvider::new().failing_list("AccessDenied: not authorized");
    let reconciler = reconciler_for(&provider);

    let result = reconciler.reconcile(&signed_request("203.0.113.5")).await;

    match result {
        ReconciliationResult::ProviderError { ref detail } => {
            assert!(detail.contains("AccessDenied"), "detail was {:?}", detail);
        }
        ref other => panic!("expected ProviderError, got {:?}", other),
    }
    assert_eq!(provider.list_call_count(), 1, "no retry on read failure");
    assert_eq!(provider.change_call_count(), 0);
}

#[tokio::test]
async fn write_rejection_is_reported() {
    let provider = MockDnsProvider::new().failing_change("InvalidChangeBatch");
    let reconciler = reconciler_for(&provider);

    let result = reconciler.reconcile(&signed_request("203.0.113.5")).await;

    match result {
        ReconciliationResult::ProviderError { detail } => {
            // Non-provider errors are attributed to the provider that raised them
            assert!(detail.contains("mock"), "detail was {:?}", detail);
            assert!(detail.contains("InvalidChangeBatch"));
        }
        other => panic!("expected ProviderError, got {:?}", other),
    }
    assert_eq!(provider.change_call_count(), 1, "no retry on write failure");
}

#[tokio::test(start_paused = true)]
async fn slow_provider_times_out() {
    let provider = MockDnsProvider::new().with_latency(Duration::from_secs(60));
    let mut config = minimal_config();
    config.reconciler.provider_timeout_secs = 5;
    let reconciler = dyndns_core::Reconciler::new(
        config,
        Box::new(MockDnsProvider::sharing_counters_with(&provider)),
    )
    .expect("reconciler construction succeeds");

    let result = reconciler.reconcile(&signed_request("203.0.113.5")).await;

    match result {
        ReconciliationResult::ProviderError { detail } => {
            assert!(detail.contains("Timed out"), "detail was {:?}", detail);
        }
        other => panic!("expected ProviderError, got {:?}", other),
    }
    assert_eq!(provider.change_call_count(), 0);
}

#[tokio::test]
async fn provider_detail_stays_out_of_the_response() {
    let provider = MockDnsProvider::new().failing_list("SignatureDoesNotMatch for AKIDEXAMPLE");
    let reconciler = reconciler_for(&provider);

    let result = reconciler.reconcile(&signed_request("203.0.113.5")).await;

    for mapping in [StatusMapping::Strict, StatusMapping::Legacy] {
        let response = UpdateResponse::from_result(&result, mapping);
        assert_eq!(response.body.return_status, ReturnStatus::InternalError);
        assert_eq!(response.body.return_message, OPAQUE_FAILURE_MESSAGE);
        assert!(!response.body_json().contains("AKIDEXAMPLE"));
    }
}

#[tokio::test]
async fn end_to_end_response_for_update() {
    let provider = MockDnsProvider::new().with_a_record(HOSTNAME, &["198.51.100.1"]);
    let reconciler = reconciler_for(&provider);

    let result = reconciler.reconcile(&signed_request("203.0.113.5")).await;
    let response = UpdateResponse::from_result(&result, reconciler.config().status_mapping);

    assert_eq!(response.status, 200);
    assert_eq!(response.body.return_status, ReturnStatus::Success);
    assert_eq!(
        response.body.return_message,
        "Updated DNS A record for home.example.com. to 203.0.113.5"
    );
    tokio_test::assert_ok!(serde_json::from_str::<serde_json::Value>(&response.body_json()));
}
