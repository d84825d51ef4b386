use crate::helpers::{init_tracing, seeded_store, subscribers, RecordingEmailClient};
use backend::batch_notifier::{run_campaign, send_test_email, Batching, NotifierError};
use secrecy::Secret;
use std::time::{Duration, Instant};
use waitlist::adapters::{InMemoryWaitlistStore, ResendEmailClient};
use waitlist::domain::{WaitlistEmail, WaitlistStore};
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn batching(size: usize) -> Batching {
    Batching {
        size,
        delay: Duration::from_millis(0),
    }
}

#[tokio::test]
async fn campaign_emails_everyone_oldest_first() {
    // Arrange
    init_tracing();
    let emails = subscribers(4);
    let store = seeded_store(&emails).await;
    let email_client = RecordingEmailClient::default();

    // Act
    let report = run_campaign(&email_client, &store, batching(1)).await.unwrap();

    // Assert
    assert_eq!(report.total, 4);
    assert_eq!(report.sent, 4);
    assert_eq!(report.failed, 0);
    assert!(report.errors.is_empty());
    assert_eq!(email_client.recipients(), emails);
}

#[tokio::test]
async fn campaign_runs_one_batch_per_batch_size_chunk() {
    init_tracing();
    let email_client = RecordingEmailClient::default();

    for (subscriber_count, batch_size, expected_batches) in
        [(25, 10, 3), (20, 10, 2), (1, 10, 1), (7, 1, 7), (3, 5, 1)]
    {
        // Arrange
        let store = seeded_store(&subscribers(subscriber_count)).await;

        // Act
        let report = run_campaign(&email_client, &store, batching(batch_size))
            .await
            .unwrap();

        // Assert
        assert_eq!(
            report.batches, expected_batches,
            "{} subscribers in batches of {}",
            subscriber_count, batch_size
        );
        assert_eq!(report.sent + report.failed, report.total);
    }
}

#[tokio::test]
async fn sends_within_a_batch_run_concurrently() {
    // Arrange
    init_tracing();
    let store = seeded_store(&subscribers(7)).await;
    let email_client = RecordingEmailClient::default();

    // Act
    run_campaign(&email_client, &store, batching(3)).await.unwrap();

    // Assert
    assert_eq!(email_client.max_in_flight(), 3);
}

#[tokio::test]
async fn campaign_pauses_between_batches_but_not_after_the_last() {
    // Arrange
    init_tracing();
    let store = seeded_store(&subscribers(3)).await;
    let email_client = RecordingEmailClient::default();
    let batching = Batching {
        size: 1,
        delay: Duration::from_millis(100),
    };

    // Act
    let started = Instant::now();
    let report = run_campaign(&email_client, &store, batching).await.unwrap();
    let elapsed = started.elapsed();

    // Assert
    assert_eq!(report.batches, 3);
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(500));
}

#[tokio::test]
async fn failed_recipients_are_reported_and_the_campaign_continues() {
    // Arrange
    init_tracing();
    let emails = subscribers(5);
    let store = seeded_store(&emails).await;
    let email_client = RecordingEmailClient::failing_for(&["subscriber1@example.com"]);

    // Act
    let report = run_campaign(&email_client, &store, batching(2)).await.unwrap();

    // Assert
    assert_eq!(report.total, 5);
    assert_eq!(report.sent, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].recipient, "subscriber1@example.com");
    assert!(report.errors[0].error_detail.as_ref().unwrap().contains("550"));
    assert_eq!(email_client.recipients().len(), 5);
}

#[tokio::test]
async fn empty_waitlist_completes_with_a_zero_report() {
    // Arrange
    init_tracing();
    let store = InMemoryWaitlistStore::new();
    let email_client = RecordingEmailClient::default();

    // Act
    let report = run_campaign(&email_client, &store, batching(10)).await.unwrap();

    // Assert
    assert_eq!(report.total, 0);
    assert_eq!(report.sent, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(report.batches, 0);
    assert!(email_client.recipients().is_empty());
}

#[tokio::test]
async fn batch_size_of_zero_is_rejected() {
    // Arrange
    init_tracing();
    let store = seeded_store(&subscribers(2)).await;
    let email_client = RecordingEmailClient::default();

    // Act
    let outcome = run_campaign(&email_client, &store, batching(0)).await;

    // Assert
    assert!(matches!(outcome, Err(NotifierError::InvalidBatchSize)));
    assert!(email_client.recipients().is_empty());
}

#[tokio::test]
async fn test_mode_sends_exactly_one_email_and_leaves_the_waitlist_alone() {
    // Arrange
    init_tracing();
    let store = seeded_store(&subscribers(3)).await;
    let email_client = RecordingEmailClient::default();

    // Act
    let result = send_test_email(&email_client, "operator@example.com".to_string())
        .await
        .unwrap();

    // Assert
    assert!(result.success);
    assert_eq!(email_client.recipients(), vec!["operator@example.com"]);
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_mode_rejects_an_invalid_address() {
    // Arrange
    init_tracing();
    let email_client = RecordingEmailClient::default();

    // Act
    let outcome = send_test_email(&email_client, "not-an-email".to_string()).await;

    // Assert
    assert!(matches!(outcome, Err(NotifierError::InvalidTestRecipient(_))));
    assert!(email_client.recipients().is_empty());
}

#[tokio::test]
async fn test_mode_reports_a_provider_failure_without_failing() {
    // Arrange
    init_tracing();
    let email_server = MockServer::start().await;
    let email_client = ResendEmailClient::new(
        email_server.uri(),
        WaitlistEmail::parse("noreply@pushtopost.dev".to_string()).unwrap(),
        "PushToPost Team".to_string(),
        Secret::new("re_test".to_string()),
        Duration::from_millis(500),
    )
    .unwrap();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(403).set_body_string("domain not verified"))
        .expect(1)
        .mount(&email_server)
        .await;

    // Act
    let outcome = send_test_email(&email_client, "operator@example.com".to_string()).await;

    // Assert
    let result = outcome.unwrap();
    assert!(!result.success);
    assert!(result.error_detail.unwrap().contains("403"));
}

#[tokio::test]
async fn campaign_drives_the_http_provider() {
    // Arrange
    init_tracing();
    let email_server = MockServer::start().await;
    let email_client = ResendEmailClient::new(
        email_server.uri(),
        WaitlistEmail::parse("noreply@pushtopost.dev".to_string()).unwrap(),
        "PushToPost Team".to_string(),
        Secret::new("re_test".to_string()),
        Duration::from_millis(500),
    )
    .unwrap();
    let store = seeded_store(&subscribers(5)).await;

    Mock::given(path("/emails"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "re-1"})))
        .expect(5)
        .mount(&email_server)
        .await;

    // Act
    let report = run_campaign(&email_client, &store, batching(2)).await.unwrap();

    // Assert
    assert_eq!(report.sent, 5);
    assert_eq!(report.batches, 3);
}
