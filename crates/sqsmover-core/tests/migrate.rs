mod common;

use std::collections::HashMap;

use common::{assert_unique, config, migrator, queues, DESTINATION, SOURCE};
use sqsmover::{AttributeValue, Message, MoveError, Stage, DEDUP_ID, GROUP_ID};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn moves_every_message_exactly_once() {
    const TOTAL: usize = 105; // not divisible by 10 or by the worker count
    let service = queues(TOTAL).await;

    let report = migrator(&service, config(0, 3))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap();

    let stats = service.stats().await;
    assert_eq!(report.moved, TOTAL);
    assert_eq!(report.workers, 3);
    assert_eq!(assert_unique(&stats.sent), TOTAL);
    assert_eq!(stats.sent.len(), stats.deleted.len());
    assert!(stats.receive_calls >= TOTAL.div_ceil(10));
    assert_eq!(service.depth(&service.url(SOURCE)).await, 0);
    assert_eq!(service.in_flight(&service.url(SOURCE)).await, 0);
    assert_eq!(service.depth(&service.url(DESTINATION)).await, TOTAL);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn limit_caps_the_messages_moved() {
    const TOTAL: usize = 20;
    const LIMIT: usize = 11;
    let service = queues(TOTAL).await;

    let report = migrator(&service, config(LIMIT, 3))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap();

    let stats = service.stats().await;
    assert_eq!(report.estimated, TOTAL);
    assert_eq!(report.budget, LIMIT);
    assert_eq!(report.moved, LIMIT);
    assert_eq!(report.workers, 2);
    assert_eq!(assert_unique(&stats.sent), LIMIT);
    assert_eq!(service.depth(&service.url(SOURCE)).await, TOTAL - LIMIT);
}

#[tokio::test]
async fn limit_above_depth_moves_everything() {
    let service = queues(7).await;

    let report = migrator(&service, config(50, 10))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap();

    assert_eq!(report.budget, 7);
    assert_eq!(report.moved, 7);
    assert_eq!(report.workers, 1);
}

#[tokio::test]
async fn empty_source_is_a_no_op() {
    let service = queues(0).await;

    let report = migrator(&service, config(0, 10))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap();

    let stats = service.stats().await;
    assert_eq!(report.moved, 0);
    assert_eq!(stats.receive_calls, 0);
    assert_eq!(stats.send_calls, 0);
    assert_eq!(stats.delete_calls, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn receive_error_stops_the_migration() {
    const TOTAL: usize = 105;
    let service = queues(TOTAL).await;
    service.fail_receive_on_call(6).await;

    let err = migrator(&service, config(0, 3))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap_err();

    let stats = service.stats().await;
    assert_eq!(err.stage, Stage::Distributing);
    assert!(matches!(err.source, MoveError::Receive(_)));
    assert!(err.moved < TOTAL);
    assert_eq!(err.moved, stats.deleted.len());
    assert_eq!(stats.sent.len(), stats.deleted.len());
    assert_unique(&stats.sent);
    assert_eq!(
        service.depth(&service.url(SOURCE)).await,
        TOTAL - err.moved
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rerun_after_failure_moves_the_rest() {
    const TOTAL: usize = 60;
    let service = queues(TOTAL).await;
    service.fail_receive_on_call(2).await;

    let err = migrator(&service, config(0, 2))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap_err();
    let report = migrator(&service, config(0, 2))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap();

    assert_eq!(err.moved + report.moved, TOTAL);
    assert_eq!(assert_unique(&service.stats().await.sent), TOTAL);
}

#[tokio::test]
async fn rejected_sends_stay_in_source() {
    let service = queues(10).await;
    service.reject_sends(["msg-2", "msg-5"]).await;

    let report = migrator(&service, config(0, 1))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap();

    assert_eq!(report.moved, 8);
    let source = service.url(SOURCE);
    service.expire_in_flight(&source).await;
    let mut left: Vec<_> = service
        .messages(&source)
        .await
        .into_iter()
        .map(|m| m.id)
        .collect();
    left.sort();
    assert_eq!(left, vec!["msg-2", "msg-5"]);
}

#[tokio::test]
async fn partial_delete_is_terminal() {
    let service = queues(30).await;
    service.reject_deletes(["msg-13"]).await;

    let err = migrator(&service, config(0, 1))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap_err();

    assert!(matches!(err.source, MoveError::PartialDelete { .. }));
    assert_eq!(err.moved, 19);
    assert_eq!(service.stats().await.receive_calls, 2);
}

#[tokio::test]
async fn failed_delete_call_leaves_copies_in_both_queues() {
    let service = queues(5).await;
    service.fail_deletes().await;

    let err = migrator(&service, config(0, 1))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap_err();

    assert_eq!(err.moved, 0);
    assert!(matches!(err.source, MoveError::Delete { undeleted: 5, .. }));
    assert_eq!(service.depth(&service.url(DESTINATION)).await, 5);
    assert_eq!(service.in_flight(&service.url(SOURCE)).await, 5);
}

#[tokio::test]
async fn send_call_failure_is_terminal() {
    let service = queues(5).await;
    service.fail_sends().await;

    let err = migrator(&service, config(0, 1))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap_err();

    assert!(matches!(err.source, MoveError::Send(_)));
    assert_eq!(service.stats().await.delete_calls, 0);
}

#[tokio::test]
async fn unknown_queue_fails_while_resolving() {
    let service = queues(5).await;

    let err = migrator(&service, config(0, 1))
        .migrate("missing", DESTINATION)
        .await
        .unwrap_err();

    assert_eq!(err.stage, Stage::Resolving);
    assert!(matches!(err.source, MoveError::Resolve { ref queue, .. } if queue == "missing"));
    assert_eq!(service.stats().await.attribute_calls, 0);
}

#[tokio::test]
async fn same_source_and_destination_is_refused() {
    let service = queues(5).await;

    let err = migrator(&service, config(0, 1))
        .migrate(SOURCE, SOURCE)
        .await
        .unwrap_err();

    assert!(matches!(err.source, MoveError::SameQueue { .. }));
    assert_eq!(service.stats().await.receive_calls, 0);
}

#[tokio::test]
async fn unreadable_depth_is_an_error() {
    let service = queues(5).await;
    let source = service.url(SOURCE);

    service.report_depth(&source, Some("lots")).await;
    let err = migrator(&service, config(0, 1))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::Estimating);
    assert!(matches!(err.source, MoveError::InvalidDepth { value: Some(ref v), .. } if v == "lots"));

    service.report_depth(&source, None).await;
    let err = migrator(&service, config(0, 1))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap_err();
    assert!(matches!(err.source, MoveError::InvalidDepth { value: None, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overestimated_depth_still_succeeds() {
    let service = queues(15).await;
    service
        .report_depth(&service.url(SOURCE), Some("100"))
        .await;

    let report = migrator(&service, config(0, 5))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap();

    assert_eq!(report.estimated, 100);
    assert_eq!(report.moved, 15);
}

#[tokio::test]
async fn invalid_config_is_rejected_before_any_call() {
    let service = queues(5).await;
    let mut config = config(0, 1);
    config.max_per_read = 50;

    let err = migrator(&service, config)
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap_err();

    assert!(matches!(err.source, MoveError::InvalidConfig(_)));
    assert_eq!(service.stats().await.resolve_calls, 0);
}

#[tokio::test]
async fn fifo_attributes_survive_the_move() {
    let service = queues(0).await;
    let source = service.url(SOURCE);
    service
        .push_message(
            &source,
            Message {
                id: "m-1".to_string(),
                body: "{\"order\":1}".to_string(),
                receipt_handle: String::new(),
                attributes: HashMap::from([
                    (GROUP_ID.to_string(), "customer-7".to_string()),
                    (DEDUP_ID.to_string(), "order-1".to_string()),
                ]),
                message_attributes: HashMap::from([(
                    "tenant".to_string(),
                    AttributeValue::string("acme"),
                )]),
            },
        )
        .await;

    migrator(&service, config(0, 1))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap();

    let moved = service.messages(&service.url(DESTINATION)).await;
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].body, "{\"order\":1}");
    assert_eq!(moved[0].group_id(), Some("customer-7"));
    assert_eq!(moved[0].dedup_id(), Some("order-1"));
    assert_eq!(
        moved[0].message_attributes.get("tenant"),
        Some(&AttributeValue::string("acme"))
    );
}

#[tokio::test]
async fn error_message_names_stage_and_progress() {
    let service = queues(5).await;
    service.fail_sends().await;

    let err = migrator(&service, config(0, 1))
        .migrate(SOURCE, DESTINATION)
        .await
        .unwrap_err();

    let chain = format!("{:#}", anyhow::Error::new(err));
    assert!(chain.contains("moving messages after moving 0 messages"));
    assert!(chain.contains("sending message batch"));
    assert!(chain.contains("injected send failure"));
}
