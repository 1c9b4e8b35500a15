//! Integration tests for the session gateway: the REST + socket flows a
//! browser actually produces.

use std::collections::HashSet;
use std::sync::Arc;

use arena_protocol::RoomCode;
use arena_room::{CodeConfig, RoomError};
use arena_session::{BindOutcome, SessionConfig, SessionError, SessionGateway};
use arena_transport::ConnectionId;

fn conn(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

#[tokio::test]
async fn test_create_then_join_and_unknown_code() {
    // An alphabet without Z or 9 keeps ZZ99ZZ from ever being generated.
    let gw = SessionGateway::new(SessionConfig {
        code: CodeConfig {
            alphabet: "ABCDEF".into(),
            ..CodeConfig::default()
        },
        ..SessionConfig::default()
    })
    .unwrap();

    let code = gw.create_room().await.unwrap();

    assert!(gw.join_room_by_code(code.as_str()).await);
    assert!(!gw.join_room_by_code("ZZ99ZZ").await);
}

#[tokio::test]
async fn test_rest_join_then_socket_bind() {
    let gw = SessionGateway::new(SessionConfig::default()).unwrap();
    let code = gw.create_room().await.unwrap();

    assert!(gw.join_room_by_code(code.as_str()).await);
    let outcome = gw.bind_socket(&code, conn(7), None).await;

    assert!(matches!(outcome, BindOutcome::Joined { .. }));
    assert_eq!(gw.room(&code).await.unwrap().members(), &[conn(7)]);
}

#[tokio::test]
async fn test_socket_bind_then_rest_join() {
    // The socket event overtakes the HTTP response. Same end state.
    let gw = SessionGateway::new(SessionConfig::default()).unwrap();
    let code = gw.create_room().await.unwrap();

    gw.bind_socket(&code, conn(7), None).await;
    assert!(gw.join_room_by_code(code.as_str()).await);

    assert_eq!(gw.room(&code).await.unwrap().members(), &[conn(7)]);
}

#[tokio::test]
async fn test_bind_after_close_reports_room_not_found() {
    let gw = SessionGateway::new(SessionConfig::default()).unwrap();
    let code = gw.create_room().await.unwrap();
    gw.close_room(&code).await.unwrap();

    let outcome = gw.bind_socket(&code, conn(1), None).await;

    assert_eq!(outcome, BindOutcome::RoomNotFound(code));
    assert!(gw.binding(conn(1)).await.is_none());
}

#[tokio::test]
async fn test_moving_out_of_closed_room_is_clean() {
    let gw = SessionGateway::new(SessionConfig::default()).unwrap();
    let a = gw.create_room().await.unwrap();
    let b = gw.create_room().await.unwrap();
    gw.bind_socket(&a, conn(1), None).await;

    // close_room drops the member's binding, so the move has no old room.
    gw.close_room(&a).await.unwrap();
    let outcome = gw.bind_socket(&b, conn(1), None).await;

    assert!(matches!(outcome, BindOutcome::Joined { left: None, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_room_never_duplicates() {
    // Two possible codes, eight callers: at most two succeed and they
    // must differ; the rest must fail with ExhaustedRetries.
    let gw = Arc::new(
        SessionGateway::new(SessionConfig {
            code: CodeConfig {
                alphabet: "AB".into(),
                length: 1,
                max_attempts: 32,
            },
            ..SessionConfig::default()
        })
        .unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..8 {
        let gw = Arc::clone(&gw);
        handles.push(tokio::spawn(async move { gw.create_room().await }));
    }

    let mut codes: Vec<RoomCode> = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(code) => codes.push(code),
            Err(e) => {
                assert!(e.is_retryable());
                assert!(matches!(
                    e,
                    SessionError::Room(RoomError::ExhaustedRetries { .. })
                ));
            }
        }
    }

    let unique: HashSet<_> = codes.iter().cloned().collect();
    assert_eq!(unique.len(), codes.len(), "a code was handed out twice");
    assert!(codes.len() <= 2);
    assert_eq!(gw.room_count().await, codes.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_binds_keep_one_room_per_socket() {
    let gw = Arc::new(SessionGateway::new(SessionConfig::default()).unwrap());
    let a = gw.create_room().await.unwrap();
    let b = gw.create_room().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16u64 {
        let gw = Arc::clone(&gw);
        let target = if i % 2 == 0 { a.clone() } else { b.clone() };
        handles.push(tokio::spawn(async move {
            gw.bind_socket(&target, conn(1), None).await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let in_a = gw.room(&a).await.unwrap().contains(conn(1));
    let in_b = gw.room(&b).await.unwrap().contains(conn(1));
    assert!(in_a ^ in_b, "socket must be in exactly one room");

    let bound = gw.binding(conn(1)).await.unwrap().room_code;
    assert_eq!(bound, if in_a { a } else { b });
}
