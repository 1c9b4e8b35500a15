//! Integration tests for the room layer: generator + registry together.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use arena_protocol::RoomCode;
use arena_room::{CodeConfig, RoomCodeGenerator, RoomError, RoomRegistry};
use arena_transport::ConnectionId;

fn conn(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

/// Generates and allocates in one step, the way the session layer does.
fn create(
    generator: &RoomCodeGenerator,
    reg: &mut RoomRegistry,
    now: Instant,
) -> Result<RoomCode, RoomError> {
    let code = generator.next(reg)?;
    reg.allocate(code.clone(), now)?;
    Ok(code)
}

#[test]
fn test_full_lifecycle_create_join_leave_expire_reuse() {
    let generator = RoomCodeGenerator::default();
    let mut reg = RoomRegistry::new();
    let t0 = Instant::now();
    let idle = Duration::from_secs(300);

    // 1. Room is created and two sockets bind.
    let code = create(&generator, &mut reg, t0).unwrap();
    reg.add_member(&code, conn(1), t0).unwrap();
    reg.add_member(&code, conn(2), t0).unwrap();

    // 2. Nobody expires while the room is occupied.
    let t1 = t0 + Duration::from_secs(3600);
    assert!(reg.expire_idle(t1, idle).is_empty());

    // 3. Both leave; the idle clock starts at the last departure.
    reg.remove_member(&code, conn(1), t1).unwrap();
    reg.remove_member(&code, conn(2), t1).unwrap();
    assert!(reg.expire_idle(t1 + Duration::from_secs(299), idle).is_empty());

    // 4. The sweep after the timeout frees the code...
    let t2 = t1 + Duration::from_secs(301);
    assert_eq!(reg.expire_idle(t2, idle), vec![code.clone()]);
    assert!(matches!(reg.get(&code), Err(RoomError::NotFound(_))));

    // 5. ...and it can be allocated again.
    assert!(reg.allocate(code, t2).is_ok());
}

#[test]
fn test_every_code_allocated_is_distinct() {
    // 3^2 = 9 codes. Fill as many as the generator can find; whatever it
    // returns must never repeat.
    let generator = RoomCodeGenerator::new(&CodeConfig {
        alphabet: "ABC".into(),
        length: 2,
        max_attempts: 50,
    })
    .unwrap();
    let mut reg = RoomRegistry::new();
    let now = Instant::now();

    let mut seen = HashSet::new();
    for _ in 0..9 {
        match create(&generator, &mut reg, now) {
            Ok(code) => assert!(seen.insert(code), "duplicate code handed out"),
            Err(RoomError::ExhaustedRetries { .. }) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(seen.len(), reg.len());
}

#[test]
fn test_exhausted_space_fails_hard_instead_of_looping() {
    let generator = RoomCodeGenerator::new(&CodeConfig {
        alphabet: "A".into(),
        length: 1,
        max_attempts: 3,
    })
    .unwrap();
    let mut reg = RoomRegistry::new();
    let now = Instant::now();

    create(&generator, &mut reg, now).expect("first code is free");
    let result = create(&generator, &mut reg, now);

    assert_eq!(result, Err(RoomError::ExhaustedRetries { attempts: 3 }));
}

#[test]
fn test_membership_is_per_room() {
    let mut reg = RoomRegistry::new();
    let now = Instant::now();
    let a = RoomCode::parse("AAAAAA").unwrap();
    let b = RoomCode::parse("BBBBBB").unwrap();
    reg.allocate(a.clone(), now).unwrap();
    reg.allocate(b.clone(), now).unwrap();

    reg.add_member(&a, conn(1), now).unwrap();

    assert!(reg.get(&a).unwrap().contains(conn(1)));
    assert!(!reg.get(&b).unwrap().contains(conn(1)));
}
