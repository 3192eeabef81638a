use udp_client::{CommandSpec, Exchange, ExchangeState, Failure, Step};

const VERSION_INFO: CommandSpec = CommandSpec::new(
    "version_info",
    &[0xF7, 0x03, 0x88, 0xB8, 0x00, 0x21, 0x3A, 0xC1],
    &[73],
);

#[test]
fn succeeds_on_fourth_attempt_after_three_timeouts() {
    let mut exchange = Exchange::new(&VERSION_INFO, 4);
    assert_eq!(exchange.start(), Step::Send { rearm_timer: true });
    exchange.on_sent();

    for expected_attempt in 2..=4 {
        assert_eq!(exchange.on_timeout(), Step::Send { rearm_timer: true });
        exchange.on_sent();
        assert_eq!(
            exchange.state(),
            ExchangeState::AwaitingReply {
                attempt: expected_attempt
            }
        );
    }

    let reply = vec![0xAA; 73];
    assert_eq!(exchange.on_reply(&reply), Step::Complete(reply.clone()));
    assert_eq!(exchange.state(), ExchangeState::Succeeded);
    assert_eq!(exchange.attempt(), 4);
}

#[test]
fn late_reply_does_not_resurrect_failed_exchange() {
    let mut exchange = Exchange::new(&VERSION_INFO, 4);
    exchange.start();
    exchange.on_sent();
    for _ in 0..3 {
        exchange.on_timeout();
        exchange.on_sent();
    }

    assert_eq!(
        exchange.on_timeout(),
        Step::Fail(Failure::Exhausted {
            attempts: 4,
            malformed: 0
        })
    );
    assert_eq!(exchange.on_reply(&[0u8; 73]), Step::Wait);
    assert_eq!(exchange.on_timeout(), Step::Wait);
    assert!(matches!(exchange.state(), ExchangeState::Failed(_)));
}

#[test]
fn malformed_replies_resend_without_consuming_attempts() {
    // A ceiling of two leaves room for exactly one timer-driven retry.
    let mut exchange = Exchange::new(&VERSION_INFO, 2);
    exchange.start();
    exchange.on_sent();

    assert_eq!(exchange.on_reply(&[0u8; 10]), Step::Send { rearm_timer: false });
    exchange.on_sent();
    assert_eq!(exchange.on_reply(&[0u8; 74]), Step::Send { rearm_timer: false });
    exchange.on_sent();
    assert_eq!(exchange.attempt(), 1);
    assert_eq!(exchange.malformed(), 2);

    assert_eq!(exchange.on_timeout(), Step::Send { rearm_timer: true });
    exchange.on_sent();

    let reply = vec![1u8; 73];
    assert_eq!(exchange.on_reply(&reply), Step::Complete(reply.clone()));
}

#[test]
fn exhaustion_reports_malformed_count() {
    let mut exchange = Exchange::new(&VERSION_INFO, 1);
    exchange.start();
    exchange.on_sent();
    exchange.on_reply(&[0u8; 3]);
    exchange.on_sent();

    assert_eq!(
        exchange.on_timeout(),
        Step::Fail(Failure::Exhausted {
            attempts: 1,
            malformed: 1
        })
    );
}

#[test]
fn closed_endpoint_fails_exchange() {
    let mut exchange = Exchange::new(&VERSION_INFO, 4);
    exchange.start();
    assert_eq!(exchange.on_closed(), Step::Fail(Failure::Closed));
    assert_eq!(exchange.on_reply(&[0u8; 73]), Step::Wait);
}

#[test]
fn reply_before_start_is_ignored() {
    let mut exchange = Exchange::new(&VERSION_INFO, 4);
    assert_eq!(exchange.on_reply(&[0u8; 73]), Step::Wait);
    assert_eq!(exchange.state(), ExchangeState::Idle);
}

#[test]
fn accepted_lengths_are_exact() {
    const RUNNING_DATA: CommandSpec = CommandSpec::new("running_data", &[0xAA, 0x55], &[142, 149]);
    assert!(RUNNING_DATA.accepts(142));
    assert!(RUNNING_DATA.accepts(149));
    assert!(!RUNNING_DATA.accepts(145));
    assert!(!RUNNING_DATA.accepts(150));
}
