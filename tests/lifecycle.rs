use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, TimeDelta, Utc};

use payflow::acquirer::reconcile::{RefundSweeper, TimeoutReaper};
use payflow::acquirer::{Notifier, PaymentUpdated};
use payflow::gateway::{PaymentRequest, Resync, Submission};
use payflow::model::CardDetails;
use payflow::worker::{Sweep, Workers};
use payflow::{
    AcquiringBank, Amount, Config, Gateway, GatewayState, InMemoryPaymentRepository,
    PaymentState,
};

type TestGateway = Gateway<AcquiringBank, InMemoryPaymentRepository>;

fn setup(notifier: Notifier) -> (Arc<AcquiringBank>, Arc<TestGateway>) {
    let bank = Arc::new(AcquiringBank::new(&Config::default(), notifier));
    let gateway = Arc::new(Gateway::new(
        Arc::clone(&bank),
        Arc::new(InMemoryPaymentRepository::new()),
    ));
    (bank, gateway)
}

/// December of next year, so request cards never expire.
fn expiry() -> String {
    format!("12{:02}", (Utc::now().year() + 1) % 100)
}

fn request(number: &str) -> PaymentRequest {
    PaymentRequest {
        amount: Amount::from_minor(1999),
        currency: "GBP".to_string(),
        card: CardDetails {
            number: number.to_string(),
            expiry_date: expiry(),
            holder: "Chris Doe".to_string(),
            cvv: "555".to_string(),
        },
        hook_url: None,
    }
}

#[test]
fn unanswered_challenge_times_out_as_rejected() {
    let (bank, gateway) = setup(Notifier::disabled());
    let payment = gateway.create_payment(request("4000000000003220")).unwrap();
    assert_eq!(payment.state(), GatewayState::ActionRequired);

    let reaper = TimeoutReaper::new(Arc::clone(&bank), Duration::from_secs(60));
    // not stale yet
    assert_eq!(reaper.sweep(Utc::now()).applied, 0);

    let later = Utc::now() + TimeDelta::seconds(61);
    let report = reaper.sweep(later);
    assert_eq!(report.scanned, 1);
    assert_eq!(report.applied, 1);

    gateway.resync();
    let payment = gateway.get_payment(&payment.id).unwrap();
    assert_eq!(payment.state(), GatewayState::Rejected);
    assert_eq!(payment.acquiring_state(), Some(PaymentState::Rejected));
}

#[test]
fn flagged_cards_are_refunded_after_capture() {
    let (bank, gateway) = setup(Notifier::disabled());
    let refunded = gateway.create_payment(request("4000000000005126")).unwrap();
    let kept = gateway.create_payment(request("4242424242424242")).unwrap();
    assert_eq!(refunded.state(), GatewayState::Paid);

    let report = RefundSweeper::new(Arc::clone(&bank)).sweep(Utc::now());
    assert_eq!(report.scanned, 2);
    assert_eq!(report.applied, 1);

    gateway.resync();
    assert_eq!(
        gateway.get_payment(&refunded.id).unwrap().state(),
        GatewayState::Refunded
    );
    assert_eq!(
        gateway.get_payment(&kept.id).unwrap().state(),
        GatewayState::Paid
    );

    // a second sweep finds nothing left to refund
    assert_eq!(RefundSweeper::new(bank).sweep(Utc::now()).applied, 0);
}

#[test]
fn notifications_follow_the_acquirer_path() {
    let (notifier, mut events) = Notifier::channel();
    let (_, gateway) = setup(notifier);

    let paid = gateway
        .submit(Submission {
            request: request("4000000000003063"),
            challenge_response: Some("123456".to_string()),
        })
        .unwrap();
    assert_eq!(paid.state(), GatewayState::Paid);

    let mut path = Vec::new();
    while let Ok(PaymentUpdated {
        prev_state,
        new_state,
        ..
    }) = events.try_recv()
    {
        path.push((prev_state, new_state));
    }
    assert_eq!(
        path,
        vec![
            (Some(PaymentState::New), PaymentState::ThreeDsRequired),
            (Some(PaymentState::Authorising), PaymentState::Authorised),
            (Some(PaymentState::Authorised), PaymentState::Confirmed),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn workers_settle_payments_in_the_background() {
    let (bank, gateway) = setup(Notifier::disabled());

    let challenged = gateway.create_payment(request("4000000000003220")).unwrap();
    let refundable = gateway.create_payment(request("4000000000007726")).unwrap();

    let mut workers = Workers::new();
    workers.spawn(RefundSweeper::new(Arc::clone(&bank)), Duration::from_secs(10));
    workers.spawn(Resync::new(Arc::clone(&gateway)), Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(workers.shutdown().await, 0);

    assert_eq!(
        gateway.get_payment(&refundable.id).unwrap().state(),
        GatewayState::Refunded
    );
    // reaper not running, so the challenge is still open
    assert_eq!(
        gateway.get_payment(&challenged.id).unwrap().state(),
        GatewayState::ActionRequired
    );
}
