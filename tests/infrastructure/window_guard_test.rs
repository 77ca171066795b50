use std::time::Duration;

use chatdesk::application::ports::{
    AdmissionDecision, AdmissionGuard, DenialReason, RequestFingerprint,
};
use chatdesk::infrastructure::admission::{FixedWindowGuard, is_automated_client};

use crate::helpers::BROWSER_AGENT;

fn browser(client_key: &str) -> RequestFingerprint {
    RequestFingerprint {
        client_key: client_key.to_string(),
        user_agent: Some(BROWSER_AGENT.to_string()),
    }
}

#[tokio::test(start_paused = true)]
async fn given_requests_within_quota_when_deciding_then_allowed_with_remaining_count() {
    let guard = FixedWindowGuard::new(3, Duration::from_secs(30));

    let first = guard.decide(&browser("10.0.0.1")).await.unwrap();
    let second = guard.decide(&browser("10.0.0.1")).await.unwrap();

    match (first, second) {
        (
            AdmissionDecision::Allowed {
                rate_limit: Some(first),
            },
            AdmissionDecision::Allowed {
                rate_limit: Some(second),
            },
        ) => {
            assert_eq!(first.limit, 3);
            assert_eq!(first.remaining, 2);
            assert_eq!(second.remaining, 1);
            assert_eq!(second.reset_seconds(), 30);
        }
        other => panic!("expected two admissions, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn given_exhausted_quota_when_deciding_then_rate_limited_until_window_resets() {
    let guard = FixedWindowGuard::new(1, Duration::from_secs(30));
    guard.decide(&browser("10.0.0.1")).await.unwrap();

    tokio::time::advance(Duration::from_secs(10)).await;
    let denied = guard.decide(&browser("10.0.0.1")).await.unwrap();

    match denied {
        AdmissionDecision::Denied(DenialReason::RateLimited(info)) => {
            assert_eq!(info.remaining, 0);
            assert_eq!(info.reset_seconds(), 20);
        }
        other => panic!("expected rate limit, got {other:?}"),
    }

    tokio::time::advance(Duration::from_secs(20)).await;
    assert!(matches!(
        guard.decide(&browser("10.0.0.1")).await.unwrap(),
        AdmissionDecision::Allowed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn given_two_clients_when_one_is_exhausted_then_other_is_unaffected() {
    let guard = FixedWindowGuard::new(1, Duration::from_secs(30));
    guard.decide(&browser("10.0.0.1")).await.unwrap();

    let other = guard.decide(&browser("10.0.0.2")).await.unwrap();

    assert!(matches!(other, AdmissionDecision::Allowed { .. }));
}

#[tokio::test]
async fn given_zero_quota_when_deciding_then_unlimited_without_headers() {
    let guard = FixedWindowGuard::new(0, Duration::from_secs(30));

    for _ in 0..10 {
        assert_eq!(
            guard.decide(&browser("10.0.0.1")).await.unwrap(),
            AdmissionDecision::Allowed { rate_limit: None }
        );
    }
}

#[tokio::test]
async fn given_scripted_user_agent_when_deciding_then_denied_as_bot() {
    let guard = FixedWindowGuard::new(5, Duration::from_secs(30));
    let fingerprint = RequestFingerprint {
        client_key: "10.0.0.1".to_string(),
        user_agent: Some("curl/8.5.0".to_string()),
    };

    assert_eq!(
        guard.decide(&fingerprint).await.unwrap(),
        AdmissionDecision::Denied(DenialReason::Bot)
    );
}

#[tokio::test]
async fn given_automated_clients_allowed_when_deciding_then_scripts_pass() {
    let guard = FixedWindowGuard::new(5, Duration::from_secs(30)).allow_automated_clients();
    let fingerprint = RequestFingerprint {
        client_key: "10.0.0.1".to_string(),
        user_agent: None,
    };

    assert!(matches!(
        guard.decide(&fingerprint).await.unwrap(),
        AdmissionDecision::Allowed { .. }
    ));
}

#[test]
fn given_user_agents_when_classifying_then_crawlers_and_tools_are_automated() {
    assert!(is_automated_client(None));
    assert!(is_automated_client(Some("  ")));
    assert!(is_automated_client(Some("Googlebot/2.1 (+http://www.google.com/bot.html)")));
    assert!(is_automated_client(Some("python-requests/2.32")));
    assert!(is_automated_client(Some("Mozilla/5.0 HeadlessChrome/120.0")));
    assert!(!is_automated_client(Some(BROWSER_AGENT)));
    assert!(!is_automated_client(Some("chatdesk-widget/0.1.0")));
}
