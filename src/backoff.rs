use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::config::PollerConfig;
use crate::extractor::PollOutcome;
use crate::notifier::TelegramNotifier;
use crate::targets::Target;

/// Delay policy for one poll cycle. Stateless: each decision is a pure
/// function of the outcome passed in, with no memory of earlier cycles.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    jitter_min_secs: u64,
    jitter_max_secs: u64,
    penalty_secs: u64,
}

impl PollPolicy {
    pub fn from_config(config: &PollerConfig) -> Self {
        PollPolicy {
            jitter_min_secs: config.jitter_min_secs,
            jitter_max_secs: config.jitter_max_secs.max(config.jitter_min_secs),
            penalty_secs: config.penalty_secs,
        }
    }

    /// A 200 response gets a uniformly random delay in the jitter range, so
    /// the workers never settle into a fingerprintable request rhythm. Any
    /// other status is treated as likely rate-limiting and gets the fixed
    /// penalty. Never returns a zero delay.
    pub fn delay_for(&self, outcome: &PollOutcome) -> Duration {
        let secs = if outcome.http_status == 200 {
            rand::thread_rng().gen_range(self.jitter_min_secs..=self.jitter_max_secs)
        } else {
            self.penalty_secs
        };
        Duration::from_secs(secs.max(1))
    }
}

/// Notify iff the product matched as purchasable and the page layout was the
/// expected one. A title anomaly means the match cannot be trusted.
pub fn should_notify(outcome: &PollOutcome) -> bool {
    outcome.purchasable && !outcome.anomaly
}

/// Applies the delay policy and owns the error-path side channel: a non-200
/// outcome produces exactly one admin report before the penalty is returned.
pub struct BackoffController {
    policy: PollPolicy,
    notifier: Arc<TelegramNotifier>,
}

impl BackoffController {
    pub fn new(policy: PollPolicy, notifier: Arc<TelegramNotifier>) -> Self {
        BackoffController { policy, notifier }
    }

    pub async fn next_delay(&self, target: &Target, outcome: &PollOutcome) -> Duration {
        if outcome.http_status != 200 {
            error!(
                "Status code for {} is not 200 (got {}), delaying next poll by {}s",
                target.name, outcome.http_status, self.policy.penalty_secs
            );
            if let Err(e) = self.notifier.report_error(target, outcome.http_status).await {
                error!("Failed to report {} error to admin: {}", target.name, e);
            }
        }
        self.policy.delay_for(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TelegramConfig, DEFAULT_USER_AGENT};
    use rstest::rstest;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn policy(min: u64, max: u64, penalty: u64) -> PollPolicy {
        PollPolicy::from_config(&PollerConfig {
            jitter_min_secs: min,
            jitter_max_secs: max,
            penalty_secs: penalty,
            request_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    fn outcome(status: u16) -> PollOutcome {
        PollOutcome {
            purchasable: false,
            http_status: status,
            anomaly: false,
        }
    }

    #[test]
    fn test_success_delay_stays_in_jitter_range() {
        let policy = policy(5, 20, 3600);

        for _ in 0..200 {
            let delay = policy.delay_for(&outcome(200)).as_secs();
            assert!((5..=20).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[rstest]
    #[case(404)]
    #[case(429)]
    #[case(503)]
    fn test_error_delay_is_fixed_penalty(#[case] status: u16) {
        let policy = policy(5, 20, 3600);

        assert_eq!(policy.delay_for(&outcome(status)), Duration::from_secs(3600));
    }

    #[test]
    fn test_delay_is_never_zero() {
        // A zero-width jitter range collapsed to zero still sleeps
        let policy = policy(0, 0, 0);

        assert!(policy.delay_for(&outcome(200)) >= Duration::from_secs(1));
        assert!(policy.delay_for(&outcome(503)) >= Duration::from_secs(1));
    }

    #[test]
    fn test_inverted_range_is_clamped() {
        let policy = policy(30, 10, 3600);

        for _ in 0..50 {
            assert_eq!(policy.delay_for(&outcome(200)).as_secs(), 30);
        }
    }

    #[rstest]
    #[case(true, false, true)]
    #[case(true, true, false)] // anomaly suppresses the notification
    #[case(false, false, false)]
    #[case(false, true, false)]
    fn test_should_notify(#[case] purchasable: bool, #[case] anomaly: bool, #[case] expected: bool) {
        let outcome = PollOutcome {
            purchasable,
            http_status: 200,
            anomaly,
        };
        assert_eq!(should_notify(&outcome), expected);
    }

    async fn controller_for(server: &MockServer) -> BackoffController {
        let notifier = Arc::new(TelegramNotifier::new(&TelegramConfig {
            bot_token: "TESTTOKEN".to_string(),
            admin_chat_id: "111".to_string(),
            group_chat_id: "222".to_string(),
            api_base: server.uri(),
        }));
        BackoffController::new(policy(5, 20, 3600), notifier)
    }

    fn test_target() -> Target {
        Target::new(
            "Amazon",
            "https://example.com/product/ps5",
            "input",
            "id",
            "add-to-cart-button",
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_non_200_sends_exactly_one_admin_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTESTTOKEN/sendMessage"))
            .and(body_string_contains("chat_id=111"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let controller = controller_for(&server).await;
        let delay = controller.next_delay(&test_target(), &outcome(503)).await;

        assert_eq!(delay, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_success_path_sends_no_report() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .expect(0)
            .mount(&server)
            .await;

        let controller = controller_for(&server).await;
        let delay = controller.next_delay(&test_target(), &outcome(200)).await;

        assert!((5..=20).contains(&delay.as_secs()));
    }

    #[tokio::test]
    async fn test_report_transport_failure_still_returns_penalty() {
        let notifier = Arc::new(TelegramNotifier::new(&TelegramConfig {
            bot_token: "TESTTOKEN".to_string(),
            admin_chat_id: "111".to_string(),
            group_chat_id: "222".to_string(),
            api_base: "http://127.0.0.1:1".to_string(),
        }));
        let controller = BackoffController::new(policy(5, 20, 3600), notifier);

        let delay = controller.next_delay(&test_target(), &outcome(503)).await;
        assert_eq!(delay, Duration::from_secs(3600));
    }
}
