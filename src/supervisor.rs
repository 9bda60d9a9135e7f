use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, sleep};
use tracing::{error, info, warn};

use crate::backoff::{should_notify, BackoffController, PollPolicy};
use crate::config::AppConfig;
use crate::extractor;
use crate::fetcher::{FetchedPage, PageFetcher};
use crate::health::HealthSnapshot;
use crate::notifier::TelegramNotifier;
use crate::targets::Target;

/// Launches one unbounded watch loop per target plus the two periodic
/// reporting timers, then parks forever. Nothing here terminates on its own;
/// the process runs until externally killed. Target loops share nothing but
/// the read-only registry and the notifier transport.
pub struct Supervisor {
    targets: Vec<Target>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<TelegramNotifier>,
    policy: PollPolicy,
    reminder_interval: Duration,
    health_interval: Duration,
}

impl Supervisor {
    pub fn new(
        targets: Vec<Target>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<TelegramNotifier>,
        config: &AppConfig,
    ) -> Self {
        Supervisor {
            targets,
            fetcher,
            notifier,
            policy: PollPolicy::from_config(&config.poller),
            reminder_interval: Duration::from_secs(config.reporting.reminder_interval_secs),
            health_interval: Duration::from_secs(config.reporting.health_interval_secs),
        }
    }

    pub async fn run(self) {
        let started_at = Instant::now();

        if let Err(e) = self.notifier.announce_restart().await {
            error!("Failed to announce restart: {}", e);
        }

        for target in &self.targets {
            let fetcher = Arc::clone(&self.fetcher);
            let notifier = Arc::clone(&self.notifier);
            let controller = BackoffController::new(self.policy.clone(), Arc::clone(&self.notifier));
            let target = target.clone();

            tokio::spawn(async move {
                info!("Watching {} at {}", target.name, target.url);
                loop {
                    let delay = run_cycle(fetcher.as_ref(), &controller, &notifier, &target).await;
                    sleep(delay).await;
                }
            });
        }

        {
            let notifier = Arc::clone(&self.notifier);
            let targets = self.targets.clone();
            let period = self.reminder_interval;
            tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.tick().await; // first tick completes immediately
                loop {
                    ticker.tick().await;
                    if let Err(e) = notifier.send_waiting_summary(&targets).await {
                        error!("Failed to send waiting summary: {}", e);
                    }
                }
            });
        }

        {
            let notifier = Arc::clone(&self.notifier);
            let period = self.health_interval;
            tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let snapshot = HealthSnapshot::capture(started_at.elapsed());
                    if let Err(e) = notifier.notify_admin(&snapshot.report()).await {
                        error!("Failed to send health report: {}", e);
                    }
                }
            });
        }

        // Run until externally killed; there is no shutdown path.
        futures::future::pending::<()>().await;
    }
}

/// One poll cycle for one target: fetch, extract, notify when purchasable,
/// then hand the outcome to the backoff controller for the next delay. The
/// notification happens before the delay is returned, so a pending sleep can
/// never swallow an alert. A transport-level fetch failure is folded into the
/// error path with status 0.
pub async fn run_cycle(
    fetcher: &dyn PageFetcher,
    controller: &BackoffController,
    notifier: &TelegramNotifier,
    target: &Target,
) -> Duration {
    let page = match fetcher.fetch(target).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Fetch failed for {}: {}", target.name, e);
            FetchedPage {
                status: 0,
                final_url: target.url.clone(),
                matched_values: Vec::new(),
                title: None,
            }
        }
    };

    let outcome = extractor::evaluate(target, &page);

    if should_notify(&outcome) {
        info!("{} has stock!", target.name);
        if let Err(e) = notifier.alert_in_stock(target, &page.final_url).await {
            error!("Failed to send stock alert for {}: {}", target.name, e);
        }
    }

    controller.next_delay(target, &outcome).await
}
