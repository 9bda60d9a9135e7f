use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fetcher::FetchedPage;
use crate::targets::Target;

/// The result of a single poll attempt. Built fresh per fetch and consumed
/// immediately by the backoff controller and notifier; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOutcome {
    pub purchasable: bool,
    pub http_status: u16,
    pub anomaly: bool,
}

/// Decide whether the fetched page shows the product as purchasable.
///
/// Any matched attribute value containing the target's expected value
/// (case-insensitive substring) marks the product purchasable. When the
/// target defines an expected title and the page title differs, the page is
/// serving a different layout than the one the locator was written against,
/// so the match cannot be trusted: the outcome is flagged anomalous and
/// purchasable is forced false.
pub fn evaluate(target: &Target, page: &FetchedPage) -> PollOutcome {
    let expected = target.expected_value.to_lowercase();
    let mut purchasable = page
        .matched_values
        .iter()
        .any(|value| value.to_lowercase().contains(&expected));

    let mut anomaly = false;
    if let Some(expected_title) = &target.expected_title {
        let title = page.title.as_deref().unwrap_or("");
        if title != expected_title {
            warn!(
                "Unexpected page title for {}: got '{}', expected '{}'",
                target.name, title, expected_title
            );
            anomaly = true;
            purchasable = false;
        }
    }

    PollOutcome {
        purchasable,
        http_status: page.status,
        anomaly,
    }
}
