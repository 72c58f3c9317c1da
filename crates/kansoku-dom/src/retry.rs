//! Bounded polling for elements that appear some time after page load.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::document::NodeId;
use crate::error::DomError;
use crate::selector::Selector;
use crate::{lock, Dom, SharedDom};

/// How often to probe and when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(with = "millis")]
    pub interval: Duration,
    #[serde(with = "millis")]
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    #[error("gave up after {attempts} attempts ({waited:?})")]
    TimedOut { attempts: u32, waited: Duration },

    #[error("cancelled")]
    Cancelled,
}

/// Run `probe` immediately and then once per interval until it yields a
/// value, the timeout passes, or `cancel` fires.
pub async fn poll_until<T, F>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Option<T>,
{
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut ticker = tokio::time::interval(policy.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = ticker.tick() => {}
        }

        attempts += 1;
        if let Some(value) = probe() {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(RetryError::TimedOut {
                attempts,
                waited: start.elapsed(),
            });
        }
    }
}

/// Wait for the first element matching `selector` anywhere in the page.
#[tracing::instrument(skip(dom, policy, cancel))]
pub async fn wait_for_selector<D: Dom>(
    dom: &SharedDom<D>,
    selector: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<NodeId, DomError> {
    let parsed = Selector::parse(selector)?;

    let result = poll_until(policy, cancel, || {
        let page = lock(dom);
        page.query(page.root(), &parsed)
    })
    .await;

    match result {
        Ok(node) => {
            tracing::debug!(?node, "Element found");
            Ok(node)
        }
        Err(RetryError::TimedOut { attempts, waited }) => {
            tracing::warn!(attempts, ?waited, "Element never appeared");
            Err(DomError::NotFound {
                selector: selector.to_string(),
                attempts,
                waited,
            })
        }
        Err(RetryError::Cancelled) => Err(DomError::Cancelled {
            selector: selector.to_string(),
        }),
    }
}
