//! Outbox relay background job.
//!
//! Drains pending outbox entries to the broker. Each pass claims a batch
//! with `FOR UPDATE SKIP LOCKED` inside one transaction, so several relays
//! can share a table without publishing the same entry concurrently.
//!
//! Delivery is at-least-once: a crash after publishing but before the
//! commit leaves the entry pending and it is sent again.
//!
//! A transient broker failure ends the pass. The rest of the batch is
//! released untouched, so an outage costs one publish timeout per pass
//! rather than one per claimed entry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config::{Config, RELAY_DATABASE_ERROR_BACKOFF_MS};
use crate::domain::{RetryDecision, RetryPolicy};
use crate::errors::AppResult;
use crate::infra::{MessagePublisher, OutboundRecord, UnitOfWork};

/// Outcome of one relay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub claimed: usize,
    pub published: usize,
    pub retried: usize,
    pub dead_lettered: usize,
    /// Claimed but left pending without an attempt after a broker outage
    pub deferred: usize,
}

impl RelayReport {
    pub fn is_idle(&self) -> bool {
        self.claimed == 0
    }

    /// Whether another pass may start without waiting
    fn drained_full_batch(&self, batch_size: u64) -> bool {
        self.retried == 0 && self.deferred == 0 && self.claimed as u64 >= batch_size
    }
}

pub struct OutboxRelay<U: UnitOfWork> {
    uow: Arc<U>,
    publisher: Arc<dyn MessagePublisher>,
    policy: RetryPolicy,
    batch_size: u64,
    poll_interval: Duration,
}

impl<U: UnitOfWork> OutboxRelay<U> {
    pub fn new(
        uow: Arc<U>,
        publisher: Arc<dyn MessagePublisher>,
        policy: RetryPolicy,
        batch_size: u64,
    ) -> Self {
        Self {
            uow,
            publisher,
            policy,
            batch_size: batch_size.max(1),
            poll_interval: Duration::from_millis(500),
        }
    }

    /// Build a relay from the `RELAY_*` settings
    pub fn from_config(uow: Arc<U>, publisher: Arc<dyn MessagePublisher>, config: &Config) -> Self {
        Self::new(
            uow,
            publisher,
            RetryPolicy::from(&config.relay),
            config.relay.batch_size,
        )
        .with_poll_interval(config.relay.poll_interval)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Publish one batch of due entries.
    pub async fn run_once(&self) -> AppResult<RelayReport> {
        let publisher = Arc::clone(&self.publisher);
        let policy = self.policy;
        let batch_size = self.batch_size;

        crate::with_transaction!(self.uow, |ctx| {
            let outbox = ctx.outbox();
            let entries = outbox.claim_due(batch_size, Utc::now()).await?;
            let mut report = RelayReport {
                claimed: entries.len(),
                ..RelayReport::default()
            };

            let total = entries.len();
            for (index, entry) in entries.into_iter().enumerate() {
                match publisher.publish(OutboundRecord::for_outbox_entry(&entry)).await {
                    Ok(delivery) => {
                        outbox.mark_published(entry.id, Utc::now()).await?;
                        report.published += 1;
                        tracing::debug!(
                            outbox_id = %entry.id,
                            message_id = %entry.message_id,
                            partition = delivery.partition,
                            offset = delivery.offset,
                            "Outbox entry published"
                        );
                    }
                    Err(e) => {
                        let attempts = entry.attempts.saturating_add(1);
                        let decision = if e.is_transient() {
                            policy.after_failure(attempts, Utc::now())
                        } else {
                            RetryDecision::DeadLetter
                        };

                        outbox
                            .record_failure(entry.id, attempts, &e.to_string(), decision)
                            .await?;

                        match decision {
                            RetryDecision::RetryAt(at) => {
                                report.retried += 1;
                                tracing::warn!(
                                    outbox_id = %entry.id,
                                    attempts,
                                    next_attempt_at = at,
                                    error = %e,
                                    "Outbox publish failed, will retry"
                                );
                            }
                            RetryDecision::DeadLetter => {
                                report.dead_lettered += 1;
                                tracing::error!(
                                    outbox_id = %entry.id,
                                    message_id = %entry.message_id,
                                    attempts,
                                    error = %e,
                                    "Outbox entry dead-lettered"
                                );
                            }
                        }

                        if e.is_transient() {
                            report.deferred = total - index - 1;
                            break;
                        }
                    }
                }
            }

            Ok(report)
        })
    }

    /// Poll until `shutdown` resolves.
    ///
    /// A fully published batch is followed immediately by another pass;
    /// an idle, partial or failed pass sleeps for the poll interval.
    pub async fn run<S>(&self, shutdown: S)
    where
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        tracing::info!(
            batch_size = self.batch_size,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            max_attempts = self.policy.max_attempts,
            "Outbox relay started"
        );

        loop {
            let pause = match self.run_once().await {
                Ok(report) => {
                    if !report.is_idle() {
                        tracing::info!(
                            claimed = report.claimed,
                            published = report.published,
                            retried = report.retried,
                            dead_lettered = report.dead_lettered,
                            deferred = report.deferred,
                            "Outbox relay pass"
                        );
                    }
                    if report.drained_full_batch(self.batch_size) {
                        Duration::ZERO
                    } else {
                        self.poll_interval
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Outbox relay pass failed");
                    Duration::from_millis(RELAY_DATABASE_ERROR_BACKOFF_MS)
                }
            };

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!("Outbox relay stopped");
    }
}
