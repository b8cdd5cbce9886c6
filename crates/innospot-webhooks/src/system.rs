//! Explicit wiring of the webhook services.
//!
//! One [`WebhookSystem`] is built per process (or per test) from a pair of
//! stores, a clock and settings. Everything else is derived from those.

use std::sync::Arc;

use tokio::sync::broadcast::Receiver;

use crate::clock::Clock;
use crate::config::WebhookSettings;
use crate::error::WebhookError;
use crate::services::{
    DeliveryAttempter, DeliveryLog, DomainEvent, EventDispatcher, EventPublisher, RetryScheduler,
    TestFireService, WebhookRegistry,
};
use crate::store::{DeliveryLogStore, WebhookStore};
use crate::worker::WebhookWorker;

#[derive(Clone)]
pub struct WebhookSystem {
    pub registry: WebhookRegistry,
    pub log: DeliveryLog,
    pub attempter: DeliveryAttempter,
    pub scheduler: RetryScheduler,
    pub dispatcher: EventDispatcher,
    pub test_fire: TestFireService,
    pub settings: WebhookSettings,
}

impl WebhookSystem {
    /// # Errors
    ///
    /// Returns `WebhookError::Internal` if the HTTP client cannot be built.
    pub fn new(
        webhooks: Arc<dyn WebhookStore>,
        logs: Arc<dyn DeliveryLogStore>,
        clock: Arc<dyn Clock>,
        settings: WebhookSettings,
    ) -> Result<Self, WebhookError> {
        let log = DeliveryLog::new(logs);
        let registry = WebhookRegistry::new(webhooks.clone(), clock.clone())
            .with_url_policy(settings.url_policy())
            .with_max_webhooks(settings.max_webhooks_per_owner);
        let attempter = DeliveryAttempter::new(&settings, log.clone(), clock.clone())?;
        let scheduler = RetryScheduler::new(webhooks.clone(), attempter.clone(), clock.clone());
        let dispatcher = EventDispatcher::new(webhooks.clone(), scheduler.clone());
        let test_fire = TestFireService::new(webhooks, attempter.clone(), clock);

        Ok(Self {
            registry,
            log,
            attempter,
            scheduler,
            dispatcher,
            test_fire,
            settings,
        })
    }

    /// Create a publisher for domain code and the worker that consumes it.
    pub fn event_pipeline(&self) -> (EventPublisher, WebhookWorker) {
        let (publisher, receiver): (EventPublisher, Receiver<DomainEvent>) =
            EventPublisher::new(self.settings.event_channel_capacity);
        let worker = WebhookWorker::new(
            self.dispatcher.clone(),
            self.log.clone(),
            receiver,
            &self.settings,
        );
        (publisher, worker)
    }
}
