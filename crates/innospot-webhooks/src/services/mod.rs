//! Business logic services for the webhook system.

pub mod delivery_service;
pub mod dispatcher;
pub mod event_publisher;
pub mod log_service;
pub mod registry_service;
pub mod retry_service;
pub mod test_fire_service;

pub use delivery_service::{AttemptContext, DeliveryAttempter};
pub use dispatcher::EventDispatcher;
pub use event_publisher::{DomainEvent, EventPublisher};
pub use log_service::DeliveryLog;
pub use registry_service::WebhookRegistry;
pub use retry_service::{backoff_delay, DeliveryJob, RetryScheduler};
pub use test_fire_service::TestFireService;
