//! Pub/sub hub: subscriptions, filters and the fan-out broadcaster.
//!
//! One `Broadcaster` accepts the producer's event stream and fans it out to
//! any number of concurrently connected subscribers, each behind its own
//! bounded queue. Backpressure is lossy by design: the stream is telemetry,
//! so a slow observer sheds its oldest events instead of stalling anything.

mod broadcaster;
mod filter;
mod subscription;

pub use broadcaster::{Broadcaster, ClientInfo, EmitError, StatusSnapshot, SubscriptionGuard};
pub use filter::EventFilter;
pub use subscription::{Subscription, TransportKind};
