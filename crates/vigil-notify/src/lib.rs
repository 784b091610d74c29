//! Push notification fan-out.
//!
//! The broadcaster maps each user to their open push channels and delivers
//! risk events to every one of them. Delivery is best-effort: a failing
//! channel is logged and skipped, it never fails the security decision that
//! produced the event.

pub mod broadcaster;
pub mod error;
pub mod event;

pub use broadcaster::{NotificationBroadcaster, PushChannel};
pub use error::{NotifyError, NotifyResult};
pub use event::RiskEvent;
