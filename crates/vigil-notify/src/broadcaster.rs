use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use vigil_core::{ChannelId, UserId};

use crate::error::{NotifyError, NotifyResult};
use crate::event::RiskEvent;

// ---------------------------------------------------------------------------
// PushChannel — transport seam
// ---------------------------------------------------------------------------

/// One open delivery path to a user's client. Implementations wrap whatever
/// transport carries the event; the broadcaster only needs `push`.
pub trait PushChannel: Send + Sync {
    fn push(&self, event: &RiskEvent) -> NotifyResult<()>;
}

// ---------------------------------------------------------------------------
// NotificationBroadcaster
// ---------------------------------------------------------------------------

/// Fan-out of risk events to every open channel of a user.
///
/// Delivery failures are logged and skipped; `send` reports how many
/// channels accepted the event but never errors because of a channel.
/// A user with no channels is dropped from the map on their last
/// unregister, so iteration stays proportional to connected users.
pub struct NotificationBroadcaster {
    channels: Mutex<HashMap<UserId, Vec<(ChannelId, Arc<dyn PushChannel>)>>>,
    next_channel: AtomicU64,
}

impl NotificationBroadcaster {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            next_channel: AtomicU64::new(1),
        }
    }

    /// Attach a channel for this user and return its handle id.
    pub fn register(
        &self,
        user_id: &UserId,
        channel: Arc<dyn PushChannel>,
    ) -> NotifyResult<ChannelId> {
        let channel_id = ChannelId::new(format!(
            "ch-{}",
            self.next_channel.fetch_add(1, Ordering::Relaxed)
        ));
        let mut channels = self.channels.lock().map_err(|_| NotifyError::Internal)?;
        channels
            .entry(user_id.clone())
            .or_default()
            .push((channel_id.clone(), channel));
        tracing::info!(user_id = %user_id, channel_id = %channel_id, "push channel registered");
        Ok(channel_id)
    }

    /// Detach a channel. The user's entry is removed entirely when this
    /// was their last channel.
    pub fn unregister(&self, user_id: &UserId, channel_id: &ChannelId) -> NotifyResult<()> {
        let mut channels = self.channels.lock().map_err(|_| NotifyError::Internal)?;
        let Some(user_channels) = channels.get_mut(user_id) else {
            return Err(NotifyError::ChannelNotFound);
        };
        let before = user_channels.len();
        user_channels.retain(|(id, _)| id != channel_id);
        if user_channels.len() == before {
            return Err(NotifyError::ChannelNotFound);
        }
        if user_channels.is_empty() {
            channels.remove(user_id);
        }
        tracing::info!(user_id = %user_id, channel_id = %channel_id, "push channel unregistered");
        Ok(())
    }

    /// Deliver an event to all of this user's channels. Returns how many
    /// channels accepted it; a user with no channels yields zero.
    pub fn send(&self, user_id: &UserId, event: &RiskEvent) -> NotifyResult<usize> {
        let channels = self.channels.lock().map_err(|_| NotifyError::Internal)?;
        let Some(user_channels) = channels.get(user_id) else {
            return Ok(0);
        };

        let mut delivered = 0;
        for (channel_id, channel) in user_channels {
            match channel.push(event) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(
                        user_id = %user_id,
                        channel_id = %channel_id,
                        event = event.name(),
                        error = %err,
                        "push delivery failed"
                    );
                }
            }
        }
        Ok(delivered)
    }

    /// Deliver an event to every channel of every connected user.
    pub fn broadcast(&self, event: &RiskEvent) -> NotifyResult<usize> {
        let channels = self.channels.lock().map_err(|_| NotifyError::Internal)?;
        let mut delivered = 0;
        for (user_id, user_channels) in channels.iter() {
            for (channel_id, channel) in user_channels {
                match channel.push(event) {
                    Ok(()) => delivered += 1,
                    Err(err) => {
                        tracing::warn!(
                            user_id = %user_id,
                            channel_id = %channel_id,
                            event = event.name(),
                            error = %err,
                            "broadcast delivery failed"
                        );
                    }
                }
            }
        }
        Ok(delivered)
    }

    /// Open channel count for one user.
    pub fn channel_count(&self, user_id: &UserId) -> NotifyResult<usize> {
        let channels = self.channels.lock().map_err(|_| NotifyError::Internal)?;
        Ok(channels.get(user_id).map(Vec::len).unwrap_or(0))
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
