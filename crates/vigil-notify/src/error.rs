use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The channel's transport is gone; the broadcaster logs this and
    /// moves on to the user's remaining channels.
    #[error("push channel closed")]
    ChannelClosed,

    #[error("channel not registered")]
    ChannelNotFound,

    /// A shared lock was poisoned.
    #[error("internal error")]
    Internal,
}

pub type NotifyResult<T> = Result<T, NotifyError>;
