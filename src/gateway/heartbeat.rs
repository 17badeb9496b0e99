use std::time::Duration;

/// Interval between server-initiated keepalive pings.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);
/// How long a closing session's writer may keep flushing before it is aborted.
pub const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
