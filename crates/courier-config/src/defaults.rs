use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Default TCP port for the dispatch server.
pub const DEFAULT_TCP_PORT: u16 = 9780;

/// Default host the dispatch server binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Largest inbound frame accepted by default (1 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default endpoint the server listens on.
#[must_use]
pub fn default_listen_socket() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_HOST, DEFAULT_TCP_PORT)
}

/// Default inbound frame limit.
#[must_use]
pub fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}

/// Idle connections stay open until the client leaves.
#[must_use]
pub fn default_idle_timeout_secs() -> u64 {
    0
}
