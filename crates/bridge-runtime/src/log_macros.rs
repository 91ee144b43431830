/// Domain-aware logging macros.
///
/// Each macro injects a `domain` field automatically so callers never need
/// to remember the string literal. The domain value is one of the five
/// areas of this system: `sys` (orchestrator lifecycle), `net` (mobile and
/// desktop client transports), `engine` (transformation engine), `conf`
/// (config/rules store and watchers), `recovery` (the recovery loop).
///
/// # Usage
///
/// ```ignore
/// use crate::log_macros::*;
///
/// bridge_info!(sys, step = "Engine", "initialization step completed");
/// bridge_warn!(recovery, service = "DesktopClient", "reinit attempt failed");
/// bridge_debug!(net, peer = %addr, "heartbeat sent");
/// ```
///
/// The domain identifier is a bare identifier, not a string — the macro
/// converts it to a `&str` literal via `stringify!`.

#[doc(hidden)]
macro_rules! bridge_log {
    ($level:ident, $domain:ident, $($field:tt)*) => {
        tracing::$level!(domain = stringify!($domain), $($field)*)
    };
}

macro_rules! bridge_error {
    ($domain:ident, $($rest:tt)*) => {
        bridge_log!(error, $domain, $($rest)*)
    };
}

macro_rules! bridge_warn {
    ($domain:ident, $($rest:tt)*) => {
        bridge_log!(warn, $domain, $($rest)*)
    };
}

macro_rules! bridge_info {
    ($domain:ident, $($rest:tt)*) => {
        bridge_log!(info, $domain, $($rest)*)
    };
}

macro_rules! bridge_debug {
    ($domain:ident, $($rest:tt)*) => {
        bridge_log!(debug, $domain, $($rest)*)
    };
}

#[allow(unused_macros)]
macro_rules! bridge_trace {
    ($domain:ident, $($rest:tt)*) => {
        bridge_log!(trace, $domain, $($rest)*)
    };
}
