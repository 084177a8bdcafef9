//! Capability policy: the allow-list of domains a remote command may act on.
//!
//! This is a least-privilege gate checked before any service call reaches the
//! local API, independent of what the remote server requests. Unknown domains
//! are simply not allowed; there is no error path.

/// Domains that remote `call_service` commands may target.
const ALLOWED_DOMAINS: &[&str] = &[
    "light",
    "switch",
    "climate",
    "cover",
    "lock",
    "fan",
    "media_player",
    "scene",
    "vacuum",
    "input_boolean",
    "alarm_control_panel",
    "humidifier",
    "water_heater",
    "script",
    "automation",
    "input_select",
    "input_number",
    "input_text",
];

/// Whether a domain may be targeted by a remote service call.
pub fn is_allowed(domain: &str) -> bool {
    ALLOWED_DOMAINS.contains(&domain)
}
