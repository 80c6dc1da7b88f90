//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Behavior Defaults
// =============================================================================

pub fn default_throttle_ms() -> u64 {
    500
}

pub fn default_ping_interval_secs() -> u64 {
    60
}

pub fn default_negotiation_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Log Defaults
// =============================================================================

pub fn default_log_level() -> String {
    "info".to_string()
}
