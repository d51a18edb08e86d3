//! Tunable configuration for the acquisition shim and the scheduling policy.
//!
//! All tunables have built-in defaults and may be overridden through the
//! process environment at startup. Malformed values are never fatal: the
//! offending variable falls back to its default and a warning is logged.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default spin budget: bounded trylock retries before the yield phase.
pub const DEFAULT_SPIN_BUDGET: u32 = 100;

/// Default yield budget: voluntary-yield retries before blocking fallback.
pub const DEFAULT_YIELD_BUDGET: u32 = 64;

/// Default fallback threshold in microseconds.
pub const DEFAULT_FALLBACK_US: u64 = 500;

/// Default hash salt mixed into bucket/tag derivation.
pub const DEFAULT_HASH_SALT: u64 = 0x1234_5678_dead_beef;

/// Default baseline time slice (5ms).
pub const DEFAULT_BASELINE_SLICE: Duration = Duration::from_millis(5);

/// Default short slice granted to lock waiters (1ms).
pub const DEFAULT_WAITER_SLICE: Duration = Duration::from_millis(1);

/// Default slice multiplier for threads inside a critical section.
pub const DEFAULT_CS_SLICE_MULTIPLIER: u32 = 4;

// ---------------------------------------------------------------------------
// SliceConfig
// ---------------------------------------------------------------------------

/// Time-slice tunables consumed by the scheduling policy at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceConfig {
    /// Slice granted to tasks with no active hint.
    pub baseline: Duration,
    /// Short slice granted to tasks with an active waiter hint.
    pub waiter: Duration,
    /// Multiplier applied to `baseline` for tasks inside a critical section.
    pub cs_multiplier: u32,
}

impl SliceConfig {
    /// Slice granted to a task currently inside a critical section.
    #[inline]
    #[must_use]
    pub fn in_cs(&self) -> Duration {
        self.baseline * self.cs_multiplier
    }
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE_SLICE,
            waiter: DEFAULT_WAITER_SLICE,
            cs_multiplier: DEFAULT_CS_SLICE_MULTIPLIER,
        }
    }
}

// ---------------------------------------------------------------------------
// HintConfig
// ---------------------------------------------------------------------------

/// Process-wide configuration for hint publication and acquisition budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintConfig {
    /// Whether hint publication is enabled at all. When false every wrapped
    /// operation behaves exactly like the unwrapped primitive.
    pub enabled: bool,
    /// Trylock retries in the spin phase.
    pub spin_budget: u32,
    /// Voluntary-yield retries before escalating to a blocking acquisition.
    pub yield_budget: u32,
    /// Elapsed-time bound on the yield phase.
    pub fallback_threshold: Duration,
    /// Salt mixed into the ownership-table hash and tag derivation.
    pub hash_salt: u64,
    /// Time-slice tunables forwarded to the scheduling policy.
    pub slices: SliceConfig,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spin_budget: DEFAULT_SPIN_BUDGET,
            yield_budget: DEFAULT_YIELD_BUDGET,
            fallback_threshold: Duration::from_micros(DEFAULT_FALLBACK_US),
            hash_salt: DEFAULT_HASH_SALT,
            slices: SliceConfig::default(),
        }
    }
}

impl HintConfig {
    /// Build a config from the process environment.
    ///
    /// Recognized variables: `LOCKHINT_ENABLED` (`0` disables),
    /// `LOCKHINT_SPIN_BUDGET`, `LOCKHINT_YIELD_BUDGET`,
    /// `LOCKHINT_FALLBACK_US`, `LOCKHINT_HASH_SALT` (hexadecimal).
    ///
    /// Unset variables keep their defaults. Malformed values keep their
    /// defaults and log a warning (never fatal).
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup (testable seam for
    /// [`HintConfig::from_env`]).
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(raw) = lookup("LOCKHINT_ENABLED") {
            cfg.enabled = raw.trim() != "0";
        }
        if let Some(v) = parse_var(&lookup, "LOCKHINT_SPIN_BUDGET", parse_u32) {
            cfg.spin_budget = v;
        }
        if let Some(v) = parse_var(&lookup, "LOCKHINT_YIELD_BUDGET", parse_u32) {
            cfg.yield_budget = v;
        }
        if let Some(v) = parse_var(&lookup, "LOCKHINT_FALLBACK_US", parse_u64) {
            cfg.fallback_threshold = Duration::from_micros(v);
        }
        if let Some(v) = parse_var(&lookup, "LOCKHINT_HASH_SALT", parse_hex_u64) {
            cfg.hash_salt = v;
        }

        cfg
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(name)?;
    match parse(raw.trim()) {
        Some(v) => Some(v),
        None => {
            warn!(name, value = %raw, "malformed tunable, keeping default");
            None
        }
    }
}

fn parse_u32(s: &str) -> Option<u32> {
    s.parse().ok()
}

fn parse_u64(s: &str) -> Option<u64> {
    s.parse().ok()
}

fn parse_hex_u64(s: &str) -> Option<u64> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = HintConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.spin_budget, 100);
        assert_eq!(cfg.yield_budget, 64);
        assert_eq!(cfg.fallback_threshold, Duration::from_micros(500));
        assert_eq!(cfg.hash_salt, DEFAULT_HASH_SALT);
        assert_eq!(cfg.slices.baseline, Duration::from_millis(5));
        assert_eq!(cfg.slices.waiter, Duration::from_millis(1));
        assert_eq!(cfg.slices.in_cs(), Duration::from_millis(20));
    }

    #[test]
    fn test_env_overrides() {
        let cfg = HintConfig::from_lookup(lookup_from(&[
            ("LOCKHINT_SPIN_BUDGET", "10"),
            ("LOCKHINT_YIELD_BUDGET", "8"),
            ("LOCKHINT_FALLBACK_US", "250"),
            ("LOCKHINT_HASH_SALT", "0xabcdef"),
        ]));
        assert_eq!(cfg.spin_budget, 10);
        assert_eq!(cfg.yield_budget, 8);
        assert_eq!(cfg.fallback_threshold, Duration::from_micros(250));
        assert_eq!(cfg.hash_salt, 0xab_cdef);
        assert!(cfg.enabled);
    }

    #[test]
    fn test_env_disable() {
        let cfg = HintConfig::from_lookup(lookup_from(&[("LOCKHINT_ENABLED", "0")]));
        assert!(!cfg.enabled);

        let cfg = HintConfig::from_lookup(lookup_from(&[("LOCKHINT_ENABLED", "1")]));
        assert!(cfg.enabled);
    }

    #[test]
    fn test_malformed_values_keep_defaults() {
        let cfg = HintConfig::from_lookup(lookup_from(&[
            ("LOCKHINT_SPIN_BUDGET", "lots"),
            ("LOCKHINT_FALLBACK_US", "-3"),
            ("LOCKHINT_HASH_SALT", "0xzz"),
        ]));
        assert_eq!(cfg.spin_budget, DEFAULT_SPIN_BUDGET);
        assert_eq!(cfg.fallback_threshold, Duration::from_micros(DEFAULT_FALLBACK_US));
        assert_eq!(cfg.hash_salt, DEFAULT_HASH_SALT);
    }

    #[test]
    fn test_salt_without_prefix() {
        let cfg = HintConfig::from_lookup(lookup_from(&[("LOCKHINT_HASH_SALT", "deadbeef")]));
        assert_eq!(cfg.hash_salt, 0xdead_beef);
    }
}
