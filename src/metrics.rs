//! Prometheus metrics for the auth core.
//!
//! - `gatekeeper_tokens_issued_total` - Tokens minted
//! - `gatekeeper_tokens_rejected_total{reason}` - Validation failures by cause
//! - `gatekeeper_tokens_revoked_total` - Revocations recorded
//! - `gatekeeper_logins_total{outcome}` - Login attempts by outcome
//! - `gatekeeper_menu_resolutions_total{path}` - Permission resolutions by path
//! - `gatekeeper_menu_resolution_seconds` - Permission resolution latency
//!
//! Recording is a no-op until [`init`] has been called, so library users and
//! tests never need a registry.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

pub static TOKENS_ISSUED: OnceLock<IntCounter> = OnceLock::new();

pub static TOKENS_REJECTED: OnceLock<IntCounterVec> = OnceLock::new();

pub static TOKENS_REVOKED: OnceLock<IntCounter> = OnceLock::new();

pub static LOGINS: OnceLock<IntCounterVec> = OnceLock::new();

pub static MENU_RESOLUTIONS: OnceLock<IntCounterVec> = OnceLock::new();

pub static MENU_RESOLUTION_LATENCY: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before metrics are exported.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
            }
            let _ = $metric.set(m);
        };
    }

    register!(TOKENS_ISSUED, IntCounter::new("gatekeeper_tokens_issued_total", "Tokens issued"));
    register!(TOKENS_REJECTED, IntCounterVec::new(Opts::new("gatekeeper_tokens_rejected_total", "Token validation failures by reason"), &["reason"]));
    register!(TOKENS_REVOKED, IntCounter::new("gatekeeper_tokens_revoked_total", "Tokens revoked"));
    register!(LOGINS, IntCounterVec::new(Opts::new("gatekeeper_logins_total", "Login attempts by outcome"), &["outcome"]));
    register!(MENU_RESOLUTIONS, IntCounterVec::new(Opts::new("gatekeeper_menu_resolutions_total", "Permission resolutions by path and result"), &["path", "result"]));
    register!(MENU_RESOLUTION_LATENCY, Histogram::with_opts(
        HistogramOpts::new("gatekeeper_menu_resolution_seconds", "Permission resolution latency")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0])));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

#[inline]
pub fn record_token_issued() {
    if let Some(c) = TOKENS_ISSUED.get() {
        c.inc();
    }
}

/// Record a validation failure (`empty`, `malformed`, `expired`, `revoked`, ...).
#[inline]
pub fn record_token_rejected(reason: &str) {
    if let Some(c) = TOKENS_REJECTED.get() {
        c.with_label_values(&[reason]).inc();
    }
}

#[inline]
pub fn record_token_revoked() {
    if let Some(c) = TOKENS_REVOKED.get() {
        c.inc();
    }
}

/// Record a login attempt; `outcome` is `ok` or an error code.
#[inline]
pub fn record_login(outcome: &str) {
    if let Some(c) = LOGINS.get() {
        c.with_label_values(&[outcome]).inc();
    }
}

/// Record a finished permission resolution.
#[inline]
pub fn record_resolution(path: &str, result: &str, duration_secs: f64) {
    if let Some(c) = MENU_RESOLUTIONS.get() {
        c.with_label_values(&[path, result]).inc();
    }
    if let Some(h) = MENU_RESOLUTION_LATENCY.get() {
        h.observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_and_gather() {
        init();
        record_token_issued();
        record_token_rejected("expired");
        record_login("ok");
        record_resolution("regular", "ok", 0.002);

        let text = gather_metrics();
        assert!(text.contains("gatekeeper_tokens_issued_total"));
        assert!(text.contains("reason=\"expired\""));
        assert!(text.contains("outcome=\"ok\""));
        assert!(text.contains("gatekeeper_menu_resolution_seconds"));
    }
}
