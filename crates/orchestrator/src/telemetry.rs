//! Prometheus counters

use metrics::{counter, describe_counter};
use site_power::Verdict;

const WEBHOOKS: &str = "adarca_webhooks_total";
const VERDICTS: &str = "adarca_verdicts_total";
const SIDE_EFFECT_FAILURES: &str = "adarca_side_effect_failures_total";

/// Register counter descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(WEBHOOKS, "Alert webhooks received");
    describe_counter!(VERDICTS, "Site power verdicts computed, by verdict");
    describe_counter!(
        SIDE_EFFECT_FAILURES,
        "Ticketing, alerting and social calls that failed, by kind"
    );
}

pub(crate) fn webhook_received() {
    counter!(WEBHOOKS).increment(1);
}

pub(crate) fn verdict_computed(verdict: Verdict) {
    counter!(VERDICTS, "verdict" => verdict.as_str()).increment(1);
}

pub(crate) fn side_effect_failed(kind: &'static str) {
    counter!(SIDE_EFFECT_FAILURES, "kind" => kind).increment(1);
}
