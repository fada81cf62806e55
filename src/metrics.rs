use std::{
    collections::BTreeMap,
    sync::{Mutex, OnceLock},
};

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

struct MetricsState {
    total: u64,
    errors: u64,
    per_endpoint: BTreeMap<String, u64>,
    per_endpoint_err: BTreeMap<String, u64>,
    // 探测：按链统计成功/失败
    probe_ok: BTreeMap<String, u64>,
    probe_fail: BTreeMap<String, u64>,
    // 探测时延分桶（毫秒）：<100, <250, <500, <1000, <5000, >=5000
    probe_latency_sum_ms: u128,
    probe_hist_buckets: [u64; 6],
    // 解析结果：按决策分支统计
    resolutions: BTreeMap<&'static str, u64>,
    // 提交：接受 / 按原因拒绝
    submissions_accepted: u64,
    submissions_rejected: BTreeMap<&'static str, u64>,
}

fn state() -> std::sync::MutexGuard<'static, MetricsState> {
    let m = METRICS.get_or_init(|| {
        Mutex::new(MetricsState {
            total: 0,
            errors: 0,
            per_endpoint: BTreeMap::new(),
            per_endpoint_err: BTreeMap::new(),
            probe_ok: BTreeMap::new(),
            probe_fail: BTreeMap::new(),
            probe_latency_sum_ms: 0,
            probe_hist_buckets: [0; 6],
            resolutions: BTreeMap::new(),
            submissions_accepted: 0,
            submissions_rejected: BTreeMap::new(),
        })
    });
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    }
}

pub fn count_ok(endpoint: &str) {
    let mut s = state();
    s.total += 1;
    *s.per_endpoint.entry(endpoint.to_string()).or_insert(0) += 1;
}

pub fn count_err(endpoint: &str) {
    let mut s = state();
    s.total += 1;
    s.errors += 1;
    *s.per_endpoint.entry(endpoint.to_string()).or_insert(0) += 1;
    *s.per_endpoint_err.entry(endpoint.to_string()).or_insert(0) += 1;
}

/// 记录一次探测
pub fn observe_probe(chain: &str, ok: bool, latency_ms: u128) {
    let mut s = state();
    let counter = if ok {
        &mut s.probe_ok
    } else {
        &mut s.probe_fail
    };
    *counter.entry(chain.to_string()).or_insert(0) += 1;

    s.probe_latency_sum_ms += latency_ms;
    let idx = match latency_ms {
        0..=99 => 0,
        100..=249 => 1,
        250..=499 => 2,
        500..=999 => 3,
        1000..=4999 => 4,
        _ => 5,
    };
    s.probe_hist_buckets[idx] += 1;
}

/// 记录一次解析（outcome 为决策分支名）
pub fn inc_resolution(outcome: &'static str) {
    *state().resolutions.entry(outcome).or_insert(0) += 1;
}

pub fn inc_submission_accepted() {
    state().submissions_accepted += 1;
}

pub fn inc_submission_rejected(reason: &'static str) {
    *state().submissions_rejected.entry(reason).or_insert(0) += 1;
}

pub fn render_prometheus() -> String {
    let s = state();
    let mut out = String::new();
    out.push_str("# HELP oneescrow_requests_total Total requests\n");
    out.push_str("# TYPE oneescrow_requests_total counter\n");
    out.push_str(&format!("oneescrow_requests_total {}\n", s.total));

    out.push_str("# HELP oneescrow_errors_total Total error responses\n");
    out.push_str("# TYPE oneescrow_errors_total counter\n");
    out.push_str(&format!("oneescrow_errors_total {}\n", s.errors));

    out.push_str("# HELP oneescrow_requests_by_endpoint Requests by endpoint\n");
    out.push_str("# TYPE oneescrow_requests_by_endpoint counter\n");
    for (ep, v) in s.per_endpoint.iter() {
        out.push_str(&format!(
            "oneescrow_requests_by_endpoint{{endpoint=\"{}\"}} {}\n",
            ep, v
        ));
    }
    out.push_str("# HELP oneescrow_errors_by_endpoint Error responses by endpoint\n");
    out.push_str("# TYPE oneescrow_errors_by_endpoint counter\n");
    for (ep, v) in s.per_endpoint_err.iter() {
        out.push_str(&format!(
            "oneescrow_errors_by_endpoint{{endpoint=\"{}\"}} {}\n",
            ep, v
        ));
    }

    out.push_str("# HELP oneescrow_probe_total Chain activity probes by chain and result\n");
    out.push_str("# TYPE oneescrow_probe_total counter\n");
    for (chain, v) in s.probe_ok.iter() {
        out.push_str(&format!(
            "oneescrow_probe_total{{chain=\"{}\",result=\"ok\"}} {}\n",
            chain, v
        ));
    }
    for (chain, v) in s.probe_fail.iter() {
        out.push_str(&format!(
            "oneescrow_probe_total{{chain=\"{}\",result=\"fail\"}} {}\n",
            chain, v
        ));
    }

    out.push_str("# HELP oneescrow_probe_latency_ms Probe latency histogram (ms)\n");
    out.push_str("# TYPE oneescrow_probe_latency_ms histogram\n");
    let bounds = ["100", "250", "500", "1000", "5000", "+Inf"];
    let mut cumulative = 0u64;
    for (i, le) in bounds.iter().enumerate() {
        cumulative += s.probe_hist_buckets[i];
        out.push_str(&format!(
            "oneescrow_probe_latency_ms_bucket{{le=\"{}\"}} {}\n",
            le, cumulative
        ));
    }
    out.push_str(&format!(
        "oneescrow_probe_latency_ms_sum {}\n",
        s.probe_latency_sum_ms
    ));
    out.push_str(&format!("oneescrow_probe_latency_ms_count {}\n", cumulative));

    out.push_str("# HELP oneescrow_resolutions_total Chain resolutions by decision\n");
    out.push_str("# TYPE oneescrow_resolutions_total counter\n");
    for (outcome, v) in s.resolutions.iter() {
        out.push_str(&format!(
            "oneescrow_resolutions_total{{outcome=\"{}\"}} {}\n",
            outcome, v
        ));
    }

    out.push_str("# HELP oneescrow_submissions_accepted_total Accepted address submissions\n");
    out.push_str("# TYPE oneescrow_submissions_accepted_total counter\n");
    out.push_str(&format!(
        "oneescrow_submissions_accepted_total {}\n",
        s.submissions_accepted
    ));
    out.push_str("# HELP oneescrow_submissions_rejected_total Rejected address submissions\n");
    out.push_str("# TYPE oneescrow_submissions_rejected_total counter\n");
    for (reason, v) in s.submissions_rejected.iter() {
        out.push_str(&format!(
            "oneescrow_submissions_rejected_total{{reason=\"{}\"}} {}\n",
            reason, v
        ));
    }

    out
}
