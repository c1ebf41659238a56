use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, OnceLock},
};

static METRICS: OnceLock<Mutex<MetricsState>> = OnceLock::new();

// 上游时延分桶上界（毫秒），最后一个桶为 +Inf
const LATENCY_BOUNDS_MS: [u128; 5] = [50, 100, 250, 500, 1000];

#[derive(Default)]
struct UpstreamStats {
    ok: u64,
    err: u64,
    latency_sum_ms: u128,
    buckets: [u64; LATENCY_BOUNDS_MS.len() + 1],
}

#[derive(Default)]
struct MetricsState {
    total: u64,
    errors: u64,
    per_endpoint: BTreeMap<&'static str, u64>,
    per_endpoint_err: BTreeMap<&'static str, u64>,
    node_sessions_opened: u64,
    node_sessions_closed: u64,
    wallets_created: u64,
    // "node" / "indexer"
    upstream: BTreeMap<&'static str, UpstreamStats>,
}

fn state() -> MutexGuard<'static, MetricsState> {
    let lock = METRICS.get_or_init(|| Mutex::new(MetricsState::default()));
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(), // 避免因锁污染导致 panic
    }
}

pub fn count_ok(endpoint: &'static str) {
    let mut s = state();
    s.total += 1;
    *s.per_endpoint.entry(endpoint).or_insert(0) += 1;
}

pub fn count_err(endpoint: &'static str) {
    let mut s = state();
    s.total += 1;
    s.errors += 1;
    *s.per_endpoint.entry(endpoint).or_insert(0) += 1;
    *s.per_endpoint_err.entry(endpoint).or_insert(0) += 1;
}

pub fn inc_node_session_opened() {
    state().node_sessions_opened += 1;
}

pub fn inc_node_session_closed() {
    state().node_sessions_closed += 1;
}

pub fn inc_wallets_created() {
    state().wallets_created += 1;
}

pub fn observe_upstream_latency_ms(upstream: &'static str, latency_ms: u128, ok: bool) {
    let mut s = state();
    let stats = s.upstream.entry(upstream).or_default();
    if ok {
        stats.ok += 1;
    } else {
        stats.err += 1;
    }
    stats.latency_sum_ms += latency_ms;
    let bucket = LATENCY_BOUNDS_MS
        .iter()
        .position(|bound| latency_ms < *bound)
        .unwrap_or(LATENCY_BOUNDS_MS.len());
    stats.buckets[bucket] += 1;
}

/// 当前打开的会话数（已打开 - 已关闭）
pub fn open_node_sessions() -> u64 {
    let s = state();
    s.node_sessions_opened.saturating_sub(s.node_sessions_closed)
}

fn counter(out: &mut String, name: &str, help: &str, value: impl std::fmt::Display) {
    out.push_str(&format!("# HELP xode_gateway_{} {}\n", name, help));
    out.push_str(&format!("# TYPE xode_gateway_{} counter\n", name));
    out.push_str(&format!("xode_gateway_{} {}\n", name, value));
}

pub fn render_prometheus() -> String {
    let s = state();
    let mut out = String::new();

    counter(&mut out, "requests_total", "Total requests", s.total);
    counter(&mut out, "errors_total", "Total error responses", s.errors);

    out.push_str("# HELP xode_gateway_endpoint_requests_total Requests per endpoint\n");
    out.push_str("# TYPE xode_gateway_endpoint_requests_total counter\n");
    for (k, v) in s.per_endpoint.iter() {
        out.push_str(&format!(
            "xode_gateway_endpoint_requests_total{{endpoint=\"{}\"}} {}\n",
            k, v
        ));
    }

    out.push_str("# HELP xode_gateway_endpoint_errors_total Errors per endpoint\n");
    out.push_str("# TYPE xode_gateway_endpoint_errors_total counter\n");
    for (k, v) in s.per_endpoint_err.iter() {
        out.push_str(&format!(
            "xode_gateway_endpoint_errors_total{{endpoint=\"{}\"}} {}\n",
            k, v
        ));
    }

    counter(
        &mut out,
        "node_sessions_opened_total",
        "Node sessions opened",
        s.node_sessions_opened,
    );
    counter(
        &mut out,
        "node_sessions_closed_total",
        "Node sessions closed",
        s.node_sessions_closed,
    );
    counter(
        &mut out,
        "wallets_created_total",
        "Wallets created",
        s.wallets_created,
    );

    // 上游统计
    out.push_str("# HELP xode_gateway_upstream_requests_total Upstream requests\n");
    out.push_str("# TYPE xode_gateway_upstream_requests_total counter\n");
    for (name, stats) in s.upstream.iter() {
        out.push_str(&format!(
            "xode_gateway_upstream_requests_total{{upstream=\"{}\",result=\"ok\"}} {}\n",
            name, stats.ok
        ));
        out.push_str(&format!(
            "xode_gateway_upstream_requests_total{{upstream=\"{}\",result=\"err\"}} {}\n",
            name, stats.err
        ));
    }

    out.push_str("# HELP xode_gateway_upstream_latency_ms Upstream latency histogram\n");
    out.push_str("# TYPE xode_gateway_upstream_latency_ms histogram\n");
    for (name, stats) in s.upstream.iter() {
        let mut cumulative = 0u64;
        for (i, bound) in LATENCY_BOUNDS_MS.iter().enumerate() {
            cumulative += stats.buckets[i];
            out.push_str(&format!(
                "xode_gateway_upstream_latency_ms_bucket{{upstream=\"{}\",le=\"{}\"}} {}\n",
                name, bound, cumulative
            ));
        }
        let count: u64 = stats.buckets.iter().sum();
        out.push_str(&format!(
            "xode_gateway_upstream_latency_ms_bucket{{upstream=\"{}\",le=\"+Inf\"}} {}\n",
            name, count
        ));
        out.push_str(&format!(
            "xode_gateway_upstream_latency_ms_sum{{upstream=\"{}\"}} {}\n",
            name, stats.latency_sum_ms
        ));
        out.push_str(&format!(
            "xode_gateway_upstream_latency_ms_count{{upstream=\"{}\"}} {}\n",
            name, count
        ));
    }

    out
}
