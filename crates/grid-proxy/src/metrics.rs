use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::refresher::CycleReport;
use crate::state::AppState;

#[derive(Debug, Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub requests_inflight: AtomicU64,
    pub status_2xx: AtomicU64,
    pub status_4xx: AtomicU64,
    pub status_5xx: AtomicU64,

    pub refresh_cycles_total: AtomicU64,
    pub refresh_nodes_ok_total: AtomicU64,
    pub refresh_nodes_failed_total: AtomicU64,
    pub refresh_last_cycle_ms: AtomicU64,
    pub probes_inflight: AtomicU64,
    pub probes_inflight_high_water: AtomicU64,
}

impl Metrics {
    pub fn probe_started(&self) {
        let now = self.probes_inflight.fetch_add(1, Ordering::SeqCst) + 1;
        self.probes_inflight_high_water
            .fetch_max(now, Ordering::SeqCst);
    }

    pub fn probe_finished(&self) {
        self.probes_inflight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn record_cycle(&self, report: &CycleReport) {
        self.refresh_cycles_total.fetch_add(1, Ordering::Relaxed);
        self.refresh_nodes_ok_total
            .fetch_add(report.ok as u64, Ordering::Relaxed);
        self.refresh_nodes_failed_total
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.refresh_last_cycle_ms
            .store(report.elapsed_ms, Ordering::Relaxed);
    }

    pub fn render(&self) -> String {
        let lines = [
            ("grid_proxy_requests_total", &self.requests_total),
            ("grid_proxy_requests_inflight", &self.requests_inflight),
            ("grid_proxy_responses_2xx", &self.status_2xx),
            ("grid_proxy_responses_4xx", &self.status_4xx),
            ("grid_proxy_responses_5xx", &self.status_5xx),
            ("grid_proxy_refresh_cycles_total", &self.refresh_cycles_total),
            ("grid_proxy_refresh_nodes_ok_total", &self.refresh_nodes_ok_total),
            ("grid_proxy_refresh_nodes_failed_total", &self.refresh_nodes_failed_total),
            ("grid_proxy_refresh_last_cycle_ms", &self.refresh_last_cycle_ms),
            ("grid_proxy_probes_inflight", &self.probes_inflight),
            ("grid_proxy_probes_inflight_high_water", &self.probes_inflight_high_water),
        ];
        let mut body = String::new();
        for (name, value) in lines {
            body.push_str(name);
            body.push(' ');
            body.push_str(&value.load(Ordering::Relaxed).to_string());
            body.push('\n');
        }
        body
    }
}

pub async fn metrics_handler(State(st): State<AppState>) -> impl IntoResponse {
    (axum::http::StatusCode::OK, st.metrics.render())
}

pub async fn track_requests(
    State(st): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, std::convert::Infallible> {
    st.metrics.requests_inflight.fetch_add(1, Ordering::Relaxed);
    let resp = next.run(req).await;
    st.metrics.requests_inflight.fetch_sub(1, Ordering::Relaxed);
    st.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let status = resp.status().as_u16();
    if status >= 500 {
        st.metrics.status_5xx.fetch_add(1, Ordering::Relaxed);
    } else if status >= 400 {
        st.metrics.status_4xx.fetch_add(1, Ordering::Relaxed);
    } else if status >= 200 {
        st.metrics.status_2xx.fetch_add(1, Ordering::Relaxed);
    }

    Ok(resp)
}
