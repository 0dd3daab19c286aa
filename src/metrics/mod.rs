/*!
 * # Metrics Module
 *
 * In-process counters for the part master registries, exposed in Prometheus
 * text format at `/metrics`.
 *
 * - HTTP request counts by status class, with latency totals
 * - Registry writes (created/updated/deleted items and BOM lines)
 * - Duplicate-key conflicts and create retries
 * - Bulk and spreadsheet row failures
 */

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Count and sum only; sums are kept in microseconds so sub-second
/// observations survive the integer store.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    sum_micros: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, value: Duration) {
        self.sum_micros
            .fetch_add(value.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum_seconds(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<String, Counter>,
    histograms: DashMap<String, Histogram>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_counter(&self, name: &str) -> Counter {
        self.counters
            .entry(name.to_string())
            .or_insert_with(Counter::new)
            .clone()
    }

    pub fn get_or_create_histogram(&self, name: &str) -> Histogram {
        self.histograms
            .entry(name.to_string())
            .or_insert_with(Histogram::new)
            .clone()
    }

    /// Prometheus text exposition, sorted by metric name.
    pub fn export_metrics(&self) -> String {
        let mut counters: Vec<(String, u64)> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().get()))
            .collect();
        counters.sort();

        let mut histograms: Vec<(String, u64, f64)> = self
            .histograms
            .iter()
            .map(|entry| {
                let h = entry.value();
                (entry.key().clone(), h.get_count(), h.get_sum_seconds())
            })
            .collect();
        histograms.sort_by(|a, b| a.0.cmp(&b.0));

        let mut output = String::new();
        for (name, value) in counters {
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!("{} {}\n", name, value));
        }
        for (name, count, sum) in histograms {
            output.push_str(&format!("# TYPE {} summary\n", name));
            output.push_str(&format!("{}_count {}\n", name, count));
            output.push_str(&format!("{}_sum {}\n", name, sum));
        }
        output
    }

    pub fn export_metrics_json(&self) -> serde_json::Value {
        let mut counters = serde_json::Map::new();
        for entry in self.counters.iter() {
            counters.insert(entry.key().clone(), json!(entry.value().get()));
        }

        let mut histograms = serde_json::Map::new();
        for entry in self.histograms.iter() {
            let h = entry.value();
            histograms.insert(
                entry.key().clone(),
                json!({ "count": h.get_count(), "sum": h.get_sum_seconds() }),
            );
        }

        json!({ "counters": counters, "histograms": histograms })
    }
}

lazy_static::lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
    pub static ref REGISTRY_METRICS: RegistryMetrics = RegistryMetrics::new();
    pub static ref HTTP_METRICS: HttpMetrics = HttpMetrics::new();
}

/// Write-side counters for the item and BOM registries.
pub struct RegistryMetrics {
    pub items_created: Counter,
    pub items_updated: Counter,
    pub items_deleted: Counter,
    pub bom_lines_created: Counter,
    pub bom_lines_updated: Counter,
    pub bom_lines_deleted: Counter,
    pub duplicate_key_conflicts: Counter,
    pub create_retries: Counter,
    pub version_conflicts: Counter,
    pub bulk_row_failures: Counter,
    pub spreadsheet_rows_imported: Counter,
}

impl RegistryMetrics {
    pub fn new() -> Self {
        Self {
            items_created: METRICS.get_or_create_counter("partmaster_items_created_total"),
            items_updated: METRICS.get_or_create_counter("partmaster_items_updated_total"),
            items_deleted: METRICS.get_or_create_counter("partmaster_items_deleted_total"),
            bom_lines_created: METRICS.get_or_create_counter("partmaster_bom_lines_created_total"),
            bom_lines_updated: METRICS.get_or_create_counter("partmaster_bom_lines_updated_total"),
            bom_lines_deleted: METRICS.get_or_create_counter("partmaster_bom_lines_deleted_total"),
            duplicate_key_conflicts: METRICS
                .get_or_create_counter("partmaster_duplicate_key_conflicts_total"),
            create_retries: METRICS.get_or_create_counter("partmaster_create_retries_total"),
            version_conflicts: METRICS.get_or_create_counter("partmaster_version_conflicts_total"),
            bulk_row_failures: METRICS.get_or_create_counter("partmaster_bulk_row_failures_total"),
            spreadsheet_rows_imported: METRICS
                .get_or_create_counter("partmaster_spreadsheet_rows_imported_total"),
        }
    }
}

impl Default for RegistryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub struct HttpMetrics {
    pub requests_total: Counter,
    pub request_duration: Histogram,
    pub status_2xx: Counter,
    pub status_4xx: Counter,
    pub status_5xx: Counter,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: METRICS.get_or_create_counter("http_requests_total"),
            request_duration: METRICS.get_or_create_histogram("http_request_duration_seconds"),
            status_2xx: METRICS.get_or_create_counter("http_status_2xx_total"),
            status_4xx: METRICS.get_or_create_counter("http_status_4xx_total"),
            status_5xx: METRICS.get_or_create_counter("http_status_5xx_total"),
        }
    }

    pub fn record_request(&self, duration: Duration, status_code: u16) {
        self.requests_total.inc();
        self.request_duration.observe(duration);

        match status_code {
            200..=299 => self.status_2xx.inc(),
            400..=499 => self.status_4xx.inc(),
            500..=599 => self.status_5xx.inc(),
            _ => {}
        }
    }
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records every request's status class and latency.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    HTTP_METRICS.record_request(start.elapsed(), response.status().as_u16());
    response
}

/// Prometheus scrape endpoint.
pub async fn metrics_handler() -> Response {
    let body = METRICS.export_metrics();
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

pub async fn metrics_json_handler() -> axum::Json<serde_json::Value> {
    axum::Json(METRICS.export_metrics_json())
}
