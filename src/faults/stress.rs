//! CPU and memory stress endpoints.
//!
//! These burn real resources on purpose: CPU workers spin on every core for
//! the requested duration, the memory endpoint allocates and touches the
//! requested number of bytes. Neither observes client disconnects; the
//! requested bound is the only bound.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::server::AppState;
use crate::observability::metrics::FaultType;

/// `GET /api/stress/cpu/{duration}`: spin all cores for the duration.
pub async fn cpu_stress(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    let Ok(duration) = humantime::parse_duration(&raw) else {
        return (
            StatusCode::BAD_REQUEST,
            "Invalid duration format. Use e.g., /api/stress/cpu/10s",
        )
            .into_response();
    };

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    tracing::info!(duration = ?duration, workers, "starting CPU stress");
    state
        .metrics
        .record_fault(FaultType::CpuStress, &format!("/api/stress/cpu/{raw}"));

    let stop = Instant::now() + duration;
    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        handles.push(tokio::task::spawn_blocking(move || {
            while Instant::now() < stop {
                std::hint::black_box(1000u64 * 1000 / 1000 * 1000);
            }
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }

    tracing::info!(duration = ?duration, "finished CPU stress");
    (
        StatusCode::OK,
        format!("CPU stressed for {raw} using {workers} cores. Now back to normal."),
    )
        .into_response()
}

/// `GET /api/stress/mem/{size}`: allocate and touch `size` bytes.
pub async fn memory_stress(State(state): State<AppState>, Path(size): Path<String>) -> Response {
    let Some(bytes) = parse_memory_size(&size) else {
        return (
            StatusCode::BAD_REQUEST,
            "Invalid memory size format. Use e.g., /api/stress/mem/100MB",
        )
            .into_response();
    };

    let size_label = size.clone();
    let buffer = tokio::task::spawn_blocking(move || {
        let mut buffer = vec![0u8; bytes];
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = (i % 256) as u8;
        }
        buffer
    })
    .await
    .unwrap_or_default();
    std::hint::black_box(&buffer);

    tracing::info!(size = %size_label, bytes, "allocated stress memory");
    state
        .metrics
        .record_fault(FaultType::MemoryStress, &format!("/api/stress/mem/{size_label}"));

    (
        StatusCode::OK,
        format!("Allocated {size_label} of memory. May impact performance until the buffer is released."),
    )
        .into_response()
}

/// Parse a size with a `KB`, `MB`, or `GB` suffix.
fn parse_memory_size(raw: &str) -> Option<usize> {
    let upper = raw.to_uppercase();
    let (digits, multiplier) = if let Some(d) = upper.strip_suffix("GB") {
        (d, 1024 * 1024 * 1024)
    } else if let Some(d) = upper.strip_suffix("MB") {
        (d, 1024 * 1024)
    } else if let Some(d) = upper.strip_suffix("KB") {
        (d, 1024)
    } else {
        return None;
    };
    digits.parse::<usize>().ok().map(|v| v * multiplier)
}
