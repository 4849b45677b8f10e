use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, IntCounter, TextEncoder, opts, register_histogram, register_int_counter,
};

pub static BROADCASTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "broadcast_broadcasts_total",
        "Total number of broadcasts sent"
    ))
    .unwrap()
});

pub static MESSAGES_STORED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "broadcast_messages_stored_total",
        "Total number of message rows stored (one per addressed group)"
    ))
    .unwrap()
});

pub static PUSH_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "broadcast_push_sent_total",
        "Total number of push notifications accepted by the provider"
    ))
    .unwrap()
});

pub static PUSH_FAILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "broadcast_push_failed_total",
        "Total number of push notifications that failed"
    ))
    .unwrap()
});

pub static EXPIRED_MESSAGES_DELETED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "broadcast_expired_messages_deleted_total",
        "Total number of expired messages removed by cleanup"
    ))
    .unwrap()
});

pub static PUSH_FANOUT_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "broadcast_push_fanout_seconds",
        "Histogram of the time taken to push one broadcast to all devices"
    )
    .unwrap()
});

pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}
