//! Metrics for the client and encoder side of the streaming core, exported
//! via OTLP to whatever collector the operator points `OTEL_EXPORTER_OTLP_ENDPOINT`
//! at.

use anyhow::Result;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter, MeterProvider, UpDownCounter},
    KeyValue,
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use tracing::info;

/// Pre-built metrics instruments shared across handlers and the encoder
/// supervision layer.
#[derive(Clone)]
pub struct AppObservability {
    pub meter: Meter,

    pub client_connections: Counter<u64>,
    pub active_clients: UpDownCounter<i64>,
    pub bytes_sent: Counter<u64>,
    pub bytes_received: Counter<u64>,
    pub client_session_duration: Histogram<f64>,
    pub transfer_rate: Histogram<f64>,

    pub encoder_starts: Counter<u64>,
    pub encoder_stops: Counter<u64>,
    pub active_encoders: UpDownCounter<i64>,
    pub encoder_crashes: Counter<u64>,
    pub encoder_uptime: Histogram<f64>,
}

impl AppObservability {
    pub fn new(service_name: &str) -> Result<Self> {
        let provider = SdkMeterProvider::builder().build();
        global::set_meter_provider(provider.clone());

        let meter = provider.meter("airtime");

        if let Ok(otlp_endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
            info!("OpenTelemetry configured: OTLP export to {otlp_endpoint} for {service_name}");
        } else {
            info!("OpenTelemetry configured: local metrics only, OTLP endpoint not set");
        }

        Ok(Self::build_with_instruments(meter))
    }

    fn build_with_instruments(meter: Meter) -> Self {
        let client_connections = meter.u64_counter("client_connections_total").with_description("Total client connections").build();
        let active_clients = meter.i64_up_down_counter("active_clients").with_description("Currently active clients").build();
        let bytes_sent = meter.u64_counter("bytes_sent_total").with_description("Total bytes sent to clients").build();
        let bytes_received = meter.u64_counter("bytes_received_total").with_description("Total bytes received from the encoder").build();
        let client_session_duration = meter
            .f64_histogram("client_session_duration_seconds")
            .with_description("Duration of client streaming sessions")
            .build();
        let transfer_rate = meter.f64_histogram("transfer_rate_bytes_per_second").with_description("Observed client transfer rate").build();

        let encoder_starts = meter.u64_counter("encoder_starts_total").with_description("ffmpeg processes spawned").build();
        let encoder_stops = meter.u64_counter("encoder_stops_total").with_description("ffmpeg processes that exited cleanly").build();
        let active_encoders = meter.i64_up_down_counter("active_encoders").with_description("Currently running ffmpeg processes").build();
        let encoder_crashes = meter.u64_counter("encoder_crashes_total").with_description("ffmpeg processes that exited abnormally").build();
        let encoder_uptime = meter.f64_histogram("encoder_uptime_seconds").with_description("ffmpeg process lifetime").build();

        Self {
            meter,
            client_connections,
            active_clients,
            bytes_sent,
            bytes_received,
            client_session_duration,
            transfer_rate,
            encoder_starts,
            encoder_stops,
            active_encoders,
            encoder_crashes,
            encoder_uptime,
        }
    }

    pub fn record_client_connected(&self, channel: u32) {
        self.client_connections.add(1, &[KeyValue::new("channel", channel.to_string())]);
        self.active_clients.add(1, &[KeyValue::new("channel", channel.to_string())]);
    }

    pub fn record_client_disconnected(&self, channel: u32, bytes_sent: u64, duration_secs: f64) {
        let labels = [KeyValue::new("channel", channel.to_string())];
        self.active_clients.add(-1, &labels);
        self.bytes_sent.add(bytes_sent, &labels);
        self.client_session_duration.record(duration_secs, &labels);
        if duration_secs > 0.0 {
            self.transfer_rate.record(bytes_sent as f64 / duration_secs, &labels);
        }
    }

    pub fn record_encoder_started(&self, channel: u32) {
        self.encoder_starts.add(1, &[KeyValue::new("channel", channel.to_string())]);
        self.active_encoders.add(1, &[KeyValue::new("channel", channel.to_string())]);
    }

    pub fn record_encoder_exited(&self, channel: u32, crashed: bool, uptime_secs: f64) {
        let labels = [KeyValue::new("channel", channel.to_string())];
        self.active_encoders.add(-1, &labels);
        self.encoder_uptime.record(uptime_secs, &labels);
        if crashed {
            self.encoder_crashes.add(1, &labels);
        } else {
            self.encoder_stops.add(1, &labels);
        }
    }
}
