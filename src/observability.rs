use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("parley.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("parley.client.request_errors");

pub(crate) static KEEPALIVE_PINGS: Counter = Counter::new("parley.keepalive.pings");
pub(crate) static KEEPALIVE_FAILURES: Counter = Counter::new("parley.keepalive.failures");

pub(crate) static STREAM_FRAMES: Counter = Counter::new("parley.stream.frames");
pub(crate) static STREAM_SKIPPED: Counter = Counter::new("parley.stream.skipped");
pub(crate) static STREAM_BYTES: Counter = Counter::new("parley.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("parley.stream.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&KEEPALIVE_PINGS);
    collector.register_counter(&KEEPALIVE_FAILURES);

    collector.register_counter(&STREAM_FRAMES);
    collector.register_counter(&STREAM_SKIPPED);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);
}
