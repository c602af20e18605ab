//! Logging and Signal Recording Module
//!
//! - `init` - tracing subscriber setup (env filter, optional JSON output)
//! - `SignalRecorder` trait - pluggable sink for position changes
//! - `CsvRecorder` - appends records to a CSV file
//! - `TracingRecorder` - structured log lines under the `signals` target

pub mod csv_recorder;
pub mod recorder;
pub mod tracing_recorder;

pub use csv_recorder::CsvRecorder;
pub use recorder::{MultiRecorder, RecordError, SignalRecord, SignalRecorder};
pub use tracing_recorder::TracingRecorder;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level` when set.
pub fn init(default_level: &str, json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
