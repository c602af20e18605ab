//! CSV Signal Recorder
//!
//! Appends position changes to a CSV file.

use super::recorder::{RecordError, SignalRecord, SignalRecorder};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// CSV file recorder
///
/// Uses `spawn_blocking` to avoid blocking the async runtime during file I/O.
pub struct CsvRecorder {
    file_path: Arc<PathBuf>,
    /// Serialises writes and tracks header state
    state: Arc<Mutex<CsvState>>,
}

struct CsvState {
    header_written: bool,
}

impl CsvRecorder {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path: Arc::new(file_path),
            state: Arc::new(Mutex::new(CsvState {
                header_written: false,
            })),
        }
    }
}

#[async_trait]
impl SignalRecorder for CsvRecorder {
    async fn record(&self, record: &SignalRecord) -> Result<(), RecordError> {
        let file_path = Arc::clone(&self.file_path);
        let state = Arc::clone(&self.state);
        let csv_line = record.to_csv_line();

        tokio::task::spawn_blocking(move || {
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());

            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&*file_path)?;

            if !guard.header_written {
                if file.metadata()?.len() == 0 {
                    writeln!(file, "{}", SignalRecord::csv_header())?;
                }
                guard.header_written = true;
            }

            writeln!(file, "{}", csv_line)?;
            Ok::<(), RecordError>(())
        })
        .await
        .map_err(|e| RecordError::Io(std::io::Error::other(e)))??;

        Ok(())
    }
}
