//! LogSink - logs snapshot summaries via tracing

use std::collections::HashMap;

use contracts::{ContractError, DataSink, OutgoingSnapshot};
use tracing::{info, instrument};

/// Sink that logs snapshot summaries for debugging
///
/// Only every `every`-th snapshot is logged; the fast tick runs at 10 Hz and
/// logging each one drowns everything else.
pub struct LogSink {
    name: String,
    every: u64,
    seen: u64,
}

impl LogSink {
    /// Create a new LogSink that logs every snapshot
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            every: 1,
            seen: 0,
        }
    }

    /// Create from params map (for factory)
    ///
    /// Recognized params: `every` (positive integer, default 1).
    pub fn from_params(name: impl Into<String>, params: &HashMap<String, String>) -> Self {
        let every = params
            .get("every")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);

        Self {
            every,
            ..Self::new(name)
        }
    }

    pub fn every(&self) -> u64 {
        self.every
    }

    fn should_log(&mut self) -> bool {
        self.seen += 1;
        (self.seen - 1).is_multiple_of(self.every)
    }

    fn log_snapshot_summary(&self, snapshot: &OutgoingSnapshot) {
        info!(
            sink = %self.name,
            timestamp = snapshot.timestamp,
            hr = snapshot.hr,
            eda = snapshot.eda,
            skin_temp = snapshot.skin_temp,
            spo2 = ?snapshot.spo2,
            bvp = ?snapshot.bvp,
            respiration_rate = ?snapshot.respiration_rate,
            "Snapshot"
        );
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, snapshot),
        fields(sink = %self.name, timestamp = snapshot.timestamp)
    )]
    async fn write(&mut self, snapshot: &OutgoingSnapshot) -> Result<(), ContractError> {
        if self.should_log() {
            self.log_snapshot_summary(snapshot);
        }
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, seen = self.seen, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::snapshot;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let result = sink.write(&snapshot(1)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }

    #[test]
    fn test_log_sink_every_param() {
        let params = HashMap::from([("every".to_string(), "10".to_string())]);
        let mut sink = LogSink::from_params("sampled", &params);
        assert_eq!(sink.every(), 10);

        let logged = (0..25).filter(|_| sink.should_log()).count();
        // 1st, 11th, 21st
        assert_eq!(logged, 3);
    }

    #[test]
    fn test_log_sink_invalid_every_falls_back() {
        for bad in ["0", "-3", "often"] {
            let params = HashMap::from([("every".to_string(), bad.to_string())]);
            assert_eq!(LogSink::from_params("x", &params).every(), 1);
        }
    }
}
