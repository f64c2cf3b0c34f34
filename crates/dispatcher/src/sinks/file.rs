//! FileSink - appends snapshots to a JSON Lines file

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, DataSink, OutgoingSnapshot};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Output file, one JSON object per line
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output/snapshots.jsonl"));

        let append = params
            .get("append")
            .map(|v| matches!(v.as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        Self { path, append }
    }
}

/// Sink that writes snapshots to disk
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    writer: Option<BufWriter<File>>,
    lines: u64,
}

impl FileSink {
    /// Create a new FileSink, creating parent directories as needed
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: Some(BufWriter::new(file)),
            lines: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn write_line(&mut self, snapshot: &OutgoingSnapshot) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotConnected, "sink closed"))?;

        serde_json::to_writer(&mut *writer, snapshot)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, snapshot),
        fields(sink = %self.name, timestamp = snapshot.timestamp)
    )]
    async fn write(&mut self, snapshot: &OutgoingSnapshot) -> Result<(), ContractError> {
        self.write_line(snapshot).map_err(|e| {
            error!(sink = %self.name, error = %e, "Failed to write snapshot");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(
            sink = %self.name,
            path = %self.config.path.display(),
            lines = self.lines,
            "FileSink closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::tests::snapshot;
    use tempfile::tempdir;

    fn config(path: PathBuf) -> FileSinkConfig {
        FileSinkConfig {
            path,
            append: false,
        }
    }

    #[tokio::test]
    async fn test_file_sink_writes_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");

        let mut sink = FileSink::new("test_file", config(path.clone())).unwrap();
        sink.write(&snapshot(1)).await.unwrap();
        sink.write(&snapshot(2)).await.unwrap();
        sink.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: OutgoingSnapshot = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, snapshot(1));
        assert!(lines[1].contains("\"timestamp\":2"));
        assert!(lines[1].contains("\"respirationRate\""));
    }

    #[tokio::test]
    async fn test_file_sink_flush_makes_data_visible() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");

        let mut sink = FileSink::new("test_file", config(path.clone())).unwrap();
        sink.write(&snapshot(7)).await.unwrap();
        sink.flush().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_file_sink_write_after_close_fails() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new("test_file", config(dir.path().join("out.jsonl"))).unwrap();
        sink.close().await.unwrap();

        let result = sink.write(&snapshot(1)).await;
        assert!(matches!(result, Err(ContractError::SinkWrite { .. })));
    }

    #[tokio::test]
    async fn test_file_sink_append_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");

        for ts in [1, 2] {
            let mut sink = FileSink::new(
                "append",
                FileSinkConfig {
                    path: path.clone(),
                    append: true,
                },
            )
            .unwrap();
            sink.write(&snapshot(ts)).await.unwrap();
            sink.close().await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_file_sink_config_from_params() {
        let params = HashMap::from([
            ("path".to_string(), "/tmp/x.jsonl".to_string()),
            ("append".to_string(), "true".to_string()),
        ]);
        let config = FileSinkConfig::from_params(&params);
        assert_eq!(config.path, PathBuf::from("/tmp/x.jsonl"));
        assert!(config.append);
    }
}
