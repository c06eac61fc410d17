use std::path::Path;

use anyhow::Context;
use tokio::fs::{create_dir_all, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

use launch_core::error::EnrichError;
use launch_core::AnalysisRecord;

use crate::ports::RecordSink;

/// Append-only sink: one JSON line per analysis record. Duplicate
/// records for a re-delivered signature are acceptable by contract.
pub struct JsonlRecorder {
    records_path: String,
}

impl JsonlRecorder {
    pub async fn new(output_dir: &str) -> anyhow::Result<Self> {
        let path = Path::new(output_dir);
        if !path.exists() {
            create_dir_all(path)
                .await
                .with_context(|| format!("creating data dir {}", output_dir))?;
        }

        let records_path = format!("{}/new_launches.jsonl", output_dir);
        info!("🗄️ Recording launch analyses to {}", records_path);

        Ok(Self { records_path })
    }
}

#[async_trait::async_trait]
impl RecordSink for JsonlRecorder {
    async fn append(&self, record: &AnalysisRecord) -> Result<(), EnrichError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| EnrichError::MalformedData(format!("record serialization: {}", e)))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.records_path)
            .await
            .map_err(|e| {
                EnrichError::UpstreamQuery(format!("open {}: {}", self.records_path, e))
            })?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| EnrichError::UpstreamQuery(format!("write record: {}", e)))?;

        Ok(())
    }
}
