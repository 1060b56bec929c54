use crate::common::error::IntakeError;
use crate::common::job_id::JobId;
use crate::infrastructure::storage::{StagedFile, StorageLayout};
use axum::extract::multipart::Field;
use axum::http::StatusCode;
use futures_util::StreamExt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::error;

/// Audio that has been fully written to the staging area.
#[derive(Debug)]
pub struct StagedInput {
    pub id: JobId,
    pub path: PathBuf,
    pub size: u64,
}

pub struct StagingWriter<'a> {
    storage: &'a StorageLayout,
    staged: StagedFile,
    written: u64,
}

impl<'a> StagingWriter<'a> {
    pub async fn new(storage: &'a StorageLayout, extension: &str) -> std::io::Result<Self> {
        let staged = storage.create_input(extension).await?;
        Ok(Self {
            storage,
            staged,
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.staged.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn finish(mut self) -> std::io::Result<StagedInput> {
        self.staged.file.flush().await?;
        self.staged.file.sync_all().await?;

        Ok(StagedInput {
            id: self.staged.id,
            path: self.staged.path,
            size: self.written,
        })
    }

    pub async fn abort(self) {
        let StagedFile { path, file, .. } = self.staged;
        drop(file);
        self.storage.discard(&path).await;
    }
}

/// Stage an in-memory payload, e.g. decoded base64.
pub async fn write_to_staging(
    storage: &StorageLayout,
    bytes: &[u8],
    extension: &str,
) -> Result<StagedInput, IntakeError> {
    let mut writer = StagingWriter::new(storage, extension).await?;

    if let Err(e) = writer.write_chunk(bytes).await {
        writer.abort().await;
        return Err(e.into());
    }

    commit(storage, writer).await
}

/// Stream a multipart field to the staging area chunk by chunk. A partially
/// written file is removed if the stream or the disk fails.
pub async fn stream_to_staging(
    storage: &StorageLayout,
    mut field: Field<'_>,
    extension: &str,
) -> Result<StagedInput, IntakeError> {
    let mut writer = StagingWriter::new(storage, extension).await?;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Stream error: {}", e);
                writer.abort().await;
                if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    return Err(IntakeError::PayloadTooLarge);
                }
                return Err(IntakeError::InvalidMultipart(e.body_text()));
            }
        };

        if let Err(e) = writer.write_chunk(&chunk).await {
            error!("Staging write error: {}", e);
            writer.abort().await;
            return Err(e.into());
        }
    }

    if writer.written() == 0 {
        writer.abort().await;
        return Err(IntakeError::EmptyAudio);
    }

    commit(storage, writer).await
}

// finish() consumes the writer, so a failed sync removes the file by path.
async fn commit(storage: &StorageLayout, writer: StagingWriter<'_>) -> Result<StagedInput, IntakeError> {
    let path = writer.staged.path.clone();
    match writer.finish().await {
        Ok(staged) => Ok(staged),
        Err(e) => {
            storage.discard(&path).await;
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_layout() -> (tempfile::TempDir, StorageLayout) {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = StorageLayout::bootstrap(dir.path().join("uploads"), dir.path().join("outputs"))
            .await
            .unwrap();
        (dir, layout)
    }

    #[tokio::test]
    async fn given_bytes_when_staging_then_file_holds_exactly_those_bytes() {
        let (_dir, layout) = create_test_layout().await;

        let staged = write_to_staging(&layout, b"hello", "wav").await.unwrap();

        assert_eq!(staged.size, 5);
        assert_eq!(std::fs::read(&staged.path).unwrap(), b"hello");
        assert!(staged.path.starts_with(layout.upload_dir()));
    }

    #[tokio::test]
    async fn given_chunks_when_writing_then_sizes_accumulate() {
        let (_dir, layout) = create_test_layout().await;

        let mut writer = StagingWriter::new(&layout, "wav").await.unwrap();
        writer.write_chunk(b"hel").await.unwrap();
        writer.write_chunk(b"lo").await.unwrap();
        assert_eq!(writer.written(), 5);

        let staged = writer.finish().await.unwrap();
        assert_eq!(std::fs::read(&staged.path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn given_aborted_writer_then_partial_file_is_removed() {
        let (_dir, layout) = create_test_layout().await;

        let mut writer = StagingWriter::new(&layout, "wav").await.unwrap();
        writer.write_chunk(b"partial").await.unwrap();
        writer.abort().await;

        assert_eq!(std::fs::read_dir(layout.upload_dir()).unwrap().count(), 0);
    }
}
