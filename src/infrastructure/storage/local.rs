use crate::common::job_id::JobId;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tracing::{info, warn};

// A clash needs a 1-in-36^8 draw; more than a couple in a row means something else is wrong.
const MAX_ID_ATTEMPTS: usize = 8;

/// The two directories that make up the whole persisted state: staged
/// inputs and synthesis outputs.
#[derive(Clone, Debug)]
pub struct StorageLayout {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

/// A freshly created, still empty, input file.
pub struct StagedFile {
    pub id: JobId,
    pub path: PathBuf,
    pub file: File,
}

impl StorageLayout {
    /// Create both directories if needed. Paths are canonicalized so they stay
    /// valid for an external process running in another working directory.
    pub async fn bootstrap(upload_dir: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> io::Result<Self> {
        fs::create_dir_all(upload_dir.as_ref()).await?;
        fs::create_dir_all(output_dir.as_ref()).await?;

        let layout = Self {
            upload_dir: fs::canonicalize(upload_dir.as_ref()).await?,
            output_dir: fs::canonicalize(output_dir.as_ref()).await?,
        };

        info!(
            "📁 Storage ready (uploads: {}, outputs: {})",
            layout.upload_dir().display(),
            layout.output_dir().display()
        );
        Ok(layout)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_path(&self, id: &JobId) -> PathBuf {
        self.output_dir.join(id.output_filename())
    }

    /// Mint a job id and exclusively create `input_<id>.<ext>` for it.
    /// Never reuses a name that already exists on disk.
    pub async fn create_input(&self, extension: &str) -> io::Result<StagedFile> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = JobId::generate();
            let path = self.upload_dir.join(id.input_filename(extension));

            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok(StagedFile { id, path, file }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!("Job id {} already taken, minting another", id);
                }
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            "could not allocate a unique job id",
        ))
    }

    /// Map a client-supplied file name onto the output area. Only a single
    /// plain path component is accepted.
    pub fn resolve_output(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return None;
        }

        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.output_dir.join(name)),
            _ => None,
        }
    }

    /// Best effort removal of a staged input that will never be processed.
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
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
    async fn given_missing_dirs_when_bootstrapping_then_both_are_created() {
        let (dir, layout) = create_test_layout().await;

        assert!(dir.path().join("uploads").is_dir());
        assert!(dir.path().join("outputs").is_dir());
        assert!(layout.upload_dir().is_absolute());
        assert!(layout.output_dir().is_absolute());
    }

    #[tokio::test]
    async fn given_existing_dirs_when_bootstrapping_again_then_it_succeeds() {
        let (dir, _layout) = create_test_layout().await;
        std::fs::write(dir.path().join("outputs/keep.mp4"), b"x").unwrap();

        StorageLayout::bootstrap(dir.path().join("uploads"), dir.path().join("outputs"))
            .await
            .unwrap();

        assert!(dir.path().join("outputs/keep.mp4").exists());
    }

    #[tokio::test]
    async fn given_extension_when_creating_input_then_file_is_named_after_id() {
        let (_dir, layout) = create_test_layout().await;

        let staged = layout.create_input("mp3").await.unwrap();

        let expected = layout.upload_dir().join(format!("input_{}.mp3", staged.id));
        assert_eq!(staged.path, expected);
        assert!(expected.exists());
        assert_eq!(
            layout.output_path(&staged.id),
            layout.output_dir().join(format!("output_{}.mp4", staged.id))
        );
    }

    #[tokio::test]
    async fn given_plain_name_when_resolving_output_then_path_is_inside_output_dir() {
        let (_dir, layout) = create_test_layout().await;

        let path = layout.resolve_output("output_abc.mp4").unwrap();
        assert_eq!(path, layout.output_dir().join("output_abc.mp4"));
    }

    #[tokio::test]
    async fn given_traversal_attempt_when_resolving_output_then_nothing_resolves() {
        let (_dir, layout) = create_test_layout().await;

        for name in ["", ".", "..", "../secret", "a/b.mp4", "..\\x", "/etc/passwd"] {
            assert!(layout.resolve_output(name).is_none(), "{name:?} resolved");
        }
    }
}
