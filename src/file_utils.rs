use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use log::debug;
use tempfile::TempDir;
use uuid::Uuid;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Default narration path next to the transcript
    pub fn default_output_path<P: AsRef<Path>>(transcript: P) -> PathBuf {
        let transcript = transcript.as_ref();
        let stem = transcript.file_stem().unwrap_or_default();
        let mut name = stem.to_string_lossy().to_string();
        name.push_str(".narration.wav");
        transcript.with_file_name(name)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }
}

/// Scratch directory owned by one narration job
///
/// Everything inside is removed in one go when the workspace is dropped,
/// whether the job finished, failed or was cancelled.
#[derive(Debug)]
pub struct JobWorkspace {
    job_id: Uuid,
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a workspace under `root`, or under the system temp dir
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let job_id = Uuid::new_v4();
        let prefix = format!("dubsync-{}-", job_id);

        let dir = match root {
            Some(root) => {
                FileManager::ensure_dir(root)?;
                tempfile::Builder::new()
                    .prefix(&prefix)
                    .tempdir_in(root)
                    .with_context(|| format!("Failed to create job directory in {:?}", root))?
            }
            None => tempfile::Builder::new()
                .prefix(&prefix)
                .tempdir()
                .context("Failed to create job directory")?,
        };

        debug!("Job {} workspace at {:?}", job_id, dir.path());
        Ok(JobWorkspace { job_id, dir })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the directory now and report failures instead of ignoring them
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("Failed to remove job directory {:?}", path))
    }
}
