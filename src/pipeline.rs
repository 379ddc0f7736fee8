//! Lifecycle entry points.
//!
//! The host persistence layer calls the pipeline at four points of a record's
//! life:
//!
//! ```text
//! before_save   gate → generate name → set storage + upload attributes
//! (host persists the record; ids become available)
//! after_insert  gate again → run steps (fresh directories)
//! after_update  gate again → run steps (optionally clean directories first)
//! after_delete  remove every step directory (unless disabled)
//! ```
//!
//! [`PreparedUpload`] carries the upload and its stored name from
//! `before_save` to the matching `after_*` call so every step uses one name.
//!
//! Record persistence and file writes are not transactional. A record can be
//! saved while the file writes that follow fail; the error is returned to the
//! host and files written by earlier steps stay on disk.

use crate::config::{ConfigError, UploadConfig};
use crate::handler::{OutputKind, Prefixes};
use crate::imaging::{BackendError, ImageBackend, RustBackend};
use crate::naming::{StoredFileName, generate_name};
use crate::paths::PathError;
use crate::record::Record;
use crate::steps::{CleanupOutcome, Step, StepContext, StepOutcome, cleanup, run_steps};
use crate::upload::{UploadedFile, should_process};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("path error: {0}")]
    Path(#[from] PathError),
    #[error("image processing failed: {0}")]
    Imaging(#[from] BackendError),
    #[error("cannot prepare directory {}: {source}", path.display())]
    Directory { path: PathBuf, source: io::Error },
    #[error("cannot write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("image support unavailable for '{extension}' files")]
    ImageSupportUnavailable { extension: String },
    #[error("step {step} handler failed: {message}")]
    Handler { step: usize, message: String },
}

/// Progress events sent while steps run or directories are removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    StepStarted { index: usize, directory: String },
    DirectoryCleaned { directory: String },
    FileWritten {
        index: usize,
        kind: OutputKind,
        path: PathBuf,
    },
    DirectoryRemoved { directory: String },
    DirectorySkipped { directory: String },
    RootRefused { index: usize },
}

/// An upload that passed the gate in `before_save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUpload {
    pub upload: UploadedFile,
    pub stored_name: StoredFileName,
}

/// Result of an `after_insert` / `after_update` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// `None` when the gate skipped processing.
    pub stored_name: Option<StoredFileName>,
    pub steps: Vec<StepOutcome>,
}

impl SaveReport {
    pub fn processed(&self) -> bool {
        self.stored_name.is_some()
    }

    pub fn files_written(&self) -> usize {
        self.steps.iter().map(|s| s.files.len()).sum()
    }
}

/// Result of an `after_delete` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// `false` when `delete_on_delete` is off and nothing was touched.
    pub enabled: bool,
    pub directories: Vec<CleanupOutcome>,
}

/// Configured upload pipeline attached to one record type.
pub struct UploadPipeline<B = RustBackend> {
    config: UploadConfig,
    steps: Vec<Step>,
    backend: B,
    events: Option<Sender<PipelineEvent>>,
}

impl UploadPipeline<RustBackend> {
    /// Pipeline running the steps listed in the config.
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let steps = config.steps();
        Self::with_steps(config, steps)
    }

    /// Pipeline running `steps` instead of the config's step list.
    ///
    /// Use this for dynamic paths and custom handlers, which have no TOML form.
    pub fn with_steps(config: UploadConfig, steps: Vec<Step>) -> Result<Self, UploadError> {
        config.validate()?;
        if steps.is_empty() {
            return Err(ConfigError::Validation("no steps configured".to_string()).into());
        }
        Ok(Self {
            config,
            steps,
            backend: RustBackend::new(),
            events: None,
        })
    }
}

impl<B: ImageBackend> UploadPipeline<B> {
    /// Swap the image backend.
    pub fn with_backend<C: ImageBackend>(self, backend: C) -> UploadPipeline<C> {
        UploadPipeline {
            config: self.config,
            steps: self.steps,
            backend,
            events: self.events,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    fn gate(&self, upload: Option<&UploadedFile>, scenario: &str) -> bool {
        should_process(upload, scenario, &self.config.scenarios)
    }

    /// Gate the upload and, when it passes, name it and record the name.
    ///
    /// Sets the storage attribute to the stored name and the upload attribute
    /// to the staged temp path. A skipped upload leaves the record untouched.
    pub fn before_save<R: Record + ?Sized>(
        &self,
        record: &mut R,
        upload: Option<&UploadedFile>,
    ) -> Option<PreparedUpload> {
        let upload = upload.filter(|u| self.gate(Some(*u), record.scenario()));
        let Some(upload) = upload else {
            debug!(scenario = record.scenario(), "no upload to process");
            return None;
        };

        let stored_name = generate_name(upload, self.config.fixed_name.as_deref());
        debug!(name = %stored_name, "generated stored name");

        record.set_attribute(
            &self.config.attribute,
            upload.temp_path().to_string_lossy().into_owned(),
        );
        record.set_attribute(&self.config.storage_attribute, stored_name.to_string());

        Some(PreparedUpload {
            upload: upload.clone(),
            stored_name,
        })
    }

    /// Run every step for a freshly inserted record.
    pub fn after_insert<R: Record + ?Sized>(
        &self,
        record: &R,
        prepared: Option<&PreparedUpload>,
    ) -> Result<SaveReport, UploadError> {
        self.after_save(record, prepared, true)
    }

    /// Run every step for an updated record.
    pub fn after_update<R: Record + ?Sized>(
        &self,
        record: &R,
        prepared: Option<&PreparedUpload>,
    ) -> Result<SaveReport, UploadError> {
        self.after_save(record, prepared, false)
    }

    fn after_save<R: Record + ?Sized>(
        &self,
        record: &R,
        prepared: Option<&PreparedUpload>,
        is_new_record: bool,
    ) -> Result<SaveReport, UploadError> {
        // The scenario may have changed since before_save.
        let prepared = prepared.filter(|p| self.gate(Some(&p.upload), record.scenario()));
        let Some(prepared) = prepared else {
            debug!(scenario = record.scenario(), "skipping steps");
            return Ok(SaveReport::default());
        };

        let attributes = record.attributes();
        let ctx = StepContext {
            aliases: &self.config.aliases,
            attributes: &attributes,
            tmp_file: prepared.upload.temp_path(),
            stored_name: &prepared.stored_name,
            prefixes: Prefixes {
                thumbnail: &self.config.thumbnail_prefix,
                original: &self.config.original_prefix,
            },
            clean_on_update: self.config.clean_on_update,
            events: self.events.as_ref(),
        };

        let steps = run_steps(&self.backend, &self.steps, &ctx, is_new_record)?;
        let report = SaveReport {
            stored_name: Some(prepared.stored_name.clone()),
            steps,
        };
        info!(
            name = %prepared.stored_name,
            steps = report.steps.len(),
            files = report.files_written(),
            "upload processed"
        );
        Ok(report)
    }

    /// Remove every step directory for a deleted record.
    ///
    /// Directories resolving to the filesystem root are never removed.
    pub fn after_delete<R: Record + ?Sized>(
        &self,
        record: &R,
    ) -> Result<CleanupReport, UploadError> {
        if !self.config.delete_on_delete {
            debug!("delete_on_delete disabled, keeping files");
            return Ok(CleanupReport::default());
        }

        let attributes = record.attributes();
        let directories = cleanup(
            &self.steps,
            &self.config.aliases,
            &attributes,
            self.events.as_ref(),
        )?;
        info!(directories = directories.len(), "upload directories cleaned up");
        Ok(CleanupReport {
            enabled: true,
            directories,
        })
    }
}
