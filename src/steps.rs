//! Step runner and cleanup.
//!
//! Each save walks the configured steps in order:
//!
//! ```text
//! resolve directory → (update + clean_on_update: remove it) → create it → handler or copy
//! ```
//!
//! A directory that resolves to the filesystem root is never removed, neither
//! by the update clean nor by [`cleanup`].
//!
//! The first failure aborts the walk. Steps that already finished keep their
//! files; nothing is rolled back, and nothing here locks against a concurrent
//! save of the same record.

use crate::handler::{HandlerSpec, ImagePolicy, OutputKind, Prefixes, WrittenFile};
use crate::handler::{copy_upload, execute_handler};
use crate::imaging::ImageBackend;
use crate::naming::StoredFileName;
use crate::paths::{Aliases, PathError, PathExpr, TargetDirectory};
use crate::pipeline::{PipelineEvent, UploadError};
use crate::record::Attributes;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use tracing::{debug, warn};

/// One configured (directory, handler) pair.
#[derive(Debug, Clone)]
pub struct Step {
    pub path: PathExpr,
    /// `None` copies the upload verbatim.
    pub handler: Option<HandlerSpec>,
}

impl Step {
    /// A step that copies the raw upload into `path`.
    pub fn copy(path: impl Into<PathExpr>) -> Self {
        Self {
            path: path.into(),
            handler: None,
        }
    }

    pub fn with_policy(path: impl Into<PathExpr>, policy: ImagePolicy) -> Self {
        Self {
            path: path.into(),
            handler: Some(HandlerSpec::Policy(policy)),
        }
    }

    pub fn with_handler(path: impl Into<PathExpr>, handler: HandlerSpec) -> Self {
        Self {
            path: path.into(),
            handler: Some(handler),
        }
    }

    pub fn resolve(
        &self,
        aliases: &Aliases,
        attributes: &Attributes,
    ) -> Result<TargetDirectory, PathError> {
        self.path.resolve(aliases, attributes)
    }
}

/// Everything a step run needs besides the steps themselves.
pub struct StepContext<'a> {
    pub aliases: &'a Aliases,
    pub attributes: &'a Attributes,
    pub tmp_file: &'a Path,
    pub stored_name: &'a StoredFileName,
    pub prefixes: Prefixes<'a>,
    /// Remove each directory before writing, on updates only.
    pub clean_on_update: bool,
    pub events: Option<&'a Sender<PipelineEvent>>,
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub directory: String,
    /// The previous directory was removed first.
    pub cleaned: bool,
    pub files: Vec<WrittenFile>,
}

fn emit(events: Option<&Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching progress.
        let _ = tx.send(event);
    }
}

/// Make sure `dir` exists, optionally wiping it first.
///
/// Returns whether an existing directory was removed. Creating a directory
/// that already exists is not an error.
pub fn prepare_directory(dir: &Path, clean: bool) -> Result<bool, UploadError> {
    let wrap = |source: io::Error| UploadError::Directory {
        path: dir.to_path_buf(),
        source,
    };

    let mut cleaned = false;
    if clean && dir.exists() {
        debug!(dir = %dir.display(), "removing previous directory contents");
        std::fs::remove_dir_all(dir).map_err(wrap)?;
        cleaned = true;
    }
    std::fs::create_dir_all(dir).map_err(wrap)?;
    Ok(cleaned)
}

/// Run every step in order for one save.
pub fn run_steps(
    backend: &impl ImageBackend,
    steps: &[Step],
    ctx: &StepContext<'_>,
    is_new_record: bool,
) -> Result<Vec<StepOutcome>, UploadError> {
    let mut outcomes = Vec::with_capacity(steps.len());

    for (index, step) in steps.iter().enumerate() {
        let directory = step.resolve(ctx.aliases, ctx.attributes)?;
        emit(
            ctx.events,
            PipelineEvent::StepStarted {
                index,
                directory: directory.to_string(),
            },
        );

        let mut clean = !is_new_record && ctx.clean_on_update;
        if clean && directory.is_root() {
            warn!(step = index, "refusing to clean the filesystem root");
            emit(ctx.events, PipelineEvent::RootRefused { index });
            clean = false;
        }
        let cleaned = prepare_directory(directory.as_path(), clean)?;
        if cleaned {
            emit(
                ctx.events,
                PipelineEvent::DirectoryCleaned {
                    directory: directory.to_string(),
                },
            );
        }

        let files = match &step.handler {
            Some(handler) => execute_handler(
                backend,
                handler,
                index,
                ctx.tmp_file,
                &directory,
                ctx.stored_name,
                ctx.prefixes,
            )?,
            None => {
                let destination = PathBuf::from(directory.file(ctx.stored_name.as_str()));
                debug!(step = index, destination = %destination.display(), "copying upload");
                copy_upload(ctx.tmp_file, &destination)?;
                vec![WrittenFile {
                    kind: OutputKind::Copy,
                    path: destination,
                    dimensions: None,
                }]
            }
        };

        for file in &files {
            emit(
                ctx.events,
                PipelineEvent::FileWritten {
                    index,
                    kind: file.kind,
                    path: file.path.clone(),
                },
            );
        }

        outcomes.push(StepOutcome {
            index,
            directory: directory.to_string(),
            cleaned,
            files,
        });
    }

    Ok(outcomes)
}

/// What cleanup did with one step directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupAction {
    Removed,
    /// Nothing there to remove.
    Missing,
    /// The path resolved to the filesystem root and was left alone.
    RefusedRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    pub index: usize,
    pub directory: String,
    pub action: CleanupAction,
}

/// Remove every step directory for a deleted record.
pub fn cleanup(
    steps: &[Step],
    aliases: &Aliases,
    attributes: &Attributes,
    events: Option<&Sender<PipelineEvent>>,
) -> Result<Vec<CleanupOutcome>, UploadError> {
    let mut outcomes = Vec::with_capacity(steps.len());

    for (index, step) in steps.iter().enumerate() {
        let directory = step.resolve(aliases, attributes)?;
        let path = directory.as_path();

        let action = if directory.is_root() {
            warn!(step = index, "refusing to remove the filesystem root");
            emit(events, PipelineEvent::RootRefused { index });
            CleanupAction::RefusedRoot
        } else if !path.exists() {
            emit(
                events,
                PipelineEvent::DirectorySkipped {
                    directory: directory.to_string(),
                },
            );
            CleanupAction::Missing
        } else {
            debug!(step = index, dir = %path.display(), "removing step directory");
            std::fs::remove_dir_all(path).map_err(|source| UploadError::Directory {
                path: path.to_path_buf(),
                source,
            })?;
            emit(
                events,
                PipelineEvent::DirectoryRemoved {
                    directory: directory.to_string(),
                },
            );
            CleanupAction::Removed
        };

        outcomes.push(CleanupOutcome {
            index,
            directory: directory.to_string(),
            action,
        });
    }

    Ok(outcomes)
}
