//! # Upload Pipeline
//!
//! Attaches file-upload handling to a persisted record. When a record is saved
//! with an uploaded file, the file is run through an ordered list of steps,
//! each writing into its own directory. When the record is deleted, the step
//! directories are removed.
//!
//! # Lifecycle
//!
//! The host's persistence layer calls the pipeline explicitly:
//!
//! ```text
//! before_save   gate, generate the stored name, write it to the record
//! after_insert  run steps into fresh directories
//! after_update  run steps, optionally wiping each directory first
//! after_delete  remove every step directory
//! ```
//!
//! Path resolution waits for the `after_*` calls so attributes assigned on
//! insert (an auto-generated id, typically) can appear in step paths.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | `UploadPipeline`, the four lifecycle entry points, `UploadError` |
//! | [`config`] | `upload.toml` loading, merging over stock defaults, validation |
//! | [`upload`] | The staged upload and the presence/scenario gate |
//! | [`naming`] | Stored file names shared by every step of one save |
//! | [`paths`] | Static and computed step paths, alias and `{attr}` substitution |
//! | [`steps`] | Step runner and directory cleanup |
//! | [`handler`] | Copy, image policy and custom handlers |
//! | [`imaging`] | Pure-Rust resize and thumbnail backend |
//! | [`record`] | The record trait the host implements |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Name Per Save
//!
//! The stored name is generated once in `before_save` and carried to the
//! `after_*` call in a [`pipeline::PreparedUpload`], so the copy in step 1 and
//! the thumbnail in step 2 can be matched by name. Unique names are
//! `<base>_<uuid v7>.<ext>`; a configured fixed name replaces the base and
//! token.
//!
//! ## Static Paths Are Normalized, Computed Paths Are Not
//!
//! A static path gets alias and placeholder substitution and exactly one
//! trailing `/`. A computed path is used exactly as the function returns it.
//! File paths are the directory string with the name appended, so a computed
//! path must end in `/` to place files inside it.
//!
//! ## No Rollback, No Locking
//!
//! A failing step aborts the save; files written by earlier steps remain.
//! Two concurrent saves of the same record are not serialized against each
//! other. Both are left to the host.
//!
//! ## Root Guard
//!
//! Cleanup never removes a step directory that resolves to the filesystem
//! root; it logs a warning and moves on to the next step.

pub mod config;
pub mod handler;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod record;
pub mod steps;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
