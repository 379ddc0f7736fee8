//! Incoming uploads and the presence/scenario gate.
//!
//! The host parses the multipart request and stages the file somewhere
//! temporary; the pipeline only sees the staged path and the client-supplied
//! name. The temp file belongs to the host and is never moved or deleted here.

use std::path::{Path, PathBuf};

/// A file uploaded with the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Where the host staged the upload. Empty when the upload failed.
    pub temp_path: PathBuf,
    /// Client file name without its extension.
    pub base_name: String,
    /// Client file extension without the dot, as sent (case preserved).
    pub extension: String,
}

impl UploadedFile {
    /// Build from the staged path and the client file name (`"photo.jpg"`).
    ///
    /// Only the last dot separates the extension, so `"archive.tar.gz"` has
    /// base name `"archive.tar"` and extension `"gz"`. A leading dot does not
    /// count (`".htaccess"` has no extension). Any directory part a client
    /// sends is dropped.
    pub fn new(temp_path: impl Into<PathBuf>, client_name: &str) -> Self {
        let file_name = client_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(client_name);

        let (base_name, extension) = match file_name.rfind('.') {
            Some(pos) if pos > 0 => (&file_name[..pos], &file_name[pos + 1..]),
            _ => (file_name, ""),
        };

        Self {
            temp_path: temp_path.into(),
            base_name: base_name.to_string(),
            extension: extension.to_string(),
        }
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Whether the host actually staged a file.
    pub fn is_staged(&self) -> bool {
        !self.temp_path.as_os_str().is_empty()
    }
}

/// Decide whether an upload should be processed at all.
///
/// True only when a staged upload is present and the record's scenario is one
/// of the allowed scenarios. A missing upload is a normal case, not an error.
pub fn should_process<S: AsRef<str>>(
    upload: Option<&UploadedFile>,
    scenario: &str,
    allowed_scenarios: &[S],
) -> bool {
    upload.is_some_and(UploadedFile::is_staged)
        && allowed_scenarios.iter().any(|s| s.as_ref() == scenario)
}
