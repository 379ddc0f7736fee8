//! Stored file names.
//!
//! Every save computes one name and reuses it under every step directory, so
//! step 1's `photo_<token>.jpg` and step 2's `thumb_photo_<token>.jpg` belong
//! to the same upload. The name is what ends up in the record's storage
//! attribute.
//!
//! ## Shapes
//!
//! - fixed name configured: `avatar` + `photo.jpg` → `avatar.jpg`
//! - otherwise: `photo.jpg` → `photo_0192a4b7c1e37c2a9d4f58e3b16a0c77.jpg`
//!
//! The token is a UUIDv7 in simple (dashless) form: a millisecond timestamp
//! followed by random bits, so two names generated within the same clock
//! tick still differ and names sort roughly by upload time.

use crate::upload::UploadedFile;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// The resolved output file name (no directory part).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StoredFileName(String);

impl StoredFileName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension of the stored name, without the dot. Empty when there is none.
    pub fn extension(&self) -> &str {
        match self.0.rfind('.') {
            Some(pos) if pos > 0 => &self.0[pos + 1..],
            _ => "",
        }
    }

    /// The name with `prefix` in front, e.g. `thumb_` + `photo.jpg`.
    pub fn prefixed(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl fmt::Display for StoredFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StoredFileName> for String {
    fn from(name: StoredFileName) -> Self {
        name.0
    }
}

/// A fresh collision-resistant token.
pub fn uniqueness_token() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Derive the stored name for an upload.
///
/// An empty extension produces no trailing dot.
pub fn generate_name(file: &UploadedFile, fixed_name: Option<&str>) -> StoredFileName {
    let stem = match fixed_name {
        Some(name) => name.to_string(),
        None => format!("{}_{}", file.base_name, uniqueness_token()),
    };
    if file.extension.is_empty() {
        StoredFileName(stem)
    } else {
        StoredFileName(format!("{stem}.{}", file.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn upload(client_name: &str) -> UploadedFile {
        UploadedFile::new("/tmp/php123", client_name)
    }

    #[test]
    fn fixed_name_keeps_extension() {
        let name = generate_name(&upload("me.png"), Some("avatar"));
        assert_eq!(name.as_str(), "avatar.png");
    }

    #[test]
    fn generated_name_has_base_token_and_extension() {
        let name = generate_name(&upload("photo.jpg"), None);
        let s = name.as_str();
        assert!(s.starts_with("photo_"), "{s}");
        assert!(s.ends_with(".jpg"), "{s}");

        let token = &s["photo_".len()..s.len() - ".jpg".len()];
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn rapid_calls_never_repeat() {
        let file = upload("photo.jpg");
        let names: HashSet<String> = (0..1000)
            .map(|_| generate_name(&file, None).into())
            .collect();
        assert_eq!(names.len(), 1000);
    }

    #[test]
    fn extensionless_upload_has_no_trailing_dot() {
        assert_eq!(generate_name(&upload("README"), Some("doc")).as_str(), "doc");
    }

    #[test]
    fn extension_and_prefix_helpers() {
        let name = generate_name(&upload("x.JPG"), Some("avatar"));
        assert_eq!(name.extension(), "JPG");
        assert_eq!(name.prefixed("thumb_"), "thumb_avatar.JPG");
    }
}
