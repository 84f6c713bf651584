//! Upload policy for item images.

use chrono::{DateTime, Utc};

use estore_core::{DomainError, DomainResult};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Metadata of an image about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, size: usize) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            size,
        }
    }

    pub fn validate(&self, max_bytes: usize) -> DomainResult<()> {
        if self.size == 0 {
            return Err(DomainError::validation("image is empty"));
        }
        if self.size > max_bytes {
            return Err(DomainError::validation(format!(
                "image must be at most {} bytes, got {}",
                max_bytes, self.size
            )));
        }
        let content_type = self.content_type.trim().to_ascii_lowercase();
        if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
            return Err(DomainError::validation("only JPG, PNG and WebP images are allowed"));
        }
        Ok(())
    }

    /// File extension: taken from the file name, else from the content type.
    pub fn extension(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
            _ => match self.content_type.trim().to_ascii_lowercase().as_str() {
                "image/png" => "png".to_string(),
                "image/webp" => "webp".to_string(),
                _ => "jpg".to_string(),
            },
        }
    }

    /// `items/<material_no>-<millis>.<ext>`
    pub fn object_path(&self, material_no: &str, now: DateTime<Utc>) -> String {
        format!("items/{}-{}.{}", material_no, now.timestamp_millis(), self.extension())
    }
}

/// Object path encoded in a public URL: everything after `/<bucket>/`.
///
/// `None` when the URL does not point into the bucket.
pub fn object_path_from_url<'a>(url: &'a str, bucket: &str) -> Option<&'a str> {
    let marker = format!("/{bucket}/");
    let (_, path) = url.split_once(&marker)?;
    (!path.is_empty()).then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_oversized_and_unsupported_images() {
        let big = ImageUpload::new("a.png", "image/png", MAX_IMAGE_BYTES + 1);
        assert!(big.validate(MAX_IMAGE_BYTES).is_err());

        let gif = ImageUpload::new("a.gif", "image/gif", 10);
        assert!(gif.validate(MAX_IMAGE_BYTES).is_err());

        let ok = ImageUpload::new("a.WEBP", "image/webp", MAX_IMAGE_BYTES);
        assert!(ok.validate(MAX_IMAGE_BYTES).is_ok());
    }

    #[test]
    fn object_path_uses_material_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let up = ImageUpload::new("photo.JPG", "image/jpeg", 10);
        assert_eq!(up.object_path("M-1", now), format!("items/M-1-{}.jpg", now.timestamp_millis()));

        let nameless = ImageUpload::new("blob", "image/png", 10);
        assert_eq!(nameless.extension(), "png");
    }

    #[test]
    fn extracts_path_after_bucket_segment() {
        let url = "http://localhost:8080/storage/inventory-images/items/M-1-1.png";
        assert_eq!(object_path_from_url(url, "inventory-images"), Some("items/M-1-1.png"));
        assert_eq!(object_path_from_url("http://elsewhere/x.png", "inventory-images"), None);
    }
}
