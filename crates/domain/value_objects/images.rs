use std::path::Path;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageRejection {
    #[error("image file is empty")]
    Empty,
    #[error("image file exceeds 5 MiB")]
    TooLarge,
    #[error("unsupported image type; allowed: .jpg .jpeg .png .gif .webp")]
    UnsupportedExtension,
}

impl ImageUpload {
    pub fn validate(&self) -> Result<(), ImageRejection> {
        if self.bytes.is_empty() {
            return Err(ImageRejection::Empty);
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageRejection::TooLarge);
        }

        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension {
            Some(ext) if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(ImageRejection::UnsupportedExtension),
        }
    }

    pub fn mime_type(&self) -> String {
        self.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .to_string()
        })
    }
}
