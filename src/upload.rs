//! Files and links shared into the conversation

use base64::{engine::general_purpose, Engine as _};
use std::path::Path;

use crate::api::types::EncodedBlob;
use crate::error::UploadError;
use crate::session::FileMetadata;

pub const URL_MIME_TYPE: &str = "text/url";

/// A shared file or link, ready to log and (maybe) forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedMedia {
    pub name: String,
    pub mime_type: String,
    /// Base64 file bytes, or the URL itself for links
    pub content: String,
    pub is_url: bool,
}

impl UploadedMedia {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Whether the live model accepts this as realtime media input.
    pub fn is_forwardable(&self) -> bool {
        !self.is_url && (self.is_image() || self.mime_type == "video/mp4")
    }

    /// Line shown in the transcript for this upload.
    pub fn entry_text(&self) -> String {
        if self.is_url {
            format!("Shared link: {}", self.name)
        } else {
            format!("Uploaded file: {}", self.name)
        }
    }

    /// Attachment metadata; content is only kept for image previews.
    pub fn metadata(&self) -> FileMetadata {
        FileMetadata {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            content: self.is_image().then(|| self.content.clone()),
            is_url: self.is_url,
        }
    }

    pub fn to_blob(&self) -> EncodedBlob {
        EncodedBlob::new(self.content.clone(), self.mime_type.clone())
    }
}

/// Read a local file and work out what it is.
pub fn load_file(path: &Path) -> Result<UploadedMedia, UploadError> {
    let bytes = std::fs::read(path).map_err(|source| UploadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = sniff_mime_type(&bytes)
        .or_else(|| mime_from_extension(path))
        .unwrap_or("application/octet-stream");

    log::info!("Loaded upload {} ({}, {} bytes)", name, mime_type, bytes.len());

    Ok(UploadedMedia {
        name,
        mime_type: mime_type.to_string(),
        content: general_purpose::STANDARD.encode(&bytes),
        is_url: false,
    })
}

/// Share a web link. Only http(s) links are accepted.
pub fn from_url(input: &str) -> Result<UploadedMedia, UploadError> {
    let url = url::Url::parse(input.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UploadError::UnsupportedScheme(url.scheme().to_string()));
    }

    Ok(UploadedMedia {
        name: url.to_string(),
        mime_type: URL_MIME_TYPE.to_string(),
        content: url.to_string(),
        is_url: true,
    })
}

/// Treat the argument as a link when it parses as one, else as a file path.
pub fn load(input: &str) -> Result<UploadedMedia, UploadError> {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        from_url(trimmed)
    } else {
        load_file(Path::new(trimmed))
    }
}

fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        Some("image/jpeg")
    } else if bytes.starts_with(&[0x89, 0x50, 0x4e, 0x47]) {
        Some("image/png")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"BM") {
        Some("image/bmp")
    } else if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        // ISO base media; quicktime brand is the only common non-mp4 one
        if &bytes[8..12] == b"qt  " {
            Some("video/quicktime")
        } else {
            Some("video/mp4")
        }
    } else if bytes.starts_with(b"%PDF") {
        Some("application/pdf")
    } else {
        None
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "json" => "application/json",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("live-vision-chat-upload-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_png_is_sniffed_regardless_of_extension() {
        let path = temp_file("photo.bin", &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a]);
        let media = load_file(&path).unwrap();
        assert_eq!(media.name, "photo.bin");
        assert_eq!(media.mime_type, "image/png");
        assert!(media.is_forwardable());
        assert_eq!(media.entry_text(), "Uploaded file: photo.bin");
        assert_eq!(media.metadata().content, Some(media.content.clone()));
    }

    #[test]
    fn test_mp4_forwarded_but_pdf_is_not() {
        let mut mp4 = vec![0, 0, 0, 0x18];
        mp4.extend_from_slice(b"ftypisom");
        let video = load_file(&temp_file("clip.mp4", &mp4)).unwrap();
        assert_eq!(video.mime_type, "video/mp4");
        assert!(video.is_forwardable());
        assert_eq!(video.metadata().content, None);

        let pdf = load_file(&temp_file("doc.pdf", b"%PDF-1.7")).unwrap();
        assert_eq!(pdf.mime_type, "application/pdf");
        assert!(!pdf.is_forwardable());
    }

    #[test]
    fn test_extension_fallback_and_unknown() {
        let notes = load_file(&temp_file("notes.txt", b"hello")).unwrap();
        assert_eq!(notes.mime_type, "text/plain");

        let blob = load_file(&temp_file("data.xyz", b"\x00\x01")).unwrap();
        assert_eq!(blob.mime_type, "application/octet-stream");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_file(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, UploadError::Io { .. }));
    }

    #[test]
    fn test_url_upload() {
        let link = load("https://example.com/page").unwrap();
        assert!(link.is_url);
        assert_eq!(link.mime_type, URL_MIME_TYPE);
        assert_eq!(link.entry_text(), "Shared link: https://example.com/page");
        assert!(!link.is_forwardable());
        assert!(link.metadata().is_url);

        assert!(matches!(
            from_url("ftp://example.com/file"),
            Err(UploadError::UnsupportedScheme(_))
        ));
        assert!(matches!(from_url("not a url"), Err(UploadError::InvalidUrl(_))));
    }
}
