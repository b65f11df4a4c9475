//! Media file names: kinds, extension allow-lists, path-traversal guard

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Maximum accepted file name length in bytes
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Media folders under the media root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Pdf,
    Cover,
}

impl MediaKind {
    /// Sub-folder of the media root
    pub fn folder(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Pdf => "pdf",
            MediaKind::Cover => "covers",
        }
    }

    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Audio => &["mp3", "m4a", "ogg"],
            MediaKind::Pdf => &["pdf"],
            MediaKind::Cover => &["jpg", "jpeg", "png", "webp"],
        }
    }

    /// Covers are public; audio and PDF renditions are gated
    pub fn requires_access(self) -> bool {
        !matches!(self, MediaKind::Cover)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

impl FromStr for MediaKind {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "pdf" => Ok(MediaKind::Pdf),
            "covers" => Ok(MediaKind::Cover),
            other => Err(MediaError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    UnknownKind(String),
    Empty,
    TooLong,
    /// Separators, `..`, leading dot or control characters
    IllegalName(String),
    ExtensionNotAllowed { kind: MediaKind, extension: String },
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::UnknownKind(kind) => write!(f, "Unknown media kind '{}'", kind),
            MediaError::Empty => write!(f, "File name is empty"),
            MediaError::TooLong => {
                write!(f, "File name exceeds {} bytes", MAX_FILE_NAME_BYTES)
            }
            MediaError::IllegalName(name) => write!(f, "Illegal file name '{}'", name),
            MediaError::ExtensionNotAllowed { kind, extension } => {
                write!(f, "Extension '{}' not allowed for {}", extension, kind)
            }
        }
    }
}

impl std::error::Error for MediaError {}

/// Validate a single file name for `kind`. Returns the name unchanged.
pub fn sanitize_file_name(kind: MediaKind, name: &str) -> Result<String, MediaError> {
    if name.is_empty() {
        return Err(MediaError::Empty);
    }
    if name.len() > MAX_FILE_NAME_BYTES {
        return Err(MediaError::TooLong);
    }
    if name.starts_with('.')
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains(':')
        || name.chars().any(|c| c.is_control())
    {
        return Err(MediaError::IllegalName(name.to_string()));
    }

    let extension = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => {
            return Err(MediaError::ExtensionNotAllowed {
                kind,
                extension: String::new(),
            })
        }
    };
    if !kind.allowed_extensions().contains(&extension.as_str()) {
        return Err(MediaError::ExtensionNotAllowed { kind, extension });
    }

    Ok(name.to_string())
}

/// Absolute path of a sanitized file under the media root
pub fn resolve_path(media_root: &Path, kind: MediaKind, name: &str) -> Result<PathBuf, MediaError> {
    let name = sanitize_file_name(kind, name)?;
    Ok(media_root.join(kind.folder()).join(name))
}

/// Content type for an allowed extension
pub fn content_type(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        assert_eq!(
            sanitize_file_name(MediaKind::Audio, "o-pequeno-principe.mp3").unwrap(),
            "o-pequeno-principe.mp3"
        );
        assert!(sanitize_file_name(MediaKind::Cover, "Capa.JPG").is_ok());
        assert!(sanitize_file_name(MediaKind::Pdf, "resumo v2.pdf").is_ok());
    }

    #[test]
    fn test_rejects_traversal() {
        for name in [
            "../secret.mp3",
            "..\\secret.mp3",
            "a/../../b.mp3",
            "sub/file.mp3",
            "/etc/passwd.mp3",
            "C:evil.mp3",
            ".hidden.mp3",
            "bad\0.mp3",
            "a..mp3",
        ] {
            assert!(
                matches!(
                    sanitize_file_name(MediaKind::Audio, name),
                    Err(MediaError::IllegalName(_))
                ),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_extension_allow_list() {
        assert!(matches!(
            sanitize_file_name(MediaKind::Audio, "book.pdf"),
            Err(MediaError::ExtensionNotAllowed { .. })
        ));
        assert!(matches!(
            sanitize_file_name(MediaKind::Pdf, "noextension"),
            Err(MediaError::ExtensionNotAllowed { .. })
        ));
        assert!(matches!(
            sanitize_file_name(MediaKind::Cover, "script.svg"),
            Err(MediaError::ExtensionNotAllowed { .. })
        ));
    }

    #[test]
    fn test_length_limits() {
        assert_eq!(sanitize_file_name(MediaKind::Pdf, ""), Err(MediaError::Empty));
        let long = format!("{}.pdf", "a".repeat(MAX_FILE_NAME_BYTES));
        assert_eq!(sanitize_file_name(MediaKind::Pdf, &long), Err(MediaError::TooLong));
    }

    #[test]
    fn test_resolve_path_stays_in_kind_folder() {
        let path = resolve_path(Path::new("/srv/media"), MediaKind::Pdf, "livro.pdf").unwrap();
        assert_eq!(path, PathBuf::from("/srv/media/pdf/livro.pdf"));
    }

    #[test]
    fn test_kind_parsing_and_gating() {
        assert_eq!("covers".parse::<MediaKind>().unwrap(), MediaKind::Cover);
        assert!("scripts".parse::<MediaKind>().is_err());
        assert!(MediaKind::Audio.requires_access());
        assert!(!MediaKind::Cover.requires_access());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type("a.MP3"), "audio/mpeg");
        assert_eq!(content_type("a.pdf"), "application/pdf");
        assert_eq!(content_type("a"), "application/octet-stream");
    }
}
