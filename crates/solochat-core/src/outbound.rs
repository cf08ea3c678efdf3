//! Synchronous validation for the send builders.
//!
//! Everything here runs on the caller's thread before a work item exists, so a
//! rejected call never leaves an open handle behind.

use std::{
    fmt,
    fs::File,
    path::{Path, PathBuf},
};

use crate::{dispatch::OutboundCommand, messaging::types::MediaStream};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Document,
    Photo,
    Video,
    Audio,
}

impl MediaKind {
    /// Accepted lowercase extensions; `None` means any file is accepted.
    pub fn allowed_extensions(self) -> Option<&'static [&'static str]> {
        match self {
            MediaKind::Document => None,
            MediaKind::Photo => Some(&["png", "jpg"]),
            MediaKind::Video => Some(&["mp4"]),
            MediaKind::Audio => Some(&["mp3", "m4a"]),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Document => "document",
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    pub(crate) fn into_command(self, file: MediaStream, caption: Option<String>) -> OutboundCommand {
        match self {
            MediaKind::Document => OutboundCommand::Document { file, caption },
            MediaKind::Photo => OutboundCommand::Photo(file),
            MediaKind::Video => OutboundCommand::Video(file),
            MediaKind::Audio => OutboundCommand::Audio(file),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a send builder returned `false`.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("dispatcher is shut down")]
    Closed,

    #[error("no chat has been latched yet")]
    NoChat,

    #[error("text is blank")]
    BlankText,

    #[error("coordinates out of range: {latitude}, {longitude}")]
    BadCoordinates { latitude: f64, longitude: f64 },

    #[error("unsupported {kind} extension: {path}")]
    Extension { kind: MediaKind, path: PathBuf },

    #[error("file not found: {0}")]
    Missing(PathBuf),

    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub fn check_text(text: &str) -> Result<(), Rejection> {
    if text.trim().is_empty() {
        return Err(Rejection::BlankText);
    }
    Ok(())
}

pub fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), Rejection> {
    let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
    let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
    if lat_ok && lon_ok {
        Ok(())
    } else {
        Err(Rejection::BadCoordinates {
            latitude,
            longitude,
        })
    }
}

/// Case-insensitive extension check against `kind`'s allow-list.
pub fn check_extension(kind: MediaKind, path: &Path) -> Result<(), Rejection> {
    let Some(allowed) = kind.allowed_extensions() else {
        return Ok(());
    };
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if allowed.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(Rejection::Extension {
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// Validate and open a media file. The handle is only created once every check passed.
pub fn open_media(kind: MediaKind, path: &Path) -> Result<MediaStream, Rejection> {
    check_extension(kind, path)?;
    if !path.is_file() {
        return Err(Rejection::Missing(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|source| Rejection::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(MediaStream::from_file(path, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(name: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = PathBuf::from(format!("/tmp/solochat-outbound-{}-{ts}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, b"bytes").unwrap();
        path
    }

    #[test]
    fn blank_text_is_rejected() {
        assert!(check_text("hello").is_ok());
        assert!(matches!(check_text("   \n\t"), Err(Rejection::BlankText)));
        assert!(matches!(check_text(""), Err(Rejection::BlankText)));
    }

    #[test]
    fn coordinates_must_be_finite_and_in_range() {
        assert!(check_coordinates(48.8566, 2.3522).is_ok());
        assert!(check_coordinates(-90.0, 180.0).is_ok());
        assert!(check_coordinates(90.5, 0.0).is_err());
        assert!(check_coordinates(0.0, -181.0).is_err());
        assert!(check_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn extension_allow_lists() {
        assert!(check_extension(MediaKind::Photo, Path::new("a.png")).is_ok());
        assert!(check_extension(MediaKind::Photo, Path::new("a.JPG")).is_ok());
        assert!(check_extension(MediaKind::Photo, Path::new("a.gif")).is_err());
        assert!(check_extension(MediaKind::Photo, Path::new("a.jpeg")).is_err());
        assert!(check_extension(MediaKind::Video, Path::new("clip.mp4")).is_ok());
        assert!(check_extension(MediaKind::Video, Path::new("clip.mov")).is_err());
        assert!(check_extension(MediaKind::Audio, Path::new("song.mp3")).is_ok());
        assert!(check_extension(MediaKind::Audio, Path::new("song.m4a")).is_ok());
        assert!(check_extension(MediaKind::Audio, Path::new("song")).is_err());
        assert!(check_extension(MediaKind::Document, Path::new("anything.bin")).is_ok());
    }

    #[test]
    fn open_media_checks_extension_before_existence() {
        let err = open_media(MediaKind::Photo, Path::new("/definitely/missing.gif")).unwrap_err();
        assert!(matches!(err, Rejection::Extension { kind: MediaKind::Photo, .. }));

        let err = open_media(MediaKind::Photo, Path::new("/definitely/missing.png")).unwrap_err();
        assert!(matches!(err, Rejection::Missing(_)));
    }

    #[test]
    fn open_media_rejects_directories() {
        let path = tmp_file("x.bin");
        let dir = path.parent().unwrap().to_path_buf();
        assert!(matches!(
            open_media(MediaKind::Document, &dir),
            Err(Rejection::Missing(_))
        ));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn open_media_names_stream_after_file() {
        let path = tmp_file("cat.png");
        let stream = open_media(MediaKind::Photo, &path).unwrap();
        assert_eq!(stream.file_name, "cat.png");
        drop(stream);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
