//! Container formats, media types and fixed frame geometry.
//!
//! These are the leaf data types the recipe table is keyed on: which
//! container a file uses, what kind of stream a discovered pad carries,
//! and the fixed output geometry applied by capsfilter stages.

use std::fmt;

/// A supported container format, derived from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// ISO MP4 (qtdemux + H.264).
    Mp4,
    /// AVI (avidemux + MPEG-4 part 2).
    Avi,
    /// WebM (matroskademux + VP8).
    Webm,
    /// MP3 audio, no video track.
    Mp3,
}

impl ContainerFormat {
    /// Look up a format from a file extension, case-folded.
    ///
    /// Returns `None` for anything outside the supported set; callers
    /// surface that as [`Error::UnsupportedFormat`](crate::Error).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp4" => Some(Self::Mp4),
            "avi" => Some(Self::Avi),
            "webm" => Some(Self::Webm),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    /// Whether this container carries a video track.
    pub fn is_video_container(&self) -> bool {
        !matches!(self, Self::Mp3)
    }

    /// Canonical extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Avi => "avi",
            Self::Webm => "webm",
            Self::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Broad category of a negotiated stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamCategory {
    /// Video streams (`video/...`).
    Video,
    /// Audio streams (`audio/...`).
    Audio,
    /// Subtitle / text streams (`text/...`).
    Text,
    /// Anything else.
    Other,
}

/// A negotiated media type, e.g. `video/x-raw` or `audio/mpeg`.
///
/// The category is derived from the prefix before the slash; the full
/// string is kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType(String);

impl MediaType {
    /// Wrap a media type string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The full type name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The broad category this type belongs to.
    pub fn category(&self) -> StreamCategory {
        match self.0.split('/').next().unwrap_or("") {
            "video" => StreamCategory::Video,
            "audio" => StreamCategory::Audio,
            "text" => StreamCategory::Text,
            _ => StreamCategory::Other,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MediaType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// An exact framerate as a rational number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    /// Numerator.
    pub num: i32,
    /// Denominator.
    pub den: i32,
}

impl Fraction {
    /// Create a new fraction.
    pub fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Fixed output frame geometry and rate applied by a capsfilter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSettings {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output framerate.
    pub framerate: Fraction,
}

impl FrameSettings {
    /// Geometry used for extracted still frames.
    pub fn still_frame() -> Self {
        Self {
            width: 900,
            height: 500,
            framerate: Fraction::new(1, 10),
        }
    }

    /// Geometry used when streaming a frozen still to a peer.
    pub fn still_stream() -> Self {
        Self {
            width: 579,
            height: 386,
            framerate: Fraction::new(1, 10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ContainerFormat::from_extension("mp4"), Some(ContainerFormat::Mp4));
        assert_eq!(ContainerFormat::from_extension(".AVI"), Some(ContainerFormat::Avi));
        assert_eq!(ContainerFormat::from_extension("WebM"), Some(ContainerFormat::Webm));
        assert_eq!(ContainerFormat::from_extension("mp3"), Some(ContainerFormat::Mp3));
        assert_eq!(ContainerFormat::from_extension("mkv"), None);
        assert_eq!(ContainerFormat::from_extension(""), None);
    }

    #[test]
    fn test_video_container() {
        assert!(ContainerFormat::Mp4.is_video_container());
        assert!(ContainerFormat::Webm.is_video_container());
        assert!(!ContainerFormat::Mp3.is_video_container());
    }

    #[test]
    fn test_media_type_category() {
        assert_eq!(MediaType::new("video/x-raw").category(), StreamCategory::Video);
        assert_eq!(MediaType::new("video/x-h264").category(), StreamCategory::Video);
        assert_eq!(MediaType::new("audio/mpeg").category(), StreamCategory::Audio);
        assert_eq!(MediaType::new("text/x-raw").category(), StreamCategory::Text);
        assert_eq!(MediaType::new("application/x-id3").category(), StreamCategory::Other);
        assert_eq!(MediaType::new("").category(), StreamCategory::Other);
    }

    #[test]
    fn test_fraction_display() {
        assert_eq!(Fraction::new(1, 10).to_string(), "1/10");
        assert_eq!(Fraction::new(30, 1).to_string(), "30/1");
    }
}
