//! Metadata reporting collaborator.
//!
//! The live session's `m` command delegates here. The trait keeps the
//! reporting pluggable; the shipped reporter only knows what the filesystem
//! and the extension table can tell it.

use crate::format::ContainerFormat;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Produces a printable report for a media path.
pub trait MetadataReporter: Send {
    /// Build the report.
    fn report(&self, path: &Path) -> String;
}

/// Reporter backed by filesystem metadata and the format table.
#[derive(Debug, Default)]
pub struct BasicReporter;

impl MetadataReporter for BasicReporter {
    fn report(&self, path: &Path) -> String {
        let mut out = String::new();

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let _ = writeln!(out, "file      : {name}");

        let format = path
            .extension()
            .and_then(|e| ContainerFormat::from_extension(&e.to_string_lossy()));
        match format {
            Some(format) => {
                let _ = writeln!(out, "container : {format}");
                let _ = writeln!(
                    out,
                    "tracks    : {}",
                    if format.is_video_container() {
                        "video+audio"
                    } else {
                        "audio"
                    }
                );
            }
            None => {
                let _ = writeln!(out, "container : unknown");
            }
        }

        match fs::metadata(path) {
            Ok(meta) => {
                let _ = writeln!(out, "size      : {} bytes", meta.len());
            }
            Err(_) => {
                let _ = writeln!(out, "size      : unknown");
            }
        }

        out.trim_end().to_string()
    }
}
