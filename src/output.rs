#![forbid(unsafe_code)]

//! Append-only CSV files, one pair per channel.
//!
//! Files are opened for every write and closed right after, so an interrupted
//! run keeps every row written before the interruption.

use crate::records::{COMMENT_HEADER, CommentRecord, VIDEO_HEADER, VideoRecord};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const MAX_STEM_CHARS: usize = 50;

/// Keeps alphanumerics, spaces and underscores, then turns spaces into
/// underscores and caps the result at 50 characters.
pub fn sanitize_file_stem(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    kept.trim_end()
        .replace(' ', "_")
        .chars()
        .take(MAX_STEM_CHARS)
        .collect()
}

/// The videos and comments files of one channel.
#[derive(Debug, Clone)]
pub struct ChannelFiles {
    pub videos: PathBuf,
    pub comments: PathBuf,
}

impl ChannelFiles {
    /// Picks the file names and writes each header if the file is new.
    /// Existing files are left untouched.
    pub fn prepare(
        output_dir: &Path,
        channel_id: &str,
        display_name: Option<&str>,
    ) -> Result<Self> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("creating output dir {}", output_dir.display()))?;

        let stem = display_name
            .map(sanitize_file_stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| channel_id.to_string());

        let files = Self {
            videos: output_dir.join(format!("{stem}_videos.csv")),
            comments: output_dir.join(format!("{stem}_comments.csv")),
        };
        write_header_once(&files.videos, &VIDEO_HEADER)?;
        write_header_once(&files.comments, &COMMENT_HEADER)?;
        Ok(files)
    }

    pub fn append_video(&self, record: &VideoRecord) -> Result<()> {
        append_rows(&self.videos, std::slice::from_ref(record))
    }

    pub fn append_comments(&self, records: &[CommentRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        append_rows(&self.comments, records)
    }
}

fn write_header_once(path: &Path, header: &[&str]) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(header)
        .with_context(|| format!("writing header of {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("appending to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}
