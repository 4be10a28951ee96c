#![forbid(unsafe_code)]

//! Operator input files: API keys, the date window and the channel list.
//!
//! Problems found here are configuration errors and stop the run before any
//! request is sent.

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use std::{fs, path::Path};

/// Format of both lines of the dates file.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Platform channel ids all start with this prefix.
pub const CHANNEL_ID_PREFIX: &str = "UC";

/// One line of the channels file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    Id(String),
    /// Free text that has to be resolved through a channel search.
    Name(String),
}

impl ChannelRef {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.starts_with(CHANNEL_ID_PREFIX) {
            ChannelRef::Id(line.to_string())
        } else {
            ChannelRef::Name(line.to_string())
        }
    }
}

/// Inclusive calendar window, queried as `[start 00:00, end + 1 day 00:00)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionWindow {
    start: NaiveDate,
    end: NaiveDate,
    end_exclusive: NaiveDate,
}

impl CollectionWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("start date {start} is after end date {end}");
        }
        let end_exclusive = end
            .succ_opt()
            .ok_or_else(|| anyhow!("end date {end} is out of range"))?;
        Ok(Self {
            start,
            end,
            end_exclusive,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn published_after(&self) -> String {
        midnight_utc(self.start)
    }

    pub fn published_before(&self) -> String {
        midnight_utc(self.end_exclusive)
    }
}

fn midnight_utc(date: NaiveDate) -> String {
    date.format("%Y-%m-%dT00:00:00Z").to_string()
}

fn non_blank_lines(path: &Path) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn read_api_keys(path: &Path) -> Result<Vec<String>> {
    let keys = non_blank_lines(path)?;
    if keys.is_empty() {
        bail!("no API keys found in {}", path.display());
    }
    Ok(keys)
}

pub fn read_channels(path: &Path) -> Result<Vec<ChannelRef>> {
    Ok(non_blank_lines(path)?
        .iter()
        .map(|line| ChannelRef::parse(line))
        .collect())
}

pub fn read_date_range(path: &Path) -> Result<CollectionWindow> {
    let lines = non_blank_lines(path)?;
    let [start, end, ..] = lines.as_slice() else {
        bail!(
            "{} must contain a start date and an end date (DD/MM/YYYY)",
            path.display()
        );
    };
    CollectionWindow::new(parse_date(start)?, parse_date(end)?)
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .with_context(|| format!("invalid date {value:?}, expected DD/MM/YYYY"))
}
