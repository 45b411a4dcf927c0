//! FileLink and its per-link status.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Per-link processing status.
///
/// State transitions (monotonic, never revert):
/// - New -> InProcess -> Completed
/// - New -> InProcess -> Error
/// - New -> Error (the job could not even start)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Attached, waiting for the task to reach its link quota.
    New,

    /// Part of a running processing job.
    InProcess,

    /// Fetched and written into the task's archive.
    Completed,

    /// Not part of the archive (fetch failed, or the job failed).
    Error,
}

impl LinkStatus {
    fn rank(self) -> u8 {
        match self {
            LinkStatus::New => 0,
            LinkStatus::InProcess => 1,
            LinkStatus::Completed | LinkStatus::Error => 2,
        }
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    /// Can a link move from `self` to `next`?
    pub fn can_advance_to(self, next: LinkStatus) -> bool {
        next.rank() > self.rank()
    }
}

/// One link inside a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLink {
    pub link: String,
    pub status: LinkStatus,
}

impl FileLink {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            status: LinkStatus::New,
        }
    }

    /// Move to `next` if the transition is forward; returns whether it moved.
    pub fn advance(&mut self, next: LinkStatus) -> bool {
        if self.status.can_advance_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    /// Archive entry name for this link: the last segment of the URL path.
    pub fn file_name(&self) -> String {
        url_basename(&self.link)
    }
}

/// Last path segment of a URL, without query or fragment.
///
/// Falls back to the whole input when the path has no usable segment.
pub fn url_basename(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    let path = without_query
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or(""))
        .unwrap_or(without_query);

    match path.rsplit('/').find(|segment| !segment.is_empty()) {
        Some(name) => name.to_string(),
        None => without_query.replace(['/', ':'], "_"),
    }
}

/// Make `name` unique within `used` by adding `-1`, `-2`, ... before the extension.
pub fn unique_entry_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    };
    let mut n = 1;
    loop {
        let candidate = format!("{stem}-{n}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
