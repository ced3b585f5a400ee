//! Files touched per revision.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::warn;

/// How a file was touched in a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeStatus {
    /// `A`
    Added,
    /// `M`
    Modified,
    /// `D`
    Deleted,
    /// `R`
    Renamed,
    /// `U`
    Untracked,
}

impl ChangeStatus {
    /// Parses a `git diff --name-status` status column.
    ///
    /// Only the first letter is significant, so `R100` is a rename. Copies and
    /// type changes count as modifications.
    #[must_use]
    pub fn from_letter(status: &str) -> Option<Self> {
        match status.chars().next()? {
            'A' => Some(Self::Added),
            'M' | 'C' | 'T' => Some(Self::Modified),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            'U' | '?' => Some(Self::Untracked),
            _ => None,
        }
    }

    /// Returns the single letter form.
    #[must_use]
    pub const fn letter(&self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Untracked => 'U',
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// The set of files touched at one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// Revision identifier.
    pub sha: String,
    /// Position in history; higher is more recent.
    pub ord: u64,
    files: BTreeMap<String, ChangeStatus>,
}

impl Changeset {
    /// Creates a changeset from a file to status mapping.
    #[must_use]
    pub fn new(
        sha: impl Into<String>,
        ord: u64,
        files: impl IntoIterator<Item = (impl Into<String>, ChangeStatus)>,
    ) -> Self {
        Self {
            sha: sha.into(),
            ord,
            files: files.into_iter().map(|(f, s)| (f.into(), s)).collect(),
        }
    }

    /// Creates a changeset touching no files.
    #[must_use]
    pub fn empty(sha: impl Into<String>, ord: u64) -> Self {
        Self {
            sha: sha.into(),
            ord,
            files: BTreeMap::new(),
        }
    }

    /// Parses `git diff --name-status` output.
    ///
    /// Renames (`R100\told\tnew`) record the new path. Lines that cannot be
    /// parsed are skipped with a warning.
    #[must_use]
    pub fn from_diff<'a>(sha: impl Into<String>, ord: u64, lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut files = BTreeMap::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            let parsed = match parts.as_slice() {
                [status, path] => ChangeStatus::from_letter(status).map(|s| (*path, s)),
                [status, _old, new] if status.starts_with('R') || status.starts_with('C') => {
                    ChangeStatus::from_letter(status).map(|s| (*new, s))
                }
                _ => None,
            };
            match parsed {
                Some((path, status)) => {
                    files.insert(path.to_string(), status);
                }
                None => warn!(line = %line, "Skipping unparseable diff output line"),
            }
        }
        Self {
            sha: sha.into(),
            ord,
            files,
        }
    }

    /// Adds untracked files to the changeset.
    #[must_use]
    pub fn with_untracked_files(mut self, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for file in files {
            self.files.insert(file.into(), ChangeStatus::Untracked);
        }
        self
    }

    /// Returns the touched files matching any of `statuses`, or every touched
    /// file when no filter is given.
    #[must_use]
    pub fn files_touched(&self, statuses: Option<&[ChangeStatus]>) -> BTreeSet<&str> {
        match statuses {
            Some(filter) if !filter.is_empty() => self
                .files
                .iter()
                .filter(|(_, s)| filter.contains(s))
                .map(|(f, _)| f.as_str())
                .collect(),
            _ => self.files.keys().map(String::as_str).collect(),
        }
    }

    /// Returns the status of a touched file.
    #[must_use]
    pub fn status_of(&self, file: &str) -> Option<ChangeStatus> {
        self.files.get(file).copied()
    }

    /// Iterates over touched files with their status.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ChangeStatus)> {
        self.files.iter().map(|(f, s)| (f.as_str(), *s))
    }

    /// Returns true if no file was touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Sorts a change history most-recent-first.
pub fn sort_most_recent_first(history: &mut [Changeset]) {
    history.sort_by(|a, b| b.ord.cmp(&a.ord));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_letters() {
        assert_eq!(ChangeStatus::from_letter("A"), Some(ChangeStatus::Added));
        assert_eq!(ChangeStatus::from_letter("R087"), Some(ChangeStatus::Renamed));
        assert_eq!(ChangeStatus::from_letter("T"), Some(ChangeStatus::Modified));
        assert_eq!(ChangeStatus::from_letter("X"), None);
        assert_eq!(ChangeStatus::from_letter(""), None);
        assert_eq!(ChangeStatus::Deleted.to_string(), "D");
    }

    #[test]
    fn test_from_diff() {
        let changeset = Changeset::from_diff(
            "abc",
            3,
            [
                "M\tapps/a/src/main.rs",
                "R100\tapps/b/old.rs\tapps/b/new.rs",
                "D\tlibs/gone.py",
                "garbage",
                "",
            ],
        );

        assert_eq!(changeset.files_touched(None).len(), 3);
        assert_eq!(changeset.status_of("apps/b/new.rs"), Some(ChangeStatus::Renamed));
        assert_eq!(changeset.status_of("apps/b/old.rs"), None);
        assert_eq!(changeset.status_of("libs/gone.py"), Some(ChangeStatus::Deleted));
    }

    #[test]
    fn test_files_touched_filter() {
        let changeset = Changeset::new(
            "abc",
            1,
            [
                ("a.txt", ChangeStatus::Added),
                ("b.txt", ChangeStatus::Modified),
                ("c.txt", ChangeStatus::Deleted),
            ],
        );

        let added = changeset.files_touched(Some(&[ChangeStatus::Added]));
        assert_eq!(added.into_iter().collect::<Vec<_>>(), vec!["a.txt"]);

        let all = changeset.files_touched(Some(&[]));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_untracked_files() {
        let changeset = Changeset::empty("abc", 1).with_untracked_files(["scratch.md"]);
        assert_eq!(changeset.status_of("scratch.md"), Some(ChangeStatus::Untracked));
        assert!(!changeset.is_empty());
    }

    #[test]
    fn test_sort_most_recent_first() {
        let mut history = vec![
            Changeset::empty("old", 1),
            Changeset::empty("new", 3),
            Changeset::empty("mid", 2),
        ];
        sort_most_recent_first(&mut history);
        let shas: Vec<_> = history.iter().map(|c| c.sha.as_str()).collect();
        assert_eq!(shas, vec!["new", "mid", "old"]);
    }
}
