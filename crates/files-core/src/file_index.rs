//! Collision-free filename registry.
//!
//! `FileIndex` maps every filename it knows about to the highest copy number
//! handed out for it. It is seeded once from the storage directory and then
//! grows with every resolution for the lifetime of the process. Names are
//! reserved when they are resolved, not when a file is written: an upload
//! that later fails still consumes its name.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace, warn};

use crate::constants::COPY_SUFFIX;
use crate::error::Result;

/// Split a filename into its base and extension.
///
/// The extension starts at the final `.` and includes it, so `"a.tar.gz"`
/// splits into `("a.tar", ".gz")` and `".bashrc"` into `("", ".bashrc")`.
/// Names without a dot have an empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) => name.split_at(dot),
        None => (name, ""),
    }
}

/// Build `<base><COPY_SUFFIX><copy><ext>`.
pub fn copy_name(base: &str, copy: u64, ext: &str) -> String {
    format!("{base}{COPY_SUFFIX}{copy}{ext}")
}

/// Parse the copy number of `candidate` relative to the base name `base`.
///
/// `candidate` must start with `base`; the rest, minus its own extension,
/// must contain `COPY_SUFFIX` followed only by a decimal number. The
/// rightmost occurrence of the suffix is used.
fn copy_number(base: &str, candidate: &str) -> Option<u64> {
    let rest = candidate.strip_prefix(base)?;
    let (rest_base, _) = split_extension(rest);
    let start = rest_base.rfind(COPY_SUFFIX)? + COPY_SUFFIX.len();
    rest_base[start..].parse().ok()
}

/// Registry of reserved filenames and their copy counters.
///
/// Shared between connection tasks behind an `Arc`; every resolution runs
/// under one lock so concurrent requests for the same name never receive the
/// same answer.
#[derive(Debug, Default)]
pub struct FileIndex {
    index: Mutex<HashMap<String, u64>>,
}

impl FileIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a snapshot of existing filenames.
    ///
    /// For every name, the counter is the largest copy number among the
    /// names that extend its base with `_copy<n>`, or 0 when there are
    /// none. This compares every pair of names, which is fine for a one-off
    /// startup scan.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(names.len());

        for name in &names {
            let (base, _) = split_extension(name);
            let latest = names
                .iter()
                .filter_map(|candidate| copy_number(base, candidate))
                .max()
                .unwrap_or(0);

            if latest > 0 {
                trace!(name = %name, latest, "Seeded copy counter");
            }
            index.insert(name.clone(), latest);
        }

        Self {
            index: Mutex::new(index),
        }
    }

    /// Build an index from the entries of a directory.
    ///
    /// Every entry counts, directories included. Entries whose names are not
    /// valid UTF-8 cannot be requested over the wire and are skipped.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "Skipping non UTF-8 directory entry"),
            }
        }

        debug!(dir = %dir.display(), entries = names.len(), "Scanned storage directory");
        Ok(Self::from_names(names))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        // The map is never left half-updated, so a poisoned lock is still usable.
        self.index.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve a requested filename to a name nobody else has been given.
    ///
    /// An unknown name is returned unchanged. A known name `F` with counter
    /// `k` yields `<base>_copy<k+1><ext>`, skipping numbers whose name is
    /// already reserved, and `F`'s counter moves to the number used. Once
    /// the counter reaches `u64::MAX`, copies are numbered under the last
    /// copy's name (`<base>_copy<MAX>_copy1<ext>` and so on). The returned
    /// name is never one already reserved, and is reserved with counter 0
    /// before the lock is released.
    pub fn resolve(&self, requested: &str) -> String {
        let mut index = self.lock();

        let resolved = match index.get(requested).copied() {
            None => requested.to_string(),
            Some(counter) => {
                let (base, ext) = split_extension(requested);
                let mut base = base.to_string();
                let mut copy = counter.saturating_add(1);
                let mut nested = false;
                let mut candidate = copy_name(&base, copy, ext);
                while index.contains_key(&candidate) {
                    if copy == u64::MAX {
                        // Copy numbers for this base are used up; number
                        // copies of the last one instead.
                        base = format!("{base}{COPY_SUFFIX}{copy}");
                        copy = 1;
                        nested = true;
                    } else {
                        copy += 1;
                    }
                    candidate = copy_name(&base, copy, ext);
                }
                let counter = if nested { u64::MAX } else { copy };
                index.insert(requested.to_string(), counter);
                candidate
            }
        };

        index.insert(resolved.clone(), 0);
        resolved
    }

    /// Current copy counter for `name`, if the name is known.
    pub fn copy_counter(&self, name: &str) -> Option<u64> {
        self.lock().get(name).copied()
    }

    /// Number of known names.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no name is known yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn split_extension_variants() {
        assert_eq!(split_extension("notes.txt"), ("notes", ".txt"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("README"), ("README", ""));
        assert_eq!(split_extension(".bashrc"), ("", ".bashrc"));
        assert_eq!(split_extension("trailing."), ("trailing", "."));
    }

    #[test]
    fn copy_number_parsing() {
        assert_eq!(copy_number("a", "a_copy3.txt"), Some(3));
        assert_eq!(copy_number("a", "a.txt"), None);
        assert_eq!(copy_number("a", "a_copyX.txt"), None);
        assert_eq!(copy_number("a", "a_copy.txt"), None);
        assert_eq!(copy_number("a", "b_copy1.txt"), None);
        // Rightmost suffix wins.
        assert_eq!(copy_number("a", "a_copy1_copy7.txt"), Some(7));
    }

    #[test]
    fn resolve_fresh_name_is_unchanged() {
        let index = FileIndex::new();
        assert_eq!(index.resolve("notes.txt"), "notes.txt");
        assert_eq!(index.copy_counter("notes.txt"), Some(0));
    }

    #[test]
    fn resolve_repeated_name_counts_up() {
        let index = FileIndex::new();
        assert_eq!(index.resolve("notes.txt"), "notes.txt");
        assert_eq!(index.resolve("notes.txt"), "notes_copy1.txt");
        assert_eq!(index.resolve("notes.txt"), "notes_copy2.txt");

        assert_eq!(index.copy_counter("notes.txt"), Some(2));
        assert_eq!(index.copy_counter("notes_copy1.txt"), Some(0));
        assert_eq!(index.copy_counter("notes_copy2.txt"), Some(0));
    }

    #[test]
    fn resolve_without_extension() {
        let index = FileIndex::new();
        index.resolve("Makefile");
        assert_eq!(index.resolve("Makefile"), "Makefile_copy1");
    }

    #[test]
    fn resolve_copy_of_a_copy() {
        let index = FileIndex::new();
        index.resolve("a.txt");
        assert_eq!(index.resolve("a.txt"), "a_copy1.txt");
        assert_eq!(index.resolve("a_copy1.txt"), "a_copy1_copy1.txt");
    }

    #[test]
    fn resolve_skips_names_reserved_verbatim() {
        let index = FileIndex::new();
        assert_eq!(index.resolve("a_copy1.txt"), "a_copy1.txt");
        assert_eq!(index.resolve("a.txt"), "a.txt");
        assert_eq!(index.resolve("a.txt"), "a_copy2.txt");
        assert_eq!(index.copy_counter("a.txt"), Some(2));
    }

    #[test]
    fn seed_records_highest_copy() {
        let index = FileIndex::from_names(["a.txt", "a_copy3.txt", "b.txt"]);
        assert_eq!(index.copy_counter("a.txt"), Some(3));
        assert_eq!(index.copy_counter("a_copy3.txt"), Some(0));
        assert_eq!(index.copy_counter("b.txt"), Some(0));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn seed_ignores_non_numeric_copies() {
        let index =
            FileIndex::from_names(["report.txt", "report_copy2.txt", "report_copyX.txt"]);
        assert_eq!(index.copy_counter("report.txt"), Some(2));
        assert_eq!(index.copy_counter("report_copyX.txt"), Some(0));
    }

    #[test]
    fn seeded_collision_never_recreates_existing_name() {
        let index = FileIndex::from_names(["a.txt", "a_copy3.txt"]);
        assert_eq!(index.resolve("a.txt"), "a_copy4.txt");
    }

    #[test]
    fn exhausted_counter_never_reissues_existing_name() {
        let max = format!("a_copy{}.txt", u64::MAX);
        let index = FileIndex::from_names(["a.txt".to_string(), max.clone()]);
        assert_eq!(index.copy_counter("a.txt"), Some(u64::MAX));

        let first = index.resolve("a.txt");
        assert_ne!(first, max);
        assert_eq!(first, format!("a_copy{}_copy1.txt", u64::MAX));

        let second = index.resolve("a.txt");
        assert_eq!(second, format!("a_copy{}_copy2.txt", u64::MAX));
        assert_eq!(index.copy_counter("a.txt"), Some(u64::MAX));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn seed_shares_counter_across_extensions() {
        // Any name extending the base counts, whatever its extension.
        let index = FileIndex::from_names(["data.csv", "data_copy5.json"]);
        assert_eq!(index.copy_counter("data.csv"), Some(5));
    }

    #[test]
    fn seed_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("a_copy2.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("photos")).unwrap();

        let index = FileIndex::from_dir(dir.path()).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.copy_counter("a.txt"), Some(2));
        assert_eq!(index.copy_counter("photos"), Some(0));
        assert_eq!(index.resolve("photos"), "photos_copy1");
    }

    #[test]
    fn seed_from_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileIndex::from_dir(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn concurrent_resolution_is_unique() {
        let index = Arc::new(FileIndex::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| index.resolve("same.bin"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(seen.insert(name.clone()), "duplicate name {name}");
            }
        }

        assert_eq!(seen.len(), 800);
        assert!(seen.contains("same.bin"));
        assert!(seen.contains("same_copy799.bin"));
        assert_eq!(index.copy_counter("same.bin"), Some(799));
    }
}
