use std::path::MAIN_SEPARATOR;

pub(crate) const SEPARATOR: char = '/';

/// Directories kept in front of the file name when no prefix matches.
pub const DEFAULT_KEEP_DIRS: usize = 1;

pub(crate) fn is_separator(c: char) -> bool {
    c == SEPARATOR || c == MAIN_SEPARATOR
}

/// Turns absolute source paths into module relative ones.
///
/// Each module that logs through a shared logger registers its root
/// directory once; the longest registered root matching a path is cut off
/// when the path is rendered. Paths outside every root keep only their last
/// few components.
#[derive(Debug, Clone)]
pub struct PrefixTrimCache {
    /// Sorted by length, longest first. Equal lengths stay in insertion order.
    prefixes: Vec<String>,
    keep_dirs: usize,
}

impl Default for PrefixTrimCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTrimCache {
    pub fn new() -> Self {
        PrefixTrimCache {
            prefixes: Vec::new(),
            keep_dirs: DEFAULT_KEEP_DIRS,
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn keep_dirs(&self) -> usize {
        self.keep_dirs
    }

    /// Set how many directories to keep in front of the file name for paths
    /// that match no prefix. With `/a/b/c/f.rs` and `n == 2` the path renders
    /// as `b/c/f.rs`; `0` keeps the file name only.
    pub fn set_keep_dirs(&mut self, n: usize) {
        self.keep_dirs = n;
    }

    /// Insert `prefix` verbatim. Returns `false` when it was already present.
    pub fn insert_prefix(&mut self, prefix: &str) -> bool {
        let at = self.prefixes.partition_point(|p| p.len() >= prefix.len());

        let present = self.prefixes[..at]
            .iter()
            .rev()
            .take_while(|p| p.len() == prefix.len())
            .any(|p| p == prefix);
        if present {
            return false;
        }

        self.prefixes.insert(at, prefix.to_owned());
        true
    }

    /// Register a directory prefix. A trailing separator is appended when
    /// missing so that `/a/b` never matches `/a/bc/file.rs`.
    pub fn add_prefix(&mut self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return false;
        }
        if prefix.ends_with(is_separator) {
            self.insert_prefix(prefix)
        } else {
            self.insert_prefix(&format!("{prefix}{SEPARATOR}"))
        }
    }

    /// Register the directory `up_n_dirs` levels above the one holding `file`
    /// and return the prefix. Climbing past the start of a relative path
    /// yields an empty prefix which is not registered: such paths are already
    /// relative to the build root.
    pub fn add_ancestor_prefix(&mut self, file: &str, up_n_dirs: usize) -> String {
        let dir = ancestor_dir(file, up_n_dirs);
        if dir.is_empty() {
            return String::new();
        }

        let prefix = if dir.ends_with(is_separator) {
            dir.to_owned()
        } else {
            format!("{dir}{SEPARATOR}")
        };
        self.insert_prefix(&prefix);
        prefix
    }

    /// Remove the longest registered prefix from `path`, falling back to the
    /// last `keep_dirs + 1` components.
    pub fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        for prefix in &self.prefixes {
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                return rest;
            }
        }
        self.keep_tail(path)
    }

    fn keep_tail<'a>(&self, path: &'a str) -> &'a str {
        let keep = self.keep_dirs.saturating_add(1);
        match path.rmatch_indices(is_separator).nth(keep - 1) {
            Some((at, sep)) => &path[at + sep.len()..],
            None => path,
        }
    }
}

fn ancestor_dir(file: &str, up_n_dirs: usize) -> &str {
    let mut dir = file;
    for _ in 0..=up_n_dirs {
        dir = match dir.rfind(is_separator) {
            Some(0) => &dir[..1],
            Some(at) => &dir[..at],
            None => "",
        };
    }
    dir
}
