use nix::unistd::{AccessFlags, access};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Ordered list of directories probed for executables.
///
/// Built from a `PATH`-style string every time it is needed and dropped after use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    entries: Vec<PathBuf>,
}

impl SearchPath {
    /// Split a colon separated list. Empty entries mean the current directory.
    pub fn parse(value: &str) -> Self {
        let entries = std::env::split_paths(OsStr::new(value))
            .map(|p| {
                if p.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    p
                }
            })
            .collect();
        Self { entries }
    }

    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `path` exists and the current user may execute it.
pub fn is_executable(path: &Path) -> bool {
    !path.as_os_str().is_empty() && access(path, AccessFlags::X_OK).is_ok() && !path.is_dir()
}

/// Return `dir/name` for the first entry of `path` where that file is executable.
pub fn first_match(name: &str, path: &SearchPath) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    path.entries
        .iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

/// Every executable `dir/name` in search path order. Empty when nothing matches.
pub fn all_matches(name: &str, path: &SearchPath) -> Vec<PathBuf> {
    if name.is_empty() {
        return Vec::new();
    }
    path.entries
        .iter()
        .map(|dir| dir.join(name))
        .filter(|candidate| is_executable(candidate))
        .collect()
}

/// Resolve a command the way the launcher does.
///
/// Behavior:
/// - A name with a path separator (`/bin/ls`, `./run`, `bin/tool`) is used as-is
///   when it is executable.
/// - Otherwise, the search path is consulted with [`first_match`]. A bare name is
///   never run from the working directory unless `PATH` names it (`.` or an
///   empty entry).
///
/// Returns a borrowed path for the direct case and an owned one for a search hit.
pub fn resolve_command<'a>(name: &'a str, path: &SearchPath) -> Option<Cow<'a, Path>> {
    let direct = Path::new(name);
    if name.contains('/') {
        return is_executable(direct).then_some(Cow::Borrowed(direct));
    }
    first_match(name, path).map(Cow::Owned)
}
