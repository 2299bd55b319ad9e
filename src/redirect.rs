//! Opening redirection targets under the clobber-protection policy.

use crate::error::ShellError;
use crate::parser::{Direction, Redirect};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Permission bits for files created by a redirection (`rw-r-----`).
const CREATE_MODE: u32 = 0o640;

/// Open the file an output redirection writes to.
///
/// | noclobber | `>` / `>&`                     | `>>` / `>>&`                  |
/// |-----------|--------------------------------|-------------------------------|
/// | off       | truncate or create             | append or create              |
/// | on        | create, fail if it exists      | append, fail if it is missing |
pub fn resolve_output(target: &Path, append: bool, noclobber: bool) -> Result<File, ShellError> {
    let mut options = OpenOptions::new();
    options.write(true).mode(CREATE_MODE);
    match (append, noclobber) {
        (false, false) => options.create(true).truncate(true),
        (false, true) => options.create_new(true),
        (true, false) => options.create(true).append(true),
        (true, true) => options.append(true),
    };
    options.open(target).map_err(|source| match source.kind() {
        ErrorKind::AlreadyExists if noclobber && !append => {
            ShellError::FileExists(target.to_path_buf())
        }
        ErrorKind::NotFound if noclobber && append => ShellError::NoSuchFile(target.to_path_buf()),
        _ => ShellError::OpenTarget {
            path: target.to_path_buf(),
            source,
        },
    })
}

/// Open the file an input redirection reads from. A missing file is an error.
pub fn resolve_input(target: &Path) -> Result<File, ShellError> {
    File::open(target).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ShellError::NoSuchFile(target.to_path_buf()),
        _ => ShellError::OpenTarget {
            path: target.to_path_buf(),
            source,
        },
    })
}

/// Streams a command writes to once its redirection has been applied.
pub enum OutputTarget {
    /// No output redirection; use the terminal.
    Inherit,
    /// Only standard output goes to the file.
    Stdout(File),
    /// Standard output and standard error both go to the file.
    Both(File),
}

impl OutputTarget {
    /// Open the output side of `redirect`, if it has one.
    pub fn resolve(redirect: Option<&Redirect>, noclobber: bool) -> Result<Self, ShellError> {
        match redirect {
            Some(r) if r.direction == Direction::Out => {
                let file = resolve_output(&r.target, r.append, noclobber)?;
                Ok(if r.both_streams {
                    OutputTarget::Both(file)
                } else {
                    OutputTarget::Stdout(file)
                })
            }
            _ => Ok(OutputTarget::Inherit),
        }
    }
}
