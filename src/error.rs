//! Command-facing error kinds and their process exit codes.
//!
//! The original C drivers exit with the raw `errno` value appropriate to
//! the failure (`ENOENT`, `EISDIR`, ...). This keeps the same convention
//! via the `libc` crate's constants instead of inventing new ones.

use std::fmt;
use std::process::ExitCode;

/// A command-level failure, each variant tied to the exit code the spec
/// assigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliError {
    /// Parent path component missing, path not absolute, or target missing
    /// for `rm`/`restore`.
    PathInvalid,
    /// A directory was supplied where a plain file was required.
    IsDirectory,
    /// The destination name already exists.
    AlreadyExists,
    /// A basename exceeded 255 bytes.
    NameTooLong,
    /// The source would not fit in the remaining free blocks.
    NoSpace,
    /// Recursive restore could not recover every descendant; whatever
    /// could be restored was restored.
    PartialRestore,
}

impl CliError {
    /// The `errno` value this error exits the process with.
    pub fn exit_code(self) -> i32 {
        match self {
            CliError::PathInvalid => libc::ENOENT,
            CliError::IsDirectory => libc::EISDIR,
            CliError::AlreadyExists => libc::EEXIST,
            CliError::NameTooLong => libc::ENAMETOOLONG,
            CliError::NoSpace => libc::ENOSPC,
            CliError::PartialRestore => libc::ENOENT,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CliError::PathInvalid => "no such file or directory",
            CliError::IsDirectory => "is a directory",
            CliError::AlreadyExists => "file exists",
            CliError::NameTooLong => "file name too long",
            CliError::NoSpace => "no space left on device",
            CliError::PartialRestore => "not all descendants could be restored",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for CliError {}

/// Prints `{bin}: error: {err}` to stderr and exits with `err`'s errno.
/// Used by the command drivers' `main` functions on the `Err` path.
pub fn fail(bin: &str, err: CliError) -> ! {
    eprintln!("{bin}: error: {err}");
    std::process::exit(err.exit_code());
}

/// Prints `{bin}: error: {msg}` to stderr and exits with 1. Used for
/// fatal I/O failures (open/mmap) that precede any domain-level check.
pub fn io_fatal<M: fmt::Display>(bin: &str, msg: M) -> ! {
    eprintln!("{bin}: error: {msg}");
    std::process::exit(1);
}

/// Converts an exit-code-carrying `Result` into a process `ExitCode`,
/// printing the error first. Kept separate from `fail` so drivers that
/// want `fn main() -> ExitCode` can use it without an explicit `exit` call.
pub fn to_exit_code(bin: &str, result: Result<(), CliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{bin}: error: {err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
