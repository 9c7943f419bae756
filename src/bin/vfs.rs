//! vfs - command-line front end for blockvault archives
//!
//! ```text
//! vfs <ARCHIVE> create <BLOCK_SIZE> <BLOCK_COUNT>
//! vfs <ARCHIVE> add <SOURCE> <NAME>
//! vfs <ARCHIVE> get <NAME> <DEST>
//! vfs <ARCHIVE> del <NAME>
//! vfs <ARCHIVE> free
//! vfs <ARCHIVE> used
//! vfs <ARCHIVE> list
//! ```
//!
//! The exit status is the contract: 0 on success, otherwise the code of
//! the [`ArchiveError`] that stopped the command.
//!
//! `<ARCHIVE>` is always the first argument and is taken verbatim, so an
//! archive may be named like a command (`vfs list list`).

use anyhow::Context;
use blockvault::config::{DEFAULT_LOG_FILTER, LOG_ENV_VAR};
use blockvault::error::USAGE_EXIT_CODE;
use blockvault::{ops, ArchiveError};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Everything after `<ARCHIVE>`
#[derive(Parser, Debug)]
#[command(name = "vfs")]
#[command(version, about = "Fixed-capacity block archive")]
#[command(override_usage = "vfs <ARCHIVE> <COMMAND>")]
#[command(after_help = "ARCHIVE is a path prefix; files are <ARCHIVE>.structure and <ARCHIVE>.store")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an empty archive
    Create {
        /// Bytes per block
        block_size: u64,
        /// Number of blocks
        block_count: u64,
    },

    /// Store a file under a name
    Add {
        /// File to read
        source: PathBuf,
        /// Name inside the archive
        name: String,
    },

    /// Copy a stored file out of the archive
    Get {
        /// Name inside the archive
        name: String,
        /// File to create or overwrite
        dest: PathBuf,
    },

    /// Remove a stored file
    Del {
        /// Name inside the archive
        name: String,
    },

    /// Print unused capacity in bytes
    Free,

    /// Print stored bytes
    Used,

    /// Print name,size,blocks,first_block,last_block per entry
    List,
}

fn main() -> ExitCode {
    init_tracing();

    let (archive, argv) = split_archive(std::env::args_os().collect());

    let args = match Args::try_parse_from(argv) {
        Ok(args) => args,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => USAGE_EXIT_CODE,
            };
            let _ = e.print();
            return exit_code(code);
        }
    };

    // Only help and version flags parse without an archive
    let Some(archive) = archive else {
        return exit_code(USAGE_EXIT_CODE);
    };

    match run(archive, args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ArchiveError>() {
            Some(archive_error) => {
                eprintln!("vfs: {}", archive_error);
                exit_code(archive_error.exit_code())
            }
            None => {
                eprintln!("vfs: {:#}", e);
                exit_code(1)
            }
        },
    }
}

/// Take `<ARCHIVE>` out of the argument list before clap sees it
///
/// Clap would otherwise match a prefix such as `list` as a subcommand.
/// A leading help or version flag is left in place for clap to handle.
fn split_archive(mut argv: Vec<OsString>) -> (Option<PathBuf>, Vec<OsString>) {
    let is_flag = argv
        .get(1)
        .and_then(|arg| arg.to_str())
        .is_some_and(|arg| matches!(arg, "-h" | "--help" | "-V" | "--version"));

    if argv.len() < 2 || is_flag {
        return (None, argv);
    }

    let archive = PathBuf::from(argv.remove(1));
    (Some(archive), argv)
}

fn run(archive: PathBuf, args: Args) -> anyhow::Result<()> {
    tracing::debug!(archive = %archive.display(), command = ?args.command, "dispatching");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Create {
            block_size,
            block_count,
        } => ops::create(&archive, block_size, block_count)?,
        Command::Add { source, name } => {
            ops::add(&archive, &source, &name)?;
        }
        Command::Get { name, dest } => {
            ops::get(&archive, &name, &dest)?;
        }
        Command::Del { name } => {
            ops::del(&archive, &name)?;
        }
        Command::Free => {
            let free = ops::free(&archive)?;
            writeln!(out, "{}", free).context("failed to write to stdout")?;
        }
        Command::Used => {
            let used = ops::used(&archive)?;
            writeln!(out, "{}", used).context("failed to write to stdout")?;
        }
        Command::List => {
            for entry in ops::list(&archive)? {
                writeln!(out, "{}", entry).context("failed to write to stdout")?;
            }
        }
    }

    out.flush().context("failed to flush stdout")?;
    Ok(())
}

/// Logs go to stderr; stdout carries command output only
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
