//! This is the main entry point for the filesystem inspector.
//!
//! The program detects whether a disk image holds an EXT2 or a FAT16 volume, then
//! prints its metadata, lists its directory tree or extracts a file from it.

use fs_inspector::{Disk, DiskError};
use fs_inspector::commands::{self, Command, RunOptions};
use fs_inspector::tree::TreeNode;
use log::error;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

const USAGE: &str = "\
Usage:
  main --info <image>          Print the superblock or boot sector summary
  main --tree <image>          List the directory hierarchy
  main --cat <image> <path>    Write a file of a FAT16 volume to standard output

Options:
  -v, -vv, ...                 Increase log verbosity
  -q                           Silence logging
  --max-depth=<N>              Bound on directory nesting (default 64)
  --strict                     Validate the FAT16 boot sector";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cmd, opts) = commands::parse(&args);

    if let Err(err) = stderrlog::new()
        .module(module_path!())
        .module("fs_inspector")
        .verbosity(1 + opts.verbosity)
        .quiet(opts.quiet)
        .init()
    {
        eprintln!("Failed to initialise logging: {err}");
    }

    let outcome = match cmd {
        Command::Info(image) => info(&image, &opts),
        Command::Tree(image) => tree(&image, &opts),
        Command::Cat(image, path) => cat(&image, &path, &opts),
        Command::Unknown(s) => {
            error!("Unknown command: {s:?}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
        Command::Invalid(s) => {
            error!("{s}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
        Command::Empty => {
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        // Shown even under -q.
        Err(err @ DiskError::UnsupportedFileSystem) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn open(image: &str, opts: &RunOptions) -> Result<Disk, DiskError> {
    Disk::from_file(Path::new(image), opts.strict)
}

fn info(image: &str, opts: &RunOptions) -> Result<(), DiskError> {
    let disk = open(image, opts)?;
    print!("{}", disk.info(0)?);
    Ok(())
}

fn tree(image: &str, opts: &RunOptions) -> Result<(), DiskError> {
    let mut disk = open(image, opts)?;

    println!(".");
    disk.tree(opts.max_depth, &mut |node: &TreeNode| println!("{node}"))
}

fn cat(image: &str, path: &str, opts: &RunOptions) -> Result<(), DiskError> {
    let mut disk = open(image, opts)?;
    let mut stdout = io::stdout().lock();

    disk.cat(path, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}
