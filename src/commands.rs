//! This module defines the `Command` enum and the `RunOptions` structure used to
//! parse the command line of the inspector.
//!
//! Options (`-v`, `-q`, `--strict`, `--max-depth=<N>`) may appear anywhere on the
//! command line; the remaining arguments form the command itself.

use crate::tree::DEFAULT_MAX_DEPTH;

/// Represents a user command.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the superblock or Bpb summary of an image.
    Info(String),
    /// Print the directory hierarchy of an image.
    Tree(String),
    /// Write the contents of a file to standard output, encapsulating the
    /// image path and the file path.
    Cat(String, String),
    /// Command for an unknown input, encapsulating the raw input as a `String`.
    Unknown(String),
    /// Command for invalid input, encapsulating an error message as a `String`.
    Invalid(String),
    /// No command given.
    Empty,
}

/// Options controlling a run, independent of the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Number of `-v` flags given.
    pub verbosity: usize,
    /// Silence all logging.
    pub quiet: bool,
    /// Bound on directory nesting during a tree walk.
    pub max_depth: usize,
    /// Validate the FAT16 boot sector beyond its cluster count.
    pub strict: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            verbosity: 0,
            quiet: false,
            max_depth: DEFAULT_MAX_DEPTH,
            strict: false,
        }
    }
}

impl RunOptions {
    /// Removes the options from `args`.
    ///
    /// # Returns
    /// - The parsed options and the remaining positional arguments, in order.
    /// - `Err(String)` describing the first malformed option.
    pub fn extract(args: &[String]) -> Result<(RunOptions, Vec<String>), String> {
        let mut opts = RunOptions::default();
        let mut rest = vec![];

        for arg in args {
            if arg == "-q" || arg == "--quiet" {
                opts.quiet = true;
            } else if arg == "--strict" {
                opts.strict = true;
            } else if let Some(value) = arg.strip_prefix("--max-depth=") {
                opts.max_depth = value.parse::<usize>().map_err(|_| {
                    format!("Arg parsing error: '--max-depth' expects an unsigned integer, got {value:?}.")
                })?;
            } else if arg.len() > 1
                && arg.starts_with('-')
                && arg[1..].chars().all(|c| c == 'v')
            {
                opts.verbosity += arg.len() - 1;
            } else {
                rest.push(arg.clone());
            }
        }

        Ok((opts, rest))
    }
}

impl Command {
    /// Parses the positional arguments into a `Command` instance.
    ///
    /// # Returns
    /// - `Command::Info` / `Command::Tree` for `--info <image>` / `--tree <image>`.
    /// - `Command::Cat` for `--cat <image> <path>`.
    /// - `Command::Invalid` if a known command has the wrong number of arguments.
    /// - `Command::Unknown` if the first argument is not a known command.
    /// - `Command::Empty` if there are no arguments.
    pub fn from_args(args: &[String]) -> Self {
        let Some((cmd, params)) = args.split_first() else {
            return Command::Empty;
        };

        match (cmd.as_str(), params) {
            ("--info", [image]) => Command::Info(image.clone()),
            ("--tree", [image]) => Command::Tree(image.clone()),
            ("--cat", [image, path]) => Command::Cat(image.clone(), path.clone()),
            ("--info", _) => Command::Invalid(String::from(
                "Wrong arg count: '--info' expects the path to an image.",
            )),
            ("--tree", _) => Command::Invalid(String::from(
                "Wrong arg count: '--tree' expects the path to an image.",
            )),
            ("--cat", _) => Command::Invalid(String::from(
                "Wrong arg count: '--cat' expects the path to an image and the path of a file.",
            )),
            (other, _) => Command::Unknown(other.to_string()),
        }
    }
}

/// Splits a full argument list (program name excluded) into the command
/// and its run options.
pub fn parse(args: &[String]) -> (Command, RunOptions) {
    match RunOptions::extract(args) {
        Ok((opts, rest)) => (Command::from_args(&rest), opts),
        Err(msg) => (Command::Invalid(msg), RunOptions::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            Command::from_args(&args(&["--info", "disk.img"])),
            Command::Info(String::from("disk.img"))
        );
        assert_eq!(
            Command::from_args(&args(&["--tree", "disk.img"])),
            Command::Tree(String::from("disk.img"))
        );
        assert_eq!(
            Command::from_args(&args(&["--cat", "disk.img", "/DIR/FILE.TXT"])),
            Command::Cat(String::from("disk.img"), String::from("/DIR/FILE.TXT"))
        );
        assert_eq!(Command::from_args(&[]), Command::Empty);
        assert_eq!(
            Command::from_args(&args(&["--list", "disk.img"])),
            Command::Unknown(String::from("--list"))
        );
    }

    #[test]
    fn test_wrong_arg_count() {
        assert!(matches!(
            Command::from_args(&args(&["--cat", "disk.img"])),
            Command::Invalid(_)
        ));
        assert!(matches!(
            Command::from_args(&args(&["--info"])),
            Command::Invalid(_)
        ));
        assert!(matches!(
            Command::from_args(&args(&["--tree", "a.img", "b.img"])),
            Command::Invalid(_)
        ));
    }

    #[test]
    fn test_options_anywhere() {
        let (cmd, opts) = parse(&args(&["-v", "--tree", "--max-depth=8", "disk.img", "-vv"]));
        assert_eq!(cmd, Command::Tree(String::from("disk.img")));
        assert_eq!(opts.verbosity, 3);
        assert_eq!(opts.max_depth, 8);
        assert!(!opts.quiet);
        assert!(!opts.strict);

        let (cmd, opts) = parse(&args(&["--strict", "-q", "--info", "disk.img"]));
        assert_eq!(cmd, Command::Info(String::from("disk.img")));
        assert!(opts.quiet && opts.strict);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_bad_max_depth() {
        let (cmd, _) = parse(&args(&["--tree", "disk.img", "--max-depth=deep"]));
        assert!(matches!(cmd, Command::Invalid(_)));
    }
}
