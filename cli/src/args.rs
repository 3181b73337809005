//! Command-line argument grammar, hand-rolled.
//!
//! The grammar is small and positional-light enough that a parser generator
//! would obscure it: one source file, repeatable `-I`/`-l`, and a handful of
//! toggles. Flags accept both `--flag VALUE` and `--flag=VALUE`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use rand::Rng;

use aswatch_fcsh::{CompileRequest, Typing};

pub const DEFAULT_TEST_PORT: u16 = 50102;

const USAGE: &str = "\
usage: aswatch FILE.as [--test|-o FILE.swf] [-I SRCDIR|-l FILE.swc]...

options:
  -o, --output FILE.swf   write the compiled SWF here (default: temporary)
  -I, --source DIR        add a compiler source path (repeatable)
  -l, --library FILE.swc  add a compiler library path (repeatable)
      --test              run the output as a test after each good compile
      --test-port PORT    test result socket port (default: 50102)
      --production        compile without -debug
      --dynamic-typing    don't warn about missing type declarations
      --static-typing     warn about missing type declarations (default)
      --verbose           echo everything the compiler shell says";

pub fn print_usage() {
    eprintln!("{USAGE}");
}

#[derive(Debug)]
pub struct Options {
    pub request: CompileRequest,
    /// The output path was invented by us and should be deleted after each
    /// successful compile.
    pub temporary_output: bool,
    pub verbose: bool,
}

pub fn parse<I>(args: I) -> Result<Options>
where
    I: IntoIterator<Item = String>,
{
    let mut args: VecDeque<String> = args.into_iter().collect();
    let mut source_file: Option<String> = None;
    let mut source_directories: Vec<String> = Vec::new();
    let mut library_paths: Vec<String> = Vec::new();
    let mut output_file: Option<String> = None;
    let mut production = false;
    let mut test = false;
    let mut test_port = DEFAULT_TEST_PORT;
    let mut typing = Typing::Static;
    let mut verbose = false;

    while let Some(argument) = args.pop_front() {
        let (flag, mut inline_value) = split_flag(&argument);
        match flag.as_str() {
            "--output" | "-o" => {
                if output_file.is_some() {
                    bail!("only one '--output' allowed");
                }
                output_file = Some(take_value(&flag, &mut inline_value, &mut args)?);
            }
            "--source" | "-I" => {
                source_directories.push(take_value(&flag, &mut inline_value, &mut args)?);
            }
            "--library" | "-l" => {
                library_paths.push(take_value(&flag, &mut inline_value, &mut args)?);
            }
            "--test" => test = true,
            "--test-port" => {
                let raw = take_value(&flag, &mut inline_value, &mut args)?;
                test_port = raw
                    .parse()
                    .with_context(|| format!("invalid test port '{raw}'"))?;
            }
            "--production" => production = true,
            "--dynamic-typing" => typing = Typing::Dynamic,
            "--static-typing" => typing = Typing::Static,
            "--verbose" => verbose = true,
            _ if flag.starts_with('-') => bail!("unrecognized argument: {argument}"),
            _ => {
                if source_file.is_some() {
                    bail!("only one source file may be watched");
                }
                source_file = Some(argument);
            }
        }
    }

    let source_file = match source_file {
        Some(file) => absolute(Path::new(&file))?,
        None => bail!("please specify a source file to be compiled"),
    };

    let mut directories: Vec<PathBuf> = Vec::new();
    for directory in &source_directories {
        directories.push(absolute(Path::new(directory))?);
    }
    // The source file's own directory is always a source path.
    if let Some(implicit) = source_file.parent() {
        let implicit = implicit.to_path_buf();
        if !directories.contains(&implicit) {
            directories.push(implicit);
        }
    }

    let mut libraries: Vec<PathBuf> = Vec::new();
    for library in &library_paths {
        libraries.push(absolute(Path::new(library))?);
    }

    let (output_file, temporary_output) = match output_file {
        Some(file) => (absolute(Path::new(&file))?, false),
        None => (temporary_output_file(), true),
    };

    Ok(Options {
        request: CompileRequest {
            source_file,
            source_directories: directories,
            library_paths: libraries,
            output_file,
            production,
            test,
            test_port,
            typing,
        },
        temporary_output,
        verbose,
    })
}

/// Split `--flag=value` into its halves; everything else passes through.
fn split_flag(argument: &str) -> (String, Option<String>) {
    if argument.starts_with("--") {
        if let Some((flag, value)) = argument.split_once('=') {
            return (flag.to_string(), Some(value.to_string()));
        }
    }
    (argument.to_string(), None)
}

/// The flag's value: inline (`--flag=value`) or the next argument.
fn take_value(
    flag: &str,
    inline_value: &mut Option<String>,
    args: &mut VecDeque<String>,
) -> Result<String> {
    match inline_value.take() {
        Some(value) => Ok(value),
        None => args
            .pop_front()
            .with_context(|| format!("{flag} expects a value")),
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("cannot resolve path {}", path.display()))
}

fn temporary_output_file() -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let token: u32 = rand::rng().random_range(0..1_000_000);
    std::env::temp_dir().join(format!("aswatch-{millis}-{token}.swf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(args: &[&str]) -> Options {
        parse(args.iter().map(|&a| a.to_string())).expect("arguments accepted")
    }

    #[test]
    fn minimal_invocation_gets_temporary_output() {
        let options = parse_ok(&["src/Main.as"]);
        assert!(options.temporary_output);
        assert!(options.request.output_file.to_string_lossy().ends_with(".swf"));
        assert!(!options.request.test);
        assert_eq!(options.request.test_port, DEFAULT_TEST_PORT);
    }

    #[test]
    fn source_file_directory_is_implicit_source_path() {
        let options = parse_ok(&["src/Main.as"]);
        let parent = options.request.source_file.parent().map(Path::to_path_buf);
        assert_eq!(options.request.source_directories, vec![parent.expect("parent")]);
    }

    #[test]
    fn implicit_source_path_is_not_duplicated() {
        let options = parse_ok(&["-I", "src", "src/Main.as"]);
        assert_eq!(options.request.source_directories.len(), 1);
    }

    #[test]
    fn equals_and_separate_value_forms_agree() {
        let separate = parse_ok(&["--test-port", "4242", "src/Main.as"]);
        let inline = parse_ok(&["--test-port=4242", "src/Main.as"]);
        assert_eq!(separate.request.test_port, 4242);
        assert_eq!(inline.request.test_port, 4242);
    }

    #[test]
    fn toggles_are_applied() {
        let options = parse_ok(&[
            "--production",
            "--test",
            "--dynamic-typing",
            "--verbose",
            "src/Main.as",
        ]);
        assert!(options.request.production);
        assert!(options.request.test);
        assert_eq!(options.request.typing, Typing::Dynamic);
        assert!(options.verbose);
    }

    #[test]
    fn explicit_output_is_not_temporary() {
        let options = parse_ok(&["-o", "build/out.swf", "src/Main.as"]);
        assert!(!options.temporary_output);
        assert!(options.request.output_file.ends_with("build/out.swf"));
    }

    #[test]
    fn libraries_accumulate_in_order() {
        let options = parse_ok(&["-l", "a.swc", "--library=b.swc", "src/Main.as"]);
        let names: Vec<_> = options
            .request
            .library_paths
            .iter()
            .filter_map(|p| p.file_name())
            .collect();
        assert_eq!(names, ["a.swc", "b.swc"]);
    }

    #[test]
    fn rejects_unknown_flag() {
        assert!(parse(["--frobnicate".to_string()]).is_err());
    }

    #[test]
    fn rejects_missing_source_file() {
        assert!(parse(std::iter::empty()).is_err());
    }

    #[test]
    fn rejects_second_source_file() {
        assert!(parse(["a.as".to_string(), "b.as".to_string()]).is_err());
    }

    #[test]
    fn rejects_duplicate_output() {
        assert!(
            parse(
                ["-o", "a.swf", "-o", "b.swf", "src/Main.as"]
                    .iter()
                    .map(|&a| a.to_string())
            )
            .is_err()
        );
    }

    #[test]
    fn rejects_bad_test_port() {
        assert!(
            parse(
                ["--test-port", "not-a-port", "src/Main.as"]
                    .iter()
                    .map(|&a| a.to_string())
            )
            .is_err()
        );
    }
}
