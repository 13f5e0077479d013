//! Command line front end (§6). Grounded on `parse_args.rs`'s manual,
//! no-dependency argument loop, extended with `log`/`simple_logger` for
//! `-v` verbose output the way the archive driver reported progress, and
//! with a `Progress` handle so verbose mode can report final byte counts
//! the way the teacher's `progress.rs` reports block counts.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info, LevelFilter};
use moruga_core::io::{NullFilter, NullPreprocessor};
use moruga_core::progress::Progress;
use moruga_core::{decode_with, encode_with, Level};

const VERSION: &str = env!("CARGO_PKG_VERSION");

enum Mode {
    Compress,
    Decompress,
    Help,
    Version,
}

struct Args {
    mode: Mode,
    level: Level,
    verbose: bool,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
}

fn print_usage() {
    eprintln!("usage: moruga [-c|-d] [-0..-12] [-v] <infile> <outfile>");
    eprintln!("  -c, --compress    compress infile to outfile (default)");
    eprintln!("  -d, --decompress  decompress infile to outfile");
    eprintln!("  -0..-12           memory level, 0 leanest, 12 most memory (default 6)");
    eprintln!("  -v, --verbose     verbose logging");
    eprintln!("  -h, --help        print this help and exit");
    eprintln!("  -V, --version     print version and exit");
}

fn parse_args() -> Option<Args> {
    let mut mode = Mode::Compress;
    let mut level = Level::default();
    let mut verbose = false;
    let mut positional = Vec::new();

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-c" | "--compress" => mode = Mode::Compress,
            "-d" | "--decompress" => mode = Mode::Decompress,
            "-v" | "--verbose" => verbose = true,
            "-h" | "--help" => return Some(Args { mode: Mode::Help, level, verbose, input: None, output: None }),
            "-V" | "--version" => return Some(Args { mode: Mode::Version, level, verbose, input: None, output: None }),
            _ => {
                if let Some(rest) = arg.strip_prefix('-') {
                    if let Ok(n) = rest.parse::<u8>() {
                        level = Level::new(n).ok()?;
                        mode = Mode::Compress;
                    } else {
                        eprintln!("unrecognized flag: -{rest}");
                        return None;
                    }
                } else {
                    positional.push(arg);
                }
            }
        }
    }

    if positional.len() != 2 {
        return None;
    }
    let same_path = if cfg!(windows) {
        positional[0].eq_ignore_ascii_case(&positional[1])
    } else {
        positional[0] == positional[1]
    };
    if same_path {
        eprintln!("infile and outfile must differ");
        return None;
    }
    Some(Args {
        mode,
        level,
        verbose,
        input: Some(PathBuf::from(&positional[0])),
        output: Some(PathBuf::from(&positional[1])),
    })
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Some(a) => a,
        None => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match args.mode {
        Mode::Help => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Mode::Version => {
            println!("moruga {VERSION}");
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let filter = if args.verbose { LevelFilter::Info } else { LevelFilter::Warn };
    simple_logger::SimpleLogger::new()
        .with_level(filter)
        .init()
        .expect("logger already initialized");

    let input_path = args.input.expect("compress/decompress modes always carry paths");
    let output_path = args.output.expect("compress/decompress modes always carry paths");

    let input = match fs::read(&input_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("failed to read {}: {e}", input_path.display());
            return ExitCode::FAILURE;
        }
    };

    let progress = Progress::new();
    let result = match args.mode {
        Mode::Decompress => {
            info!("decompressing {} bytes from {}", input.len(), input_path.display());
            let mut cursor = std::io::Cursor::new(input);
            decode_with(&mut cursor, &mut NullPreprocessor, &mut NullFilter, &progress)
        }
        Mode::Compress => {
            info!("compressing {} bytes at level {} to {}", input.len(), args.level.value(), output_path.display());
            let mut buf = Vec::new();
            match encode_with(args.level, &input, &mut buf, &mut NullPreprocessor, &mut NullFilter, &progress) {
                Ok(()) => Ok(buf),
                Err(e) => Err(e),
            }
        }
        Mode::Help | Mode::Version => unreachable!("handled above"),
    };

    match result {
        Ok(bytes) => {
            if let Err(e) = fs::write(&output_path, &bytes) {
                error!("failed to write {}: {e}", output_path.display());
                return ExitCode::FAILURE;
            }
            info!(
                "wrote {} bytes to {} ({} in / {} out)",
                bytes.len(),
                output_path.display(),
                progress.bytes_in(),
                progress.bytes_out()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
