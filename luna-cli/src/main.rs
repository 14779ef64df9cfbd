//! Luna CLI: inspect containers, disassemble code and run games headlessly.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Usage or IO error
//! - 2: Container load error
//! - 3: Runtime error

mod commands;
mod console;

use std::process;

use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = take_flag(&mut args, &["-v", "--verbose"]);
    init_logging(verbose);

    let Some(command) = args.first() else {
        print_usage();
        process::exit(1);
    };

    let result = match command.as_str() {
        "chunks" => commands::chunks(&args[1..]),
        "disasm" => commands::disasm(&args[1..]),
        "exec" => commands::exec(&args[1..]),
        "run" => commands::run(&args[1..]),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

/// Removes a global flag that may appear anywhere before `--`.
fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
    let end = args.iter().position(|a| a == "--").unwrap_or(args.len());
    match args[..end].iter().position(|a| names.contains(&a.as_str())) {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output with `-v`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    eprintln!("Usage: luna [-v] <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  chunks <file>                          List chunk tags and lengths");
    eprintln!("  disasm <file> [code]                   Disassemble one or every code entry");
    eprintln!("  exec <file> <code> [--seed N]          Run one code entry and print the result");
    eprintln!("  run <file> [--room N] [--frames N] [--seed N] [-- params...]");
    eprintln!("                                         Enter a room and step frames headlessly");
}
