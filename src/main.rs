use clap::Parser;
use jsi::{Error, Interpreter, JsValue, harness, inspect};
use log::LevelFilter;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "jsi", version, about = "A tree-walking JavaScript interpreter")]
struct Cli {
    /// JavaScript file to execute
    file: Option<PathBuf>,

    /// Evaluate inline JavaScript and print the result
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Run every .js test suite under DIR
    #[arg(short = 't', long = "test", value_name = "DIR")]
    test: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Parse errors print as `SyntaxError: ...`, thrown values as `Uncaught ...`,
/// unreadable files as `failed to read ...`.
fn report(err: &Error) {
    eprintln!("{err}");
}

fn finish(result: Result<JsValue, Error>, print_result: bool) -> ExitCode {
    match result {
        Ok(value) => {
            if print_result {
                println!("{}", inspect(&value));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            ExitCode::from(1)
        }
    }
}

fn execute_code(code: &str) -> ExitCode {
    finish(Interpreter::new().eval_source(code), true)
}

fn run_file(path: &Path) -> ExitCode {
    finish(Interpreter::new().eval_file(path), false)
}

fn run_tests(dir: &Path) -> ExitCode {
    match harness::run_dir(dir) {
        Ok(report) => {
            println!("{report}");
            if report.passed() { ExitCode::SUCCESS } else { ExitCode::from(1) }
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
    }
}

fn prompt(stdout: &mut io::Stdout, text: &str) -> bool {
    print!("{text}");
    stdout.flush().is_ok()
}

fn run_repl() -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut interp = Interpreter::new();

    println!("jsi v{}", env!("CARGO_PKG_VERSION"));
    println!("Type JavaScript expressions. Press Ctrl-D to exit.");

    let mut pending = String::new();
    loop {
        let text = if pending.is_empty() { "> " } else { "... " };
        if !prompt(&mut stdout, text) {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
        pending.push_str(&line);
        if pending.trim().is_empty() {
            pending.clear();
            continue;
        }

        match interp.eval_source(&pending) {
            Err(e) if e.is_incomplete_input() => continue,
            Ok(value) => println!("{}", inspect(&value)),
            Err(e) => report(&e),
        }
        pending.clear();
    }

    println!();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(dir) = &cli.test {
        return run_tests(dir);
    }

    if let Some(code) = &cli.eval {
        return execute_code(code);
    }

    if let Some(path) = &cli.file {
        return run_file(path);
    }

    run_repl()
}
