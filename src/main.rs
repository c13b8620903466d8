//==============================================
// File: main.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: `gato` command-line front end
// Objective: Run a GatoScript file or an interactive session on a shared root
//            environment
//==============================================

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser as ClapParser;
use gatoscript::runtime::{self, Config};
use gatoscript::{Environment, Object, evaluate, parse_source};

const PROMPT: &str = ">> ";

#[derive(Debug, ClapParser)]
#[command(
    name = "gato",
    about = "Runs GatoScript (.gs) files, or starts an interactive session when no file is given."
)]
struct Args {
    /// Path to a GatoScript source file.
    script: Option<PathBuf>,

    /// Trace-level logging of function application (equivalent to GATO_TRACE=1).
    #[arg(long)]
    trace: bool,

    /// Pretty-print the parsed AST before execution.
    #[arg(long)]
    print_ast: bool,

    /// Print the GatoScript version and exit.
    #[arg(short = 'v', short_alias = 'V', long)]
    version: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    if args.version {
        println!("GatoScript version {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::load().context("failed to load configuration")?;
    if args.trace {
        config.trace = true;
    }
    runtime::init_logging(&config);
    runtime::install(&config);

    match &args.script {
        Some(path) => run_file(path, args.print_ast),
        None => run_repl(args.print_ast),
    }
}

fn run_file(path: &Path, print_ast: bool) -> Result<ExitCode> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let program = parse_source(&source).map_err(|err| anyhow!("{}: {err}", path.display()))?;

    if print_ast {
        println!("{:#?}", program);
    }

    let env = Environment::new();
    match evaluate(&program, &env) {
        Object::Null => Ok(ExitCode::SUCCESS),
        error @ Object::Error(_) => {
            eprintln!("{}", error);
            Ok(ExitCode::FAILURE)
        }
        value => {
            println!("{}", value);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_repl(print_ast: bool) -> Result<ExitCode> {
    let user = env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "there".to_string());
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(
        stdout,
        "Hello {}! This is GatoScript {}.",
        user,
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(stdout, "Type in commands, or end input to exit.")?;

    let env = Environment::new();
    let mut line = String::new();
    loop {
        write!(stdout, "{}", PROMPT)?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            return Ok(ExitCode::SUCCESS);
        }
        if line.trim().is_empty() {
            continue;
        }

        let program = match parse_source(&line) {
            Ok(program) => program,
            Err(err) => {
                writeln!(stdout, "{}", err)?;
                continue;
            }
        };
        if print_ast {
            writeln!(stdout, "{:#?}", program)?;
        }
        match evaluate(&program, &env) {
            Object::Null => {}
            value => writeln!(stdout, "{}", value)?,
        }
    }
}
