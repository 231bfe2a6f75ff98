use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tiny_basic_interpreter::{
    generate_ast, tokenize, Interpreter, InterpreterConfig, LineReader, LineWriter,
};
use tracing_subscriber::EnvFilter;

const STDIN_NOTE: &str = "INPUT reads from stdin. When FILE is omitted the program itself is \
read from stdin up to end of input, so every INPUT then fails with 'input stream closed'. \
Pass FILE for programs that use INPUT.";

/// Run a line-numbered BASIC program
#[derive(Debug, Parser)]
#[command(
    name = "tiny-basic",
    version,
    about = "Tiny BASIC Interpreter",
    after_help = STDIN_NOTE
)]
struct Cli {
    /// Program to run; read from stdin when omitted (INPUT then sees end of input)
    file: Option<PathBuf>,

    /// Print the parsed program tree and exit
    #[arg(long)]
    dump: bool,

    /// Keep variables when the program executes RUN
    #[arg(long)]
    keep_variables_on_run: bool,

    /// Abort after this many statements
    #[arg(long, value_name = "N")]
    max_steps: Option<u64>,

    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = read_source(cli.file.as_ref())?;

    if cli.dump {
        let program = generate_ast(&tokenize(&source))?;
        print!("{}", program.dump());
        return Ok(());
    }

    let mut config =
        InterpreterConfig::new().with_reset_variables_on_run(!cli.keep_variables_on_run);
    if let Some(limit) = cli.max_steps {
        config = config.with_step_limit(limit);
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut interpreter = Interpreter::with_config(
        &source,
        config,
        LineReader::new(stdin.lock()),
        LineWriter::new(stdout.lock()),
    )?;
    interpreter.run()?;
    Ok(())
}

fn read_source(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
        }
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("cannot read program from stdin")?;
            Ok(source)
        }
    }
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "tiny_basic_interpreter=warn",
        1 => "tiny_basic_interpreter=debug",
        _ => "tiny_basic_interpreter=trace",
    }
}
