#![warn(clippy::nursery, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::needless_pass_by_value)]

use clap::{Parser, Subcommand, ValueHint};
use serde::Serialize;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::{self, Stdio},
    time::{Duration, Instant},
};
use toyc::{ast_to_js, error::CompilerError, string_to_tokens, token::Token, tokens_to_ast};
use tracing::{debug, error, info, Level};
use tracing_subscriber::{
    filter::{self, LevelFilter},
    fmt::format::FmtSpan,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer,
};

#[derive(Parser, Debug)]
#[command(name = "toyc", about = "Compiles a tiny function-call language to JavaScript.")]
struct ToycOptions {
    /// Also log debug output, such as how long each stage took.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile source code to JavaScript, including the runtime.
    Compile(CompileOptions),
    /// Only lex and parse the source code.
    Check(CheckOptions),
    /// Turn source code from stdin into a JSON list of tokens.
    Tokenize(JsonOptions),
    /// Turn a JSON list of tokens from stdin into a JSON syntax tree.
    Parse(JsonOptions),
    /// Turn a JSON syntax tree from stdin into JavaScript.
    Generate,
    /// Compile source code and execute it with a JavaScript runtime.
    Run(RunOptions),
}

fn main() -> ProgramResult {
    let options = ToycOptions::parse();

    init_logger(if options.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    });

    match options.command {
        Command::Compile(options) => compile(options),
        Command::Check(options) => check(options),
        Command::Tokenize(options) => tokenize(options),
        Command::Parse(options) => parse(options),
        Command::Generate => generate(),
        Command::Run(options) => run(options),
    }
}
pub type ProgramResult = Result<(), Exit>;
#[derive(Debug)]
pub enum Exit {
    InputNotReadable,
    MalformedInput,
    CodeContainsErrors,
    OutputNotWritable,
    RuntimeFailed,
}

#[derive(Parser, Debug)]
struct CompileOptions {
    /// The file to compile. Reads from stdin if omitted.
    #[arg(value_hint = ValueHint::FilePath)]
    path: Option<PathBuf>,

    /// Where to write the JavaScript. Writes to stdout if omitted.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

fn compile(options: CompileOptions) -> ProgramResult {
    let source = read_input(options.path.as_deref())?;

    let started_at = Instant::now();
    let javascript = toyc::compile(&source).map_err(report)?;
    debug!(
        "Compilation to JavaScript took {}.",
        format_duration(started_at.elapsed())
    );

    write_output(options.output.as_deref(), &javascript)
}

#[derive(Parser, Debug)]
struct CheckOptions {
    /// The file to check. Reads from stdin if omitted.
    #[arg(value_hint = ValueHint::FilePath)]
    path: Option<PathBuf>,
}

fn check(options: CheckOptions) -> ProgramResult {
    let source = read_input(options.path.as_deref())?;

    let started_at = Instant::now();
    let ast = toyc::check(&source).map_err(report)?;
    debug!("Check took {}.", format_duration(started_at.elapsed()));

    info!("No errors found in {} top-level nodes 🎉", ast.len());
    Ok(())
}

#[derive(Parser, Debug)]
struct JsonOptions {
    /// Indent the JSON output to make it human-readable.
    #[arg(short, long)]
    pretty: bool,
}

fn tokenize(options: JsonOptions) -> ProgramResult {
    let source = read_input(None)?;
    let tokens =
        string_to_tokens::tokenize(&source).map_err(|error| report(error.into()))?;
    write_output(None, &to_json(&tokens, options.pretty)?)
}

fn parse(options: JsonOptions) -> ProgramResult {
    let input = read_input(None)?;
    let tokens: Vec<Token> = serde_json::from_str(&input).map_err(|error| {
        error!("The input isn't a valid list of tokens: {error}");
        Exit::MalformedInput
    })?;
    if let Some(token) = tokens
        .iter()
        .find(|token| !string_to_tokens::is_well_formed(token))
    {
        error!("The value of {token:?} doesn't lex as a token of that kind.");
        return Err(Exit::MalformedInput);
    }
    let ast = tokens_to_ast::parse(&tokens).map_err(|error| report(error.into()))?;
    write_output(None, &to_json(&ast, options.pretty)?)
}

fn generate() -> ProgramResult {
    let input = read_input(None)?;
    let javascript =
        ast_to_js::generate_from_json(&input).map_err(|error| report(error.into()))?;
    write_output(None, &javascript)
}

#[derive(Parser, Debug)]
struct RunOptions {
    /// The file to run. Reads from stdin if omitted.
    #[arg(value_hint = ValueHint::FilePath)]
    path: Option<PathBuf>,

    /// The JavaScript runtime that receives the program on stdin.
    #[arg(long, default_value = "node", value_hint = ValueHint::CommandName)]
    node: String,
}

fn run(options: RunOptions) -> ProgramResult {
    let source = read_input(options.path.as_deref())?;
    let javascript = toyc::compile(&source).map_err(report)?;

    let runtime_failed = |error: io::Error| {
        error!("Running `{}` failed: {error}", options.node);
        Exit::RuntimeFailed
    };
    let mut child = process::Command::new(&options.node)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(runtime_failed)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(javascript.as_bytes())
            .map_err(runtime_failed)?;
    }
    let status = child.wait().map_err(runtime_failed)?;

    if status.success() {
        Ok(())
    } else {
        error!("`{}` exited with {status}.", options.node);
        Err(Exit::RuntimeFailed)
    }
}

fn read_input(path: Option<&Path>) -> Result<String, Exit> {
    let result = match path {
        Some(path) => fs::read_to_string(path),
        None => io::read_to_string(io::stdin()),
    };
    result.map_err(|error| {
        match path {
            Some(path) => error!("Couldn't read `{}`: {error}", path.display()),
            None => error!("Couldn't read from stdin: {error}"),
        }
        Exit::InputNotReadable
    })
}
fn write_output(path: Option<&Path>, text: &str) -> ProgramResult {
    let result = match path {
        Some(path) => fs::write(path, text),
        None => io::stdout().lock().write_all(text.as_bytes()),
    };
    result.map_err(|error| {
        error!("Couldn't write the output: {error}");
        Exit::OutputNotWritable
    })
}

fn to_json(value: &impl Serialize, pretty: bool) -> Result<String, Exit> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.map(|json| json + "\n").map_err(|error| {
        error!("Couldn't serialize the output: {error}");
        Exit::OutputNotWritable
    })
}

fn report(error: CompilerError) -> Exit {
    error!("{error}");
    Exit::CodeContainsErrors
}

fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_millis(1) {
        format!("{} µs", duration.as_micros())
    } else {
        format!("{} ms", duration.as_millis())
    }
}

fn init_logger(max_level: Level) {
    let console_log = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_span_events(FmtSpan::NONE)
        .with_filter(filter::filter_fn(|metadata| {
            // For external packages, show only the error logs.
            metadata.level() <= &Level::ERROR
                || metadata
                    .module_path()
                    .unwrap_or_default()
                    .starts_with("toyc")
        }))
        .with_filter(LevelFilter::from_level(max_level));
    tracing_subscriber::registry().with(console_log).init();
}
