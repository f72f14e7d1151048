use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use glox::ast::Stmt;
use glox::ast_printer::AstPrinter;
use glox::error::{ConsoleReporter, Failure, Reporter};
use glox::parser::Parser;
use glox::scanner::Scanner;
use glox::token::Token;
use glox::Lox;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to a file
    #[arg(long, global = true)]
    log: bool,

    /// Where `--log` writes to
    #[arg(long, global = true, value_name = "PATH", default_value = "glox.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the token list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints each statement as a parenthesised tree
    Parse { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Reads programs line by line from stdin and prints each line's value
    Repl,
}

/// Reads a source file and decodes it as UTF-8.
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger(path: &Path) -> Result<()> {
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    // `[module:line] - message`, module path without the crate prefix
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("glox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // RUST_LOG overrides
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    info!("Running Tokenize subcommand");
    let source = read_file(filename)?;

    if json {
        let mut reporter = ConsoleReporter::new();
        let tokens: Vec<Token> = Scanner::new(&source).scan_tokens(&mut reporter);

        println!("{}", serde_json::to_string_pretty(&tokens)?);

        if reporter.has_error() {
            process::exit(Failure::Compile.exit_code());
        }

        return Ok(());
    }

    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                println!("{}", token);
            }

            Err(e) => {
                tokenized = false;

                debug!("Tokenization debug: {}", e);

                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");

        process::exit(Failure::Compile.exit_code());
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &Path) -> Result<()> {
    info!("Running Parse subcommand");
    let source = read_file(filename)?;
    let mut reporter = ConsoleReporter::new();

    let tokens: Vec<Token> = Scanner::new(&source).scan_tokens(&mut reporter);
    let statements: Vec<Stmt> = Parser::new(&tokens).parse(&mut reporter);

    for stmt in &statements {
        let tree = AstPrinter::print_stmt(stmt);

        debug!("AST: {}", tree);
        println!("{}", tree);
    }

    if reporter.has_error() {
        process::exit(Failure::Compile.exit_code());
    }

    info!("Parse subcommand completed");
    Ok(())
}

fn run(filename: &Path) -> Result<()> {
    info!("Running Run subcommand");
    let source = read_file(filename)?;
    info!("Provided input:\n {}", source);

    let mut reporter = ConsoleReporter::new();
    let mut lox = Lox::new();

    match lox.run(&source, &mut reporter) {
        Ok(value) => {
            info!("Program executed successfully, last value {}", value);
            Ok(())
        }

        Err(failure) => {
            debug!("Run failed: {}", failure);
            process::exit(failure.exit_code());
        }
    }
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut reporter = ConsoleReporter::new();
    let mut lox = Lox::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        // Errors were already printed by the reporter; keep prompting.
        if let Ok(value) = lox.run(&line, &mut reporter) {
            println!("{}", value);
        }
    }

    info!("REPL finished");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger(&args.log_file)?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, *json),
        Commands::Parse { filename } => parse(filename),
        Commands::Run { filename } => run(filename),
        Commands::Repl => repl(),
    }
}
