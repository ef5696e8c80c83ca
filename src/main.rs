use clap::{Parser as ClapParser, Subcommand};
use concord_el::cli::{self, CliError, Query};
use concord_el::output::{format_diagnostic, to_json, to_json_pretty};
use concord_el::{Document, Settings};
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "concord-el")]
#[command(about = "Concord EL - check, complete and navigate expressions in Concord workflow files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report syntax errors and unresolved variables
    Check {
        /// Concord YAML file (reads from stdin if not provided)
        file: Option<PathBuf>,

        /// Check a single expression instead of a file
        #[arg(short, long, conflicts_with = "file")]
        expression: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// List completion candidates at a cursor
    Complete(CursorArgs),

    /// Find the declaration of the name at a cursor
    Goto(CursorArgs),

    /// Find every usage of the symbol at a cursor
    Usages(CursorArgs),

    /// Resolve the name at a cursor
    Resolve(CursorArgs),

    /// Print the tokens of an expression
    Tokens {
        /// The expression, without ${}
        #[arg(short, long)]
        expression: String,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Show documentation (topics, built-in variables and functions)
    Docs {
        /// Topic or built-in name (lists topics when omitted)
        name: Option<String>,
    },
}

#[derive(clap::Args)]
struct CursorArgs {
    /// Byte offset or 1-based line:column
    cursor: String,

    /// Concord YAML file (reads from stdin if not provided)
    file: Option<PathBuf>,

    /// Pretty-print the output
    #[arg(short, long)]
    pretty: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            file,
            expression,
            json,
            pretty,
        } => run_check(file, expression, json, pretty),
        Commands::Complete(args) => run_query(Query::Complete, args),
        Commands::Goto(args) => run_query(Query::Goto, args),
        Commands::Usages(args) => run_query(Query::Usages, args),
        Commands::Resolve(args) => run_query(Query::Resolve, args),
        Commands::Tokens { expression, pretty } => print_json(&cli::list_tokens(&expression), pretty),
        Commands::Docs { name: None } => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Docs { name: Some(name) } => cli::get_doc_topic(&name).map(|content| {
            print!("{}", content);
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        to_json_pretty(value)
    } else {
        to_json(value)
    }?;
    println!("{}", json);
    Ok(())
}

/// Reads `file`, or stdin when no file is given and stdin is piped.
fn read_input(file: Option<&Path>) -> Result<String, CliError> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}

/// Settings next to the file, or in the working directory for stdin.
fn load_settings(file: Option<&Path>) -> Result<Settings, CliError> {
    let dir = match file.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    Ok(Settings::load(&dir)?)
}

fn run_check(
    file: Option<PathBuf>,
    expression: Option<String>,
    json: bool,
    pretty: bool,
) -> Result<(), CliError> {
    if let Some(expression) = expression {
        let report = cli::check_expression(&expression);
        if json {
            return print_json(&report, pretty);
        }
        println!("{}", report.tree);
        for diagnostic in &report.diagnostics {
            println!(
                "{}..{}: error: {}",
                diagnostic.span.start, diagnostic.span.end, diagnostic.message
            );
        }
        return Ok(());
    }

    let text = read_input(file.as_deref())?;
    let settings = load_settings(file.as_deref())?;
    let document = Document::parse(text);
    let diagnostics = cli::check_document(&document, settings)?;

    if json {
        return print_json(&diagnostics, pretty);
    }
    let path = file
        .as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());
    if diagnostics.is_empty() {
        println!("No problems found");
    }
    for diagnostic in &diagnostics {
        println!("{}", format_diagnostic(&path, diagnostic));
    }
    Ok(())
}

fn run_query(query: Query, args: CursorArgs) -> Result<(), CliError> {
    let text = read_input(args.file.as_deref())?;
    let settings = load_settings(args.file.as_deref())?;
    let document = Document::parse(text);
    let offset = cli::parse_cursor(&document, &args.cursor)?;

    let result = cli::execute_query(&document, settings, query, offset)?;
    print_json(&result, args.pretty)
}
