use clap::{Parser as ClapParser, Subcommand};
use ck_query::cli::{self, CheckOptions, CheckResult, CliError, RenderOptions};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "ckq")]
#[command(about = "ckq - Replay instruction listings into ClickHouse SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a listing and print the rendered query
    Render {
        /// Listing file (reads from stdin if not provided)
        file: Option<PathBuf>,

        /// Positional argument as JSON, repeatable
        #[arg(short, long = "arg", value_name = "JSON")]
        args: Vec<String>,

        /// Keyword argument as NAME=JSON, repeatable
        #[arg(short, long = "kwarg", value_name = "NAME=JSON")]
        kwargs: Vec<String>,

        /// Render in expression position
        #[arg(short, long)]
        expression: bool,

        /// Emit a JSON envelope instead of bare SQL
        #[arg(long)]
        json: bool,
    },

    /// Parse a listing and report unsupported constructs
    Check {
        /// Listing file (reads from stdin if not provided)
        file: Option<PathBuf>,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'ckq docs' to list categories)
        category: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_env("CKQ_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            file,
            args,
            kwargs,
            expression,
            json,
        } => run_render(file, args, kwargs, expression, json),
        Commands::Check { file } => run_check(file),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => cli::get_doc_category(&category).map(|content| {
            print!("{}", content);
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_listing(file: Option<PathBuf>) -> Result<String, CliError> {
    let listing = match file {
        Some(path) => fs::read_to_string(path)?,
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        None => return Err(CliError::NoInput),
    };

    if listing.trim().is_empty() {
        warn!("listing is empty");
    }
    Ok(listing)
}

fn run_render(
    file: Option<PathBuf>,
    args: Vec<String>,
    kwargs: Vec<String>,
    expression: bool,
    json: bool,
) -> Result<(), CliError> {
    let options = RenderOptions {
        listing: read_listing(file)?,
        args,
        kwargs,
        expression,
        json,
    };

    println!("{}", cli::execute_render(&options)?);
    Ok(())
}

fn run_check(file: Option<PathBuf>) -> Result<(), CliError> {
    let options = CheckOptions {
        listing: read_listing(file)?,
    };

    match cli::execute_check(&options)? {
        CheckResult::Valid {
            template,
            instructions,
        } => println!("{template}: {instructions} instruction(s), all supported"),
        CheckResult::Unsupported(found) => {
            for (offset, instruction) in &found {
                if let ck_query::Instruction::Unsupported { construct, .. } = instruction {
                    println!("{offset}: {instruction} ({construct} is not supported)");
                }
            }
            warn!(count = found.len(), "unsupported instructions found");
            std::process::exit(2);
        }
    }
    Ok(())
}
