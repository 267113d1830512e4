use clap::{Parser as ClapParser, Subcommand};
use predicate_lang::cli::{self, CheckOptions, CheckResult, CliError};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "pred")]
#[command(about = "pred - parse, format and evaluate object-filtering predicates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a predicate against a JSON document
    Check {
        /// The predicate format string
        predicate: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// JSON value for the next placeholder; repeat in order
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Treat the text as an expression and print its value
        #[arg(short, long)]
        expression: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't execute
        #[arg(long)]
        syntax_only: bool,
    },

    /// Print the canonical formatting of a predicate
    Format {
        /// The predicate format string
        predicate: String,

        /// JSON value for the next placeholder; repeat in order
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Treat the text as an expression
        #[arg(short, long)]
        expression: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            predicate,
            input,
            args,
            expression,
            pretty,
            syntax_only,
        } => run_check(CheckOptions {
            predicate,
            input,
            args,
            expression,
            pretty,
            syntax_only,
        }),
        Commands::Format {
            predicate,
            args,
            expression,
        } => cli::execute_format(&predicate, &args, expression).map(|text| println!("{}", text)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(mut options: CheckOptions) -> Result<(), CliError> {
    if options.input.is_none() && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        options.input = Some(buffer);
    }

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Matched(matched) => println!("{}", matched),
        CheckResult::Value(output) => {
            let json = if options.pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
