use std::io::{BufRead, Write, stdin, stdout};

use clap::Parser;
use clap::Subcommand;
use lexical_calc::Lexer;
use miette::IntoDiagnostic;

#[derive(Parser, Debug)]
#[command(version, about = "Evaluates `calc '<equation>'` prompts")]
struct Args {
    /// Decimal places printed for results
    #[arg(short, long, default_value_t = 2)]
    precision: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read prompts from stdin until `quit`
    Repl,
    /// Print the tokens of a prompt
    Tokenize { prompt: String },
    /// Print the parsed equation in prefix form
    Parse { prompt: String },
    /// Evaluate a single prompt
    Eval { prompt: String },
}

const HELP: &str = "Input prompts
    - calc '<equation>'
    - clear
    - quit
    - help";

fn main() -> miette::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let precision = args.precision;

    match args.command.unwrap_or(Commands::Repl) {
        Commands::Repl => repl(precision)?,
        Commands::Tokenize { prompt } => {
            let mut lexer = Lexer::new();
            lexer.input(&prompt);
            loop {
                let token = lexer.next_token();
                println!("{token}");
                if token.kind == lexical_calc::TokenKind::Eof {
                    break;
                }
            }
        }
        Commands::Parse { prompt } => {
            let expr = lexical_calc::Parser::new().parse(&prompt)?;
            println!("{expr}");
        }
        Commands::Eval { prompt } => {
            let result = lexical_calc::Parser::new().evaluate(&prompt)?;
            println!("{result:.precision$}");
        }
    }
    Ok(())
}

fn repl(precision: usize) -> miette::Result<()> {
    let mut parser = lexical_calc::Parser::new();

    println!("Calculator started.");
    println!(">>>> Input your calculator prompt in format: calc '<your equation here>'");
    println!(">>>> Or type help to see instructions.");

    let mut lines = stdin().lock().lines();
    loop {
        print!(">> ");
        stdout().flush().into_diagnostic()?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line.into_diagnostic()?;
        let command = line.trim();

        match command.to_lowercase().as_str() {
            "help" => println!("{HELP}"),
            "clear" => parser.clear_last_answer(),
            "quit" => {
                println!("Exit Calculator.");
                return Ok(());
            }
            _ => match parser.evaluate(command) {
                Ok(result) => println!(">> result: {result:.precision$}"),
                Err(e) => eprintln!("{:?}", miette::Report::new(e)),
            },
        }
    }
}
