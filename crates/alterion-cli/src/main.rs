use alterion_checker::{AnalyzeOptions, ComponentSummary, Diagnostic};
use alterion_lexer::config::DEFAULT_MAX_ERRORS;
use alterion_lexer::{KeywordCase, LexerConfig, Scanner, Token};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "alterion")]
#[command(about = "Alterion component language front end")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Print the token stream of a source file
    Tokens {
        /// Input source file
        path: PathBuf,

        #[command(flatten)]
        lexer: LexerArgs,

        /// Print tokens as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the syntax tree of a source file
    Parse {
        /// Input source file
        path: PathBuf,

        #[command(flatten)]
        lexer: LexerArgs,
    },

    /// Lex, parse and type check a source file
    Check {
        /// Input source file
        path: PathBuf,

        #[command(flatten)]
        lexer: LexerArgs,

        /// Print diagnostics and component types as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct LexerArgs {
    /// Lexical errors tolerated before scanning stops
    #[arg(long, default_value_t = DEFAULT_MAX_ERRORS)]
    max_errors: usize,

    /// Match keywords regardless of case
    #[arg(long)]
    case_insensitive_keywords: bool,

    /// Reject exponent suffixes on number literals
    #[arg(long)]
    no_scientific: bool,
}

impl LexerArgs {
    fn config(&self) -> LexerConfig {
        LexerConfig {
            max_errors: self.max_errors,
            keyword_case: if self.case_insensitive_keywords {
                KeywordCase::Insensitive
            } else {
                KeywordCase::Sensitive
            },
            scientific_notation: !self.no_scientific,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of a command that ran to completion.
#[derive(Debug, PartialEq, Eq)]
enum Status {
    Clean,
    Diagnostics,
}

/// JSON shape of `check --json`.
#[derive(Serialize)]
struct CheckReport<'a> {
    file: String,
    diagnostics: &'a [Diagnostic],
    components: &'a [ComponentSummary],
    bindings: &'a [String],
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Tokens { path, lexer, json } => cmd_tokens(&path, &lexer, json),
        Command::Parse { path, lexer } => cmd_parse(&path, &lexer),
        Command::Check { path, lexer, json } => cmd_check(&path, &lexer, json),
    };

    match result {
        Ok(Status::Clean) => {}
        Ok(Status::Diagnostics) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

fn log_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(log_level(verbose))
        .parse_default_env()
        .init();
}

fn read_source(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// `file:line:column: stage error: message`
fn render(path: &Path, diagnostic: &Diagnostic) -> String {
    format!(
        "{}:{}:{}: {} error: {}",
        path.display(),
        diagnostic.line,
        diagnostic.column,
        diagnostic.stage,
        diagnostic.message
    )
}

fn report(path: &Path, diagnostics: &[Diagnostic]) -> Status {
    for diagnostic in diagnostics {
        eprintln!("{}", render(path, diagnostic));
    }
    if diagnostics.is_empty() {
        Status::Clean
    } else {
        Status::Diagnostics
    }
}

fn format_token(token: &Token) -> String {
    let mut line = format!(
        "{}:{}\t{:?}\t{:?}",
        token.span.line, token.span.column, token.kind, token.lexeme
    );
    if let Some(error) = &token.error {
        line.push_str(&format!("\t{error}"));
    }
    line
}

fn cmd_tokens(path: &Path, lexer: &LexerArgs, json: bool) -> Result<Status, CliError> {
    let source = read_source(path)?;
    let lexed = Scanner::from_bytes(&source).with_config(lexer.config()).scan();

    if json {
        println!("{}", serde_json::to_string_pretty(&lexed.tokens)?);
    } else {
        for token in &lexed.tokens {
            println!("{}", format_token(token));
        }
    }

    Ok(report(path, &lexed.diagnostics()))
}

fn cmd_parse(path: &Path, lexer: &LexerArgs) -> Result<Status, CliError> {
    let source = read_source(path)?;
    let lexed = Scanner::from_bytes(&source).with_config(lexer.config()).scan();
    let mut diagnostics = lexed.diagnostics();
    let parsed = alterion_parser::parse(lexed.tokens);
    diagnostics.extend(parsed.diagnostics);

    println!("{:#?}", parsed.program);
    Ok(report(path, &diagnostics))
}

fn cmd_check(path: &Path, lexer: &LexerArgs, json: bool) -> Result<Status, CliError> {
    let source = read_source(path)?;
    let options = AnalyzeOptions {
        lexer: lexer.config(),
        label: Some(path.display().to_string()),
        ..AnalyzeOptions::default()
    };
    let analysis = alterion_checker::analyze_bytes(&source, &options);

    if json {
        let report = CheckReport {
            file: path.display().to_string(),
            diagnostics: &analysis.diagnostics,
            components: &analysis.check.components,
            bindings: &analysis.check.external_bindings,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if analysis.has_errors() {
            Status::Diagnostics
        } else {
            Status::Clean
        });
    }

    let status = report(path, &analysis.diagnostics);
    if status == Status::Clean {
        eprintln!("OK: {}", path.display());
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alterion_checker::Stage;
    use alterion_lexer::{Span, TokenKind};
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_lexer_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "alterion",
            "check",
            "app.alt",
            "--max-errors",
            "5",
            "--case-insensitive-keywords",
            "--no-scientific",
            "-vv",
        ]);
        let Ok(Cli {
            command: Command::Check { path, lexer, json },
            verbose,
        }) = cli
        else {
            panic!("Expected check command");
        };

        assert_eq!(path, PathBuf::from("app.alt"));
        assert!(!json);
        assert_eq!(verbose, 2);
        assert_eq!(
            lexer.config(),
            LexerConfig {
                max_errors: 5,
                keyword_case: KeywordCase::Insensitive,
                scientific_notation: false,
            }
        );
    }

    #[test]
    fn test_default_lexer_flags() {
        let Ok(Cli {
            command: Command::Tokens { lexer, json, .. },
            ..
        }) = Cli::try_parse_from(["alterion", "tokens", "a.alt", "--json"])
        else {
            panic!("Expected tokens command");
        };
        assert!(json);
        assert_eq!(lexer.config(), LexerConfig::default());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(log_level(0), log::LevelFilter::Warn);
        assert_eq!(log_level(1), log::LevelFilter::Debug);
        assert_eq!(log_level(4), log::LevelFilter::Trace);
    }

    #[test]
    fn test_render_diagnostic() {
        let diagnostic = Diagnostic::new(Stage::Type, "Undefined variable: x", Span::new(10, 11, 3, 7));
        assert_eq!(
            render(Path::new("src/app.alt"), &diagnostic),
            "src/app.alt:3:7: type error: Undefined variable: x"
        );
    }

    #[test]
    fn test_format_token() {
        let token = Token::new(TokenKind::Identifier, "count", Span::new(0, 5, 1, 1));
        assert_eq!(format_token(&token), "1:1\tIdentifier\t\"count\"");

        let error = Token::error("#", "unexpected character '#'", Span::new(8, 9, 1, 9));
        assert_eq!(
            format_token(&error),
            "1:9\tError\t\"#\"\tunexpected character '#'"
        );
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = cmd_check(
            Path::new("definitely/not/here.alt"),
            &LexerArgs {
                max_errors: DEFAULT_MAX_ERRORS,
                case_insensitive_keywords: false,
                no_scientific: false,
            },
            false,
        );
        assert!(matches!(result, Err(CliError::Read { .. })));
    }

    #[test]
    fn test_report_status() {
        let path = Path::new("a.alt");
        assert_eq!(report(path, &[]), Status::Clean);
        let diagnostic = Diagnostic::new(Stage::Parse, "expected '}'", Span::default());
        assert_eq!(report(path, &[diagnostic]), Status::Diagnostics);
    }
}
