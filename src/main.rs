//! CLI entry point for `imfshell`.

use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser as ClapParser, Subcommand};
use serde_json::{json, Value};

use imfshell::config::{self, Config};
use imfshell::parser::header::{self, FieldKind, HeaderField};
use imfshell::{Address, Bag, Flags, ImfError, Mode, Parsed, Parser, Token};

#[derive(ClapParser)]
#[command(
    name = "imfshell",
    version,
    about = "Parse RFC 5322 header fields into flat records"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    modes: ModeArgs,
}

/// Parse mode switches; each one adds to the configured defaults.
#[derive(Args, Debug, Default)]
struct ModeArgs {
    /// Accept an unquoted '.' in display-names
    #[arg(long, global = true)]
    display_name_dot: bool,
    /// Accept addresses without '@domain'
    #[arg(long, global = true)]
    no_domain: bool,
    /// Treat '.' as atom text in structured bodies
    #[arg(long, global = true)]
    dot_atom: bool,
    /// Emit comments as tokens of their own
    #[arg(long, global = true)]
    comments: bool,
    /// Let ';' terminate tokens
    #[arg(long, global = true)]
    semicolon: bool,
    /// Keep zero-length tokens
    #[arg(long, global = true)]
    empty_tokens: bool,
    /// Record syntax errors and keep going
    #[arg(long, global = true)]
    relax: bool,
    /// Stop after the first address or token
    #[arg(long, global = true)]
    stop_early: bool,
}

impl ModeArgs {
    fn apply(&self, mut mode: Mode) -> Mode {
        let switches = [
            (self.display_name_dot, Mode::DISPLAY_NAME_DOT),
            (self.no_domain, Mode::ADDR_SPEC_NO_DOMAIN),
            (self.dot_atom, Mode::DOT_ATOM),
            (self.comments, Mode::COMMENT_TOKENS),
            (self.semicolon, Mode::SEMICOLON),
            (self.empty_tokens, Mode::EMPTY_TOKENS),
            (self.relax, Mode::RELAX),
            (self.stop_early, Mode::STOP_EARLY),
        ];
        for (on, bit) in switches {
            if on {
                mode |= bit;
            }
        }
        mode
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an address header body (From, To, Cc, ...)
    Addr {
        body: String,
        #[arg(long)]
        json: bool,
    },
    /// Tokenize a structured header body
    Tokens {
        body: String,
        #[arg(long)]
        json: bool,
    },
    /// Parse the header section of a message file
    Message {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let parser = Parser::from_config(&config.parser);
    let parser = parser.with_mode(cli.modes.apply(parser.mode()));
    tracing::debug!(mode = ?parser.mode(), "Parser configured");
    let bag_limit = config.memory.bag_limit;

    let ok = match cli.command {
        Commands::Addr { body, json } => cmd_addr(&parser, bag_limit, &body, json)?,
        Commands::Tokens { body, json } => cmd_tokens(&parser, bag_limit, &body, json)?,
        Commands::Message { path, json } => cmd_message(&parser, bag_limit, &path, json)?,
        Commands::Completions { shell } => cmd_completions(shell)?,
        Commands::Manpage => cmd_manpage()?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "imfshell.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<bool> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "imfshell", &mut std::io::stdout());
    Ok(true)
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<bool> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(true)
}

/// Parse one address body and print the records.
fn cmd_addr(parser: &Parser, bag_limit: usize, body: &str, json: bool) -> anyhow::Result<bool> {
    let mut bag = Bag::with_limit(bag_limit);
    let result = parser.parse_addr_header(body, &mut bag);
    warn_if_exhausted(&result, &bag);
    if json {
        let value = address_report(&result, &bag);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_addresses(&result, &bag);
    }
    Ok(result.is_ok())
}

/// Tokenize one structured body and print the tokens.
fn cmd_tokens(parser: &Parser, bag_limit: usize, body: &str, json: bool) -> anyhow::Result<bool> {
    let mut bag = Bag::with_limit(bag_limit);
    let result = parser.parse_struct_header(body, &mut bag);
    warn_if_exhausted(&result, &bag);
    if json {
        let value = token_report(&result, &bag);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_tokens(&result, &bag);
    }
    Ok(result.is_ok())
}

/// Parse every address and MIME field of a message's header section.
///
/// Each field gets its own bag snapshot, rolled back once printed.
fn cmd_message(parser: &Parser, bag_limit: usize, path: &Path, json: bool) -> anyhow::Result<bool> {
    let raw = std::fs::read(path).map_err(|e| ImfError::io(path, e))?;
    let fields = header::split_header_section(&raw);
    tracing::info!(path = %path.display(), fields = fields.len(), "Read header section");

    let mut addresses: Bag<Address> = Bag::with_limit(bag_limit);
    let mut tokens: Bag<Token> = Bag::with_limit(bag_limit);
    let mut reports = Vec::new();
    let mut ok = true;

    for field in &fields {
        let report = match field.kind() {
            FieldKind::Address => {
                let mark = addresses.snapshot();
                let result = parser.parse_addr_header(&field.body, &mut addresses);
                warn_if_exhausted(&result, &addresses);
                ok &= result.is_ok();
                let report = if json {
                    Some(address_report(&result, &addresses))
                } else {
                    print_field_name(field);
                    print_addresses(&result, &addresses);
                    None
                };
                addresses.rollback(mark);
                report
            }
            FieldKind::Structured => {
                let extra = field.structured_mode().unwrap_or_default();
                let field_parser = parser.with_mode(parser.mode() | extra);
                let mark = tokens.snapshot();
                let result = field_parser.parse_struct_header(&field.body, &mut tokens);
                warn_if_exhausted(&result, &tokens);
                ok &= result.is_ok();
                let report = if json {
                    Some(token_report(&result, &tokens))
                } else {
                    print_field_name(field);
                    print_tokens(&result, &tokens);
                    None
                };
                tokens.rollback(mark);
                report
            }
            FieldKind::Unstructured => None,
        };
        if let Some(mut report) = report {
            report["field"] = Value::from(field.name.as_str());
            reports.push(report);
        }
    }

    if json {
        let value = json!({
            "file": path.to_string_lossy(),
            "fields": reports,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(ok)
}

// ── Output helpers ──────────────────────────────────────────────

/// Records to show and the signed result code of one parse call.
fn outcome(result: &imfshell::Result<Parsed>) -> (Option<Parsed>, i32) {
    match result {
        Ok(parsed) => (Some(*parsed), parsed.code()),
        Err(e) => (e.partial().copied(), e.code()),
    }
}

/// Point at `[memory] bag_limit` when a parse ran out of bag space.
fn warn_if_exhausted<T>(result: &imfshell::Result<Parsed>, bag: &Bag<T>) {
    if let Err(ImfError::NoMemory { requested, .. }) = result {
        tracing::warn!(
            requested,
            used = bag.used(),
            limit = bag.limit(),
            "Memory bag exhausted; raise [memory] bag_limit"
        );
    }
}

fn flags_json(flags: Flags) -> Value {
    json!({
        "bits": flags.bits(),
        "names": flags.names(),
    })
}

fn address_report(result: &imfshell::Result<Parsed>, bag: &Bag<Address>) -> Value {
    let (parsed, code) = outcome(result);
    let records: Vec<Value> = parsed
        .iter()
        .flat_map(|p| p.records(bag))
        .map(|a| {
            json!({
                "group": a.group_display_name(),
                "display_name": a.display_name(),
                "local_part": a.locpar(),
                "domain": a.domain(),
                "comment": a.comment(),
                "flags": flags_json(a.flags()),
            })
        })
        .collect();
    json!({
        "code": code,
        "error": result.as_ref().err().map(ToString::to_string),
        "stopped_at": parsed.map(|p| p.stopped_at),
        "addresses": records,
    })
}

fn token_report(result: &imfshell::Result<Parsed>, bag: &Bag<Token>) -> Value {
    let (parsed, code) = outcome(result);
    let records: Vec<Value> = parsed
        .iter()
        .flat_map(|p| p.records(bag))
        .map(|t| {
            json!({
                "text": t.text(),
                "comment": t.comment(),
                "flags": flags_json(t.flags()),
            })
        })
        .collect();
    json!({
        "code": code,
        "error": result.as_ref().err().map(ToString::to_string),
        "stopped_at": parsed.map(|p| p.stopped_at),
        "tokens": records,
    })
}

fn print_field_name(field: &HeaderField) {
    println!();
    println!("  {}:", field.name);
}

fn print_addresses(result: &imfshell::Result<Parsed>, bag: &Bag<Address>) {
    let (parsed, code) = outcome(result);
    for (i, addr) in parsed.iter().flat_map(|p| p.records(bag)).enumerate() {
        let group = match addr.group_display_name() {
            "" => String::new(),
            name => format!("{name}:"),
        };
        let comment = match addr.comment() {
            "" => String::new(),
            text => format!("({text})"),
        };
        println!(
            "  {:>3}  {:<16} {:<40} {:<20} {}",
            i + 1,
            group,
            addr.to_string(),
            comment,
            addr.flags()
        );
    }
    print_status(result, code);
}

fn print_tokens(result: &imfshell::Result<Parsed>, bag: &Bag<Token>) {
    let (parsed, code) = outcome(result);
    for (i, tok) in parsed.iter().flat_map(|p| p.records(bag)).enumerate() {
        let comment = match tok.comment() {
            "" => String::new(),
            text => format!("({text})"),
        };
        println!(
            "  {:>3}  {:<40} {:<20} {}",
            i + 1,
            tok.text(),
            comment,
            tok.flags()
        );
    }
    print_status(result, code);
}

fn print_status(result: &imfshell::Result<Parsed>, code: i32) {
    match result {
        Ok(parsed) => println!("  ok: {} record(s), flags {}", parsed.len, parsed.flags),
        Err(e) => eprintln!("  error {code}: {e}"),
    }
}
