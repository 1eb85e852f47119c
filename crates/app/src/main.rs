use std::fmt;
use std::io::{self, BufRead, Write};

use services::{AnswerOutcome, Clock, FieldAnswers, QuizLoopService, QuizSession, RoundOutcome};
use storage::repository::Storage;
use storage::seed::seed_default_catalog;
use tracing::info;
use verbs_core::model::{Question, QuizMode, QuizSettings, SessionReport};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidMode { raw: String },
    InvalidCount { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidMode { raw } => {
                write!(f, "invalid --mode value: {raw} (random, complete, preterit)")
            }
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play   [--db <sqlite_url>] [--mode <mode>] [--count <n>]");
    eprintln!("  cargo run -p app -- resume [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- seed   [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://verbs.sqlite3");
    eprintln!("  --mode random      (random, complete, preterit)");
    eprintln!("  --count 0          (0 = whole catalog)");
    eprintln!();
    eprintln!("While playing, type :pause to save and quit, :quit to abandon.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VERBS_DB_URL, VERBS_MODE, VERBS_COUNT, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Resume,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "resume" => Some(Self::Resume),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    settings: QuizSettings,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("VERBS_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("verbs.sqlite3".into()), normalize_sqlite_url);
        let mut mode = match std::env::var("VERBS_MODE") {
            Ok(raw) => parse_mode(raw)?,
            Err(_) => QuizMode::default(),
        };
        let mut count = match std::env::var("VERBS_COUNT") {
            Ok(raw) => parse_count(raw)?,
            Err(_) => None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--mode" => mode = parse_mode(require_value(args, "--mode")?)?,
                "--count" => count = parse_count(require_value(args, "--count")?)?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let settings = QuizSettings::new(mode, count)
            .map_err(|_| ArgsError::InvalidCount { raw: "0".into() })?;
        Ok(Self { db_url, settings })
    }
}

fn parse_mode(raw: String) -> Result<QuizMode, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidMode { raw })
}

/// `0` means the whole catalog.
fn parse_count(raw: String) -> Result<Option<u32>, ArgsError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Ok(None),
        Ok(n) => Ok(Some(n)),
        Err(_) => Err(ArgsError::InvalidCount { raw }),
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

//
// ─── TERMINAL LOOP ─────────────────────────────────────────────────────────────
//

enum Input {
    Line(String),
    Pause,
    Quit,
}

fn read_input(stdin: &mut impl BufRead, label: &str) -> io::Result<Input> {
    print!("  {label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(Input::Quit);
    }
    Ok(match line.trim() {
        ":pause" => Input::Pause,
        ":quit" | ":q" => Input::Quit,
        _ => Input::Line(line.trim_end_matches(['\r', '\n']).to_string()),
    })
}

fn print_question(session: &QuizSession, question: &Question) {
    let progress = session.progress();
    println!();
    println!(
        "Round {} · {}/{} · {} correct so far",
        progress.round_number,
        progress.current_index + 1,
        progress.round_total,
        progress.round_correct
    );
    if question.hint.is_empty() {
        println!("{}: {}", question.prompt_label, question.prompt_value);
    } else {
        println!(
            "{}: {}  ({})",
            question.prompt_label, question.prompt_value, question.hint
        );
    }
}

fn print_outcome(question: &Question, outcome: &AnswerOutcome) {
    if outcome.correct {
        println!("  ✓ correct");
        return;
    }
    for field in &outcome.fields {
        let label = question
            .field(field.key)
            .map_or(field.key.as_str(), |spec| spec.label);
        if field.correct {
            println!("  ✓ {label}: {}", field.expected);
        } else {
            println!("  ✗ {label}: {} (you wrote \"{}\")", field.expected, field.given);
        }
    }
}

fn print_report(report: &SessionReport, recorded: bool) {
    println!();
    println!(
        "All verbs found in {} round(s). Accuracy: {}% ({}/{}).",
        report.rounds, report.accuracy_percent, report.total_correct, report.total_answered
    );
    if !report.verb_errors.is_empty() {
        println!("Verbs missed: {}", report.verb_errors.len());
    }
    if !recorded {
        println!("(results were not saved)");
    }
}

async fn play(
    svc: &QuizLoopService,
    mut session: QuizSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut stdin = stdin.lock();

    loop {
        if session.is_round_complete() {
            match svc.on_round_complete(&mut session).await? {
                RoundOutcome::NextRound {
                    round_number,
                    retry_count,
                } => {
                    println!();
                    println!("Round {round_number}: {retry_count} verb(s) to review.");
                    continue;
                }
                RoundOutcome::Victory { report, recorded } => {
                    print_report(&report, recorded);
                    return Ok(());
                }
            }
        }

        let Some(question) = session.question().cloned() else {
            return Ok(());
        };
        print_question(&session, &question);

        let mut answers = FieldAnswers::new();
        for field in &question.fields {
            match read_input(&mut stdin, field.label)? {
                Input::Line(given) => {
                    answers.insert(field.key, given);
                }
                Input::Pause => {
                    match svc.pause(&mut session).await {
                        Ok(()) => {
                            println!("Session paused. Run `resume` to continue.");
                            return Ok(());
                        }
                        Err(err) => {
                            eprintln!("could not pause: {err}");
                            break;
                        }
                    }
                }
                Input::Quit => {
                    info!("session abandoned");
                    return Ok(());
                }
            }
        }

        if answers.len() < question.fields.len() {
            continue;
        }

        let outcome = svc.submit(&mut session, &answers)?;
        print_outcome(&question, &outcome);
        svc.advance(&mut session)?;
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let inserted = seed_default_catalog(storage.verbs.as_ref()).await?;

    let svc = QuizLoopService::from_storage(Clock::System, &storage).with_settings(parsed.settings);

    match cmd {
        Command::Seed => {
            let total = storage.verbs.list_verbs().await?.len();
            println!("Seeded {inserted} verbs ({total} in catalog)");
            Ok(())
        }
        Command::Play => {
            if let Some(pending) = svc.pending().await? {
                println!(
                    "A paused session from {} is waiting; run `resume` to continue it.",
                    pending.paused_at.format("%Y-%m-%d %H:%M")
                );
            }
            let session = svc.start().await?;
            play(&svc, session).await?;
            Ok(())
        }
        Command::Resume => {
            let session = svc.resume().await?;
            play(&svc, session).await?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_means_whole_catalog() {
        assert_eq!(parse_count("0".into()).unwrap(), None);
        assert_eq!(parse_count(" 12 ".into()).unwrap(), Some(12));
        assert!(parse_count("many".into()).is_err());
    }

    #[test]
    fn mode_flag_is_case_insensitive() {
        assert_eq!(parse_mode("Complete".into()).unwrap(), QuizMode::Complete);
        assert!(matches!(
            parse_mode("all".into()),
            Err(ArgsError::InvalidMode { .. })
        ));
    }

    #[test]
    fn flags_override_defaults() {
        let mut argv = ["--db", "sqlite::memory:", "--mode", "preterit", "--count", "5"]
            .into_iter()
            .map(String::from);
        let args = Args::parse(&mut argv).unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.settings.mode(), QuizMode::Preterit);
        assert_eq!(args.settings.count(), Some(5));
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("data/verbs.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/verbs.sqlite3"));
        assert_eq!(
            normalize_sqlite_url("sqlite://already.db".into()),
            "sqlite://already.db"
        );
    }
}
