//! railpilot CLI entry point.

mod args;
mod driver;

use std::future::Future;
use std::io::Read;

use anyhow::Context;
use clap::Parser;
use railpilot_core::classify::{classify, is_invalid_captcha, is_logged_in, State};
use railpilot_core::criteria::BookingCriteria;
use railpilot_core::error::FlowError;
use railpilot_core::flow::{CaptchaMode, FlowSettings, Session};
use railpilot_core::snapshot::ScreenSnapshot;
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::args::{ClassifyArgs, Cli, Commands, FlowArgs, RunArgs};
use crate::driver::{CommandSolver, TokioPacer, WebDriver};

type BrowserSession = Session<WebDriver, CommandSolver, TokioPacer>;

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let name = cli.command.name();
    let result = match cli.command {
        Commands::Examples => {
            println!("{}", crate::args::EXAMPLES_TEXT);
            Ok(())
        }
        Commands::Classify(args) => run_classify(&args),
        Commands::Run(args) => run_flow(name, run_all(args)),
        Commands::Login(args) => run_flow(name, run_login(args)),
        Commands::Book(args) => run_flow(name, run_book(args)),
        Commands::Captcha(args) => run_flow(name, run_captcha(args)),
    };

    if let Err(e) = result {
        std::process::exit(report(&e));
    }
}

/// Log an error with its hint and return the exit code for it.
fn report(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<FlowError>() {
        Some(flow) => {
            error!("{}", flow);
            if let Some(hint) = flow.suggestion() {
                eprintln!("hint: {}", hint);
            }
            flow.exit_code()
        }
        None => {
            error!("{:#}", err);
            1
        }
    }
}

/// Run a flow against the browser, stopping early on Ctrl+C.
fn run_flow<F>(command: &'static str, flow: F) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    let runtime = tokio::runtime::Runtime::new()?;
    let run_id = Uuid::new_v4();
    let span = info_span!("run", id = %run_id, command);

    runtime.block_on(
        async {
            tokio::select! {
                result = flow => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT, stopping; the browser stays open");
                    Ok(())
                }
            }
        }
        .instrument(span),
    )
}

/// Log in, book, then clear the review captcha.
async fn run_all(args: RunArgs) -> anyhow::Result<()> {
    let criteria = criteria(&args)?;
    let mut session = open_session(&args.flow).await?;
    session.login().await?;
    info!("Search for your journey in the browser; booking starts on the results page");
    session.book(&criteria).await?;
    info!("Fill in the passengers in the browser; the review captcha is handled next");
    session.solve_post_search_captcha().await?;
    finish(session);
    Ok(())
}

async fn run_login(args: FlowArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args).await?;
    session.login().await?;
    finish(session);
    Ok(())
}

async fn run_book(args: RunArgs) -> anyhow::Result<()> {
    let criteria = criteria(&args)?;
    let mut session = open_session(&args.flow).await?;
    session.book(&criteria).await?;
    finish(session);
    Ok(())
}

async fn run_captcha(args: FlowArgs) -> anyhow::Result<()> {
    let mut session = open_session(&args).await?;
    session.solve_post_search_captcha().await?;
    finish(session);
    Ok(())
}

fn criteria(args: &RunArgs) -> Result<BookingCriteria, FlowError> {
    BookingCriteria::new(&args.train_no, &args.coach, &args.date, args.tatkal)
}

async fn open_session(args: &FlowArgs) -> anyhow::Result<BrowserSession> {
    let driver = WebDriver::connect(&args.driver).await?;
    let solver = CommandSolver::from_command_line(&args.solver)
        .context("Invalid --solver command")?;
    let settings = FlowSettings {
        captcha_mode: if args.manual_captcha {
            CaptchaMode::Manual
        } else {
            CaptchaMode::Automatic
        },
        captcha_budget: args.captcha_budget,
        max_iterations: args.max_iterations,
        ..FlowSettings::default()
    };
    info!(
        "Session {} ready ({:?} captcha)",
        driver.session_id(),
        settings.captcha_mode
    );
    Ok(Session::new(driver, solver, TokioPacer, settings))
}

fn finish(session: BrowserSession) {
    let driver = session.into_dom();
    info!(
        "Done; continue in the browser (reattach with --session-id {})",
        driver.session_id()
    );
}

/// What `classify` prints for a snapshot.
#[derive(Debug, Serialize)]
struct ClassifyReport {
    state: State,
    logged_in: bool,
    invalid_captcha: bool,
    content_hash: u64,
}

fn run_classify(args: &ClassifyArgs) -> anyhow::Result<()> {
    let raw = if args.input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("Failed to read {}", args.input))?
    };

    let report = classify_report(&parse_snapshot(&raw));
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Snapshot JSON when it parses as one, otherwise the input is page text.
fn parse_snapshot(raw: &str) -> ScreenSnapshot {
    serde_json::from_str(raw).unwrap_or_else(|_| ScreenSnapshot::from_text(raw))
}

fn classify_report(snapshot: &ScreenSnapshot) -> ClassifyReport {
    let state = classify(snapshot);
    ClassifyReport {
        state,
        logged_in: is_logged_in(snapshot),
        invalid_captcha: is_invalid_captcha(snapshot),
        content_hash: snapshot.content_hash(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_snapshot_uses_markup() {
        let raw = r#"{"text": "Your ticket will be sent to you", "markup": "<input placeholder=\"Enter Captcha\">"}"#;
        let report = classify_report(&parse_snapshot(raw));
        assert_eq!(report.state, State::CaptchaPromptAfterSearch);
        assert!(!report.logged_in);
    }

    #[test]
    fn test_plain_text_is_classified() {
        let report = classify_report(&parse_snapshot("Invalid Captcha FORGOT ACCOUNT DETAILS"));
        assert_eq!(report.state, State::LoginPageAwaitingCaptcha);
        assert!(report.invalid_captcha);
        assert!(!report.logged_in);
    }

    #[test]
    fn test_report_serializes_state_name() {
        let report = classify_report(&parse_snapshot("No seats available"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "no_seats_available");
    }

    #[test]
    fn test_flow_errors_keep_exit_codes() {
        let err = anyhow::Error::from(FlowError::NoSeatsAvailable);
        assert_eq!(report(&err), 3);
        assert_eq!(report(&anyhow::anyhow!("connection refused")), 1);
    }

    #[test]
    fn test_bad_date_is_invalid_criteria() {
        let args = Cli::parse_from([
            "railpilot",
            "book",
            "--train-no",
            "12951",
            "--coach",
            "3A",
            "--date",
            "tomorrow",
        ]);
        let Commands::Book(args) = args.command else {
            panic!("Expected book command");
        };
        let err = anyhow::Error::from(criteria(&args).unwrap_err());
        assert_eq!(report(&err), 2);
    }

    #[test]
    fn test_offline_and_flow_commands_are_distinct() {
        let names: Vec<&str> = [
            vec!["railpilot", "examples"],
            vec!["railpilot", "classify", "page.txt"],
            vec!["railpilot", "captcha", "--session-id", "abc"],
        ]
        .into_iter()
        .map(|argv| Cli::parse_from(argv).command.name())
        .collect();
        assert_eq!(names, vec!["examples", "classify", "captcha"]);
    }
}
