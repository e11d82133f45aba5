//! CLI argument parsing with clap derive macros.

use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand, ValueEnum};

/// Reservation flow automation against a live browser.
///
/// Drives an already open reservation site through login, train selection
/// and the post-search captcha by polling the rendered page, classifying it
/// and reacting. Credentials, station search and passenger forms stay with
/// the operator.
#[derive(Debug, Parser)]
#[command(name = "railpilot", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in, book the train, then clear the post-search captcha
    #[command(after_help = "\
Examples:
  railpilot run --train-no 12951 --coach 3A --date 18/01/2026
  railpilot run --tatkal --manual-captcha --train-no 12951 --coach SL --date 18/01/2026
  TRAIN_NO=12951 TRAIN_COACH=3A TRAVEL_DATE=18/01/2026 railpilot run")]
    Run(RunArgs),

    /// Solve the login captcha until the session is authenticated
    Login(FlowArgs),

    /// Select the train until the passenger details page shows up
    #[command(after_help = "\
Examples:
  railpilot book --train-no 12951 --coach 3A --date 18/01/2026
  railpilot book --session-id 4f1c... --tatkal --train-no 12951 --coach 2A --date 18-01-2026")]
    Book(RunArgs),

    /// Solve the review-page captcha until the payment page shows up
    Captcha(FlowArgs),

    /// Classify a saved page snapshot without a browser
    #[command(after_help = "\
Input is either snapshot JSON ({\"text\": ..., \"markup\": ...}) or plain page text.

Examples:
  railpilot classify page.json          # Saved snapshot
  pbpaste | railpilot classify -        # Text copied from the browser")]
    Classify(ClassifyArgs),

    /// Show an end-to-end usage example
    Examples,
}

impl Commands {
    /// Name used in the run span.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Run(_) => "run",
            Commands::Login(_) => "login",
            Commands::Book(_) => "book",
            Commands::Captcha(_) => "captcha",
            Commands::Classify(_) => "classify",
            Commands::Examples => "examples",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Browser {
    Chrome,
    Firefox,
    Edge,
}

impl Browser {
    /// W3C `browserName` capability.
    pub fn capability_name(self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "MicrosoftEdge",
        }
    }
}

/// Where the browser lives.
#[derive(Debug, Clone, clap::Args)]
pub struct DriverArgs {
    /// WebDriver server (chromedriver, geckodriver, Selenium)
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    /// Attach to an existing WebDriver session instead of starting a browser
    #[arg(long, value_name = "ID")]
    pub session_id: Option<String>,

    /// Page to open before the flow starts
    #[arg(long)]
    pub url: Option<String>,

    /// Browser to start when no session id is given
    #[arg(long, value_enum, default_value_t = Browser::Chrome)]
    pub browser: Browser,
}

/// Settings shared by every flow command.
#[derive(Debug, Clone, clap::Args)]
pub struct FlowArgs {
    #[command(flatten)]
    pub driver: DriverArgs,

    /// Leave captchas to the operator
    #[arg(
        long,
        env = "MANUAL_CAPTCHA",
        value_parser = BoolishValueParser::new(),
        default_value_t = false
    )]
    pub manual_captcha: bool,

    /// Solver command; the captcha image reference is appended as last argument
    #[arg(
        long,
        env = "CAPTCHA_SOLVER",
        default_value = "python3 irctc-captcha-solver/app.py"
    )]
    pub solver: String,

    /// Attempts per post-search captcha loop
    #[arg(long, default_value_t = 120)]
    pub captcha_budget: u32,

    /// Give up a loop after this many polls (default: no limit)
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<u64>,
}

#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub flow: FlowArgs,

    /// Train number, e.g. 12951
    #[arg(long, env = "TRAIN_NO")]
    pub train_no: String,

    /// Class code, e.g. 3A, SL, CC
    #[arg(long, env = "TRAIN_COACH")]
    pub coach: String,

    /// Travel date (DD/MM/YYYY, DD-MM-YYYY or YYYY-MM-DD)
    #[arg(long, env = "TRAVEL_DATE")]
    pub date: String,

    /// Wait for the Tatkal window of the class before booking
    #[arg(
        long,
        env = "TATKAL",
        value_parser = BoolishValueParser::new(),
        default_value_t = false
    )]
    pub tatkal: bool,
}

#[derive(Debug, clap::Args)]
pub struct ClassifyArgs {
    /// Snapshot file, or '-' for stdin
    #[arg(default_value = "-")]
    pub input: String,
}

/// End-to-end example text for the `examples` command.
pub const EXAMPLES_TEXT: &str = r#"End-to-end example: Book a Tatkal ticket

# 1. Start a WebDriver server for your browser
chromedriver --port=4444

# 2. Run the whole flow; a browser window opens on the login page
railpilot run --url https://www.irctc.co.in/nget/train-search \
  --train-no 12951 --coach 3A --date 18/01/2026 --tatkal

# 3. In the browser: enter your credentials. railpilot solves the captcha
#    and logs "Session authenticated".

# 4. In the browser: fill in the stations and date and search.
#    railpilot waits for the Tatkal window (10:00 for AC, 11:00 otherwise),
#    then selects the train and presses Book Now until
#    "Successfully reached passenger details page".

# 5. In the browser: fill in passengers and continue. railpilot clears the
#    review captcha until "Payment page reached".

# 6. Pay in the browser. The window stays open when railpilot exits.

Exit codes: 0 done, 2 bad criteria, 3 no seats, 4 provider error,
5 captcha attempts exhausted, 6 iteration limit, 1 anything else.

Check what railpilot sees on a saved page:
railpilot classify page.txt
"#;

#[cfg(test)]
mod tests {
    use super::{Browser, Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_run_parses_criteria_and_defaults() {
        let cli = Cli::parse_from([
            "railpilot",
            "run",
            "--train-no",
            "12951",
            "--coach",
            "3A",
            "--date",
            "18/01/2026",
            "--tatkal",
        ]);

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.train_no, "12951");
                assert_eq!(args.coach, "3A");
                assert!(args.tatkal);
                assert!(!args.flow.manual_captcha);
                assert_eq!(args.flow.captcha_budget, 120);
                assert_eq!(args.flow.max_iterations, None);
                assert_eq!(args.flow.driver.browser, Browser::Chrome);
                assert!(args.flow.solver.ends_with("app.py"));
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_login_attaches_to_session() {
        let cli = Cli::parse_from([
            "railpilot",
            "login",
            "--session-id",
            "abc123",
            "--manual-captcha",
            "--max-iterations",
            "50",
        ]);

        match cli.command {
            Commands::Login(args) => {
                assert_eq!(args.driver.session_id.as_deref(), Some("abc123"));
                assert!(args.manual_captcha);
                assert_eq!(args.max_iterations, Some(50));
            }
            _ => panic!("Expected login command"),
        }
    }

    #[test]
    fn test_run_requires_criteria() {
        let result = Cli::try_parse_from(["railpilot", "book", "--coach", "3A"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_classify_defaults_to_stdin() {
        let cli = Cli::parse_from(["railpilot", "classify"]);
        match cli.command {
            Commands::Classify(args) => assert_eq!(args.input, "-"),
            _ => panic!("Expected classify command"),
        }
    }

    #[test]
    fn test_edge_capability_name() {
        assert_eq!(Browser::Edge.capability_name(), "MicrosoftEdge");
    }
}
