//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "noreply")]
#[command(version)]
#[command(about = "Send no-reply transactional email", long_about = None)]
pub struct Cli {
    /// JSON settings file; environment variables take precedence
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// User database, e.g. sqlite:///var/lib/app.db or sqlite://:memory:
    #[arg(long, env = "DB_URL", global = true, value_parser = parse_database)]
    pub database: Option<Database>,

    /// Attempts per email, including the first
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Base backoff in seconds between attempts
    #[arg(long, global = true)]
    pub backoff: Option<f64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Welcome a newly registered user
    Welcome(UserArgs),

    /// Confirm a received payment
    PaymentConfirmation {
        #[command(flatten)]
        user: UserArgs,
        /// Amount paid
        #[arg(long)]
        amount: f64,
        /// Date of the payment
        #[arg(long)]
        payment_date: String,
    },

    /// Report a payment that did not arrive
    PaymentFailed {
        #[command(flatten)]
        user: UserArgs,
        /// Date the payment was due
        #[arg(long)]
        due_date: String,
    },

    /// Announce that a subscription was frozen
    SubscriptionFrozen(UserArgs),

    /// Send an arbitrary HTML email
    Send(SendArgs),

    /// Insert or replace a user record
    SeedUser(SeedUserArgs),

    /// Print the delivery log of a user as JSON
    History(UserArgs),
}

#[derive(Args, Debug)]
pub struct UserArgs {
    /// Id of the user in the database
    #[arg(long)]
    pub user_id: i64,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Recipient address (repeatable)
    #[arg(long, required = true)]
    pub to: Vec<String>,

    /// Subject line
    #[arg(long)]
    pub subject: String,

    /// File containing the HTML body
    #[arg(long)]
    pub html: PathBuf,

    /// File containing the plain-text body; derived from the HTML if omitted
    #[arg(long)]
    pub plain: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SeedUserArgs {
    /// User id
    #[arg(long)]
    pub id: i64,

    /// Email address
    #[arg(long)]
    pub email: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Subscription status
    #[arg(long)]
    pub status: Option<String>,

    /// Date of the last payment
    #[arg(long)]
    pub last_payment_date: Option<String>,
}

/// Where users and the delivery log are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    /// `SQLite` file.
    File(PathBuf),
    /// Private in-memory `SQLite` database.
    Memory,
}

/// Accepts `sqlite:///path`, `sqlite://:memory:` or a bare file path.
fn parse_database(value: &str) -> Result<Database, String> {
    let location = value
        .strip_prefix("sqlite:///")
        .or_else(|| value.strip_prefix("sqlite://"))
        .unwrap_or(value);

    match location {
        "" => Err("database location is empty".to_string()),
        ":memory:" => Ok(Database::Memory),
        _ if location.contains("://") => Err(format!("unsupported database URL: {value}")),
        path => Ok(Database::File(PathBuf::from(path))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_database_urls() {
        assert_eq!(
            parse_database("sqlite:///var/lib/app.db").unwrap(),
            Database::File(PathBuf::from("var/lib/app.db"))
        );
        assert_eq!(
            parse_database("sqlite:////var/lib/app.db").unwrap(),
            Database::File(PathBuf::from("/var/lib/app.db"))
        );
        assert_eq!(parse_database("sqlite://:memory:").unwrap(), Database::Memory);
        assert_eq!(parse_database("sqlite:///:memory:").unwrap(), Database::Memory);
        assert_eq!(
            parse_database("users.db").unwrap(),
            Database::File(PathBuf::from("users.db"))
        );
        assert!(parse_database("postgres://localhost/app").is_err());
        assert!(parse_database("sqlite:///").is_err());
    }

    #[test]
    fn test_event_command() {
        let cli = Cli::try_parse_from([
            "noreply",
            "--database",
            "sqlite://:memory:",
            "payment-confirmation",
            "--user-id",
            "1",
            "--amount",
            "49.99",
            "--payment-date",
            "2025-12-01",
        ])
        .unwrap();

        assert_eq!(cli.database, Some(Database::Memory));
        match cli.command {
            Commands::PaymentConfirmation {
                user,
                amount,
                payment_date,
            } => {
                assert_eq!(user.user_id, 1);
                assert!((amount - 49.99).abs() < f64::EPSILON);
                assert_eq!(payment_date, "2025-12-01");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_send_requires_recipient() {
        assert!(
            Cli::try_parse_from(["noreply", "send", "--subject", "S", "--html", "body.html"])
                .is_err()
        );

        let cli = Cli::try_parse_from([
            "noreply", "send", "--to", "a@x.com", "--to", "b@x.com", "--subject", "S", "--html",
            "body.html",
        ])
        .unwrap();
        let Commands::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.to, vec!["a@x.com", "b@x.com"]);
        assert!(args.plain.is_none());
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "noreply",
            "welcome",
            "--user-id",
            "3",
            "--max-retries",
            "5",
            "--backoff",
            "0.5",
        ])
        .unwrap();
        assert_eq!(cli.max_retries, Some(5));
        assert!((cli.backoff.unwrap() - 0.5).abs() < f64::EPSILON);
    }
}
