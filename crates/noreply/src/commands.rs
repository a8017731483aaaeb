//! Command implementations.

use anyhow::{Context, Result, bail};
use noreply_core::{
    DeliveryLog, Mailer, MailerSettings, Notification, Notifier, OutgoingEmail, User,
    UserRepository,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::cli::{Cli, Commands, Database, SeedUserArgs, SendArgs};

/// Runs the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Welcome(user) => notify(&cli, user.user_id, Notification::Welcome).await,
        Commands::PaymentConfirmation {
            user,
            amount,
            payment_date,
        } => {
            let notification = Notification::PaymentConfirmation {
                amount: *amount,
                payment_date: payment_date.clone(),
            };
            notify(&cli, user.user_id, notification).await
        }
        Commands::PaymentFailed { user, due_date } => {
            let notification = Notification::PaymentFailed {
                due_date: due_date.clone(),
            };
            notify(&cli, user.user_id, notification).await
        }
        Commands::SubscriptionFrozen(user) => {
            notify(&cli, user.user_id, Notification::SubscriptionFrozen).await
        }
        Commands::Send(args) => send(&cli, args).await,
        Commands::SeedUser(args) => seed_user(&cli, args).await,
        Commands::History(user) => history(&cli, user.user_id).await,
    }
}

/// Loads settings from the environment, filling gaps from the config file.
fn load_mailer(cli: &Cli) -> Result<Mailer> {
    let mut settings = MailerSettings::from_env()?;
    if let Some(path) = &cli.config {
        settings = settings.or(MailerSettings::from_file(path)?);
    }
    if cli.max_retries.is_some() {
        settings.max_retries = cli.max_retries;
    }
    if cli.backoff.is_some() {
        settings.backoff_seconds = cli.backoff;
    }

    let policy = settings.retry_policy()?;
    let (identity, config) = settings.validate()?;
    tracing::debug!(
        sender = identity.address(),
        host = config.host(),
        port = config.port(),
        security = config.security().display_name(),
        "Mailer configured"
    );

    Ok(Mailer::new(identity, config).with_retry_policy(policy))
}

async fn open_database(cli: &Cli) -> Result<SqlitePool> {
    let Some(database) = &cli.database else {
        bail!("No database configured; pass --database or set DB_URL");
    };

    let pool = match database {
        Database::File(path) => {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await
                .with_context(|| format!("Cannot open database {}", path.display()))?
        }
        Database::Memory => {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await?
        }
    };

    Ok(pool)
}

async fn notify(cli: &Cli, user_id: i64, notification: Notification) -> Result<()> {
    let pool = open_database(cli).await?;
    let users = UserRepository::with_pool(pool.clone()).await?;
    let log = DeliveryLog::with_pool(pool).await?;
    let notifier = Notifier::new(load_mailer(cli)?).with_log(log);

    notifier
        .notify_user(&users, user_id, &notification)
        .await
        .with_context(|| format!("Cannot send {} email to user {user_id}", notification.kind()))?;

    println!("Sent {} email to user {user_id}", notification.kind());
    Ok(())
}

async fn send(cli: &Cli, args: &SendArgs) -> Result<()> {
    let html = tokio::fs::read_to_string(&args.html)
        .await
        .with_context(|| format!("Cannot read {}", args.html.display()))?;

    let mut email = OutgoingEmail::new(args.subject.clone(), html);
    email.to.clone_from(&args.to);
    if let Some(path) = &args.plain {
        let plain = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        email = email.plain_body(plain);
    }

    load_mailer(cli)?.send(&email).await?;

    println!("Sent to {}", args.to.join(", "));
    Ok(())
}

async fn seed_user(cli: &Cli, args: &SeedUserArgs) -> Result<()> {
    let users = UserRepository::with_pool(open_database(cli).await?).await?;

    let mut user = User::new(args.id, args.email.clone(), args.name.clone());
    user.subscription_status.clone_from(&args.status);
    user.last_payment_date.clone_from(&args.last_payment_date);
    users.upsert(&user).await?;

    println!("Stored user {}", user.id);
    Ok(())
}

async fn history(cli: &Cli, user_id: i64) -> Result<()> {
    let log = DeliveryLog::with_pool(open_database(cli).await?).await?;
    let records = log.for_user(user_id).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
