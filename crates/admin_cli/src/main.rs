use std::{error::Error, io::Write};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, EngineError, NewUser, ReminderScope};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "tally_admin")]
#[command(about = "Admin utilities for Tally (users, recurring payments, reminders)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./tally.db?mode=rwc")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Recurring(Recurring),
    Reminders(Reminders),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    login: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
}

#[derive(Args, Debug)]
struct Recurring {
    #[command(subcommand)]
    command: RecurringCommand,
}

#[derive(Subcommand, Debug)]
enum RecurringCommand {
    /// Materialize every recurring transaction due now.
    Run,
}

#[derive(Args, Debug)]
struct Reminders {
    #[command(subcommand)]
    command: RemindersCommand,
}

#[derive(Subcommand, Debug)]
enum RemindersCommand {
    /// Print the reminder events for today without changing anything.
    Scan(ReminderScanArgs),
}

#[derive(Args, Debug)]
struct ReminderScanArgs {
    /// Restrict the scan to one user id.
    #[arg(long)]
    user: Option<uuid::Uuid>,
}

/// Keeps the terminal in raw mode while alive.
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn notice(out: &mut impl Write, message: &str) -> std::io::Result<()> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(message),
        Print("\r\n")
    )
}

/// Reads a line without echoing it, printing `*` per character.
fn read_secret(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawMode::enable()?;
    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;

    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);

        match code {
            KeyCode::Enter => break,
            KeyCode::Char('c') if ctrl => {
                execute!(out, Print("\r\n"))?;
                return Err("interrupted".into());
            }
            KeyCode::Backspace if secret.pop().is_some() => {
                execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
            }
            KeyCode::Char(ch) if !ctrl => {
                secret.push(ch);
                execute!(out, Print("*"))?;
            }
            _ => {}
        }
        out.flush()?;
    }

    execute!(out, Print("\r\n"))?;
    Ok(secret)
}

/// Asks for a new password and its confirmation, up to three times.
fn new_password() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let password = read_secret("Password: ")?;
        if password.is_empty() {
            notice(&mut out, "Password must not be empty.")?;
            continue;
        }
        if read_secret("Confirm password: ")? == password {
            return Ok(password);
        }
        notice(&mut out, "Passwords do not match. Try again.")?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = new_password()?;

            let created = engine
                .register(
                    NewUser {
                        first_name: args.first_name,
                        last_name: args.last_name,
                        login: args.login.clone(),
                        password,
                    },
                    Utc::now(),
                )
                .await;
            match created {
                Ok(user) => println!("created user: {} ({})", user.login, user.id),
                Err(EngineError::ExistingKey(_)) => {
                    eprintln!("user already exists: {}", args.login);
                    std::process::exit(1);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Command::Recurring(Recurring {
            command: RecurringCommand::Run,
        }) => {
            let report = engine.process_recurring(Utc::now()).await?;
            println!(
                "processed: {}, skipped: {}",
                report.processed, report.skipped
            );
        }
        Command::Reminders(Reminders {
            command: RemindersCommand::Scan(args),
        }) => {
            let scope = args.user.map_or(ReminderScope::All, ReminderScope::User);
            let mut count = 0;
            for event in engine.scan_reminders(scope, Utc::now()).await? {
                count += 1;
                let overdue = event
                    .bucket
                    .overdue_days()
                    .map(|days| format!(" ({days} days)"))
                    .unwrap_or_default();
                println!(
                    "{}\t{}{}\t{}\t{}\t{}",
                    event.user_id,
                    event.bucket.as_str(),
                    overdue,
                    event.name,
                    event.amount(),
                    event.next_run.format("%Y-%m-%d"),
                );
            }
            println!("{count} reminder(s)");
        }
    }

    Ok(())
}
