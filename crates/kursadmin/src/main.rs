//! `kursadmin` - CLI for the driving school administration panel
//!
//! This binary drives the admin panel against the local `SQLite` store and
//! identity provider configured for this machine.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::debug;

use kursadmin::cli::{
    AdminCommand, CandidatesCommand, Cli, Command, ConfigCommand, FeesCommand, SchoolCommand,
};
use kursadmin::{
    init_logging, AdminPanel, AuthService, Config, ConsoleNotifier, LocalAuth, Outcome,
    RealtimeStore, SqliteStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        Command::Admin(admin_cmd) => handle_admin(&config, admin_cmd).await,
        command => {
            let mut app = App::open(&config)?;
            app.run(&config, command).await
        }
    }
}

/// The panel wired to the configured store and identity provider.
struct App {
    store: Arc<SqliteStore>,
    auth: Arc<LocalAuth>,
    panel: AdminPanel,
}

impl App {
    fn open(config: &Config) -> anyhow::Result<Self> {
        let path = config.database_path();
        let store = Arc::new(
            SqliteStore::open(&path)
                .with_context(|| format!("failed to open store at {}", path.display()))?,
        );
        let auth = Arc::new(LocalAuth::open(&path, config.password_policy())?);
        let panel = AdminPanel::new(
            Arc::clone(&store) as Arc<dyn RealtimeStore>,
            Arc::clone(&auth) as Arc<dyn AuthService>,
            Arc::new(ConsoleNotifier),
            config.panel_settings(),
        );
        Ok(Self { store, auth, panel })
    }

    async fn run(&mut self, config: &Config, command: Command) -> anyhow::Result<ExitCode> {
        self.panel.mount().await?;
        let outcome = match command {
            Command::Announce(cmd) => {
                self.panel.announcement.content = cmd.content;
                self.panel.announcement.kind = cmd.kind.into();
                self.panel.submit_announcement().await
            }
            Command::School(school_cmd) => match school_cmd {
                SchoolCommand::Add {
                    name,
                    email,
                    password,
                } => {
                    self.panel.school.name = name;
                    self.panel.school.email = email;
                    self.panel.school.password = password;
                    self.panel.submit_school().await
                }
                SchoolCommand::List { json } => {
                    print_schools(&self.panel, json)?;
                    Outcome::Completed
                }
                SchoolCommand::Password {
                    school_id,
                    new_password,
                    admin_password,
                } => {
                    let admin_password = admin_password
                        .or_else(|| config.admin.password.clone())
                        .context("no administrator password given (use --admin-password or set admin.password)")?;
                    self.sign_in_admin(config, &admin_password).await?;
                    self.panel.credentials.school_id = school_id;
                    self.panel.credentials.new_password = new_password;
                    self.panel.credentials.admin_password = admin_password;
                    self.panel.submit_credential_change().await
                }
            },
            Command::Fees(fees_cmd) => match fees_cmd {
                FeesCommand::Show { json } => {
                    print_fees(&self.panel, json)?;
                    Outcome::Completed
                }
                FeesCommand::Set { code, amount } => self.panel.update_fee(code, amount).await,
            },
            Command::Candidates(CandidatesCommand::Reset { yes }) => {
                if yes {
                    self.panel.reset_candidates(&|_: &str| true).await
                } else {
                    self.panel.reset_candidates(&prompt_yes_no).await
                }
            }
            Command::Watch(cmd) => {
                self.watch(config, cmd.json).await?;
                Outcome::Completed
            }
            Command::Admin(_) | Command::Config(_) => bail!("command does not use the panel"),
        };
        self.panel.unmount();
        finish(outcome)
    }

    async fn sign_in_admin(&self, config: &Config, password: &str) -> anyhow::Result<()> {
        let Some(email) = config.admin.email.as_deref() else {
            bail!("admin.email is not configured");
        };
        self.auth
            .sign_in(email, password)
            .await
            .with_context(|| format!("failed to sign in as {email}"))?;
        Ok(())
    }

    async fn watch(&self, config: &Config, json: bool) -> anyhow::Result<()> {
        print_snapshot(&self.panel, json)?;
        let mut ticker = tokio::time::interval(config.poll_interval());
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    debug!("watch interrupted");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if self.store.refresh()? {
                        print_snapshot(&self.panel, json)?;
                    }
                }
            }
        }
    }
}

/// Map a panel outcome to the process exit status.
///
/// Failures were already reported by the notifier; invalid input is
/// returned as an error so it is printed once.
fn finish(outcome: Outcome) -> anyhow::Result<ExitCode> {
    match outcome {
        Outcome::Completed | Outcome::Declined => Ok(ExitCode::SUCCESS),
        Outcome::Failed(_) => Ok(ExitCode::FAILURE),
        Outcome::Invalid(err) => Err(err.into()),
    }
}

fn prompt_yes_no(prompt: &str) -> bool {
    let mut stdout = std::io::stdout();
    if write!(stdout, "{prompt} [e/H] ").and_then(|()| stdout.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(
        answer.trim().to_lowercase().as_str(),
        "e" | "evet" | "y" | "yes"
    )
}

fn print_schools(panel: &AdminPanel, json: bool) -> anyhow::Result<()> {
    let schools = panel.schools();
    if json {
        println!("{}", serde_json::to_string_pretty(&schools)?);
        return Ok(());
    }
    if schools.is_empty() {
        println!("No schools.");
        return Ok(());
    }
    println!("{:<22} {:<32} EMAIL", "ID", "NAME");
    for school in schools {
        println!("{:<22} {:<32} {}", school.id, school.name, school.email);
    }
    Ok(())
}

fn print_fees(panel: &AdminPanel, json: bool) -> anyhow::Result<()> {
    let fees = panel.license_fees();
    if json {
        println!("{}", serde_json::to_string_pretty(&fees)?);
        return Ok(());
    }
    if fees.is_empty() {
        println!("No license fees set.");
        return Ok(());
    }
    for (code, fee) in fees.iter() {
        println!("{:<12} {fee:>10.2} TL", code.as_str());
    }
    Ok(())
}

fn print_snapshot(panel: &AdminPanel, json: bool) -> anyhow::Result<()> {
    if json {
        let models = panel.read_models();
        let snapshot = serde_json::json!({
            "schools": models.schools.values().collect::<Vec<_>>(),
            "licenseFees": models.license_fees,
        });
        println!("{}", serde_json::to_string(&snapshot)?);
        return Ok(());
    }
    println!(
        "--- {} ---",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    print_schools(panel, false)?;
    println!();
    print_fees(panel, false)
}

async fn handle_admin(config: &Config, cmd: AdminCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        AdminCommand::Create { email, password } => {
            let auth = LocalAuth::open(config.database_path(), config.password_policy())?;
            let identity = auth.create_identity(&email, &password).await?;
            println!("Created administrator {} ({})", identity.email, identity.uid);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Store]");
                println!("  Database path:       {}", config.database_path().display());
                println!("  Poll interval (ms):  {}", config.store.poll_interval_ms);
                println!();
                println!("[Admin]");
                println!(
                    "  Email:               {}",
                    config.admin.email.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "  Password:            {}",
                    if config.admin.password.is_some() {
                        "(set)"
                    } else {
                        "(not set)"
                    }
                );
                println!();
                println!("[Panel]");
                println!("  Locale:              {:?}", config.panel.locale);
                println!(
                    "  Credential rotation: {:?}",
                    config.panel.credential_rotation
                );
                println!(
                    "  Min password length: {}",
                    config.panel.min_password_length
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
