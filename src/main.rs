use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use caces_vote::{
    init_telemetry, CacesVoteConfig, OmbeaClient, OperationTimer, PollResults, Question,
    VotingCoordinator,
};

#[derive(Parser)]
#[command(name = "caces-vote")]
#[command(about = "OMBEA voting-session coordinator for CACES exam sessions")]
#[command(long_about = "caces-vote drives OMBEA response links through the local hardware-control \
                       API: authenticate, discover keypads, open and close polls and collect votes. \
                       Use 'caces-vote check' to verify the hardware before an exam.")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "caces-vote.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate and list the response links known to the OMBEA service
    Links {
        /// Include disconnected response links
        #[arg(long, help = "List every response link, not only connected ones")]
        all: bool,
    },
    /// Connect to the hardware and report whether polls can be opened
    Check,
    /// Run an exam session over a question file: one poll per question
    Rehearse {
        /// JSON array of questions
        #[arg(long, help = "Path to a JSON file holding the question list")]
        questions: PathBuf,
        /// Simulate keypad responses instead of using the hardware
        #[arg(long, help = "Use simulated responses, no OMBEA hardware needed")]
        test_mode: bool,
        /// How long each poll stays open
        #[arg(long, default_value = "10", help = "Seconds each poll stays open")]
        poll_seconds: u64,
    },
    /// Show or write the effective configuration
    Config {
        /// Write the configuration as TOML instead of printing it
        #[arg(long, help = "Write the effective configuration to this path")]
        write: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    CacesVoteConfig::load_env_file()?;
    let config = CacesVoteConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    init_telemetry(&config.observability)?;

    match cli.command {
        Commands::Links { all } => tokio::runtime::Runtime::new()?
            .block_on(async { links_command(&config, all).await }),
        Commands::Check => {
            tokio::runtime::Runtime::new()?.block_on(async { check_command(&config).await })
        }
        Commands::Rehearse {
            questions,
            test_mode,
            poll_seconds,
        } => tokio::runtime::Runtime::new()?.block_on(async {
            rehearse_command(&config, &questions, test_mode, poll_seconds).await
        }),
        Commands::Config { write } => config_command(&config, write.as_deref()),
    }
}

async fn links_command(config: &CacesVoteConfig, all: bool) -> Result<()> {
    let client = OmbeaClient::new(&config.hardware)?;

    println!("🔌 OMBEA service: {}", config.hardware.base_url);
    client.get_access_token().await?;
    let links = client.get_response_links(!all).await?;

    if links.is_empty() {
        println!("📭 No response link found");
        return Ok(());
    }

    println!("📡 {} response link(s):", links.len());
    for link in &links {
        let marker = if link.is_connected() { "🟢" } else { "⚪" };
        match &link.name {
            Some(name) => println!("  {} {} ({})", marker, link.id, name),
            None => println!("  {} {}", marker, link.id),
        }
    }
    Ok(())
}

async fn check_command(config: &CacesVoteConfig) -> Result<()> {
    let timer = OperationTimer::new("check");
    let client = Arc::new(OmbeaClient::new(&config.hardware)?);
    let coordinator = VotingCoordinator::new(client.clone(), config.session.clone());

    println!("🔍 Connecting to {}...", config.hardware.base_url);
    let ready = coordinator.connect().await;
    let snapshot = coordinator.snapshot().await;
    coordinator.dispose().await;
    client.metrics().log_stats();
    timer.finish();

    if let Some(link_id) = &snapshot.connection.active_response_link_id {
        println!("✅ OMBEA ready, active response link: {}", link_id);
    }
    for device in &snapshot.devices {
        let state = if device.connected { "connected" } else { "disconnected" };
        println!("  • {} ({})", device.display_name(), state);
    }

    if !ready {
        let reason = snapshot
            .connection
            .connection_error
            .unwrap_or_else(|| "unknown error".to_string());
        println!("❌ {}", reason);
        bail!("OMBEA hardware not ready");
    }
    Ok(())
}

fn load_questions(path: &Path) -> Result<Vec<Question>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read questions from {}", path.display()))?;
    let questions: Vec<Question> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid question file {}", path.display()))?;
    if questions.is_empty() {
        bail!("Question file {} holds no question", path.display());
    }
    Ok(questions)
}

async fn rehearse_command(
    config: &CacesVoteConfig,
    questions_path: &Path,
    test_mode: bool,
    poll_seconds: u64,
) -> Result<()> {
    let questions = load_questions(questions_path)?;
    let client = Arc::new(OmbeaClient::new(&config.hardware)?);
    let coordinator = VotingCoordinator::new(client.clone(), config.session.clone());

    if test_mode {
        println!("🧪 Test mode: responses are simulated");
        coordinator.set_test_mode(true).await;
    } else if !coordinator.connect().await {
        let error = coordinator.connection().await.connection_error;
        coordinator.dispose().await;
        bail!(
            "OMBEA hardware not ready: {}",
            error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    let total = questions.len();
    for (index, question) in questions.into_iter().enumerate() {
        println!();
        println!("❓ Question {}/{}: {}", index + 1, total, question.text);

        if index == 0 {
            if !coordinator.start_exam_session(question).await {
                report_poll_error(&coordinator).await;
                break;
            }
        } else {
            coordinator.set_current_exam_question(question).await;
        }

        if !coordinator.open_poll_for_current_question().await {
            report_poll_error(&coordinator).await;
            continue;
        }
        println!("🗳️  Voting open for {}s", poll_seconds);
        tokio::time::sleep(Duration::from_secs(poll_seconds)).await;

        // An auto-closing countdown may already have closed the poll
        if coordinator.voting_session().await.is_polling_active_for_question
            && !coordinator.close_poll_for_current_question().await
        {
            report_poll_error(&coordinator).await;
        }

        if let Some(results) = coordinator.poll_results().await {
            print_results(&results);
        }
    }

    coordinator.end_exam_session().await;
    coordinator.dispose().await;
    client.metrics().log_stats();
    println!();
    println!("🏁 Rehearsal finished");
    Ok(())
}

async fn report_poll_error(coordinator: &VotingCoordinator) {
    if let Some(error) = coordinator.voting_session().await.poll_error {
        println!("⚠️  {}", error);
    }
}

fn print_results(results: &PollResults) {
    println!(
        "📊 {} vote(s) from {} known device(s)",
        results.total_votes, results.participants
    );
    for option in &results.options {
        let marker = if option.is_correct { " ✅" } else { "" };
        println!("  {}. {}: {}{}", option.letter, option.label, option.votes, marker);
    }
    if let Some(correct) = results.correct_votes {
        println!("🎯 Correct answers: {}", correct);
    }
}

fn config_command(config: &CacesVoteConfig, write: Option<&Path>) -> Result<()> {
    match write {
        Some(path) => {
            config.save_to_file(path)?;
            println!("💾 Configuration written to {}", path.display());
        }
        None => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}
