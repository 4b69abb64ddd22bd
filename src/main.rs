//! Promptlab CLI
//!
//! Compare two coach prompt templates on Gemini, side by side.

use clap::Parser;
use promptlab::commands::{parse_command, LabCommand, HELP};
use promptlab::config::{config_home, LabConfig};
use promptlab::lab::view::{self, ActionItemsReveal};
use promptlab::tui::App;
use promptlab::{ChatProvider, GeminiClient, Lab};
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Promptlab - A/B test coach prompt templates on Gemini
#[derive(Parser, Debug)]
#[command(name = "promptlab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable TUI and read commands from stdin
    #[arg(long)]
    no_tui: bool,

    /// Verbose output: debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log file for TUI mode
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.no_tui {
        run_plain_mode(cli).await
    } else {
        run_tui_mode(cli).await
    }
}

async fn run_tui_mode(cli: Cli) -> anyhow::Result<()> {
    // Logs go to a file so they don't tear up the screen
    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| config_home().join("promptlab.log"));
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new().create(true).append(true).open(&log_path)?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    info!("Starting Promptlab (TUI), logging to {}", log_path.display());

    let config = LabConfig::load(cli.config.as_deref())?;
    let client = GeminiClient::new(&config);
    let lab = Lab::from_config(&config);

    let mut app = App::new(lab, client, config.model.clone(), config.config_file.clone())?;
    app.run().await?;

    Ok(())
}

async fn run_plain_mode(cli: Cli) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    info!("Starting Promptlab (plain mode)");

    let config = LabConfig::load(cli.config.as_deref())?;
    let client = GeminiClient::new(&config);
    let mut lab = Lab::from_config(&config);

    // Read stdin on a blocking thread
    let (line_tx, mut line_rx) = mpsc::channel::<String>(32);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    let mut stdout = io::stdout();
    writeln!(stdout, "Prompt A/B Lab ({}). Type /help for commands.", config.model)?;
    stdout.flush()?;

    while let Some(line) = line_rx.recv().await {
        let Some(cmd) = parse_command(&line) else {
            continue;
        };
        if !execute(&mut lab, &client, cmd, &mut stdout).await? {
            break;
        }
        stdout.flush()?;
    }

    Ok(())
}

/// Run one plain-mode command. Returns `false` when the user asked to quit.
///
/// Model errors are printed and the loop goes on; only write failures
/// bubble up.
async fn execute<P: ChatProvider, W: Write>(
    lab: &mut Lab,
    provider: &P,
    cmd: LabCommand,
    out: &mut W,
) -> io::Result<bool> {
    match cmd {
        LabCommand::Send(target, message) => {
            let ids = target.variants();
            for id in &ids {
                match lab.send(*id, &message, provider).await {
                    Ok(()) => writeln!(out, "[{id}] {}", lab.variant(*id).last_reply)?,
                    Err(e) => writeln!(out, "[{id}] error: {e}")?,
                }
            }
            if ids.len() > 1 {
                write!(out, "{}", view::comparison(lab).to_text())?;
            }
        }
        LabCommand::Items(id) => {
            writeln!(out, "{}", ActionItemsReveal::of(lab.variant(id)).text())?;
        }
        LabCommand::History(id) => {
            let entries = view::transcript(lab.variant(id));
            if entries.is_empty() {
                writeln!(out, "({id} has no messages yet)")?;
            }
            for entry in entries {
                writeln!(out, "{}: {}", entry.role.label(), entry.text)?;
            }
        }
        LabCommand::Compare => write!(out, "{}", view::comparison(lab).to_text())?,
        LabCommand::Name(name) => {
            lab.user.name = name;
            writeln!(out, "name = {}", lab.user.name)?;
        }
        LabCommand::Minutes(minutes) => {
            lab.user.set_session_minutes(minutes);
            writeln!(out, "session minutes = {}", lab.user.session_minutes())?;
        }
        LabCommand::Summaries(summaries) => {
            lab.user.summaries = summaries;
            writeln!(out, "summaries updated")?;
        }
        LabCommand::Template(id, template) => {
            lab.set_template(id, template);
            writeln!(out, "{id} template updated")?;
        }
        LabCommand::ShowTemplate(id) => writeln!(out, "{}", lab.variant(id).template)?,
        LabCommand::Reset => {
            lab.reset();
            writeln!(out, "session discarded")?;
        }
        LabCommand::Help => writeln!(out, "{HELP}")?,
        LabCommand::Quit => return Ok(false),
        LabCommand::Invalid(hint) => writeln!(out, "{hint}")?,
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptlab::{ChatReply, LabConfig, LabError, Turn};

    struct Echo;

    impl ChatProvider for Echo {
        async fn send_message(
            &self,
            _system_instruction: &str,
            history: &[Turn],
            message: &str,
        ) -> promptlab::Result<ChatReply> {
            if message == "fail" {
                return Err(LabError::Network("connection refused".into()));
            }
            let text = format!(
                "<response>echo {message}</response><actionitems>do {message}</actionitems>"
            );
            Ok(ChatReply::new(history, message, text))
        }
    }

    fn run(lab: &mut Lab, line: &str) -> (bool, String) {
        let mut out = Vec::new();
        let cmd = parse_command(line).unwrap();
        let keep_going = tokio_test::block_on(execute(lab, &Echo, cmd, &mut out)).unwrap();
        (keep_going, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_send_both_prints_comparison() {
        let mut lab = Lab::from_config(&LabConfig::default());
        let (keep_going, out) = run(&mut lab, "both hi");
        assert!(keep_going);
        assert!(out.contains("[Prompt-A] echo hi"));
        assert!(out.contains("[Prompt-B] echo hi"));
        assert!(out.contains("## Action Items comparison"));
    }

    #[test]
    fn test_send_error_is_printed() {
        let mut lab = Lab::from_config(&LabConfig::default());
        let (keep_going, out) = run(&mut lab, "a fail");
        assert!(keep_going);
        assert!(out.contains("[Prompt-A] error:"));
        assert!(lab.history(promptlab::VariantId::A).is_empty());
    }

    #[test]
    fn test_items_and_quit() {
        let mut lab = Lab::from_config(&LabConfig::default());
        let (_, out) = run(&mut lab, "/items b");
        assert_eq!(out.trim(), "No action items found in the latest response.");
        run(&mut lab, "b stretch");
        let (_, out) = run(&mut lab, "/items b");
        assert_eq!(out.trim(), "do stretch");
        let (keep_going, _) = run(&mut lab, "/quit");
        assert!(!keep_going);
    }

    #[test]
    fn test_minutes_are_clamped() {
        let mut lab = Lab::from_config(&LabConfig::default());
        let (_, out) = run(&mut lab, "/minutes 999");
        assert_eq!(out.trim(), "session minutes = 120");
    }
}
