use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parley_agents::{CannedFallback, ConciergeAgent};
use parley_core::{ChatInput, RuleSet};
use parley_observability::{init_tracing, AppMetrics};
use parley_rules::{load_rules, LoadedRules, RULES_PATH_ENV};
use parley_storage::MemoryStore;

#[derive(Debug, Parser)]
#[command(name = "parley")]
#[command(about = "Bilingual intent matcher CLI")]
struct Cli {
    /// Rule source; the well-known locations are tried when omitted.
    #[arg(long, env = RULES_PATH_ENV)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Match {
        text: String,
        #[arg(long)]
        lang: Option<String>,
    },
    Chat {
        #[arg(long)]
        lang: Option<String>,
    },
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Debug, Subcommand)]
enum RulesCommand {
    List,
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("parley_cli");
    let cli = Cli::parse();

    let LoadedRules { path, rules } =
        load_rules(cli.rules.as_deref()).context("failed to load intent rules")?;

    match cli.command {
        Command::Match { text, lang } => {
            let hit = rules.match_utterance(&text, lang.as_deref());
            println!("{}", serde_json::to_string_pretty(&hit)?);
        }
        Command::Chat { lang } => run_chat(rules, lang).await?,
        Command::Rules { command } => match command {
            RulesCommand::List => {
                for rule in rules.rules() {
                    let languages = rule
                        .responses
                        .languages()
                        .iter()
                        .map(|language| language.as_code())
                        .collect::<Vec<_>>()
                        .join(",");
                    println!(
                        "{}\t{} patterns\t[{}]",
                        rule.intent_id,
                        rule.patterns.len(),
                        languages
                    );
                }
            }
            RulesCommand::Check => {
                println!("source:   {}", path.display());
                println!("rules:    {}", rules.len());
                println!("patterns: {}", rules.pattern_count());
                println!("skipped:  {}", rules.skipped_patterns());
            }
        },
    }

    Ok(())
}

async fn run_chat(rules: RuleSet, language: Option<String>) -> Result<()> {
    let agent = ConciergeAgent::new(
        Arc::new(rules),
        Arc::new(CannedFallback),
        Arc::new(MemoryStore::new()),
        AppMetrics::shared(),
    );
    let mut session_id: Option<String> = None;

    println!("Parley chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = agent
            .handle_chat(ChatInput {
                session_id: session_id.clone(),
                text: message.to_string(),
                language: language.clone(),
                user_id: None,
            })
            .await?;

        session_id = Some(reply.session_id.clone());

        println!("\n{}\n", reply.reply_text);
        if let Some(follow_up) = reply.follow_up {
            println!("(follow-up: {follow_up:?})\n");
        }
    }

    Ok(())
}
