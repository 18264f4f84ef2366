//! Keyoku Demo CLI
//!
//! Memory chat, stateful agents and the service's management panels from a
//! terminal.

use clap::{Parser, Subcommand};
use keyoku_demo::agent::{all_scenarios, find_scenario, Scenario};
use keyoku_demo::commands::{help_text, parse_command, ParsedCommand, ReplCommand};
use keyoku_demo::display::format::{
    render_agents, render_audit_logs, render_cleanup_result, render_cleanup_suggestions,
    render_clear_status, render_entities, render_export_status, render_listing,
    render_memories, render_relationships, render_scenarios, render_stats,
};
use keyoku_demo::display::StatePanels;
use keyoku_demo::extraction::{
    ensure_extraction_schema, remove_preset_schemas, run_extraction, ExtractionPreset,
    EXTRACTION_WAIT,
};
use keyoku_demo::session::StatefulTurn;
use keyoku_demo::{AgentId, DemoSession, KeyokuChatbot, Panel, Settings, TransitionMode};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LIST_LIMIT: usize = 20;

/// Keyoku Demo - memory chat and stateful agents
#[derive(Parser, Debug)]
#[command(name = "keyoku-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output: debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the Keyoku base URL
    #[arg(long, global = true)]
    keyoku_url: Option<String>,

    /// Override the chat model
    #[arg(long, global = true)]
    model: Option<String>,

    /// Reuse a session id instead of generating one
    #[arg(long, global = true)]
    session: Option<String>,

    /// How the service treats invalid state transitions
    #[arg(long, global = true, value_enum)]
    transition_mode: Option<TransitionMode>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with persistent memory (default)
    Chat,
    /// Chat with a stateful agent
    Stateful {
        /// Agent to start with
        #[arg(long)]
        agent: Option<AgentId>,
        /// Play a scenario before handing over to the prompt
        #[arg(long)]
        scenario: Option<String>,
    },
    /// Memory statistics
    Stats,
    /// List stored memories
    Memories {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// List knowledge graph entities
    Entities {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// List knowledge graph relationships
    Relationships {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Show the audit log
    Audit {
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Show cleanup suggestions, or run one strategy
    Cleanup {
        /// Strategy to execute
        #[arg(long)]
        execute: Option<String>,
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Start a data export job
    Export,
    /// Delete all memories
    Clear,
    /// List the stateful agents
    Agents,
    /// List the demo scenarios
    Scenarios,
    /// Validate configuration
    CheckConfig,
    /// Run text through a custom extraction schema
    ExtractDemo {
        /// Schema preset: feedback or mental-health
        #[arg(long, default_value = "feedback")]
        preset: ExtractionPreset,
        /// Text to extract from; the preset's samples are used when omitted
        #[arg(long)]
        text: Option<String>,
        /// Delete the preset schemas afterwards
        #[arg(long)]
        cleanup: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = load_settings(&cli)?;
    let command = cli.command.unwrap_or(Command::Chat);

    match command {
        Command::Agents => {
            println!("{}", render_agents(None));
            return Ok(());
        }
        Command::Scenarios => {
            println!("{}", render_scenarios(all_scenarios()));
            return Ok(());
        }
        Command::CheckConfig => return check_config(&settings),
        _ => {}
    }

    settings.ensure_valid()?;

    match command {
        Command::Chat => run_repl(&settings, None, None).await,
        Command::Stateful { agent, scenario } => {
            let scenario = scenario.as_deref().map(find_scenario).transpose()?;
            let agent = agent
                .or_else(|| scenario.map(|s| s.agent))
                .unwrap_or(AgentId::Sales);
            run_repl(&settings, Some(agent), scenario).await
        }
        Command::ExtractDemo {
            preset,
            text,
            cleanup,
        } => extract_demo(&settings, preset, text, cleanup).await,
        other => run_panel_command(&settings, other).await,
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Config file and environment, then command-line overrides.
fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(url) = &cli.keyoku_url {
        settings = settings.with_keyoku_base_url(url);
    }
    if let Some(model) = &cli.model {
        settings = settings.with_llm_model(model);
    }
    if let Some(session) = &cli.session {
        settings = settings.with_session_id(session);
    }
    if let Some(mode) = cli.transition_mode {
        settings = settings.with_transition_mode(mode);
    }
    Ok(settings)
}

fn check_config(settings: &Settings) -> anyhow::Result<()> {
    println!("Keyoku URL:      {}", settings.keyoku_base_url);
    println!("LLM URL:         {}", settings.llm_base_url);
    println!("Model:           {}", settings.llm_model);
    println!("Agent ID:        {}", settings.agent_id);
    println!("Transition mode: {}", settings.transition_mode.as_str());

    let errors = settings.validate();
    if errors.is_empty() {
        println!("✅ Configuration OK");
        return Ok(());
    }
    for e in &errors {
        println!("❌ {e}");
    }
    anyhow::bail!("{} configuration error(s)", errors.len())
}

/// One-shot panel commands that only need the memory chatbot.
async fn run_panel_command(settings: &Settings, command: Command) -> anyhow::Result<()> {
    let bot = KeyokuChatbot::new(settings)?;

    let text = match command {
        Command::Stats => render_stats(&bot.stats().await),
        Command::Memories { limit } => render_listing(&bot.memories(limit).await, render_memories),
        Command::Entities { limit } => render_listing(&bot.entities(limit).await, render_entities),
        Command::Relationships { limit } => {
            render_listing(&bot.relationships(limit).await, render_relationships)
        }
        Command::Audit { limit } => render_listing(&bot.audit_logs(limit).await, render_audit_logs),
        Command::Cleanup {
            execute: Some(strategy),
            dry_run,
            limit,
        } => render_cleanup_result(&bot.execute_cleanup(&strategy, limit, dry_run).await, dry_run),
        Command::Cleanup { execute: None, .. } => {
            render_cleanup_suggestions(&bot.cleanup_suggestions().await)
        }
        Command::Export => render_export_status(&bot.export_data().await),
        Command::Clear => {
            if !confirm("Delete ALL memories? [y/N] ")? {
                println!("Cancelled.");
                return Ok(());
            }
            render_clear_status(&bot.clear_all_memories().await)
        }
        other => anyhow::bail!("not a panel command: {other:?}"),
    };
    println!("{text}");
    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn extract_demo(
    settings: &Settings,
    preset: ExtractionPreset,
    text: Option<String>,
    cleanup: bool,
) -> anyhow::Result<()> {
    let bot = KeyokuChatbot::new(settings)?;
    let schema_id = ensure_extraction_schema(bot.client(), preset).await?;
    println!("Schema '{}': {}", preset.schema_name(), schema_id);

    let inputs: Vec<String> = match text {
        Some(text) => vec![text],
        None => preset.samples().iter().map(|s| s.to_string()).collect(),
    };

    for (i, input) in inputs.iter().enumerate() {
        println!("\n{}. {}", i + 1, keyoku_demo::agent::preview(input, 60));
        match run_extraction(&bot, &schema_id, input, EXTRACTION_WAIT).await {
            Ok(output) => println!("{}", output.render()),
            Err(e) if e.is_timeout() => println!("   Job timed out"),
            Err(e) => println!("   Error: {e}"),
        }
    }

    match bot.client().list_extractions(&schema_id, 10).await {
        Ok(list) => println!("\nSchema has {} extraction(s)", list.total),
        Err(e) => error!("Error listing extractions: {}", e),
    }

    if cleanup {
        let removed = remove_preset_schemas(bot.client()).await?;
        println!("Removed {removed} demo schema(s)");
    }
    Ok(())
}

/// Forward stdin lines into a channel from a blocking thread.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>(32);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn prompt(label: &str) {
    print!("{label}> ");
    let _ = io::stdout().flush();
}

async fn run_repl(
    settings: &Settings,
    agent: Option<AgentId>,
    scenario: Option<&'static Scenario>,
) -> anyhow::Result<()> {
    let mut session = DemoSession::start(settings, agent).await?;
    match session.stateful() {
        Some(bot) => info!(
            "Stateful session {} with {} (transitions: {})",
            bot.session_id(),
            bot.agent().name(),
            bot.transition_mode().as_str()
        ),
        None => info!("Memory session {}", session.memory().session_id()),
    }
    println!("Type /help for commands, /quit to exit.");

    if let Some(scenario) = scenario {
        play_scenario(&mut session, scenario).await;
    }

    let mut lines = spawn_stdin_reader();
    loop {
        let stateful = session.stateful().map(|bot| bot.agent());
        prompt(stateful.map_or("you", |agent| agent.as_str()));
        let Some(line) = lines.recv().await else {
            break;
        };

        match parse_command(&line) {
            None if stateful.is_some() => {
                if let Some(turn) = stateful_turn(&mut session, &line).await {
                    print_turn(&turn);
                }
            }
            None => {
                if let Some(reply) = session.memory_turn(&line).await {
                    println!("assistant: {reply}");
                }
            }
            Some(ParsedCommand::Unknown(name)) => {
                let close: Vec<String> = ReplCommand::matches(&name)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                if close.is_empty() {
                    println!("Unknown command /{name}. Type /help for commands.");
                } else {
                    println!("Unknown command /{name}. Did you mean {}?", close.join(", "));
                }
            }
            Some(ParsedCommand::Command(ReplCommand::Quit, _)) => break,
            Some(ParsedCommand::Command(cmd, args)) if !args.is_empty() && !cmd.takes_args() => {
                println!("{cmd} takes no arguments.");
            }
            Some(ParsedCommand::Command(cmd, _)) if cmd.is_stateful_only() && stateful.is_none() => {
                println!("{cmd} is only available in stateful mode.");
            }
            Some(ParsedCommand::Command(cmd, args)) => {
                run_command(&mut session, cmd, &args).await;
            }
        }
    }
    Ok(())
}

/// Show the reply as soon as it exists, then extract.
async fn stateful_turn(session: &mut DemoSession, line: &str) -> Option<StatefulTurn> {
    let reply = match session.stateful_reply(line).await {
        Ok(reply) => reply?,
        Err(e) => {
            println!("❌ {e}");
            return None;
        }
    };
    println!("assistant: {}", reply.text());
    let extraction = session.stateful_extract(line, &reply).await;
    Some(StatefulTurn { reply, extraction })
}

fn print_turn(turn: &StatefulTurn) {
    if let Some(extraction) = &turn.extraction {
        println!("[state] {}", extraction.replace('\n', "\n        "));
    }
}

async fn play_scenario(session: &mut DemoSession, scenario: &Scenario) {
    let kind = if scenario.is_multi_agent() {
        "multi-agent"
    } else {
        scenario.agent.name()
    };
    println!("▶ {} ({kind}) - {}", scenario.name, scenario.description);
    for step in scenario.steps {
        println!("[{}] user: {}", step.agent, step.message);
        match session.scenario_step(step).await {
            Ok(Some(turn)) => {
                println!("assistant: {}", turn.reply.text());
                print_turn(&turn);
            }
            Ok(None) => {}
            Err(e) => {
                println!("❌ {e}");
                break;
            }
        }
    }
}

fn print_panels(panels: &StatePanels) {
    for panel in Panel::all() {
        println!("── {} ──\n{}", panel.key(), panels.get(*panel));
    }
}

fn or_error(result: keyoku_demo::Result<String>) -> String {
    result.unwrap_or_else(|e| format!("❌ {e}"))
}

async fn run_command(session: &mut DemoSession, cmd: ReplCommand, args: &str) {
    let current = session.stateful().map(|bot| bot.agent());
    let text = match cmd {
        ReplCommand::Help => help_text(current.is_some()),
        ReplCommand::Refresh => match session.force_refresh().await {
            Ok(panels) => {
                print_panels(&panels);
                return;
            }
            Err(e) => format!("❌ {e}"),
        },
        ReplCommand::State => or_error(session.panel(Panel::CurrentState).await),
        ReplCommand::History => or_error(session.panel(Panel::StateHistory).await),
        ReplCommand::States => or_error(session.panel(Panel::AllStates).await),
        ReplCommand::Schema => or_error(session.panel(Panel::SchemaInfo).await),
        ReplCommand::Agent if args.is_empty() => render_agents(current),
        ReplCommand::Agent => or_error(session.switch_agent(args).await.map(|()| {
            session
                .stateful()
                .map(|bot| bot.agent_info())
                .map_or_else(String::new, |info| {
                    format!("Switched to {} ({})", info.name, info.schema_name)
                })
        })),
        ReplCommand::Agents => render_agents(current),
        ReplCommand::Scenario if args.is_empty() => render_scenarios(all_scenarios()),
        ReplCommand::Scenario => match find_scenario(args) {
            Ok(scenario) => {
                play_scenario(session, scenario).await;
                return;
            }
            Err(e) => format!("❌ {e}"),
        },
        ReplCommand::New => or_error(session.new_session().await.map(|id| format!("New session: {id}"))),
        ReplCommand::NewChat => {
            let dropped = session.new_chat();
            format!("Chat cleared ({dropped} message(s) dropped).")
        }
        ReplCommand::Memories => render_listing(
            &session.memory().memories(DEFAULT_LIST_LIMIT).await,
            render_memories,
        ),
        ReplCommand::Graph => {
            let entities = session.memory().entities(DEFAULT_LIST_LIMIT).await;
            let relationships = session.memory().relationships(DEFAULT_LIST_LIMIT).await;
            format!(
                "{}\n\n{}",
                render_listing(&entities, render_entities),
                render_listing(&relationships, render_relationships)
            )
        }
        ReplCommand::Stats => render_stats(&session.memory().stats().await),
        ReplCommand::Cleanup => render_cleanup_suggestions(&session.memory().cleanup_suggestions().await),
        ReplCommand::Export => render_export_status(&session.memory().export_data().await),
        ReplCommand::Clear => render_clear_status(&session.memory().clear_all_memories().await),
        ReplCommand::Quit => return,
    };
    println!("{text}");
}
