//! `pharmabot chat` — Interactive or single-message chat mode.

use crate::ui;
use pharmabot_agent::{PharmacyAssistant, Session, TurnOutcome};
use pharmabot_channels::CliChannel;
use pharmabot_config::AppConfig;
use pharmabot_core::Language;
use pharmabot_core::channel::Channel;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

pub async fn run(
    message: Option<String>,
    language: Option<Language>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    // Check for API key early and give a clear error
    if let Err(e) = config.require_api_key() {
        eprintln!();
        eprintln!("  ERROR: {e}");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export GEMINI_API_KEY=...      (Gemini, the default provider)");
        eprintln!("    export OPENAI_API_KEY=sk-...   (OpenAI)");
        eprintln!("    export PHARMABOT_API_KEY=...   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        eprintln!("  To run against a local Ollama model instead:");
        eprintln!("    export PHARMABOT_PROVIDER=ollama PHARMABOT_MODEL=llama3.2:1b");
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = pharmabot_providers::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;
    let inventory = Arc::new(pharmabot_inventory::cache_from_config(&config.inventory));
    let assistant = PharmacyAssistant::from_config(&config, provider, inventory);

    let mut session = Session::new(language.unwrap_or(config.language));
    debug!(session = %session.id, language = %session.language, "Session started");

    if let Some(msg) = message {
        // Single message mode
        let outcome = respond(&assistant, &mut session, &msg).await?;
        print_outcome(&outcome, session.language);
        return Ok(());
    }

    // Interactive mode
    print_banner(&config, &assistant, session.language);

    let channel = CliChannel::new();
    let mut rx = channel.start().await.map_err(|e| format!("Channel error: {e}"))?;

    prompt(session.language)?;

    while let Some(result) = rx.recv().await {
        let chan_msg = match result {
            Ok(chan_msg) => chan_msg,
            Err(e) => {
                eprintln!("  [Channel Error] {e}");
                break;
            }
        };

        let content = chan_msg.content.trim();
        if let Some(code) = content.strip_prefix("/lang") {
            match code.trim().parse::<Language>() {
                Ok(language) => {
                    session.set_language(language);
                    println!("  {}", ui::text(language).title);
                }
                Err(e) => eprintln!("  {e}"),
            }
        } else if content == "/clear" {
            session.reset();
            assistant.inventory().invalidate().await;
            println!("  {}", ui::text(session.language).prompt);
        } else {
            let outcome = respond(&assistant, &mut session, content).await?;
            print_outcome(&outcome, session.language);
        }

        prompt(session.language)?;
    }

    channel
        .send(&format!("\n  {}\n", ui::text(session.language).goodbye))
        .await?;

    Ok(())
}

/// Run one turn, streaming fragments to stdout as they arrive.
async fn respond(
    assistant: &PharmacyAssistant,
    session: &mut Session,
    message: &str,
) -> Result<TurnOutcome, Box<dyn std::error::Error>> {
    let ui = ui::text(session.language);
    print!("\n  {} > ", ui.assistant);
    std::io::stdout().flush()?;

    let mut streamed_any = false;
    let outcome = assistant
        .respond(session, message, |fragment| {
            streamed_any = true;
            print!("{fragment}");
            let _ = std::io::stdout().flush();
        })
        .await;

    // The fallback reply is never streamed
    if outcome.is_fallback() {
        print!("{}", fallback_text(&outcome.reply, streamed_any));
    }
    println!();
    Ok(outcome)
}

/// The fallback starts on its own line when a partial reply is already shown.
fn fallback_text(reply: &str, after_partial: bool) -> String {
    if after_partial {
        format!("\n  {reply}")
    } else {
        reply.to_string()
    }
}

fn print_outcome(outcome: &TurnOutcome, language: Language) {
    if let Some(e) = &outcome.error {
        eprintln!("  [Error] {e}");
    }

    let cards = ui::product_cards(&outcome.products, language);
    if !cards.is_empty() {
        println!();
        print!("{cards}");
    }
    println!();
}

fn print_banner(config: &AppConfig, assistant: &PharmacyAssistant, language: Language) {
    let ui = ui::text(language);
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║  {:^42}  ║", ui.title);
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", assistant.model());
    println!("  Language:  {language}");
    println!("  Inventory: {}", assistant.inventory().source_name());
    println!();
    println!("  {}", ui.hint);
    println!();
    println!("  {}", ui.prompt);
}

fn prompt(language: Language) -> std::io::Result<()> {
    print!("  {} > ", ui::text(language).you);
    std::io::stdout().flush()
}
