// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The interactive chat shell.
//!
//! Signs the user in (creating an account on first run), then drives a
//! readline REPL. Plain input is sent to the active chat and the reply is
//! streamed to stdout as it arrives; slash commands manage sessions,
//! settings, images, and speech.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use astra_auth::AuthGate;
use astra_chat::{AudioSink, ChatManager, SendOptions, TtsController};
use astra_config::model::AstraConfig;
use astra_core::{
    AspectRatio, AstraError, ChatGateway, ChatId, MessageContent, MessageRole, Personality, User,
};
use astra_gemini::GeminiGateway;
use astra_store::SqliteStore;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

enum ShellFlow {
    Continue,
    Quit,
}

/// Runs the interactive shell until the user quits.
pub async fn run_shell(config: AstraConfig) -> Result<(), AstraError> {
    let store = Arc::new(SqliteStore::from_config(&config.storage).await?);
    let auth = AuthGate::new(store.clone());

    let mut rl = DefaultEditor::new()
        .map_err(|e| AstraError::Unknown(format!("failed to initialize readline: {e}")))?;

    let user = match auth.current_user().await? {
        Some(user) => {
            println!("{}", format!("welcome back, {}", user.name).dimmed());
            user
        }
        None => sign_in_flow(&auth, &mut rl).await?,
    };

    let gateway = Arc::new(GeminiGateway::from_config(&config.api).inspect_err(|_| {
        eprintln!(
            "error: Gemini API key required. Set ASTRA_API_KEY or api.api_key in the config file."
        );
    })?);
    let manager = Arc::new(
        ChatManager::new(gateway.clone(), store.clone(), user.id.clone()).await?,
    );
    let speech_sink = Arc::new(WavFileSink::new(
        std::env::temp_dir().join("astra-speech.wav"),
    ));
    let tts = TtsController::new(gateway.clone(), speech_sink.clone());

    println!("{}", "astra shell".bold().green());
    println!(
        "Type {} for commands, {} to exit.\n",
        "/help".yellow(),
        "/quit".yellow()
    );

    let prompt = format!("{}> ", "astra".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if let Some(command) = trimmed.strip_prefix('/') {
                    match handle_command(command, &manager, &auth, gateway.as_ref(), &tts, &speech_sink)
                        .await
                    {
                        Ok(ShellFlow::Continue) => {}
                        Ok(ShellFlow::Quit) => break,
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    }
                } else if let Err(e) = stream_reply(&manager, trimmed).await {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    store.close().await?;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// Prompts for credentials, signing in or creating an account.
async fn sign_in_flow(auth: &AuthGate, rl: &mut DefaultEditor) -> Result<User, AstraError> {
    println!("{}", "sign in".bold());
    loop {
        let email = rl.readline("email: ").map_err(readline_error)?;
        let email = email.trim().to_string();
        if email.is_empty() {
            continue;
        }
        let password = rpassword::prompt_password("password: ")
            .map_err(|e| AstraError::Unknown(format!("failed to read password: {e}")))?;

        match auth.sign_in(&email, &password).await {
            Ok(user) => {
                println!("{}", format!("signed in as {}", user.name).dimmed());
                return Ok(user);
            }
            Err(AstraError::InvalidCredentials(_)) => {
                let answer = rl
                    .readline(&format!("no matching sign-in; create an account for {email}? [y/N] "))
                    .map_err(readline_error)?;
                if answer.trim().eq_ignore_ascii_case("y") {
                    let name = rl.readline("name: ").map_err(readline_error)?;
                    let user = auth.sign_up(name.trim(), &email, &password).await?;
                    println!("{}", format!("account created for {}", user.email).dimmed());
                    return Ok(user);
                }
                eprintln!("{}", "invalid credentials".red());
            }
            Err(error) => return Err(error),
        }
    }
}

fn readline_error(error: ReadlineError) -> AstraError {
    AstraError::Unknown(format!("input aborted: {error}"))
}

/// Sends `text` to the active chat and prints the reply as it streams.
async fn stream_reply(manager: &Arc<ChatManager>, text: &str) -> Result<(), AstraError> {
    let mut revisions = manager.subscribe();
    let chat_id = manager.active_id().await;

    let mut send = {
        let manager = manager.clone();
        let text = text.to_string();
        tokio::spawn(async move { manager.send_message(&text, SendOptions::default()).await })
    };

    let mut printed = 0usize;
    let result = loop {
        tokio::select! {
            joined = &mut send => {
                break joined
                    .map_err(|e| AstraError::Unknown(format!("send task failed: {e}")))?;
            }
            changed = revisions.changed() => {
                if changed.is_ok() {
                    print_streamed_suffix(manager, &chat_id, &mut printed).await;
                }
            }
        }
    };

    print_streamed_suffix(manager, &chat_id, &mut printed).await;
    println!();
    print_epilogue(manager, &chat_id).await;
    result
}

/// Prints whatever streamed text has arrived since the last call.
async fn print_streamed_suffix(manager: &ChatManager, chat_id: &ChatId, printed: &mut usize) {
    let sessions = manager.sessions().await;
    let Some(session) = sessions.iter().find(|s| s.id == *chat_id) else {
        return;
    };
    let Some(last) = session.messages.last() else {
        return;
    };
    if last.role != MessageRole::Assistant {
        return;
    }
    if let Some(text) = last.content.as_text() {
        // Finalization strips suggestion tags, shifting byte offsets. A
        // cursor saved before the strip can land mid-character, so slice
        // checked and wait for the next revision instead of panicking.
        if text.len() > *printed {
            if let Some(suffix) = text.get(*printed..) {
                print!("{suffix}");
                let _ = std::io::stdout().flush();
                *printed = text.len();
            }
        }
    }
}

/// After the reply lands: inline errors, suggestions, and citations.
async fn print_epilogue(manager: &ChatManager, chat_id: &ChatId) {
    let sessions = manager.sessions().await;
    let Some(session) = sessions.iter().find(|s| s.id == *chat_id) else {
        return;
    };
    let Some(last) = session.messages.last() else {
        return;
    };
    match (&last.role, &last.content) {
        (MessageRole::Error, MessageContent::Error { text }) => {
            eprintln!("{}", text.red());
        }
        (MessageRole::Assistant, _) => {
            if let Some(suggestions) = &last.suggestions {
                for suggestion in suggestions {
                    println!("{}", format!("  > {suggestion}").yellow().dimmed());
                }
            }
            if let Some(citations) = &last.citations {
                for citation in citations {
                    println!("{}", format!("  [{}] {}", citation.title, citation.uri).dimmed());
                }
            }
        }
        _ => {}
    }
}

async fn handle_command(
    command: &str,
    manager: &Arc<ChatManager>,
    auth: &AuthGate,
    gateway: &dyn ChatGateway,
    tts: &TtsController,
    speech_sink: &WavFileSink,
) -> Result<ShellFlow, AstraError> {
    let mut parts = command.splitn(2, ' ');
    let name = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or("").trim();

    match name {
        "quit" | "exit" => return Ok(ShellFlow::Quit),
        "help" => print_help(),
        "new" => {
            manager.create_session().await?;
            println!("{}", "new chat started".dimmed());
        }
        "list" => {
            let active = manager.active_id().await;
            for (index, session) in manager.sorted_sessions().await.iter().enumerate() {
                let marker = if session.id == active { ">" } else { " " };
                let pin = if session.pinned { "*" } else { " " };
                println!(
                    "{marker}{pin} {index}: {} ({} messages)",
                    session.title,
                    session.messages.len()
                );
            }
        }
        "switch" => {
            let id = session_at(manager, rest).await?;
            manager.select_session(&id).await?;
            println!("{}", "switched".dimmed());
        }
        "delete" => {
            let id = if rest.is_empty() {
                manager.active_id().await
            } else {
                session_at(manager, rest).await?
            };
            manager.delete_session(&id).await?;
            println!("{}", "chat deleted".dimmed());
        }
        "rename" => {
            if rest.is_empty() {
                return Err(AstraError::Unknown("usage: /rename <title>".into()));
            }
            let id = manager.active_id().await;
            manager.rename_session(&id, rest).await?;
        }
        "pin" => {
            let id = if rest.is_empty() {
                manager.active_id().await
            } else {
                session_at(manager, rest).await?
            };
            manager.toggle_pin(&id).await?;
        }
        "personality" => {
            let personality: Personality = rest
                .parse()
                .map_err(|_| AstraError::Unknown(format!("unknown personality: {rest}")))?;
            let id = manager.active_id().await;
            manager.set_personality(&id, personality).await?;
            println!("{}", format!("personality set to {personality}").dimmed());
        }
        "search" => {
            let enabled = match rest {
                "on" => true,
                "off" => false,
                _ => return Err(AstraError::Unknown("usage: /search on|off".into())),
            };
            let id = manager.active_id().await;
            manager.set_use_search(&id, enabled).await?;
        }
        "image" => {
            if rest.is_empty() {
                return Err(AstraError::Unknown("usage: /image <prompt>".into()));
            }
            println!("{}", "generating image...".dimmed());
            // Modal flow: failures surface here and never touch the chat log.
            match gateway.generate_image(rest, AspectRatio::Square).await {
                Ok(image_url) => {
                    manager.add_image(image_url, rest.to_string()).await?;
                    println!("{}", "image added to the chat".dimmed());
                }
                Err(error) => eprintln!("{}", error.user_message().red()),
            }
        }
        "speak" => {
            let session = manager.active_session().await;
            let Some(message) = session
                .messages
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::Assistant && m.content.as_text().is_some())
            else {
                return Err(AstraError::Unknown("nothing to read aloud yet".into()));
            };
            let text = message.content.as_text().unwrap_or_default().to_string();
            tts.start(&text, &message.id).await;
            if let Some(path) = speech_sink.last_written() {
                println!("{}", format!("speech written to {}", path.display()).dimmed());
                // File output has no runtime; playback ends immediately.
                tts.on_playback_ended();
            }
        }
        "clear" => {
            manager.clear_all_sessions().await?;
            println!("{}", "all chats cleared".dimmed());
        }
        "signout" => {
            auth.sign_out().await?;
            println!("{}", "signed out".dimmed());
            return Ok(ShellFlow::Quit);
        }
        other => {
            debug!(command = other, "unknown shell command");
            return Err(AstraError::Unknown(format!(
                "unknown command: /{other} (try /help)"
            )));
        }
    }
    Ok(ShellFlow::Continue)
}

/// Resolves a `/list` index to a session id.
async fn session_at(manager: &ChatManager, index: &str) -> Result<ChatId, AstraError> {
    let index: usize = index
        .parse()
        .map_err(|_| AstraError::Unknown(format!("not a chat number: {index}")))?;
    manager
        .sorted_sessions()
        .await
        .get(index)
        .map(|session| session.id.clone())
        .ok_or_else(|| AstraError::Unknown(format!("no chat numbered {index}")))
}

fn print_help() {
    println!("  /new                start a new chat");
    println!("  /list               list chats");
    println!("  /switch <n>         make chat n active");
    println!("  /delete [n]         delete a chat (default: active)");
    println!("  /rename <title>     rename the active chat");
    println!("  /pin [n]            toggle pinning");
    println!("  /personality <p>    friendly | professional | humorous");
    println!("  /search on|off      toggle web search grounding");
    println!("  /image <prompt>     generate an image into the chat");
    println!("  /speak              read the last reply aloud (to a WAV file)");
    println!("  /clear              delete all chats");
    println!("  /signout            sign out and quit");
    println!("  /quit               exit");
}

/// Audio sink that writes synthesized speech to a WAV file. The terminal
/// has no audio device, so the file path stands in for playback.
struct WavFileSink {
    path: PathBuf,
    written: Mutex<Option<PathBuf>>,
}

impl WavFileSink {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            written: Mutex::new(None),
        }
    }

    fn last_written(&self) -> Option<PathBuf> {
        self.written.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl AudioSink for WavFileSink {
    fn play(&self, wav: Vec<u8>) -> Result<(), AstraError> {
        std::fs::write(&self.path, wav)
            .map_err(|e| AstraError::Unknown(format!("failed to write speech file: {e}")))?;
        *self.written.lock().unwrap_or_else(|e| e.into_inner()) = Some(self.path.clone());
        Ok(())
    }

    fn pause(&self) {}
    fn resume(&self) {}
    fn stop(&self) {
        *self.written.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
    fn seek(&self, _seconds: f64) {}
}
