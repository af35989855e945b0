//! Interactive chat application for a parley gateway.
//!
//! This binary provides a streaming REPL that authenticates with a locally
//! held signing key, keeps the server-side session alive in the background,
//! and renders streamed markdown responses as they arrive.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage against a local gateway
//! parley-chat
//!
//! # Point at another gateway
//! parley-chat --url http://gateway:8000
//!
//! # Use a specific credentials file
//! parley-chat --credentials ~/.config/parley/work.yaml
//!
//! # Disable colors (useful for piping output)
//! parley-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/upload <path>` - Upload a file for conversation context
//! - `/instruct <text>` - Set a standing instruction
//! - `/session/dump`, `/session/restore`, `/session/merge` - Session state ops
//! - `/help` - Show available commands
//! - `/quit` - Exit the application
//!
//! Any other slash command is forwarded to the server as a streaming request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use parley::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use parley::{Credential, CredentialConfig, Error, Parley, keepalive};

fn fatal(err: Error) -> ! {
    eprintln!("{err}");
    std::process::exit(1);
}

/// Main entry point for the parley-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("parley-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    // Credential and connect failures are fatal startup conditions: the
    // client never retries authentication.
    let credential_config = match CredentialConfig::load(config.credentials_path.as_deref()) {
        Ok(credential_config) => credential_config,
        Err(err) => fatal(err),
    };
    let credential = match Credential::load(&credential_config) {
        Ok(credential) => credential,
        Err(err) => fatal(err),
    };
    let client = match Parley::new(config.base_url.clone()) {
        Ok(client) => client,
        Err(err) => fatal(err),
    };
    let connected = match client.connect(&credential, config.persist_history).await {
        Ok(session) => session,
        Err(err) => fatal(err),
    };

    // Daemon-style background task; the handle is deliberately abandoned at
    // exit and the task dies with the process.
    let _keepalive = tokio::spawn(keepalive::run(client.clone()));

    let session = ChatSession::new(client);
    let mut rl = DefaultEditor::new()?;

    // Installing a handler keeps Ctrl+C from killing an in-flight stream;
    // at the prompt, rustyline reports it as ReadlineError::Interrupted.
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!(
        "Connected to {} as {} (session {})",
        session.client().base_url(),
        credential.subject(),
        connected.id
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Upload(path) => match session.upload(&path).await {
                            Ok(()) => renderer.print_info(&format!("Uploaded: {path}")),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Instruct(text) => {
                            println!("Assistant:");
                            if let Err(err) = session.instruct(&text, &mut renderer).await {
                                renderer.print_error(&err.to_string());
                            }
                        }
                        ChatCommand::SessionDump => match session.session_dump().await {
                            Ok(message) => renderer.print_info(&message),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::SessionRestore => match session.session_restore().await {
                            Ok(message) => renderer.print_info(&message),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::SessionMerge => match session.session_merge().await {
                            Ok(message) => renderer.print_info(&message),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Passthrough(path) => {
                            println!("Assistant:");
                            match session.run_command(&path, &mut renderer).await {
                                Ok(decoded) if !decoded.complete => {
                                    renderer.print_info("[stream ended without completion]");
                                }
                                Ok(_) => {}
                                Err(err) => renderer.print_error(&err.to_string()),
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular prompt - stream the response.
                println!("Assistant:");
                match session.send_prompt(line, &mut renderer).await {
                    Ok(decoded) if !decoded.complete => {
                        renderer.print_info("[stream ended without completion]");
                    }
                    Ok(_) => {}
                    Err(err) => renderer.print_error(&err.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}
