//! Interactive terminal front end.
//!
//! Reads one command per line and forwards it to [`crate::commands`].

use anyhow::Context;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::commands;
use crate::models::{Conversation, Message, Role};
use crate::state::AppState;

const HELP: &str = "\
Commands:
  list                          list conversations
  new                           start a new conversation
  open <id>                     switch to a conversation
  say <text>                    send a message
  attach <image|video> <url> <text>
                                send a message with media
  rename <id> <title>           rename a conversation
  delete <id>                   delete a conversation
  show                          print the current conversation
  sidebar                       toggle the conversation list
  help                          show this text
  quit                          exit";

#[derive(Debug, PartialEq, Eq)]
pub enum ShellCommand {
    List,
    New,
    Open(String),
    Say(String),
    Attach {
        media_type: String,
        media: String,
        text: String,
    },
    Rename { id: String, title: String },
    Delete(String),
    Show,
    Sidebar,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let need = |arg: &str, usage: &str| -> Result<String, String> {
        if arg.is_empty() {
            Err(format!("usage: {}", usage))
        } else {
            Ok(arg.to_string())
        }
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "list" | "ls" => ShellCommand::List,
        "new" => ShellCommand::New,
        "open" => ShellCommand::Open(need(rest, "open <id>")?),
        "say" => ShellCommand::Say(need(rest, "say <text>")?),
        "attach" => {
            let mut parts = rest.splitn(3, char::is_whitespace);
            let usage = "attach <image|video> <url> <text>";
            let media_type = need(parts.next().unwrap_or(""), usage)?;
            let media = need(parts.next().unwrap_or(""), usage)?;
            let text = parts.next().unwrap_or("").trim().to_string();
            ShellCommand::Attach {
                media_type,
                media,
                text,
            }
        }
        "rename" => {
            let usage = "rename <id> <title>";
            let (id, title) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("usage: {}", usage))?;
            ShellCommand::Rename {
                id: id.to_string(),
                title: need(title.trim(), usage)?,
            }
        }
        "delete" | "rm" => ShellCommand::Delete(need(rest, "delete <id>")?),
        "show" => ShellCommand::Show,
        "sidebar" => ShellCommand::Sidebar,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "/quit" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(Some(command))
}

/// Runs the read-eval-print loop until `quit` or end of input.
pub async fn run_shell(state: AppState) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new().context("Failed to initialize line editor")?;

    println!("{}", "sophia".bold().green());
    println!("Type {} for commands, {} to exit.\n", "help".yellow(), "quit".yellow());
    print_conversations(&state).await;

    let prompt = format!("{}> ", "sophia".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match parse_command(&line) {
                    Ok(Some(ShellCommand::Quit)) => break,
                    Ok(Some(command)) => {
                        if let Err(e) = execute(&state, command).await {
                            eprintln!("{} {}", "error:".red().bold(), e);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(anyhow::Error::from(e).context("Failed to read input")),
        }
    }

    log::info!("Shell exited");
    Ok(())
}

async fn execute(state: &AppState, command: ShellCommand) -> Result<(), String> {
    match command {
        ShellCommand::List => print_conversations(state).await,
        ShellCommand::New => {
            let id = commands::create_conversation(state).await?;
            println!("Started conversation {}", id.as_str().cyan());
        }
        ShellCommand::Open(id) => {
            commands::select_conversation(state, &id).await?;
            print_current(state).await;
        }
        ShellCommand::Say(text) => {
            let message = commands::send_message(state, text, None, None).await?;
            print_message(&message);
        }
        ShellCommand::Attach {
            media_type,
            media,
            text,
        } => {
            let message =
                commands::send_message(state, text, Some(media), Some(media_type)).await?;
            print_message(&message);
        }
        ShellCommand::Rename { id, title } => {
            commands::rename_conversation(state, &id, title).await?;
            println!("Renamed.");
        }
        ShellCommand::Delete(id) => {
            commands::delete_conversation(state, &id).await?;
            println!("Deleted.");
        }
        ShellCommand::Show => print_current(state).await,
        ShellCommand::Sidebar => {
            if commands::toggle_sidebar(state).await {
                print_conversations(state).await;
            } else {
                println!("Conversation list hidden.");
            }
        }
        ShellCommand::Help => println!("{}", HELP),
        ShellCommand::Quit => {}
    }
    Ok(())
}

async fn print_conversations(state: &AppState) {
    let current = commands::current_conversation(state).await.map(|c| c.id);
    let conversations = commands::list_conversations(state).await;
    if conversations.is_empty() {
        println!("No conversations. Type {} to start one.", "new".yellow());
        return;
    }
    for conv in &conversations {
        println!("{}", conversation_line(conv, current.as_deref() == Some(conv.id.as_str())));
    }
}

fn conversation_line(conv: &Conversation, is_current: bool) -> String {
    let marker = if is_current { "*" } else { " " };
    format!(
        "{} {}  {} ({} messages)",
        marker,
        conv.id.as_str().dimmed(),
        conv.title.as_str().bold(),
        conv.messages.len()
    )
}

async fn print_current(state: &AppState) {
    match commands::current_conversation(state).await {
        Some(conv) => {
            println!("{}", conv.title.as_str().bold().underline());
            for message in &conv.messages {
                print_message(message);
            }
        }
        None => println!("No conversation selected."),
    }
}

fn print_message(message: &Message) {
    let who = match message.role {
        Role::User => "you".blue().bold(),
        Role::Assistant => "assistant".magenta().bold(),
    };
    println!("{}: {}", who, message.content);
    if let Some(attachment) = &message.attachment {
        println!("    [{:?}] {}", attachment.media_type, attachment.media.as_str().underline());
    }
}
