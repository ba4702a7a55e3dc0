use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use ragsheet_client::{ClientError, RagClient, RenderSink, StreamingChatSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::cli::ChatArgs;
use crate::commands::health::status_line;
use crate::config::CliConfig;
use crate::render::TerminalRenderer;

const PROMPT: &str = "you> ";

/// REPL command parsed from an input line
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Clear,
    Status,
    Help,
    Unknown(&'a str),
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/clear" => Input::Clear,
        "/status" => Input::Status,
        "/help" => Input::Help,
        command if command.starts_with('/') => Input::Unknown(command),
        text => Input::Message(text),
    }
}

pub async fn run(client: &RagClient, config: &CliConfig, args: ChatArgs) -> Result<()> {
    let monitor = client.spawn_health_monitor(config.poll_interval(), CancellationToken::new());
    let session = client.session();
    let renderer = TerminalRenderer::stdout();

    println!(
        "{} connected to {}",
        "ragsheet".bold(),
        client.config().base_url
    );
    println!("{}", "Type /help for commands, Ctrl-C to stop an answer.".dimmed());

    if !args.skip_health_check {
        let mut updates = monitor.subscribe();
        let first = updates
            .wait_for(|status| status.checked_at.is_some())
            .await
            .map(|status| status.clone());
        if let Ok(status) = first {
            println!("{}", status_line(&status));
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", PROMPT.cyan());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => print_help(),
            Input::Status => println!("{}", status_line(&monitor.status())),
            Input::Clear => {
                session.clear()?;
                renderer.reset();
                println!("{}", "Conversation cleared.".dimmed());
            }
            Input::Unknown(command) => {
                println!("Unknown command {command}; type /help for the list.");
            }
            Input::Message(text) => {
                if !args.skip_health_check
                    && let Err(e) = monitor.status().ensure_ready()
                {
                    session.push_notice(e.to_string());
                    renderer.render(&session.conversation());
                    continue;
                }
                send_turn(&session, &renderer, text).await;
            }
        }
    }

    monitor.shutdown().await;
    Ok(())
}

/// Stream one answer; Ctrl-C abandons it and returns to the prompt.
async fn send_turn<W: Write + Send>(
    session: &StreamingChatSession,
    renderer: &TerminalRenderer<W>,
    text: &str,
) {
    let turn = session.send(text, renderer);
    tokio::pin!(turn);

    let finished = tokio::select! {
        result = &mut turn => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let result = match finished {
        Some(result) => result,
        None => {
            session.cancel();
            turn.await
        }
    };

    match result {
        Ok(_) => {}
        Err(ClientError::Cancelled) => renderer.interrupt("[cancelled]"),
        // Already shown in the timeline as a system message.
        Err(e) => tracing::debug!(error = %e, "Turn ended with error"),
    }
}

fn print_help() {
    println!("/status  show server and knowledge base status");
    println!("/clear   start a new conversation");
    println!("/quit    leave the chat");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repl_commands() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/exit\n"), Input::Quit);
        assert_eq!(parse_input("/clear"), Input::Clear);
        assert_eq!(parse_input("/status"), Input::Status);
        assert_eq!(parse_input("/frobnicate"), Input::Unknown("/frobnicate"));
        assert_eq!(
            parse_input("  what were Q1 sales?  "),
            Input::Message("what were Q1 sales?")
        );
    }
}
