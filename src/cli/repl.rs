use crate::conversation::ConversationController;
use crate::models::chat::{ Message, Sender };
use chrono::Local;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt };

const HELP: &str =
    "Commands: /edit <text> rewrites your last message, /reset clears the chat, /history reprints it, /quit exits.";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Say(String),
    Edit(String),
    Reset,
    History,
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Say(line.to_string());
    };
    let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    match name {
        "edit" => Input::Edit(rest.to_string()),
        "reset" | "clear" => Input::Reset,
        "history" => Input::History,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

fn render(message: &Message) -> String {
    let who = match message.sender {
        Sender::User => "you",
        Sender::Assistant => "assistant",
    };
    format!(
        "[{}] {}: {}\n",
        message.timestamp.with_timezone(&Local).format("%H:%M"),
        who,
        message.text
    )
}

async fn print_history<W: AsyncWrite + Unpin>(
    controller: &ConversationController,
    writer: &mut W
) -> std::io::Result<()> {
    for message in controller.messages() {
        writer.write_all(render(message).as_bytes()).await?;
    }
    Ok(())
}

/// Drives `controller` from line-oriented input until EOF or `/quit`.
pub async fn run_session<R, W>(
    controller: &mut ConversationController,
    reader: R,
    mut writer: W
) -> std::io::Result<()>
    where R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin
{
    let mut lines = reader.lines();
    print_history(controller, &mut writer).await?;
    writer.write_all(format!("{}\n", HELP).as_bytes()).await?;
    writer.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let reply = match parse_input(&line) {
            Input::Say(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                writer.write_all(b"assistant is typing...\n").await?;
                writer.flush().await?;
                controller.submit(&text).await
            }
            Input::Edit(text) => {
                if controller.last_user_index().is_none() {
                    writer.write_all(b"Nothing to edit yet.\n").await?;
                    continue;
                }
                writer.write_all(b"assistant is typing...\n").await?;
                writer.flush().await?;
                controller.edit_last_user_message(&text).await
            }
            Input::Reset => {
                writer.write_all(b"Are you sure you want to clear the chat history? [y/N] ").await?;
                writer.flush().await?;
                let answer = lines.next_line().await?.unwrap_or_default();
                if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                    controller.reset().await;
                    print_history(controller, &mut writer).await?;
                }
                None
            }
            Input::History => {
                print_history(controller, &mut writer).await?;
                None
            }
            Input::Help => {
                writer.write_all(format!("{}\n", HELP).as_bytes()).await?;
                None
            }
            Input::Quit => {
                break;
            }
            Input::Unknown(name) => {
                writer.write_all(format!("Unknown command '/{}'. {}\n", name, HELP).as_bytes()).await?;
                None
            }
        };
        if let Some(message) = reply {
            writer.write_all(render(&message).as_bytes()).await?;
        }
        writer.flush().await?;
    }
    Ok(())
}
