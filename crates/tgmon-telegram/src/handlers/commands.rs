use std::sync::Arc;

use teloxide::prelude::*;

use crate::router::AppState;

pub fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn help_text(query: &str) -> String {
    format!(
        "👋 Telegram channel monitor\n\n\
Available commands:\n\
/start - Show this help message\n\
/getmyid - Get your Telegram user ID for configuration\n\
/setquery <text> - Set a new search query for filtering messages\n\
/showquery - Show current search query\n\
/addchannel <name> - Add a channel to monitor\n\
/removechannel <name> - Remove a channel from monitoring\n\
/listmonitored - Show currently monitored channels\n\n\
Current search query: {query}"
    )
}

fn monitored_summary(state: &AppState) -> String {
    match state.channels.list() {
        Ok(list) if list.is_empty() => "(none)".to_string(),
        Ok(list) => list.join(", "),
        Err(e) => format!("(unreadable: {e})"),
    }
}

/// Run a parsed command against the stores and return the reply text.
pub fn execute(cmd: &str, arg: &str, user_id: Option<u64>, state: &AppState) -> String {
    match cmd {
        "start" | "help" => help_text(&state.query.get()),

        "getmyid" => match user_id {
            Some(id) => format!(
                "Your Telegram user ID is: {id}\n\nAdd this to your .env file as:\nUSER_CHAT_ID={id}"
            ),
            None => "Could not determine your user ID.".to_string(),
        },

        "setquery" => {
            if arg.is_empty() {
                return "❌ Please provide a search query after /setquery\n\
Example: /setquery find messages about tech news"
                    .to_string();
            }
            match state.query.set(arg) {
                Ok(()) => {
                    tracing::info!(query = arg, "search query updated");
                    format!(
                        "✅ Search query updated!\n\nNew query: {arg}\n\n\
The monitor will now filter messages based on this query."
                    )
                }
                Err(e) => {
                    tracing::error!("failed to save query: {e}");
                    "❌ Failed to update search query. Please try again.".to_string()
                }
            }
        }

        "showquery" => format!("Current search query:\n{}", state.query.get()),

        "addchannel" => {
            if arg.is_empty() {
                return "❌ Please provide a channel name after /addchannel\n\
Example: /addchannel @channelname or /addchannel channelname"
                    .to_string();
            }
            let name = arg.trim_start_matches('@');
            match state.channels.add(arg) {
                Ok(true) => {
                    tracing::info!(channel = name, "channel added to monitoring");
                    format!(
                        "✅ Channel '{name}' added to monitoring list.\n\n\
Current monitored channels:\n{}\n\nRestart the monitor to apply.",
                        monitored_summary(state)
                    )
                }
                Ok(false) => format!("ℹ️ Channel '{name}' is already being monitored."),
                Err(e) => format!("❌ Failed to update channel list: {e}"),
            }
        }

        "removechannel" => {
            if arg.is_empty() {
                return "❌ Please provide a channel name after /removechannel\n\
Example: /removechannel @channelname or /removechannel channelname"
                    .to_string();
            }
            let name = arg.trim_start_matches('@');
            match state.channels.remove(arg) {
                Ok(true) => {
                    tracing::info!(channel = name, "channel removed from monitoring");
                    format!(
                        "✅ Channel '{name}' removed from monitoring list.\n\n\
Current monitored channels:\n{}\n\nRestart the monitor to apply.",
                        monitored_summary(state)
                    )
                }
                Ok(false) => format!("❌ Channel '{name}' was not in the monitoring list."),
                Err(e) => format!("❌ Failed to update channel list: {e}"),
            }
        }

        "listmonitored" => match state.channels.list() {
            Ok(list) if list.is_empty() => "ℹ️ No channels are currently being monitored.\n\
Use /addchannel to start monitoring a channel."
                .to_string(),
            Ok(list) => {
                let lines: Vec<String> = list.iter().map(|c| format!("- {c}")).collect();
                format!("📺 Currently monitored channels:\n\n{}", lines.join("\n"))
            }
            Err(e) => format!("❌ Failed to read channel list: {e}"),
        },

        other => format!("Unknown command: /{other}\nSend /help to see the available commands."),
    }
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let (cmd, arg) = parse_command(text);
    let user_id = msg.from().map(|u| u.id.0);
    tracing::debug!(command = cmd.as_str(), "bot command");

    let reply = execute(&cmd, &arg, user_id, &state);
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
