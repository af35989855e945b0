//! Slash command parsing for the chat application.
//!
//! Input starting with `/` is either a client-side command handled here or,
//! when unrecognized, a raw command path forwarded to the gateway as a
//! streaming request (the server hosts its own command endpoints).

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Upload a local file for use as conversation context.
    Upload(String),

    /// Set a standing instruction, then stream the server's take on it.
    Instruct(String),

    /// Dump the server-side session state.
    SessionDump,

    /// Restore the server-side session state.
    SessionRestore,

    /// Merge the server-side session state.
    SessionMerge,

    /// Forward an unrecognized slash command to the gateway verbatim.
    Passthrough(String),

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input starts with `/`, or `None` if it
/// should be sent as a regular prompt.
///
/// # Examples
///
/// ```
/// # use parley::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input.splitn(2, ' ');
    let command = parts.next()?;
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command {
        "/upload" => match argument {
            Some(path) => ChatCommand::Upload(path.to_string()),
            None => ChatCommand::Invalid("/upload requires a file path".to_string()),
        },
        "/instruct" => match argument {
            Some(text) => ChatCommand::Instruct(text.to_string()),
            None => ChatCommand::Invalid("/instruct requires an instruction".to_string()),
        },
        "/session/dump" => ChatCommand::SessionDump,
        "/session/restore" => ChatCommand::SessionRestore,
        "/session/merge" => ChatCommand::SessionMerge,
        "/help" | "/?" => ChatCommand::Help,
        "/quit" | "/exit" | "/q" => ChatCommand::Quit,
        // Anything else is a server-side command path; the whole line,
        // arguments included, becomes the request path.
        _ => ChatCommand::Passthrough(input.to_string()),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /upload <path>         Upload a file for use as conversation context
  /instruct <text>       Set a standing instruction for the assistant
  /session/dump          Dump server-side session state
  /session/restore       Restore server-side session state
  /session/merge         Merge server-side session state
  /help                  Show this help message
  /quit                  Exit the chat

Any other /command is forwarded to the server as a streaming request."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_upload() {
        assert_eq!(
            parse_command("/upload notes.txt"),
            Some(ChatCommand::Upload("notes.txt".to_string()))
        );
        assert_eq!(
            parse_command("/upload   ./docs/notes.md  "),
            Some(ChatCommand::Upload("./docs/notes.md".to_string()))
        );
        assert_eq!(
            parse_command("/upload"),
            Some(ChatCommand::Invalid(
                "/upload requires a file path".to_string()
            ))
        );
    }

    #[test]
    fn parse_instruct() {
        assert_eq!(
            parse_command("/instruct answer in French"),
            Some(ChatCommand::Instruct("answer in French".to_string()))
        );
        assert!(matches!(
            parse_command("/instruct"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_session_ops() {
        assert_eq!(parse_command("/session/dump"), Some(ChatCommand::SessionDump));
        assert_eq!(
            parse_command("/session/restore"),
            Some(ChatCommand::SessionRestore)
        );
        assert_eq!(
            parse_command("/session/merge"),
            Some(ChatCommand::SessionMerge)
        );
    }

    #[test]
    fn unknown_commands_pass_through() {
        assert_eq!(
            parse_command("/summarize"),
            Some(ChatCommand::Passthrough("/summarize".to_string()))
        );
        assert_eq!(
            parse_command("/translate something"),
            Some(ChatCommand::Passthrough("/translate something".to_string()))
        );
    }

    #[test]
    fn passthrough_keeps_arguments() {
        assert_eq!(
            parse_command("  /lookup term of art  "),
            Some(ChatCommand::Passthrough("/lookup term of art".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/upload"));
        assert!(help.contains("/instruct"));
        assert!(help.contains("/quit"));
    }
}
