//! Slash commands understood by the bot

use teloxide::utils::command::BotCommands;

use crate::localization::{t_args_lang, t_lang, LocalizationManager};

#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Create new dictionary")]
    CreateDict,
    #[command(description = "View your dictionaries")]
    ListDicts,
    #[command(description = "View your current dictionary")]
    DictDetail,
    #[command(description = "Readme and contacts")]
    Help,
}

impl Command {
    /// Commands listed to the user, with their description keys
    pub const LISTED: [(Command, &'static str, &'static str); 4] = [
        (Command::CreateDict, "/create_dict", "command-create-dict"),
        (Command::ListDicts, "/list_dicts", "command-list-dicts"),
        (Command::DictDetail, "/dict_detail", "command-dict-detail"),
        (Command::Help, "/help", "command-help"),
    ];

    /// Parse a message text addressed to `bot_username`
    pub fn parse_text(text: &str, bot_username: &str) -> Option<Self> {
        Self::parse(text, bot_username).ok()
    }

    /// Metric/log label
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::CreateDict => "create_dict",
            Command::ListDicts => "list_dicts",
            Command::DictDetail => "dict_detail",
            Command::Help => "help",
        }
    }
}

/// `Description: /command` lines in the user's language
pub fn commands_as_text(localization: &LocalizationManager, language_code: Option<&str>) -> String {
    Command::LISTED
        .iter()
        .map(|(_, command, key)| {
            t_args_lang(
                localization,
                "command-line",
                &[
                    ("description", t_lang(localization, key, language_code).as_str()),
                    ("command", *command),
                ],
                language_code,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse_text("/start", "dictrainer_bot"), Some(Command::Start));
        assert_eq!(
            Command::parse_text("/create_dict", "dictrainer_bot"),
            Some(Command::CreateDict)
        );
        assert_eq!(
            Command::parse_text("/list_dicts@dictrainer_bot", "dictrainer_bot"),
            Some(Command::ListDicts)
        );
        assert_eq!(Command::parse_text("/unknown", "dictrainer_bot"), None);
        assert_eq!(Command::parse_text("cat - кот", "dictrainer_bot"), None);
    }

    #[test]
    fn test_listed_commands_match_parser() {
        for (command, text, _) in Command::LISTED {
            assert_eq!(Command::parse_text(text, "dictrainer_bot"), Some(command));
            assert_eq!(format!("/{}", command.name()), text);
        }
    }
}
