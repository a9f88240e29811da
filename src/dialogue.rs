//! Conversation state of a profile.
//!
//! The state is stored on the profile row so it survives restarts. Every
//! inbound message or callback moves the profile to a new state before it is
//! handled: `/create_dict` waits for a dictionary name, anything else resets.

use std::fmt;
use std::str::FromStr;

/// Command that starts the dictionary-name prompt
pub const CREATE_DICT_COMMAND: &str = "/create_dict";

/// Represents the conversation state of a profile
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProfileState {
    #[default]
    WaitNothing,
    /// The next plain text is a dictionary name
    WaitInputCreateDict,
}

impl ProfileState {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileState::WaitNothing => "wait_nothing",
            ProfileState::WaitInputCreateDict => "wait_input__create_dict",
        }
    }

    /// State a profile moves to when it receives `text`
    pub fn after_input(text: &str) -> Self {
        let command = text.split_whitespace().next().unwrap_or_default();
        // Commands may be addressed as /create_dict@botname
        let command = command.split('@').next().unwrap_or_default();
        if command == CREATE_DICT_COMMAND {
            ProfileState::WaitInputCreateDict
        } else {
            ProfileState::WaitNothing
        }
    }
}

impl fmt::Display for ProfileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wait_nothing" => Ok(ProfileState::WaitNothing),
            "wait_input__create_dict" => Ok(ProfileState::WaitInputCreateDict),
            other => Err(format!("Unknown profile state: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_storage_value() {
        for state in [ProfileState::WaitNothing, ProfileState::WaitInputCreateDict] {
            assert_eq!(state.as_str().parse::<ProfileState>(), Ok(state));
        }
        assert!("waiting".parse::<ProfileState>().is_err());
    }

    #[test]
    fn test_after_input() {
        assert_eq!(ProfileState::after_input("/create_dict"), ProfileState::WaitInputCreateDict);
        assert_eq!(
            ProfileState::after_input("/create_dict@dictrainer_bot"),
            ProfileState::WaitInputCreateDict
        );
        assert_eq!(ProfileState::after_input("/list_dicts"), ProfileState::WaitNothing);
        assert_eq!(ProfileState::after_input("Animals"), ProfileState::WaitNothing);
        assert_eq!(ProfileState::after_input(""), ProfileState::WaitNothing);
    }
}
