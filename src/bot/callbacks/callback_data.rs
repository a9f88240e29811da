//! Inline-button payloads.
//!
//! Each button carries one [`CallbackAction`] encoded as `tag[:arg...]`, for
//! example `dict_training:12:1:2`. Decoding is strict: the tag must be known,
//! the argument count must match the variant and every argument must parse.

use std::fmt;

use teloxide::types::InlineKeyboardButton;
use tracing::warn;

/// Telegram rejects callback data longer than this many bytes
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;

const SEPARATOR: char = ':';

/// Every action an inline button can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    ListDicts,
    SelectDictionary {
        dict_id: i64,
    },
    DictContents {
        dict_id: i64,
        offset: i64,
        count: i64,
        src_lang_id: i64,
        dst_lang_id: i64,
    },
    DeleteDictionaryRequest {
        dict_id: i64,
    },
    DictDeleteConfirm {
        dict_id: i64,
    },
    DictTraining {
        dict_id: i64,
        src_lang_id: i64,
        dst_lang_id: i64,
    },
    DictTrainingPhrase {
        dict_id: i64,
        phrase_id: i64,
        dst_lang_id: i64,
        is_guessed: bool,
    },
    TrainingDone {
        dict_id: i64,
    },
    /// Placeholder button that does nothing
    Noop,
}

/// Why a payload could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackDecodeError {
    Empty,
    UnknownHandler {
        tag: String,
    },
    WrongArity {
        tag: &'static str,
        expected: usize,
        found: usize,
    },
    InvalidArgument {
        tag: &'static str,
        position: usize,
        value: String,
    },
}

impl fmt::Display for CallbackDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackDecodeError::Empty => write!(f, "empty callback data"),
            CallbackDecodeError::UnknownHandler { tag } => {
                write!(f, "unknown callback handler '{}'", tag)
            }
            CallbackDecodeError::WrongArity {
                tag,
                expected,
                found,
            } => write!(
                f,
                "callback '{}' expects {} arguments, got {}",
                tag, expected, found
            ),
            CallbackDecodeError::InvalidArgument {
                tag,
                position,
                value,
            } => write!(
                f,
                "callback '{}' has invalid argument #{}: '{}'",
                tag, position, value
            ),
        }
    }
}

impl std::error::Error for CallbackDecodeError {}

impl CallbackAction {
    /// Handler tag, the first payload segment
    pub fn tag(&self) -> &'static str {
        match self {
            CallbackAction::ListDicts => "list_dicts",
            CallbackAction::SelectDictionary { .. } => "select_dictionary",
            CallbackAction::DictContents { .. } => "dict_contents",
            CallbackAction::DeleteDictionaryRequest { .. } => "delete_dictionary_request",
            CallbackAction::DictDeleteConfirm { .. } => "dict_delete_confirm",
            CallbackAction::DictTraining { .. } => "dict_training",
            CallbackAction::DictTrainingPhrase { .. } => "dict_training_phrase",
            CallbackAction::TrainingDone { .. } => "training_done",
            CallbackAction::Noop => "noop",
        }
    }

    fn args(&self) -> Vec<i64> {
        match *self {
            CallbackAction::ListDicts | CallbackAction::Noop => Vec::new(),
            CallbackAction::SelectDictionary { dict_id }
            | CallbackAction::DeleteDictionaryRequest { dict_id }
            | CallbackAction::DictDeleteConfirm { dict_id }
            | CallbackAction::TrainingDone { dict_id } => vec![dict_id],
            CallbackAction::DictContents {
                dict_id,
                offset,
                count,
                src_lang_id,
                dst_lang_id,
            } => vec![dict_id, offset, count, src_lang_id, dst_lang_id],
            CallbackAction::DictTraining {
                dict_id,
                src_lang_id,
                dst_lang_id,
            } => vec![dict_id, src_lang_id, dst_lang_id],
            CallbackAction::DictTrainingPhrase {
                dict_id,
                phrase_id,
                dst_lang_id,
                is_guessed,
            } => vec![dict_id, phrase_id, dst_lang_id, i64::from(is_guessed)],
        }
    }

    /// Serialize to `tag[:arg...]`
    pub fn encode(&self) -> String {
        let mut data = self.tag().to_string();
        for arg in self.args() {
            data.push(SEPARATOR);
            data.push_str(&arg.to_string());
        }
        data
    }

    /// Parse a payload produced by [`CallbackAction::encode`]
    pub fn decode(data: &str) -> Result<Self, CallbackDecodeError> {
        let data = data.trim();
        if data.is_empty() {
            return Err(CallbackDecodeError::Empty);
        }

        let mut parts = data.split(SEPARATOR);
        let tag = parts.next().unwrap_or_default();
        let raw: Vec<&str> = parts.collect();

        let action = match tag {
            "list_dicts" => {
                parse_args::<0>("list_dicts", &raw)?;
                CallbackAction::ListDicts
            }
            "select_dictionary" => {
                let [dict_id] = parse_args::<1>("select_dictionary", &raw)?;
                CallbackAction::SelectDictionary { dict_id }
            }
            "dict_contents" => {
                const TAG: &str = "dict_contents";
                let [dict_id, offset, count, src_lang_id, dst_lang_id] = parse_args::<5>(TAG, &raw)?;
                if offset < 0 {
                    return Err(invalid_argument(TAG, &raw, 1));
                }
                if count <= 0 {
                    return Err(invalid_argument(TAG, &raw, 2));
                }
                CallbackAction::DictContents {
                    dict_id,
                    offset,
                    count,
                    src_lang_id,
                    dst_lang_id,
                }
            }
            "delete_dictionary_request" => {
                let [dict_id] = parse_args::<1>("delete_dictionary_request", &raw)?;
                CallbackAction::DeleteDictionaryRequest { dict_id }
            }
            "dict_delete_confirm" => {
                let [dict_id] = parse_args::<1>("dict_delete_confirm", &raw)?;
                CallbackAction::DictDeleteConfirm { dict_id }
            }
            "dict_training" => {
                let [dict_id, src_lang_id, dst_lang_id] = parse_args::<3>("dict_training", &raw)?;
                CallbackAction::DictTraining {
                    dict_id,
                    src_lang_id,
                    dst_lang_id,
                }
            }
            "dict_training_phrase" => {
                const TAG: &str = "dict_training_phrase";
                let [dict_id, phrase_id, dst_lang_id, flag] = parse_args::<4>(TAG, &raw)?;
                let is_guessed = match flag {
                    0 => false,
                    1 => true,
                    _ => return Err(invalid_argument(TAG, &raw, 3)),
                };
                CallbackAction::DictTrainingPhrase {
                    dict_id,
                    phrase_id,
                    dst_lang_id,
                    is_guessed,
                }
            }
            "training_done" => {
                let [dict_id] = parse_args::<1>("training_done", &raw)?;
                CallbackAction::TrainingDone { dict_id }
            }
            "noop" => {
                parse_args::<0>("noop", &raw)?;
                CallbackAction::Noop
            }
            other => {
                return Err(CallbackDecodeError::UnknownHandler {
                    tag: other.to_string(),
                })
            }
        };

        Ok(action)
    }

    /// Whether the encoded payload is accepted by Telegram
    pub fn fits_payload_limit(&self) -> bool {
        self.encode().len() <= MAX_CALLBACK_DATA_BYTES
    }

    /// Inline button triggering this action
    pub fn button(&self, label: impl Into<String>) -> InlineKeyboardButton {
        if !self.fits_payload_limit() {
            warn!(action = ?self, "Callback data exceeds Telegram limit");
        }
        InlineKeyboardButton::callback(label, self.encode())
    }
}

fn invalid_argument(tag: &'static str, raw: &[&str], position: usize) -> CallbackDecodeError {
    CallbackDecodeError::InvalidArgument {
        tag,
        position,
        value: raw[position].to_string(),
    }
}

/// Exactly `N` integer arguments
fn parse_args<const N: usize>(tag: &'static str, raw: &[&str]) -> Result<[i64; N], CallbackDecodeError> {
    if raw.len() != N {
        return Err(CallbackDecodeError::WrongArity {
            tag,
            expected: N,
            found: raw.len(),
        });
    }

    let mut args = [0i64; N];
    for (position, (slot, value)) in args.iter_mut().zip(raw).enumerate() {
        *slot = value
            .parse()
            .map_err(|_| invalid_argument(tag, raw, position))?;
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_format() {
        assert_eq!(CallbackAction::ListDicts.encode(), "list_dicts");
        assert_eq!(
            CallbackAction::DictTraining {
                dict_id: 12,
                src_lang_id: 1,
                dst_lang_id: 2
            }
            .encode(),
            "dict_training:12:1:2"
        );
        assert_eq!(
            CallbackAction::DictTrainingPhrase {
                dict_id: 1,
                phrase_id: 5,
                dst_lang_id: 2,
                is_guessed: true
            }
            .encode(),
            "dict_training_phrase:1:5:2:1"
        );
    }

    #[test]
    fn test_decode_rejects_bad_flags_and_ranges() {
        assert_eq!(
            CallbackAction::decode("dict_training_phrase:1:5:2:2"),
            Err(CallbackDecodeError::InvalidArgument {
                tag: "dict_training_phrase",
                position: 3,
                value: "2".to_string()
            })
        );
        assert!(matches!(
            CallbackAction::decode("dict_contents:1:-5:20:1:2"),
            Err(CallbackDecodeError::InvalidArgument { position: 1, .. })
        ));
        assert!(matches!(
            CallbackAction::decode("dict_contents:1:0:0:1:2"),
            Err(CallbackDecodeError::InvalidArgument { position: 2, .. })
        ));
    }

    #[test]
    fn test_decode_checks_arity_per_tag() {
        assert_eq!(
            CallbackAction::decode("noop:1"),
            Err(CallbackDecodeError::WrongArity {
                tag: "noop",
                expected: 0,
                found: 1
            })
        );
        assert_eq!(
            CallbackAction::decode("training_done:x"),
            Err(CallbackDecodeError::InvalidArgument {
                tag: "training_done",
                position: 0,
                value: "x".to_string()
            })
        );
        assert_eq!(
            CallbackAction::decode("unknown:1"),
            Err(CallbackDecodeError::UnknownHandler {
                tag: "unknown".to_string()
            })
        );
        assert_eq!(CallbackAction::decode("noop"), Ok(CallbackAction::Noop));
    }

    #[test]
    fn test_largest_ids_fit_payload_limit() {
        let action = CallbackAction::DictContents {
            dict_id: i64::MAX,
            offset: i64::MAX,
            count: i64::MAX,
            src_lang_id: 1,
            dst_lang_id: 2,
        };
        assert!(!action.fits_payload_limit());
        assert!(CallbackAction::DictTrainingPhrase {
            dict_id: 1_000_000,
            phrase_id: 1_000_000_000,
            dst_lang_id: 2,
            is_guessed: false
        }
        .fits_payload_limit());
    }

    #[test]
    fn test_button_carries_encoded_payload() {
        let button = CallbackAction::SelectDictionary { dict_id: 3 }.button("Animals");
        assert_eq!(button.text, "Animals");
        match button.kind {
            teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => {
                assert_eq!(data, "select_dictionary:3")
            }
            other => panic!("unexpected button kind: {:?}", other),
        }
    }
}
