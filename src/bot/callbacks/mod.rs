//! Callbacks module for handling all inline keyboard callback queries
//!
//! - `callback_data`: typed payloads carried by inline buttons
//! - `callback_handler`: decodes a payload and routes it
//! - `dictionary_callbacks`: dictionary list, detail, contents and deletion
//! - `training_callbacks`: training sessions

pub mod callback_data;
pub mod callback_handler;
pub mod dictionary_callbacks;
pub mod training_callbacks;
