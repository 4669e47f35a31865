//! Operator prompt on the controlling terminal.

use anyhow::{Context, Result};

use crate::application::ports::Prompt;

/// [`Prompt`] backed by `dialoguer`.
pub struct DialoguerPrompt;

impl Prompt for DialoguerPrompt {
    fn ask(&self, message: &str) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()
            .context("reading confirmation")
    }
}
