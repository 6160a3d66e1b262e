//! `aifmt set` and `aifmt settoken`: configuration writes.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use aifmt_core::config;

/// Arguments for `aifmt set`.
#[derive(Args, Debug)]
pub struct SetArgs {
    /// One of: api_key, max_retry, comments_language, channels, model, endpoint.
    pub key: String,

    /// New value. An empty string clears `model` and `endpoint`.
    pub value: String,
}

impl SetArgs {
    pub fn run(self) -> Result<()> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        config::set_value_at(&home, &self.key, &self.value)
            .with_context(|| format!("failed to set '{}'", self.key))?;

        let shown = if self.key == "api_key" {
            "<hidden>".to_string()
        } else {
            format!("'{}'", self.value)
        };
        println!("{} {} = {}", "set".green(), self.key.bold(), shown);
        Ok(())
    }
}

/// Prompt for the token on stdin and store it as `api_key`.
pub fn run_set_token() -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;

    print!("Enter your OpenRouter API token: ");
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read token")?;
    let token = line.trim();
    if token.is_empty() {
        bail!("token cannot be empty");
    }

    config::set_value_at(&home, "api_key", token).context("failed to save token")?;
    println!("{}", "token saved".green());
    Ok(())
}
