use anyhow::Result;
use clap::Args;
use clap_complete::{Shell, generate};
use std::io::Write;

/// Arguments for `mingle completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the completion script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to `out`.
///
/// # Errors
///
/// Returns an error if flushing `out` fails.
pub fn run_completions(shell: Shell, command: &mut clap::Command, out: &mut dyn Write) -> Result<()> {
    let bin_name = command.get_name().to_string();
    generate(shell, command, bin_name, out);
    out.flush()?;
    Ok(())
}
