use anyhow::{bail, Context, Result};
use std::process::Command;

use crate::matches::Match;

/// Split the editor command line and append `+LINE FILE`.
pub fn editor_argv(editor: &str, m: &Match) -> Result<Vec<String>> {
    let mut argv = shlex::split(editor)
        .filter(|argv| !argv.is_empty())
        .with_context(|| format!("Cannot parse editor command: {editor:?}"))?;
    argv.push(format!("+{}", m.line_num));
    argv.push(m.filename.clone());
    Ok(argv)
}

/// Open `m` in the editor and wait for it to exit.
pub fn open_in_editor(editor: &str, m: &Match) -> Result<()> {
    let argv = editor_argv(editor, m)?;
    crate::debug_log!("[gj] exec {}", argv.join(" "));
    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .with_context(|| format!("Failed to launch editor {}", argv[0]))?;
    if !status.success() {
        bail!("{} exited with {status}", argv[0]);
    }
    Ok(())
}
