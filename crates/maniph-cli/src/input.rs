use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Resolve the body text for a description or comment: a literal argument,
/// a path to a file, or an editor session when nothing was supplied. With a
/// template the editor always opens, pre-filled with the template content.
pub fn text_from_arg_or_fs_or_editor(
    arg: Option<&str>,
    template: Option<&Path>,
) -> Result<String> {
    if let Some(template) = template {
        let seed = fs::read_to_string(template)
            .with_context(|| format!("Template file {} does not exist", template.display()))?;
        return edit_text(&seed);
    }
    match arg {
        Some(value) => {
            let path = Path::new(value);
            if path.is_file() {
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))
            } else {
                Ok(value.to_string())
            }
        }
        None => edit_text(""),
    }
}

fn edit_text(seed: &str) -> Result<String> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let file = tempfile::Builder::new()
        .prefix("maniph-")
        .suffix(".md")
        .tempfile()
        .context("Failed to create a temporary file for the editor")?;
    fs::write(file.path(), seed)?;
    let status = Command::new(&editor)
        .arg(file.path())
        .status()
        .with_context(|| format!("Failed to launch editor {editor}"))?;
    if !status.success() {
        bail!("Editor {editor} exited with {status}");
    }
    Ok(fs::read_to_string(file.path())?.trim_end().to_string())
}
