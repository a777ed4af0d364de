use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::SourceError;

/// Run `program args..` inside `root` and return its stdout.
pub fn execute(root: &Path, program: &str, args: &[&str]) -> Result<String, SourceError> {
    let command = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(%command, root = %root.display(), "running");

    let output = Command::new(program)
        .args(args)
        .current_dir(root)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| SourceError::Command {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => output.status.to_string(),
            msg => msg.to_string(),
        };
        return Err(SourceError::Command { command, reason });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Whether `program args..` runs and exits successfully inside `root`.
pub fn success(root: &Path, program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_a_source_error() {
        let err = execute(Path::new("."), "definitely-not-a-real-tool-1234", &["--version"]).unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-real-tool-1234 --version"));
        assert!(!success(Path::new("."), "definitely-not-a-real-tool-1234", &[]));
    }
}
