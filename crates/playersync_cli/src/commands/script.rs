//! Script command implementation.

use super::console::{Flow, Shell};
use std::path::Path;
use tracing::{debug, warn};

/// Runs the console commands in `path`, echoing each one.
///
/// Stops at the first failing line or at `quit`.
pub async fn run(shell: &Shell, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let script = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read script {}: {e}", path.display()))?;
    debug!(path = %path.display(), "running script");

    run_lines(shell, &script, |text| println!("{text}")).await?;
    Ok(())
}

/// Executes `script` line by line, passing each echoed line and its output
/// to `emit`.
pub async fn run_lines(
    shell: &Shell,
    script: &str,
    mut emit: impl FnMut(&str),
) -> Result<(), String> {
    for (number, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        emit(&format!("> {line}"));
        let output = shell.execute(line).await.map_err(|e| {
            warn!(line = number + 1, error = %e, "script stopped");
            format!("line {}: {e}", number + 1)
        })?;
        for text in &output.lines {
            emit(text);
        }
        if output.flow == Flow::Quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{connect, Options};

    fn shell_for(player: &str) -> Shell {
        Shell::new(connect(Options {
            player: Some(player.into()),
            quiet: true,
            ..Options::default()
        }))
    }

    #[tokio::test]
    async fn runs_until_quit() {
        let shell = shell_for("p1");
        let mut transcript = Vec::new();
        run_lines(&shell, "# setup\nset Coins 5\nquit\nset Coins 6\n", |text| {
            transcript.push(text.to_string())
        })
        .await
        .unwrap();

        assert_eq!(transcript, vec!["> set Coins 5", "Coins = 5 (integer)", "> quit"]);
        assert_eq!(shell.backend().sync.get("Coins", 0i64).await, 5);
    }

    #[tokio::test]
    async fn failing_save_stops_the_script() {
        let shell = shell_for("bad id");
        let mut transcript = Vec::new();
        let err = run_lines(&shell, "set Coins 5\nSave\nset Coins 6\n", |text| {
            transcript.push(text.to_string())
        })
        .await
        .unwrap_err();

        assert!(err.starts_with("line 2:"), "{err}");
        assert_eq!(transcript.last().map(String::as_str), Some("> Save"));
        assert_eq!(shell.backend().sync.get("Coins", 0i64).await, 5);
    }
}
