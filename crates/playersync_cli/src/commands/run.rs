//! Run command implementation.

use super::console::Shell;

/// Invokes each registered command in `names`, stopping at the first
/// unknown or failing one.
pub async fn run(shell: &Shell, names: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    for name in names {
        shell.backend().registry.invoke(name).await?;
    }
    Ok(())
}
