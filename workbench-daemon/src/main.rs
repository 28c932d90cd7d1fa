use anyhow::{Context, Result};

fn main() -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    workbench_daemon::start_blocking(&home)?;
    Ok(())
}
