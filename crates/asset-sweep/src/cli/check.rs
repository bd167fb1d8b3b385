use asset_sweep_lib::{Config, ReferenceChecker, Result};
use console::style;

pub fn handle_check_command(config: &Config, path: &str) -> Result<()> {
    let store = super::open_store(config)?;
    let checker = ReferenceChecker::build(&store)?;
    let relative = path.trim_start_matches('/');

    match checker.find_reference(relative)? {
        Some(table) => println!(
            "{} {} is referenced in table {}",
            style("✓").green(),
            style(relative).bold(),
            style(table).cyan()
        ),
        None => println!(
            "{} {} is not referenced by any row",
            style("✗").yellow(),
            style(relative).bold()
        ),
    }

    Ok(())
}
