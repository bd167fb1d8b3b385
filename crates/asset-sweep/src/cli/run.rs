use asset_sweep_lib::util::{create_spinner, format_bytes, format_duration};
use asset_sweep_lib::{CleanupRun, Config, RenderFormat, Result, RunSummary};
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::{style, Term};
use dialoguer::Confirm;
use std::path::PathBuf;
use std::time::Duration;

pub struct RunArgs {
    pub root: Option<PathBuf>,
    pub dry_run: bool,
    pub execute: bool,
    pub yes: bool,
    pub show_log: bool,
    pub html: bool,
    pub json: bool,
    pub quiet: bool,
}

pub fn handle_run_command(mut config: Config, args: RunArgs) -> Result<()> {
    if let Some(root) = args.root {
        config.project_root = Some(root);
    }
    if args.execute {
        config.dry_run = false;
    } else if args.dry_run {
        config.dry_run = true;
    }

    config.validate()?;
    let root = config.root()?.to_path_buf();

    if !config.dry_run && !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Move unreferenced files under {} into {}?",
                root.display(),
                config.trash_dir()?.display()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{} Aborted, nothing was moved", style("!").yellow());
            return Ok(());
        }
    }

    let store = super::open_store(&config)?;
    let dry_run = config.dry_run;
    let show_progress = !args.quiet && !config.verbose && !args.json && Term::stderr().is_term();

    if !args.quiet && !args.json {
        println!(
            "{} {} {}...",
            style(">>>").cyan(),
            if dry_run { "Scanning (dry run)" } else { "Scanning and staging" },
            style(root.display()).bold()
        );
    }

    let mut run = CleanupRun::new(config, &store)?;
    if show_progress {
        let spinner = create_spinner("");
        spinner.enable_steady_tick(Duration::from_millis(120));
        run = run.with_progress(spinner);
    }

    let format = if args.html { RenderFormat::Html } else { RenderFormat::Text };

    match run.execute() {
        Ok(summary) => {
            if args.show_log {
                print!("{}", run.render_log(format));
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if !args.quiet {
                print_summary(&summary);
            }
            Ok(())
        }
        Err(e) => {
            if args.show_log {
                print!("{}", run.render_log(format));
            }
            if let Some(path) = run.log().path() {
                eprintln!("{} Partial audit log: {}", style("!").yellow(), path.display());
            }
            Err(e)
        }
    }
}

fn print_summary(summary: &RunSummary) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Outcome").fg(Color::Cyan),
        Cell::new("Count").fg(Color::Cyan),
    ]);

    let rows: [(&str, usize); 10] = [
        ("Directories scanned", summary.directories_scanned),
        ("Directories skipped (ignored path)", summary.directories_skipped),
        ("Files scanned", summary.files_scanned),
        ("Hidden files skipped", summary.files_ignored_hidden),
        ("Ignored extensions", summary.files_ignored_extension),
        ("Referenced", summary.files_referenced),
        ("Orphans found", summary.orphans_found),
        ("Orphans staged", summary.orphans_staged),
        ("Staging failures", summary.stage_failures),
        ("Symbolic links skipped", summary.symlinks_skipped),
    ];
    for (label, count) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(count)]);
    }
    if summary.unreadable_entries > 0 {
        table.add_row(vec![
            Cell::new("Unreadable directories").fg(Color::Yellow),
            Cell::new(summary.unreadable_entries).fg(Color::Yellow),
        ]);
    }

    println!("{}", table);

    if !summary.orphans.is_empty() {
        println!("\n{}", style("Orphans").bold());
        for orphan in summary.orphans.iter().take(20) {
            println!("  {}", orphan);
        }
        if summary.orphans.len() > 20 {
            println!("  ... and {} more", summary.orphans.len() - 20);
        }
    }

    if let Some(dir) = &summary.staging_dir {
        println!(
            "\n{} Staged {} ({}) into {}",
            style("✓").green(),
            summary.orphans_staged,
            format_bytes(summary.bytes_staged),
            dir.display()
        );
    } else if summary.orphans_found > 0 {
        println!(
            "\n{} Dry run: nothing was moved. Re-run with --execute to stage orphans.",
            style("Tip:").cyan()
        );
    }

    if let (Some(start), Some(end)) = (summary.started_at, summary.finished_at) {
        let elapsed = (end - start).to_std().unwrap_or_default();
        println!("  Took {}", format_duration(elapsed));
    }
    if let Some(path) = &summary.log_path {
        println!("  Audit log: {}", path.display());
    }
}
