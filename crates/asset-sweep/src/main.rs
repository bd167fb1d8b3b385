mod cli;

use clap::Parser;
use console::style;

fn main() {
    let cli = cli::Cli::parse();

    let default_filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = cli::load_config(&cli).and_then(|config| match &cli.command {
        cli::Commands::Run {
            root,
            dry_run,
            execute,
            yes,
            show_log,
            html,
            json,
        } => cli::run::handle_run_command(
            config,
            cli::run::RunArgs {
                root: root.clone(),
                dry_run: *dry_run,
                execute: *execute,
                yes: *yes,
                show_log: *show_log,
                html: *html,
                json: *json,
                quiet: cli.quiet,
            },
        ),

        cli::Commands::Schema => cli::schema::handle_schema_command(&config),

        cli::Commands::Check { path } => cli::check::handle_check_command(&config, path),
    });

    if let Err(e) = result {
        eprintln!("{} {}", style("✗").red(), e);
        if let Some(path) = e.log_path() {
            eprintln!("  Audit log: {}", path.display());
        }
        std::process::exit(1);
    }
}
