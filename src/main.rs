use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize;
use swatch::cli::{AppContext, Cli, Commands, TokensCommand};
use swatch::cli_ext::{build_cmd, mutate_cmd, report_cmd, tokens_cmd};
use swatch::core::RegistryError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoUtc;

/// Log filter: -v/-vv, then SWATCH_LOG, then RUST_LOG, then settings
fn init_tracing(ctx: &AppContext) {
    let directive = match ctx.verbose {
        0 => std::env::var("SWATCH_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| ctx.settings.logging.filter.clone()),
        1 => "swatch=info".to_string(),
        _ => "swatch=debug".to_string(),
    };
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("swatch=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!ctx.no_color)
        .with_target(false)
        .with_timer(ChronoUtc::rfc_3339())
        .try_init();
}

fn report(err: anyhow::Error, no_color: bool) -> ExitCode {
    let code = err
        .downcast_ref::<RegistryError>()
        .map_or(1, RegistryError::exit_code);

    match err.downcast::<RegistryError>() {
        Ok(typed) => {
            let _ = miette::set_hook(Box::new(move |_| {
                Box::new(
                    miette::MietteHandlerOpts::new()
                        .color(!no_color)
                        .wrap_lines(false)
                        .build(),
                )
            }));
            eprintln!("{:?}", miette::Report::new(typed));
        }
        Err(other) if no_color => eprintln!("error: {other:#}"),
        Err(other) => eprintln!("{} {other:#}", "error:".red().bold()),
    }

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match swatch::load_settings(Path::new(".")) {
        Ok(s) => s,
        Err(e) => return report(e, cli.no_color),
    };

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        settings,
    };
    init_tracing(&ctx);

    let result = match cli.command {
        Commands::Build(args) => build_cmd::run(args, &ctx),
        Commands::Preview(args) => build_cmd::preview_run(args, &ctx),
        Commands::Mutate(args) => mutate_cmd::run(args, &ctx),
        Commands::Rollback(args) => mutate_cmd::rollback_run(args, &ctx),
        Commands::Tokens(TokensCommand::Export(args)) => tokens_cmd::export_run(args, &ctx),
        Commands::Tokens(TokensCommand::Import(args)) => tokens_cmd::import_run(args, &ctx),
        Commands::Coverage(args) => report_cmd::coverage_run(args, &ctx),
        Commands::List(args) => report_cmd::list_run(args, &ctx),
        Commands::Show(args) => report_cmd::show_run(args, &ctx),
        Commands::Init(args) => swatch::infra::config::init(args, &ctx),
        Commands::Completions(args) => swatch::completion::run(args, &ctx),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e, ctx.no_color),
    }
}
