use webp_migrator::cli::commands::{CliArgs, Commands, OutputFormatArg};
use webp_migrator::cli::handlers::{
    handle_activate, handle_backup, handle_cleanup, handle_deactivate, handle_install,
    handle_restore, handle_setup_db, handle_status, handle_uninstall, handle_update,
};
use webp_migrator::cli::output::{OutputFormat, OutputFormatter};
use webp_migrator::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("webp-migrator v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let formatter = OutputFormatter::new(match args.format {
        OutputFormatArg::Human => OutputFormat::Human,
        OutputFormatArg::Json => OutputFormat::Json,
    });

    let exit_code = match &args.command {
        Commands::Install(install_args) => handle_install(install_args, &formatter).await,
        Commands::Update(update_args) => handle_update(update_args, &formatter).await,
        Commands::Uninstall(uninstall_args) => handle_uninstall(uninstall_args, &formatter).await,
        Commands::Backup(backup_args) => handle_backup(backup_args, &formatter).await,
        Commands::Restore(restore_args) => handle_restore(restore_args, &formatter).await,
        Commands::Activate(target_args) => handle_activate(target_args, &formatter).await,
        Commands::Deactivate(target_args) => handle_deactivate(target_args, &formatter).await,
        Commands::Status(target_args) => handle_status(target_args, &formatter).await,
        Commands::Cleanup(cleanup_args) => handle_cleanup(cleanup_args, &formatter).await,
        Commands::SetupDb(target_args) => handle_setup_db(target_args, &formatter).await,
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = if let Some(level_str) = &args.log_level {
            parse_level(level_str)
        } else if args.verbose {
            Level::DEBUG
        } else if args.quiet {
            Level::ERROR
        } else {
            let level_str = env::var("WEBP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            parse_level(&level_str)
        };

        let mut filter = EnvFilter::from_default_env();

        if env::var("RUST_LOG").is_err() {
            filter = filter
                .add_directive(format!("webp_migrator={}", level).parse().unwrap())
                .add_directive("bollard=warn".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap());
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}

fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}
