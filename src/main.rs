use clap::Parser;
use venue_mapper::app::execute;
use venue_mapper::utils::logger;
use venue_mapper::{ApiKey, CliConfig, MapperError, TomlConfig};

fn init_logging(verbose: bool, json_logs: bool) {
    if json_logs {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }
}

fn fail(context: &str, e: &MapperError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    std::process::exit(e.severity().exit_code());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliConfig::parse();

    let toml_config = match &args.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                init_logging(args.verbose, args.json_logs);
                fail(&format!("Failed to load config file '{}'", path), &e);
            }
        },
        None => None,
    };

    let verbose = args.verbose || toml_config.as_ref().is_some_and(TomlConfig::verbose);
    let json_logs = args.json_logs || toml_config.as_ref().is_some_and(TomlConfig::json_logs);
    init_logging(verbose, json_logs);

    tracing::info!("Starting venue-mapper");
    if verbose {
        tracing::debug!("CLI config: {:?}", args);
    }

    let dry_run = args.dry_run;
    let outcome = match toml_config {
        Some(config) => {
            tracing::info!("📁 Using configuration file settings");
            let api_key = config.api_key();
            execute(config, api_key, dry_run).await
        }
        None => execute(args, ApiKey::from_env(), dry_run).await,
    };

    match outcome {
        Ok(Some(output_path)) => {
            println!("✅ Venue mapping completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Ok(None) => println!("🔍 Dry run finished, no requests were sent"),
        Err(e) => fail("Venue mapping failed", &e),
    }

    Ok(())
}
