use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{error, info};

use fulfillsla::cli::{parse_args, print_help};
use fulfillsla::{Config, FulfillmentEstimator};

fn main() -> Result<()> {
    let args = parse_args();

    if args.help {
        print_help();
        return Ok(());
    }

    // Initialize logging; stdout is reserved for the result
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fulfillsla=info".parse()?),
        )
        .init();

    info!("fulfillsla v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Cutoffs: {:?}", config.cutoffs.entries());
    info!("  Workdays: {:?}", config.workdays.entries());
    info!("  UTC offset: {}h ({:?} hour conversion)", config.offset.as_hours(), config.hour_conversion);

    // Handle --validate mode
    if args.validate {
        info!("Validating configuration...");
        match config.validate() {
            Ok(()) => {
                info!("Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    let (Some(channel), Some(location)) = (args.channel.as_deref(), args.location.as_deref()) else {
        print_help();
        bail!("--channel and --location are required");
    };
    let ordered_at = args.ordered_at(Utc::now())?;

    let estimator = FulfillmentEstimator::new(config);
    let estimate = match estimator.estimate_detailed(channel, location, ordered_at) {
        Ok(estimate) => estimate,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    info!(
        "Order at {} {} the {}:00 cutoff, fulfillment on {}",
        estimate.ordered_at,
        if estimate.made_cutoff { "made" } else { "missed" },
        estimate.cutoff_hour,
        estimate.business_date
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        println!("{}", estimate.utc_string());
    }

    Ok(())
}
