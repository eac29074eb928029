//! Fleet launch CLI
//!
//! Usage:
//!   fleet_launch
//!   fleet_launch port:=/dev/ttyACM0 baud:=921600
//!   fleet_launch --dry-run --format yaml

use fleet_launch::{
    fleet_description, resolve_arguments, Executor, ExecutorConfig, FleetOptions, LaunchArgs,
    PlanFormat, ResolvedPlan,
};
use tokio::sync::watch;

fn render_plan(plan: &ResolvedPlan, format: PlanFormat) -> Result<String, String> {
    match format {
        PlanFormat::Text => Ok(plan.to_string()),
        PlanFormat::Yaml => serde_yaml::to_string(plan).map_err(|e| e.to_string()),
        PlanFormat::Json => serde_json::to_string_pretty(plan).map_err(|e| e.to_string()),
    }
}

#[tokio::main]
async fn main() {
    let args: LaunchArgs = argh::from_env();

    let env = env_logger::Env::default().default_filter_or(args.log_filter());
    env_logger::init_from_env(env);

    let description = fleet_description(&FleetOptions {
        foxglove_topics: args.foxglove_topics.clone(),
    });

    if args.list_args {
        for arg in description.declared_arguments() {
            println!(
                "{} (default: '{}'){}",
                arg.name,
                arg.default,
                arg.description
                    .as_ref()
                    .map(|d| format!("\n    {}", d))
                    .unwrap_or_default()
            );
        }
        return;
    }

    let overrides = match args.arg_overrides() {
        Ok(overrides) => overrides,
        Err(e) => {
            log::error!("Failed to read overrides: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = resolve_arguments(description.declared_arguments(), &overrides);
    let plan = match description.resolve(&ctx, &args.node_selection()) {
        Ok(plan) => plan,
        Err(e) => {
            log::error!("Failed to resolve launch plan: {}", e);
            std::process::exit(1);
        }
    };

    if args.dry_run {
        match render_plan(&plan, args.format) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                log::error!("Failed to render launch plan: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let executor_config = ExecutorConfig {
        shutdown_timeout: args.shutdown_timeout(),
        ..Default::default()
    };
    let mut executor = Executor::new(plan, executor_config);

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    {
        let shutdown_tx = shutdown_tx.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            log::info!("Received Ctrl+C, initiating shutdown...");
            let _ = shutdown_tx.send(());
        }) {
            log::error!("Error setting Ctrl+C handler: {}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = executor.launch().await {
        log::error!("Launch failed: {}", e);
        executor.shutdown().await;
        std::process::exit(1);
    }

    executor.wait(shutdown_rx).await;
    executor.shutdown().await;

    log::info!("Fleet launcher exiting");
}
