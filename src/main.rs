// src/main.rs

use peertube_monitor::{cli, config, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("peertube-monitor error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    // Logging depends on the config, so config errors go straight to stderr.
    let cfg = config::load_and_validate(&args.config)?;
    logging::init_logging(args.log_level, &cfg.logging)?;
    run(&args, cfg).await?;
    Ok(())
}
