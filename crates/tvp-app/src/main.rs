// Trade Value Points batch entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config (copying defaults on first run)
// 3. Load roster, service time, signed contracts, and season stats
// 4. Value every player
// 5. Rank and write JSON/CSV outputs
// 6. Value configured trade packages

use tvp_core::config;
use tvp_core::output;
use tvp_core::valuation;

use anyhow::Context;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("tvp starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: snapshot {}, price source {} (${:.2}M/WAR), {} sims, seed {}",
        config.snapshot_date,
        config.price.source,
        config.price_curve.dollars_per_war,
        config.simulation.sims,
        config.run.seed
    );

    // 3. Load inputs
    let base_dir = std::env::current_dir().context("failed to resolve working directory")?;
    let inputs = valuation::load_run_inputs(&config, &base_dir).context("failed to load inputs")?;

    // 4. Value players
    let generated_at = chrono::Utc::now();
    let run = valuation::value_players(&config, &inputs, generated_at).context("valuation run failed")?;
    for skipped in &run.skipped {
        warn!("not valued: {} ({}): {}", skipped.name, skipped.player_id, skipped.reason);
    }

    // 5. Rank and emit
    let ranked = output::top_n(
        &run.players,
        config.output.rank_metric,
        config.output.top_n,
        config.output.leaderboard_only,
    );
    let (json_path, csv_path) = output::emit_outputs(
        &base_dir.join(&config.output.dir),
        &ranked,
        &run.metadata,
        config.output.top_n,
        config.output.rank_metric,
        generated_at,
    )
    .context("failed to write outputs")?;

    println!(
        "valued {} players ({} skipped); wrote {} and {}",
        run.metadata.player_count,
        run.metadata.skipped_count,
        json_path.display(),
        csv_path.display()
    );
    // 6. Trade packages
    let trades = valuation::package::value_trades(&run.players, config.output.rank_metric, &config.package);
    for trade in &trades {
        info!(
            "trade `{}`: {} assets, package value {:.2}",
            trade.name,
            trade.assets.len(),
            trade.value.package_tvp
        );
        println!(
            "trade {}: {:.2} (non-cash {:.2}, cash {:.2})",
            trade.name, trade.value.package_tvp, trade.value.non_cash_tvp, trade.value.cash_tvp_capped
        );
    }

    if !run.metadata.coverage_warnings.is_empty() {
        println!("coverage warnings:");
        for w in &run.metadata.coverage_warnings {
            println!("  - {w}");
        }
    }

    info!("tvp finished");
    Ok(())
}

/// Initialize tracing to log to `logs/tvp.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("tvp.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tvp=info,tvp_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
