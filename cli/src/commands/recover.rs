use anyhow::{Context, Result, bail};
use serde_json::json;

use hostbridge::{BridgeConfig, ExchangeTracker, FileStore};

use crate::cli::StoreArgs;
use crate::commands::pending::print_table;

pub fn execute(args: StoreArgs, config: BridgeConfig) -> Result<()> {
    let Some(path) = config.store_path() else {
        bail!("no pending store configured (use --store or store_path in the config file)");
    };

    // Opening the tracker runs recovery and rewrites the store
    let tracker = ExchangeTracker::open(FileStore::new(path), *config.policy())
        .with_context(|| format!("failed to recover pending store: {}", path.display()))?;

    if args.json {
        let report = json!({
            "abandoned": tracker.recovered(),
            "pending": tracker.pending(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "abandoned {} exchange(s) older than {}s",
        tracker.recovered().len(),
        config.policy().grace_window.as_secs()
    );
    print_table(tracker.recovered());
    println!();
    println!("still pending:");
    print_table(tracker.pending());
    Ok(())
}
