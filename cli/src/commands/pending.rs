use anyhow::{Context, Result, bail};

use hostbridge::{BridgeConfig, FileStore, PendingRecord, PendingStore};

use crate::cli::StoreArgs;

pub fn execute(args: StoreArgs, config: BridgeConfig) -> Result<()> {
    let Some(path) = config.store_path() else {
        bail!("no pending store configured (use --store or store_path in the config file)");
    };

    let records = FileStore::new(path)
        .load()
        .with_context(|| format!("failed to read pending store: {}", path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print_table(&records);
    }
    Ok(())
}

pub(crate) fn print_table(records: &[PendingRecord]) {
    if records.is_empty() {
        println!("no pending exchanges");
        return;
    }
    println!(
        "{:<6} {:<32} {:<28} {:<18} {}",
        "ID", "CORRELATION", "VARIANT", "STATE", "ISSUED_MS"
    );
    for record in records {
        println!(
            "{:<6} {:<32} {:<28} {:<18} {}",
            record.exchange_id,
            record.correlation_id.as_str(),
            record.variant.tag(),
            format!("{:?}", record.state),
            record.issued_at_ms
        );
    }
}
