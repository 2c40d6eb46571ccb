use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::cli::CheckArgs;
use crate::labels::LabelTable;
use crate::model::{Country, FastTextModel};
use crate::sheets;
use crate::storage::StoragePaths;

#[derive(Debug, Serialize)]
struct CheckMeta {
    checked_at_utc: String,
    data_rows: usize,
    provision_rows: usize,
    label_count: usize,
    models: Vec<String>,
}

/// Dry-run of the full serve startup path: spreadsheets, label table, every
/// model artifact. Writes a summary next to the data so deploys can validate
/// inputs before swapping traffic.
pub fn run(opts: CheckArgs) -> anyhow::Result<()> {
    tracing::info!("provision-coder check");
    tracing::info!("data_dir={}", opts.data_dir);

    let paths = StoragePaths::new(&opts.data_dir);

    let data = sheets::load_data_records(&paths.data_sheet()).context("load data sheet")?;
    let provisions =
        sheets::load_provision_records(&paths.provision_sheet()).context("load provision sheet")?;
    tracing::info!(
        "Loaded {} data rows, {} provision rows",
        data.len(),
        provisions.len()
    );

    let labels = LabelTable::build(&data, &provisions);
    tracing::info!("Label table: {} entries", labels.len());

    let mut models = Vec::new();
    let default_path = paths.default_model();
    FastTextModel::load(&default_path)
        .with_context(|| format!("load {}", default_path.display()))?;
    tracing::info!("Default model OK: {}", default_path.display());
    models.push(default_path.display().to_string());

    for country in Country::ALL {
        let path = paths.country_model(country);
        FastTextModel::load(&path).with_context(|| format!("load {}", path.display()))?;
        tracing::info!("{} model OK: {}", country.code(), path.display());
        models.push(path.display().to_string());
    }

    let meta = CheckMeta {
        checked_at_utc: now_utc(),
        data_rows: data.len(),
        provision_rows: provisions.len(),
        label_count: labels.len(),
        models,
    };
    write_json(&paths.meta_path, &meta).context("write meta.json")?;

    tracing::info!("Check complete.");
    tracing::info!("Meta: {}", paths.meta_path.display());
    Ok(())
}

fn write_json(path: &Path, v: &impl Serialize) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let s = serde_json::to_string_pretty(v)?;
    std::fs::write(path, s)?;
    Ok(())
}

fn now_utc() -> String {
    // Avoid an extra chrono/time dependency; a plain epoch stamp is enough.
    let now = std::time::SystemTime::now();
    let dur = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}s_since_epoch", dur.as_secs())
}
