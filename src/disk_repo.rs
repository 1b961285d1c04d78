// Local partition usage via sysinfo.

use crate::models::PartitionStat;
use crate::units::{self, SizeUnit};
use comfy_table::{CellAlignment, ContentArrangement, Table, presets};
use std::sync::{Arc, Mutex};
use sysinfo::Disks;
use tracing::instrument;

pub struct DiskRepo {
    disks: Arc<Mutex<Disks>>,
}

impl Default for DiskRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskRepo {
    pub fn new() -> Self {
        Self {
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
        }
    }

    /// All mounted partitions, or only those whose mount point or device name is `partition`.
    #[instrument(skip(self), fields(repo = "disk", operation = "get_partitions"))]
    pub async fn get_partitions(&self, partition: Option<&str>) -> anyhow::Result<Vec<PartitionStat>> {
        let disks = self.disks.clone();
        let all = tokio::task::spawn_blocking(move || {
            let mut disks = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            disks.refresh(true);
            let partitions: Vec<PartitionStat> = disks
                .list()
                .iter()
                .map(|d| {
                    partition_stat(
                        d.mount_point().to_string_lossy().into_owned(),
                        d.name().to_string_lossy().into_owned(),
                        d.file_system().to_string_lossy().into_owned(),
                        d.total_space(),
                        d.available_space(),
                    )
                })
                .collect();
            Ok::<_, anyhow::Error>(partitions)
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))??;

        let selected = filter_partitions(all, partition);
        if let Some(p) = partition
            && selected.is_empty()
        {
            tracing::warn!(partition = p, "no mounted partition matches");
        }
        Ok(selected)
    }
}

pub fn partition_stat(
    mount: String,
    name: String,
    file_system: String,
    total: u64,
    available: u64,
) -> PartitionStat {
    let used = total.saturating_sub(available);
    let usage_percent = if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    PartitionStat {
        mount,
        name,
        file_system,
        total_space: total,
        used_space: used,
        available_space: available,
        usage_percent,
    }
}

pub fn filter_partitions(partitions: Vec<PartitionStat>, partition: Option<&str>) -> Vec<PartitionStat> {
    match partition {
        None => partitions,
        Some(p) => partitions
            .into_iter()
            .filter(|s| s.mount == p || s.name == p)
            .collect(),
    }
}

/// Text table of partitions; sizes humanized, or in `unit` when given.
pub fn render(partitions: &[PartitionStat], unit: Option<SizeUnit>) -> String {
    let size = |bytes: u64| match unit {
        Some(unit) => units::humanize_in(bytes, unit),
        None => units::humanize(bytes),
    };
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["mount", "device", "fs", "size", "used", "avail", "use%"]);
    for p in partitions {
        table.add_row(vec![
            p.mount.clone(),
            p.name.clone(),
            p.file_system.clone(),
            size(p.total_space),
            size(p.used_space),
            size(p.available_space),
            format!("{:.1}%", p.usage_percent),
        ]);
    }
    for column in 3..7 {
        if let Some(c) = table.column_mut(column) {
            c.set_cell_alignment(CellAlignment::Right);
        }
    }
    table.to_string()
}
