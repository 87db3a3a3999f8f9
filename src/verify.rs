use crate::batch::discover_networks;
use anyhow::Result;
use dr_metrics::data_loader::read_table;
use dr_metrics::{CarrierMap, ComponentKind, Network, NetworkLoader, NetworkSource, ResolvedCarriers, SeriesKind};
use glob::glob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Key columns of an exported time-series table.
const KEY_COLUMNS: [&str; 4] = ["snapshot", "timestep", "period", "name"];

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub file: PathBuf,
    pub message: String,
}

impl Issue {
    fn new(file: &Path, message: impl Into<String>) -> Self {
        Self {
            file: file.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Snapshots must be strictly increasing within each period.
fn check_snapshot_order(network: &Network, dir: &Path, issues: &mut Vec<Issue>) {
    let file = dir.join("snapshots.csv");
    let mut out_of_order = 0;
    for pair in network.snapshots().windows(2) {
        if pair[0].period == pair[1].period && pair[1].timestamp <= pair[0].timestamp {
            out_of_order += 1;
        }
    }
    if out_of_order > 0 {
        issues.push(Issue::new(&file, format!("{out_of_order} snapshots are duplicated or out of order")));
    }
    if network.snapshots().is_empty() {
        issues.push(Issue::new(&file, "no snapshots"));
    }
}

/// Time-series tables must have one row per snapshot and only name known
/// components.
fn check_series_files(network: &Network, dir: &Path, issues: &mut Vec<Issue>) -> Result<()> {
    let pattern = dir.join("*-*.csv");
    let known_files: Vec<(String, SeriesKind)> = SeriesKind::ALL.iter().map(|k| (k.file_name(), *k)).collect();

    for path in glob(&pattern.to_string_lossy())?.filter_map(|p| p.ok()) {
        let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let Some((_, kind)) = known_files.iter().find(|(name, _)| *name == file_name) else {
            println!("    ℹ️  Ignoring {file_name}");
            continue;
        };

        let df = read_table(&path)?;
        let headers: Vec<String> = df.get_column_names().iter().map(|h| h.trim().to_string()).collect();
        let rows = df.height();
        if rows != network.snapshots().len() {
            issues.push(Issue::new(
                &path,
                format!("{rows} rows for {} snapshots", network.snapshots().len()),
            ));
        }

        let components: HashSet<&str> = network
            .components(kind.component())
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        let unknown: Vec<&String> = headers
            .iter()
            .skip(1)
            .filter(|h| !KEY_COLUMNS.contains(&h.as_str()) && !components.contains(h.as_str()))
            .collect();
        if !unknown.is_empty() {
            issues.push(Issue::new(
                &path,
                format!("{} columns name no {}: {unknown:?}", unknown.len(), kind.component().table_name()),
            ));
        }
    }
    Ok(())
}

/// Structural problems of one exported network.
pub fn verify_network(dir: &Path, carriers: &CarrierMap) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();
    let network = match NetworkLoader::load(dir) {
        Ok(network) => network,
        Err(e) => {
            issues.push(Issue::new(dir, e.to_string()));
            return Ok(issues);
        }
    };

    check_snapshot_order(&network, dir, &mut issues);
    check_series_files(&network, dir, &mut issues)?;
    if let Err(e) = ResolvedCarriers::resolve(&network, carriers) {
        issues.push(Issue::new(dir, e.to_string()));
    }
    if network.components(ComponentKind::Link).is_empty() {
        issues.push(Issue::new(&dir.join("links.csv"), "no links, so no electrical load"));
    }
    Ok(issues)
}

/// Checks every network below `root`; returns the number of issues found.
pub fn verify_networks(root: &Path, carriers: &CarrierMap) -> Result<usize> {
    println!("\n🔍 Network Verification");
    println!("{}", "=".repeat(60));

    let networks = discover_networks(root);
    if networks.is_empty() {
        println!("\n⚠️  No networks found under {}", root.display());
        return Ok(0);
    }

    let mut total_issues = 0;
    for dir in &networks {
        println!("\n📁 Checking {}", dir.display());
        let issues = verify_network(dir, carriers)?;
        if issues.is_empty() {
            println!("    ✅ No issues found");
        }
        for issue in &issues {
            println!("    ❌ {}: {}", issue.file.display(), issue.message);
        }
        total_issues += issues.len();
    }

    println!("\n{}", "=".repeat(60));
    if total_issues == 0 {
        println!("✅ Verification passed for {} networks", networks.len());
    } else {
        println!("⚠️  Verification found {total_issues} issues in {} networks", networks.len());
    }
    Ok(total_issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_network(dir: &Path, snapshots: &str, links_p0: &str) {
        fs::write(dir.join("snapshots.csv"), snapshots).unwrap();
        fs::write(dir.join("links.csv"), "name,bus0,carrier\np1 res-elec,p1,res-elec\n").unwrap();
        fs::write(dir.join("links-p0.csv"), links_p0).unwrap();
    }

    #[test]
    fn test_clean_network_has_no_issues() {
        let dir = TempDir::new().unwrap();
        write_network(
            dir.path(),
            "snapshot\n2019-01-01 00:00:00\n2019-01-01 01:00:00\n",
            "snapshot,p1 res-elec\n2019-01-01 00:00:00,1\n2019-01-01 01:00:00,2\n",
        );
        fs::write(dir.path().join("links-p2.csv"), "snapshot\n").unwrap();
        assert!(verify_network(dir.path(), &CarrierMap::default()).unwrap().is_empty());
    }

    #[test]
    fn test_reports_order_rows_and_columns() {
        let dir = TempDir::new().unwrap();
        write_network(
            dir.path(),
            "snapshot\n2019-01-01 01:00:00\n2019-01-01 00:00:00\n",
            "snapshot,p1 res-elec,ghost\n2019-01-01 00:00:00,1,0\n",
        );
        let issues = verify_network(dir.path(), &CarrierMap::default()).unwrap();
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(issues.len(), 3, "{messages:?}");
        assert!(messages[0].contains("out of order"));
        assert!(messages[1].contains("1 rows for 2 snapshots"));
        assert!(messages[2].contains("ghost"));
    }

    #[test]
    fn test_unknown_carrier_and_missing_snapshots() {
        let dir = TempDir::new().unwrap();
        let issues = verify_network(dir.path(), &CarrierMap::default()).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("snapshots.csv"));

        write_network(dir.path(), "snapshot\n2019-01-01 00:00:00\n", "snapshot\n2019-01-01 00:00:00\n");
        fs::write(dir.path().join("generators.csv"), "name,bus,carrier\ng,p1,fusion\n").unwrap();
        let issues = verify_network(dir.path(), &CarrierMap::default()).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("fusion"));
    }
}
