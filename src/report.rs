//! Optional CSV report of skipped source rows, for manual retry.

use crate::models::SkipRecord;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub fn write_report(path: &Path, skips: &[SkipRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    let mut writer = Writer::from_writer(BufWriter::new(file));

    writer.write_record(["table", "legacy_id", "reason", "detail"])?;
    for skip in skips {
        let reason = skip.reason.to_string();
        writer.write_record([
            skip.table.as_str(),
            skip.legacy_id.as_str(),
            reason.as_str(),
            skip.detail.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkipReason;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skips.csv");
        let skips = vec![
            SkipRecord {
                table: "wp_posts".to_string(),
                legacy_id: "12".to_string(),
                reason: SkipReason::Validation,
                detail: "empty title".to_string(),
            },
            SkipRecord {
                table: "wp_users".to_string(),
                legacy_id: "3".to_string(),
                reason: SkipReason::Parse,
                detail: "users row: expected 10 columns, got 4".to_string(),
            },
        ];

        write_report(&path, &skips).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "table,legacy_id,reason,detail");
        assert!(lines[1].contains("validation"));
        assert!(lines[2].contains("wp_users"));
    }

    #[test]
    fn empty_report_has_only_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skips.csv");
        write_report(&path, &[]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
