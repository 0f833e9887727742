use std::fmt::Write;

use crate::purge::PurgeReport;

pub fn render_report(report: &PurgeReport) -> String {
    let mut out = String::new();
    let title = if report.dry_run {
        "=== Purge Plan (dry run) ==="
    } else {
        "=== Purge Summary ==="
    };
    let _ = writeln!(out, "\n{title}\n");
    let health = if report.healthy { "reachable" } else { "UNREACHABLE" };
    let _ = writeln!(out, "  Engine:    {health}");
    let _ = writeln!(out, "  Included:  {}", report.included);
    let _ = writeln!(out, "  Excluded:  {}", report.excluded);
    let _ = writeln!(out, "  Skipped:   {}", report.skipped());

    if report.dry_run {
        let _ = writeln!(out, "  Planned:   {}", report.planned.len());
        for id in &report.planned {
            let _ = writeln!(out, "    ○ {id}");
        }
        return out;
    }

    let _ = writeln!(out, "  Deleted:   {}", report.deleted.len());
    let _ = writeln!(out, "  Failed:    {}", report.failed.len());
    if !report.failed.is_empty() {
        let _ = writeln!(out, "\n  {:<40} {}", "Instance ID", "Error");
        let _ = writeln!(out, "  {:-<80}", "");
        for (id, err) in &report.failed {
            let _ = writeln!(out, "  ✗ {:<38} {}", id, err);
        }
    }
    out
}

pub fn print_report(report: &PurgeReport) {
    println!("{}", render_report(report));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_summary_lists_failures() {
        let report = PurgeReport {
            healthy: false,
            dry_run: false,
            included: 3,
            excluded: 1,
            planned: vec!["A".into(), "C".into()],
            deleted: vec!["A".into()],
            failed: vec![("C".into(), "HTTP Error: 404 - gone".into())],
        };
        let text = render_report(&report);
        assert!(text.contains("=== Purge Summary ==="));
        assert!(text.contains("UNREACHABLE"));
        assert!(text.contains("Skipped:   1"));
        assert!(text.contains("Deleted:   1"));
        assert!(text.contains("✗ C"));
        assert!(text.contains("HTTP Error: 404 - gone"));
    }

    #[test]
    fn test_render_dry_run_lists_plan() {
        let report = PurgeReport {
            healthy: true,
            dry_run: true,
            included: 2,
            excluded: 0,
            planned: vec!["A".into(), "B".into()],
            ..Default::default()
        };
        let text = render_report(&report);
        assert!(text.contains("dry run"));
        assert!(text.contains("○ A"));
        assert!(text.contains("○ B"));
        assert!(!text.contains("Deleted:"));
    }
}
