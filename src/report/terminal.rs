use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::commands::cache::CacheReport;
use crate::commands::list::AppListing;
use crate::commands::status::{AppStatus, StatusReport, StatusResult};

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

fn new_table(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(columns));
    table
}

fn warning_count(app: &AppStatus) -> usize {
    app.results
        .iter()
        .map(|r| r.warnings.len() + r.errors.len())
        .sum::<usize>()
        + app.source_errors.len()
}

pub fn status_summary(checked: usize, warnings: usize) -> String {
    format!("{checked} dependencies checked, {warnings} warnings found.")
}

fn print_source_errors(errors: &[String]) {
    for error in errors {
        println!("  {} {}", "✗".red(), error);
    }
}

/// Render a status run: flagged dependencies per application and a summary.
pub fn render_status(report: &StatusReport, quiet: bool) {
    let checked: usize = report.apps.iter().map(|a| a.checked).sum();
    let warnings: usize = report.apps.iter().map(warning_count).sum();

    if !quiet {
        println!(
            "\n {} v{}\n",
            "license-cache".bold(),
            env!("CARGO_PKG_VERSION")
        );
        for app in &report.apps {
            render_app_status(app);
        }
    }

    let summary = status_summary(checked, warnings);
    if report.success() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}

fn render_app_status(app: &AppStatus) {
    println!(
        " Checking licenses for {}: {} dependencies",
        app.app.bold(),
        app.checked
    );
    print_source_errors(&app.source_errors);

    if app.results.is_empty() {
        println!();
        return;
    }

    let mut table = new_table(&["Name", "Version", "Type", "Cache file", "Warnings"]);
    for result in &app.results {
        table.add_row(status_row(result));
    }
    println!("{}\n", table);
}

fn status_row(result: &StatusResult) -> Vec<Cell> {
    let mut lines: Vec<String> = result.warnings.clone();
    lines.extend(result.errors.iter().map(|e| format!("error: {e}")));
    let color = if result.warnings.iter().any(|w| w.starts_with("license needs reviewed")) {
        Color::Red
    } else {
        Color::Yellow
    };

    vec![
        Cell::new(&result.name),
        Cell::new(&result.version),
        Cell::new(result.source_type.to_string()),
        Cell::new(result.path.display()).fg(Color::DarkGrey),
        Cell::new(lines.join("\n")).fg(color),
    ]
}

/// Render the outcome of a cache run.
pub fn render_cache(report: &CacheReport, quiet: bool) {
    let mut cached = 0;
    let mut reused = 0;
    let mut failed = 0;

    for app in &report.apps {
        cached += app.cached;
        reused += app.reused;
        failed += app.failures.len() + app.source_errors.len();
        if quiet {
            continue;
        }

        println!(
            " {} {} → {} ({} cached, {} current)",
            "→".cyan(),
            app.app.bold(),
            app.cache_path.display(),
            app.cached,
            app.reused
        );
        print_source_errors(&app.source_errors);
        if !app.failures.is_empty() {
            let mut table = new_table(&["Name", "Version", "Type", "Reason"]);
            for failure in &app.failures {
                table.add_row(vec![
                    Cell::new(&failure.name),
                    Cell::new(&failure.version),
                    Cell::new(failure.source_type.to_string()),
                    Cell::new(&failure.reason).fg(Color::Red),
                ]);
            }
            println!("{}", table);
        }
    }

    let summary = format!("{cached} records cached, {reused} already current, {failed} failures.");
    if report.success() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}

/// Render every dependency each application's sources report.
pub fn render_list(listings: &[AppListing], quiet: bool) {
    for listing in listings {
        println!(
            " {} {}: {} dependencies",
            "→".cyan(),
            listing.app.bold(),
            listing.dependencies.len()
        );
        print_source_errors(&listing.source_errors);
        if quiet || listing.dependencies.is_empty() {
            continue;
        }

        let mut table = new_table(&["Name", "Version", "Type", "Path", "Errors"]);
        for kd in &listing.dependencies {
            let dep = &kd.dependency;
            let path = dep
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            table.add_row(vec![
                Cell::new(&dep.name),
                Cell::new(&dep.version),
                Cell::new(dep.source_type.to_string()),
                Cell::new(path).fg(Color::DarkGrey),
                Cell::new(dep.errors.join("\n")).fg(Color::Red),
            ]);
        }
        println!("{}\n", table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;
    use std::path::PathBuf;

    #[test]
    fn test_status_summary() {
        assert_eq!(status_summary(12, 3), "12 dependencies checked, 3 warnings found.");
    }

    fn flagged() -> StatusResult {
        StatusResult {
            source_type: SourceType::Npm,
            name: "bar".into(),
            version: "1.0.0".into(),
            path: PathBuf::from(".licenses/npm/bar.txt"),
            warnings: vec!["missing license text".into(), "license needs reviewed: gpl-3.0.".into()],
            errors: vec!["no checkout".into()],
        }
    }

    #[test]
    fn test_warning_count_includes_errors() {
        let app = AppStatus {
            app: "web".into(),
            checked: 2,
            results: vec![flagged()],
            source_errors: vec!["pip: unable to read Pipfile.lock".into()],
        };
        assert_eq!(warning_count(&app), 4);
    }

    #[test]
    fn test_status_row_shows_cache_file() {
        let row = status_row(&flagged());
        let contents: Vec<String> = row.iter().map(|c| c.content()).collect();
        assert_eq!(contents[0], "bar");
        assert_eq!(contents[3], ".licenses/npm/bar.txt");
        assert_eq!(
            contents[4],
            "missing license text\nlicense needs reviewed: gpl-3.0.\nerror: no checkout"
        );
    }
}
