pub mod types;

pub use types::{DiffReport, PullRequestListing, Report};

use crate::bitbucket::PullRequestSummary;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Print the report to the terminal (default) or write it as Markdown.
#[instrument(skip(report))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            std::fs::write(path, render_markdown(report))?;
            Ok(())
        }
    }
}

fn print_terminal_report(report: &Report) {
    match report {
        Report::PullRequests(listing) => {
            println!();
            println!(
                "═══ {}/{}: {} pull requests ({} requests) ═══",
                listing.project,
                listing.repo,
                listing.pull_requests.len(),
                listing.request_count
            );
            for pr in &listing.pull_requests {
                println!(
                    "  {} {} [{}]",
                    format_id(pr).as_str().bold(),
                    pr.title,
                    colorize_state(&pr.state)
                );
                println!(
                    "      {} | {} → {}",
                    pr.author, pr.source_branch, pr.destination_branch
                );
            }
            println!();
        }
        Report::Detail { json, .. } => print!("{json}"),
        Report::Diff(diff) => match &diff.diff {
            Some(text) => print!("{text}"),
            None => {
                println!("PR #{}: {} files changed", diff.pr_number, diff.files.len());
                for file in &diff.files {
                    println!("  • {file}");
                }
            }
        },
    }
}

/// Markdown rendering of a report.
pub fn render_markdown(report: &Report) -> String {
    let mut md = String::new();
    match report {
        Report::PullRequests(listing) => {
            md.push_str(&format!(
                "# Pull requests for {}/{}\n\n",
                listing.project, listing.repo
            ));
            if listing.pull_requests.is_empty() {
                md.push_str("No pull requests.\n");
            }
            for pr in &listing.pull_requests {
                md.push_str(&format!(
                    "- **{}** {} ({}) by {}: `{}` → `{}`\n",
                    format_id(pr),
                    pr.title,
                    pr.state,
                    pr.author,
                    pr.source_branch,
                    pr.destination_branch
                ));
            }
        }
        Report::Detail { pr_number, json } => {
            md.push_str(&format!("# PR #{pr_number}\n\n```json\n{json}```\n"));
        }
        Report::Diff(diff) => {
            md.push_str(&format!("# PR #{} diff\n\n", diff.pr_number));
            md.push_str(&format!("**Files changed:** {}\n\n", diff.files.len()));
            for file in &diff.files {
                md.push_str(&format!("- `{file}`\n"));
            }
            if let Some(text) = &diff.diff {
                md.push_str(&format!("\n```diff\n{text}```\n"));
            }
        }
    }
    md
}

fn format_id(pr: &PullRequestSummary) -> String {
    match pr.id {
        Some(id) => format!("#{id}"),
        None => "#?".to_string(),
    }
}

fn colorize_state(state: &str) -> colored::ColoredString {
    match state {
        "OPEN" => state.green().bold(),
        "MERGED" => state.blue().bold(),
        "DECLINED" => state.red().bold(),
        _ => state.yellow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: u64, title: &str) -> PullRequestSummary {
        PullRequestSummary {
            id: Some(id),
            title: title.to_string(),
            author: "alice".to_string(),
            state: "OPEN".to_string(),
            source_branch: "feature".to_string(),
            destination_branch: "main".to_string(),
        }
    }

    fn listing() -> Report {
        Report::PullRequests(PullRequestListing {
            project: "team".to_string(),
            repo: "service".to_string(),
            request_count: 2,
            pull_requests: vec![summary(42, "Add OAuth2 login flow"), summary(43, "Fix typo")],
        })
    }

    #[test]
    fn test_markdown_listing() {
        let md = render_markdown(&listing());
        assert!(md.starts_with("# Pull requests for team/service"));
        assert!(md.contains("- **#42** Add OAuth2 login flow (OPEN) by alice"));
        assert!(md.find("#42").unwrap() < md.find("#43").unwrap());
    }

    #[test]
    fn test_markdown_empty_listing() {
        let report = Report::PullRequests(PullRequestListing {
            project: "team".to_string(),
            repo: "service".to_string(),
            request_count: 1,
            pull_requests: vec![],
        });
        assert!(render_markdown(&report).contains("No pull requests."));
    }

    #[test]
    fn test_markdown_diff_files_only() {
        let report = Report::Diff(DiffReport {
            pr_number: "7".to_string(),
            files: vec!["src/a.rs".to_string(), "src/b.rs".to_string()],
            diff: None,
        });
        let md = render_markdown(&report);
        assert!(md.contains("**Files changed:** 2"));
        assert!(md.contains("- `src/a.rs`"));
        assert!(!md.contains("```diff"));
    }

    #[test]
    fn test_markdown_diff_with_text() {
        let report = Report::Diff(DiffReport {
            pr_number: "7".to_string(),
            files: vec!["a".to_string()],
            diff: Some("diff --git a/a b/a\n".to_string()),
        });
        assert!(render_markdown(&report).contains("```diff\ndiff --git a/a b/a\n```"));
    }

    #[test]
    fn test_output_to_file() {
        let path = std::env::temp_dir().join("bitbucket_pr_test_output.md");
        let report = Report::Detail {
            pr_number: "5".to_string(),
            json: "{\n    \"id\": 5\n}\n".to_string(),
        };
        output(&report, Some(&path)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# PR #5"));
        assert!(content.contains("\"id\": 5"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_output_to_terminal() {
        // Should not panic
        output(&listing(), None).unwrap();
    }
}
