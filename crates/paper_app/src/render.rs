//! Plain-text rendering of the tracker view model.

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use paper_core::{ResultView, SectionsView, SyncBanner, TrackerViewModel, POLL_INTERVAL_MS};

const BODY_INDENT: &str = "    ";

pub fn render(view: &TrackerViewModel, synced_at: Option<DateTime<Local>>) -> String {
    let mut out = String::new();
    match &view.job_id {
        Some(job_id) => {
            let _ = writeln!(out, "Paper #{job_id}");
        }
        None => {
            let _ = writeln!(out, "No paper tracked");
            return out;
        }
    }

    match &view.body {
        ResultView::Loading => out.push_str("Loading...\n"),
        ResultView::Progress {
            status,
            source_name,
        } => {
            write_source(&mut out, source_name);
            let _ = writeln!(
                out,
                "Status: {status} (checking every {} s)",
                POLL_INTERVAL_MS as f64 / 1000.0
            );
        }
        ResultView::Sections(sections) => render_sections(&mut out, sections),
        ResultView::JobFailed { source_name } => {
            write_source(&mut out, source_name);
            out.push_str("Analysis failed. Upload the paper again to retry.\n");
        }
        ResultView::ContractViolation { detail } => {
            let _ = writeln!(out, "SERVER ERROR: the analysis payload is invalid ({detail}).");
        }
        ResultView::NotFound => out.push_str("Paper not found.\n"),
    }

    if let Some(banner) = &view.sync_banner {
        render_banner(&mut out, banner);
    }
    if let Some(at) = synced_at {
        let _ = writeln!(out, "Last synced {}", at.format("%H:%M:%S"));
    }
    out
}

fn write_source(out: &mut String, source_name: &str) {
    if !source_name.is_empty() {
        let _ = writeln!(out, "File: {source_name}");
    }
}

fn render_sections(out: &mut String, view: &SectionsView) {
    if !view.title.is_empty() {
        let _ = writeln!(out, "== {} ==", view.title);
    }
    write_source(out, &view.source_name);
    for section in &view.sections {
        let marker = if section.expanded { "[-]" } else { "[+]" };
        let _ = writeln!(out, "{marker} {}. {}", section.key.ordinal(), section.title);
        if section.expanded {
            for line in section.body.lines() {
                if line.trim().is_empty() {
                    out.push('\n');
                } else {
                    let _ = writeln!(out, "{BODY_INDENT}{line}");
                }
            }
        }
    }
    out.push_str("Commands: <n> toggle section, a expand all, c collapse all, q quit\n");
}

fn render_banner(out: &mut String, banner: &SyncBanner) {
    if banner.halted && banner.consecutive_failures == 0 {
        let _ = writeln!(out, "! Sync halted: {}. Press r to retry.", banner.message);
    } else if banner.halted {
        let _ = writeln!(
            out,
            "! Sync halted after {} failed attempts: {}. Press r to retry.",
            banner.consecutive_failures, banner.message
        );
    } else {
        let _ = writeln!(
            out,
            "! Sync problem ({} in a row): {}. Still retrying.",
            banner.consecutive_failures, banner.message
        );
    }
}
