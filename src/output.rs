//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Generate
//!
//! ```text
//! Background photos/desk.jpg (4032x3024)
//! Title 116.52pt / 155px (2 lines, greedy)
//!     001 Ten Practical Rust Patterns for
//!     002 Building Reliable Services
//!     Icon 002 dropped: https://example.com/missing.png
//!         Reason: source unavailable: https://example.com/missing.png: 404 Not Found
//! Icons: 2 placed in 250px boxes
//! Done → out/thumb.png
//!     Digest: 3fa94c1e0b7d
//!     Took: 412 ms
//! ```
//!
//! ## Layout
//!
//! ```text
//! Size: 158.52pt (211px)
//! Breaking: greedy
//! Line height: 158px, spacing 47px
//! 001 Python Tutorial @ (478, 301)
//! 002 for Beginners @ (590, 506)
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 → out/first.png
//! 002 ✗ out/second.png
//!     Error: resolve background: source not found: bg/missing.jpg
//! Batch: 1 succeeded, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::batch::{BatchEvent, JobOutcome};
use crate::pipeline::PipelineEvent;
use crate::types::{LineBreaking, TitleLayoutResult};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn breaking_label(breaking: LineBreaking) -> &'static str {
    match breaking {
        LineBreaking::Greedy => "greedy",
        LineBreaking::MidpointSplit => "midpoint split",
        LineBreaking::NaiveTwoLine => "naive two-line",
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// First 12 hex digits, enough to tell renders apart at a glance.
fn short_digest(digest: &str) -> &str {
    &digest[..digest.len().min(12)]
}

// ============================================================================
// Generate
// ============================================================================

/// Format a single pipeline progress event as display lines.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::BackgroundReady { source, original } => {
            vec![format!("Background {} ({}x{})", source, original.0, original.1)]
        }
        PipelineEvent::TitleLaidOut {
            font_size_pt,
            font_size_px,
            lines,
            breaking,
        } => {
            let mut out = vec![format!(
                "Title {:.2}pt / {}px ({}, {})",
                font_size_pt,
                font_size_px,
                plural(lines.len(), "line", "lines"),
                breaking_label(*breaking)
            )];
            for (i, line) in lines.iter().enumerate() {
                out.push(format!("{}{} {}", indent(1), format_index(i + 1), line));
            }
            out
        }
        PipelineEvent::IconDropped {
            index,
            source,
            reason,
        } => vec![
            format!("{}Icon {} dropped: {}", indent(1), format_index(index + 1), source),
            format!("{}Reason: {}", indent(2), reason),
        ],
        PipelineEvent::IconsPlaced {
            placed,
            box_size,
            skipped,
        } => {
            if *placed == 0 && *skipped == 0 {
                return vec!["Icons: none".to_string()];
            }
            let mut line = format!("Icons: {} placed in {}px boxes", placed, box_size);
            if *skipped > 0 {
                line.push_str(&format!(", {} off-canvas", skipped));
            }
            vec![line]
        }
        PipelineEvent::Finished {
            digest,
            path,
            elapsed,
        } => {
            let head = match path {
                Some(p) => format!("Done \u{2192} {}", p.display()),
                None => "Done (in memory)".to_string(),
            };
            vec![
                head,
                format!("{}Digest: {}", indent(1), short_digest(digest)),
                format!("{}Took: {} ms", indent(1), elapsed.as_millis()),
            ]
        }
    }
}

// ============================================================================
// Layout dry-run
// ============================================================================

/// Format the outcome of the title size ladder.
pub fn format_title_layout(layout: &TitleLayoutResult) -> Vec<String> {
    let mut lines = vec![
        format!("Size: {:.2}pt ({}px)", layout.font_size_pt, layout.font_size_px),
        format!("Breaking: {}", breaking_label(layout.breaking)),
        format!(
            "Line height: {}px, spacing {}px",
            layout.line_height_px, layout.line_spacing_px
        ),
    ];
    for (i, (text, (x, y))) in layout.lines.iter().zip(&layout.line_origins).enumerate() {
        lines.push(format!("{} {} @ ({}, {})", format_index(i + 1), text, x, y));
    }
    lines
}

/// Print the title layout to stdout.
pub fn print_title_layout(layout: &TitleLayoutResult) {
    for line in format_title_layout(layout) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format one batch progress event.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::JobFinished {
            index,
            output,
            dropped_icons,
        } => {
            let mut lines = vec![format!(
                "{} \u{2192} {}",
                format_index(index + 1),
                output.display()
            )];
            if *dropped_icons > 0 {
                lines.push(format!(
                    "{}{} dropped",
                    indent(1),
                    plural(*dropped_icons, "icon", "icons")
                ));
            }
            lines
        }
        BatchEvent::JobFailed {
            index,
            output,
            error,
        } => vec![
            format!("{} \u{2717} {}", format_index(index + 1), output.display()),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

/// Summarize a finished batch.
pub fn format_batch_summary(outcomes: &[JobOutcome]) -> Vec<String> {
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    vec![format!(
        "Batch: {} succeeded, {} failed",
        outcomes.len() - failed,
        failed
    )]
}

/// Print the batch summary to stdout.
pub fn print_batch_summary(outcomes: &[JobOutcome]) {
    for line in format_batch_summary(outcomes) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{EngineError, RenderReport};
    use std::path::PathBuf;
    use std::time::Duration;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn short_digest_truncates() {
        assert_eq!(short_digest("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_digest("abc"), "abc");
    }

    // =========================================================================
    // Pipeline events
    // =========================================================================

    #[test]
    fn background_event() {
        let lines = format_pipeline_event(&PipelineEvent::BackgroundReady {
            source: "bg.jpg".into(),
            original: (4032, 3024),
        });
        assert_eq!(lines, vec!["Background bg.jpg (4032x3024)"]);
    }

    #[test]
    fn title_event_lists_lines() {
        let lines = format_pipeline_event(&PipelineEvent::TitleLaidOut {
            font_size_pt: 116.52,
            font_size_px: 155,
            lines: vec!["Ten Practical".into(), "Rust Patterns".into()],
            breaking: LineBreaking::Greedy,
        });
        assert_eq!(
            lines,
            vec![
                "Title 116.52pt / 155px (2 lines, greedy)",
                "    001 Ten Practical",
                "    002 Rust Patterns",
            ]
        );
    }

    #[test]
    fn single_line_title_is_singular() {
        let lines = format_pipeline_event(&PipelineEvent::TitleLaidOut {
            font_size_pt: 60.0,
            font_size_px: 80,
            lines: vec!["Short".into()],
            breaking: LineBreaking::NaiveTwoLine,
        });
        assert_eq!(lines[0], "Title 60.00pt / 80px (1 line, naive two-line)");
    }

    #[test]
    fn dropped_icon_shows_reason() {
        let lines = format_pipeline_event(&PipelineEvent::IconDropped {
            index: 1,
            source: "https://x.test/b.png".into(),
            reason: "timed out".into(),
        });
        assert_eq!(
            lines,
            vec![
                "    Icon 002 dropped: https://x.test/b.png",
                "        Reason: timed out",
            ]
        );
    }

    #[test]
    fn icons_event_variants() {
        assert_eq!(
            format_pipeline_event(&PipelineEvent::IconsPlaced {
                placed: 0,
                box_size: 0,
                skipped: 0
            }),
            vec!["Icons: none"]
        );
        assert_eq!(
            format_pipeline_event(&PipelineEvent::IconsPlaced {
                placed: 3,
                box_size: 220,
                skipped: 1
            }),
            vec!["Icons: 3 placed in 220px boxes, 1 off-canvas"]
        );
    }

    #[test]
    fn finished_event_with_and_without_path() {
        let lines = format_pipeline_event(&PipelineEvent::Finished {
            digest: "3fa94c1e0b7d55aa".into(),
            path: Some(PathBuf::from("out/thumb.png")),
            elapsed: Duration::from_millis(412),
        });
        assert_eq!(
            lines,
            vec!["Done \u{2192} out/thumb.png", "    Digest: 3fa94c1e0b7d", "    Took: 412 ms"]
        );

        let lines = format_pipeline_event(&PipelineEvent::Finished {
            digest: "ff".into(),
            path: None,
            elapsed: Duration::ZERO,
        });
        assert_eq!(lines[0], "Done (in memory)");
    }

    // =========================================================================
    // Layout
    // =========================================================================

    #[test]
    fn title_layout_lists_origins() {
        let layout = TitleLayoutResult {
            font_size_pt: 158.52,
            font_size_px: 211,
            lines: vec!["Python Tutorial".into(), "for Beginners".into()],
            line_height_px: 158,
            line_spacing_px: 47,
            line_origins: vec![(478, 301), (590, 506)],
            breaking: LineBreaking::Greedy,
        };
        assert_eq!(
            format_title_layout(&layout),
            vec![
                "Size: 158.52pt (211px)",
                "Breaking: greedy",
                "Line height: 158px, spacing 47px",
                "001 Python Tutorial @ (478, 301)",
                "002 for Beginners @ (590, 506)",
            ]
        );
    }

    // =========================================================================
    // Batch
    // =========================================================================

    #[test]
    fn batch_events() {
        let ok = format_batch_event(&BatchEvent::JobFinished {
            index: 0,
            output: "out/a.png".into(),
            dropped_icons: 2,
        });
        assert_eq!(ok, vec!["001 \u{2192} out/a.png", "    2 icons dropped"]);

        let failed = format_batch_event(&BatchEvent::JobFailed {
            index: 1,
            output: "out/b.png".into(),
            error: "title is missing".into(),
        });
        assert_eq!(failed, vec!["002 \u{2717} out/b.png", "    Error: title is missing"]);
    }

    #[test]
    fn batch_summary_counts() {
        let report = RenderReport {
            background_size: (10, 10),
            title: TitleLayoutResult {
                font_size_pt: 60.0,
                font_size_px: 80,
                lines: vec!["a".into()],
                line_height_px: 60,
                line_spacing_px: 18,
                line_origins: vec![(0, 0)],
                breaking: LineBreaking::Greedy,
            },
            font: "built-in".into(),
            icons_placed: 0,
            icons_skipped: 0,
            icon_box: 0,
            icon_row_width: 0,
            dropped_icons: vec![],
            digest: "00".into(),
            elapsed: Duration::ZERO,
        };
        let outcomes = vec![
            JobOutcome {
                index: 0,
                output: "a.png".into(),
                result: Ok(report),
            },
            JobOutcome {
                index: 1,
                output: "b.png".into(),
                result: Err(EngineError::TitleMissing),
            },
        ];
        assert_eq!(format_batch_summary(&outcomes), vec!["Batch: 1 succeeded, 1 failed"]);
    }
}
