//! Candidate-line reconstruction from positioned fragments.
//!
//! Recognizer output order and grouping is unreliable for multi-column
//! receipts, so this module over-generates: every heuristic's output is
//! concatenated into one superset of plausible line groupings, and each
//! extraction rule scans the full superset. Lowercase duplicates are
//! appended for every derived line because the extraction regexes are
//! case-sensitive and receipts mix cases.

use tracing::debug;

use super::{Fragment, RecognizedPage};

/// Vertical-pixel slack for deciding two fragments are on the same line.
pub const LINE_DITHER: i32 = 10;

/// Build the cumulative candidate-line superset for a recognized page.
///
/// Applied in order: raw lines of the primary text block, adjacent-pair
/// joins, wide-column joins, then small-table joins.
pub fn candidate_lines(page: &RecognizedPage) -> Vec<String> {
    let mut lines: Vec<String> = page.text.split('\n').map(str::to_string).collect();
    let lowered: Vec<String> = lines.iter().map(|l| l.to_lowercase()).collect();
    lines.extend(lowered);

    let mut lines = join_following(&lines);

    for block in [
        join_wide_columns(&page.fragments),
        join_small_tables(&page.fragments),
    ] {
        let mut block = block;
        let lowered: Vec<String> = block.iter().map(|l| l.to_lowercase()).collect();
        block.extend(lowered);
        lines.extend(block);
    }

    debug!(count = lines.len(), "built candidate lines");
    lines
}

/// Concatenate each line with its immediate successor, to bridge a field
/// label split across two recognizer-reported lines.
pub fn join_following(lines: &[String]) -> Vec<String> {
    let mut out = lines.to_vec();
    for pair in lines.windows(2) {
        out.push(format!("{} {}", pair[0], pair[1]));
    }
    out
}

/// Sort a finished run of fragments by their in-line coordinate, join
/// the texts, and reset the run for the next group.
fn flush_run(run: &mut Vec<(i32, &str)>) -> String {
    run.sort_by_key(|&(pos, _)| pos);
    let line = run
        .iter()
        .map(|&(_, text)| text)
        .collect::<Vec<_>>()
        .join(" ");
    run.clear();
    line
}

/// Join fragments that sit on the same approximate line into one string
/// per line, catching wide columns separated by large white space.
///
/// Fragments are sorted once by vertical then horizontal position; a
/// single linear pass groups a fragment into the current line while it
/// stays within [`LINE_DITHER`] of the line's last-seen vertical
/// position, and starts a new line otherwise. Each finished line joins
/// left to right, so a fragment sitting a few pixels above its left
/// neighbor still reads after it.
pub fn join_wide_columns(fragments: &[Fragment]) -> Vec<String> {
    let mut entries: Vec<(i32, i32, &str)> = fragments
        .iter()
        .filter_map(|f| {
            let anchor = f.anchor()?;
            Some((anchor.y, anchor.x, f.text.as_str()))
        })
        .collect();
    if entries.is_empty() {
        return Vec::new();
    }
    entries.sort_unstable_by_key(|&(y, x, _)| (y, x));

    let mut out = Vec::new();
    let mut line = vec![(entries[0].1, entries[0].2)];
    let mut last_y = entries[0].0;
    for &(y, x, text) in &entries[1..] {
        if (y - last_y).abs() > LINE_DITHER {
            out.push(flush_run(&mut line));
        }
        line.push((x, text));
        last_y = y;
    }
    out.push(flush_run(&mut line));
    out
}

/// Join fragments stacked vertically in the same column, catching small
/// label/value tables (a header with its value printed underneath).
///
/// Columns are detected by horizontal overlap with a tolerance of half
/// the preceding fragment's width; each finished column joins in
/// top-to-bottom order, so a value printed a few pixels left of its
/// label still reads after it.
pub fn join_small_tables(fragments: &[Fragment]) -> Vec<String> {
    let mut entries: Vec<(i32, i32, i32, &str)> = fragments
        .iter()
        .filter_map(|f| {
            let anchor = f.anchor()?;
            let width = f.width()?;
            Some((anchor.x, anchor.y, width, f.text.as_str()))
        })
        .collect();
    if entries.is_empty() {
        return Vec::new();
    }
    entries.sort_unstable_by_key(|&(x, y, _, _)| (x, y));

    let mut out = Vec::new();
    let mut column = vec![(entries[0].1, entries[0].3)];
    let mut last_x = entries[0].0;
    let mut last_w = entries[0].2;
    for &(x, y, w, text) in &entries[1..] {
        if x < last_x - last_w / 2 || x > last_x + last_w / 2 {
            out.push(flush_run(&mut column));
        }
        column.push((y, text));
        last_x = x;
        last_w = w;
    }
    out.push(flush_run(&mut column));
    out
}
