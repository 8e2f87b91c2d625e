//! Text cleanup between HTML extraction and chunking
//!
//! Extracted page text carries layout noise: runs of whitespace, repeated
//! navigation lines, and menu labels stuttered once per list item. Cleaning
//! is purely textual; no HTML awareness lives here.

/// Cleans extracted page text
///
/// - whitespace runs inside a line collapse to a single space
/// - runs of blank lines collapse to one (paragraph breaks survive)
/// - consecutive identical lines are deduplicated
/// - a token repeated three or more times in a row collapses to one
pub fn clean_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut prev_blank = false;

    for line in raw.lines() {
        let collapsed = collapse_whitespace(line);

        if collapsed.is_empty() {
            if !prev_blank && !lines.is_empty() {
                lines.push(String::new());
                prev_blank = true;
            }
            continue;
        }
        prev_blank = false;

        let collapsed = collapse_token_runs(&collapsed);
        if lines.last().map(|l| l == &collapsed).unwrap_or(false) {
            continue;
        }
        lines.push(collapsed);
    }

    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }

    lines.join("\n")
}

/// Collapses internal whitespace runs and trims the line
fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses runs of three or more identical tokens to a single token
fn collapse_token_runs(line: &str) -> String {
    let tokens: Vec<&str> = line.split(' ').collect();
    let mut out: Vec<&str> = Vec::with_capacity(tokens.len());

    let mut i = 0;
    while i < tokens.len() {
        let mut run = 1;
        while i + run < tokens.len() && tokens[i + run] == tokens[i] {
            run += 1;
        }
        if run >= 3 {
            out.push(tokens[i]);
        } else {
            out.extend(std::iter::repeat(tokens[i]).take(run));
        }
        i += run;
    }

    out.join(" ")
}
