use crate::extraction::SearchSummary;
use crate::job_store::JobStats;
use crate::scoring::ScoringSummary;
use crate::sheets::SyncSummary;
use clap::builder::styling::{AnsiColor, Color as AnsiStyleColor, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

fn ansi(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(AnsiStyleColor::Ansi(color)))
}

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(ansi(AnsiColor::Cyan).bold().underline())
        .header(ansi(AnsiColor::Cyan).bold().underline())
        .literal(ansi(AnsiColor::Green).bold())
        .invalid(ansi(AnsiColor::Red).bold())
        .error(ansi(AnsiColor::Red).bold())
        .placeholder(ansi(AnsiColor::BrightBlack))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::Rgb { r, g, b }
    }

    pub const FRAME: Color = rgb(0, 255, 255);
    pub const BULLET: Color = rgb(180, 100, 255);
    pub const ACCENT: Color = rgb(255, 0, 255);
    pub const OK: Color = rgb(0, 255, 136);
    pub const WARN: Color = rgb(255, 165, 0);
    pub const FAIL: Color = rgb(255, 85, 85);
    pub const LABEL: Color = rgb(128, 128, 128);
    pub const VALUE: Color = rgb(255, 255, 255);
}

const BOX_WIDTH: usize = 60;
const HORIZONTAL: &str = "─";

// ═══════════════════════════════════════════════════════════════════════════════
// Status Lines
// ═══════════════════════════════════════════════════════════════════════════════

fn status_line(symbol: &str, color: Color, message: &str) -> String {
    format!(" {} {}", symbol.with(color).bold(), message.with(color))
}

pub fn print_success(message: &str) {
    println!("{}", status_line("✓", colors::OK, message));
}

pub fn print_warning(message: &str) {
    println!("{}", status_line("⚠", colors::WARN, message));
}

pub fn print_error(message: &str) {
    eprintln!("{}", status_line("✗", colors::FAIL, message));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Summary Boxes
// ═══════════════════════════════════════════════════════════════════════════════

/// One row of a summary box.
enum Row<'a> {
    Plain(&'a str, String),
    /// The figure the run is about.
    Key(&'a str, String),
}

fn top_border(title: &str) -> String {
    let inner = title.width() + 2;
    let left = BOX_WIDTH.saturating_sub(inner) / 2;
    let right = BOX_WIDTH.saturating_sub(inner + left);
    format!(
        "{}{} {} {}{}",
        "╭".with(colors::FRAME),
        HORIZONTAL.repeat(left).with(colors::FRAME),
        title.with(colors::FRAME).bold().attribute(Attribute::Italic),
        HORIZONTAL.repeat(right).with(colors::FRAME),
        "╮".with(colors::FRAME)
    )
}

fn bottom_border() -> String {
    format!(
        "{}{}{}",
        "╰".with(colors::FRAME),
        HORIZONTAL.repeat(BOX_WIDTH).with(colors::FRAME),
        "╯".with(colors::FRAME)
    )
}

fn print_box(title: &str, rows: &[Row<'_>]) {
    println!();
    println!("{}", top_border(title));
    for row in rows {
        match row {
            Row::Plain(label, value) => println!(
                "  {} {} {}",
                "●".with(colors::BULLET),
                format!("{}:", label).with(colors::LABEL),
                value.as_str().with(colors::VALUE)
            ),
            Row::Key(label, value) => println!(
                "  {} {} {}",
                "◆".with(colors::ACCENT),
                format!("{}:", label).with(colors::FRAME).bold(),
                value.as_str().with(colors::OK).bold()
            ),
        }
    }
    println!("{}", bottom_border());
    println!();
}

pub fn print_search_summary(summary: &SearchSummary) {
    print_box(
        "Job Search",
        &[
            Row::Plain(
                "Searches",
                format!(
                    "{} completed, {} abandoned",
                    summary.pairs_searched, summary.pairs_failed
                ),
            ),
            Row::Plain("Cards seen", summary.cards_seen.to_string()),
            Row::Key("New jobs stored", summary.persisted.to_string()),
            Row::Plain("Partially extracted", summary.partial.to_string()),
            Row::Plain("Already known", summary.skipped_known.to_string()),
            Row::Plain("Without job id", summary.skipped_no_id.to_string()),
            Row::Plain("Failed", summary.failed.to_string()),
        ],
    );
}

pub fn print_scoring_summary(summary: &ScoringSummary) {
    print_box(
        "Job Scoring",
        &[
            Row::Plain("Batches", summary.batches.to_string()),
            Row::Key("Scored", summary.scored.to_string()),
            Row::Plain("Skipped (no description)", summary.skipped.to_string()),
            Row::Plain("Failed", summary.failed.to_string()),
        ],
    );
}

pub fn print_sync_summary(summary: &SyncSummary) {
    print_box(
        "Sheet Sync",
        &[
            Row::Key("Appended", summary.appended.to_string()),
            Row::Key("Updated", summary.updated.to_string()),
            Row::Plain("Unchanged", summary.unchanged.to_string()),
            Row::Plain("Passes", summary.passes.to_string()),
        ],
    );
}

pub fn print_stats(db_path: &str, stats: &JobStats) {
    print_box(
        "Job Database",
        &[
            Row::Plain("Database", db_path.to_string()),
            Row::Key("Total jobs", stats.total.to_string()),
            Row::Plain("Unscored", stats.unscored.to_string()),
            Row::Plain("Pending sync", stats.pending_sync.to_string()),
        ],
    );
}
