use std::collections::HashMap;
use std::fmt::Write as _;

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::ReportConfig;
use crate::interactive::SpinnerExt as _;
use crate::testing::{
    parser::ParsedDocument, Band, CaseResult, GroupResult, JudgeCode, Resolution,
    ResolutionError, ScoreListener, SessionResult, SourcedDiagnostic, TestCase, TestGroup,
};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for JudgeCode {
    fn color(&self) -> Color {
        use JudgeCode::*;
        if !self::is_truecolor_supported() {
            return match self {
                AC => Color::Green,
                WA => Color::Yellow,
                TLE => Color::Red,
                RE => Color::Magenta,
                SKIP => Color::BrightBlack,
            };
        }

        match self {
            AC => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WA => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            TLE => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            RE => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
            SKIP => Color::TrueColor {
                r: 110,
                g: 110,
                b: 110,
            },
        }
    }
}

impl ColorTheme for Band {
    fn color(&self) -> Color {
        match self {
            Band::Excellent => Color::BrightGreen,
            Band::Good => Color::Green,
            Band::Average => Color::Yellow,
            Band::NeedsImprovement => Color::BrightRed,
        }
    }
}

pub fn judge_icon(judge: JudgeCode) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {:<4}", judge.to_string())
        .on_color(judge.color())
        .bold()
        .color(fg)
}

/// One-line preview: newlines shown as `⏎`, cut to `width` characters with `...`.
pub fn preview(text: &str, width: usize) -> String {
    let one_line = text.trim().replace("\r\n", "\n").replace('\n', "⏎");
    if one_line.chars().count() <= width {
        return one_line;
    }
    let mut cut: String = one_line.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

fn fmt_mark(m: f64) -> String {
    if m.fract() == 0.0 {
        format!("{:.0}", m)
    } else {
        format!("{}", m)
    }
}

fn terminal_cols() -> usize {
    let (cols, _) = terminal::size().unwrap_or((60, 40));
    cols.max(20) as usize
}

const BOLD_LINE: &str = "━";
const THIN_LINE: &str = "─";

pub fn case_line(res: &CaseResult) -> String {
    let time = res
        .execution
        .as_ref()
        .map(|e| format!(" [{}ms]", e.execution_time.as_millis()))
        .unwrap_or_default();
    format!(
        "{} {} {}/{}{}",
        res.name.bold(),
        judge_icon(res.judge),
        fmt_mark(res.earned),
        fmt_mark(res.max_mark),
        time.dimmed(),
    )
}

pub fn print_case_previews(res: &CaseResult, width: usize) {
    let t = &res.testcase;
    let actual = res.execution.as_ref().map(|e| e.stdout.as_str());

    println!("    {}   {}", "input".dimmed(), preview(&t.input, width));
    println!("    {}  {}", "expect".dimmed(), preview(&t.expected_output, width));
    if let Some(actual) = actual {
        println!("    {}  {}", "actual".dimmed(), preview(actual, width));
    }
    if let Some(reason) = res.failure_reason() {
        let reason: String = reason.chars().take(100).collect();
        println!("    {}  {}", "reason".dimmed(), reason.bright_red());
    }
}

pub fn print_group_header(group: &TestGroup, resolution: Result<&Resolution, &ResolutionError>) {
    let title = format!("{} ", group.id);
    let cols = terminal_cols();
    println!(
        "\n{}{}",
        title.bright_yellow().bold(),
        THIN_LINE
            .repeat(cols.saturating_sub(title.chars().count()))
            .bright_black(),
    );
    match resolution {
        Ok(r) => println!(
            "{} {} ({})",
            "Running".cyan(),
            r.executable.display_name().bold(),
            r.strategy
        ),
        Err(e) => println!("{} {}", "Skipped:".bright_red().bold(), e),
    }
}

fn status_icon(earned: f64, total: f64) -> ColoredString {
    if total > 0.0 && earned >= total {
        "✔".green().bold()
    } else if earned <= 0.0 {
        "✘".bright_red().bold()
    } else {
        "◐".yellow().bold()
    }
}

pub fn group_summary_line(res: &GroupResult) -> String {
    format!(
        "{} {}: {}/{} ({:.1}%)",
        status_icon(res.earned, res.total),
        res.id.to_string().bold(),
        fmt_mark(res.earned),
        fmt_mark(res.total),
        res.percentage(),
    )
}

pub fn print_session_summary(res: &SessionResult) {
    print!("{}", render_session_summary(res, terminal_cols()));
}

/// Per-group lines with each case under its group, then the total and the verdict histogram.
pub fn render_session_summary(res: &SessionResult, cols: usize) -> String {
    let mut out = String::new();
    let bar = BOLD_LINE.repeat(cols).blue().bold();
    let _ = writeln!(out, "\n{}", bar);

    for g in &res.groups {
        let _ = writeln!(out, "{}", group_summary_line(g));
        if let Some(e) = &g.resolution_error {
            let _ = writeln!(out, "  {} {}", "Skipped:".bright_red(), e);
        }
        for c in &g.cases {
            let _ = writeln!(out, "  {}", case_line(c));
        }
    }

    let count: HashMap<JudgeCode, usize> = res.cases().fold(HashMap::new(), |mut count, c| {
        *count.entry(c.judge).or_default() += 1;
        count
    });
    let mut judges: Vec<_> = count.into_iter().collect();
    judges.sort_by_key(|&(judge, _)| judge as u8);
    let detail_msg = judges
        .iter()
        .map(|&(judge, cnt)| {
            format!(
                "{}{}{}",
                self::judge_icon(judge),
                "x".dimmed(),
                cnt.to_string().bold().bright_white(),
            )
        })
        .collect::<Vec<String>>()
        .join(", ");

    let band = res.band();
    let _ = writeln!(
        out,
        "\n{} {}/{} ({:.1}%)  {}",
        "Total".bold(),
        fmt_mark(res.earned),
        fmt_mark(res.total),
        res.percentage(),
        band.to_string().color(band.color()).bold(),
    );
    if !detail_msg.is_empty() {
        let _ = writeln!(out, "{}", detail_msg);
    }
    let _ = writeln!(out, "{}", bar);
    out
}

/// Expected vs actual line by line, highlighting trailing whitespace.
pub fn print_failure_detail(res: &CaseResult) {
    let Some(exec) = &res.execution else {
        return
    };
    let cols = terminal_cols();

    fn print_sub_title(s: &str, cols: usize) {
        println!(
            "{}{}",
            s.cyan().bold(),
            THIN_LINE
                .repeat(cols.saturating_sub(s.len() + 1))
                .bright_black(),
        )
    }

    fn print_lines(text: &str) {
        let lines: Vec<_> = text.lines().collect();
        if lines.is_empty() {
            println!("{}", "<EMPTY>".magenta().dimmed());
            return;
        }
        for line in lines {
            let trimmed = line.trim_end();
            print!("{}", trimmed);

            let num_trailing_whitespace = line.len() - trimmed.len();
            if num_trailing_whitespace > 0 {
                print!(
                    "{}{}",
                    " ".repeat(num_trailing_whitespace).on_red(),
                    "(Trailing whitespace)".bright_red().bold()
                );
            }
            println!();
        }
    }

    let rule = res.testcase.compare_rule();
    print_sub_title(
        &format!(
            "[expected] remove_spaces={} case_sensitive={}",
            rule.remove_spaces, rule.case_sensitive
        ),
        cols,
    );
    print_lines(&res.testcase.expected_output);

    print_sub_title("[actual]", cols);
    print_lines(&exec.stdout);

    if !exec.stderr.is_empty() {
        print_sub_title("[stderr]", cols);
        print!("{}", exec.stderr);
    }
}

pub fn print_diagnostics(diagnostics: &[SourcedDiagnostic]) {
    for d in diagnostics {
        println!("{} {}", "warning:".bright_yellow().bold(), d);
    }
}

pub fn print_parsed_document(doc: &ParsedDocument, width: usize) {
    fn print_case(t: &TestCase, width: usize) {
        let name = if t.name.is_empty() {
            "(case)"
        } else {
            t.name.as_str()
        };
        println!(
            "  {} mark={} remove_spaces={} case_sensitive={}",
            name.bold(),
            fmt_mark(t.mark),
            t.remove_spaces,
            t.case_sensitive,
        );
        println!("    {}   {}", "input".dimmed(), preview(&t.input, width));
        println!("    {}  {}", "expect".dimmed(), preview(&t.expected_output, width));
    }

    for g in &doc.groups {
        println!(
            "{} ({} cases, {} marks)",
            g.id.to_string().bright_yellow().bold(),
            g.cases.len(),
            fmt_mark(g.total_mark())
        );
        for t in &g.cases {
            print_case(t, width);
        }
    }
    for d in &doc.diagnostics {
        println!("{} {}", "warning:".bright_yellow().bold(), d);
    }
}

/// Prints progress and per-case results while a session is scored.
pub struct ConsoleReporter {
    cfg: ReportConfig,
    spinner: Option<ProgressBar>,
    spinner_style: ProgressStyle,
}

impl ConsoleReporter {
    pub fn new(cfg: ReportConfig) -> Self {
        Self {
            cfg,
            spinner: None,
            spinner_style: ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        }
    }
}

impl ScoreListener for ConsoleReporter {
    fn group_started(
        &mut self,
        group: &TestGroup,
        resolution: Result<&Resolution, &ResolutionError>,
    ) {
        print_group_header(group, resolution);
    }

    fn case_started(&mut self, case: &TestCase) {
        let bar = ProgressBar::new_spinner()
            .with_style(self.spinner_style.clone())
            .with_message(format!("{} ...", case.name));
        self.spinner = Some(bar.with_ticking());
    }

    fn case_finished(&mut self, res: &CaseResult) {
        // The spinner lives on stderr and is hidden when that is not a terminal.
        if let Some(bar) = self.spinner.take() {
            bar.finish_and_clear();
        }
        println!("  {}", case_line(res));
        print_case_previews(res, self.cfg.preview_width);
        if res.judge == JudgeCode::WA && self.cfg.show_failure_detail {
            print_failure_detail(res);
        }
    }
}
