//! Report handlers: daily, weekly and monthly aggregates.

use chrono::{Datelike, Utc};
use tabled::Tabled;

use valet_core::{DailyReport, MonthlyReport, PeriodStats, WeeklyReport, money};

use crate::cli::{GlobalOpts, ReportArgs, ReportCommand};
use crate::error::CliError;
use crate::output::{self, Palette};

use super::util::{self, Lot};

#[derive(Tabled)]
struct PeriodRow {
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "Exits")]
    exits: usize,
    #[tabled(rename = "Payments")]
    payments: usize,
    #[tabled(rename = "Revenue")]
    revenue: String,
}

impl PeriodRow {
    fn new(period: String, stats: &PeriodStats) -> Self {
        Self {
            period,
            entries: stats.entries,
            exits: stats.exits,
            payments: stats.payments,
            revenue: money::format(stats.revenue),
        }
    }
}

fn table(rows: Vec<PeriodRow>) -> String {
    tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string()
}

fn totals(stats: &PeriodStats, palette: Palette) -> Vec<(&'static str, String)> {
    vec![
        ("Entries", stats.entries.to_string()),
        ("Exits", stats.exits.to_string()),
        ("Payments", stats.payments.to_string()),
        ("Revenue", palette.amount(&money::format(stats.revenue))),
    ]
}

fn daily_detail(r: &DailyReport, palette: Palette) -> String {
    let mut pairs = vec![("Date", r.date.to_string())];
    pairs.extend(totals(&r.stats, palette));
    pairs.push((
        "Peak hour",
        r.peak_hour.map_or_else(
            || "-".into(),
            |h| format!("{h:02}:00-{:02}:00 UTC ({} entries)", h + 1, r.peak_entries),
        ),
    ));
    pairs.push(("Occupied now", r.occupied_spots.to_string()));
    output::detail_lines(&pairs)
}

fn weekly_detail(r: &WeeklyReport, palette: Palette) -> String {
    let rows = r
        .days
        .iter()
        .map(|d| PeriodRow::new(format!("{} {}", d.weekday, d.date), &d.stats))
        .collect();
    let mut pairs = vec![(
        "Week",
        format!("{}-W{:02} ({} to {})", r.iso_year, r.week, r.start, r.end),
    )];
    pairs.extend(totals(&r.totals, palette));
    pairs.push(("Daily average", money::format(r.average_daily_revenue)));
    format!("{}\n{}", table(rows), output::detail_lines(&pairs))
}

fn monthly_detail(r: &MonthlyReport, palette: Palette) -> String {
    let rows = r
        .weeks
        .iter()
        .map(|w| PeriodRow::new(w.label(), &w.stats))
        .collect();
    let mut pairs = vec![(
        "Month",
        format!("{}-{:02} ({} to {})", r.year, r.month, r.start, r.end),
    )];
    pairs.extend(totals(&r.totals, palette));
    pairs.push(("Weekly average", money::format(r.average_weekly_revenue)));
    format!("{}\n{}", table(rows), output::detail_lines(&pairs))
}

pub fn handle(lot: &Lot, args: &ReportArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let format = global.format();
    let palette = Palette::new(&global.color_mode());
    let today = Utc::now().date_naive();

    let out = match &args.command {
        ReportCommand::Daily { date } => {
            let date = util::date_or_today("date", date.as_deref())?;
            let report = lot.engine.daily_report(date);
            output::render_single(
                &format,
                &report,
                |r| daily_detail(r, palette),
                |r| format!("{:.2}", r.stats.revenue),
            )
        }

        ReportCommand::Weekly { year, week } => {
            let current = today.iso_week();
            let report = lot.engine.weekly_report(
                year.unwrap_or_else(|| current.year()),
                week.unwrap_or_else(|| current.week()),
            )?;
            output::render_single(
                &format,
                &report,
                |r| weekly_detail(r, palette),
                |r| format!("{:.2}", r.totals.revenue),
            )
        }

        ReportCommand::Monthly { year, month } => {
            let report = lot.engine.monthly_report(
                year.unwrap_or_else(|| today.year()),
                month.unwrap_or_else(|| today.month()),
            )?;
            output::render_single(
                &format,
                &report,
                |r| monthly_detail(r, palette),
                |r| format!("{:.2}", r.totals.revenue),
            )
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
