//! Activity log handlers.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tabled::Tabled;

use valet_core::{ActivityFilter, ActivityKind, ActivityRecord};

use crate::cli::{ActivityArgs, ActivityCommand, GlobalOpts, KindArg};
use crate::error::CliError;
use crate::output;

use super::util::{self, Lot};

#[derive(Tabled)]
struct ActivityRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Spot")]
    spot: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&ActivityRecord> for ActivityRow {
    fn from(r: &ActivityRecord) -> Self {
        Self {
            id: r.id.0,
            time: r.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            kind: r.kind.to_string(),
            spot: r.spot_number.map(|n| n.to_string()).unwrap_or_default(),
            title: r.title.clone(),
            description: r.description.clone(),
        }
    }
}

fn kind(arg: KindArg) -> ActivityKind {
    match arg {
        KindArg::Entry => ActivityKind::Entry,
        KindArg::Exit => ActivityKind::Exit,
        KindArg::Payment => ActivityKind::Payment,
        KindArg::System => ActivityKind::System,
    }
}

pub fn handle(lot: &Lot, args: &ActivityArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        ActivityCommand::List {
            kind: kind_arg,
            spot,
            date,
            limit,
        } => {
            let mut filters = Vec::new();
            if let Some(k) = kind_arg {
                filters.push(ActivityFilter::Kind(kind(*k)));
            }
            if let Some(n) = spot {
                filters.push(ActivityFilter::Spot(*n));
            }
            if let Some(raw) = date {
                let day = util::parse_date("date", raw)?;
                let start: DateTime<Utc> = day.and_time(NaiveTime::MIN).and_utc();
                filters.push(ActivityFilter::Between(start, start + Duration::days(1)));
            }

            let records: Vec<ActivityRecord> = lot
                .engine
                .activities()
                .recent(usize::MAX)
                .into_iter()
                .filter(|r| filters.iter().all(|f| f.matches(r)))
                .take(*limit)
                .map(|r| r.as_ref().clone())
                .collect();

            let out = output::render_list(
                &global.format(),
                &records,
                |r| ActivityRow::from(r),
                |r| r.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
