//! Spot command handlers: listing, check-in/out, administration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tabled::Tabled;

use valet_config::Config;
use valet_core::{
    ClientInfo, Command as CoreCommand, CommandResult, FeeQuote, InventorySummary, OccupyReceipt,
    ParkingSpot, ReleaseReceipt, Sector, SpotFilter, SpotId, SpotStatus, SpotType, Vehicle,
    money,
};

use crate::cli::{
    GlobalOpts, SectorArg, SpotListArgs, SpotTypeArg, SpotsArgs, SpotsCommand, StatusArg,
};
use crate::error::CliError;
use crate::output::{self, Palette};

use super::util::{self, Lot};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SpotRow {
    #[tabled(rename = "Spot")]
    spot: u32,
    #[tabled(rename = "Sector")]
    sector: String,
    #[tabled(rename = "Type")]
    spot_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Plate")]
    plate: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Since")]
    since: String,
}

impl SpotRow {
    fn new(spot: &ParkingSpot, palette: Palette) -> Self {
        Self {
            spot: spot.number,
            sector: spot.sector.to_string(),
            spot_type: spot.spot_type.to_string(),
            status: palette.status(&spot.status.to_string()),
            plate: spot.vehicle().map(|v| v.plate.clone()).unwrap_or_default(),
            client: spot.client().map(|c| c.name.clone()).unwrap_or_default(),
            since: spot.entry_time().map(short_time).unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct SectorRow {
    #[tabled(rename = "Sector")]
    sector: String,
    #[tabled(rename = "Total")]
    total: usize,
    #[tabled(rename = "Available")]
    available: usize,
    #[tabled(rename = "Occupied")]
    occupied: usize,
    #[tabled(rename = "Reserved")]
    reserved: usize,
}

fn short_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

// ── Detail views ────────────────────────────────────────────────────

fn spot_detail(spot: &ParkingSpot, quote: Option<&FeeQuote>, palette: Palette) -> String {
    let mut pairs = vec![
        ("Spot", spot.number.to_string()),
        ("Sector", spot.sector.label().to_owned()),
        ("Type", spot.spot_type.to_string()),
        ("Location", spot.location.to_string()),
        (
            "Size",
            format!("{:.1} x {:.1} m", spot.size.width, spot.size.length),
        ),
        ("Features", spot.features.join(", ")),
        ("Status", palette.status(&spot.status.to_string())),
    ];
    if let Some(occupancy) = &spot.occupancy {
        let v = &occupancy.vehicle;
        pairs.push(("Plate", v.plate.clone()));
        if !v.model.is_empty() || !v.color.is_empty() {
            pairs.push(("Vehicle", format!("{} {}", v.model, v.color).trim().to_owned()));
        }
        pairs.push((
            "Client",
            format!("{} (#{})", occupancy.client.name, occupancy.client.id),
        ));
        pairs.push(("Since", short_time(occupancy.entry_time)));
    }
    if let Some(q) = quote {
        pairs.push(("Parked", format!("{:.2} h", q.hours)));
        pairs.push(("Due now", palette.amount(&money::format(q.fee))));
    }
    if !spot.notes.is_empty() {
        pairs.push(("Notes", spot.notes.clone()));
    }
    output::detail_lines(&pairs)
}

fn occupy_detail(r: &OccupyReceipt) -> String {
    let mut pairs = vec![
        ("Spot", format!("{} (sector {}, {})", r.spot, r.sector, r.spot_type)),
        ("Plate", r.vehicle.plate.clone()),
        ("Client", format!("{} (#{})", r.client.name, r.client.id)),
        ("Entry", short_time(r.entry_time)),
    ];
    if r.returning_client {
        pairs.push(("Note", "returning client".to_owned()));
    }
    output::detail_lines(&pairs)
}

fn release_detail(r: &ReleaseReceipt, palette: Palette) -> String {
    output::detail_lines(&[
        ("Spot", format!("{} (sector {}, {})", r.spot, r.sector, r.spot_type)),
        ("Plate", r.vehicle.plate.clone()),
        ("Client", format!("{} (#{})", r.client.name, r.client.id)),
        ("Entry", short_time(r.entry_time)),
        ("Exit", short_time(r.exit_time)),
        ("Duration", format!("{:.2} h", r.hours)),
        ("Fee", palette.amount(&money::format(r.fee))),
    ])
}

fn quote_detail(q: &FeeQuote, palette: Palette) -> String {
    output::detail_lines(&[
        ("Spot", format!("{} ({})", q.spot, q.spot_type)),
        ("Plate", q.plate.clone()),
        ("Entry", short_time(q.entry_time)),
        ("Duration", format!("{:.2} h", q.hours)),
        ("Fee", palette.amount(&money::format(q.fee))),
    ])
}

fn summary_detail(summary: &InventorySummary, palette: Palette) -> String {
    let rows: Vec<SectorRow> = summary
        .by_sector
        .iter()
        .map(|(sector, counts)| SectorRow {
            sector: sector.to_string(),
            total: counts.total,
            available: counts.available,
            occupied: counts.occupied,
            reserved: counts.reserved,
        })
        .collect();
    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();

    let overall = output::detail_lines(&[
        ("Total", summary.overall.total.to_string()),
        ("Available", summary.overall.available.to_string()),
        ("Occupied", summary.overall.occupied.to_string()),
        ("Reserved", summary.overall.reserved.to_string()),
        ("Occupancy", format!("{:.1}%", summary.occupancy_percent)),
        ("Accessible free", summary.accessible_free.to_string()),
        ("VIP free", summary.vip_free.to_string()),
    ]);
    format!("{table}\n{}", palette.dim(&overall))
}

// ── Filters ─────────────────────────────────────────────────────────

fn filters(args: &SpotListArgs) -> Vec<SpotFilter> {
    let mut filters = Vec::new();
    if let Some(status) = args.status {
        filters.push(SpotFilter::ByStatus(match status {
            StatusArg::Available => SpotStatus::Available,
            StatusArg::Occupied => SpotStatus::Occupied,
            StatusArg::Reserved => SpotStatus::Reserved,
        }));
    }
    if let Some(sector) = args.sector {
        filters.push(SpotFilter::BySector(match sector {
            SectorArg::A => Sector::A,
            SectorArg::B => Sector::B,
            SectorArg::C => Sector::C,
            SectorArg::D => Sector::D,
        }));
    }
    if let Some(spot_type) = args.spot_type {
        filters.push(SpotFilter::ByType(match spot_type {
            SpotTypeArg::Regular => SpotType::Regular,
            SpotTypeArg::Accessible => SpotType::Accessible,
            SpotTypeArg::Vip => SpotType::Vip,
        }));
    }
    if let Some(plate) = &args.plate {
        filters.push(SpotFilter::Plate(plate.clone()));
    }
    filters
}

// ── Result rendering ────────────────────────────────────────────────

fn render_result(result: &CommandResult, global: &GlobalOpts, palette: Palette) -> String {
    let format = global.format();
    match result {
        CommandResult::Occupied(r) => {
            output::render_single(&format, r, occupy_detail, |r| r.spot.to_string())
        }
        CommandResult::Released(r) => output::render_single(
            &format,
            r,
            |r| release_detail(r, palette),
            |r| format!("{:.2}", r.fee),
        ),
        CommandResult::Spot(spot) => output::render_single(
            &format,
            spot.as_ref(),
            |s| spot_detail(s, None, palette),
            |s| s.status.to_string(),
        ),
        CommandResult::Ok => String::new(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(
    lot: &Lot,
    args: &SpotsArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let palette = Palette::new(&global.color_mode());
    let format = global.format();

    match &args.command {
        SpotsCommand::List(list) => {
            let filters = filters(list);
            let spots: Vec<Arc<ParkingSpot>> = lot
                .engine
                .spots()
                .iter()
                .filter(|s| filters.iter().all(|f| f.matches(s)))
                .cloned()
                .collect();
            let out = output::render_list(
                &format,
                &spots,
                |s| SpotRow::new(s, palette),
                |s| s.number.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SpotsCommand::Get { spot } => {
            let spot = lot.engine.spot(SpotId(*spot))?;
            let quote = spot
                .is_occupied()
                .then(|| lot.engine.quote(spot.id, Utc::now()))
                .transpose()?;
            let out = output::render_single(
                &format,
                spot.as_ref(),
                |s| spot_detail(s, quote.as_ref(), palette),
                |s| s.status.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SpotsCommand::Occupy(occupy) => {
            let now = util::timestamp_or_now(occupy.at.as_deref())?;
            let result = lot.execute_at(
                CoreCommand::Occupy {
                    spot: SpotId(occupy.spot),
                    vehicle: Vehicle::new(&occupy.plate, &occupy.model, &occupy.vehicle_color),
                    client: ClientInfo::new(&occupy.name, &occupy.phone),
                },
                now,
            )?;
            output::print_output(&render_result(&result, global, palette), global.quiet);
            Ok(())
        }

        SpotsCommand::Release { spot, at } => {
            let now = util::timestamp_or_now(at.as_deref())?;
            let result = lot.execute_at(CoreCommand::Release { spot: SpotId(*spot) }, now)?;
            output::print_output(&render_result(&result, global, palette), global.quiet);
            Ok(())
        }

        SpotsCommand::Quote { spot, at } => {
            let now = util::timestamp_or_now(at.as_deref())?;
            let quote = lot.engine.quote(SpotId(*spot), now)?;
            let out = output::render_single(
                &format,
                &quote,
                |q| quote_detail(q, palette),
                |q| format!("{:.2}", q.fee),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SpotsCommand::Reserve { spot } => {
            let result = lot.execute(CoreCommand::Reserve { spot: SpotId(*spot) })?;
            output::notice(&format!("Spot {spot} reserved"), global.quiet);
            output::print_output(&render_result(&result, global, palette), global.quiet);
            Ok(())
        }

        SpotsCommand::Unreserve { spot } => {
            let result = lot.execute(CoreCommand::Unreserve { spot: SpotId(*spot) })?;
            output::notice(&format!("Spot {spot} back in circulation"), global.quiet);
            output::print_output(&render_result(&result, global, palette), global.quiet);
            Ok(())
        }

        SpotsCommand::Regenerate { from_file } => {
            let layout = match from_file {
                Some(path) => util::read_layout_file(path)?,
                None => cfg.layout(),
            };
            let occupied = lot.engine.summary().overall.occupied;
            let prompt = if occupied > 0 {
                format!(
                    "Regenerate {} spots? {occupied} parked vehicle(s) will be dropped",
                    layout.total_spots()
                )
            } else {
                format!("Regenerate {} spots?", layout.total_spots())
            };
            if !util::confirm(&prompt, "spots regenerate", global.yes)? {
                return Err(CliError::Aborted);
            }

            let total = layout.total_spots();
            lot.execute(CoreCommand::RegenerateSpots { layout })?;
            output::notice(&format!("Generated {total} spots"), global.quiet);
            Ok(())
        }

        SpotsCommand::Summary => {
            let summary = lot.engine.summary();
            let out = output::render_single(
                &format,
                &summary,
                |s| summary_detail(s, palette),
                |s| format!("{:.1}", s.occupancy_percent),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

