//! Client command handlers.

use std::sync::Arc;

use tabled::Tabled;

use valet_core::{Client, ClientFilter, ClientId, money};

use crate::cli::{ClientsArgs, ClientsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Palette};

use super::util::Lot;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Phone")]
    phone: String,
    #[tabled(rename = "Plate")]
    plate: String,
    #[tabled(rename = "Visits")]
    visits: u32,
    #[tabled(rename = "Spent")]
    spent: String,
    #[tabled(rename = "Last visit")]
    last_visit: String,
}

impl From<&Arc<Client>> for ClientRow {
    fn from(c: &Arc<Client>) -> Self {
        Self {
            id: c.id.0,
            name: c.name.clone(),
            phone: c.phone.clone(),
            plate: c.vehicle.as_ref().map(|v| v.plate.clone()).unwrap_or_default(),
            visits: c.visits,
            spent: money::format(c.total_spent),
            last_visit: c
                .last_visit
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

fn detail(c: &Client, palette: Palette) -> String {
    let mut pairs = vec![
        ("ID", c.id.to_string()),
        ("Name", c.name.clone()),
        ("Phone", if c.phone.is_empty() { "-".into() } else { c.phone.clone() }),
    ];
    if let Some(v) = &c.vehicle {
        pairs.push(("Plate", v.plate.clone()));
        if !v.model.is_empty() {
            pairs.push(("Model", v.model.clone()));
        }
        if !v.color.is_empty() {
            pairs.push(("Color", v.color.clone()));
        }
    }
    pairs.extend([
        ("Visits", c.visits.to_string()),
        ("Total spent", palette.amount(&money::format(c.total_spent))),
        ("Avg ticket", money::format(c.average_ticket())),
        ("Registered", c.registered_at.format("%Y-%m-%d").to_string()),
        (
            "Last visit",
            c.last_visit
                .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
        ),
    ]);
    output::detail_lines(&pairs)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(lot: &Lot, args: &ClientsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let format = global.format();

    match &args.command {
        ClientsCommand::List { name, plate } => {
            let mut filters = Vec::new();
            if let Some(name) = name {
                filters.push(ClientFilter::Name(name.clone()));
            }
            if let Some(plate) = plate {
                filters.push(ClientFilter::Plate(plate.clone()));
            }

            let clients: Vec<Arc<Client>> = lot
                .engine
                .clients()
                .iter()
                .filter(|c| filters.iter().all(|f| f.matches(c)))
                .cloned()
                .collect();
            let out = output::render_list(
                &format,
                &clients,
                |c| ClientRow::from(c),
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Get { id } => {
            let client = lot.engine.client(ClientId(*id))?;
            let palette = Palette::new(&global.color_mode());
            let out = output::render_single(
                &format,
                client.as_ref(),
                |c| detail(c, palette),
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
