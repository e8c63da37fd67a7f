//! Rate table handlers.

use valet_core::{Command as CoreCommand, RateTable, money};

use crate::cli::{GlobalOpts, RatesArgs, RatesCommand, RatesSetArgs};
use crate::error::CliError;
use crate::output;

use super::util::Lot;

fn percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

fn detail(r: &RateTable) -> String {
    output::detail_lines(&[
        ("First hour", money::format(r.first_hour)),
        ("Additional hour", money::format(r.additional_hour)),
        ("Daily cap", money::format(r.daily)),
        ("Accessible discount", percent(r.accessible_discount)),
        ("VIP discount", percent(r.vip_discount)),
        ("Nightly plan", money::format(r.nightly)),
        ("Monthly plan", money::format(r.monthly)),
    ])
}

/// Overlay the given flags on the current table. `None` when no flag was set.
fn apply(current: RateTable, args: &RatesSetArgs) -> Option<RateTable> {
    let RatesSetArgs {
        first_hour,
        additional_hour,
        daily,
        accessible_discount,
        vip_discount,
        nightly,
        monthly,
    } = *args;

    let given = [
        first_hour,
        additional_hour,
        daily,
        accessible_discount,
        vip_discount,
        nightly,
        monthly,
    ];
    if given.iter().all(Option::is_none) {
        return None;
    }

    Some(RateTable {
        first_hour: first_hour.unwrap_or(current.first_hour),
        additional_hour: additional_hour.unwrap_or(current.additional_hour),
        daily: daily.unwrap_or(current.daily),
        accessible_discount: accessible_discount.unwrap_or(current.accessible_discount),
        vip_discount: vip_discount.unwrap_or(current.vip_discount),
        nightly: nightly.unwrap_or(current.nightly),
        monthly: monthly.unwrap_or(current.monthly),
    })
}

pub fn handle(lot: &Lot, args: &RatesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        RatesCommand::Show => {}

        RatesCommand::Set(set) => {
            let rates = apply(lot.engine.rates(), set).ok_or_else(|| CliError::Validation {
                field: "rates".into(),
                reason: "give at least one rate to change, e.g. --first-hour 18".into(),
            })?;
            lot.execute(CoreCommand::UpdateRates { rates })?;
            output::notice("Rate table updated", global.quiet);
        }
    }

    let rates = lot.engine.rates();
    let out = output::render_single(&global.format(), &rates, detail, |r| {
        format!("{:.2}", r.first_hour)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
