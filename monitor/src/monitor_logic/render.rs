//! Terminal rendering of the visible fleet.

use std::future::Future;

use colored::*;
use fleet_common::core::{battery_indicator, map_markers, status_color, status_label, BatteryIndicator, StatusColor};
use fleet_common::ingestors::ConnectionState;
use fleet_common::{RobotRecord, VisibleSet, VisibleView};
use tokio::sync::watch;

const HEADER: &str = "ROBOT ID         STATUS    BATTERY   CPU     RAM (MB)  LOCATION";

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.*}", precision, v))
}

/// One table row, uncoloured.
pub fn format_row(record: &RobotRecord) -> String {
    let battery_icon = match battery_indicator(record) {
        BatteryIndicator::Critical => "!",
        BatteryIndicator::Healthy => " ",
    };
    let location = record
        .location
        .map_or_else(|| "-".to_string(), |p| format!("{:.4}, {:.4}", p.lat, p.lon));

    format!(
        "{:<16} {:<9} {}{:>6.1}%  {:>6}  {:>8}  {}",
        record.id.as_str(),
        status_label(record),
        battery_icon,
        record.battery_percentage,
        optional(record.cpu_usage, 1),
        optional(record.ram_consumption_mb, 0),
        location
    )
}

fn paint(line: String, color: StatusColor) -> ColoredString {
    match color {
        StatusColor::Alert => line.bright_red(),
        StatusColor::Low => line.bright_yellow(),
        StatusColor::Normal => line.bright_green(),
    }
}

pub fn format_footer(set: &VisibleSet, connection: ConnectionState) -> String {
    format!(
        "{} robots shown, {} on map | channel {:?} | Last Updated: {}",
        set.robots.len(),
        map_markers(&set.robots).len(),
        connection,
        set.updated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Prints the whole table to stdout.
pub fn print_view(set: &VisibleSet, connection: ConnectionState) {
    println!();
    println!("{}", HEADER.bold());
    if set.robots.is_empty() {
        println!("{}", "(no robots match the current filters)".truecolor(128, 128, 128));
    }
    for record in &set.robots {
        println!("{}", paint(format_row(record), status_color(record)));
    }
    println!("{}", format_footer(set, connection).truecolor(128, 128, 128));
}

/// Draws once, then again whenever the visible set or the channel state
/// changes, until `stop` resolves or a source goes away.
pub async fn follow<F>(
    view: &mut VisibleView,
    connection: &mut watch::Receiver<ConnectionState>,
    stop: impl Future<Output = ()>,
    mut draw: F,
) where
    F: FnMut(&VisibleSet, ConnectionState),
{
    draw(&view.current(), *connection.borrow_and_update());
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            set = view.changed() => match set {
                Some(set) => draw(&set, *connection.borrow()),
                None => break,
            },
            res = connection.changed() => {
                if res.is_err() {
                    break;
                }
                let state = *connection.borrow_and_update();
                log::debug!("Channel state: {:?}", state);
                draw(&view.current(), state);
            }
        }
    }
}
