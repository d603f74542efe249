use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use enumset::EnumSet;

use crate::{
    core::{accumulator::Accumulators, period::Period, sensor::Sensor},
    refresh::RefreshState,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

pub fn build_readings_table(sensors: &[Sensor], state: &RefreshState) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Sensor", "Value", "Unit"]);
    for sensor in sensors {
        let reading = state.read(sensor);
        let mut value_cell = match reading.value {
            Some(value) => Cell::new(format!("{value:.2}")),
            None => Cell::new("unknown").fg(Color::DarkGrey),
        };
        if !reading.available {
            value_cell = value_cell.add_attribute(Attribute::Dim);
        }
        table.add_row(vec![
            match sensor {
                Sensor::Key { .. } => Cell::new(sensor.name()),
                Sensor::Derived(_) => Cell::new(sensor.name()).add_attribute(Attribute::Italic),
            },
            value_cell.set_alignment(CellAlignment::Right),
            Cell::new(sensor.unit().map(|unit| unit.to_string()).unwrap_or_default())
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_accumulators_table(accumulators: &Accumulators, periods: EnumSet<Period>) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Accumulator", "Energy", "Since"]);
    for accumulator in accumulators.iter() {
        table.add_row(vec![
            Cell::new(accumulator.key),
            Cell::new(accumulator.energy()).set_alignment(CellAlignment::Right),
            Cell::new(accumulator.last_reset().format("%b %d %H:%M")).add_attribute(Attribute::Dim),
        ]);
    }
    for period in periods {
        if let Some(efficiency) = accumulators.battery_efficiency(period) {
            table.add_row(vec![
                Cell::new(format!("battery_efficiency_{period}")).add_attribute(Attribute::Italic),
                Cell::new(format!("{efficiency:.1} %")).set_alignment(CellAlignment::Right),
                Cell::new(""),
            ]);
        }
    }
    table
}
