use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::watchdog::TerminalState;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn state_cell(state: TerminalState) -> Cell {
    match state {
        TerminalState::Succeeded => Cell::new("passed").fg(TableColor::Green),
        TerminalState::NoPipeline => Cell::new("no pipeline").fg(TableColor::Yellow),
        TerminalState::FailedThreshold => Cell::new("retries exhausted").fg(TableColor::Red),
        TerminalState::FailedSettled => Cell::new("failed").fg(TableColor::Red),
        TerminalState::FailedException => Cell::new("error").fg(TableColor::Red),
        TerminalState::FailedTimeout => Cell::new("timed out").fg(TableColor::Red),
    }
}

pub fn color_coded_retries_cell(retries: u32, threshold: u32) -> Cell {
    let text = retries.to_string();
    if retries == 0 {
        Cell::new(text).fg(TableColor::Green)
    } else if retries < threshold.max(1) {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Red)
    }
}
