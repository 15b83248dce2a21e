use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::schedule::{label_text, ScheduleGrid};

const ROOM_HEADER: &str = "Room";
const COLUMN_GAP: &str = "  ";

/// Renders the grid as a left-aligned text table: a `Room` column followed
/// by one column per time slot. Empty cells are left blank.
pub fn format_grid(grid: &ScheduleGrid) -> String {
    let mut header: Vec<&str> = vec![ROOM_HEADER];
    header.extend(grid.times.iter().map(|t| label_text(t.as_ref())));

    let body: Vec<Vec<&str>> = grid
        .rows
        .iter()
        .map(|row| {
            let mut line = vec![label_text(row.room.as_ref())];
            line.extend(row.cells.iter().map(|c| label_text(c.as_ref())));
            line
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for line in &body {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for line in std::iter::once(&header).chain(body.iter()) {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        let _ = writeln!(out, "{}", cells.join(COLUMN_GAP).trim_end());
    }
    out
}

/// Prints the grid with a short summary line.
pub fn print_grid(grid: &ScheduleGrid) {
    println!("\n=== Generated Schedule ===");
    if grid.is_empty() {
        println!("(no assignments)");
        return;
    }
    let occupied: usize = grid.rows.iter().map(|r| r.cells.iter().flatten().count()).sum();
    println!(
        "{} room(s) x {} time slot(s), {} assignment(s)\n",
        grid.rooms.len(),
        grid.times.len(),
        occupied
    );
    print!("{}", format_grid(grid));
}

/// Writes the formatted grid to `path`.
pub fn write_grid_to_file(grid: &ScheduleGrid, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(format_grid(grid).as_bytes())
}
