pub mod types;
pub mod grid;

pub use types::{label_text, AssignmentRecord, Label, SolverResponse};
pub use grid::{build_grid, build_grid_strict, find_duplicates, DuplicateSlot, GridRow, ScheduleGrid};
