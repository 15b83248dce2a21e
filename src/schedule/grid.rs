use std::cmp::Ordering;
use std::collections::HashMap;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use super::types::{label_text, AssignmentRecord, Label};
use crate::error::{Result, SchedulaError};

/// One room's line in the grid. `cells[i]` holds the course for `times[i]`
/// of the owning [`ScheduleGrid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub room: Option<Label>,
    pub cells: Vec<Option<Label>>,
}

/// Room × time view of a solver assignment list.
///
/// Derived only through [`build_grid`]; rebuild it whenever the source list
/// changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleGrid {
    pub rooms: Vec<Option<Label>>,
    pub times: Vec<Option<Label>>,
    pub rows: Vec<GridRow>,
}

/// A (room, time) pair claimed by more than one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSlot {
    pub room: Option<Label>,
    pub time: Option<Label>,
    /// Course from the first matching record, the one the grid shows.
    pub kept: Option<Label>,
    /// Courses of the later records, in input order.
    pub shadowed: Vec<Option<Label>>,
}

/// Present labels in text order, missing ones last.
fn axis_order(a: &Option<Label>, b: &Option<Label>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sorted_axis<'a>(values: impl Iterator<Item = &'a Option<Label>>) -> Vec<Option<Label>> {
    let mut axis: Vec<Option<Label>> = values.cloned().collect();
    axis.sort_by(axis_order);
    axis.dedup();
    axis
}

type SlotKey<'a> = (Option<&'a Label>, Option<&'a Label>);

/// Builds the room × time grid for `records`.
///
/// Rooms and times are the distinct values of the input, sorted ascending.
/// When several records share a (room, time) pair the first one in input
/// order fills the cell and the rest are ignored.
pub fn build_grid(records: &[AssignmentRecord]) -> ScheduleGrid {
    let rooms = sorted_axis(records.iter().map(|r| &r.room));
    let times = sorted_axis(records.iter().map(|r| &r.time));

    let mut index: HashMap<SlotKey<'_>, Option<&Label>> = HashMap::with_capacity(records.len());
    for record in records {
        index
            .entry((record.room.as_ref(), record.time.as_ref()))
            .or_insert(record.course.as_ref());
    }

    let rows = rooms
        .iter()
        .map(|room| GridRow {
            room: room.clone(),
            cells: times
                .iter()
                .map(|time| {
                    index
                        .get(&(room.as_ref(), time.as_ref()))
                        .and_then(|course| course.cloned())
                })
                .collect(),
        })
        .collect();

    ScheduleGrid { rooms, times, rows }
}

/// Lists every (room, time) pair that more than one record claims, in the
/// order the pairs first appear.
pub fn find_duplicates(records: &[AssignmentRecord]) -> Vec<DuplicateSlot> {
    let mut seen: HashMap<SlotKey<'_>, usize> = HashMap::new();
    let mut slots: Vec<DuplicateSlot> = Vec::new();
    let mut first_course: HashMap<SlotKey<'_>, Option<&Label>> = HashMap::new();

    for record in records {
        let key = (record.room.as_ref(), record.time.as_ref());
        match first_course.get(&key) {
            None => {
                first_course.insert(key, record.course.as_ref());
            }
            Some(kept) => {
                let at = *seen.entry(key).or_insert_with(|| {
                    slots.push(DuplicateSlot {
                        room: record.room.clone(),
                        time: record.time.clone(),
                        kept: kept.cloned(),
                        shadowed: Vec::new(),
                    });
                    slots.len() - 1
                });
                slots[at].shadowed.push(record.course.clone());
            }
        }
    }

    slots
}

/// Like [`build_grid`] but refuses assignment lists that put two courses in
/// the same room and time.
pub fn build_grid_strict(records: &[AssignmentRecord]) -> Result<ScheduleGrid> {
    let duplicates = find_duplicates(records);
    if !duplicates.is_empty() {
        return Err(SchedulaError::DuplicateAssignment(duplicates));
    }
    Ok(build_grid(records))
}

impl ScheduleGrid {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn time_index(&self, time: Option<&Label>) -> Option<usize> {
        self.times.iter().position(|t| t.as_ref() == time)
    }

    /// Course at (`room`, `time`), or `None` for an empty or unknown cell.
    pub fn cell(&self, room: Option<&Label>, time: Option<&Label>) -> Option<&Label> {
        let column = self.time_index(time)?;
        self.rows
            .iter()
            .find(|row| row.room.as_ref() == room)
            .and_then(|row| row.cells[column].as_ref())
    }
}

impl GridRow {
    pub fn course_at<'a>(&'a self, grid: &ScheduleGrid, time: Option<&Label>) -> Option<&'a Label> {
        let column = grid.time_index(time)?;
        self.cells.get(column).and_then(Option::as_ref)
    }
}

/// `cells` as a `{ time: course }` object with empty cells left out.
///
/// A missing time is keyed `""`, the same as a present empty time. Only the
/// first of the two is written, which is the present one since missing
/// times sort last.
struct RowCells<'a> {
    times: &'a [Option<Label>],
    cells: &'a [Option<Label>],
}

impl Serialize for RowCells<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut blank_written = false;
        let entries: Vec<(&str, &Label)> = self
            .times
            .iter()
            .zip(self.cells)
            .filter_map(|(time, course)| Some((label_text(time.as_ref()), course.as_ref()?)))
            .filter(|(key, _)| {
                if !key.is_empty() {
                    return true;
                }
                !std::mem::replace(&mut blank_written, true)
            })
            .collect();

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (time, course) in entries {
            map.serialize_entry(time, course)?;
        }
        map.end()
    }
}

struct RowView<'a> {
    times: &'a [Option<Label>],
    row: &'a GridRow,
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GridRow", 2)?;
        state.serialize_field("room", label_text(self.row.room.as_ref()))?;
        state.serialize_field(
            "cells",
            &RowCells {
                times: self.times,
                cells: &self.row.cells,
            },
        )?;
        state.end()
    }
}

impl Serialize for ScheduleGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let rooms: Vec<&str> = self.rooms.iter().map(|r| label_text(r.as_ref())).collect();
        let times: Vec<&str> = self.times.iter().map(|t| label_text(t.as_ref())).collect();
        let rows: Vec<RowView<'_>> = self
            .rows
            .iter()
            .map(|row| RowView {
                times: &self.times,
                row,
            })
            .collect();

        let mut state = serializer.serialize_struct("ScheduleGrid", 3)?;
        state.serialize_field("rooms", &rooms)?;
        state.serialize_field("times", &times)?;
        state.serialize_field("rows", &rows)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> Option<Label> {
        Some(Label::from(s))
    }

    #[test]
    fn empty_input_gives_empty_grid() {
        let grid = build_grid(&[]);
        assert!(grid.rooms.is_empty());
        assert!(grid.times.is_empty());
        assert!(grid.rows.is_empty());
        assert!(grid.is_empty());
    }

    #[test]
    fn two_rooms_one_time() {
        let records = vec![
            AssignmentRecord::new(101, "MWF9", "cs101"),
            AssignmentRecord::new(115, "MWF9", "cs412"),
        ];
        let grid = build_grid(&records);

        assert_eq!(grid.rooms, vec![label("101"), label("115")]);
        assert_eq!(grid.times, vec![label("MWF9")]);
        assert_eq!(
            grid.rows,
            vec![
                GridRow { room: label("101"), cells: vec![label("cs101")] },
                GridRow { room: label("115"), cells: vec![label("cs412")] },
            ]
        );
    }

    #[test]
    fn first_match_wins_on_duplicate_slot() {
        let records = vec![
            AssignmentRecord::new(101, "MWF9", "cs101"),
            AssignmentRecord::new(101, "MWF9", "cs102"),
        ];
        let grid = build_grid(&records);
        assert_eq!(grid.cell(label("101").as_ref(), label("MWF9").as_ref()), label("cs101").as_ref());
        assert_eq!(grid.rows.len(), 1);
    }

    #[test]
    fn axes_are_sorted_and_deduplicated() {
        let records = vec![
            AssignmentRecord::new(200, "TT9", "cs630"),
            AssignmentRecord::new(101, "MWF9", "cs101"),
            AssignmentRecord::new(115, "TT9", "cs412"),
            AssignmentRecord::new(101, "TT10:30", "cs220"),
            AssignmentRecord::new(200, "MWF9", "cs612"),
        ];
        let grid = build_grid(&records);

        assert_eq!(grid.rooms, vec![label("101"), label("115"), label("200")]);
        assert_eq!(grid.times, vec![label("MWF9"), label("TT10:30"), label("TT9")]);
        for axis in [&grid.rooms, &grid.times] {
            assert!(axis.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn unoccupied_cells_are_empty() {
        let records = vec![
            AssignmentRecord::new(101, "MWF9", "cs101"),
            AssignmentRecord::new(115, "TT9", "cs412"),
        ];
        let grid = build_grid(&records);

        assert_eq!(grid.rows[0].cells, vec![label("cs101"), None]);
        assert_eq!(grid.rows[1].cells, vec![None, label("cs412")]);
        assert_eq!(grid.rows[0].course_at(&grid, label("TT9").as_ref()), None);
        assert_eq!(grid.rows[1].course_at(&grid, label("TT9").as_ref()), label("cs412").as_ref());
    }

    #[test]
    fn missing_fields_degrade_to_empty_values() {
        let records = vec![
            AssignmentRecord::new(101, "MWF9", "cs101"),
            AssignmentRecord { room: label("101"), time: label("TT9"), course: None },
            AssignmentRecord { room: None, time: label("MWF9"), course: label("cs999") },
        ];
        let grid = build_grid(&records);

        assert_eq!(grid.rooms, vec![label("101"), None]);
        assert_eq!(grid.rows[0].cells, vec![label("cs101"), None]);
        assert_eq!(grid.rows[1].room, None);
        assert_eq!(grid.rows[1].cells, vec![label("cs999"), None]);
    }

    #[test]
    fn input_is_left_untouched() {
        let records = vec![
            AssignmentRecord::new(200, "TT9", "cs630"),
            AssignmentRecord::new(101, "MWF9", "cs101"),
        ];
        let before = records.clone();
        let _ = build_grid(&records);
        assert_eq!(records, before);
    }

    #[test]
    fn duplicates_are_reported_with_winner() {
        let records = vec![
            AssignmentRecord::new(101, "MWF9", "cs101"),
            AssignmentRecord::new(115, "MWF9", "cs412"),
            AssignmentRecord::new(101, "MWF9", "cs102"),
            AssignmentRecord::new(101, "MWF9", "cs110"),
        ];
        let duplicates = find_duplicates(&records);

        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].room, label("101"));
        assert_eq!(duplicates[0].kept, label("cs101"));
        assert_eq!(duplicates[0].shadowed, vec![label("cs102"), label("cs110")]);
    }

    #[test]
    fn strict_builder_rejects_duplicates() {
        let clean = vec![AssignmentRecord::new(101, "MWF9", "cs101")];
        assert!(build_grid_strict(&clean).is_ok());

        let clashing = vec![
            AssignmentRecord::new(101, "MWF9", "cs101"),
            AssignmentRecord::new(101, "MWF9", "cs102"),
        ];
        match build_grid_strict(&clashing) {
            Err(SchedulaError::DuplicateAssignment(slots)) => assert_eq!(slots.len(), 1),
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn numeric_rooms_sort_as_text() {
        let records = vec![
            AssignmentRecord::new(20, "MWF9", "cs101"),
            AssignmentRecord::new(101, "MWF9", "cs412"),
        ];
        let grid = build_grid(&records);

        assert_eq!(grid.rooms, vec![label("101"), label("20")]);
        assert_eq!(grid.rows[0].cells, vec![label("cs412")]);
        assert_eq!(grid.rows[1].cells, vec![label("cs101")]);
    }

    #[test]
    fn blank_and_missing_time_share_one_cell_key() {
        let records = vec![
            AssignmentRecord { room: label("101"), time: None, course: label("cs999") },
            AssignmentRecord::new(101, "", "cs101"),
        ];
        let grid = build_grid(&records);
        assert_eq!(grid.times, vec![label(""), None]);
        assert_eq!(grid.rows[0].cells, vec![label("cs101"), label("cs999")]);

        let text = serde_json::to_string(&grid).unwrap();
        assert_eq!(text.matches(r#""":"#).count(), 1);
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["rows"][0]["cells"], serde_json::json!({ "": "cs101" }));
    }

    #[test]
    fn serializes_cells_keyed_by_time() {
        let records = vec![
            AssignmentRecord::new(101, "MWF9", "cs101"),
            AssignmentRecord::new(115, "TT9", "cs412"),
        ];
        let json = serde_json::to_value(build_grid(&records)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "rooms": ["101", "115"],
                "times": ["MWF9", "TT9"],
                "rows": [
                    { "room": "101", "cells": { "MWF9": "cs101" } },
                    { "room": "115", "cells": { "TT9": "cs412" } },
                ],
            })
        );
    }
}
