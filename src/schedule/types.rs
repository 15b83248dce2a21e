use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A room, time-slot or course identifier as the solver sent it.
///
/// Rooms often arrive as JSON numbers (`101`) while times and courses are
/// strings; both are kept in their textual form so that ordering is the
/// plain lexicographic order of what gets displayed.
///
/// The original JSON type is not kept: the number `101` and the string
/// `"101"` decode to the same label, so they share one grid row and one
/// `(room, time)` slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(String);

impl Label {
    pub fn new(value: impl Into<String>) -> Self {
        Label(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label(value)
    }
}

impl From<i32> for Label {
    fn from(value: i32) -> Self {
        Label(value.to_string())
    }
}

impl From<u32> for Label {
    fn from(value: u32) -> Self {
        Label(value.to_string())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Shapes a label may take on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawLabel::deserialize(deserializer)? {
            RawLabel::Text(s) => Label(s),
            RawLabel::Number(n) => Label(n.to_string()),
            RawLabel::Flag(b) => Label(b.to_string()),
        })
    }
}

/// One (room, time, course) triple produced by the solver.
///
/// Nothing upstream validates these, so every field may be absent or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssignmentRecord {
    #[serde(default)]
    pub room: Option<Label>,
    #[serde(default)]
    pub time: Option<Label>,
    #[serde(default)]
    pub course: Option<Label>,
}

impl AssignmentRecord {
    pub fn new(room: impl Into<Label>, time: impl Into<Label>, course: impl Into<Label>) -> Self {
        Self {
            room: Some(room.into()),
            time: Some(time.into()),
            course: Some(course.into()),
        }
    }
}

/// Body of a successful solver response. Extra fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SolverResponse {
    #[serde(default)]
    pub schedule: Option<Vec<AssignmentRecord>>,
}

/// Text used wherever a missing label has to be shown or written.
pub fn label_text(label: Option<&Label>) -> &str {
    label.map(Label::as_str).unwrap_or("")
}
