use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::WriterBuilder;
use serde::Deserialize;

use crate::error::Result;
use crate::schedule::{label_text, AssignmentRecord};

pub const CSV_FILENAME: &str = "schedule.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv;charset=utf-8";
pub const TEMPLATE_CONTENT_TYPE: &str = "text/plain";
pub const CSV_HEADER: &str = "Room,Time,Course";

const FORMAT1_TEMPLATE: &str = "rooms\n101 : 25\n115 : 50\n200 : 250 ;\ncourses\ncs101, cs102, cs110, cs120, cs220, cs412, cs430, cs612, cs630 ;\ntimes\nMWF9, MWF10, MWF11, MWF2, TT9, TT10:30, TT2, TT3:30 ;";

const FORMAT2_TEMPLATE: &str = "course   enrollment   preferences\ncs101    180          MWF9, MWF10, MWF11, TT9\ncs412    80           MWF9, TT9, TT10:30\ncs612    35\ncs630    40\n";

/// Bytes ready to hand to the user, with the name and MIME type they should
/// be saved under. Producing one has no side effects; the caller decides
/// where the bytes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Download {
    fn new(filename: &str, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            body,
        }
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        out.write_all(&self.body)?;
        out.flush()?;
        Ok(())
    }

    /// Writes the artifact as `dir/<filename>` and returns the full path.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.filename);
        self.write_to(File::create(&path)?)?;
        Ok(path)
    }
}

/// How the schedule CSV is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvStyle {
    /// Fields joined with bare commas. A value containing a comma or a
    /// newline produces a malformed row.
    #[default]
    Legacy,
    /// RFC 4180 quoting of fields that need it.
    Quoted,
}

/// Writes `records` as `Room,Time,Course` lines in input order, without
/// any quoting. Missing fields are written as empty text.
pub fn export_csv(records: &[AssignmentRecord]) -> Download {
    let mut content = String::with_capacity(CSV_HEADER.len() + 1 + records.len() * 24);
    content.push_str(CSV_HEADER);
    content.push('\n');
    for record in records {
        content.push_str(label_text(record.room.as_ref()));
        content.push(',');
        content.push_str(label_text(record.time.as_ref()));
        content.push(',');
        content.push_str(label_text(record.course.as_ref()));
        content.push('\n');
    }
    Download::new(CSV_FILENAME, CSV_CONTENT_TYPE, content.into_bytes())
}

/// Same rows as [`export_csv`], but fields holding commas, quotes or line
/// breaks are quoted so the file stays parseable.
pub fn export_csv_quoted(records: &[AssignmentRecord]) -> Result<Download> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::with_capacity(records.len() * 24));

    wtr.write_record(CSV_HEADER.split(','))?;
    for record in records {
        wtr.write_record([
            label_text(record.room.as_ref()),
            label_text(record.time.as_ref()),
            label_text(record.course.as_ref()),
        ])?;
    }

    let body = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(Download::new(CSV_FILENAME, CSV_CONTENT_TYPE, body))
}

pub fn export_csv_with(records: &[AssignmentRecord], style: CsvStyle) -> Result<Download> {
    match style {
        CsvStyle::Legacy => Ok(export_csv(records)),
        CsvStyle::Quoted => export_csv_quoted(records),
    }
}

/// The two example input files offered for download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Rooms with capacities, course list and time slots.
    Format1,
    /// Course enrollments and time preferences.
    Format2,
}

impl TemplateKind {
    pub fn filename(self) -> &'static str {
        match self {
            TemplateKind::Format1 => "schedule_format.txt",
            TemplateKind::Format2 => "schedule_format_file2.txt",
        }
    }

    pub fn content(self) -> &'static str {
        match self {
            TemplateKind::Format1 => FORMAT1_TEMPLATE,
            TemplateKind::Format2 => FORMAT2_TEMPLATE,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateKind::Format1 => f.write_str("format1"),
            TemplateKind::Format2 => f.write_str("format2"),
        }
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "format1" | "1" => Ok(TemplateKind::Format1),
            "format2" | "2" => Ok(TemplateKind::Format2),
            other => Err(format!("unknown template '{}' (expected format1 or format2)", other)),
        }
    }
}

pub fn export_template(kind: TemplateKind) -> Download {
    Download::new(kind.filename(), TEMPLATE_CONTENT_TYPE, kind.content().as_bytes().to_vec())
}
