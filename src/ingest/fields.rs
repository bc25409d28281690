//! Column maps: for each source entity, which field feeds which column.

use chrono::NaiveDate;
use serde_json::Value;
use sportsdb_api::Field;
use sportsdb_api::extract::{BIRTHPLACE, FieldSpec};

/// Post-processing applied to an extracted field before it becomes a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Raw,
    /// Render scalars as text (ids arrive as numbers from some providers).
    Text,
    /// Leading `YYYY-MM-DD` of a date or timestamp string.
    Date,
    /// Text with a unit appended, e.g. `"4 years"`.
    Suffix(&'static str),
}

impl Format {
    pub fn apply(self, field: Field) -> Value {
        match self {
            Format::Raw => field.into_column(),
            Format::Text => field.as_text().map(Value::String).unwrap_or(Value::Null),
            Format::Date => field
                .as_text()
                .and_then(|text| parse_date(&text))
                .map(|d| Value::String(d.to_string()))
                .unwrap_or(Value::Null),
            Format::Suffix(unit) => field
                .as_text()
                .map(|text| Value::String(format!("{text}{unit}")))
                .unwrap_or(Value::Null),
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let day = text.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub field: FieldSpec,
    pub format: Format,
}

const fn col(name: &'static str, field: FieldSpec) -> Column {
    Column { name, field, format: Format::Raw }
}

const fn fmt(name: &'static str, field: FieldSpec, format: Format) -> Column {
    Column { name, field, format }
}

const fn plain(key: &'static str) -> FieldSpec {
    FieldSpec::plain(key)
}

const fn link(key: &'static str) -> FieldSpec {
    FieldSpec::reference(key)
}

// ---------------------------------------------------------------------------
// ESPN core
// ---------------------------------------------------------------------------

pub const ESPN_SEASON: &[Column] = &[
    col("year", plain("year")),
    fmt("startdate", plain("startDate"), Format::Date),
    fmt("enddate", plain("endDate"), Format::Date),
];

pub const ESPN_TEAM: &[Column] = &[
    fmt("id", plain("id"), Format::Text),
    col("name", plain("name")),
    col("color", plain("color")),
    col("city", plain("location")),
    col("record", link("record")),
    col("venue", link("venue")),
    col("groups", link("groups")),
    col("ranks", link("ranks")),
    col("statistics", link("statistics")),
    col("leaders", link("leaders")),
    col("links", plain("links")),
    col("injuries", link("injuries")),
    col("notes", link("notes")),
    col("againstthespreadrecords", link("againstTheSpreadRecords")),
    col("franchise", link("franchise")),
    col("events", link("events")),
    col("transactions", link("transactions")),
    col("coaches", link("coaches")),
    col("attendance", link("attendance")),
];

pub const ESPN_PLAYER: &[Column] = &[
    fmt("id", plain("id"), Format::Text),
    col("sport", plain("type")),
    col("fullname", plain("fullName")),
    col("weight", plain("weight")),
    col("height", plain("height")),
    col("age", plain("age")),
    col("dob", plain("dateOfBirth")),
    col("debuteyear", plain("debutYear")),
    col("links", plain("links")),
    col("birthplace", plain(BIRTHPLACE)),
    col("college", link("college")),
    fmt("jersey", plain("jersey"), Format::Text),
    col("position", FieldSpec::nested("position", "abbreviation")),
    col("injuries", link("injuries")),
    col("statistics", link("statistics")),
    col("notes", link("notes")),
    col("contracts", link("contracts")),
    fmt("experience", FieldSpec::nested("experience", "years"), Format::Suffix(" years")),
    col("collegeathlete", link("collegeAthlete")),
    col("active", plain("active")),
    col("eventlog", link("eventLog")),
    col("status", FieldSpec::nested("status", "name")),
];

/// Read from the athlete record; `teamid` comes from the linked draft team.
pub const ESPN_DRAFT: &[Column] = &[
    col("year", FieldSpec::nested("draft", "year")),
    col("round", FieldSpec::nested("draft", "round")),
    col("selection", FieldSpec::nested("draft", "selection")),
];

/// Link from an athlete to the team that drafted them.
pub const ESPN_DRAFT_TEAM: FieldSpec = FieldSpec::nested_reference("draft", "team");

// ---------------------------------------------------------------------------
// api-sports
// ---------------------------------------------------------------------------

pub const APISPORTS_LEAGUE: &[Column] = &[
    col("name", FieldSpec::nested("league", "name")),
    col("country", FieldSpec::nested("country", "name")),
];

pub const APISPORTS_SEASON: &[Column] = &[
    col("year", plain("year")),
    fmt("startdate", plain("start"), Format::Date),
    fmt("enddate", plain("end"), Format::Date),
    col("current", plain("current")),
];

pub const APISPORTS_TEAM: &[Column] = &[
    fmt("id", plain("id"), Format::Text),
    col("name", plain("name")),
    col("country", FieldSpec::nested("country", "name")),
    col("city", plain("city")),
    col("coach", plain("coach")),
    col("owner", plain("owner")),
    col("stadium", plain("stadium")),
    col("established", plain("established")),
];
