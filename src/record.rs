use serde_json::{Map, Value};
use std::fmt;

/// Tables the ingesters write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    SampleData,
    Users,
    Leagues,
    Seasons,
    SeasonTeams,
    Teams,
    Players,
    Drafts,
}

/// Foreign key: `columns` of the owning table must match `target` columns of
/// an existing row in `table`.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub columns: &'static [&'static str],
    pub table: Table,
    pub target: &'static [&'static str],
}

const TEAM_COLUMNS: &[&str] = &[
    "id",
    "league",
    "sport",
    "name",
    "color",
    "country",
    "city",
    "coach",
    "owner",
    "stadium",
    "established",
    "record",
    "venue",
    "groups",
    "ranks",
    "statistics",
    "leaders",
    "links",
    "injuries",
    "notes",
    "againstthespreadrecords",
    "franchise",
    "events",
    "transactions",
    "coaches",
    "attendance",
];

const PLAYER_COLUMNS: &[&str] = &[
    "id",
    "sport",
    "fullname",
    "weight",
    "height",
    "age",
    "dob",
    "debuteyear",
    "links",
    "birthplace",
    "college",
    "jersey",
    "position",
    "injuries",
    "statistics",
    "notes",
    "contracts",
    "experience",
    "collegeathlete",
    "active",
    "eventlog",
    "status",
];

impl Table {
    pub const ALL: [Table; 8] = [
        Table::SampleData,
        Table::Users,
        Table::Leagues,
        Table::Seasons,
        Table::SeasonTeams,
        Table::Teams,
        Table::Players,
        Table::Drafts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::SampleData => "sample_data",
            Table::Users => "users",
            Table::Leagues => "leagues",
            Table::Seasons => "seasons",
            Table::SeasonTeams => "seasonteams",
            Table::Teams => "teams",
            Table::Players => "players",
            Table::Drafts => "drafts",
        }
    }

    /// The fixed column set every record for this table carries.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::SampleData => &["player_name", "player_sport"],
            Table::Users => &["id", "notifications", "notify_frequency"],
            Table::Leagues => &["sport", "name", "country"],
            Table::Seasons => &["league", "year", "startdate", "enddate", "current"],
            Table::SeasonTeams => &["teams_id", "league", "year"],
            Table::Teams => TEAM_COLUMNS,
            Table::Players => PLAYER_COLUMNS,
            Table::Drafts => &["league", "year", "teamid", "playerid", "round", "selection"],
        }
    }

    /// Upsert conflict target. Empty means rows are only ever inserted.
    pub fn conflict_key(self) -> &'static [&'static str] {
        match self {
            Table::SampleData => &[],
            Table::Users => &["id"],
            Table::Leagues => &["name"],
            Table::Seasons => &["league", "year"],
            Table::SeasonTeams => &["league", "year", "teams_id"],
            Table::Teams => &["league", "id"],
            Table::Players => &["id"],
            Table::Drafts => &["league", "playerid"],
        }
    }

    pub fn foreign_keys(self) -> &'static [ForeignKey] {
        match self {
            Table::SeasonTeams => &[ForeignKey {
                columns: &["league", "teams_id"],
                table: Table::Teams,
                target: &["league", "id"],
            }],
            Table::Drafts => &[
                ForeignKey {
                    columns: &["league", "teamid"],
                    table: Table::Teams,
                    target: &["league", "id"],
                },
                ForeignKey {
                    columns: &["playerid"],
                    table: Table::Players,
                    target: &["id"],
                },
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownColumn {
    pub table: Table,
    pub column: String,
}

impl fmt::Display for UnknownColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table {} has no column {}", self.table, self.column)
    }
}

impl std::error::Error for UnknownColumn {}

/// One row headed for the store: exactly the table's columns, unset ones
/// `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    table: Table,
    values: Map<String, Value>,
}

impl FlatRecord {
    pub fn new(table: Table) -> Self {
        let values = table
            .columns()
            .iter()
            .map(|c| ((*c).to_owned(), Value::Null))
            .collect();
        Self { table, values }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<(), UnknownColumn> {
        match self.values.get_mut(column) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(UnknownColumn { table: self.table, column: column.to_owned() }),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Values of `columns`, or `None` if any of them is `null`.
    pub fn values_of(&self, columns: &[&str]) -> Option<Vec<Value>> {
        columns
            .iter()
            .map(|c| self.values.get(*c).filter(|v| !v.is_null()).cloned())
            .collect()
    }

    /// Conflict-key values; `None` when part of the key is missing.
    pub fn key(&self) -> Option<Vec<Value>> {
        self.values_of(self.table.conflict_key())
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.values.clone())
    }

    #[cfg(test)]
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
