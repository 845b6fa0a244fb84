//! Registry of IDO history tables and their time columns.
//!
//! Mirrors the tables the Icinga 2 IDO connection cleans up itself
//! (`DbConnection::CleanUpHandler()`), each paired with the column holding the
//! row's relevant timestamp. The order of this list is the order in which a
//! cleanup round visits the tables.

/// Default table name prefix used by the IDO schema.
pub const DEFAULT_TABLE_PREFIX: &str = "icinga_";

/// An IDO history table and the column its age is measured by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableDescriptor {
    /// Table name without the schema prefix.
    pub name: &'static str,
    /// Column holding the row timestamp.
    pub time_column: &'static str,
}

impl TableDescriptor {
    pub const fn new(name: &'static str, time_column: &'static str) -> Self {
        Self { name, time_column }
    }

    /// Physical table name with the given prefix applied.
    pub fn qualified_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.name)
    }
}

/// All known history tables, in cleanup order.
pub const KNOWN_TABLES: &[TableDescriptor] = &[
    TableDescriptor::new("acknowledgements", "entry_time"),
    TableDescriptor::new("commenthistory", "entry_time"),
    TableDescriptor::new("contactnotifications", "start_time"),
    TableDescriptor::new("contactnotificationmethods", "start_time"),
    TableDescriptor::new("downtimehistory", "entry_time"),
    TableDescriptor::new("eventhandlers", "start_time"),
    TableDescriptor::new("externalcommands", "entry_time"),
    TableDescriptor::new("flappinghistory", "event_time"),
    TableDescriptor::new("hostchecks", "start_time"),
    TableDescriptor::new("logentries", "logentry_time"),
    TableDescriptor::new("notifications", "start_time"),
    TableDescriptor::new("processevents", "event_time"),
    TableDescriptor::new("statehistory", "state_time"),
    TableDescriptor::new("servicechecks", "start_time"),
    TableDescriptor::new("systemcommands", "start_time"),
];

/// Retention ages applied when nothing else is configured.
///
/// Tables missing from this list default to 0 days, i.e. they are not cleaned.
const DEFAULT_AGES: &[(&str, u32)] = &[
    ("statehistory", 365),
    ("contactnotifications", 365),
    ("notifications", 365),
    ("logentries", 365),
    ("downtimehistory", 365),
    ("commenthistory", 365),
    ("eventhandlers", 365),
];

/// Default retention age in days for a table.
pub fn default_age(table: &str) -> u32 {
    DEFAULT_AGES
        .iter()
        .find(|(name, _)| *name == table)
        .map(|(_, days)| *days)
        .unwrap_or(0)
}

/// Look up a table descriptor by its unprefixed name.
pub fn find_table(name: &str) -> Option<&'static TableDescriptor> {
    KNOWN_TABLES.iter().find(|t| t.name == name)
}
