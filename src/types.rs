use serde::Serialize;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical datatype names accepted by the API.
pub const RESOURCE_OPTIONS: [&str; 5] = [
    "items",
    "listings",
    "captains",
    "roster_updates",
    "game_history",
];

/// Platform codes the API recognizes for game history.
pub const PLATFORM_OPTIONS: [&str; 4] = ["psn", "xbl", "mlbts", "nsw"];

/// Field every record is keyed by.
pub const KEY_FIELD: &str = "uuid";

/// Input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(
        "*{0}* is not a valid datatype for API requests. Acceptable options: {options}",
        options = RESOURCE_OPTIONS.join(", ")
    )]
    InvalidResourceType(String),

    #[error(
        "*{0}* is not a valid platform for API requests. Acceptable options: {options}",
        options = PLATFORM_OPTIONS.join(", ")
    )]
    InvalidPlatform(String),
}

/// One of the fixed collections the community market API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Items,
    Listings,
    Captains,
    RosterUpdates,
    GameHistory,
}

impl ResourceType {
    /// Canonical name, which is also the payload field holding the records.
    pub fn field_name(&self) -> &'static str {
        match self {
            ResourceType::Items => "items",
            ResourceType::Listings => "listings",
            ResourceType::Captains => "captains",
            ResourceType::RosterUpdates => "roster_updates",
            ResourceType::GameHistory => "game_history",
        }
    }

    /// Request path on the API host.
    pub fn api_path(&self) -> &'static str {
        match self {
            ResourceType::Items => "/apis/items.json",
            ResourceType::Listings => "/apis/listings.json",
            ResourceType::Captains => "/apis/captains.json",
            ResourceType::RosterUpdates => "/apis/roster_updates.json",
            ResourceType::GameHistory => "/apis/game_history.json",
        }
    }

    /// Items and listings take the `type=mlb_card` query parameter.
    pub fn is_card_collection(&self) -> bool {
        matches!(self, ResourceType::Items | ResourceType::Listings)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for ResourceType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "items" | "item" => Ok(ResourceType::Items),
            "listings" | "listing" => Ok(ResourceType::Listings),
            "captains" | "captain" => Ok(ResourceType::Captains),
            "roster_updates" | "roster_update" | "rosters" | "roster" => {
                Ok(ResourceType::RosterUpdates)
            }
            "game_history" | "games" | "game" | "history" => Ok(ResourceType::GameHistory),
            other => Err(ParseError::InvalidResourceType(other.to_string())),
        }
    }
}

/// Platform a game-history account lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Psn,
    Xbl,
    Mlbts,
    Nsw,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Psn => "psn",
            Platform::Xbl => "xbl",
            Platform::Mlbts => "mlbts",
            Platform::Nsw => "nsw",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "psn" => Ok(Platform::Psn),
            "xbl" => Ok(Platform::Xbl),
            "mlbts" => Ok(Platform::Mlbts),
            "nsw" => Ok(Platform::Nsw),
            // Console-generation and console-family aliases.
            "ps5" => Ok(Platform::Psn),
            "xbox" => Ok(Platform::Xbl),
            other => Err(ParseError::InvalidPlatform(other.to_string())),
        }
    }
}

/// One page request against the API. Page numbers are 1-based; page 0 is
/// coerced to 1.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    resource: ResourceType,
    page: u32,
    platform: Option<Platform>,
    username: Option<&'a str>,
}

impl<'a> PageRequest<'a> {
    pub fn new(
        resource: ResourceType,
        page: u32,
        platform: Option<Platform>,
        username: Option<&'a str>,
    ) -> Self {
        Self {
            resource,
            page: page.max(1),
            platform,
            username,
        }
    }

    pub fn resource(&self) -> ResourceType {
        self.resource
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    pub fn username(&self) -> Option<&str> {
        self.username
    }
}

/// One flattened JSON record from a page payload.
pub type Record = serde_json::Map<String, Value>;

/// Table indexing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("record has no usable `{KEY_FIELD}` field to index by")]
    MissingKey,

    #[error("duplicate record identifier: {0}")]
    DuplicateKey(String),
}

/// Ordered collection of records from every page of one resource type,
/// indexed by the record's unique identifier. Built once per invocation and
/// never mutated after assembly.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<Record>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ResultTable {
    /// Append a record, keyed by its identifier field. Arrival order is
    /// preserved; a repeated identifier is rejected.
    pub fn insert(&mut self, record: Record) -> Result<(), TableError> {
        let key = match record.get(KEY_FIELD) {
            Some(Value::String(s)) => s.clone(),
            Some(v) if !v.is_null() => v.to_string(),
            _ => return Err(TableError::MissingKey),
        };
        match self.index.entry(key) {
            Entry::Occupied(entry) => Err(TableError::DuplicateKey(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(self.rows.len());
                self.rows.push(record);
                Ok(())
            }
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of keys across all records: the identifier column first, the
    /// rest sorted.
    pub fn column_headers(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = BTreeSet::new();
        for row in &self.rows {
            keys.extend(row.keys().cloned());
        }
        let mut headers = Vec::with_capacity(keys.len());
        if keys.remove(KEY_FIELD) {
            headers.push(KEY_FIELD.to_string());
        }
        headers.extend(keys);
        headers
    }
}
