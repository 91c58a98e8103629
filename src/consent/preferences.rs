//! Preference codec.
//!
//! Two cookies encode the same choice differently:
//!
//! | cookie           | example                                   | shape                          |
//! |------------------|-------------------------------------------|--------------------------------|
//! | Intuit (`ccpa`…) | `1\|0`                                     | `<essential>\|<advertising>`    |
//! | `OptanonConsent` | `isGpcEnabled=0&groups=1:1,4:0&version=1` | `&` segments, `groups=` pairs  |
//!
//! [`CategoryMap`] translates between the category ids used on the Intuit side
//! (`essential`, `advertising`) and the CMP category numbers (`1`, `4`).
//!
//! Parsing never fails: missing input gives an empty value, unknown flags are `None`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single category flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsentFlag {
    /// `"1"`
    Enabled,
    /// `"0"`
    Disabled,
}

impl ConsentFlag {
    /// Parses `"1"` / `"0"`. Anything else is unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "1" => Some(ConsentFlag::Enabled),
            "0" => Some(ConsentFlag::Disabled),
            _ => None,
        }
    }

    pub fn from_bool(enabled: bool) -> Self {
        if enabled { ConsentFlag::Enabled } else { ConsentFlag::Disabled }
    }

    pub fn is_enabled(self) -> bool {
        self == ConsentFlag::Enabled
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConsentFlag::Enabled => "1",
            ConsentFlag::Disabled => "0",
        }
    }
}

impl fmt::Display for ConsentFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two categories both cookies understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Strictly necessary; never a user choice.
    Essential,
    Advertising,
}

impl Category {
    pub fn id(self) -> &'static str {
        match self {
            Category::Essential => "essential",
            Category::Advertising => "advertising",
        }
    }
}

/// Static mapping between Intuit category ids and CMP category numbers.
pub struct CategoryMap;

impl CategoryMap {
    pub const ENTRIES: [(Category, &'static str); 2] = [
        (Category::Essential, "1"),
        (Category::Advertising, "4"),
    ];

    pub fn cmp_number(category: Category) -> &'static str {
        match category {
            Category::Essential => "1",
            Category::Advertising => "4",
        }
    }

    /// CMP category number for an Intuit category id (`"advertising"` → `"4"`).
    pub fn to_cmp(category_id: &str) -> Option<&'static str> {
        Self::ENTRIES
            .iter()
            .find(|(c, _)| c.id() == category_id)
            .map(|(_, n)| *n)
    }

    /// Intuit category for a CMP category number (`"4"` → advertising).
    pub fn from_cmp(number: &str) -> Option<Category> {
        Self::ENTRIES
            .iter()
            .find(|(_, n)| *n == number.trim())
            .map(|(c, _)| *c)
    }
}

/// Parsed Intuit consent cookie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntuitPreferences {
    pub essential: Option<ConsentFlag>,
    pub advertising: Option<ConsentFlag>,
}

impl IntuitPreferences {
    /// Preferences as this crate writes them: essential always enabled.
    pub fn new(advertising: ConsentFlag) -> Self {
        Self {
            essential: Some(ConsentFlag::Enabled),
            advertising: Some(advertising),
        }
    }

    /// Splits `raw` on `|`. A missing cookie yields empty preferences.
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let mut fields = raw.split('|');
        Self {
            essential: fields.next().and_then(ConsentFlag::parse),
            advertising: fields.next().and_then(ConsentFlag::parse),
        }
    }

    /// `"<essential>|<advertising>"`. Unknown fields encode as empty.
    pub fn encode(&self) -> String {
        let field = |f: Option<ConsentFlag>| f.map(ConsentFlag::as_str).unwrap_or("");
        format!("{}|{}", field(self.essential), field(self.advertising))
    }

    pub fn flag(&self, category: Category) -> Option<ConsentFlag> {
        match category {
            Category::Essential => self.essential,
            Category::Advertising => self.advertising,
        }
    }

    /// True when nothing is enabled and at least one field says disabled
    /// (`0|0`, or a legacy single `0`).
    pub fn is_full_opt_out(&self) -> bool {
        let fields = [self.essential, self.advertising];
        !fields.contains(&Some(ConsentFlag::Enabled)) && fields.contains(&Some(ConsentFlag::Disabled))
    }
}

/// One `categoryNumber:flag` pair of the `groups=` segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub category: String,
    /// Raw flag text; `None` when the pair had no `:`.
    pub raw_flag: Option<String>,
}

impl GroupEntry {
    pub fn new(category: impl Into<String>, flag: ConsentFlag) -> Self {
        Self {
            category: category.into(),
            raw_flag: Some(flag.as_str().to_string()),
        }
    }

    fn parse(pair: &str) -> Self {
        match pair.split_once(':') {
            Some((category, flag)) => Self {
                category: category.to_string(),
                raw_flag: Some(flag.to_string()),
            },
            None => Self {
                category: pair.to_string(),
                raw_flag: None,
            },
        }
    }

    pub fn flag(&self) -> Option<ConsentFlag> {
        self.raw_flag.as_deref().and_then(ConsentFlag::parse)
    }
}

impl fmt::Display for GroupEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw_flag {
            Some(flag) => write!(f, "{}:{}", self.category, flag),
            None => f.write_str(&self.category),
        }
    }
}

const GROUPS_KEY: &str = "groups";

/// Parsed `OptanonConsent` cookie.
///
/// The value is kept as its ordered `&` segments. The first `groups=` segment is
/// held in structured form; every other segment round-trips untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmpConsent {
    segments: Vec<String>,
    groups_at: Option<usize>,
    groups: Vec<GroupEntry>,
}

impl CmpConsent {
    /// Fresh value holding only `groups=1:1,4:<advertising>`.
    pub fn with_defaults(advertising: ConsentFlag) -> Self {
        let mut consent = Self::default();
        consent.set_flag(CategoryMap::cmp_number(Category::Essential), ConsentFlag::Enabled);
        consent.set_flag(CategoryMap::cmp_number(Category::Advertising), advertising);
        consent
    }

    pub fn parse(raw: &str) -> Self {
        let mut consent = Self::default();
        if raw.is_empty() {
            return consent;
        }

        for segment in raw.split('&') {
            let is_groups = consent.groups_at.is_none()
                && segment.split_once('=').is_some_and(|(k, _)| k.trim() == GROUPS_KEY);

            if is_groups {
                let (_, list) = segment.split_once('=').unwrap_or_default();
                consent.groups = list
                    .split(',')
                    .filter(|p| !p.trim().is_empty())
                    .map(GroupEntry::parse)
                    .collect();
                consent.groups_at = Some(consent.segments.len());
                consent.segments.push(String::new());
            } else {
                consent.segments.push(segment.to_string());
            }
        }

        consent
    }

    /// Only the `groups=` pairs of `raw`; empty when there are none.
    pub fn decode_groups(raw: Option<&str>) -> Vec<GroupEntry> {
        raw.map(|r| Self::parse(r).groups).unwrap_or_default()
    }

    pub fn has_groups(&self) -> bool {
        self.groups_at.is_some()
    }

    pub fn groups(&self) -> &[GroupEntry] {
        &self.groups
    }

    pub fn flag(&self, category_number: &str) -> Option<ConsentFlag> {
        self.groups
            .iter()
            .find(|g| g.category == category_number)
            .and_then(GroupEntry::flag)
    }

    /// Sets one category, appending the entry (and the `groups` segment) if missing.
    pub fn set_flag(&mut self, category_number: &str, flag: ConsentFlag) {
        if self.groups_at.is_none() {
            self.groups_at = Some(self.segments.len());
            self.segments.push(String::new());
        }

        match self.groups.iter_mut().find(|g| g.category == category_number) {
            Some(entry) => entry.raw_flag = Some(flag.as_str().to_string()),
            None => self.groups.push(GroupEntry::new(category_number, flag)),
        }
    }

    /// Category numbers flagged `1`, or `None` when there is no `groups` signal at all.
    pub fn active_categories(&self) -> Option<Vec<String>> {
        self.has_groups().then(|| {
            self.groups
                .iter()
                .filter(|g| g.flag() == Some(ConsentFlag::Enabled))
                .map(|g| g.category.clone())
                .collect()
        })
    }

    /// Whether `category` is active; `None` when there is no `groups` signal.
    pub fn is_active(&self, category: Category) -> Option<bool> {
        let number = CategoryMap::cmp_number(category);
        self.has_groups()
            .then(|| self.flag(number) == Some(ConsentFlag::Enabled))
    }
}

impl fmt::Display for CmpConsent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            if Some(i) == self.groups_at {
                let list = self.groups.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
                write!(f, "{GROUPS_KEY}={list}")?;
            } else {
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}
