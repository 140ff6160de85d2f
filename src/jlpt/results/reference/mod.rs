//! Country reference data used to attach continent, ISO code, and flag
//! metadata to each record.
//!
//! The bundled table lives in `data/countries.json` and is embedded at
//! compile time. Tests and callers with their own data can build a
//! [`CountryDirectory`] from arbitrary entries instead.

use std::collections::HashMap;

use serde::Deserialize;

use crate::jlpt::results::error::Result;

const BUNDLED_COUNTRIES: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/countries.json"));

/// Continent name used whenever a country cannot be resolved.
pub const UNKNOWN_CONTINENT: &str = "Unknown";

/// One country of the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CountryEntry {
    pub alpha2: String,
    pub alpha3: String,
    pub name: String,
    /// Two-letter continent code (AF, AN, AS, EU, NA, OC, SA).
    pub continent: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Case-insensitive lookup from country names and codes to reference entries.
#[derive(Debug, Clone)]
pub struct CountryDirectory {
    entries: Vec<CountryEntry>,
    index: HashMap<String, usize>,
}

impl CountryDirectory {
    /// Loads the reference table shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_COUNTRIES)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let entries: Vec<CountryEntry> = serde_json::from_str(source)?;
        Ok(Self::from_entries(entries))
    }

    /// Indexes entries by name, alpha-2, alpha-3 and aliases. When two
    /// entries claim the same key the first one wins.
    pub fn from_entries(entries: Vec<CountryEntry>) -> Self {
        let mut index = HashMap::new();
        for (position, entry) in entries.iter().enumerate() {
            let keys = [&entry.name, &entry.alpha2, &entry.alpha3]
                .into_iter()
                .chain(entry.aliases.iter());
            for key in keys {
                index.entry(lookup_key(key)).or_insert(position);
            }
        }
        Self { entries, index }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<&CountryEntry> {
        self.index
            .get(&lookup_key(name))
            .map(|position| &self.entries[*position])
    }

    /// ISO 3166 alpha-2 code of the country, if it can be resolved.
    pub fn alpha2(&self, name: &str) -> Option<&str> {
        self.lookup(name).map(|entry| entry.alpha2.as_str())
    }

    /// Continent name of the country, or [`UNKNOWN_CONTINENT`].
    pub fn continent(&self, name: &str) -> &'static str {
        self.lookup(name)
            .and_then(|entry| continent_name(&entry.continent))
            .unwrap_or(UNKNOWN_CONTINENT)
    }
}

/// Maps a continent code onto its display name. Antarctica is not mapped.
pub fn continent_name(code: &str) -> Option<&'static str> {
    match code {
        "AF" => Some("Africa"),
        "NA" => Some("North America"),
        "SA" => Some("South America"),
        "AS" => Some("Asia"),
        "EU" => Some("Europe"),
        "OC" => Some("Oceania"),
        _ => None,
    }
}

/// 40px-wide flag image for an alpha-2 code.
pub fn flag_url(alpha2: &str) -> String {
    format!("https://flagcdn.com/w40/{}.png", alpha2.to_lowercase())
}

fn lookup_key(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_table_parses() {
        let directory = CountryDirectory::bundled().expect("bundled countries parse");
        assert_eq!(directory.len(), 249);
    }

    #[test]
    fn resolves_names_aliases_and_codes() {
        let directory = CountryDirectory::bundled().expect("bundled countries parse");

        assert_eq!(directory.alpha2("South Korea"), Some("KR"));
        assert_eq!(directory.alpha2("viet nam"), Some("VN"));
        assert_eq!(directory.alpha2("Türkiye"), Some("TR"));
        assert_eq!(directory.alpha2("JPN"), Some("JP"));
        assert_eq!(directory.alpha2("Atlantis"), None);
    }

    #[test]
    fn continent_falls_back_to_unknown() {
        let directory = CountryDirectory::bundled().expect("bundled countries parse");

        assert_eq!(directory.continent("Brazil"), "South America");
        assert_eq!(directory.continent("Antarctica"), UNKNOWN_CONTINENT);
        assert_eq!(directory.continent("Atlantis"), UNKNOWN_CONTINENT);
    }

    #[test]
    fn custom_entries_can_be_injected() {
        let directory = CountryDirectory::from_entries(vec![CountryEntry {
            alpha2: "XX".into(),
            alpha3: "XXX".into(),
            name: "Testland".into(),
            continent: "OC".into(),
            aliases: vec!["Test".into()],
        }]);

        assert_eq!(directory.alpha2("test"), Some("XX"));
        assert_eq!(directory.continent("Testland"), "Oceania");
    }

    #[test]
    fn flag_url_uses_lowercase_code() {
        assert_eq!(flag_url("KR"), "https://flagcdn.com/w40/kr.png");
    }
}
