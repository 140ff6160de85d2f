/// Alternate spellings found in the result sheets and their canonical names.
///
/// No canonical name appears as a key, so applying the table twice is the
/// same as applying it once.
const SUBSTITUTIONS: [(&str, &str); 14] = [
    ("Brunei", "Brunei Darussalam"),
    ("Russia", "Russian Federation"),
    ("Turkey", "Türkiye"),
    ("Korea", "South Korea"),
    ("Ivory Coast", "Côte d'Ivoire"),
    ("Cote d'Ivoire", "Côte d'Ivoire"),
    ("Cote d' Ivoire", "Côte d'Ivoire"),
    ("DR Congo", "Congo, The Democratic Republic of the"),
    (
        "Democratic Republic of the Congo",
        "Congo, The Democratic Republic of the",
    ),
    ("Mongol", "Mongolia"),
    ("U.S.A.", "United States"),
    ("U.K.", "United Kingdom"),
    ("Czech", "Czech Republic"),
    ("Catarrh", "Qatar"),
];

/// Trims the name and replaces known alternate spellings.
pub fn canonicalize_country(name: &str) -> String {
    let trimmed = name.trim();
    SUBSTITUTIONS
        .iter()
        .find(|(alias, _)| *alias == trimmed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
