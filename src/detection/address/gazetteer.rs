//! Reference tables for address plausibility
//!
//! Swiss postal codes with their city, known cities of Switzerland and its
//! neighbours, and country tokens in de/fr/it/en.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static SWISS_POSTAL_CODES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("1000", "lausanne"),
        ("1003", "lausanne"),
        ("1004", "lausanne"),
        ("1005", "lausanne"),
        ("1006", "lausanne"),
        ("1200", "genève"),
        ("1201", "genève"),
        ("1202", "genève"),
        ("1203", "genève"),
        ("1204", "genève"),
        ("1205", "genève"),
        ("1400", "yverdon-les-bains"),
        ("1700", "fribourg"),
        ("1820", "montreux"),
        ("1950", "sion"),
        ("2000", "neuchâtel"),
        ("2500", "biel"),
        ("3000", "bern"),
        ("3001", "bern"),
        ("3005", "bern"),
        ("3011", "bern"),
        ("3600", "thun"),
        ("4000", "basel"),
        ("4001", "basel"),
        ("4051", "basel"),
        ("4052", "basel"),
        ("4500", "solothurn"),
        ("5000", "aarau"),
        ("6000", "luzern"),
        ("6003", "luzern"),
        ("6004", "luzern"),
        ("6300", "zug"),
        ("6500", "bellinzona"),
        ("6600", "locarno"),
        ("6900", "lugano"),
        ("7000", "chur"),
        ("8000", "zürich"),
        ("8001", "zürich"),
        ("8002", "zürich"),
        ("8004", "zürich"),
        ("8005", "zürich"),
        ("8008", "zürich"),
        ("8200", "schaffhausen"),
        ("8400", "winterthur"),
        ("9000", "st. gallen"),
        ("9490", "vaduz"),
    ])
});

/// Alternative spellings mapped onto the names used in the postal table
static CITY_ALIASES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("zurich", "zürich"),
        ("zuerich", "zürich"),
        ("geneve", "genève"),
        ("genf", "genève"),
        ("ginevra", "genève"),
        ("geneva", "genève"),
        ("berne", "bern"),
        ("berna", "bern"),
        ("bâle", "basel"),
        ("basilea", "basel"),
        ("lucerne", "luzern"),
        ("lucerna", "luzern"),
        ("bienne", "biel"),
        ("biel/bienne", "biel"),
        ("freiburg", "fribourg"),
        ("neuenburg", "neuchâtel"),
        ("neuchatel", "neuchâtel"),
        ("sitten", "sion"),
        ("sankt gallen", "st. gallen"),
        ("st.gallen", "st. gallen"),
        ("st gallen", "st. gallen"),
        ("coira", "chur"),
        ("losanna", "lausanne"),
    ])
});

static NEIGHBOURING_CITIES: &[&str] = &[
    "berlin",
    "hamburg",
    "münchen",
    "munich",
    "stuttgart",
    "frankfurt",
    "köln",
    "konstanz",
    "freiburg im breisgau",
    "lörrach",
    "wien",
    "vienna",
    "innsbruck",
    "salzburg",
    "graz",
    "bregenz",
    "paris",
    "lyon",
    "marseille",
    "strasbourg",
    "mulhouse",
    "annecy",
    "besançon",
    "milano",
    "milan",
    "torino",
    "turin",
    "como",
    "roma",
    "rome",
    "varese",
    "luxembourg",
];

static KNOWN_CITIES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    SWISS_POSTAL_CODES
        .values()
        .copied()
        .chain(CITY_ALIASES.keys().copied())
        .chain(NEIGHBOURING_CITIES.iter().copied())
        .collect()
});

static COUNTRIES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "schweiz",
        "suisse",
        "svizzera",
        "switzerland",
        "deutschland",
        "germany",
        "allemagne",
        "germania",
        "österreich",
        "austria",
        "autriche",
        "frankreich",
        "france",
        "francia",
        "italien",
        "italie",
        "italy",
        "italia",
        "liechtenstein",
        "luxemburg",
        "luxembourg",
    ])
});

fn normalize(value: &str) -> String {
    value.trim().trim_end_matches(',').to_lowercase()
}

fn canonical_city(name: &str) -> String {
    let name = normalize(name);
    CITY_ALIASES
        .get(name.as_str())
        .map(|c| (*c).to_string())
        .unwrap_or(name)
}

/// City registered for a Swiss postal code (`"8001"` or `"CH-8001"`)
pub fn city_for_postal_code(code: &str) -> Option<&'static str> {
    let code = code.trim();
    let code = code
        .strip_prefix("CH-")
        .or_else(|| code.strip_prefix("CH "))
        .unwrap_or(code);
    SWISS_POSTAL_CODES.get(code).copied()
}

/// Whether `code` is in the Swiss reference table
pub fn is_known_postal_code(code: &str) -> bool {
    city_for_postal_code(code).is_some()
}

/// Whether the postal code is registered for this city
pub fn postal_code_matches_city(code: &str, city: &str) -> bool {
    city_for_postal_code(code).is_some_and(|registered| registered == canonical_city(city))
}

/// Whether `name` is a known city
pub fn is_known_city(name: &str) -> bool {
    KNOWN_CITIES.contains(canonical_city(name).as_str())
}

/// Whether `token` names a country
pub fn is_country(token: &str) -> bool {
    COUNTRIES.contains(normalize(token).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postal_lookup() {
        assert_eq!(city_for_postal_code("1000"), Some("lausanne"));
        assert_eq!(city_for_postal_code("CH-8001"), Some("zürich"));
        assert_eq!(city_for_postal_code("9999"), None);
    }

    #[test]
    fn test_postal_city_pairs() {
        assert!(postal_code_matches_city("1000", "Lausanne"));
        assert!(postal_code_matches_city("8001", "Zurich"));
        assert!(postal_code_matches_city("1201", "Genf"));
        assert!(!postal_code_matches_city("1000", "Bern"));
    }

    #[test]
    fn test_cities_and_countries() {
        assert!(is_known_city("Lausanne"));
        assert!(is_known_city("Bâle"));
        assert!(is_known_city("München"));
        assert!(!is_known_city("Atlantis"));
        assert!(is_country("Schweiz"));
        assert!(is_country("Suisse,"));
        assert!(!is_country("Lausanne"));
    }
}
