//! Shared locale tables
//!
//! Built once on first use and read-only afterwards. Validators and rules
//! read from here; none of them keeps its own copy.

use crate::domain::Language;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Month names (lower case, full and abbreviated) with their month number
static MONTHS: LazyLock<HashMap<Language, Vec<(&'static str, u32)>>> = LazyLock::new(|| {
    HashMap::from([
        (
            Language::De,
            vec![
                ("januar", 1),
                ("jänner", 1),
                ("jan", 1),
                ("februar", 2),
                ("feb", 2),
                ("märz", 3),
                ("maerz", 3),
                ("mär", 3),
                ("april", 4),
                ("apr", 4),
                ("mai", 5),
                ("juni", 6),
                ("jun", 6),
                ("juli", 7),
                ("jul", 7),
                ("august", 8),
                ("aug", 8),
                ("september", 9),
                ("sept", 9),
                ("sep", 9),
                ("oktober", 10),
                ("okt", 10),
                ("november", 11),
                ("nov", 11),
                ("dezember", 12),
                ("dez", 12),
            ],
        ),
        (
            Language::Fr,
            vec![
                ("janvier", 1),
                ("janv", 1),
                ("février", 2),
                ("fevrier", 2),
                ("févr", 2),
                ("mars", 3),
                ("avril", 4),
                ("avr", 4),
                ("mai", 5),
                ("juin", 6),
                ("juillet", 7),
                ("juil", 7),
                ("août", 8),
                ("aout", 8),
                ("septembre", 9),
                ("sept", 9),
                ("octobre", 10),
                ("oct", 10),
                ("novembre", 11),
                ("nov", 11),
                ("décembre", 12),
                ("decembre", 12),
                ("déc", 12),
            ],
        ),
        (
            Language::It,
            vec![
                ("gennaio", 1),
                ("gen", 1),
                ("febbraio", 2),
                ("feb", 2),
                ("marzo", 3),
                ("mar", 3),
                ("aprile", 4),
                ("apr", 4),
                ("maggio", 5),
                ("mag", 5),
                ("giugno", 6),
                ("giu", 6),
                ("luglio", 7),
                ("lug", 7),
                ("agosto", 8),
                ("ago", 8),
                ("settembre", 9),
                ("set", 9),
                ("ottobre", 10),
                ("ott", 10),
                ("novembre", 11),
                ("nov", 11),
                ("dicembre", 12),
                ("dic", 12),
            ],
        ),
        (
            Language::En,
            vec![
                ("january", 1),
                ("jan", 1),
                ("february", 2),
                ("feb", 2),
                ("march", 3),
                ("mar", 3),
                ("april", 4),
                ("apr", 4),
                ("may", 5),
                ("june", 6),
                ("jun", 6),
                ("july", 7),
                ("jul", 7),
                ("august", 8),
                ("aug", 8),
                ("september", 9),
                ("sept", 9),
                ("sep", 9),
                ("october", 10),
                ("oct", 10),
                ("november", 11),
                ("nov", 11),
                ("december", 12),
                ("dec", 12),
            ],
        ),
    ])
});

/// Month names known for `language`
pub fn month_names(language: Language) -> &'static [(&'static str, u32)] {
    MONTHS.get(&language).map(Vec::as_slice).unwrap_or(&[])
}

/// Look up a month name in one language
pub fn month_number(language: Language, name: &str) -> Option<u32> {
    let name = name.trim_end_matches('.').to_lowercase();
    month_names(language)
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, number)| *number)
}

/// Look up a month name in any known language
///
/// Languages are tried in `Language::KNOWN` order, so the first match wins.
pub fn month_number_any(name: &str) -> Option<(u32, Language)> {
    Language::KNOWN
        .iter()
        .find_map(|&lang| month_number(lang, name).map(|n| (n, lang)))
}
