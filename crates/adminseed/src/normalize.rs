//! Name normalization: raw administrative names to candidate lookup keys.
//!
//! Source datasets spell the same unit many ways ("Fort Portal City",
//! "Fort-Portal", "FORT PORTAL MUNICIPALITY"). Matching works on a base key
//! of lowercase letters only, widened by filler-token stripping and a fixed
//! alias table. No edit-distance matching is attempted; a miss here is a
//! miss.

use crate::model::Level;

/// Substring-keyed aliases for units whose official and colloquial names
/// diverge across datasets. Matched against the base key.
const ALIASES: &[(&str, &[&str])] = &[
    ("kampala", &["kcca"]),
    ("kcca", &["kampala"]),
    ("fortportal", &["kabarole", "fortportalcity"]),
    ("mbarara", &["mbararacity"]),
    ("jinja", &["jinjacity"]),
    ("gulu", &["gulucity"]),
    ("arua", &["aruacity"]),
    ("entebbe", &["wakiso"]),
];

/// Collapse a raw name to its base key: lowercase letters only.
#[must_use]
pub fn base_key(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_lowercase)
        .collect()
}

/// Generate the candidate lookup keys for `raw`.
///
/// Returns a deduplicated list, base key first, then filler-stripped
/// variants in token order, then aliases. Every element is a non-empty
/// lowercase-letters-only string; an input without letters yields an empty
/// list. Pure function, no I/O.
#[must_use]
pub fn normalize(raw: &str, fillers: &[&str]) -> Vec<String> {
    let base = base_key(raw);
    if base.is_empty() {
        return Vec::new();
    }

    let mut variants = vec![base.clone()];

    for token in fillers {
        if base.contains(token) {
            push_unique(&mut variants, base.replace(token, ""));
        }
    }

    for (needle, aliases) in ALIASES {
        if base.contains(needle) {
            for alias in *aliases {
                push_unique(&mut variants, (*alias).to_string());
            }
        }
    }

    variants
}

/// Normalize with the filler tokens of the level the name belongs to.
#[must_use]
pub fn normalize_for(level: Level, raw: &str) -> Vec<String> {
    normalize(raw, level.filler_tokens())
}

fn push_unique(variants: &mut Vec<String>, candidate: String) {
    if !candidate.is_empty() && !variants.contains(&candidate) {
        variants.push(candidate);
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base_key_strips_everything_but_letters() {
        assert_eq!(base_key("Fort-Portal  City 2024"), "fortportalcity");
        assert_eq!(base_key("  12/34 "), "");
    }

    #[test]
    fn test_fort_portal_city_worked_example() {
        let variants = normalize_for(Level::District, "Fort Portal City");

        assert!(variants.contains(&"fortportalcity".to_string()));
        assert!(variants.contains(&"fortportal".to_string()));
        assert!(variants.contains(&"kabarole".to_string()));
    }

    #[test]
    fn test_kampala_alias() {
        let variants = normalize_for(Level::District, "Kampala District");
        assert!(variants.contains(&"kampala".to_string()));
        assert!(variants.contains(&"kcca".to_string()));
    }

    #[test]
    fn test_base_key_comes_first() {
        let variants = normalize_for(Level::District, "Mbarara District");
        assert_eq!(variants[0], "mbararadistrict");
    }

    #[test]
    fn test_village_level_ignores_district_tokens() {
        let variants = normalize_for(Level::Village, "Kisenyi District");
        // "district" is not a village-level filler, so the token survives.
        assert!(variants.contains(&"kisenyidistrict".to_string()));
        assert!(!variants.contains(&"kisenyi".to_string()));
    }

    #[test]
    fn test_parish_level_strips_ward() {
        let variants = normalize_for(Level::Parish, "Central Ward");
        assert!(variants.contains(&"central".to_string()));
    }

    #[test]
    fn test_stripping_never_yields_empty_variant() {
        // The whole name is a filler token; only the base key survives.
        let variants = normalize_for(Level::District, "City");
        assert_eq!(variants, vec!["city".to_string()]);
    }

    #[test]
    fn test_no_letters_yields_empty_set() {
        assert!(normalize_for(Level::District, "---").is_empty());
    }

    #[test]
    fn test_deduplicates_variants() {
        let variants = normalize_for(Level::District, "Town Council");
        let mut sorted = variants.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), variants.len());
    }

    proptest! {
        #[test]
        fn prop_variants_are_lowercase_letters_only(raw in ".{0,40}") {
            for v in normalize(&raw, Level::District.filler_tokens()) {
                prop_assert!(!v.is_empty());
                prop_assert!(v.chars().all(|c| c.is_ascii_lowercase()));
            }
        }

        #[test]
        fn prop_nonempty_names_yield_nonempty_sets(raw in "[A-Za-z]{1,30}") {
            prop_assert!(!normalize(&raw, Level::District.filler_tokens()).is_empty());
        }

        #[test]
        fn prop_renormalizing_a_variant_is_stable(raw in "[A-Za-z ]{1,30}") {
            let fillers = Level::District.filler_tokens();
            for v in normalize(&raw, fillers) {
                let again = normalize(&v, fillers);
                prop_assert!(again.contains(&v));
            }
        }
    }
}
