use std::borrow::Cow;

use acuerdos::search::{matches, search_records, similarity_ratio, Searchable, DEFAULT_THRESHOLD};

struct Resource {
    name: &'static str,
    notes: Option<&'static str>,
}

impl Searchable for Resource {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.name),
            Cow::Borrowed(self.notes.unwrap_or_default()),
        ]
    }
}

#[test]
fn every_case_insensitive_substring_matches() {
    let value = "Reunión de Asamblea Mensual";
    let lowered = value.to_lowercase();
    let chars: Vec<char> = lowered.chars().collect();
    for start in 0..chars.len() {
        for end in start + 1..=chars.len() {
            let query: String = chars[start..end].iter().collect();
            assert!(matches(value, &query, DEFAULT_THRESHOLD), "query {query:?}");
        }
    }
}

#[test]
fn one_letter_typo_is_tolerated() {
    assert!(matches("Observaciones", "observasiones", 0.8));
    assert!(!matches("Observaciones", "xyz", 0.8));
}

#[test]
fn empty_query_matches_trivially() {
    for value in ["", "Cocina", "https://example.org"] {
        assert!(matches(value, "", 0.8));
    }
}

#[test]
fn short_queries_use_substring_and_tokens_only() {
    assert!(matches("abcdef", "ab", 0.8));
    // "bx" has ratio 0.5 against the 2-char window "bc", but windows need 4+ chars.
    assert!(!matches("abcdef", "bx", 0.4));
}

#[test]
fn ratio_is_symmetric_for_simple_pairs() {
    assert_eq!(similarity_ratio("cocina", "cosina"), similarity_ratio("cosina", "cocina"));
    assert!((similarity_ratio("cocina", "cosina") - 10.0 / 12.0).abs() < 1e-9);
}

#[test]
fn records_match_when_any_field_does() {
    let resources = vec![
        Resource { name: "Compostera", notes: None },
        Resource { name: "Paneles", notes: Some("Revisar baterías cada mes") },
        Resource { name: "Huerta", notes: Some("Riego") },
    ];

    let found = search_records(&resources, "bateria", DEFAULT_THRESHOLD);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Paneles");

    let found = search_records(&resources, "Compostra", DEFAULT_THRESHOLD);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Compostera");

    assert_eq!(search_records(&resources, "", DEFAULT_THRESHOLD).len(), 3);
}
