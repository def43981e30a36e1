use serde::{Deserialize, Serialize};

use super::filters::{PublicationYear, QueryFilterSet};

/// One (term1, term2, term3) triple searched as a single query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchCombination {
    pub first: String,
    pub second: String,
    pub third: String,
}

impl SearchCombination {
    pub fn new(first: impl Into<String>, second: impl Into<String>, third: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            third: third.into(),
        }
    }
}

impl std::fmt::Display for SearchCombination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.first, self.second, self.third)
    }
}

/// Split a comma separated term list, trimming terms and dropping blanks.
/// Duplicates are kept.
pub fn parse_terms(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(String::from)
        .collect()
}

/// Cartesian product of the three lists, first list outermost
pub fn combinations(first: &[String], second: &[String], third: &[String]) -> Vec<SearchCombination> {
    let mut combos = Vec::with_capacity(first.len() * second.len() * third.len());
    for a in first {
        for b in second {
            for c in third {
                combos.push(SearchCombination::new(a.as_str(), b.as_str(), c.as_str()));
            }
        }
    }
    combos
}

/// Build the Scopus query string for one combination.
///
/// Year ranges use strict bounds: `2018-2022` matches 2019 to 2021 only.
pub fn build_query(combination: &SearchCombination, filters: &QueryFilterSet) -> String {
    let mut query = format!(
        "TITLE-ABS-KEY({} AND {} AND {})",
        combination.first, combination.second, combination.third
    );

    if !filters.document_types.is_empty() {
        let clauses: Vec<String> = filters
            .document_types
            .iter()
            .map(|doc_type| format!("LIMIT-TO(DOCTYPE, \"{}\")", doc_type.code()))
            .collect();
        query.push_str(&format!(" AND ({})", clauses.join(" OR ")));
    }

    match &filters.publication_year {
        Some(PublicationYear::Range { start, end }) => {
            query.push_str(&format!(" AND PUBYEAR > {} AND PUBYEAR < {}", start, end));
        }
        Some(PublicationYear::Exact(year)) => {
            query.push_str(&format!(" AND (LIMIT-TO(PUBYEAR, {}))", year));
        }
        None => {}
    }

    if let Some(author) = &filters.author_name {
        query.push_str(&format!(" AND AUTHOR-NAME({})", author));
    }

    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::DocumentType;
    use std::collections::HashSet;

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_terms() {
        assert_eq!(
            parse_terms("lighting control, shading control,,daylighting ,"),
            terms(&["lighting control", "shading control", "daylighting"])
        );
        assert_eq!(parse_terms("a,a"), terms(&["a", "a"]));
        assert!(parse_terms(" , ").is_empty());
    }

    #[test]
    fn test_combination_count_and_uniqueness() {
        let l1 = terms(&["a", "b", "c"]);
        let l2 = terms(&["d", "e"]);
        let l3 = terms(&["f", "g", "h", "i"]);

        let combos = combinations(&l1, &l2, &l3);
        assert_eq!(combos.len(), 3 * 2 * 4);

        let unique: HashSet<_> = combos.iter().collect();
        assert_eq!(unique.len(), combos.len());

        assert_eq!(combos[0], SearchCombination::new("a", "d", "f"));
        assert_eq!(combos[1], SearchCombination::new("a", "d", "g"));
        assert_eq!(combos.last().unwrap(), &SearchCombination::new("c", "e", "i"));
    }

    #[test]
    fn test_combinations_keep_duplicates() {
        let combos = combinations(&terms(&["x", "x"]), &terms(&["y"]), &terms(&["z"]));
        assert_eq!(combos.len(), 2);
        assert_eq!(combos[0], combos[1]);
    }

    #[test]
    fn test_combinations_with_empty_list() {
        assert!(combinations(&terms(&["a"]), &[], &terms(&["c"])).is_empty());
    }

    #[test]
    fn test_base_query_without_filters() {
        let query = build_query(&SearchCombination::new("A", "B", "C"), &QueryFilterSet::default());
        assert_eq!(query, "TITLE-ABS-KEY(A AND B AND C)");
    }

    #[test]
    fn test_document_type_clause() {
        let filters = QueryFilterSet::new([DocumentType::Ar, DocumentType::Cp], None, None);
        let query = build_query(&SearchCombination::new("A", "B", "C"), &filters);
        assert_eq!(
            query,
            "TITLE-ABS-KEY(A AND B AND C) AND (LIMIT-TO(DOCTYPE, \"ar\") OR LIMIT-TO(DOCTYPE, \"cp\"))"
        );
    }

    #[test]
    fn test_year_range_uses_exclusive_bounds() {
        // Boundary years 2018 and 2022 are excluded by the strict comparisons.
        let filters = QueryFilterSet::new([], Some("2018-2022"), None);
        let query = build_query(&SearchCombination::new("A", "B", "C"), &filters);
        assert!(query.contains("PUBYEAR > 2018"));
        assert!(query.contains("PUBYEAR < 2022"));
        assert_eq!(
            query,
            "TITLE-ABS-KEY(A AND B AND C) AND PUBYEAR > 2018 AND PUBYEAR < 2022"
        );
    }

    #[test]
    fn test_exact_year_clause() {
        let filters = QueryFilterSet::new([], Some("2020"), None);
        let query = build_query(&SearchCombination::new("A", "B", "C"), &filters);
        assert_eq!(query, "TITLE-ABS-KEY(A AND B AND C) AND (LIMIT-TO(PUBYEAR, 2020))");
    }

    #[test]
    fn test_full_filter_order() {
        let filters = QueryFilterSet::new([DocumentType::Re], Some("2015-2024"), Some("Smith J"));
        let query = build_query(&SearchCombination::new("daylighting", "machine learning", "buildings"), &filters);
        assert_eq!(
            query,
            "TITLE-ABS-KEY(daylighting AND machine learning AND buildings) \
             AND (LIMIT-TO(DOCTYPE, \"re\")) \
             AND PUBYEAR > 2015 AND PUBYEAR < 2024 \
             AND AUTHOR-NAME(Smith J)"
        );
    }

    #[test]
    fn test_malformed_year_passes_through() {
        let filters = QueryFilterSet::new([], Some("soon"), Some("O'Brien (Jr)"));
        let query = build_query(&SearchCombination::new("A", "B", "C"), &filters);
        assert!(query.ends_with("AND (LIMIT-TO(PUBYEAR, soon)) AND AUTHOR-NAME(O'Brien (Jr))"));
    }
}
