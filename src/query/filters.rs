//! Query filters: document type, publication year and author.

use serde::{Deserialize, Deserializer, Serialize};

/// Scopus document type codes accepted by `LIMIT-TO(DOCTYPE, ...)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Ar,
    Ab,
    Bk,
    Ch,
    Cp,
    Cr,
    Dp,
    Ed,
    Er,
    Le,
    Mm,
    No,
    Rp,
    Tb,
    Re,
    Sh,
}

impl DocumentType {
    /// Every code in the order the search form lists them
    pub const ALL: [DocumentType; 16] = [
        DocumentType::Ar,
        DocumentType::Ab,
        DocumentType::Bk,
        DocumentType::Ch,
        DocumentType::Cp,
        DocumentType::Cr,
        DocumentType::Dp,
        DocumentType::Ed,
        DocumentType::Er,
        DocumentType::Le,
        DocumentType::Mm,
        DocumentType::No,
        DocumentType::Rp,
        DocumentType::Tb,
        DocumentType::Re,
        DocumentType::Sh,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::Ar => "ar",
            DocumentType::Ab => "ab",
            DocumentType::Bk => "bk",
            DocumentType::Ch => "ch",
            DocumentType::Cp => "cp",
            DocumentType::Cr => "cr",
            DocumentType::Dp => "dp",
            DocumentType::Ed => "ed",
            DocumentType::Er => "er",
            DocumentType::Le => "le",
            DocumentType::Mm => "mm",
            DocumentType::No => "no",
            DocumentType::Rp => "rp",
            DocumentType::Tb => "tb",
            DocumentType::Re => "re",
            DocumentType::Sh => "sh",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Ar => "Article",
            DocumentType::Ab => "Abstract Report",
            DocumentType::Bk => "Book",
            DocumentType::Ch => "Book Chapter",
            DocumentType::Cp => "Conference Paper",
            DocumentType::Cr => "Conference Review",
            DocumentType::Dp => "Data Paper",
            DocumentType::Ed => "Editorial",
            DocumentType::Er => "Erratum",
            DocumentType::Le => "Letter",
            DocumentType::Mm => "Multimedia",
            DocumentType::No => "Note",
            DocumentType::Rp => "Report",
            DocumentType::Tb => "Retracted",
            DocumentType::Re => "Review",
            DocumentType::Sh => "Short Survey",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| {
            let codes: Vec<&str> = Self::ALL.iter().map(|t| t.code()).collect();
            format!("unknown document type '{}', expected one of: {}", s, codes.join(", "))
        })
    }
}

/// Case-insensitive like the CLI parser
impl<'de> Deserialize<'de> for DocumentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

/// Publication year restriction, kept as the raw text the user typed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PublicationYear {
    Exact(String),
    Range { start: String, end: String },
}

impl PublicationYear {
    /// Parse the free-text year field.
    ///
    /// Blank input means "no filter". Anything containing `-` is a range split
    /// at the first `-`; the text is not validated.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        match input.split_once('-') {
            Some((start, end)) => Some(PublicationYear::Range {
                start: start.trim().to_string(),
                end: end.trim().to_string(),
            }),
            None => Some(PublicationYear::Exact(input.to_string())),
        }
    }
}

/// Filters applied to every combination of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilterSet {
    #[serde(default)]
    pub document_types: Vec<DocumentType>,
    #[serde(default)]
    pub publication_year: Option<PublicationYear>,
    #[serde(default)]
    pub author_name: Option<String>,
}

impl QueryFilterSet {
    /// Build a filter set from form-style inputs.
    ///
    /// Duplicate document types are collapsed keeping first-seen order. A
    /// blank author is treated as absent, anything else is kept verbatim.
    pub fn new(
        document_types: impl IntoIterator<Item = DocumentType>,
        publication_year: Option<&str>,
        author_name: Option<&str>,
    ) -> Self {
        let mut types: Vec<DocumentType> = Vec::new();
        for doc_type in document_types {
            if !types.contains(&doc_type) {
                types.push(doc_type);
            }
        }

        Self {
            document_types: types,
            publication_year: publication_year.and_then(PublicationYear::parse),
            author_name: author_name
                .filter(|name| !name.trim().is_empty())
                .map(String::from),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.document_types.is_empty() && self.publication_year.is_none() && self.author_name.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_codes() {
        assert_eq!(DocumentType::ALL.len(), 16);
        assert_eq!(DocumentType::from_code("AR"), Some(DocumentType::Ar));
        assert_eq!(DocumentType::from_code(" re "), Some(DocumentType::Re));
        assert_eq!(DocumentType::from_code("xx"), None);
        assert_eq!(DocumentType::Cp.label(), "Conference Paper");
        assert!("zz".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_document_type_serde_uses_code() {
        let json = serde_json::to_string(&DocumentType::Sh).unwrap();
        assert_eq!(json, "\"sh\"");
        let parsed: DocumentType = serde_json::from_str("\"tb\"").unwrap();
        assert_eq!(parsed, DocumentType::Tb);
        let parsed: Vec<DocumentType> = serde_json::from_str(r#"["AR", " Cp "]"#).unwrap();
        assert_eq!(parsed, vec![DocumentType::Ar, DocumentType::Cp]);
        assert!(serde_json::from_str::<DocumentType>("\"zz\"").is_err());
    }

    #[test]
    fn test_publication_year_parse() {
        assert_eq!(PublicationYear::parse("   "), None);
        assert_eq!(
            PublicationYear::parse("2020"),
            Some(PublicationYear::Exact("2020".to_string()))
        );
        assert_eq!(
            PublicationYear::parse("2015 - 2024"),
            Some(PublicationYear::Range {
                start: "2015".to_string(),
                end: "2024".to_string()
            })
        );
        // Only the first separator splits; the rest stays in `end` verbatim.
        assert_eq!(
            PublicationYear::parse("2010-2015-2020"),
            Some(PublicationYear::Range {
                start: "2010".to_string(),
                end: "2015-2020".to_string()
            })
        );
    }

    #[test]
    fn test_filter_set_new() {
        let filters = QueryFilterSet::new(
            [DocumentType::Ar, DocumentType::Re, DocumentType::Ar],
            Some(""),
            Some("  "),
        );
        assert_eq!(filters.document_types, vec![DocumentType::Ar, DocumentType::Re]);
        assert_eq!(filters.publication_year, None);
        assert_eq!(filters.author_name, None);
        assert!(!filters.is_empty());
        assert!(QueryFilterSet::default().is_empty());
    }

    #[test]
    fn test_author_kept_verbatim() {
        let filters = QueryFilterSet::new([], None, Some(" Smith J "));
        assert_eq!(filters.author_name.as_deref(), Some(" Smith J "));
    }
}
