
use tracing::debug;

/// A key and the terms appended when the key or any term appears in a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynonymGroup {
    pub key: &'static str,
    pub terms: &'static [&'static str],
}

pub const SYNONYM_TABLE: &[SynonymGroup] = &[
    SynonymGroup {
        key: "placement",
        terms: &["job", "career", "recruitment", "company", "salary", "package"],
    },
    SynonymGroup {
        key: "admission",
        terms: &["apply", "eligibility", "requirement", "process", "criterion"],
    },
    SynonymGroup {
        key: "program",
        terms: &["course", "degree", "curriculum", "subject", "specialization"],
    },
    SynonymGroup {
        key: "facility",
        terms: &["infrastructure", "lab", "library", "hostel", "campus"],
    },
    SynonymGroup {
        key: "event",
        terms: &["conference", "workshop", "festival", "competition", "celebration"],
    },
];

/// Appends domain synonyms to a query before it is embedded
#[derive(Debug, Clone, Copy)]
pub struct QueryExpander {
    table: &'static [SynonymGroup],
    enabled: bool,
}

impl Default for QueryExpander {
    #[inline]
    fn default() -> Self {
        Self::new(true)
    }
}

impl QueryExpander {
    #[inline]
    pub fn new(enabled: bool) -> Self {
        Self {
            table: SYNONYM_TABLE,
            enabled,
        }
    }

    /// Only the first matching group is applied; substring matches count
    #[inline]
    pub fn expand(&self, query: &str) -> String {
        if !self.enabled {
            return query.to_string();
        }

        let lowered = query.to_lowercase();
        let matched = self.table.iter().find(|group| {
            std::iter::once(group.key)
                .chain(group.terms.iter().copied())
                .any(|term| lowered.contains(term))
        });

        match matched {
            Some(group) => {
                debug!("Expanding query with the {} synonyms", group.key);
                format!("{} {}", query, group.terms.join(" "))
            }
            None => query.to_string(),
        }
    }
}
