//! Search expression model: postfix operations, keyword clauses and the
//! polarity-tagged result sets the evaluator keeps on its stack.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::RecordId;

/// One step of a postfix search expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "text", rename_all = "lowercase")]
pub enum SearchOp {
    Match(String),
    And,
    Or,
}

impl SearchOp {
    pub fn matching(text: impl Into<String>) -> Self {
        SearchOp::Match(text.into())
    }
}

/// A parsed `MATCH` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordClause {
    /// Text handed to the keyword index. Lowercased for exact clauses.
    pub text: String,
    /// Whole-value, case-insensitive match instead of a prefix match.
    pub exact: bool,
    /// False when the clause asks to exclude its matches.
    pub include: bool,
}

impl KeywordClause {
    /// Classify raw clause text.
    ///
    /// `-foo` excludes, `"foo"` matches exactly, and `-"foo"` or `"-foo"`
    /// do both. Returns `None` when nothing is left to match on.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut text = raw.trim();
        let mut include = true;

        if let Some(rest) = text.strip_prefix('-') {
            include = false;
            text = rest.trim_start();
        }

        let exact = text.len() >= 2 && text.starts_with('"') && text.ends_with('"');

        if exact {
            text = &text[1..text.len() - 1];

            if include {
                if let Some(rest) = text.strip_prefix('-') {
                    include = false;
                    text = rest;
                }
            }
        }

        if text.is_empty() {
            return None;
        }

        let text = if exact {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        Some(Self {
            text,
            exact,
            include,
        })
    }
}

/// Record ids plus the polarity of the clause that produced them.
///
/// A negative set holds the records a negated clause matched; it only turns
/// into "everything except these" when combined with a positive set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultSet {
    pub ids: HashSet<RecordId>,
    pub include: bool,
}

impl SearchResultSet {
    pub fn new(ids: HashSet<RecordId>, include: bool) -> Self {
        Self { ids, include }
    }

    pub fn included(ids: impl IntoIterator<Item = RecordId>) -> Self {
        Self::new(ids.into_iter().collect(), true)
    }

    pub fn excluded(ids: impl IntoIterator<Item = RecordId>) -> Self {
        Self::new(ids.into_iter().collect(), false)
    }

    /// Combine with `AND`.
    ///
    /// Two negative operands give the negative union (not (a or b)).
    pub fn and(self, other: SearchResultSet) -> SearchResultSet {
        match (self.include, other.include) {
            (true, true) => SearchResultSet::new(
                self.ids.intersection(&other.ids).copied().collect(),
                true,
            ),
            (true, false) => {
                SearchResultSet::new(self.ids.difference(&other.ids).copied().collect(), true)
            }
            (false, true) => {
                SearchResultSet::new(other.ids.difference(&self.ids).copied().collect(), true)
            }
            (false, false) => {
                SearchResultSet::new(self.ids.union(&other.ids).copied().collect(), false)
            }
        }
    }

    /// Combine with `OR`.
    ///
    /// A single negative operand is dropped rather than distributed. Two
    /// negative operands give the negative intersection (not (a and b)).
    pub fn or(self, other: SearchResultSet) -> SearchResultSet {
        match (self.include, other.include) {
            (true, true) => {
                SearchResultSet::new(self.ids.union(&other.ids).copied().collect(), true)
            }
            (true, false) => self,
            (false, true) => other,
            (false, false) => SearchResultSet::new(
                self.ids.intersection(&other.ids).copied().collect(),
                false,
            ),
        }
    }

    /// The ids a caller may receive: a negative set on its own selects
    /// nothing.
    pub fn into_matches(self) -> HashSet<RecordId> {
        if self.include {
            self.ids
        } else {
            HashSet::new()
        }
    }
}
