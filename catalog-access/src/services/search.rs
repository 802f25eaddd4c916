//! Postfix keyword search over a tag's keyword index.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::instrument;

use super::{DataStore, ServiceError};
use crate::models::{KeywordClause, RecordId, SearchOp, SearchResultSet, TagId};

/// A validated expression step.
#[derive(Debug)]
enum Step {
    Match(KeywordClause),
    And,
    Or,
}

/// Check clause syntax and stack discipline without touching the store.
fn compile(expression: &[SearchOp]) -> Result<Vec<Step>, ServiceError> {
    let mut depth = 0usize;
    let mut steps = Vec::with_capacity(expression.len());

    for (position, op) in expression.iter().enumerate() {
        match op {
            SearchOp::Match(text) => {
                let clause = KeywordClause::parse(text).ok_or_else(|| {
                    ServiceError::MalformedExpression(format!(
                        "empty search term at position {}",
                        position
                    ))
                })?;
                depth += 1;
                steps.push(Step::Match(clause));
            }
            SearchOp::And | SearchOp::Or => {
                if depth < 2 {
                    return Err(ServiceError::MalformedExpression(format!(
                        "operator at position {} needs two operands",
                        position
                    )));
                }
                depth -= 1;
                steps.push(if *op == SearchOp::And {
                    Step::And
                } else {
                    Step::Or
                });
            }
        }
    }

    if depth != 1 {
        return Err(ServiceError::MalformedExpression(format!(
            "expression leaves {} results on the stack",
            depth
        )));
    }

    Ok(steps)
}

fn limit_of(max_results: i64) -> Option<usize> {
    (max_results > 0).then(|| usize::try_from(max_results).unwrap_or(usize::MAX))
}

/// Evaluates postfix `MATCH`/`AND`/`OR` expressions with an explicit stack
/// of polarity-tagged result sets.
pub struct QueryEvaluator {
    store: Arc<dyn DataStore>,
}

impl QueryEvaluator {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Record ids matching `expression` under `tag_id`, capped at
    /// `max_results` when it is positive.
    ///
    /// The empty expression selects every record under the tag, with the cap
    /// applied by the store. Otherwise the cap keeps the lowest ids.
    #[instrument(skip(self, expression), fields(steps = expression.len()))]
    pub async fn evaluate(
        &self,
        tag_id: TagId,
        expression: &[SearchOp],
        max_results: i64,
    ) -> Result<BTreeSet<RecordId>, ServiceError> {
        let limit = limit_of(max_results);

        if expression.is_empty() {
            metrics::counter!("access_search_total", "path" => "all").increment(1);
            let ids = self
                .store
                .lookup_records_by_tag(tag_id, limit.map(|_| max_results))
                .await?;
            return Ok(ids.into_iter().collect());
        }

        let steps = compile(expression)?;
        metrics::counter!("access_search_total", "path" => "expression").increment(1);

        let mut stack: Vec<SearchResultSet> = Vec::with_capacity(steps.len());

        for step in steps {
            match step {
                Step::Match(clause) => {
                    let set = self.match_clause(tag_id, &clause).await?;
                    stack.push(set);
                }
                Step::And | Step::Or => {
                    let (right, left) = match (stack.pop(), stack.pop()) {
                        (Some(right), Some(left)) => (right, left),
                        _ => {
                            return Err(ServiceError::MalformedExpression(
                                "operand stack underflow".to_string(),
                            ))
                        }
                    };
                    stack.push(if matches!(step, Step::And) {
                        left.and(right)
                    } else {
                        left.or(right)
                    });
                }
            }
        }

        let result = stack
            .pop()
            .map(SearchResultSet::into_matches)
            .unwrap_or_default();

        let ids: BTreeSet<RecordId> = result.into_iter().collect();
        Ok(match limit {
            Some(limit) => ids.into_iter().take(limit).collect(),
            None => ids,
        })
    }

    async fn match_clause(
        &self,
        tag_id: TagId,
        clause: &KeywordClause,
    ) -> Result<SearchResultSet, ServiceError> {
        let keyword_ids = self
            .store
            .lookup_keyword_matches(tag_id, &clause.text, clause.exact)
            .await?;

        let ids: HashSet<RecordId> = if keyword_ids.is_empty() {
            HashSet::new()
        } else {
            self.store
                .lookup_records_by_keyword_ids(&keyword_ids)
                .await?
                .into_iter()
                .collect()
        };

        tracing::debug!(
            tag_id,
            text = %clause.text,
            exact = clause.exact,
            include = clause.include,
            matches = ids.len(),
            "Search clause evaluated"
        );

        Ok(SearchResultSet::new(ids, clause.include))
    }
}
