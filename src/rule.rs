//! Rules: a query paired with an action.

use crate::action::Action;
use crate::error::Error;
use crate::pattern::Query;

/// A rewrite rule.
///
/// Construction fails fast unless every pattern variable the action mentions
/// is bound by the query, so action execution can treat an unbound variable
/// as a hard error rather than a latent typo.
#[derive(Clone, Debug)]
pub struct Rule {
    query: Query,
    action: Action,
}

impl Rule {
    /// Build a rule, checking that the action's variables are a subset of
    /// the query's.
    pub fn new(query: Query, action: Action) -> Result<Rule, Error> {
        let qvars = query.pvars();
        let missing: Vec<String> = action
            .pvars()
            .into_iter()
            .filter(|v| !qvars.contains(v))
            .collect();
        if !missing.is_empty() {
            return Err(Error::RuleVars { missing });
        }
        Ok(Rule { query, action })
    }

    /// The query side.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// The action side.
    pub fn action(&self) -> &Action {
        &self.action
    }
}
