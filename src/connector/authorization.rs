//! Authentication and authorization rules.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::command::{CommandError, Inputs};
use crate::http::Request;

/// Symbol given to a rule built from a bare closure.
pub const INLINE_RULE_SYMBOL: &str = "allowed_rule";

/// Produces the caller identity for a request, if any.
pub type Authenticator = Arc<dyn Fn(&Request) -> Option<Value> + Send + Sync>;

/// What a rule gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationContext<'a> {
    pub inputs: &'a Inputs,
    pub authenticated_user: Option<&'a Value>,
    pub request: &'a Request,
}

type RuleFn = dyn Fn(&AuthorizationContext<'_>) -> bool + Send + Sync;
type ExplanationFn = dyn Fn(&AuthorizationContext<'_>) -> String + Send + Sync;

#[derive(Clone)]
pub enum Explanation {
    Text(String),
    Computed(Arc<ExplanationFn>),
}

/// A named predicate deciding whether the caller may run a command.
#[derive(Clone)]
pub struct AllowedRule {
    symbol: String,
    logic: Arc<RuleFn>,
    explanation: Option<Explanation>,
}

impl AllowedRule {
    pub fn new(
        symbol: impl Into<String>,
        logic: impl Fn(&AuthorizationContext<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            logic: Arc::new(logic),
            explanation: None,
        }
    }

    /// A rule from a bare closure.
    pub fn inline(logic: impl Fn(&AuthorizationContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self::new(INLINE_RULE_SYMBOL, logic)
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(Explanation::Text(explanation.into()));
        self
    }

    pub fn with_computed_explanation(
        mut self,
        explanation: impl Fn(&AuthorizationContext<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.explanation = Some(Explanation::Computed(Arc::new(explanation)));
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_allowed(&self, context: &AuthorizationContext<'_>) -> bool {
        (self.logic)(context)
    }

    /// The explanation, or `Not allowed: <symbol>` when none was given.
    pub fn explain(&self, context: &AuthorizationContext<'_>) -> String {
        match &self.explanation {
            Some(Explanation::Text(text)) => text.clone(),
            Some(Explanation::Computed(f)) => f(context),
            None => format!("Not allowed: {}", self.symbol),
        }
    }

    pub fn to_manifest(&self) -> Value {
        let explanation = match &self.explanation {
            Some(Explanation::Text(text)) => Value::String(text.clone()),
            Some(Explanation::Computed(_)) => Value::String("computed".to_string()),
            None => Value::String(format!("Not allowed: {}", self.symbol)),
        };
        json!({
            "symbol": self.symbol,
            "explanation": explanation,
        })
    }
}

impl fmt::Debug for AllowedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowedRule").field("symbol", &self.symbol).finish_non_exhaustive()
    }
}

/// How a connect call names its rules.
#[derive(Debug, Clone)]
pub enum AllowedRuleSpec {
    Rule(AllowedRule),
    /// Names of rules registered on the connector.
    Named(Vec<String>),
}

/// Rules registered on a connector, by symbol.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry(BTreeMap<String, AllowedRule>);

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: AllowedRule) {
        self.0.insert(rule.symbol.clone(), rule);
    }

    pub fn get(&self, symbol: &str) -> Option<&AllowedRule> {
        self.0.get(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AllowedRule> {
        self.0.values()
    }
}

/// Allowed when any rule allows. Otherwise the first denying rule explains.
pub fn authorize(rules: &[AllowedRule], context: &AuthorizationContext<'_>) -> Result<(), CommandError> {
    let Some(first) = rules.first() else {
        return Ok(());
    };
    if rules.iter().any(|rule| rule.is_allowed(context)) {
        return Ok(());
    }
    tracing::debug!(rule = %first.symbol(), "Authorization denied");
    Err(CommandError::not_allowed(first.symbol(), first.explain(context)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(context: &AuthorizationContext<'_>) -> i64 {
        context.inputs.get("base").and_then(Value::as_i64).unwrap_or_default()
    }

    #[test]
    fn test_any_rule_allows() {
        let request = Request::new("/run/X");
        let mut inputs = Inputs::new();
        inputs.insert("base".to_string(), json!(2));
        let context = AuthorizationContext { inputs: &inputs, authenticated_user: None, request: &request };

        let rules = vec![
            AllowedRule::new("must_be_1900", |c| base(c) == 1900),
            AllowedRule::new("must_be_2", |c| base(c) == 2),
        ];
        assert!(authorize(&rules, &context).is_ok());
        assert!(authorize(&[], &context).is_ok());
    }

    #[test]
    fn test_explanations() {
        let request = Request::new("/run/X");
        let mut inputs = Inputs::new();
        inputs.insert("base".to_string(), json!(2));
        let context = AuthorizationContext { inputs: &inputs, authenticated_user: None, request: &request };

        let computed = AllowedRule::new("must_be_1900", |c| base(c) == 1900)
            .with_computed_explanation(|c| format!("Must be 1900 but was {}", base(c)));
        let error = authorize(&[computed], &context).unwrap_err();
        assert_eq!(error.message(), "Must be 1900 but was 2");
        assert_eq!(error.context()["rule_symbol"], json!("must_be_1900"));

        let bare = AllowedRule::inline(|c| base(c) == 1900);
        let error = authorize(&[bare], &context).unwrap_err();
        assert_eq!(error.message(), "Not allowed: allowed_rule");
    }
}
