//! Sandboxed rule evaluation for data-quality assertions.
//!
//! Rules are `name: expression` lines evaluated against a fixed statistics
//! environment. The expression language is a closed, auditable subset:
//! boolean operators (`and`, `or`, `not`), comparisons
//! (`==`, `!=`, `<`, `<=`, `>`, `>=`), arithmetic (`+`, `-`, `*`, `/`, `%`,
//! unary minus), parenthesized grouping, numeric and string literals, and
//! bare variable references. Everything else — function calls, attribute
//! access, subscripts, chained comparisons — is rejected before any
//! evaluation step, with an error naming the first disallowed construct.
//!
//! This is a security boundary: the evaluator is a dedicated parser and
//! tree-walking interpreter that only knows the whitelisted node types. It
//! is pure — no host-language evaluation facility, no external state, no
//! side effects. One rule's failure becomes a [`RuleViolation`] record and
//! never stops the remaining rules.

mod eval;
mod lexer;
mod parser;

pub use eval::{Env, Value};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single rule. Non-fatal: recorded, never propagated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuleError {
    /// A construct outside the whitelisted grammar.
    #[error("disallowed construct: {0}")]
    Disallowed(String),

    /// Malformed expression text.
    #[error("parse error: {0}")]
    Parse(String),

    /// A variable reference absent from the environment. Raised before any
    /// evaluation step.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// Operand types incompatible with the operator.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,
}

/// A named rule assertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub name: String,
    pub expression: String,
}

/// Outcome record for a rule that failed or evaluated false.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleViolation {
    pub rule: String,
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
}

/// Parse `name: expression` lines. `#` comments, blank lines, and lines
/// without a `:` are skipped; both sides are trimmed.
pub fn parse_rules(text: &str) -> Vec<Rule> {
    let mut rules = Vec::new();
    for line in text.lines() {
        let s = line.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((name, expression)) = s.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let expression = expression.trim();
        if !name.is_empty() && !expression.is_empty() {
            rules.push(Rule {
                name: name.to_string(),
                expression: expression.to_string(),
            });
        }
    }
    rules
}

/// Evaluate one expression against the environment, coercing to bool.
///
/// Pipeline: lex → parse → validate variables → interpret. A whitelist or
/// unknown-variable failure happens before any evaluation.
pub fn evaluate_expression(expression: &str, env: &Env) -> Result<bool, RuleError> {
    let tokens = lexer::tokenize(expression)?;
    let ast = parser::parse(&tokens)?;
    eval::validate(&ast, env)?;
    let value = eval::evaluate(&ast, env)?;
    Ok(value.truthy())
}

/// Evaluate a batch of rules. Rules that error or evaluate false become
/// violations; a failing rule never blocks the rest.
pub fn evaluate_rules(rules: &[Rule], env: &Env) -> Vec<RuleViolation> {
    let mut violations = Vec::new();
    for rule in rules {
        match evaluate_expression(&rule.expression, env) {
            Err(e) => violations.push(RuleViolation {
                rule: rule.name.clone(),
                expression: rule.expression.clone(),
                error: Some(e.to_string()),
                result: None,
            }),
            Ok(false) => violations.push(RuleViolation {
                rule: rule.name.clone(),
                expression: rule.expression.clone(),
                error: None,
                result: Some(false),
            }),
            Ok(true) => {}
        }
    }
    violations
}
