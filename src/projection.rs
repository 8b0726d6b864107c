//! Projection rules are user-defined formulas over the raw fields of a
//! batch, one `name=expression` per line in an external file.
//!
//! Expressions see the fields as float variables `f1`, `f2`, … and may
//! only combine them arithmetically; a rule is data, never code.

use std::fs;
use std::path::Path;

use evalexpr::{eval_number_with_context, ContextWithMutableVariables, HashMapContext, Value};

use crate::error::Error;

/// One named formula, e.g. `cop=f2/f1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    expr: String,
}

impl Rule {
    /// The name the derived reading is published under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The formula text.
    pub fn expr(&self) -> &str {
        &self.expr
    }
}

/// An ordered set of projection rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rules(Vec<Rule>);

impl Rules {
    /// No rules at all; evaluation derives nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a projections file's contents.
    ///
    /// Blank lines are skipped. Any line without the `name=expression`
    /// shape fails the whole parse; callers treat that as an empty rule
    /// set.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let mut rules = Vec::new();

        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (name, expr) = line
                .split_once('=')
                .ok_or_else(|| Error::BadRule(line.to_string()))?;

            let (name, expr) = (name.trim(), expr.trim());
            if name.is_empty() || expr.is_empty() {
                return Err(Error::BadRule(line.to_string()));
            }

            rules.push(Rule {
                name: name.to_string(),
                expr: expr.to_string(),
            });
        }

        Ok(Self(rules))
    }

    /// Read and parse a projections file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();

        let input = fs::read_to_string(path)
            .map_err(|e| Error::BadConfig(format!("Cannot read projections file {path:?}: {e}")))?;

        Self::parse(&input)
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// How many rules there are.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Evaluate every rule against a batch's raw fields.
    ///
    /// Fields which parse as numbers become the variables `f1`…`fN`.
    /// Each rule yields either the derived `(name, value)` pair or its
    /// own failure; one bad rule never affects the others.
    pub fn evaluate(&self, fields: &[String]) -> Vec<Result<(String, String), Error>> {
        let mut context = HashMapContext::new();

        for (index, field) in fields.iter().enumerate() {
            if let Ok(value) = field.parse::<f64>() {
                context
                    .set_value(format!("f{}", index + 1), Value::Float(value))
                    .expect("A fresh context accepts any float variable");
            }
        }

        self.0
            .iter()
            .map(|rule| {
                eval_number_with_context(&rule.expr, &context)
                    .map(|value| (rule.name.clone(), value.to_string()))
                    .map_err(|e| Error::Projection {
                        name: rule.name.clone(),
                        problem: e.to_string(),
                    })
            })
            .collect()
    }
}
