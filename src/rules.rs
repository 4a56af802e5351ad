//! Rules
//!
//! Flattening of a tree into one rule per leaf. Each rule is the
//! conjunction of the tests on the path to the leaf, with the leaf's
//! prediction as its head. Values sharing a subtree through aliases end
//! up in a single set condition.
use crate::attributes::AttributeSet;
use crate::errors::TreeError;
use crate::format::scanner::quote;
use crate::node::{NodeId, NodeKind, Prediction};
use crate::tree::{Target, Tree};
use crate::utils::{fmt_float, safe_divisor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Condition {
    /// Ordered attribute at or below the cut.
    AtMost { attribute: usize, cut: f64 },
    /// Ordered attribute above the cut, printed as `>=` the same cut.
    AtLeast { attribute: usize, cut: f64 },
    /// Nominal attribute taking one of the listed value ids.
    In { attribute: usize, values: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Rule {
    pub conditions: Vec<Condition>,
    pub head: Prediction,
    pub support: f64,
    /// Accuracy for a nominal target, root mean squared error for a metric one.
    pub confidence: f64,
}

/// Receiver of extracted rules.
pub trait RuleSink {
    fn add_rule(&mut self, rule: Rule);
}

impl RuleSink for Vec<Rule> {
    fn add_rule(&mut self, rule: Rule) {
        self.push(rule);
    }
}

/// Rules over a named attribute set.
#[derive(Debug, Clone)]
pub struct RuleSet {
    attributes: Arc<AttributeSet>,
    target: usize,
    rules: Vec<Rule>,
}

impl RuleSink for RuleSet {
    fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }
}

impl RuleSet {
    pub fn new(attributes: Arc<AttributeSet>, target: usize) -> Self {
        RuleSet {
            attributes,
            target,
            rules: Vec::new(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn to_json(&self) -> Result<String, TreeError> {
        serde_json::to_string_pretty(&self.rules).map_err(|e| TreeError::UnableToWrite(e.to_string()))
    }

    fn attribute_name(&self, id: usize) -> String {
        quote(self.attributes.get(id).map_or("", |a| a.name())).into_owned()
    }

    fn value_name(&self, attribute: usize, value: usize) -> String {
        let name = self
            .attributes
            .get(attribute)
            .and_then(|a| a.value_name(value))
            .unwrap_or("");
        quote(name).into_owned()
    }

    fn fmt_condition(&self, condition: &Condition) -> String {
        match condition {
            Condition::AtMost { attribute, cut } => {
                format!("{} <= {}", self.attribute_name(*attribute), fmt_float(*cut))
            }
            Condition::AtLeast { attribute, cut } => {
                format!("{} >= {}", self.attribute_name(*attribute), fmt_float(*cut))
            }
            Condition::In { attribute, values } if values.len() == 1 => {
                format!("{} = {}", self.attribute_name(*attribute), self.value_name(*attribute, values[0]))
            }
            Condition::In { attribute, values } => {
                let names: Vec<String> = values.iter().map(|v| self.value_name(*attribute, *v)).collect();
                format!("{} in {{{}}}", self.attribute_name(*attribute), names.join(", "))
            }
        }
    }

    /// `Drug = A <- Blood_pressure = normal && Age <= 41 [3, 1]`
    pub fn fmt_rule(&self, rule: &Rule) -> String {
        let head = match rule.head {
            Prediction::Class(c) => self.value_name(self.target, c),
            Prediction::Value(v) => fmt_float(v),
        };
        let mut s = format!("{} = {}", self.attribute_name(self.target), head);
        if !rule.conditions.is_empty() {
            let conditions: Vec<String> = rule.conditions.iter().map(|c| self.fmt_condition(c)).collect();
            s.push_str(" <- ");
            s.push_str(&conditions.join(" && "));
        }
        s.push_str(&format!(" [{}, {}]", fmt_float(rule.support), fmt_float(rule.confidence)));
        s
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{}", self.fmt_rule(rule))?;
        }
        Ok(())
    }
}

impl Tree {
    /// Depth-first walk from `root`. Each stack entry carries the number
    /// of ancestor conditions and its own condition; the scratch list is
    /// cut back to that length before the entry is visited.
    fn collect_rules<S: RuleSink>(&self, root: NodeId, sink: &mut S) {
        let mut scratch: Vec<Condition> = Vec::new();
        let mut stack: Vec<(NodeId, usize, Option<Condition>)> = vec![(root, 0, None)];
        while let Some((id, depth, condition)) = stack.pop() {
            scratch.truncate(depth);
            scratch.extend(condition);
            let node = &self.nodes[id];
            let NodeKind::Test { attribute, cut, branches } = &node.kind else {
                let stats = node.stats;
                let confidence = match self.target_type() {
                    Target::Nominal { .. } => 1.0 - stats.error / safe_divisor(stats.frequency),
                    Target::Metric => (stats.error / safe_divisor(stats.frequency)).sqrt(),
                };
                sink.add_rule(Rule {
                    conditions: scratch.clone(),
                    head: stats.prediction,
                    support: stats.frequency,
                    confidence,
                });
                continue;
            };
            let (attribute, cut) = (*attribute, *cut);
            let depth = scratch.len();
            let mut children = Vec::new();
            if self.attributes().get(attribute).is_some_and(|a| a.is_ordered()) {
                if let Some(low) = node.child(0) {
                    children.push((low, depth, Some(Condition::AtMost { attribute, cut })));
                }
                if let Some(high) = node.child(1) {
                    children.push((high, depth, Some(Condition::AtLeast { attribute, cut })));
                }
            } else {
                for (_, child) in node.owned_children() {
                    let values: Vec<usize> = (0..branches.len()).filter(|&v| node.child(v) == Some(child)).collect();
                    children.push((child, depth, Some(Condition::In { attribute, values })));
                }
            }
            stack.extend(children.into_iter().rev());
        }
    }

    /// Send one rule per leaf to `sink`, in depth-first order.
    pub fn extract_rules_into<S: RuleSink>(&self, sink: &mut S) -> Result<(), TreeError> {
        if self.is_stale() {
            return Err(TreeError::NotAggregated);
        }
        if let Some(root) = self.root {
            self.collect_rules(root, sink);
        }
        Ok(())
    }

    /// Flatten the tree into a rule set.
    pub fn extract_rules(&self) -> Result<RuleSet, TreeError> {
        let mut rules = RuleSet::new(Arc::clone(self.attributes()), self.target());
        self.extract_rules_into(&mut rules)?;
        Ok(rules)
    }
}
