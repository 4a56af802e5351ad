use super::scanner::quote;
use crate::config::PrintOptions;
use crate::constants::TREE_KEYWORD;
use crate::errors::TreeError;
use crate::node::{LeafValues, Node, NodeId, NodeKind};
use crate::tree::Tree;
use crate::utils::{fmt_float, safe_divisor};
use hashbrown::HashMap;
use std::fmt;
use std::io;

/// Pending output, processed from a stack in pre-order.
enum Step {
    Node(Option<NodeId>),
    Label { text: String, indent: usize, width: usize },
    Text(&'static str),
}

struct Printer<'t> {
    tree: &'t Tree,
    options: &'t PrintOptions,
    out: String,
    column: usize,
}

impl<'t> Printer<'t> {
    fn newline(&mut self, indent: usize) {
        self.out.push('\n');
        self.out.extend(std::iter::repeat(' ').take(indent));
        self.column = indent;
    }

    fn raw(&mut self, s: &str) {
        self.out.push_str(s);
        self.column += s.chars().count();
    }

    /// Write a token, first breaking the line if the token would pass
    /// the maximum width. Tokens are never split. A `spaced` token is
    /// separated by a blank unless it starts a new line.
    fn token(&mut self, s: &str, indent: usize, spaced: bool) {
        let len = s.chars().count() + usize::from(spaced);
        if self.column > indent && self.column + len > self.options.max_width {
            self.newline(indent);
        } else if spaced {
            self.raw(" ");
        }
        self.raw(s);
    }

    fn attribute_name(&self, id: usize) -> String {
        let name = self.tree.attributes().get(id).map_or("", |a| a.name());
        quote(name).into_owned()
    }

    fn value_name(&self, attribute: usize, value: usize) -> String {
        let name = self
            .tree
            .attributes()
            .get(attribute)
            .and_then(|a| a.value_name(value))
            .unwrap_or("");
        quote(name).into_owned()
    }

    fn leaf(&mut self, values: &LeafValues) {
        let indent = self.column;
        match values {
            LeafValues::Classes(frequencies) => {
                let total = safe_divisor(frequencies.iter().sum());
                let target = self.tree.target();
                // A leaf without counts keeps its first class, `{ }` would read
                // back as an empty tree at the root.
                let empty = frequencies.iter().all(|&f| f == 0.0);
                let mut first = true;
                for (class, &frequency) in frequencies.iter().enumerate() {
                    if frequency == 0.0 && !(empty && class == 0) {
                        continue;
                    }
                    if !first {
                        self.raw(",");
                    }
                    let pair = format!("{}: {}", self.value_name(target, class), fmt_float(frequency));
                    self.token(&pair, indent, !first);
                    first = false;
                    if self.options.relative {
                        self.token(&format!("({:.1}%)", 100.0 * frequency / total), indent, true);
                    }
                }
            }
            LeafValues::Metric { mean, error, frequency } => {
                let rmse = (error / safe_divisor(*frequency)).sqrt();
                self.token(&fmt_float(*mean), indent, false);
                self.token(&format!("~{}", fmt_float(rmse)), indent, true);
                self.token(&format!("[{}]", fmt_float(*frequency)), indent, true);
            }
        }
    }

    /// Children of a test node with the labels of the branches leading
    /// to them. Branches sharing a child through aliases form one label.
    fn groups(&self, node: &Node, attribute: usize) -> Vec<(NodeId, String)> {
        let ordered = self.tree.attributes().get(attribute).is_some_and(|a| a.is_ordered());
        if ordered {
            return node
                .owned_children()
                .map(|(i, child)| (child, String::from(if i == 0 { "<" } else { ">" })))
                .collect();
        }
        let mut groups: Vec<(NodeId, Vec<usize>)> = Vec::new();
        let mut position: HashMap<NodeId, usize> = HashMap::new();
        for i in 0..node.branches().len() {
            let Some(child) = node.child(i) else { continue };
            let g = *position.entry(child).or_insert_with(|| {
                groups.push((child, Vec::new()));
                groups.len() - 1
            });
            groups[g].1.push(i);
        }
        groups
            .into_iter()
            .map(|(child, values)| {
                let names: Vec<String> = values.iter().map(|&v| self.value_name(attribute, v)).collect();
                (child, names.join(", "))
            })
            .collect()
    }

    fn run(&mut self) {
        self.raw(&format!("{}({}) =", TREE_KEYWORD, self.attribute_name(self.tree.target())));
        self.newline(0);
        let mut stack = vec![Step::Node(self.tree.root())];
        while let Some(step) = stack.pop() {
            match step {
                Step::Text(s) => self.raw(s),
                Step::Label { text, indent, width } => {
                    self.newline(indent);
                    self.raw(&text);
                    let pad = width.saturating_sub(text.chars().count());
                    self.raw(&" ".repeat(pad));
                    self.raw(":");
                }
                Step::Node(None) => self.raw("{ }"),
                Step::Node(Some(id)) => {
                    let tree = self.tree;
                    let node = &tree.nodes()[id];
                    let brace = self.column;
                    self.raw("{ ");
                    match &node.kind {
                        NodeKind::Leaf(values) => {
                            self.leaf(values);
                            self.raw(" }");
                        }
                        NodeKind::Test { attribute, cut, .. } => {
                            let mut header = format!("({}", self.attribute_name(*attribute));
                            if tree.attributes().get(*attribute).is_some_and(|a| a.is_ordered()) {
                                header.push('|');
                                header.push_str(&fmt_float(*cut));
                            }
                            header.push(')');
                            self.token(&header, brace + 2, false);
                            let groups = self.groups(node, *attribute);
                            let indent = brace + self.options.indent;
                            let width = if self.options.align {
                                groups.iter().map(|(_, l)| l.chars().count()).max().unwrap_or(0)
                            } else {
                                0
                            };
                            stack.push(Step::Text(" }"));
                            let last = groups.len().saturating_sub(1);
                            for (g, (child, text)) in groups.into_iter().enumerate().rev() {
                                if g != last {
                                    stack.push(Step::Text(","));
                                }
                                stack.push(Step::Node(Some(child)));
                                stack.push(Step::Label { text, indent, width });
                            }
                        }
                    }
                }
            }
        }
        self.raw(";");
        self.out.push('\n');
    }
}

impl Tree {
    /// Render the tree in its textual form.
    pub fn to_text(&self, options: &PrintOptions) -> String {
        let mut printer = Printer {
            tree: self,
            options,
            out: String::new(),
            column: 0,
        };
        printer.run();
        printer.out
    }

    /// Write the textual form of the tree to a sink.
    pub fn print<W: io::Write>(&self, sink: &mut W, options: &PrintOptions) -> Result<(), TreeError> {
        sink.write_all(self.to_text(options).as_bytes())
            .map_err(|e| TreeError::UnableToWrite(e.to_string()))
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_text(&PrintOptions::default()))
    }
}
