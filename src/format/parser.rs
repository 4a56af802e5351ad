use super::scanner::{Scanner, Token};
use crate::attributes::{Attribute, AttributeSet};
use crate::constants::{MAX_PARSE_DEPTH, TREE_KEYWORD};
use crate::errors::{ParseError, ParseErrorKind, TreeError};
use crate::tree::{Target, Tree};
use log::{info, warn};
use std::sync::Arc;

/// A parsed tree together with the recoverable errors met on the way.
/// With errors present the tree is a best effort: the offending
/// subtrees are left out.
#[derive(Debug)]
pub struct ParseOutcome {
    pub tree: Tree,
    pub errors: Vec<ParseError>,
}

impl ParseOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A test node whose branches are still being read.
struct Frame {
    attribute: usize,
    seen: Vec<bool>,
}

struct Parser<'s, 'a> {
    scanner: &'s mut Scanner<'a>,
    errors: Vec<ParseError>,
}

impl<'s, 'a> Parser<'s, 'a> {
    fn unexpected(&self, expected: &str) -> ParseError {
        self.scanner.error(ParseErrorKind::Unexpected {
            expected: expected.to_string(),
            found: self.scanner.token().to_string(),
        })
    }

    fn tree_error(&self, e: TreeError) -> ParseError {
        self.scanner.error(e.into())
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.scanner.advance()
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if !self.scanner.is_punct(c) {
            return Err(self.unexpected(&format!("'{}'", c)));
        }
        self.advance()
    }

    fn word(&mut self, what: &str) -> Result<String, ParseError> {
        let Token::Word(w) = self.scanner.token() else {
            return Err(self.unexpected(what));
        };
        let w = w.clone();
        self.advance()?;
        Ok(w)
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let (line, column) = self.scanner.position();
        let w = self.word("a number")?;
        w.parse::<f64>()
            .map_err(|_| ParseError::new(ParseErrorKind::InvalidNumber(w), line, column))
    }

    fn recover(&mut self, kind: ParseErrorKind, (line, column): (usize, usize)) {
        let err = ParseError::new(kind, line, column);
        warn!("{}", err);
        self.errors.push(err);
    }

    /// Skip to the brace closing the current block, the opening brace
    /// having been read already.
    fn skip_block(&mut self) -> Result<(), ParseError> {
        let mut depth = 1;
        while depth > 0 {
            match self.scanner.token() {
                Token::Eof => return Err(self.unexpected("'}'")),
                Token::Punct('{') => depth += 1,
                Token::Punct('}') => depth -= 1,
                _ => {}
            }
            self.advance()?;
        }
        Ok(())
    }

    fn skip_subtree(&mut self) -> Result<(), ParseError> {
        self.expect('{')?;
        self.skip_block()
    }

    fn header(&mut self, attributes: &AttributeSet) -> Result<usize, ParseError> {
        let position = self.scanner.position();
        let keyword = self.word(&format!("'{}'", TREE_KEYWORD))?;
        if keyword != TREE_KEYWORD {
            let kind = ParseErrorKind::Unexpected {
                expected: format!("'{}'", TREE_KEYWORD),
                found: format!("\"{}\"", keyword),
            };
            return Err(ParseError::new(kind, position.0, position.1));
        }
        self.expect('(')?;
        let (line, column) = self.scanner.position();
        let name = self.word("a target attribute")?;
        let target = attributes
            .lookup(&name)
            .ok_or_else(|| ParseError::new(ParseErrorKind::UnknownTarget(name), line, column))?;
        self.expect(')')?;
        self.expect('=')?;
        Ok(target)
    }

    /// Read a whole `<node>`. Open test nodes are kept on an explicit
    /// stack, so nesting is limited by `MAX_PARSE_DEPTH` only.
    fn body(&mut self, tree: &mut Tree) -> Result<(), ParseError> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut at_node = true;
        loop {
            if at_node {
                match self.node(tree)? {
                    Some(frame) => {
                        if frames.len() >= MAX_PARSE_DEPTH {
                            return Err(self.scanner.error(ParseErrorKind::TooDeep(MAX_PARSE_DEPTH)));
                        }
                        frames.push(frame);
                        let top = frames.len() - 1;
                        at_node = self.branch(tree, &mut frames[top])?;
                        continue;
                    }
                    None if frames.is_empty() => return Ok(()),
                    None => tree.move_up(false).map_err(|e| self.tree_error(e))?,
                }
            }
            // After a branch of the innermost open test node.
            let Some(frame) = frames.last_mut() else { return Ok(()) };
            if self.scanner.is_punct(',') {
                self.advance()?;
                at_node = self.branch(tree, frame)?;
                continue;
            }
            self.expect('}')?;
            frames.pop();
            if frames.is_empty() {
                return Ok(());
            }
            tree.move_up(false).map_err(|e| self.tree_error(e))?;
            at_node = false;
        }
    }

    /// `{ }`, `{ <leaf> }` or the start of `{ (<attribute>[|<cut>]) <branch>, ... }`.
    /// Returns the frame of a test node whose branches follow.
    fn node(&mut self, tree: &mut Tree) -> Result<Option<Frame>, ParseError> {
        self.expect('{')?;
        if self.scanner.is_punct('}') {
            self.advance()?;
            if tree.depth() > 0 {
                tree.create_leaf().map_err(|e| self.tree_error(e))?;
            }
            return Ok(None);
        }
        if self.scanner.is_punct('(') {
            self.advance()?;
            return self.test(tree);
        }
        tree.create_leaf().map_err(|e| self.tree_error(e))?;
        self.leaf(tree)?;
        self.expect('}')?;
        Ok(None)
    }

    fn leaf(&mut self, tree: &mut Tree) -> Result<(), ParseError> {
        if tree.target_type() == Target::Metric {
            let mean = self.number()?;
            self.expect('~')?;
            let rmse = self.number()?;
            self.expect('[')?;
            let frequency = self.number()?;
            self.expect(']')?;
            return tree
                .set_leaf_value(mean, rmse * rmse * frequency, frequency)
                .map_err(|e| self.tree_error(e));
        }
        let attributes = Arc::clone(tree.attributes());
        let Some(target) = attributes.get(tree.target()) else {
            return Err(self.tree_error(TreeError::UnknownAttribute(tree.target())));
        };
        let mut seen = vec![false; target.value_count()];
        loop {
            let position = self.scanner.position();
            let name = self.word("a class name")?;
            self.expect(':')?;
            let frequency = self.number()?;
            if self.scanner.is_punct('(') {
                self.advance()?;
                self.word("a percentage")?;
                self.expect(')')?;
            }
            match target.value_id(&name) {
                None => self.recover(value_error(target, name, false), position),
                Some(class) if seen[class] => self.recover(value_error(target, name, true), position),
                Some(class) => {
                    seen[class] = true;
                    tree.set_class_frequency(class, frequency)
                        .map_err(|e| self.tree_error(e))?;
                }
            }
            if !self.scanner.is_punct(',') {
                return Ok(());
            }
            self.advance()?;
        }
    }

    fn test(&mut self, tree: &mut Tree) -> Result<Option<Frame>, ParseError> {
        let position = self.scanner.position();
        let name = self.word("an attribute name")?;
        let attributes = Arc::clone(tree.attributes());
        let Some(id) = attributes.lookup(&name) else {
            self.recover(ParseErrorKind::UnknownAttribute(name), position);
            self.skip_block()?;
            return Ok(None);
        };
        let attribute = attributes.get(id).ok_or_else(|| self.tree_error(TreeError::UnknownAttribute(id)))?;
        let cut = if attribute.is_ordered() {
            if !self.scanner.is_punct('|') {
                return Err(self.scanner.error(ParseErrorKind::CutMismatch(name, "requires a cut value")));
            }
            self.advance()?;
            self.number()?
        } else {
            if self.scanner.is_punct('|') {
                return Err(self.scanner.error(ParseErrorKind::CutMismatch(name, "takes no cut value")));
            }
            0.0
        };
        self.expect(')')?;
        tree.create_test(id, cut).map_err(|e| self.tree_error(e))?;
        if self.scanner.is_punct('}') {
            self.advance()?;
            return Ok(None);
        }
        let n_branches = if attribute.is_ordered() { 2 } else { attribute.value_count() };
        Ok(Some(Frame {
            attribute: id,
            seen: vec![false; n_branches],
        }))
    }

    /// `<`/`>` or a list of value names, then `:`. Every name after the
    /// first becomes an alias of the first. Returns whether the cursor
    /// moved down into the branch, whose subtree is read next; a rejected
    /// branch has its subtree skipped instead.
    fn branch(&mut self, tree: &mut Tree, frame: &mut Frame) -> Result<bool, ParseError> {
        let attributes = Arc::clone(tree.attributes());
        let attribute = attributes
            .get(frame.attribute)
            .ok_or_else(|| self.tree_error(TreeError::UnknownAttribute(frame.attribute)))?;
        let seen = &mut frame.seen;
        if attribute.is_ordered() {
            let position = self.scanner.position();
            let (index, label) = match self.scanner.token() {
                Token::Punct('<') => (0, "<"),
                Token::Punct('>') => (1, ">"),
                _ => return Err(self.unexpected("'<' or '>'")),
            };
            self.advance()?;
            self.expect(':')?;
            if seen[index] {
                self.recover(value_error(attribute, label.to_string(), true), position);
                self.skip_subtree()?;
                return Ok(false);
            }
            seen[index] = true;
            tree.move_down(index, false).map_err(|e| self.tree_error(e))?;
            return Ok(true);
        }
        let mut values: Vec<usize> = Vec::new();
        let mut valid = true;
        loop {
            let position = self.scanner.position();
            let name = self.word("a value name")?;
            match attribute.value_id(&name) {
                None => {
                    self.recover(value_error(attribute, name, false), position);
                    valid = false;
                }
                Some(v) if seen[v] || values.contains(&v) => {
                    self.recover(value_error(attribute, name, true), position);
                    valid = false;
                }
                Some(v) => values.push(v),
            }
            if !self.scanner.is_punct(',') {
                break;
            }
            self.advance()?;
        }
        self.expect(':')?;
        if !valid {
            self.skip_subtree()?;
            return Ok(false);
        }
        let first = values[0];
        for &v in &values {
            seen[v] = true;
            if v != first {
                tree.alias(v, first).map_err(|e| self.tree_error(e))?;
            }
        }
        tree.move_down(first, false).map_err(|e| self.tree_error(e))?;
        Ok(true)
    }
}

fn value_error(attribute: &Attribute, value: String, duplicate: bool) -> ParseErrorKind {
    let attribute = attribute.name().to_string();
    if duplicate {
        ParseErrorKind::DuplicateValue { attribute, value }
    } else {
        ParseErrorKind::UnknownValue { attribute, value }
    }
}

/// Parse one `tree(<target>) = <node>;` statement from the scanner.
///
/// Fatal errors abort with `Err`. Unknown names and duplicate values are
/// collected in the outcome and the affected subtree is skipped. The
/// returned tree has been aggregated.
pub fn parse(attributes: Arc<AttributeSet>, scanner: &mut Scanner) -> Result<ParseOutcome, ParseError> {
    let mut parser = Parser {
        scanner,
        errors: Vec::new(),
    };
    let target = parser.header(&attributes)?;
    let mut tree = Tree::new(attributes, Some(target)).map_err(|e| parser.tree_error(e))?;
    parser.body(&mut tree)?;
    parser.expect(';')?;
    tree.move_to_root();
    tree.aggregate();
    info!(
        "parsed tree with {} nodes, height {}, {} errors",
        tree.size(),
        tree.height(),
        parser.errors.len()
    );
    Ok(ParseOutcome {
        tree,
        errors: parser.errors,
    })
}

impl Tree {
    /// Parse a tree from its textual form.
    pub fn from_text(attributes: Arc<AttributeSet>, text: &str) -> Result<ParseOutcome, ParseError> {
        let mut scanner = Scanner::new(text)?;
        parse(attributes, &mut scanner)
    }
}
