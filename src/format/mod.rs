//! Text format
//!
//! A tree is written as one statement:
//!
//! ```text
//! tree(Drug) =
//! { (Blood_pressure)
//!   high:{ A: 3 },
//!   low:{ B: 3 },
//!   normal:{ (Age|41)
//!            <:{ A: 3 },
//!            >:{ B: 3 } } };
//! ```
//!
//! A test node names its attribute, with the cut after `|` for ordered
//! attributes, followed by its branches. Values sharing a subtree are
//! listed together before the `:`. A nominal leaf lists class
//! frequencies, a metric leaf reads `mean ~rmse [frequency]`.
pub mod parser;
pub mod printer;
pub mod scanner;

pub use parser::{parse, ParseOutcome};
pub use scanner::{Scanner, Token};

// Unit-testing
#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{Attribute, AttributeSet, Value};
    use crate::config::PrintOptions;
    use crate::constants::MAX_PARSE_DEPTH;
    use crate::errors::ParseErrorKind;
    use crate::node::{LeafValues, NodeKind, Prediction};
    use crate::testing::*;
    use crate::tree::Tree;
    use crate::utils::precision_round;
    use std::sync::Arc;

    const DRUG_TEXT: &str = "tree(Drug) =\n\
{ (Blood_pressure)\n  \
high:{ A: 3 },\n  \
low:{ B: 3 },\n  \
normal:{ (Age|41)\n           \
<:{ A: 3 },\n           \
>:{ B: 3 } } };\n";

    fn parse_drug(text: &str) -> ParseOutcome {
        Tree::from_text(drug_attributes(), text).unwrap()
    }

    fn parse_error(text: &str) -> (ParseErrorKind, usize, usize) {
        let err = Tree::from_text(drug_attributes(), text).unwrap_err();
        assert!(err.is_fatal());
        (err.kind, err.line, err.column)
    }

    #[test]
    fn test_print_drug() {
        let tree = drug_tree();
        assert_eq!(tree.to_text(&PrintOptions::default()), DRUG_TEXT);
        assert_eq!(tree.to_string(), DRUG_TEXT);

        let mut sink: Vec<u8> = Vec::new();
        tree.print(&mut sink, &PrintOptions::default()).unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), DRUG_TEXT);
    }

    #[test]
    fn test_print_aligned_relative() {
        let tree = drug_tree();
        let options = PrintOptions::default().aligned(true).with_relative(true);
        let expected = "tree(Drug) =\n\
{ (Blood_pressure)\n  \
high  :{ A: 3 (100.0%) },\n  \
low   :{ B: 3 (100.0%) },\n  \
normal:{ (Age|41)\n           \
<:{ A: 3 (100.0%) },\n           \
>:{ B: 3 (100.0%) } } };\n";
        assert_eq!(tree.to_text(&options), expected);
        // Percentages are ignored when reading back.
        let outcome = parse_drug(expected);
        assert!(outcome.is_clean());
        assert_eq!(outcome.tree.to_string(), DRUG_TEXT);
    }

    #[test]
    fn test_print_breaks_long_lines() {
        let mut tree = Tree::new(drug_attributes(), Some(DRUG)).unwrap();
        tree.create_leaf().unwrap();
        tree.set_class_frequency(0, 3.0).unwrap();
        tree.set_class_frequency(1, 3.0).unwrap();
        tree.aggregate();
        let text = tree.to_text(&PrintOptions::default().with_max_width(10));
        assert_eq!(text, "tree(Drug) =\n{ A: 3,\n  B: 3 };\n");
        assert_eq!(tree.to_string(), "tree(Drug) =\n{ A: 3, B: 3 };\n");
    }

    #[test]
    fn test_round_trip_drug() {
        let tree = drug_tree();
        let outcome = parse_drug(&tree.to_string());
        assert!(outcome.is_clean());
        let parsed = outcome.tree;
        assert_eq!(parsed.size(), tree.size());
        assert_eq!(parsed.height(), tree.height());
        assert!(!parsed.is_stale());
        for (a, b) in parsed.nodes().iter().zip(tree.nodes()) {
            assert_eq!(a, b);
        }
        assert_eq!(parsed.to_string(), DRUG_TEXT);
    }

    #[test]
    fn test_round_trip_alias() {
        let mut tree = Tree::new(drug_attributes(), Some(DRUG)).unwrap();
        tree.create_test(BLOOD_PRESSURE, 0.0).unwrap();
        tree.move_down(HIGH, false).unwrap();
        tree.create_leaf().unwrap();
        tree.set_class_frequency(0, 2.0).unwrap();
        tree.move_up(false).unwrap();
        tree.alias(LOW, HIGH).unwrap();
        tree.move_down(NORMAL, false).unwrap();
        tree.create_leaf().unwrap();
        tree.set_class_frequency(1, 1.0).unwrap();
        tree.move_to_root();
        tree.aggregate();

        let text = tree.to_string();
        assert_eq!(
            text,
            "tree(Drug) =\n{ (Blood_pressure)\n  high, low:{ A: 2 },\n  normal:{ B: 1 } };\n"
        );
        let mut parsed = parse_drug(&text).tree;
        assert_eq!(parsed.size(), 3);
        assert_eq!(parsed.total_frequency(), 3.0);
        assert_eq!(parsed.resolve_alias(LOW).unwrap(), HIGH);
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn test_round_trip_metric() {
        let tree = price_tree();
        let text = tree.to_string();
        assert!(text.contains("female:{ 5 ~0 [1] }"));
        let outcome = Tree::from_text(Arc::clone(tree.attributes()), &text).unwrap();
        assert!(outcome.is_clean());
        let parsed = outcome.tree;
        let root = parsed.node(parsed.root().unwrap()).unwrap();
        assert_eq!(root.stats.prediction, Prediction::Value(2.75));
        assert_eq!(precision_round(root.stats.error, 9), 8.75);
        let male = parsed.node(root.child(0).unwrap()).unwrap();
        match &male.kind {
            NodeKind::Leaf(LeafValues::Metric { mean, error, frequency }) => {
                assert_eq!(*mean, 2.0);
                assert_eq!(precision_round(*error, 9), 2.0);
                assert_eq!(*frequency, 3.0);
            }
            other => panic!("expected a metric leaf, found {:?}", other),
        }
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::new(drug_attributes(), Some(DRUG)).unwrap();
        assert_eq!(tree.to_string(), "tree(Drug) =\n{ };\n");
        let mut parsed = parse_drug("tree(Drug) = { };").tree;
        assert_eq!(parsed.size(), 0);
        assert_eq!(parsed.root(), None);
        assert_eq!(parsed.total_frequency(), 0.0);

        // Inside a branch an empty node is a leaf without counts.
        let parsed = parse_drug("tree(Drug) = { (Sex) male:{ } };").tree;
        assert_eq!(parsed.size(), 2);
        assert_eq!(parsed.to_string(), "tree(Drug) =\n{ (Sex)\n  male:{ A: 0 } };\n");
    }

    #[test]
    fn test_round_trip_leaf_without_counts() {
        let mut tree = Tree::new(drug_attributes(), Some(DRUG)).unwrap();
        tree.create_leaf().unwrap();
        tree.aggregate();
        let text = tree.to_string();
        assert_eq!(text, "tree(Drug) =\n{ A: 0 };\n");
        let mut parsed = parse_drug(&text).tree;
        assert_eq!(parsed.size(), 1);
        assert_eq!(parsed.height(), 1);
        assert_eq!(parsed.total_frequency(), 0.0);
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn test_print_breaks_inside_test_node() {
        let mut tree = Tree::new(drug_attributes(), Some(DRUG)).unwrap();
        tree.create_test(BLOOD_PRESSURE, 0.0).unwrap();
        tree.move_down(HIGH, false).unwrap();
        tree.create_leaf().unwrap();
        tree.set_class_frequency(0, 3.0).unwrap();
        tree.set_class_frequency(1, 2.0).unwrap();
        tree.move_to_root();
        tree.aggregate();

        // The header is wider than the line but is never split, the leaf
        // continues under its first pair.
        let text = tree.to_text(&PrintOptions::default().with_max_width(16));
        assert_eq!(
            text,
            "tree(Drug) =\n{ (Blood_pressure)\n  high:{ A: 3,\n         B: 2 } };\n"
        );
        let parsed = parse_drug(&text).tree;
        assert_eq!(
            parsed.to_string(),
            "tree(Drug) =\n{ (Blood_pressure)\n  high:{ A: 3, B: 2 } };\n"
        );
    }

    fn nested(depth: usize) -> String {
        let mut text = String::from("tree(Drug) = ");
        for _ in 0..depth {
            text.push_str("{ (Sex) male:");
        }
        text.push_str("{ A: 1 }");
        for _ in 0..depth {
            text.push_str(" }");
        }
        text.push(';');
        text
    }

    #[test]
    fn test_parse_nesting_limit() {
        let outcome = parse_drug(&nested(MAX_PARSE_DEPTH));
        assert!(outcome.is_clean());
        let mut tree = outcome.tree;
        assert_eq!(tree.size(), MAX_PARSE_DEPTH + 1);
        assert_eq!(tree.height(), MAX_PARSE_DEPTH + 1);
        assert_eq!(tree.total_frequency(), 1.0);
        let male = vec![Value::Nominal(0), Value::Null, Value::Null, Value::Null];
        assert_eq!(tree.predict(Some(&male[..]), 1.0).unwrap().support, 1.0);

        let (kind, line, _) = parse_error(&nested(MAX_PARSE_DEPTH + 1));
        assert_eq!(kind, ParseErrorKind::TooDeep(MAX_PARSE_DEPTH));
        assert_eq!(line, 1);
    }

    #[test]
    fn test_recover_unknown_attribute() {
        let outcome = parse_drug("tree(Drug) = { (Color) red:{ A: 1 } };");
        assert_eq!(outcome.errors.len(), 1);
        let err = &outcome.errors[0];
        assert!(!err.is_fatal());
        assert_eq!(err.kind, ParseErrorKind::UnknownAttribute("Color".to_string()));
        assert_eq!((err.line, err.column), (1, 17));
        assert_eq!(outcome.tree.size(), 0);
    }

    #[test]
    fn test_recover_unknown_and_duplicate_values() {
        let outcome = parse_drug(
            "tree(Drug) = { (Blood_pressure)\n  high:{ A: 1 },\n  extreme:{ B: 2 },\n  high:{ B: 5 } };",
        );
        assert_eq!(
            outcome.errors.iter().map(|e| e.kind.clone()).collect::<Vec<_>>(),
            vec![
                ParseErrorKind::UnknownValue {
                    attribute: "Blood_pressure".to_string(),
                    value: "extreme".to_string()
                },
                ParseErrorKind::DuplicateValue {
                    attribute: "Blood_pressure".to_string(),
                    value: "high".to_string()
                },
            ]
        );
        assert_eq!((outcome.errors[0].line, outcome.errors[0].column), (3, 3));
        let mut tree = outcome.tree;
        assert_eq!(tree.size(), 2);
        assert_eq!(tree.total_frequency(), 1.0);
    }

    #[test]
    fn test_recover_unknown_class() {
        let outcome = parse_drug("tree(Drug) = { A: 1, C: 2, A: 4 };");
        let kinds: Vec<_> = outcome.errors.iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                ParseErrorKind::UnknownValue {
                    attribute: "Drug".to_string(),
                    value: "C".to_string()
                },
                ParseErrorKind::DuplicateValue {
                    attribute: "Drug".to_string(),
                    value: "A".to_string()
                },
            ]
        );
        let mut tree = outcome.tree;
        assert_eq!(tree.total_frequency(), 1.0);
    }

    #[test]
    fn test_fatal_errors() {
        let (kind, line, column) = parse_error("forest(Drug) = { };");
        assert_eq!(
            kind,
            ParseErrorKind::Unexpected {
                expected: "'tree'".to_string(),
                found: "\"forest\"".to_string()
            }
        );
        assert_eq!((line, column), (1, 1));

        let (kind, line, column) = parse_error("tree(Dose) = { };");
        assert_eq!(kind, ParseErrorKind::UnknownTarget("Dose".to_string()));
        assert_eq!((line, column), (1, 6));

        let (kind, _, _) = parse_error("tree(Drug) = { A: 1 }");
        assert_eq!(
            kind,
            ParseErrorKind::Unexpected {
                expected: "';'".to_string(),
                found: "end of input".to_string()
            }
        );

        let (kind, _, _) = parse_error("tree(Drug) = { (Age) <:{ A: 1 } };");
        assert_eq!(kind, ParseErrorKind::CutMismatch("Age".to_string(), "requires a cut value"));

        let (kind, _, _) = parse_error("tree(Drug) = { (Sex|1) male:{ A: 1 } };");
        assert_eq!(kind, ParseErrorKind::CutMismatch("Sex".to_string(), "takes no cut value"));

        let (kind, line, column) = parse_error("tree(Drug) = { A: many };");
        assert_eq!(kind, ParseErrorKind::InvalidNumber("many".to_string()));
        assert_eq!((line, column), (1, 19));

        let (kind, _, _) = parse_error("tree(Drug) = { (Sex) male:{ A: 1 }");
        assert!(matches!(kind, ParseErrorKind::Unexpected { .. }));
    }

    #[test]
    fn test_comments_and_quoted_names() {
        let mut attributes = AttributeSet::new();
        attributes.add(Attribute::nominal("blood pressure", ["very high", "low"]));
        attributes.add(Attribute::nominal("Drug", ["A", "B"]));
        let attributes = Arc::new(attributes);

        let text = "// prescriptions\ntree(Drug) = /* root */ { (\"blood pressure\")\n  \"very high\":{ A: 1 },\n  low:{ B: 2 } };";
        let outcome = Tree::from_text(Arc::clone(&attributes), text).unwrap();
        assert!(outcome.is_clean());
        let mut tree = outcome.tree;
        assert_eq!(tree.size(), 3);
        assert_eq!(tree.total_frequency(), 3.0);
        assert_eq!(
            tree.to_string(),
            "tree(Drug) =\n{ (\"blood pressure\")\n  \"very high\":{ A: 1 },\n  low:{ B: 2 } };\n"
        );
    }

    #[test]
    fn test_parse_several_statements() {
        let text = "tree(Drug) = { A: 1 };\ntree(Drug) = { B: 2 };\n";
        let mut scanner = Scanner::new(text).unwrap();
        let first = parse(drug_attributes(), &mut scanner).unwrap().tree;
        let second = parse(drug_attributes(), &mut scanner).unwrap().tree;
        assert!(scanner.is_eof());
        let first_root = first.node(first.root().unwrap()).unwrap();
        let second_root = second.node(second.root().unwrap()).unwrap();
        assert_eq!(first_root.stats.prediction, Prediction::Class(0));
        assert_eq!(second_root.stats.prediction, Prediction::Class(1));
        assert_eq!(second_root.stats.frequency, 2.0);
    }
}
