//! Fixtures shared by the unit tests.
use crate::attributes::{Attribute, AttributeSet, Value};
use crate::tree::Tree;
use std::sync::Arc;

pub const SEX: usize = 0;
pub const AGE: usize = 1;
pub const BLOOD_PRESSURE: usize = 2;
pub const DRUG: usize = 3;

pub const HIGH: usize = 0;
pub const LOW: usize = 1;
pub const NORMAL: usize = 2;

pub fn drug_attribute_set() -> AttributeSet {
    let mut attributes = AttributeSet::new();
    attributes.add(Attribute::nominal("Sex", ["male", "female"]));
    attributes.add(Attribute::integer("Age"));
    attributes.add(Attribute::nominal("Blood_pressure", ["high", "low", "normal"]));
    attributes.add(Attribute::nominal("Drug", ["A", "B"]));
    attributes
}

pub fn drug_attributes() -> Arc<AttributeSet> {
    Arc::new(drug_attribute_set())
}

/// The rows of `resources/drug.csv` as values.
pub fn drug_rows(attributes: &AttributeSet) -> Vec<Vec<Value>> {
    let mut reader = csv::Reader::from_path("resources/drug.csv").expect("drug.csv should be readable");
    let headers = reader.headers().unwrap().clone();
    let ids: Vec<usize> = headers.iter().map(|h| attributes.lookup(h).unwrap()).collect();
    reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            let mut row = vec![Value::Null; attributes.len()];
            for (field, &id) in record.iter().zip(&ids) {
                let attribute = attributes.get(id).unwrap();
                row[id] = if attribute.is_nominal() {
                    Value::Nominal(attribute.value_id(field).unwrap())
                } else {
                    Value::Int(field.parse().unwrap())
                };
            }
            row
        })
        .collect()
}

pub fn row(sex: usize, age: Value, blood_pressure: Value) -> Vec<Value> {
    vec![Value::Nominal(sex), age, blood_pressure, Value::Null]
}

/// Blood_pressure at the root; high and low are leaves, normal splits
/// on Age at 41. Leaf frequencies are counted from the drug table.
pub fn drug_tree() -> Tree {
    let attributes = drug_attributes();
    let mut tree = Tree::new(Arc::clone(&attributes), Some(DRUG)).unwrap();
    tree.create_test(BLOOD_PRESSURE, 0.0).unwrap();
    for value in [HIGH, LOW] {
        tree.move_down(value, false).unwrap();
        tree.create_leaf().unwrap();
        tree.move_up(false).unwrap();
    }
    tree.move_down(NORMAL, false).unwrap();
    tree.create_test(AGE, 41.0).unwrap();
    for side in [0, 1] {
        tree.move_down(side, false).unwrap();
        tree.create_leaf().unwrap();
        tree.move_up(false).unwrap();
    }
    tree.move_to_root();

    for row in drug_rows(&attributes) {
        tree.move_to_root();
        let Value::Nominal(bp) = row[BLOOD_PRESSURE] else { unreachable!() };
        tree.move_down(bp, false).unwrap();
        let node = tree.node(tree.cursor_node().unwrap()).unwrap();
        if !node.is_leaf() {
            let age = row[AGE].as_f64().unwrap();
            tree.move_down(if age <= 41.0 { 0 } else { 1 }, false).unwrap();
        }
        let Value::Nominal(drug) = row[DRUG] else { unreachable!() };
        tree.add_class_frequency(drug, 1.0).unwrap();
    }
    tree.move_to_root();
    tree.aggregate();
    tree
}

/// Regression on Price, split on Sex: male prices 1, 2, 3 and a
/// single female price 5.
pub fn price_tree() -> Tree {
    let mut attributes = AttributeSet::new();
    attributes.add(Attribute::nominal("Sex", ["male", "female"]));
    let price = attributes.add(Attribute::float("Price"));
    let mut tree = Tree::new(Arc::new(attributes), Some(price)).unwrap();
    tree.create_test(SEX, 0.0).unwrap();
    tree.move_down(0, false).unwrap();
    tree.create_leaf().unwrap();
    tree.set_leaf_value(2.0, 2.0, 3.0).unwrap();
    tree.move_up(false).unwrap();
    tree.move_down(1, false).unwrap();
    tree.create_leaf().unwrap();
    tree.set_leaf_value(5.0, 0.0, 1.0).unwrap();
    tree.move_to_root();
    tree.aggregate();
    tree
}
