//! Tests for the snapshot serializer: round-trip law, legacy shapes, corrupt input

use proptest::prelude::*;
use prompt_kun::domain::snapshot::{
    from_json, from_object, from_value, structurally_equal, to_json, to_object,
};
use prompt_kun::domain::{
    compile, Composition, DomainError, Factor, FactorPolicy, NodeData, Parent, SnapshotError,
};
use prompt_kun::util::testing;
use rstest::rstest;
use serde_json::json;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

// ============================================================
// Round-trip law
// ============================================================

#[derive(Debug, Clone)]
enum Shape {
    Fragment {
        text: String,
        enabled: bool,
        factor: Option<u64>,
        negative: bool,
    },
    Group {
        name: String,
        enabled: bool,
        factor: Option<u64>,
        negative: bool,
        children: Vec<Shape>,
    },
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = (
        "[a-z ]{0,8}",
        any::<bool>(),
        prop::option::of(0u64..=Factor::MAX.hundredths()),
        any::<bool>(),
    )
        .prop_map(|(text, enabled, factor, negative)| Shape::Fragment {
            text,
            enabled,
            factor,
            negative,
        });
    leaf.prop_recursive(4, 32, 5, |inner| {
        (
            "[a-z]{0,6}",
            any::<bool>(),
            prop::option::of(0u64..=Factor::MAX.hundredths()),
            any::<bool>(),
            prop::collection::vec(inner, 0..5),
        )
            .prop_map(|(name, enabled, factor, negative, children)| Shape::Group {
                name,
                enabled,
                factor,
                negative,
                children,
            })
    })
}

fn build(tree: &mut Composition, parent: Parent, shape: &Shape) -> Result<(), DomainError> {
    let (id, enabled, factor, negative) = match shape {
        Shape::Fragment {
            text,
            enabled,
            factor,
            negative,
        } => (
            tree.insert_fragment(parent, usize::MAX, text)?,
            enabled,
            factor,
            negative,
        ),
        Shape::Group {
            name,
            enabled,
            factor,
            negative,
            children,
        } => {
            let id = tree.insert_group(parent, usize::MAX, name)?;
            for child in children {
                build(tree, Parent::Group(id), child)?;
            }
            (id, enabled, factor, negative)
        }
    };
    tree.set_enabled(id, *enabled)?;
    tree.set_factor_value(id, factor.map(Factor::from_hundredths))?;
    tree.set_negative(id, *negative)?;
    Ok(())
}

proptest! {
    #[test]
    fn object_round_trip_preserves_structure(shapes in prop::collection::vec(shape(), 0..6)) {
        let mut tree = Composition::new();
        for s in &shapes {
            build(&mut tree, Parent::Root, s).unwrap();
        }

        let via_object = from_object(&to_object(&tree));
        prop_assert!(structurally_equal(&tree, &via_object));

        let via_json = from_json(&to_json(&tree, false).unwrap()).unwrap();
        prop_assert!(structurally_equal(&tree, &via_json));
        prop_assert_eq!(
            compile(&tree, FactorPolicy::Wrap),
            compile(&via_json, FactorPolicy::Wrap)
        );
    }
}

#[test]
fn given_pretty_and_compact_json_when_parsing_then_same_tree() {
    let mut tree = Composition::new();
    let g = tree.insert_group(Parent::Root, 0, "n!bg").unwrap();
    let f = tree.insert_fragment(Parent::Group(g), 0, "cloud").unwrap();
    tree.set_factor(f, "0.8").unwrap();

    let pretty = from_json(&to_json(&tree, true).unwrap()).unwrap();
    let compact = from_json(&to_json(&tree, false).unwrap()).unwrap();

    assert!(structurally_equal(&pretty, &compact));
    assert!(structurally_equal(&tree, &pretty));
}

#[rstest]
#[case("123456789012345.67")]
#[case("90071992547409.91")]
#[case("1e300")]
fn test_large_factor_survives_json_round_trip(#[case] raw: &str) {
    let mut tree = Composition::new();
    let id = tree.insert_fragment(Parent::Root, 0, "sky").unwrap();
    tree.set_factor(id, raw).unwrap();

    let rebuilt = from_json(&to_json(&tree, false).unwrap()).unwrap();

    let before = tree.fragment(id).unwrap().factor;
    let after = rebuilt.fragment(rebuilt.roots()[0]).unwrap().factor;
    assert_eq!(before, after);
    assert!(before.is_some_and(|f| f <= Factor::MAX));
    assert!(structurally_equal(&tree, &rebuilt));
}

// ============================================================
// Lenient reading
// ============================================================

#[test]
fn given_groups_only_container_when_loading_then_texts_precede_subgroups() {
    let value = json!({
        "groups": [{
            "enabled": true,
            "name": "n!bg",
            "factor": 1.25,
            "isNegative": true,
            "texts": {"texts": [
                {"enabled": true, "text": "cloud", "factor": null, "isNegative": false},
                {"enabled": false, "text": "rain", "factor": 2}
            ]},
            "groups": [{"name": "inner", "texts": {"texts": [{"text": "n!fog"}]}, "groups": []}]
        }]
    });

    let tree = from_value(&value);

    let g = tree.roots()[0];
    let group = tree.group(g).unwrap();
    assert_eq!(group.name, "bg");
    assert!(group.negative);
    assert_eq!(group.factor.map(|f| f.to_string()).as_deref(), Some("1.25"));

    let children = tree.children(Parent::Group(g)).unwrap();
    assert_eq!(children.len(), 3);
    assert_eq!(tree.fragment(children[0]).unwrap().text, "cloud");
    assert!(!tree.fragment(children[1]).unwrap().enabled);
    let inner = children[2];
    let fog = tree.children(Parent::Group(inner)).unwrap()[0];
    assert!(tree.fragment(fog).unwrap().negative);
    assert_eq!(tree.fragment(fog).unwrap().text, "fog");
}

#[test]
fn given_unified_childs_container_when_loading_then_mixed_sequence_is_kept() {
    let value = json!({
        "childs": [
            {"__type": "text", "text": "sky"},
            {"__type": "group", "name": "g", "childs": [{"__type": "text", "text": "sun"}]}
        ]
    });

    let tree = from_value(&value);

    assert_eq!(tree.roots().len(), 2);
    assert_eq!(tree.len(), 3);
    assert!(matches!(tree.get(tree.roots()[1]).unwrap(), NodeData::Group(_)));
}

#[test]
fn given_missing_fields_when_loading_then_defaults_apply() {
    let value = json!({"version": 1, "children": [{"__type": "text"}, {"__type": "group"}]});

    let tree = from_value(&value);

    let text = tree.fragment(tree.roots()[0]).unwrap();
    assert!(text.enabled);
    assert_eq!(text.text, "");
    assert_eq!(text.factor, None);
    assert!(!text.negative);
    let group = tree.group(tree.roots()[1]).unwrap();
    assert_eq!(group.name, "Group");
    assert!(group.enabled);
}

#[rstest]
#[case(json!(null))]
#[case(json!(42))]
#[case(json!("children"))]
#[case(json!({"children": "oops"}))]
#[case(json!({"children": {"a": 1}}))]
#[case(json!({}))]
fn test_malformed_container_yields_empty_tree(#[case] value: serde_json::Value) {
    assert!(from_value(&value).is_empty());
}

#[test]
fn given_corrupt_entries_when_loading_then_only_readable_nodes_survive() {
    let value = json!({"version": 1, "children": [
        {"__type": "text", "text": "ok"},
        {"__type": "sticker", "text": "skip me"},
        7,
        "loose string",
        {"__type": "group", "name": "g", "children": "not an array"},
        {"__type": "text", "text": "bad factor", "factor": "lots", "enabled": "yes"}
    ]});

    let tree = from_value(&value);

    assert_eq!(tree.roots().len(), 3);
    let bad = tree.fragment(tree.roots()[2]).unwrap();
    assert_eq!(bad.factor, None);
    assert!(bad.enabled);
}

#[rstest]
#[case(json!(1.005), Some("1.01"))]
#[case(json!(-4), Some("0.00"))]
#[case(json!("1.5"), Some("1.50"))]
#[case(json!(null), None)]
#[case(json!(true), None)]
fn test_factor_normalized_on_read(#[case] factor: serde_json::Value, #[case] expected: Option<&str>) {
    let value = json!({"version": 1, "children": [{"__type": "text", "text": "x", "factor": factor}]});

    let tree = from_value(&value);

    let fragment = tree.fragment(tree.roots()[0]).unwrap();
    assert_eq!(fragment.factor.map(|f| f.to_string()).as_deref(), expected);
}

#[test]
fn given_text_that_is_not_json_when_parsing_then_rejected() {
    let result = from_json("definitely { not json");
    assert!(matches!(result, Err(SnapshotError::Parse(_))));
}

#[test]
fn given_valid_json_of_unexpected_shape_when_parsing_then_empty_tree() {
    let tree = from_json("[1, 2, 3]").unwrap();
    assert!(tree.is_empty());
}
