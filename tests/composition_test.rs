//! Tests for the composition tree mutation API

use prompt_kun::domain::snapshot::structurally_equal;
use prompt_kun::domain::{Composition, DomainError, Factor, NodeData, NodeId, Parent, Placement};
use prompt_kun::util::testing;
use rstest::{fixture, rstest};

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

/// root: [a, g: [b, inner: [c]], d]
struct Sample {
    tree: Composition,
    a: NodeId,
    g: NodeId,
    b: NodeId,
    inner: NodeId,
    c: NodeId,
    d: NodeId,
}

#[fixture]
fn sample() -> Sample {
    let mut tree = Composition::new();
    let a = tree.insert_fragment(Parent::Root, 0, "a").unwrap();
    let g = tree.insert_group(Parent::Root, 1, "g").unwrap();
    let b = tree.insert_fragment(Parent::Group(g), 0, "b").unwrap();
    let inner = tree.insert_group(Parent::Group(g), 1, "inner").unwrap();
    let c = tree.insert_fragment(Parent::Group(inner), 0, "c").unwrap();
    let d = tree.insert_fragment(Parent::Root, 2, "d").unwrap();
    Sample {
        tree,
        a,
        g,
        b,
        inner,
        c,
        d,
    }
}

fn texts(tree: &Composition, parent: Parent) -> Vec<String> {
    tree.children(parent)
        .unwrap()
        .iter()
        .map(|&id| match tree.get(id).unwrap() {
            NodeData::Fragment(f) => f.text.clone(),
            NodeData::Group(g) => g.name.clone(),
        })
        .collect()
}

// ============================================================
// insert
// ============================================================

#[test]
fn given_new_fragment_when_inserted_then_has_defaults() {
    let mut tree = Composition::new();

    let id = tree.insert_fragment(Parent::Root, 0, "sky").unwrap();

    let fragment = tree.fragment(id).unwrap();
    assert!(fragment.enabled);
    assert_eq!(fragment.factor, None);
    assert!(!fragment.negative);
    assert_eq!(fragment.text, "sky");
}

#[test]
fn given_empty_name_when_inserting_group_then_defaults_to_group() {
    let mut tree = Composition::new();

    let id = tree.insert_group(Parent::Root, 0, "").unwrap();

    assert_eq!(tree.group(id).unwrap().name, "Group");
    assert!(tree.children(Parent::Group(id)).unwrap().is_empty());
}

#[rstest]
fn given_index_beyond_end_when_inserting_then_clamps(mut sample: Sample) {
    let e = sample
        .tree
        .insert_fragment(Parent::Group(sample.g), 42, "e")
        .unwrap();

    assert_eq!(
        sample.tree.children(Parent::Group(sample.g)).unwrap(),
        &[sample.b, sample.inner, e]
    );
}

#[rstest]
fn given_fragment_as_parent_when_inserting_then_rejected(mut sample: Sample) {
    let before = sample.tree.clone();

    let result = sample.tree.insert_fragment(Parent::Group(sample.a), 0, "x");

    assert_eq!(result, Err(DomainError::NotAGroup(sample.a)));
    assert!(structurally_equal(&before, &sample.tree));
}

// ============================================================
// setters
// ============================================================

#[rstest]
#[case("abc", None)]
#[case("-3", Some("0.00"))]
#[case("1.005", Some("1.01"))]
#[case("1.5", Some("1.50"))]
#[case("", None)]
fn test_set_factor_normalizes(mut sample: Sample, #[case] raw: &str, #[case] expected: Option<&str>) {
    sample.tree.set_factor(sample.a, "2").unwrap();

    sample.tree.set_factor(sample.a, raw).unwrap();

    let factor = sample.tree.get(sample.a).unwrap().factor();
    assert_eq!(factor.map(|f| f.to_string()).as_deref(), expected);
}

#[rstest]
fn given_group_when_setting_factor_then_same_normalization_applies(mut sample: Sample) {
    sample.tree.set_factor(sample.g, "0.333").unwrap();
    assert_eq!(
        sample.tree.group(sample.g).unwrap().factor,
        Some(Factor::from_hundredths(33))
    );
}

#[rstest]
fn given_prefixed_text_when_setting_then_sign_follows_prefix(mut sample: Sample) {
    sample.tree.set_text(sample.a, "n!blurry").unwrap();
    let fragment = sample.tree.fragment(sample.a).unwrap();
    assert!(fragment.negative);
    assert_eq!(fragment.text, "blurry");
    assert_eq!(sample.tree.signed_text(sample.a).unwrap(), "n!blurry");

    sample.tree.set_text(sample.a, "blurry").unwrap();
    assert!(!sample.tree.fragment(sample.a).unwrap().negative);
}

#[rstest]
fn given_group_when_renaming_with_prefix_then_group_turns_negative(mut sample: Sample) {
    let changed = sample.tree.set_name(sample.g, "n!bg").unwrap();

    assert!(changed);
    assert!(sample.tree.group(sample.g).unwrap().negative);
    assert_eq!(sample.tree.signed_name(sample.g).unwrap(), "n!bg");
}

#[rstest]
fn given_node_when_toggling_negative_twice_then_back_to_positive(mut sample: Sample) {
    assert!(sample.tree.toggle_negative(sample.inner).unwrap());
    assert!(!sample.tree.toggle_negative(sample.inner).unwrap());
}

#[rstest]
fn given_same_value_when_setting_enabled_then_reports_no_change(mut sample: Sample) {
    assert!(!sample.tree.set_enabled(sample.b, true).unwrap());
    assert!(sample.tree.set_enabled(sample.b, false).unwrap());
    assert!(!sample.tree.get(sample.b).unwrap().enabled());
}

#[rstest]
fn given_wrong_kind_when_setting_then_rejected(mut sample: Sample) {
    assert_eq!(
        sample.tree.set_text(sample.g, "x"),
        Err(DomainError::NotAFragment(sample.g))
    );
    assert_eq!(
        sample.tree.set_name(sample.a, "x"),
        Err(DomainError::NotAGroup(sample.a))
    );
}

// ============================================================
// remove
// ============================================================

#[rstest]
fn given_group_when_removed_then_subtree_is_gone_and_ids_are_dead(mut sample: Sample) {
    let removed = sample.tree.remove_by_id(sample.g);

    assert_eq!(removed.len(), 4);
    for id in [sample.g, sample.b, sample.inner, sample.c] {
        assert!(!sample.tree.contains(id));
        assert_eq!(
            sample.tree.set_enabled(id, false),
            Err(DomainError::NodeNotFound(id))
        );
    }
    assert_eq!(sample.tree.roots(), &[sample.a, sample.d]);
}

#[rstest]
fn given_unknown_id_when_removing_then_tree_is_unchanged(mut sample: Sample) {
    sample.tree.remove_by_id(sample.c);
    let before = sample.tree.clone();

    let removed = sample.tree.remove_by_id(sample.c);

    assert!(removed.is_empty());
    assert!(structurally_equal(&before, &sample.tree));
}

#[rstest]
fn given_removed_node_when_slot_is_reused_then_old_id_does_not_resolve(mut sample: Sample) {
    sample.tree.remove_by_id(sample.d);

    let fresh = sample.tree.insert_fragment(Parent::Root, 0, "fresh").unwrap();

    assert_ne!(fresh, sample.d);
    assert!(sample.tree.get(sample.d).is_err());
}

#[test]
fn given_blank_fragments_when_removing_blanks_then_only_blanks_go() {
    let mut tree = Composition::new();
    let keep = tree.insert_fragment(Parent::Root, 0, "keep").unwrap();
    tree.insert_fragment(Parent::Root, 1, "   ").unwrap();
    let g = tree.insert_group(Parent::Root, 2, "g").unwrap();
    tree.insert_fragment(Parent::Group(g), 0, "").unwrap();

    let removed = tree.remove_blank_fragments();

    assert_eq!(removed.len(), 2);
    assert_eq!(tree.roots(), &[keep, g]);
    assert!(tree.children(Parent::Group(g)).unwrap().is_empty());
}

// ============================================================
// move / reorder
// ============================================================

#[rstest]
fn given_group_when_moving_into_own_descendant_then_rejected_and_unchanged(mut sample: Sample) {
    let before = sample.tree.clone();

    let result = sample.tree.move_to(sample.g, Parent::Group(sample.inner), 0);

    assert_eq!(
        result,
        Err(DomainError::CycleDetected {
            node: sample.g,
            target: sample.inner
        })
    );
    assert!(structurally_equal(&before, &sample.tree));
}

#[rstest]
fn given_group_when_moving_into_itself_then_rejected(mut sample: Sample) {
    assert!(sample
        .tree
        .move_to(sample.g, Parent::Group(sample.g), 0)
        .is_err());
}

#[rstest]
fn given_fragment_when_moving_to_other_group_then_lands_at_index(mut sample: Sample) {
    let changed = sample
        .tree
        .move_to(sample.d, Parent::Group(sample.inner), 0)
        .unwrap();

    assert!(changed);
    assert_eq!(texts(&sample.tree, Parent::Group(sample.inner)), ["d", "c"]);
    assert_eq!(sample.tree.parent_of(sample.d), Ok(Parent::Group(sample.inner)));
}

#[rstest]
fn given_move_to_index_when_same_parent_then_index_is_measured_after_removal(mut sample: Sample) {
    sample.tree.move_to(sample.a, Parent::Root, 1).unwrap();
    assert_eq!(texts(&sample.tree, Parent::Root), ["g", "a", "d"]);

    let changed = sample.tree.move_to(sample.a, Parent::Root, 1).unwrap();
    assert!(!changed);
}

#[rstest]
#[case(Placement::After, ["g", "d", "a"])]
#[case(Placement::Before, ["g", "a", "d"])]
fn test_reorder_siblings(mut sample: Sample, #[case] placement: Placement, #[case] expected: [&str; 3]) {
    sample.tree.reorder(sample.a, sample.d, placement).unwrap();
    assert_eq!(texts(&sample.tree, Parent::Root), expected);
}

#[rstest]
fn given_target_in_other_group_when_reordering_then_source_moves_next_to_it(mut sample: Sample) {
    let changed = sample
        .tree
        .reorder(sample.d, sample.c, Placement::Before)
        .unwrap();

    assert!(changed);
    assert_eq!(texts(&sample.tree, Parent::Group(sample.inner)), ["d", "c"]);
    assert_eq!(texts(&sample.tree, Parent::Root), ["a", "g"]);
}

#[rstest]
fn given_group_when_reordering_next_to_own_descendant_then_rejected(mut sample: Sample) {
    let result = sample.tree.reorder(sample.g, sample.c, Placement::After);
    assert!(matches!(result, Err(DomainError::CycleDetected { .. })));
}

#[rstest]
fn given_node_when_dropped_on_itself_then_noop(mut sample: Sample) {
    assert_eq!(sample.tree.reorder(sample.b, sample.b, Placement::After), Ok(false));
}

// ============================================================
// replace
// ============================================================

#[rstest]
fn given_other_tree_when_replacing_then_content_is_copied_and_old_ids_die(mut sample: Sample) {
    let mut other = Composition::new();
    let og = other.insert_group(Parent::Root, 0, "n!bg").unwrap();
    other.insert_fragment(Parent::Group(og), 0, "cloud").unwrap();

    sample.tree.replace_with(&other);

    assert!(structurally_equal(&other, &sample.tree));
    for id in [sample.a, sample.g, sample.b, sample.inner, sample.c, sample.d] {
        assert!(!sample.tree.contains(id));
    }
}
