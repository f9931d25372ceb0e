//! Integration tests for the reconciler
//!
//! These tests verify that:
//! - Keyed lists take the prefix/suffix fast paths
//! - Reorders move exactly `len - LIS` nodes and never remount
//! - Property and children diffs emit only what changed
//! - Fragments, comments, and replacements land in the right place

use std::rc::Rc;

use proptest::prelude::*;
use sprig_renderer::testing::{HostOp, RecordingHost};
use sprig_renderer::vnode::{comment, element, fragment, text};
use sprig_renderer::{
    Container, DuplicateKeyPolicy, HostNode, Key, Props, PropValue, RenderError, Renderer,
    RendererConfig, VNodeRef,
};

fn setup_with(config: RendererConfig) -> (Renderer<RecordingHost>, Container) {
    let mut host = RecordingHost::new();
    let root = host.create_root("root");
    (Renderer::with_config(host, config), Container::new(root))
}

fn setup() -> (Renderer<RecordingHost>, Container) {
    setup_with(RendererConfig::default())
}

fn list(keys: &[i64]) -> VNodeRef {
    element("ul")
        .children(keys.iter().map(|&k| element("li").key(k).text(k.to_string())))
        .build()
}

fn render(renderer: &Renderer<RecordingHost>, container: &Container, node: VNodeRef) {
    renderer.render(Some(node), container).unwrap();
}

/// Text of each rendered `li`, in host order
fn rendered_keys(renderer: &Renderer<RecordingHost>, container: &Container) -> Vec<String> {
    let host = renderer.host();
    let ul = host.children(container.node())[0];
    host.children(ul)
        .iter()
        .map(|&li| host.text(li).unwrap_or_default().to_owned())
        .collect()
}

fn keys_as_strings(keys: &[i64]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// Host node of the `li` rendered for `key`
fn li_node(renderer: &Renderer<RecordingHost>, container: &Container, key: i64) -> Option<HostNode> {
    let host = renderer.host();
    let ul = host.children(container.node())[0];
    host.children(ul)
        .iter()
        .copied()
        .find(|&li| host.text(li) == Some(key.to_string().as_str()))
}

fn reference_lis_len(seq: &[usize]) -> usize {
    let mut best = vec![1usize; seq.len()];
    for i in 0..seq.len() {
        for j in 0..i {
            if seq[j] < seq[i] {
                best[i] = best[i].max(best[j] + 1);
            }
        }
    }
    best.into_iter().max().unwrap_or(0)
}

#[test]
fn test_mount_builds_tree() {
    let (renderer, container) = setup();
    let tree = element("div")
        .prop("id", "app")
        .child(element("h1").text("Title"))
        .child(text("body"))
        .child(comment("note"))
        .build();

    render(&renderer, &container, tree.clone());

    assert_eq!(
        renderer.host().serialize(container.node()),
        "<root><div id=\"app\"><h1>Title</h1>body<!--note--></div></root>"
    );
    assert!(tree.is_mounted());
    assert!(tree.child_nodes().nodes().iter().all(|child| child.is_mounted()));
}

#[test]
fn test_same_tree_twice_is_a_noop() {
    let (renderer, container) = setup();
    let tree = list(&[1, 2, 3]);
    render(&renderer, &container, tree.clone());
    renderer.host_mut().clear_ops();

    render(&renderer, &container, tree);
    assert!(renderer.host().ops().is_empty());

    // A structurally identical rebuild emits nothing either
    render(&renderer, &container, list(&[1, 2, 3]));
    assert!(renderer.host().ops().is_empty());
}

#[test]
fn test_prefix_and_suffix_insert() {
    let (renderer, container) = setup();
    render(&renderer, &container, list(&[1, 2, 3]));
    renderer.host_mut().clear_ops();

    render(&renderer, &container, list(&[1, 2, 4, 3]));

    let host = renderer.host();
    assert_eq!(host.count(|op| matches!(op, HostOp::CreateElement { .. })), 1);
    assert_eq!(host.count(|op| matches!(op, HostOp::Insert { .. })), 1);
    assert_eq!(host.moves(), 0);
    assert_eq!(host.removes(), 0);
    drop(host);
    assert_eq!(rendered_keys(&renderer, &container), keys_as_strings(&[1, 2, 4, 3]));
}

#[test]
fn test_append_and_prepend() {
    let (renderer, container) = setup();
    render(&renderer, &container, list(&[2, 3]));

    render(&renderer, &container, list(&[1, 2, 3, 4]));
    assert_eq!(rendered_keys(&renderer, &container), keys_as_strings(&[1, 2, 3, 4]));
    assert_eq!(renderer.host().moves(), 0);
}

#[test]
fn test_prefix_and_suffix_remove() {
    let (renderer, container) = setup();
    render(&renderer, &container, list(&[1, 2, 3, 4]));
    renderer.host_mut().clear_ops();

    render(&renderer, &container, list(&[1, 4]));

    assert_eq!(renderer.host().removes(), 2);
    assert_eq!(renderer.host().creates(), 0);
    assert_eq!(rendered_keys(&renderer, &container), keys_as_strings(&[1, 4]));
}

#[test]
fn test_full_reverse_moves_three() {
    let (renderer, container) = setup();
    render(&renderer, &container, list(&[1, 2, 3, 4]));
    let anchor_li = li_node(&renderer, &container, 1);
    renderer.host_mut().clear_ops();

    render(&renderer, &container, list(&[4, 3, 2, 1]));

    let host = renderer.host();
    assert_eq!(host.moves(), 3);
    assert_eq!(host.creates(), 0);
    assert_eq!(host.removes(), 0);
    // The node kept by the increasing subsequence never moves
    let moved: Vec<HostNode> = host
        .ops()
        .iter()
        .filter_map(|op| match op {
            HostOp::Move { node, .. } => Some(*node),
            _ => None,
        })
        .collect();
    assert!(!moved.contains(&anchor_li.unwrap()));
    drop(host);
    assert_eq!(rendered_keys(&renderer, &container), keys_as_strings(&[4, 3, 2, 1]));
}

#[test]
fn test_middle_insert_remove_and_move() {
    let (renderer, container) = setup();
    render(&renderer, &container, list(&[1, 2, 3, 4, 5, 6]));
    renderer.host_mut().clear_ops();

    render(&renderer, &container, list(&[1, 3, 7, 2, 6]));

    let host = renderer.host();
    assert_eq!(host.count(|op| matches!(op, HostOp::CreateElement { .. })), 1);
    assert_eq!(host.removes(), 2);
    assert_eq!(host.moves(), 1);
    drop(host);
    assert_eq!(rendered_keys(&renderer, &container), keys_as_strings(&[1, 3, 7, 2, 6]));
}

#[test]
fn test_keyed_patch_updates_text_in_place() {
    let (renderer, container) = setup();
    render(&renderer, &container, list(&[1, 2]));
    renderer.host_mut().clear_ops();

    let updated = element("ul")
        .child(element("li").key(1).text("one"))
        .child(element("li").key(2).text("2"))
        .build();
    render(&renderer, &container, updated);

    let host = renderer.host();
    assert_eq!(host.ops().len(), 1);
    assert!(matches!(&host.ops()[0], HostOp::SetElementText { text, .. } if text == "one"));
}

#[test]
fn test_props_round_trip() {
    let (renderer, container) = setup();
    render(&renderer, &container, element("div").prop("a", 1).prop("b", 2).build());
    renderer.host_mut().clear_ops();

    render(&renderer, &container, element("div").prop("a", 1).prop("c", 3).build());

    let host = renderer.host();
    let ops = host.ops();
    assert_eq!(ops.len(), 2);
    assert!(ops.iter().any(|op| matches!(
        op,
        HostOp::SetProp { key, value: PropValue::Int(3), .. } if key == "c"
    )));
    assert!(ops
        .iter()
        .any(|op| matches!(op, HostOp::RemoveProp { key, .. } if key == "b")));
}

#[test]
fn test_shared_props_are_skipped() {
    let (renderer, container) = setup();
    let mut props = Props::default();
    props.insert("class".into(), "card".into());
    let props = Rc::new(props);

    render(&renderer, &container, element("div").props(props.clone()).build());
    renderer.host_mut().clear_ops();

    render(&renderer, &container, element("div").props(props).build());
    assert_eq!(renderer.host().count(HostOp::is_prop), 0);
}

#[test]
fn test_children_shape_transitions() {
    let (renderer, container) = setup();
    let serialize = |renderer: &Renderer<RecordingHost>| renderer.host().serialize(container.node());

    render(&renderer, &container, element("div").text("a").build());
    assert_eq!(serialize(&renderer), "<root><div>a</div></root>");

    render(
        &renderer,
        &container,
        element("div").child(element("b")).child(element("i")).build(),
    );
    assert_eq!(serialize(&renderer), "<root><div><b></b><i></i></div></root>");

    render(&renderer, &container, element("div").text("c").build());
    assert_eq!(serialize(&renderer), "<root><div>c</div></root>");

    render(&renderer, &container, element("div").build());
    assert_eq!(serialize(&renderer), "<root><div></div></root>");

    render(&renderer, &container, element("div").child(text("x")).build());
    assert_eq!(serialize(&renderer), "<root><div>x</div></root>");

    render(&renderer, &container, element("div").build());
    assert_eq!(serialize(&renderer), "<root><div></div></root>");
}

#[test]
fn test_replacement_keeps_position() {
    let (renderer, container) = setup();
    let tree = |middle: &'static str| {
        element("div")
            .child(element("p").text("first"))
            .child(element(middle).text("middle"))
            .child(element("p").text("last"))
            .build()
    };

    render(&renderer, &container, tree("span"));
    render(&renderer, &container, tree("em"));

    assert_eq!(
        renderer.host().serialize(container.node()),
        "<root><div><p>first</p><em>middle</em><p>last</p></div></root>"
    );
}

#[test]
fn test_root_type_change_replaces_root() {
    let (renderer, container) = setup();
    render(&renderer, &container, element("p").text("a").build());
    render(&renderer, &container, text("plain").build());

    assert_eq!(renderer.host().serialize(container.node()), "<root>plain</root>");
    assert_eq!(renderer.host().removes(), 1);
}

#[test]
fn test_comment_update() {
    let (renderer, container) = setup();
    render(&renderer, &container, element("div").child(comment("v1")).build());
    render(&renderer, &container, element("div").child(comment("v2")).build());

    assert_eq!(
        renderer.host().serialize(container.node()),
        "<root><div><!--v2--></div></root>"
    );
}

#[test]
fn test_keyed_fragments_reorder() {
    let (renderer, container) = setup();
    let group = |key: &'static str| {
        fragment()
            .key(key)
            .child(text(format!("{}1", key)))
            .child(text(format!("{}2", key)))
    };
    let tree = |keys: [&'static str; 3]| {
        element("div")
            .children(keys.into_iter().map(group))
            .build()
    };

    render(&renderer, &container, tree(["a", "b", "c"]));
    assert_eq!(
        renderer.host().serialize(container.node()),
        "<root><div>a1a2b1b2c1c2</div></root>"
    );

    render(&renderer, &container, tree(["c", "a", "b"]));
    assert_eq!(
        renderer.host().serialize(container.node()),
        "<root><div>c1c2a1a2b1b2</div></root>"
    );
}

#[test]
fn test_fragment_children_diff() {
    let (renderer, container) = setup();
    let tree = |items: &[&'static str]| {
        element("div")
            .child(element("header"))
            .child(fragment().children(items.iter().map(|&s| text(s).key(s))))
            .child(element("footer"))
            .build()
    };

    render(&renderer, &container, tree(&["a", "b"]));
    render(&renderer, &container, tree(&["b", "c", "a"]));

    assert_eq!(
        renderer.host().serialize(container.node()),
        "<root><div><header></header>bca<footer></footer></div></root>"
    );
}

#[test]
fn test_fragment_text_is_mounted() {
    let (renderer, container) = setup();
    let tree = |s: &'static str| element("div").child(fragment().text(s)).build();

    render(&renderer, &container, tree("x"));
    assert_eq!(renderer.host().serialize(container.node()), "<root><div>x</div></root>");

    renderer.host_mut().clear_ops();
    render(&renderer, &container, tree("y"));

    let host = renderer.host();
    assert_eq!(host.serialize(container.node()), "<root><div>y</div></root>");
    assert!(host.ops().iter().all(|op| !op.is_create()));
    assert!(host
        .ops()
        .iter()
        .any(|op| matches!(op, HostOp::SetText { text, .. } if text == "y")));
}

#[test]
fn test_unmount_clears_everything() {
    let (renderer, container) = setup();
    let tree = list(&[1, 2]);
    render(&renderer, &container, tree.clone());

    renderer.render(None, &container).unwrap();

    assert_eq!(renderer.host().serialize(container.node()), "<root></root>");
    assert_eq!(renderer.host().node_count(), 1);
    assert!(!tree.is_mounted());
    assert!(tree.child_nodes().nodes().iter().all(|li| !li.is_mounted()));
    assert!(container.vnode().is_none());
}

#[test]
fn test_duplicate_keys_warn_last_wins() {
    let (renderer, container) = setup();
    render(&renderer, &container, list(&[1, 2, 3]));

    render(&renderer, &container, list(&[3, 2, 2, 1]));
    assert_eq!(rendered_keys(&renderer, &container), keys_as_strings(&[3, 2, 2, 1]));
}

#[test]
fn test_duplicate_keys_rejected() {
    let config = RendererConfig::default().with_duplicate_keys(DuplicateKeyPolicy::Reject);
    let (renderer, container) = setup_with(config);
    render(&renderer, &container, list(&[1, 2, 3]));

    let err = renderer
        .render(Some(list(&[3, 2, 2, 1])), &container)
        .unwrap_err();
    assert!(matches!(err, RenderError::DuplicateKey(key) if key == Key::Int(2)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A pure reorder moves exactly len - LIS nodes and creates nothing
    #[test]
    fn prop_reorder_moves_are_minimal(perm in Just((0..24i64).collect::<Vec<_>>()).prop_shuffle()) {
        let (renderer, container) = setup();
        let initial: Vec<i64> = (0..24).collect();
        render(&renderer, &container, list(&initial));
        renderer.host_mut().clear_ops();

        render(&renderer, &container, list(&perm));

        let old_positions: Vec<usize> = perm.iter().map(|&k| k as usize).collect();
        let expected_moves = perm.len() - reference_lis_len(&old_positions);
        let host = renderer.host();
        prop_assert_eq!(host.moves(), expected_moves);
        prop_assert_eq!(host.creates(), 0);
        prop_assert_eq!(host.removes(), 0);
        drop(host);
        prop_assert_eq!(rendered_keys(&renderer, &container), keys_as_strings(&perm));
    }

    /// Arbitrary keyed edits end in the new order with one create per new
    /// key and one removal per dropped key
    #[test]
    fn prop_keyed_edits_converge(
        old in prop::sample::subsequence((0..20i64).collect::<Vec<_>>(), 0..=20).prop_shuffle(),
        new in prop::sample::subsequence((0..20i64).collect::<Vec<_>>(), 0..=20).prop_shuffle(),
    ) {
        let (renderer, container) = setup();
        render(&renderer, &container, list(&old));
        renderer.host_mut().clear_ops();

        render(&renderer, &container, list(&new));

        let added = new.iter().filter(|k| !old.contains(k)).count();
        let dropped = old.iter().filter(|k| !new.contains(k)).count();
        let host = renderer.host();
        prop_assert_eq!(host.count(|op| matches!(op, HostOp::CreateElement { .. })), added);
        prop_assert_eq!(host.removes(), dropped);
        drop(host);
        prop_assert_eq!(rendered_keys(&renderer, &container), keys_as_strings(&new));
    }
}
