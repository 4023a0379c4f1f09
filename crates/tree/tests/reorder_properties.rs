use std::collections::HashSet;

use docforge_tree::{
    build_parent_lookup, build_transfer_payload, is_descendant_of, resolve_move, MemoryTreeStore,
    MoveInstruction, MovePosition, Node, NodeDraft, NodeId, NodeRepository, NodeTree,
    TreeController,
};

/// Builds a small but irregular forest through the public repository API.
fn seeded_store() -> (MemoryTreeStore, Vec<NodeId>) {
    let mut store = MemoryTreeStore::default();
    let mut all = Vec::new();
    let mut folders: Vec<Option<NodeId>> = vec![None];
    for round in 0..12 {
        let parent = folders[round % folders.len()].clone();
        let draft = if round % 3 == 0 {
            NodeDraft::folder(format!("folder-{round}"))
        } else {
            NodeDraft::document(format!("doc-{round}"))
        };
        let is_folder = draft.kind.is_folder();
        let id = store
            .create_node(draft, parent.as_ref(), MovePosition::Inside)
            .expect("create node");
        if is_folder {
            folders.push(Some(id.clone()));
        }
        all.push(id);
    }
    (store, all)
}

fn flat_titles(nodes: &[Node]) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        out.push(node.title.clone());
        out.extend(flat_titles(&node.children));
    }
    out
}

#[test]
fn moves_into_descendants_are_always_rejected() {
    let (store, all) = seeded_store();
    let tree = store.node_tree().unwrap();
    let parents = build_parent_lookup(&tree);

    for dragged in &all {
        for target in &all {
            if !is_descendant_of(&parents, target, dragged) {
                continue;
            }
            for position in [MovePosition::Before, MovePosition::After, MovePosition::Inside] {
                let instruction = resolve_move(&tree, &[dragged.clone()], Some(target), position);
                assert!(instruction.is_noop(), "{dragged} into {target}");
            }
        }
    }
}

#[test]
fn every_accepted_move_keeps_the_tree_valid() {
    let (store, all) = seeded_store();
    let tree = store.node_tree().unwrap();

    for dragged in &all {
        for target in &all {
            for position in [MovePosition::Before, MovePosition::After, MovePosition::Inside] {
                let mut scratch = MemoryTreeStore::new(tree.clone());
                let instruction = resolve_move(&tree, &[dragged.clone()], Some(target), position);
                scratch
                    .move_nodes(&[dragged.clone()], Some(target), position)
                    .expect("move succeeds or is ignored");
                let next = scratch.node_tree().unwrap();
                next.validate().expect("tree stays valid");
                assert_eq!(next.len(), tree.len());
                if instruction.is_noop() {
                    assert_eq!(next, tree);
                }
            }
        }
    }
}

#[test]
fn adjacent_drop_is_idempotent() {
    let (store, _) = seeded_store();
    let tree = store.node_tree().unwrap();
    for siblings in std::iter::once(tree.roots.as_slice())
        .chain(tree.roots.iter().map(|node| node.children.as_slice()))
    {
        for pair in siblings.windows(2) {
            let instruction = resolve_move(
                &tree,
                &[pair[0].id.clone()],
                Some(&pair[1].id),
                MovePosition::Before,
            );
            assert!(matches!(instruction, MoveInstruction::NoOp(_)));
        }
    }
}

#[test]
fn payload_roots_are_unique_and_never_nested() {
    let (store, all) = seeded_store();
    let tree: NodeTree = store.node_tree().unwrap();
    let parents = build_parent_lookup(&tree);

    for window in all.windows(4) {
        let selection: Vec<NodeId> = window.to_vec();
        let payload = build_transfer_payload(&tree, &selection).expect("known ids");
        let roots: Vec<&NodeId> = selection
            .iter()
            .filter(|id| {
                !selection
                    .iter()
                    .any(|other| other != *id && is_descendant_of(&parents, id, other))
            })
            .collect();
        assert_eq!(payload.nodes.len(), roots.len());
        let titles: HashSet<String> = payload.nodes.iter().map(|n| n.title.clone()).collect();
        assert_eq!(titles.len(), roots.len());
    }
}

#[test]
fn scenario_doc3_before_doc1() {
    let mut store = MemoryTreeStore::default();
    let folder = store
        .create_node(NodeDraft::folder("FolderA"), None, MovePosition::Inside)
        .unwrap();
    let doc1 = store
        .create_node(NodeDraft::document("Doc1"), Some(&folder), MovePosition::Inside)
        .unwrap();
    store
        .create_node(NodeDraft::document("Doc2"), Some(&folder), MovePosition::Inside)
        .unwrap();
    let doc3 = store
        .create_node(NodeDraft::document("Doc3"), None, MovePosition::Inside)
        .unwrap();

    let mut controller = TreeController::new(store).unwrap();
    let instruction = controller
        .drop_nodes(&[doc3], Some(&doc1), MovePosition::Before)
        .unwrap();
    let MoveInstruction::Move(planned) = instruction else {
        panic!("expected a move");
    };
    assert_eq!(planned.parent.as_ref(), Some(&folder));
    assert_eq!(planned.index, 0);
    assert_eq!(
        flat_titles(&controller.tree().roots),
        vec!["FolderA", "Doc3", "Doc1", "Doc2"]
    );
    assert_eq!(controller.tree().roots.len(), 1);
}
