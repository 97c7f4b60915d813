use rand::rngs::ThreadRng;
use rand::{thread_rng, Rng};
use red_black_tree::{Color, RedBlackTree, TreeError, SENTINEL};
use std::collections::BTreeMap;

#[test]
fn test_initialize() {
    let rbt = RedBlackTree::<16, u64, u64>::new();
    assert_eq!(rbt.size(), 0);
    assert!(rbt.is_empty());
    assert_eq!(rbt.first(), None);
    assert_eq!(rbt.last(), None);
}

#[test]
fn test_insert_with_red_parent_and_red_uncle_recolors_up() {
    // Insert 10, 5, 15 (black root with two red children), then 3: 3's
    // parent (5) and uncle (15) are both red, so both get recolored black
    // and the grandparent (10, the root) turns red then gets re-blackened.
    let mut rbt = RedBlackTree::<16, u64, u64>::new();
    rbt.insert(10, 10).unwrap();
    rbt.insert(5, 5).unwrap();
    rbt.insert(15, 15).unwrap();
    let n3 = rbt.insert(3, 3).unwrap();

    assert_eq!(rbt.color(rbt.root), Color::Black);
    let five = rbt.left_child(rbt.root).unwrap();
    let fifteen = rbt.right_child(rbt.root).unwrap();
    assert_eq!(rbt.color(five), Color::Black);
    assert_eq!(rbt.color(fifteen), Color::Black);
    assert_eq!(rbt.color(n3), Color::Red);
    assert!(rbt.is_valid_red_black_tree());
}

#[test]
fn test_right_insert_outside_grandchild_black_uncle() {
    // P is the right child of G, and the new node is inserted as P's right
    // child (an "outside" grandchild) with a black uncle: fixed by a single
    // left rotation at G plus a recolor.
    let mut rbt = RedBlackTree::<16, u64, u64>::new();
    let ten = rbt.insert(10, 10).unwrap();
    let twenty = rbt.insert(20, 20).unwrap();
    let thirty = rbt.insert(30, 30).unwrap();

    assert!(rbt.is_valid_red_black_tree());
    assert_eq!(rbt.color(rbt.root), Color::Black);
    assert_eq!(rbt.root, twenty);
    assert_eq!(rbt.left_child(twenty), Some(ten));
    assert_eq!(rbt.right_child(twenty), Some(thirty));
}

#[test]
fn test_left_insert_outside_grandchild_black_uncle() {
    // Mirror of the above: P is the left child of G, new node is P's left
    // child.
    let mut rbt = RedBlackTree::<16, u64, u64>::new();
    let thirty = rbt.insert(30, 30).unwrap();
    let twenty = rbt.insert(20, 20).unwrap();
    let ten = rbt.insert(10, 10).unwrap();

    assert!(rbt.is_valid_red_black_tree());
    assert_eq!(rbt.root, twenty);
    assert_eq!(rbt.left_child(twenty), Some(ten));
    assert_eq!(rbt.right_child(twenty), Some(thirty));
}

#[test]
fn test_right_insert_inside_grandchild_black_uncle() {
    // P is the left child of G, new node is P's right child (an "inside"
    // grandchild): resolved via a rotate-at-parent step before the usual
    // outside-case rotation.
    let mut rbt = RedBlackTree::<16, u64, u64>::new();
    let thirty = rbt.insert(30, 30).unwrap();
    let ten = rbt.insert(10, 10).unwrap();
    let twenty = rbt.insert(20, 20).unwrap();

    assert!(rbt.is_valid_red_black_tree());
    assert_eq!(rbt.root, twenty);
    assert_eq!(rbt.left_child(twenty), Some(ten));
    assert_eq!(rbt.right_child(twenty), Some(thirty));
}

#[test]
fn test_left_insert_inside_grandchild_black_uncle() {
    let mut rbt = RedBlackTree::<16, u64, u64>::new();
    let ten = rbt.insert(10, 10).unwrap();
    let thirty = rbt.insert(30, 30).unwrap();
    let twenty = rbt.insert(20, 20).unwrap();

    assert!(rbt.is_valid_red_black_tree());
    assert_eq!(rbt.root, twenty);
    assert_eq!(rbt.left_child(twenty), Some(ten));
    assert_eq!(rbt.right_child(twenty), Some(thirty));
}

#[test]
fn test_first_last_next_prev() {
    let mut rbt = RedBlackTree::<32, u64, u64>::new();
    for k in [5u64, 3, 8, 1, 4, 7, 9] {
        rbt.insert(k, k * 10).unwrap();
    }
    let first = rbt.first().unwrap();
    let last = rbt.last().unwrap();

    let mut forward = vec![];
    let mut cur = Some(first);
    while let Some(n) = cur {
        forward.push(n);
        cur = rbt.next(n);
    }
    let mut backward = vec![];
    let mut cur = Some(last);
    while let Some(n) = cur {
        backward.push(n);
        cur = rbt.prev(n);
    }
    backward.reverse();
    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 7);
}

#[test]
fn test_insert_updates_value_for_existing_key() {
    let mut rbt = RedBlackTree::<16, u64, u64>::new();
    rbt.insert(1, 100).unwrap();
    rbt.insert(1, 200).unwrap();
    assert_eq!(rbt.size(), 1);
    assert_eq!(*rbt.get(&1).unwrap(), 200);
}

#[test]
fn test_capacity_exceeded_on_arena_exhaustion() {
    const MAX_SIZE: usize = 8;
    let mut rbt = RedBlackTree::<MAX_SIZE, u64, u64>::new();
    for k in 0..(MAX_SIZE as u64 - 1) {
        rbt.insert(k, k).unwrap();
    }
    assert_eq!(rbt.insert(999, 999), Err(TreeError::CapacityExceeded));
    assert_eq!(rbt.size(), MAX_SIZE - 1);
}

#[test]
fn test_erase_permutation_preserves_invariants() {
    let mut rbt = RedBlackTree::<32, u64, u64>::new();
    for k in [5u64, 3, 8, 1, 4, 7, 9, 2, 6] {
        rbt.insert(k, k).unwrap();
        assert!(rbt.is_valid_red_black_tree());
    }
    for k in [5u64, 3, 8, 1, 4, 7, 9, 2, 6] {
        assert_eq!(rbt.remove(&k), Some(k));
        assert!(rbt.is_valid_red_black_tree());
    }
    assert!(rbt.is_empty());
}

#[test]
fn test_erase_interior_node_with_two_children() {
    let mut rbt = RedBlackTree::<16, u64, u64>::new();
    for k in 1u64..=7 {
        rbt.insert(k, k).unwrap();
    }
    assert!(rbt.is_valid_red_black_tree());
    assert_eq!(rbt.remove(&4), Some(4));
    assert!(rbt.is_valid_red_black_tree());
    assert_eq!(rbt.get(&4), None);
    for k in [1u64, 2, 3, 5, 6, 7] {
        assert!(rbt.get(&k).is_some());
    }
}

#[test]
fn test_erase_only_node_yields_empty_tree() {
    let mut rbt = RedBlackTree::<4, u64, u64>::new();
    rbt.insert(1, 1).unwrap();
    assert_eq!(rbt.remove(&1), Some(1));
    assert!(rbt.is_empty());
    assert_eq!(rbt.root, SENTINEL);
}

#[test]
fn test_height_bound_after_sequential_insert() {
    const N: usize = 1000;
    let mut rbt = RedBlackTree::<N, u64, u64>::new();
    for k in 0..(N as u64 - 1) {
        rbt.insert(k, k).unwrap();
    }
    assert!(rbt.is_valid_red_black_tree());
    // 2*log2(n+1) is the standard red-black height bound.
    let bound = 2.0 * ((rbt.size() as f64 + 1.0).log2());
    assert!(height(&rbt) as f64 <= bound.ceil());
}

fn height<const N: usize>(rbt: &RedBlackTree<N, u64, u64>) -> u32 {
    fn go<const N: usize>(rbt: &RedBlackTree<N, u64, u64>, node: Option<u32>) -> u32 {
        match node {
            None => 0,
            Some(n) => 1 + go(rbt, rbt.left_child(n)).max(go(rbt, rbt.right_child(n))),
        }
    }
    go(rbt, if rbt.is_empty() { None } else { Some(rbt.root) })
}

#[repr(C)]
#[derive(Default, Copy, Clone, PartialEq, Debug)]
struct Order {
    a: u128,
    b: u128,
    size: u64,
}

impl Order {
    pub fn new_random(r: &mut ThreadRng) -> Self {
        Self {
            a: r.gen::<u128>(),
            b: r.gen::<u128>(),
            size: r.gen::<u64>(),
        }
    }
}

#[test]
fn test_simulate_against_btreemap_oracle() {
    const MAX_SIZE: usize = 500;
    type RBTree = RedBlackTree<MAX_SIZE, u128, Order>;
    let mut rbt = RBTree::new();
    let mut rng = thread_rng();
    let mut keys = vec![];
    let mut map = BTreeMap::new();
    let mut s = 0;

    for _ in 0..(MAX_SIZE - 1) {
        let k = rng.gen::<u128>();
        let v = Order::new_random(&mut rng);
        rbt.insert(k, v).unwrap();
        s += 1;
        assert_eq!(s, rbt.size());
        map.insert(k, v);
        keys.push(k);
    }

    let k = rng.gen::<u128>();
    let v = Order::new_random(&mut rng);
    assert_eq!(rbt.insert(k, v), Err(TreeError::CapacityExceeded));

    for k in keys.iter() {
        assert!(rbt.remove(k).is_some());
        s -= 1;
        map.remove(k);
    }
    keys.clear();
    assert!(rbt.is_valid_red_black_tree());

    for _ in 0..(MAX_SIZE >> 1) {
        let k = rng.gen::<u128>();
        let v = Order::new_random(&mut rng);
        rbt.insert(k, v).unwrap();
        s += 1;
        map.insert(k, v);
        keys.push(k);
    }

    for i in 0..20_000 {
        if i % 500 == 0 {
            assert!(rbt.is_valid_red_black_tree());
        }
        assert_eq!(s, rbt.size());
        let sample = rng.gen::<f64>();
        if sample < 0.33 {
            if rbt.size() >= MAX_SIZE - 1 {
                continue;
            }
            let k = rng.gen::<u128>();
            let v = Order::new_random(&mut rng);
            rbt.insert(k, v).unwrap();
            s += 1;
            map.insert(k, v);
            keys.push(k);
        } else if sample < 0.66 {
            if keys.is_empty() {
                continue;
            }
            let j = rng.gen_range(0, keys.len());
            let key = keys.swap_remove(j);
            assert_eq!(*rbt.get(&key).unwrap(), map[&key]);
            rbt.remove(&key);
            map.remove(&key);
            s -= 1;
        } else {
            if keys.is_empty() {
                continue;
            }
            let j = rng.gen_range(0, keys.len());
            let key = keys[j];
            let v = Order::new_random(&mut rng);
            rbt.insert(key, v).unwrap();
            map.insert(key, v);
        }
    }

    assert!(rbt.is_valid_red_black_tree());
    let nodes = rbt.inorder_traversal();
    assert_eq!(nodes.len(), map.len());
    for ((k1, v1), (k2, v2)) in map.iter().zip(nodes.iter()) {
        assert_eq!(*k1, *k2);
        assert_eq!(*v1, *v2);
    }
}
