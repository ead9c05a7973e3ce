//store.rs
use std::collections::HashMap;

use chrono::Utc;

use crate::models::{Block, Category, Id, NumField, SubCategory};

#[derive(Clone, Debug, Default)]
pub struct BlockNode {
    pub name: String,
    pub categories: Vec<Id>,
}

#[derive(Clone, Debug, Default)]
pub struct CategoryNode {
    pub name: String,
    pub value: NumField,
    pub extra_value: NumField,
    pub timer_text: String,
    pub timer_running: bool,
    pub remaining_secs: u32,
    pub is_collapsed: bool,
    pub sub_categories: Vec<Id>,
}

#[derive(Clone, Debug, Default)]
pub struct SubCategoryNode {
    pub value: NumField,
    pub extra_value: NumField,
}

/// The workout tree, kept as an arena of nodes plus a child-to-parent
/// index so every edit is an O(1) map update instead of a rebuild of the
/// whole Block/Category/SubCategory chain. Persistence still sees whole
/// tree snapshots via [`BlockStore::snapshot`].
///
/// Every operation is total: an id that does not resolve, or that sits
/// under a different parent than the caller claims, leaves the store
/// untouched and reports that nothing happened.
#[derive(Clone, Debug, Default)]
pub struct BlockStore {
    order: Vec<Id>,
    blocks: HashMap<Id, BlockNode>,
    categories: HashMap<Id, CategoryNode>,
    subs: HashMap<Id, SubCategoryNode>,
    parent_of: HashMap<Id, Id>,
    last_id: Id,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids stay wall-clock derived like the original data, but a
    /// monotonic guard rules out same-millisecond collisions and id reuse
    /// after deletes.
    fn next_id(&mut self) -> Id {
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    // --- read access -----------------------------------------------------

    pub fn block_ids(&self) -> &[Id] {
        &self.order
    }

    pub fn block(&self, block: Id) -> Option<&BlockNode> {
        self.blocks.get(&block)
    }

    pub fn category(&self, category: Id) -> Option<&CategoryNode> {
        self.categories.get(&category)
    }

    pub fn sub(&self, sub: Id) -> Option<&SubCategoryNode> {
        self.subs.get(&sub)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn category_under(&self, block: Id, category: Id) -> bool {
        self.parent_of.get(&category) == Some(&block) && self.categories.contains_key(&category)
    }

    fn sub_under(&self, block: Id, category: Id, sub: Id) -> bool {
        self.parent_of.get(&sub) == Some(&category) && self.category_under(block, category)
    }

    pub(crate) fn category_mut(&mut self, block: Id, category: Id) -> Option<&mut CategoryNode> {
        if self.category_under(block, category) {
            self.categories.get_mut(&category)
        } else {
            None
        }
    }

    fn sub_mut(&mut self, block: Id, category: Id, sub: Id) -> Option<&mut SubCategoryNode> {
        if self.sub_under(block, category, sub) {
            self.subs.get_mut(&sub)
        } else {
            None
        }
    }

    // --- structural operations -------------------------------------------

    pub fn add_block(&mut self) -> Id {
        let id = self.next_id();
        self.blocks.insert(
            id,
            BlockNode {
                name: "Day".to_string(),
                categories: Vec::new(),
            },
        );
        self.order.push(id);
        id
    }

    pub fn delete_block(&mut self, block: Id) -> bool {
        let Some(node) = self.blocks.remove(&block) else {
            return false;
        };
        self.order.retain(|&id| id != block);
        for category in node.categories {
            self.remove_category_subtree(category);
        }
        true
    }

    fn remove_category_subtree(&mut self, category: Id) {
        self.parent_of.remove(&category);
        if let Some(node) = self.categories.remove(&category) {
            for sub in node.sub_categories {
                self.parent_of.remove(&sub);
                self.subs.remove(&sub);
            }
        }
    }

    pub fn rename_block(&mut self, block: Id, name: &str) -> bool {
        match self.blocks.get_mut(&block) {
            Some(node) => {
                node.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn add_category(&mut self, block: Id) -> Option<Id> {
        if !self.blocks.contains_key(&block) {
            return None;
        }
        let id = self.next_id();
        self.categories.insert(id, CategoryNode::default());
        self.parent_of.insert(id, block);
        if let Some(node) = self.blocks.get_mut(&block) {
            node.categories.push(id);
        }
        Some(id)
    }

    pub fn add_sub(&mut self, block: Id, category: Id) -> Option<Id> {
        if !self.category_under(block, category) {
            return None;
        }
        let id = self.next_id();
        self.subs.insert(id, SubCategoryNode::default());
        self.parent_of.insert(id, category);
        if let Some(node) = self.categories.get_mut(&category) {
            node.sub_categories.push(id);
        }
        Some(id)
    }

    pub fn delete_category(&mut self, block: Id, category: Id) -> bool {
        if !self.category_under(block, category) {
            return false;
        }
        if let Some(node) = self.blocks.get_mut(&block) {
            node.categories.retain(|&id| id != category);
        }
        self.remove_category_subtree(category);
        true
    }

    pub fn delete_sub(&mut self, block: Id, category: Id, sub: Id) -> bool {
        if !self.sub_under(block, category, sub) {
            return false;
        }
        if let Some(node) = self.categories.get_mut(&category) {
            node.sub_categories.retain(|&id| id != sub);
        }
        self.parent_of.remove(&sub);
        self.subs.remove(&sub);
        true
    }

    // --- field operations -------------------------------------------------

    pub fn rename_category(&mut self, block: Id, category: Id, name: &str) -> bool {
        match self.category_mut(block, category) {
            Some(node) => {
                node.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_category_value(&mut self, block: Id, category: Id, value: NumField) -> bool {
        match self.category_mut(block, category) {
            Some(node) => {
                node.value = value;
                true
            }
            None => false,
        }
    }

    pub fn set_category_extra(&mut self, block: Id, category: Id, value: NumField) -> bool {
        match self.category_mut(block, category) {
            Some(node) => {
                node.extra_value = value;
                true
            }
            None => false,
        }
    }

    pub fn set_timer_text(&mut self, block: Id, category: Id, text: &str) -> bool {
        match self.category_mut(block, category) {
            Some(node) => {
                node.timer_text = text.to_string();
                true
            }
            None => false,
        }
    }

    pub fn toggle_collapse(&mut self, block: Id, category: Id) -> bool {
        match self.category_mut(block, category) {
            Some(node) => {
                node.is_collapsed = !node.is_collapsed;
                true
            }
            None => false,
        }
    }

    pub fn set_sub_value(&mut self, block: Id, category: Id, sub: Id, value: NumField) -> bool {
        match self.sub_mut(block, category, sub) {
            Some(node) => {
                node.value = value;
                true
            }
            None => false,
        }
    }

    pub fn set_sub_extra(&mut self, block: Id, category: Id, sub: Id, value: NumField) -> bool {
        match self.sub_mut(block, category, sub) {
            Some(node) => {
                node.extra_value = value;
                true
            }
            None => false,
        }
    }

    // --- whole-tree snapshots ---------------------------------------------

    pub fn snapshot(&self) -> Vec<Block> {
        self.order
            .iter()
            .filter_map(|&block_id| {
                let node = self.blocks.get(&block_id)?;
                Some(Block {
                    id: block_id,
                    name: node.name.clone(),
                    categories: node
                        .categories
                        .iter()
                        .filter_map(|&cat_id| self.snapshot_category(cat_id))
                        .collect(),
                })
            })
            .collect()
    }

    fn snapshot_category(&self, cat_id: Id) -> Option<Category> {
        let node = self.categories.get(&cat_id)?;
        Some(Category {
            id: cat_id,
            name: node.name.clone(),
            value: node.value,
            extra_value: node.extra_value,
            timer: node.timer_text.clone(),
            timer_running: node.timer_running,
            remaining_time: node.remaining_secs,
            is_collapsed: node.is_collapsed,
            sub_categories: node
                .sub_categories
                .iter()
                .filter_map(|&sub_id| {
                    let sub = self.subs.get(&sub_id)?;
                    Some(SubCategory {
                        id: sub_id,
                        value: sub.value,
                        extra_value: sub.extra_value,
                    })
                })
                .collect(),
        })
    }

    /// Rebuild the arena from a wire-shape tree. Stale timer state is
    /// normalized: a tree persisted mid-countdown claims `timerRunning`
    /// but no live timer handle can exist for it, so those categories
    /// come back idle.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut store = Self::default();
        for block in blocks {
            store.last_id = store.last_id.max(block.id);
            store.order.push(block.id);
            let mut cat_ids = Vec::with_capacity(block.categories.len());
            for cat in block.categories {
                store.last_id = store.last_id.max(cat.id);
                let mut sub_ids = Vec::with_capacity(cat.sub_categories.len());
                for sub in cat.sub_categories {
                    store.last_id = store.last_id.max(sub.id);
                    store.subs.insert(
                        sub.id,
                        SubCategoryNode {
                            value: sub.value,
                            extra_value: sub.extra_value,
                        },
                    );
                    store.parent_of.insert(sub.id, cat.id);
                    sub_ids.push(sub.id);
                }
                let stale = cat.timer_running;
                store.categories.insert(
                    cat.id,
                    CategoryNode {
                        name: cat.name,
                        value: cat.value,
                        extra_value: cat.extra_value,
                        timer_text: if stale { String::new() } else { cat.timer },
                        timer_running: false,
                        remaining_secs: 0,
                        is_collapsed: cat.is_collapsed,
                        sub_categories: sub_ids,
                    },
                );
                store.parent_of.insert(cat.id, block.id);
                cat_ids.push(cat.id);
            }
            store.blocks.insert(
                block.id,
                BlockNode {
                    name: block.name,
                    categories: cat_ids,
                },
            );
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Walk the arena and assert the parent index, the child lists and
    /// the node maps all agree — no orphans, no dangling ids.
    fn assert_consistent(store: &BlockStore) {
        let mut seen_cats = 0;
        let mut seen_subs = 0;
        for &block_id in &store.order {
            let block = store.blocks.get(&block_id).expect("ordered block exists");
            for &cat_id in &block.categories {
                assert_eq!(store.parent_of.get(&cat_id), Some(&block_id));
                let cat = store.categories.get(&cat_id).expect("category exists");
                seen_cats += 1;
                for &sub_id in &cat.sub_categories {
                    assert_eq!(store.parent_of.get(&sub_id), Some(&cat_id));
                    assert!(store.subs.contains_key(&sub_id));
                    seen_subs += 1;
                }
            }
        }
        assert_eq!(store.order.len(), store.blocks.len());
        assert_eq!(seen_cats, store.categories.len());
        assert_eq!(seen_subs, store.subs.len());
        assert_eq!(store.parent_of.len(), seen_cats + seen_subs);
    }

    #[test]
    fn add_block_starts_as_an_empty_day() {
        let mut store = BlockStore::new();
        assert!(store.is_empty());

        let block = store.add_block();
        assert_eq!(store.block_ids(), &[block]);
        let node = store.block(block).unwrap();
        assert_eq!(node.name, "Day");
        assert!(node.categories.is_empty());
        assert_consistent(&store);
    }

    #[test]
    fn category_lifecycle_matches_the_row_controls() {
        let mut store = BlockStore::new();
        let block = store.add_block();

        let cat = store.add_category(block).unwrap();
        let node = store.category(cat).unwrap();
        assert_eq!(node.name, "");
        assert_eq!(node.value.get(), 0);
        assert_eq!(node.extra_value.get(), 0);
        assert!(node.sub_categories.is_empty());
        assert!(!node.is_collapsed);

        assert!(store.set_category_value(block, cat, NumField::new(5)));
        assert_eq!(store.category(cat).unwrap().value.get(), 5);

        assert!(store.rename_category(block, cat, "Deadlift"));
        assert_eq!(store.category(cat).unwrap().name, "Deadlift");

        assert!(store.delete_category(block, cat));
        assert!(store.block(block).unwrap().categories.is_empty());
        assert!(store.category(cat).is_none());
        assert_consistent(&store);
    }

    #[test]
    fn add_sub_creates_one_zeroed_set() {
        let mut store = BlockStore::new();
        let block = store.add_block();
        let cat = store.add_category(block).unwrap();

        let sub = store.add_sub(block, cat).unwrap();
        assert_eq!(store.category(cat).unwrap().sub_categories, vec![sub]);
        let node = store.sub(sub).unwrap();
        assert_eq!(node.value.get(), 0);
        assert_eq!(node.extra_value.get(), 0);

        assert!(store.set_sub_value(block, cat, sub, NumField::new(60)));
        assert!(store.set_sub_extra(block, cat, sub, NumField::new(12)));
        assert_eq!(store.sub(sub).unwrap().value.get(), 60);
        assert_eq!(store.sub(sub).unwrap().extra_value.get(), 12);
        assert_consistent(&store);
    }

    #[test]
    fn deleting_a_block_removes_its_whole_subtree() {
        let mut store = BlockStore::new();
        let block = store.add_block();
        let cat = store.add_category(block).unwrap();
        let sub = store.add_sub(block, cat).unwrap();
        let other = store.add_block();
        let other_cat = store.add_category(other).unwrap();

        assert!(store.delete_block(block));
        assert!(store.block(block).is_none());
        assert!(store.category(cat).is_none());
        assert!(store.sub(sub).is_none());
        // unrelated block untouched
        assert!(store.category(other_cat).is_some());
        assert_consistent(&store);
    }

    #[test]
    fn delete_then_re_add_never_resurrects_content() {
        let mut store = BlockStore::new();
        let block = store.add_block();
        store.rename_block(block, "Push day");
        let cat = store.add_category(block).unwrap();
        store.rename_category(block, cat, "Bench");

        assert!(store.delete_block(block));
        let fresh = store.add_block();
        assert_ne!(fresh, block);
        assert!(fresh > block, "ids keep growing");
        let node = store.block(fresh).unwrap();
        assert_eq!(node.name, "Day");
        assert!(node.categories.is_empty());
    }

    #[test]
    fn ids_are_unique_even_within_one_millisecond() {
        let mut store = BlockStore::new();
        let block = store.add_block();
        let a = store.add_category(block).unwrap();
        let b = store.add_category(block).unwrap();
        let c = store.add_sub(block, a).unwrap();
        let ids = [block, a, b, c];
        assert!(
            ids.windows(2).all(|pair| pair[0] < pair[1]),
            "ids must be strictly increasing: {ids:?}"
        );
    }

    #[test]
    fn unmatched_ids_are_silent_no_ops() {
        let mut store = BlockStore::new();
        let block = store.add_block();
        let cat = store.add_category(block).unwrap();
        let before = store.snapshot();

        assert!(!store.delete_block(999));
        assert!(!store.rename_block(999, "x"));
        assert!(store.add_category(999).is_none());
        assert!(!store.delete_category(block, 999));
        assert!(!store.set_category_value(block, 999, NumField::new(1)));
        assert!(!store.toggle_collapse(999, cat)); // wrong block for a real category
        assert!(store.add_sub(block, 999).is_none());
        assert!(!store.delete_sub(block, cat, 999));
        assert!(!store.set_sub_value(block, 999, cat, NumField::new(1)));

        assert_eq!(store.snapshot(), before);
        assert_consistent(&store);
    }

    #[test]
    fn mismatched_parent_paths_do_not_cross_blocks() {
        let mut store = BlockStore::new();
        let block_a = store.add_block();
        let block_b = store.add_block();
        let cat_a = store.add_category(block_a).unwrap();

        // cat_a addressed through block_b must not resolve
        assert!(!store.delete_category(block_b, cat_a));
        assert!(!store.rename_category(block_b, cat_a, "stolen"));
        assert!(store.add_sub(block_b, cat_a).is_none());
        assert!(store.category(cat_a).is_some());
        assert_consistent(&store);
    }

    #[test]
    fn toggle_collapse_twice_restores_the_original_state() {
        let mut store = BlockStore::new();
        let block = store.add_block();
        let cat = store.add_category(block).unwrap();
        assert!(!store.category(cat).unwrap().is_collapsed);

        store.toggle_collapse(block, cat);
        assert!(store.category(cat).unwrap().is_collapsed);
        store.toggle_collapse(block, cat);
        assert!(!store.category(cat).unwrap().is_collapsed);
    }

    #[test]
    fn snapshot_round_trips_through_from_blocks() {
        let mut store = BlockStore::new();
        let block = store.add_block();
        store.rename_block(block, "Leg day");
        let cat = store.add_category(block).unwrap();
        store.rename_category(block, cat, "Squat");
        store.set_category_value(block, cat, NumField::new(100));
        store.set_category_extra(block, cat, NumField(None));
        store.set_timer_text(block, cat, "3");
        store.toggle_collapse(block, cat);
        let sub = store.add_sub(block, cat).unwrap();
        store.set_sub_value(block, cat, sub, NumField::new(100));
        store.add_block();

        let snapshot = store.snapshot();
        let rebuilt = BlockStore::from_blocks(snapshot.clone());
        assert_eq!(rebuilt.snapshot(), snapshot);
        assert_consistent(&rebuilt);
    }

    #[test]
    fn from_blocks_resets_stale_running_timers() {
        let mut store = BlockStore::new();
        let block = store.add_block();
        let cat = store.add_category(block).unwrap();
        {
            let node = store.category_mut(block, cat).unwrap();
            node.timer_running = true;
            node.remaining_secs = 42;
            node.timer_text = "0:42".to_string();
        }

        let rebuilt = BlockStore::from_blocks(store.snapshot());
        let node = rebuilt.category(cat).unwrap();
        assert!(!node.timer_running);
        assert_eq!(node.remaining_secs, 0);
        assert_eq!(node.timer_text, "");
    }

    #[test]
    fn from_blocks_seeds_the_id_counter_past_loaded_ids() {
        let store = BlockStore::from_blocks(vec![Block {
            id: i64::MAX - 10,
            name: "Future day".to_string(),
            categories: Vec::new(),
        }]);
        let mut store = store;
        let fresh = store.add_block();
        assert!(fresh > i64::MAX - 10);
    }
}
