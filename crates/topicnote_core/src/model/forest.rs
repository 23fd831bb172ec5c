//! Flat topic index used to assemble subtrees.
//!
//! # Responsibility
//! - Group one owner's topics by parent id without linking objects together.
//! - Materialize [`TopicTree`] values to a bounded or unbounded depth.
//!
//! # Invariants
//! - Children keep the order in which topics were handed to [`TopicForest::new`].
//! - Every topic is expanded at most once; meeting one twice is reported as a
//!   [`HierarchyCycle`] instead of looping.

use crate::model::topic::{Topic, TopicId, TopicTree};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Parent chain loops back onto `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyCycle(pub TopicId);

impl Display for HierarchyCycle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "topic hierarchy contains a cycle through {}", self.0)
    }
}

impl Error for HierarchyCycle {}

/// Topics of one owner indexed by parent id.
#[derive(Debug, Default)]
pub struct TopicForest {
    by_parent: HashMap<Option<TopicId>, Vec<Topic>>,
}

impl TopicForest {
    pub fn new(topics: impl IntoIterator<Item = Topic>) -> Self {
        let mut by_parent: HashMap<Option<TopicId>, Vec<Topic>> = HashMap::new();
        for topic in topics {
            by_parent.entry(topic.parent_id).or_default().push(topic);
        }
        Self { by_parent }
    }

    /// Direct children of `parent_id`; `None` lists root-level topics.
    pub fn children(&self, parent_id: Option<TopicId>) -> &[Topic] {
        self.by_parent
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Builds every root-level topic with its subtree.
    ///
    /// `max_depth` bounds how many subtopic levels are expanded below each
    /// root; `None` expands all of them.
    pub fn root_trees(&self, max_depth: Option<usize>) -> Result<Vec<TopicTree>, HierarchyCycle> {
        let mut visited = HashSet::new();
        self.children(None)
            .iter()
            .map(|root| self.expand(root.clone(), max_depth, &mut visited))
            .collect()
    }

    /// Builds the subtree below `topic`.
    pub fn subtree(
        &self,
        topic: Topic,
        max_depth: Option<usize>,
    ) -> Result<TopicTree, HierarchyCycle> {
        let mut visited = HashSet::new();
        self.expand(topic, max_depth, &mut visited)
    }

    /// Materializes `topic` and its descendants with an explicit frame stack.
    ///
    /// Each frame holds a partially built node and the children still to
    /// visit; a finished frame is attached to the frame below it.
    fn expand(
        &self,
        topic: Topic,
        max_depth: Option<usize>,
        visited: &mut HashSet<TopicId>,
    ) -> Result<TopicTree, HierarchyCycle> {
        if !visited.insert(topic.id) {
            return Err(HierarchyCycle(topic.id));
        }
        let mut root = self.frame(topic, max_depth);
        let mut open: Vec<Frame<'_>> = Vec::new();

        loop {
            let current = match open.last_mut() {
                Some(frame) => frame,
                None => &mut root,
            };
            match current.children.next() {
                Some(child) => {
                    if !visited.insert(child.id) {
                        return Err(HierarchyCycle(child.id));
                    }
                    let remaining = current.remaining.map(|depth| depth.saturating_sub(1));
                    open.push(self.frame(child.clone(), remaining));
                }
                None => match open.pop() {
                    Some(finished) => {
                        let parent = match open.last_mut() {
                            Some(frame) => frame,
                            None => &mut root,
                        };
                        parent.tree.subtopics.push(finished.tree);
                    }
                    None => return Ok(root.tree),
                },
            }
        }
    }

    fn frame(&self, topic: Topic, remaining: Option<usize>) -> Frame<'_> {
        let children: &[Topic] = if remaining == Some(0) {
            &[]
        } else {
            self.children(Some(topic.id))
        };
        Frame {
            tree: TopicTree::leaf(topic),
            children: children.iter(),
            remaining,
        }
    }
}

struct Frame<'a> {
    tree: TopicTree,
    children: std::slice::Iter<'a, Topic>,
    remaining: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::{HierarchyCycle, TopicForest};
    use crate::model::topic::Topic;
    use uuid::Uuid;

    fn topic(name: &str, parent_id: Option<Uuid>) -> Topic {
        Topic {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id: "owner".to_string(),
            parent_id,
            sort_order: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn root_trees_expand_arbitrary_depth() {
        let a = topic("a", None);
        let b = topic("b", Some(a.id));
        let c = topic("c", Some(b.id));
        let d = topic("d", Some(c.id));
        let e = topic("e", None);
        let forest = TopicForest::new(vec![a.clone(), b, c, d.clone(), e.clone()]);

        let roots = forest.root_trees(None).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].topic.id, a.id);
        assert_eq!(roots[1].topic.id, e.id);
        assert_eq!(roots[0].descendant_count(), 3);
        assert!(roots[0].find(d.id).is_some());
    }

    #[test]
    fn max_depth_limits_expanded_levels() {
        let a = topic("a", None);
        let b = topic("b", Some(a.id));
        let c = topic("c", Some(b.id));
        let forest = TopicForest::new(vec![a.clone(), b.clone(), c]);

        let shallow = forest.subtree(a.clone(), Some(1)).unwrap();
        assert_eq!(shallow.subtopics.len(), 1);
        assert!(shallow.subtopics[0].subtopics.is_empty());

        let flat = forest.subtree(a, Some(0)).unwrap();
        assert!(flat.subtopics.is_empty());
    }

    #[test]
    fn children_keep_input_order() {
        let root = topic("root", None);
        let first = topic("first", Some(root.id));
        let second = topic("second", Some(root.id));
        let forest = TopicForest::new(vec![root.clone(), first.clone(), second.clone()]);

        let names: Vec<_> = forest
            .children(Some(root.id))
            .iter()
            .map(|child| child.name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(forest.children(Some(first.id)).is_empty());
    }

    #[test]
    fn deep_chain_builds_without_recursion() {
        let mut chain = vec![topic("level 0", None)];
        for level in 1..50_000 {
            let parent_id = chain[level - 1].id;
            chain.push(topic(&format!("level {level}"), Some(parent_id)));
        }
        let leaf_id = chain[chain.len() - 1].id;
        let forest = TopicForest::new(chain);

        let roots = forest.root_trees(None).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].depth(), 49_999);
        assert!(roots[0].find(leaf_id).is_some());

        let bounded = forest.root_trees(Some(3)).unwrap();
        assert_eq!(bounded[0].depth(), 3);
    }

    #[test]
    fn subtree_reports_cycle_instead_of_looping() {
        let mut a = topic("a", None);
        let b = topic("b", Some(a.id));
        a.parent_id = Some(b.id);
        let forest = TopicForest::new(vec![a.clone(), b]);

        assert!(forest.root_trees(None).unwrap().is_empty());
        assert_eq!(forest.subtree(a.clone(), None), Err(HierarchyCycle(a.id)));
    }
}
