//! Arena-backed taxonomy tree.
//!
//! Nodes live in a flat `Vec` owned by the tree and refer to each other by
//! index, so parent links cannot form ownership cycles. A `TagId` is only
//! meaningful together with the tree that handed it out.

/// Index of a node inside its [`TagTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagId(usize);

#[derive(Debug, Clone)]
struct TagNode {
    name: String,
    parent: Option<TagId>,
    children: Vec<TagId>,
}

/// An ownership tree of named tag nodes.
///
/// Sibling names are not required to be unique; lookups return the first
/// match in depth-first pre-order, children in insertion order. Detaching a
/// subtree leaves its nodes in the arena but unreachable, so every traversal
/// ignores them.
#[derive(Debug, Clone)]
pub struct TagTree {
    nodes: Vec<TagNode>,
    root: TagId,
}

impl TagTree {
    /// Create a tree holding only a root node.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = TagNode {
            name: root_name.into(),
            parent: None,
            children: Vec::new(),
        };
        TagTree {
            nodes: vec![root],
            root: TagId(0),
        }
    }

    /// The top of the tree.
    pub fn root(&self) -> TagId {
        self.root
    }

    /// Attach a new childless node under `parent` and return its id.
    pub fn append(&mut self, parent: TagId, name: impl Into<String>) -> TagId {
        let id = TagId(self.nodes.len());
        self.nodes.push(TagNode {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn name(&self, id: TagId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn parent(&self, id: TagId) -> Option<TagId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: TagId) -> &[TagId] {
        &self.nodes[id.0].children
    }

    /// A node with no children is a leaf: an assignable tag.
    pub fn is_leaf(&self, id: TagId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    pub fn has_children(&self, id: TagId) -> bool {
        !self.nodes[id.0].children.is_empty()
    }

    /// Find the first node named `name`, searching the whole tree.
    ///
    /// Depth-first pre-order with children in insertion order; if several
    /// nodes share the name, the first one encountered wins. That ambiguity
    /// is inherent to non-unique names and deliberately not resolved here.
    pub fn find(&self, name: &str) -> Option<TagId> {
        self.find_below(self.root, name)
    }

    /// Find the first node named `name` within the subtree rooted at `start`.
    ///
    /// Uses an explicit work stack, so taxonomy depth never threatens the
    /// call stack.
    pub fn find_below(&self, start: TagId, name: &str) -> Option<TagId> {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if self.nodes[id.0].name == name {
                return Some(id);
            }
            // Reversed so the first child is popped first (pre-order)
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        None
    }

    /// Detach `child` from `parent`. Returns whether a removal occurred.
    ///
    /// Only direct children can be removed; the detached subtree stays in
    /// the arena but becomes unreachable.
    pub fn remove_child(&mut self, parent: TagId, child: TagId) -> bool {
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|&c| c == child) {
            Some(index) => {
                children.remove(index);
                self.nodes[child.0].parent = None;
                true
            }
            None => false,
        }
    }

    /// Detach the first direct child of `parent` named `name`.
    pub fn remove_child_named(&mut self, parent: TagId, name: &str) -> bool {
        let found = self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c.0].name == name);
        match found {
            Some(child) => self.remove_child(parent, child),
            None => false,
        }
    }

    /// Ancestor names joined with `/`, from the top-level ancestor down to
    /// the node itself, e.g. `Hair/HairColor/Blue`.
    pub fn path_from_root(&self, id: TagId) -> String {
        let mut names = vec![self.nodes[id.0].name.as_str()];
        let mut cursor = self.nodes[id.0].parent;
        while let Some(parent) = cursor {
            names.push(self.nodes[parent.0].name.as_str());
            cursor = self.nodes[parent.0].parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Short display form: `<parent name>/<own name>`, with `null` standing
    /// in for the missing parent of the root.
    pub fn display_name(&self, id: TagId) -> String {
        match self.nodes[id.0].parent {
            Some(parent) => format!("{}/{}", self.nodes[parent.0].name, self.nodes[id.0].name),
            None => format!("null/{}", self.nodes[id.0].name),
        }
    }

    /// All reachable leaves in depth-first pre-order.
    pub fn leaves(&self) -> Vec<TagId> {
        let mut result = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if self.nodes[id.0].children.is_empty() {
                result.push(id);
            }
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TagTree {
        // Hair -> HairColor -> { Blue, Red }
        //      -> Length    -> { Long }
        let mut tree = TagTree::new("Hair");
        let color = tree.append(tree.root(), "HairColor");
        tree.append(color, "Blue");
        tree.append(color, "Red");
        let length = tree.append(tree.root(), "Length");
        tree.append(length, "Long");
        tree
    }

    #[test]
    fn test_find_hits_any_depth() {
        let tree = sample_tree();
        let blue = tree.find("Blue").unwrap();
        assert_eq!(tree.name(blue), "Blue");
        assert_eq!(tree.name(tree.parent(blue).unwrap()), "HairColor");
        assert!(tree.find("Green").is_none());
    }

    #[test]
    fn test_find_returns_first_match_in_preorder() {
        let mut tree = TagTree::new("Root");
        let a = tree.append(tree.root(), "A");
        let b = tree.append(tree.root(), "B");
        let first = tree.append(a, "Dup");
        tree.append(b, "Dup");
        assert_eq!(tree.find("Dup"), Some(first));
    }

    #[test]
    fn test_find_survives_deep_trees() {
        let mut tree = TagTree::new("0");
        let mut cursor = tree.root();
        for depth in 1..=20_000 {
            cursor = tree.append(cursor, depth.to_string());
        }
        let bottom = tree.find("20000").unwrap();
        assert_eq!(tree.name(bottom), "20000");
    }

    #[test]
    fn test_remove_is_direct_children_only() {
        let mut tree = sample_tree();
        // Blue is a grandchild of the root, so this must not remove it
        assert!(!tree.remove_child_named(tree.root(), "Blue"));
        assert!(tree.find("Blue").is_some());

        assert!(tree.remove_child_named(tree.root(), "HairColor"));
        // The whole detached subtree disappears from traversal
        assert!(tree.find("HairColor").is_none());
        assert!(tree.find("Blue").is_none());
        // Second removal finds nothing
        assert!(!tree.remove_child_named(tree.root(), "HairColor"));
    }

    #[test]
    fn test_remove_by_id() {
        let mut tree = sample_tree();
        let length = tree.find("Length").unwrap();
        assert!(tree.remove_child(tree.root(), length));
        assert!(tree.find("Long").is_none());
        assert!(!tree.remove_child(tree.root(), length));
    }

    #[test]
    fn test_leaf_queries() {
        let tree = sample_tree();
        let blue = tree.find("Blue").unwrap();
        let color = tree.find("HairColor").unwrap();
        assert!(tree.is_leaf(blue));
        assert!(!tree.has_children(blue));
        assert!(!tree.is_leaf(color));
        assert!(tree.has_children(color));
    }

    #[test]
    fn test_path_from_root() {
        let tree = sample_tree();
        let blue = tree.find("Blue").unwrap();
        assert_eq!(tree.path_from_root(blue), "Hair/HairColor/Blue");
        assert_eq!(tree.path_from_root(tree.root()), "Hair");
    }

    #[test]
    fn test_display_name() {
        let tree = sample_tree();
        let blue = tree.find("Blue").unwrap();
        assert_eq!(tree.display_name(blue), "HairColor/Blue");
        assert_eq!(tree.display_name(tree.root()), "null/Hair");
    }

    #[test]
    fn test_leaves_in_preorder() {
        let tree = sample_tree();
        let names: Vec<&str> = tree.leaves().into_iter().map(|id| tree.name(id)).collect();
        assert_eq!(names, ["Blue", "Red", "Long"]);
    }
}
