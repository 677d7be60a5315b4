//! Tree/AST representation for scanned markup.
//!
//! The tree uses an index-based arena: every node lives in the document's
//! node vector and is addressed by a [`NodeId`]. Nodes store a non-owning
//! parent id and an ordered list of child ids, which gives parent pointers
//! without reference cycles.
//!
//! String payloads are `Cow<'a, str>` borrowed from the source whenever the
//! scanner did not have to unescape anything.
//!
//! # Example
//!
//! ```
//! use tagtree_core::parse;
//!
//! let doc = parse("<list><item id=\"1\">first</item><item id=\"2\"/></list>").unwrap();
//! let list = doc.root().first_child().unwrap();
//!
//! for item in list.children() {
//!     println!("item {:?}: {}", item.attr_value("id"), item.text_content());
//! }
//! ```

use std::borrow::Cow;
use std::mem;

use crate::error::TreeError;

// ============================================================================
// Core Types
// ============================================================================

/// Index into the document's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Internal node storage.
#[derive(Debug)]
struct NodeData<'a> {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind<'a>,
}

/// The kind of node in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<'a> {
    /// Root document container.
    Document,

    /// Element that holds children: `<a>...</a>`.
    Container(Element<'a>),

    /// Tentative shape of `<a/>`, or of `<a>` before children are confirmed.
    SelfClosing(Element<'a>),

    /// Element known to take neither children nor a close tag.
    Void(Element<'a>),

    /// Raw character data between tags.
    Text(Cow<'a, str>),

    /// `<!-- ... -->`
    Comment(Cow<'a, str>),

    /// `<![CDATA[ ... ]]>`
    CData(Cow<'a, str>),

    /// Markup declaration such as `<!DOCTYPE html>`.
    DeclarationOpener {
        element: Element<'a>,
        /// Bare quoted tokens, in source order.
        system_literals: Vec<Cow<'a, str>>,
    },

    /// `<?name ...?>`
    ProcessingInstruction(Element<'a>),
}

impl<'a> NodeKind<'a> {
    /// Tag data for element-like nodes.
    pub fn element(&self) -> Option<&Element<'a>> {
        match self {
            NodeKind::Container(el)
            | NodeKind::SelfClosing(el)
            | NodeKind::Void(el)
            | NodeKind::ProcessingInstruction(el)
            | NodeKind::DeclarationOpener { element: el, .. } => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self) -> Option<&mut Element<'a>> {
        match self {
            NodeKind::Container(el)
            | NodeKind::SelfClosing(el)
            | NodeKind::Void(el)
            | NodeKind::ProcessingInstruction(el)
            | NodeKind::DeclarationOpener { element: el, .. } => Some(el),
            _ => None,
        }
    }

    /// Raw content of text, comment and CDATA nodes.
    pub fn content(&self) -> Option<&str> {
        match self {
            NodeKind::Text(s) | NodeKind::Comment(s) | NodeKind::CData(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Whether nodes of this kind may own children.
    pub fn can_hold_children(&self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::Container(_)
                | NodeKind::DeclarationOpener { .. }
                | NodeKind::ProcessingInstruction(_)
        )
    }

    /// Short variant name, mostly for diagnostics and test output.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Container(_) => "container",
            NodeKind::SelfClosing(_) => "self-closing",
            NodeKind::Void(_) => "void",
            NodeKind::Text(_) => "text",
            NodeKind::Comment(_) => "comment",
            NodeKind::CData(_) => "cdata",
            NodeKind::DeclarationOpener { .. } => "declaration",
            NodeKind::ProcessingInstruction(_) => "pi",
        }
    }

    fn same_variant(&self, other: &NodeKind<'_>) -> bool {
        self.name() == other.name()
    }
}

/// Tag name, namespace prefix and attributes of an element-like node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element<'a> {
    pub prefix: Option<Cow<'a, str>>,
    pub name: Cow<'a, str>,
    attrs: Vec<Attribute<'a>>,
}

impl<'a> Element<'a> {
    pub fn new(name: impl Into<Cow<'a, str>>) -> Self {
        Element {
            prefix: None,
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<Cow<'a, str>>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// `prefix:name`, or just `name` without a prefix.
    pub fn qualified_name(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(prefix) => Cow::Owned(format!("{}:{}", prefix, self.name)),
            None => Cow::Borrowed(self.name.as_ref()),
        }
    }

    /// Set an attribute. An existing attribute of the same name keeps its
    /// position and gets the new value.
    pub fn set_attr(&mut self, name: impl Into<Cow<'a, str>>, value: Option<Cow<'a, str>>) {
        let name = name.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attrs.push(Attribute { name, value }),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Attribute<'a>> {
        self.attrs.iter().find(|a| a.name.as_ref() == name)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Attribute<'a>> {
        let pos = self.attrs.iter().position(|a| a.name.as_ref() == name)?;
        Some(self.attrs.remove(pos))
    }

    /// Attributes in insertion order.
    pub fn attrs(&self) -> &[Attribute<'a>] {
        &self.attrs
    }

    fn same_name(&self, other: &Element<'_>) -> bool {
        self.prefix.as_deref() == other.prefix.as_deref() && self.name == other.name
    }

    /// Same attribute names and values, ignoring order.
    fn same_attrs(&self, other: &Element<'_>) -> bool {
        self.attrs.len() == other.attrs.len()
            && self.attrs.iter().all(|a| {
                other
                    .attr(&a.name)
                    .is_some_and(|b| a.value.as_deref() == b.value.as_deref())
            })
    }
}

/// An attribute on an element-like node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: Cow<'a, str>,
    /// `None` for presence-only attributes such as `<input disabled>`.
    pub value: Option<Cow<'a, str>>,
}

impl<'a> Attribute<'a> {
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_presence_only(&self) -> bool {
        self.value.is_none()
    }
}

// ============================================================================
// Document
// ============================================================================

/// A parsed document as a tree.
#[derive(Debug)]
pub struct Document<'a> {
    nodes: Vec<NodeData<'a>>,
    root: NodeId,
}

impl<'a> Default for Document<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Document<'a> {
    /// Empty document holding only the root node.
    pub fn new() -> Self {
        let root = NodeData {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Document,
        };
        Document {
            nodes: vec![root],
            root: NodeId::new(0),
        }
    }

    /// Get the root node.
    pub fn root(&self) -> Node<'_, 'a> {
        Node { doc: self, id: self.root }
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<Node<'_, 'a>> {
        if id.index() < self.nodes.len() {
            Some(Node { doc: self, id })
        } else {
            None
        }
    }

    /// Number of arena slots, including nodes detached by promotion.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind<'a>> {
        self.nodes.get(id.index()).map(|n| &n.kind)
    }

    pub fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind<'a>> {
        self.nodes.get_mut(id.index()).map(|n| &mut n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.index())
            .map_or(&[][..], |n| n.children.as_slice())
    }

    /// Allocate a detached node.
    pub fn create_node(&mut self, kind: NodeKind<'a>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Append a detached `child` to `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_attachable(parent, child)?;
        self.link(parent, child);
        Ok(())
    }

    /// Put the detached node `new` in `old`'s slot among `parent`'s children.
    /// `old` is left in the arena without a parent.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), TreeError> {
        self.check_attachable(parent, new)?;
        let slot = self.nodes[parent.index()]
            .children
            .iter()
            .position(|&c| c == old)
            .ok_or(TreeError::NotAChild { parent, child: old })?;
        self.nodes[parent.index()].children[slot] = new;
        self.nodes[new.index()].parent = Some(parent);
        self.nodes[old.index()].parent = None;
        Ok(())
    }

    /// Replace the tentative self-closing node `id` with a container carrying
    /// the same tag name, prefix and attributes. Returns the container's id.
    ///
    /// The tag data moves to the container; the detached slot keeps an empty
    /// element.
    pub fn promote(&mut self, id: NodeId) -> Result<NodeId, TreeError> {
        match self.kind(id) {
            Some(NodeKind::SelfClosing(_)) => {}
            Some(_) => return Err(TreeError::NotTentative(id)),
            None => return Err(TreeError::UnknownNode(id)),
        }
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let element = match self.kind_mut(id) {
            Some(NodeKind::SelfClosing(el)) => mem::take(el),
            _ => return Err(TreeError::NotTentative(id)),
        };
        let container = self.create_node(NodeKind::Container(element));
        self.replace_child(parent, id, container)?;
        Ok(container)
    }

    /// Turn the tentative self-closing node `id` into a void node in place.
    pub fn settle_void(&mut self, id: NodeId) -> Result<(), TreeError> {
        let kind = self.kind_mut(id).ok_or(TreeError::UnknownNode(id))?;
        match kind {
            NodeKind::SelfClosing(el) => {
                let element = mem::take(el);
                *kind = NodeKind::Void(element);
                Ok(())
            }
            _ => Err(TreeError::NotTentative(id)),
        }
    }

    /// Same variant, same prefix and tag name, same attribute set.
    ///
    /// Content of text-like nodes is not compared.
    pub fn is_identical(&self, a: NodeId, b: NodeId) -> bool {
        match (self.kind(a), self.kind(b)) {
            (Some(ka), Some(kb)) => kinds_identical(ka, kb),
            _ => false,
        }
    }

    /// Pre-order walk over every node reachable from the root, root included.
    pub fn descendants(&self) -> Descendants<'_, 'a> {
        Descendants {
            doc: self,
            stack: vec![self.root],
        }
    }

    /// Create a node and append it to `parent` without checks. Used by the
    /// scanner, whose cursor is always a node that can hold children.
    pub(crate) fn push_node(&mut self, parent: NodeId, kind: NodeKind<'a>) -> NodeId {
        let id = self.create_node(kind);
        self.link(parent, id);
        id
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let parent_kind = self.kind(parent).ok_or(TreeError::UnknownNode(parent))?;
        let child_data = self
            .nodes
            .get(child.index())
            .ok_or(TreeError::UnknownNode(child))?;
        if child == self.root {
            return Err(TreeError::RootNotMovable);
        }
        if !parent_kind.can_hold_children() {
            return Err(TreeError::NotAContainer(parent));
        }
        if child_data.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        Ok(())
    }

    fn node_data(&self, id: NodeId) -> &NodeData<'a> {
        &self.nodes[id.index()]
    }
}

fn kinds_identical(a: &NodeKind<'_>, b: &NodeKind<'_>) -> bool {
    if !a.same_variant(b) {
        return false;
    }
    match (a.element(), b.element()) {
        (Some(ea), Some(eb)) => ea.same_name(eb) && ea.same_attrs(eb),
        (None, None) => true,
        _ => false,
    }
}

/// Iterator returned by [`Document::descendants`].
pub struct Descendants<'doc, 'a> {
    doc: &'doc Document<'a>,
    stack: Vec<NodeId>,
}

impl<'doc, 'a> Iterator for Descendants<'doc, 'a> {
    type Item = Node<'doc, 'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.node_data(id).children.iter().rev().copied());
        Some(Node { doc: self.doc, id })
    }
}

// ============================================================================
// Node (navigation handle)
// ============================================================================

/// A handle for navigating the document tree.
///
/// This is a lightweight reference that borrows from the document.
/// The `'a: 'doc` bound ensures the source outlives the document borrow.
#[derive(Clone, Copy)]
pub struct Node<'doc, 'a: 'doc> {
    doc: &'doc Document<'a>,
    id: NodeId,
}

impl<'doc, 'a: 'doc> Node<'doc, 'a> {
    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> &'doc NodeKind<'a> {
        &self.doc.node_data(self.id).kind
    }

    /// Get the parent node, if any.
    pub fn parent(&self) -> Option<Node<'doc, 'a>> {
        self.doc.node_data(self.id).parent.map(|id| Node { doc: self.doc, id })
    }

    /// Iterate over child nodes.
    pub fn children(&self) -> impl Iterator<Item = Node<'doc, 'a>> + 'doc {
        let doc = self.doc;
        self.doc.node_data(self.id).children.iter().map(move |&id| Node { doc, id })
    }

    pub fn child_count(&self) -> usize {
        self.doc.node_data(self.id).children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node<'doc, 'a>> {
        self.doc.node_data(self.id).children.get(index).map(|&id| Node { doc: self.doc, id })
    }

    /// Get the first child node.
    pub fn first_child(&self) -> Option<Node<'doc, 'a>> {
        self.child(0)
    }

    /// Get the last child node.
    pub fn last_child(&self) -> Option<Node<'doc, 'a>> {
        self.doc.node_data(self.id).children.last().map(|&id| Node { doc: self.doc, id })
    }

    /// Get the next sibling node.
    pub fn next_sibling(&self) -> Option<Node<'doc, 'a>> {
        let parent_id = self.doc.node_data(self.id).parent?;
        let siblings = &self.doc.node_data(parent_id).children;
        let pos = siblings.iter().position(|&id| id == self.id)?;
        siblings.get(pos + 1).map(|&id| Node { doc: self.doc, id })
    }

    /// Get the previous sibling node.
    pub fn prev_sibling(&self) -> Option<Node<'doc, 'a>> {
        let parent_id = self.doc.node_data(self.id).parent?;
        let siblings = &self.doc.node_data(parent_id).children;
        let pos = siblings.iter().position(|&id| id == self.id)?;
        if pos > 0 {
            Some(Node { doc: self.doc, id: siblings[pos - 1] })
        } else {
            None
        }
    }

    pub fn element(&self) -> Option<&'doc Element<'a>> {
        self.kind().element()
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind(), NodeKind::Container(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind(), NodeKind::Text(_))
    }

    pub fn tag_name(&self) -> Option<&'doc str> {
        self.element().map(|el| el.name.as_ref())
    }

    pub fn namespace_prefix(&self) -> Option<&'doc str> {
        self.element().and_then(|el| el.prefix.as_deref())
    }

    pub fn qualified_name(&self) -> Option<Cow<'doc, str>> {
        self.element().map(Element::qualified_name)
    }

    pub fn attr(&self, name: &str) -> Option<&'doc Attribute<'a>> {
        self.element().and_then(|el| el.attr(name))
    }

    /// Value of attribute `name`; `None` if missing or presence-only.
    pub fn attr_value(&self, name: &str) -> Option<&'doc str> {
        self.attr(name).and_then(Attribute::value)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Attributes in insertion order; empty for non-element nodes.
    pub fn attrs(&self) -> &'doc [Attribute<'a>] {
        self.element().map_or(&[][..], Element::attrs)
    }

    /// Raw content of text, comment and CDATA nodes.
    pub fn content(&self) -> Option<&'doc str> {
        self.kind().content()
    }

    /// System literals of a declaration opener.
    pub fn system_literals(&self) -> &'doc [Cow<'a, str>] {
        match self.kind() {
            NodeKind::DeclarationOpener { system_literals, .. } => system_literals,
            _ => &[],
        }
    }

    /// Collect text and CDATA content under this node, in document order.
    pub fn text_content(&self) -> String {
        let mut result = String::new();
        let mut stack = vec![self.id];
        while let Some(id) = stack.pop() {
            let data = self.doc.node_data(id);
            match &data.kind {
                NodeKind::Text(s) | NodeKind::CData(s) => result.push_str(s),
                _ => stack.extend(data.children.iter().rev().copied()),
            }
        }
        result
    }

    pub fn is_identical_to(&self, other: &Node<'_, '_>) -> bool {
        kinds_identical(self.kind(), other.kind())
    }
}

impl<'doc, 'a> std::fmt::Debug for Node<'doc, 'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", self.kind())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
