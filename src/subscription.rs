use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::Unsubscribe;

new_key_type! {
	pub struct NodeId;
}

pub type ListenerId = u64;

/// Where a node hangs in the notification tree. Exactly one
/// upstream, fixed at construction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Upstream {
	Store,
	Node(NodeId),
}

#[derive(Clone)]
enum Child {
	Node(NodeId),
	Listener(ListenerId, Rc<dyn Fn()>),
}

struct Node {
	upstream: Upstream,
	children: SmallVec<[Child; 4]>,
	on_notify: Option<Rc<dyn Fn()>>,
	subscribed: bool,
	store_unsub: Option<Unsubscribe>,
}

/// Arena of subscription nodes. Shared behind `Rc<RefCell<..>>` so
/// notification can release the borrow before running callbacks,
/// which are free to re-enter the graph.
pub struct SubscriptionGraph {
	nodes: SlotMap<NodeId, Node>,
	next_listener: ListenerId,
}

impl Default for SubscriptionGraph {
	fn default() -> Self {
		Self::new()
	}
}

impl SubscriptionGraph {
	pub fn new() -> Self {
		SubscriptionGraph {
			nodes: SlotMap::with_key(),
			next_listener: 0,
		}
	}

	pub fn create_node(&mut self, upstream: Upstream) -> NodeId {
		self.nodes.insert(Node {
			upstream,
			children: SmallVec::new(),
			on_notify: None,
			subscribed: false,
			store_unsub: None,
		})
	}

	/// Installs the callback that runs before the node forwards a
	/// notification to its children.
	pub fn set_notify(&mut self, id: NodeId, func: Rc<dyn Fn()>) {
		if let Some(node) = self.nodes.get_mut(id) {
			node.on_notify = Some(func);
		}
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.nodes.contains_key(id)
	}

	pub fn is_subscribed(&self, id: NodeId) -> bool {
		self.nodes.get(id).map_or(false, |node| node.subscribed)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Walks the upstream chain marking nodes subscribed and linking
	/// each into its parent's child list, until it meets an already
	/// subscribed ancestor or the store root. No-op when the node is
	/// subscribed already.
	///
	/// Returns the store-rooted node that still needs its store
	/// listener installed. The caller registers it with the store
	/// outside of the arena borrow and hands the unsubscribe handle
	/// back via `set_store_unsub`.
	pub fn link_upstream(&mut self, id: NodeId) -> Option<NodeId> {
		let mut current = id;
		loop {
			let node = self.nodes.get_mut(current)?;
			if node.subscribed {
				return None;
			}
			node.subscribed = true;
			tracing::trace!("subscription node {:?} linked", current);
			match node.upstream {
				Upstream::Store => return Some(current),
				Upstream::Node(parent) => {
					match self.nodes.get_mut(parent) {
						Some(parent_node) => {
							parent_node.children.push(Child::Node(current))
						}
						// upstream vanished, the chain ends here
						None => return None,
					}
					current = parent;
				}
			}
		}
	}

	pub fn set_store_unsub(&mut self, id: NodeId, unsub: Unsubscribe) {
		if let Some(node) = self.nodes.get_mut(id) {
			node.store_unsub = Some(unsub);
		}
	}

	/// Detaches the node: drops it from its parent's child list,
	/// clears its own children and cascades the unsubscribed flag
	/// down through child nodes. No-op when not subscribed.
	///
	/// Returns the store unsubscribe handle for the caller to run
	/// outside of the arena borrow.
	#[must_use]
	pub fn unlink(&mut self, id: NodeId) -> Option<Unsubscribe> {
		let (upstream, unsub, children) = {
			let node = self.nodes.get_mut(id)?;
			if !node.subscribed {
				return None;
			}
			node.subscribed = false;
			(
				node.upstream,
				node.store_unsub.take(),
				std::mem::take(&mut node.children),
			)
		};

		tracing::trace!("subscription node {:?} unlinked", id);

		for child in children {
			if let Child::Node(child_id) = child {
				self.cascade_detach(child_id);
			}
		}

		if let Upstream::Node(parent) = upstream {
			if let Some(parent_node) = self.nodes.get_mut(parent) {
				parent_node
					.children
					.retain(|child| !matches!(child, Child::Node(other) if *other == id));
			}
		}

		unsub
	}

	fn cascade_detach(&mut self, id: NodeId) {
		let children = {
			let node = match self.nodes.get_mut(id) {
				Some(node) => node,
				None => return,
			};
			if !node.subscribed {
				return;
			}
			node.subscribed = false;
			std::mem::take(&mut node.children)
		};

		for child in children {
			if let Child::Node(child_id) = child {
				self.cascade_detach(child_id);
			}
		}
	}

	/// Detaches the node and frees its arena slot. Returns the store
	/// unsubscribe handle like `unlink`.
	#[must_use]
	pub fn remove_node(&mut self, id: NodeId) -> Option<Unsubscribe> {
		let unsub = self.unlink(id);
		self.nodes.remove(id);
		unsub
	}

	/// Appends a plain callback to the node's ordered child list.
	/// Insertion order is notification order.
	pub fn add_listener(&mut self, id: NodeId, func: Rc<dyn Fn()>) -> Option<ListenerId> {
		let listener = self.next_listener;
		let node = self.nodes.get_mut(id)?;
		self.next_listener += 1;
		node.children.push(Child::Listener(listener, func));
		Some(listener)
	}

	pub fn remove_listener(&mut self, id: NodeId, listener: ListenerId) {
		if let Some(node) = self.nodes.get_mut(id) {
			node.children
				.retain(|child| !matches!(child, Child::Listener(other, _) if *other == listener));
		}
	}

	fn has_listener(&self, id: NodeId, listener: ListenerId) -> bool {
		self.nodes.get(id).map_or(false, |node| {
			node.children
				.iter()
				.any(|child| matches!(child, Child::Listener(other, _) if *other == listener))
		})
	}

	/// Runs the node's own notify callback, then forwards to a
	/// snapshot of its children in insertion order. Children added
	/// during the pass wait for the next one; children detached
	/// during the pass are skipped, verified against the live graph
	/// right before each delivery.
	pub fn notify(graph: &Rc<RefCell<SubscriptionGraph>>, id: NodeId) {
		let (own, snapshot) = {
			let inner = graph.borrow();
			let node = match inner.nodes.get(id) {
				Some(node) => node,
				None => return,
			};
			if !node.subscribed {
				return;
			}
			(node.on_notify.clone(), node.children.clone())
		};

		// the node reacts first, its children see post-update data
		if let Some(own) = own {
			own();
		}

		for child in snapshot {
			match child {
				Child::Node(child_id) => Self::notify(graph, child_id),
				Child::Listener(listener, func) => {
					let live = graph.borrow().has_listener(id, listener);
					if live {
						func();
					}
				}
			}
		}
	}
}
