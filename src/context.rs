use std::cell::RefCell;
use std::rc::Rc;

use crate::action::Dispatcher;
use crate::subscription::{ListenerId, NodeId, SubscriptionGraph, Upstream};
use crate::Store;

/// Owns the subscription graph for one store and the root proxy
/// node every top-level binding attaches under. The root carries no
/// notify callback of its own, it only fans store changes out to
/// its children.
pub struct Provider<S>
where
	S: 'static,
{
	store: Rc<dyn Store<State = S>>,
	graph: Rc<RefCell<SubscriptionGraph>>,
	root: NodeId,
	dispatcher: Dispatcher,
}

impl<S: 'static> Provider<S> {
	pub fn new(store: Rc<dyn Store<State = S>>) -> Self {
		let graph = Rc::new(RefCell::new(SubscriptionGraph::new()));
		let root = graph.borrow_mut().create_node(Upstream::Store);

		let dispatcher = Dispatcher::new({
			let store = store.clone();
			move |action| store.dispatch(action)
		});

		tracing::debug!("provider created, root {:?}", root);

		Provider {
			store,
			graph,
			root,
			dispatcher,
		}
	}

	/// The handle nested bindings receive. Top-level bindings attach
	/// under the provider's root node.
	pub fn context(&self) -> Context<S> {
		Context {
			store: self.store.clone(),
			graph: self.graph.clone(),
			dispatcher: self.dispatcher.clone(),
			parent: Some(self.root),
		}
	}

	pub fn store(&self) -> &Rc<dyn Store<State = S>> {
		&self.store
	}

	pub fn dispatcher(&self) -> &Dispatcher {
		&self.dispatcher
	}
}

impl<S: 'static> Drop for Provider<S> {
	fn drop(&mut self) {
		let unsub = self.graph.borrow_mut().remove_node(self.root);
		if let Some(unsub) = unsub {
			unsub();
		}
		tracing::debug!("provider dropped, root {:?}", self.root);
	}
}

/// Explicit `{ store, subscription }` handle passed down the tree.
/// `parent` is the subscription node to attach under, `None` means
/// the binding roots directly at the store.
pub struct Context<S>
where
	S: 'static,
{
	pub(crate) store: Rc<dyn Store<State = S>>,
	pub(crate) graph: Rc<RefCell<SubscriptionGraph>>,
	pub(crate) dispatcher: Dispatcher,
	pub(crate) parent: Option<NodeId>,
}

impl<S: 'static> Clone for Context<S> {
	fn clone(&self) -> Self {
		Context {
			store: self.store.clone(),
			graph: self.graph.clone(),
			dispatcher: self.dispatcher.clone(),
			parent: self.parent,
		}
	}
}

impl<S: 'static> Context<S> {
	/// A context rooted at a store that no provider owns. Used when
	/// a binding overrides the store explicitly.
	pub(crate) fn standalone(store: Rc<dyn Store<State = S>>) -> Self {
		let dispatcher = Dispatcher::new({
			let store = store.clone();
			move |action| store.dispatch(action)
		});

		Context {
			store,
			graph: Rc::new(RefCell::new(SubscriptionGraph::new())),
			dispatcher,
			parent: None,
		}
	}

	pub fn store(&self) -> &Rc<dyn Store<State = S>> {
		&self.store
	}

	pub fn dispatcher(&self) -> &Dispatcher {
		&self.dispatcher
	}

	/// Whether two handles point at the same store and subscription
	/// position. A host seeing this change drops its bindings and
	/// binds fresh ones.
	pub fn same_identity(&self, other: &Context<S>) -> bool {
		Rc::ptr_eq(&self.store, &other.store)
			&& Rc::ptr_eq(&self.graph, &other.graph)
			&& self.parent == other.parent
	}

	pub(crate) fn child(&self, parent: NodeId) -> Context<S> {
		let mut ctx = self.clone();
		ctx.parent = Some(parent);
		ctx
	}

	pub(crate) fn attach_upstream(&self) -> Upstream {
		match self.parent {
			Some(parent) => Upstream::Node(parent),
			None => Upstream::Store,
		}
	}

	pub(crate) fn create_node(&self) -> NodeId {
		self.graph.borrow_mut().create_node(self.attach_upstream())
	}

	pub(crate) fn set_notify(&self, id: NodeId, func: Rc<dyn Fn()>) {
		self.graph.borrow_mut().set_notify(id, func);
	}

	/// Idempotent subscribe. Links the node up the tree and, when
	/// the walk reaches an unsubscribed store root, registers the
	/// store listener outside of the graph borrow.
	pub(crate) fn subscribe_node(&self, id: NodeId) {
		let root = self.graph.borrow_mut().link_upstream(id);
		if let Some(root) = root {
			let graph = Rc::downgrade(&self.graph);
			let unsub = self.store.subscribe(Box::new(move || {
				if let Some(graph) = graph.upgrade() {
					SubscriptionGraph::notify(&graph, root);
				}
			}));
			self.graph.borrow_mut().set_store_unsub(root, unsub);
		}
	}

	pub(crate) fn remove_node(&self, id: NodeId) {
		let unsub = self.graph.borrow_mut().remove_node(id);
		if let Some(unsub) = unsub {
			unsub();
		}
	}

	/// Attaches a plain listener under the parent node, subscribing
	/// the chain lazily. Returns the handle to detach it with.
	pub fn add_listener(&self, func: Rc<dyn Fn()>) -> Option<(NodeId, ListenerId)> {
		let parent = self.parent?;
		let listener = self.graph.borrow_mut().add_listener(parent, func)?;
		self.subscribe_node(parent);
		Some((parent, listener))
	}

	pub fn remove_listener(&self, id: NodeId, listener: ListenerId) {
		self.graph.borrow_mut().remove_listener(id, listener);
	}
}
