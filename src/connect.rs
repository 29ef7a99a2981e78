use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::context::Context;
use crate::correlate::ErrorBuffer;
use crate::error::{ConfigError, DeriveError, SelectError};
use crate::pipeline::{EnhanceGate, MapDispatch, MapState, Merge, PropsPipeline, StateEqual};
use crate::props::Props;
use crate::subscription::NodeId;
use crate::Store;

pub struct ConnectOptions<S>
where
	S: 'static,
{
	/// Shallow-equality short-circuiting on. Off means every pass
	/// recomputes everything and every store change updates the host.
	pub pure: bool,
	/// Replaces the snapshot-handle comparison that decides whether
	/// the store state changed.
	pub state_equality: Option<StateEqual<S>>,
}

impl<S: 'static> Default for ConnectOptions<S> {
	fn default() -> Self {
		ConnectOptions {
			pure: true,
			state_equality: None,
		}
	}
}

impl<S: 'static> Clone for ConnectOptions<S> {
	fn clone(&self) -> Self {
		ConnectOptions {
			pure: self.pure,
			state_equality: self.state_equality.clone(),
		}
	}
}

/// Reusable description of a binding: the pipeline stages plus
/// options. One `Connect` binds any number of instances.
pub struct Connect<S>
where
	S: 'static,
{
	map_state: Option<MapState<S>>,
	map_dispatch: MapDispatch,
	merge: Merge,
	options: ConnectOptions<S>,
	store: Option<Rc<dyn Store<State = S>>>,
}

impl<S: 'static> Clone for Connect<S> {
	fn clone(&self) -> Self {
		Connect {
			map_state: self.map_state.clone(),
			map_dispatch: self.map_dispatch.clone(),
			merge: self.merge.clone(),
			options: self.options.clone(),
			store: self.store.clone(),
		}
	}
}

impl<S: 'static> Default for Connect<S> {
	fn default() -> Self {
		Self::new()
	}
}

impl<S: 'static> Connect<S> {
	pub fn new() -> Self {
		Connect {
			map_state: None,
			map_dispatch: MapDispatch::default(),
			merge: Merge::default(),
			options: ConnectOptions::default(),
			store: None,
		}
	}

	pub fn map_state(mut self, map: MapState<S>) -> Self {
		self.map_state = Some(map);
		self
	}

	pub fn map_dispatch(mut self, map: MapDispatch) -> Self {
		self.map_dispatch = map;
		self
	}

	pub fn merge(mut self, merge: Merge) -> Self {
		self.merge = merge;
		self
	}

	pub fn options(mut self, options: ConnectOptions<S>) -> Self {
		self.options = options;
		self
	}

	/// Binds to this store instead of the context's. The instance
	/// gets its own store-rooted subscription chain.
	pub fn with_store(mut self, store: Rc<dyn Store<State = S>>) -> Self {
		self.store = Some(store);
		self
	}

	/// Creates one binding instance. Computes the initial merged
	/// props synchronously, a stage contract violation aborts here.
	/// The instance is not subscribed until `mount`.
	pub fn bind(
		&self,
		ctx: Option<&Context<S>>,
		own_props: Props,
		update: Rc<dyn Fn(Rc<Props>)>,
	) -> Result<Connected<S>, ConfigError> {
		let ctx = match (&self.store, ctx) {
			(Some(store), _) => Context::standalone(store.clone()),
			(None, Some(ctx)) => ctx.clone(),
			(None, None) => return Err(ConfigError::NoStore),
		};

		// without a state stage the props cannot change under the
		// binding, so it never subscribes and only relays for its
		// descendants
		let subscribes = self.map_state.is_some();
		let map_state = match &self.map_state {
			Some(map) => map.clone(),
			None => MapState::empty(),
		};

		let mut pipeline = PropsPipeline::new(
			map_state,
			self.map_dispatch.clone(),
			self.merge.clone(),
			ctx.dispatcher().clone(),
			self.options.pure,
			self.options.state_equality.clone(),
		);

		let own = Rc::new(own_props);
		let state = ctx.store().state();
		let props = pipeline.select(&state, &own)?;

		let mut gate = EnhanceGate::new(self.options.pure);
		let _ = gate.pass(props.clone());

		let node = ctx.create_node();

		let connected = Connected {
			body: Rc::new_cyclic(|this| ConnectedBody {
				ctx,
				node,
				subscribes,
				update,
				inner: RefCell::new(ConnectedInner {
					pipeline,
					gate,
					own,
					props,
					errors: ErrorBuffer::new(),
					mounted: false,
					this: this.clone(),
				}),
			}),
		};

		if subscribes {
			let weak = connected.body.inner.borrow().this.clone();
			connected.body.ctx.set_notify(
				node,
				Rc::new(move || {
					if let Some(body) = weak.upgrade() {
						body.on_store_change();
					}
				}),
			);
		}

		Ok(connected)
	}
}

/// One mounted attachment point. Owns its subscription node and
/// pipeline state; dropping it tears both down.
pub struct Connected<S>
where
	S: 'static,
{
	body: Rc<ConnectedBody<S>>,
}

impl<S: 'static> Clone for Connected<S> {
	fn clone(&self) -> Self {
		Connected {
			body: self.body.clone(),
		}
	}
}

struct ConnectedBody<S>
where
	S: 'static,
{
	ctx: Context<S>,
	node: NodeId,
	subscribes: bool,
	update: Rc<dyn Fn(Rc<Props>)>,
	inner: RefCell<ConnectedInner<S>>,
}

struct ConnectedInner<S>
where
	S: 'static,
{
	pipeline: PropsPipeline<S>,
	gate: EnhanceGate,
	own: Rc<Props>,
	props: Rc<Props>,
	errors: ErrorBuffer,
	mounted: bool,
	this: Weak<ConnectedBody<S>>,
}

impl<S: 'static> Connected<S> {
	/// Subscribes into the tree and immediately runs one pass, so a
	/// store change that landed between `bind` and `mount` is not
	/// lost. Idempotent.
	pub fn mount(&self) {
		{
			let mut inner = self.body.inner.borrow_mut();
			if inner.mounted {
				return;
			}
			inner.mounted = true;
		}
		if self.body.subscribes {
			self.body.ctx.subscribe_node(self.body.node);
			self.body.on_store_change();
		}
	}

	/// Replaces the local props and recomputes. Returns the current
	/// merged props, or the render failure correlated against any
	/// buffered background failure.
	pub fn set_own_props(&self, own_props: Props) -> Result<Rc<Props>, SelectError> {
		self.body.render_pass(Some(Rc::new(own_props)))
	}

	/// Recomputes against the current store state with the props
	/// already set. Surfaces buffered background failures the same
	/// way `set_own_props` does.
	pub fn refresh(&self) -> Result<Rc<Props>, SelectError> {
		self.body.render_pass(None)
	}

	pub fn props(&self) -> Rc<Props> {
		self.body.inner.borrow().props.clone()
	}

	/// The handle for bindings nested under this one. Their nodes
	/// attach below this instance's node, which keeps notification
	/// strictly ancestor first.
	pub fn child_context(&self) -> Context<S> {
		self.body.ctx.child(self.body.node)
	}

	/// Tears the subscription down and frees the node. Idempotent,
	/// also runs on drop.
	pub fn unmount(&self) {
		self.body.inner.borrow_mut().mounted = false;
		self.body.ctx.remove_node(self.body.node);
	}
}

impl<S: 'static> ConnectedBody<S> {
	/// Store notification path. Failures cannot surface here, they
	/// go to the error buffer; the host hears only about changed
	/// props.
	fn on_store_change(&self) {
		let state = self.ctx.store().state();
		let update = {
			let mut inner = self.inner.borrow_mut();
			let own = inner.own.clone();
			match inner.pipeline.select(&state, &own) {
				Ok(merged) => {
					if Rc::ptr_eq(&merged, &inner.props) {
						None
					} else {
						inner.props = merged.clone();
						inner.gate.pass(merged)
					}
				}
				Err(error) => {
					inner.errors.record(DeriveError::from(error));
					None
				}
			}
		};
		if let Some(props) = update {
			(self.update)(props);
		}
	}

	fn render_pass(&self, own: Option<Rc<Props>>) -> Result<Rc<Props>, SelectError> {
		let state = self.ctx.store().state();
		let (result, update) = {
			let mut inner = self.inner.borrow_mut();
			let own = match own {
				Some(own) => {
					inner.own = own.clone();
					own
				}
				None => inner.own.clone(),
			};
			match inner.pipeline.select(&state, &own) {
				Ok(merged) => {
					inner.errors.clear();
					let update = if Rc::ptr_eq(&merged, &inner.props) {
						None
					} else {
						inner.props = merged.clone();
						inner.gate.pass(merged.clone())
					};
					(Ok(merged), update)
				}
				Err(error) => {
					let select = inner.errors.correlate(DeriveError::from(error));
					(Err(select), None)
				}
			}
		};
		if let Some(props) = update {
			(self.update)(props);
		}
		result
	}
}

impl<S: 'static> Drop for ConnectedBody<S> {
	fn drop(&mut self) {
		self.ctx.remove_node(self.node);
	}
}
