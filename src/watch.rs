use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::context::Context;
use crate::correlate::ErrorBuffer;
use crate::equal::{identical, shallow_equal};
use crate::error::{ConfigError, DeriveError, SelectError};
use crate::props::PropValue;
use crate::subscription::NodeId;

pub type Selector<S> = Rc<dyn Fn(&S) -> Result<PropValue, DeriveError>>;

/// How the direct flavor decides "did the selected value change".
#[derive(Clone)]
pub enum Equality {
	Shallow,
	Identity,
	Custom(Rc<dyn Fn(&PropValue, &PropValue) -> bool>),
}

impl Equality {
	fn eval(&self, a: &PropValue, b: &PropValue) -> bool {
		match self {
			Equality::Shallow => shallow_equal(a, b),
			Equality::Identity => identical(a, b),
			Equality::Custom(func) => func(a, b),
		}
	}
}

pub struct WatchOptions {
	pub equality: Equality,
}

impl Default for WatchOptions {
	fn default() -> Self {
		WatchOptions {
			equality: Equality::Shallow,
		}
	}
}

/// Entry point for the direct flavor: one selector, no merge
/// pipeline, a two-phase render/commit protocol per update cycle.
#[derive(Default)]
pub struct Watch {
	options: WatchOptions,
}

impl Watch {
	pub fn new() -> Self {
		Watch {
			options: WatchOptions::default(),
		}
	}

	pub fn options(mut self, options: WatchOptions) -> Self {
		self.options = options;
		self
	}

	pub fn bind<S: 'static>(
		&self,
		ctx: Option<&Context<S>>,
		on_change: Rc<dyn Fn()>,
	) -> Result<Watcher<S>, ConfigError> {
		let ctx = ctx.ok_or(ConfigError::NoStore)?.clone();
		let node = ctx.create_node();

		let watcher = Watcher {
			body: Rc::new_cyclic(|this| WatcherBody {
				ctx,
				node,
				on_change,
				inner: RefCell::new(WatcherInner {
					selector: None,
					last: None,
					equality: self.options.equality.clone(),
					errors: ErrorBuffer::new(),
					this: this.clone(),
				}),
			}),
		};

		let weak = watcher.body.inner.borrow().this.clone();
		watcher.body.ctx.set_notify(
			node,
			Rc::new(move || {
				if let Some(body) = weak.upgrade() {
					body.recheck();
				}
			}),
		);

		Ok(watcher)
	}
}

/// One bound selector instance. The node is created at bind time and
/// reused across re-renders; only the active selector reference is
/// swapped. When the context identity changes the host drops the
/// watcher and binds a new one.
pub struct Watcher<S>
where
	S: 'static,
{
	body: Rc<WatcherBody<S>>,
}

impl<S: 'static> Clone for Watcher<S> {
	fn clone(&self) -> Self {
		Watcher {
			body: self.body.clone(),
		}
	}
}

struct WatcherBody<S>
where
	S: 'static,
{
	ctx: Context<S>,
	node: NodeId,
	on_change: Rc<dyn Fn()>,
	inner: RefCell<WatcherInner<S>>,
}

struct WatcherInner<S>
where
	S: 'static,
{
	selector: Option<Selector<S>>,
	last: Option<PropValue>,
	equality: Equality,
	errors: ErrorBuffer,
	this: Weak<WatcherBody<S>>,
}

impl<S: 'static> Watcher<S> {
	/// Phase one, run during the host's render pass. Swaps in the
	/// selector and computes against current state. A failure comes
	/// back correlated with any buffered background failure; a
	/// success clears the buffer.
	pub fn render(&self, selector: Selector<S>) -> Result<PropValue, SelectError> {
		let state = self.body.ctx.store().state();

		self.body.inner.borrow_mut().selector = Some(selector.clone());

		// user code runs with the borrow released
		let result = selector(&state);

		let mut inner = self.body.inner.borrow_mut();
		match result {
			Ok(value) => {
				inner.errors.clear();
				inner.last = Some(value.clone());
				Ok(value)
			}
			Err(error) => Err(inner.errors.correlate(error)),
		}
	}

	/// Phase two, run after the host commits. Installs the listener
	/// (idempotent) and immediately re-checks against current state,
	/// so a dispatch that slipped in between the phases triggers a
	/// render instead of being lost.
	pub fn commit(&self) {
		self.body.ctx.subscribe_node(self.body.node);
		self.body.recheck();
	}

	pub fn last(&self) -> Option<PropValue> {
		self.body.inner.borrow().last.clone()
	}

	pub fn context(&self) -> &Context<S> {
		&self.body.ctx
	}

	/// Tears the subscription down and frees the node. Idempotent,
	/// also runs on drop.
	pub fn unmount(&self) {
		self.body.ctx.remove_node(self.body.node);
	}
}

impl<S: 'static> WatcherBody<S> {
	/// Runs the latest selector against current state and triggers
	/// the host on change. A failure lands in the error buffer and
	/// still triggers, so the next render pass re-runs the selector
	/// and either recovers or surfaces it with correlation.
	fn recheck(&self) {
		let state = self.ctx.store().state();
		let (selector, last, equality) = {
			let inner = self.inner.borrow();
			match &inner.selector {
				Some(selector) => (selector.clone(), inner.last.clone(), inner.equality.clone()),
				None => return,
			}
		};

		match selector(&state) {
			Ok(value) => {
				let changed = match &last {
					Some(last) => !equality.eval(last, &value),
					None => true,
				};
				if changed {
					self.inner.borrow_mut().last = Some(value);
					(self.on_change)();
				}
			}
			Err(error) => {
				self.inner.borrow_mut().errors.record(error);
				(self.on_change)();
			}
		}
	}
}

impl<S: 'static> Drop for WatcherBody<S> {
	fn drop(&mut self) {
		self.ctx.remove_node(self.node);
	}
}
