pub mod macros;

mod action;
mod connect;
mod context;
mod correlate;
mod equal;
mod error;
mod pipeline;
mod props;
mod subscription;
mod watch;

use std::rc::Rc;

pub use action::{Action, Dispatcher};
pub use connect::{Connect, ConnectOptions, Connected};
pub use context::{Context, Provider};
pub use correlate::ErrorBuffer;
pub use equal::{identical, shallow_equal, shallow_equal_props};
pub use error::{ConfigError, DeriveError, SelectError, Stage};
pub use pipeline::{EnhanceGate, MapDispatch, MapState, Merge, PropsPipeline, StateEqual};
pub use props::{Callback, PropValue, Props};
pub use subscription::{ListenerId, NodeId, SubscriptionGraph, Upstream};
pub use watch::{Equality, Selector, Watch, WatchOptions, Watcher};

pub type Listener = Box<dyn Fn()>;
pub type Unsubscribe = Box<dyn FnOnce()>;

/// The external state container a binding tree attaches to. The
/// crate only reads and listens; all mutation goes through the
/// store's own dispatch.
pub trait Store {
	type State;

	/// Current state snapshot. Implementations keep returning the
	/// same handle until the state actually changes, the handle is
	/// the change signal.
	fn state(&self) -> Rc<Self::State>;

	/// Runs the state transition and echoes the action back,
	/// possibly transformed. May notify listeners synchronously
	/// before returning.
	fn dispatch(&self, action: Action) -> Action;

	/// Registers a change listener. Must not invoke it inline.
	fn subscribe(&self, listener: Listener) -> Unsubscribe;
}
