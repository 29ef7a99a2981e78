use std::fmt::Debug;
use std::rc::Rc;

use crate::props::{Callback, PropValue};

/// What gets dispatched into the store. The kind names the state
/// transition, the payload carries its arguments.
#[derive(Clone)]
pub struct Action {
	kind: Rc<str>,
	payload: PropValue,
}

impl Action {
	pub fn new(kind: impl Into<Rc<str>>) -> Self {
		Action {
			kind: kind.into(),
			payload: PropValue::Null,
		}
	}

	pub fn with_payload(kind: impl Into<Rc<str>>, payload: impl Into<PropValue>) -> Self {
		Action {
			kind: kind.into(),
			payload: payload.into(),
		}
	}

	pub fn kind(&self) -> &str {
		&self.kind
	}

	pub fn payload(&self) -> &PropValue {
		&self.payload
	}
}

impl Debug for Action {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Action")
			.field("kind", &self.kind)
			.field("payload", &self.payload)
			.finish()
	}
}

/// A pointer-stable handle over the store's dispatch. Every clone
/// shares the same handle, so pure-mode memoization can treat the
/// dispatcher itself as an unchanged input.
#[derive(Clone)]
pub struct Dispatcher {
	func: Rc<dyn Fn(Action) -> Action>,
}

impl Dispatcher {
	pub fn new(func: impl Fn(Action) -> Action + 'static) -> Self {
		Dispatcher {
			func: Rc::new(func),
		}
	}

	/// Sends the action into the store and echoes it back, possibly
	/// transformed by the store.
	pub fn dispatch(&self, action: Action) -> Action {
		(self.func)(action)
	}

	/// Wraps an action constructor into a callback prop. Calling the
	/// callback builds the action from its arguments and dispatches
	/// it. The callback yields `Null`.
	pub fn bound(&self, create: impl Fn(&[PropValue]) -> Action + 'static) -> Callback {
		let dispatcher = self.clone();
		Callback::new(move |args| {
			dispatcher.dispatch(create(args));
			PropValue::Null
		})
	}

	pub fn same(&self, other: &Dispatcher) -> bool {
		Rc::ptr_eq(&self.func, &other.func)
	}
}
