use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tether::{Action, Listener, PropValue, Store, Unsubscribe};

/// Minimal synchronous store driven by a reducer. The state handle is
/// replaced only when the reducer returns a fresh one, so a dispatch
/// that changes nothing notifies nobody.
pub struct ReducerStore<S>
where
	S: 'static,
{
	state: RefCell<Rc<S>>,
	reducer: Box<dyn Fn(&Rc<S>, &Action) -> Rc<S>>,
	listeners: Rc<RefCell<Vec<(u64, Rc<dyn Fn()>)>>>,
	next: Cell<u64>,
}

impl<S: 'static> ReducerStore<S> {
	pub fn new(initial: S, reducer: impl Fn(&Rc<S>, &Action) -> Rc<S> + 'static) -> Rc<Self> {
		Rc::new(ReducerStore {
			state: RefCell::new(Rc::new(initial)),
			reducer: Box::new(reducer),
			listeners: Rc::new(RefCell::new(Vec::new())),
			next: Cell::new(0),
		})
	}

	pub fn listeners(&self) -> usize {
		self.listeners.borrow().len()
	}
}

impl<S: 'static> Store for ReducerStore<S> {
	type State = S;

	fn state(&self) -> Rc<S> {
		self.state.borrow().clone()
	}

	fn dispatch(&self, action: Action) -> Action {
		let current = self.state.borrow().clone();
		let next = (self.reducer)(&current, &action);
		if !Rc::ptr_eq(&current, &next) {
			*self.state.borrow_mut() = next;
			// snapshot so listeners may subscribe or unsubscribe mid-pass
			let snapshot: Vec<Rc<dyn Fn()>> = self
				.listeners
				.borrow()
				.iter()
				.map(|(_, listener)| listener.clone())
				.collect();
			for listener in snapshot {
				listener();
			}
		}
		action
	}

	fn subscribe(&self, listener: Listener) -> Unsubscribe {
		let id = self.next.get();
		self.next.set(id + 1);
		self.listeners.borrow_mut().push((id, Rc::from(listener)));
		let listeners = self.listeners.clone();
		Box::new(move || {
			listeners.borrow_mut().retain(|(other, _)| *other != id);
		})
	}
}

pub fn counter(initial: i64) -> Rc<ReducerStore<i64>> {
	ReducerStore::new(initial, |state, action| match action.kind() {
		"increment" => Rc::new(**state + 1),
		"decrement" => Rc::new(**state - 1),
		_ => state.clone(),
	})
}

#[derive(Debug)]
pub struct AppState {
	pub count: i64,
	pub label: Rc<str>,
}

pub fn app(label: &str) -> Rc<ReducerStore<AppState>> {
	ReducerStore::new(
		AppState { count: 0, label: Rc::from(label) },
		|state, action| match action.kind() {
			"increment" => Rc::new(AppState {
				count: state.count + 1,
				label: state.label.clone(),
			}),
			"rename" => match action.payload() {
				PropValue::Str(label) => Rc::new(AppState {
					count: state.count,
					label: label.clone(),
				}),
				_ => state.clone(),
			},
			_ => state.clone(),
		},
	)
}
