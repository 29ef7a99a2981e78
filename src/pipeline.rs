use std::rc::Rc;

use crate::action::Dispatcher;
use crate::equal::shallow_equal_props;
use crate::error::{ConfigError, Stage};
use crate::props::{PropValue, Props};

/// State-derivation stage. Whether it depends on own props is fixed
/// by the constructor, never inferred: the plain form recomputes on
/// store changes only, the `with_props` form also on local-property
/// changes.
pub struct MapState<S>
where
	S: 'static,
{
	func: Rc<dyn Fn(&S, &Props) -> PropValue>,
	uses_props: bool,
}

impl<S: 'static> Clone for MapState<S> {
	fn clone(&self) -> Self {
		MapState {
			func: self.func.clone(),
			uses_props: self.uses_props,
		}
	}
}

impl<S: 'static> MapState<S> {
	pub fn new(func: impl Fn(&S) -> Props + 'static) -> Self {
		MapState {
			func: Rc::new(move |state, _| PropValue::Map(Rc::new(func(state)))),
			uses_props: false,
		}
	}

	pub fn with_props(func: impl Fn(&S, &Props) -> Props + 'static) -> Self {
		MapState {
			func: Rc::new(move |state, own| PropValue::Map(Rc::new(func(state, own)))),
			uses_props: true,
		}
	}

	/// Escape hatch for stages that build their output dynamically.
	/// Anything other than a mapping fails the stage contract at the
	/// pipeline boundary.
	pub fn dynamic(func: impl Fn(&S, &Props) -> PropValue + 'static, uses_props: bool) -> Self {
		MapState {
			func: Rc::new(func),
			uses_props,
		}
	}

	pub(crate) fn empty() -> Self {
		MapState {
			func: Rc::new(|_, _| PropValue::Map(Rc::new(Props::new()))),
			uses_props: false,
		}
	}
}

/// Dispatch-derivation stage. The default exposes the dispatcher
/// under the `dispatch` key.
#[derive(Clone)]
pub struct MapDispatch {
	func: Rc<dyn Fn(&Dispatcher, &Props) -> PropValue>,
	uses_props: bool,
}

impl MapDispatch {
	pub fn new(func: impl Fn(&Dispatcher) -> Props + 'static) -> Self {
		MapDispatch {
			func: Rc::new(move |dispatcher, _| PropValue::Map(Rc::new(func(dispatcher)))),
			uses_props: false,
		}
	}

	pub fn with_props(func: impl Fn(&Dispatcher, &Props) -> Props + 'static) -> Self {
		MapDispatch {
			func: Rc::new(move |dispatcher, own| PropValue::Map(Rc::new(func(dispatcher, own)))),
			uses_props: true,
		}
	}

	pub fn dynamic(
		func: impl Fn(&Dispatcher, &Props) -> PropValue + 'static,
		uses_props: bool,
	) -> Self {
		MapDispatch {
			func: Rc::new(func),
			uses_props,
		}
	}
}

impl Default for MapDispatch {
	fn default() -> Self {
		MapDispatch::new(|dispatcher| {
			let mut props = Props::new();
			props.insert("dispatch", dispatcher.clone());
			props
		})
	}
}

/// Merge stage. The default shallow-merges with precedence
/// own < state < dispatch, later overriding earlier on collision.
#[derive(Clone)]
pub struct Merge {
	func: Rc<dyn Fn(&Props, &Props, &Props) -> PropValue>,
}

impl Merge {
	pub fn new(func: impl Fn(&Props, &Props, &Props) -> Props + 'static) -> Self {
		Merge {
			func: Rc::new(move |state_props, dispatch_props, own| {
				PropValue::Map(Rc::new(func(state_props, dispatch_props, own)))
			}),
		}
	}

	pub fn dynamic(func: impl Fn(&Props, &Props, &Props) -> PropValue + 'static) -> Self {
		Merge {
			func: Rc::new(func),
		}
	}
}

impl Default for Merge {
	fn default() -> Self {
		Merge::new(|state_props, dispatch_props, own| {
			let mut merged = own.clone();
			merged.extend_from(state_props);
			merged.extend_from(dispatch_props);
			merged
		})
	}
}

fn expect_props(stage: Stage, value: PropValue) -> Result<Rc<Props>, ConfigError> {
	match value {
		PropValue::Map(props) => Ok(props),
		other => Err(ConfigError::NotAMapping {
			stage,
			got: format!("{:?}", other),
		}),
	}
}

struct PureCache<S> {
	state: Rc<S>,
	own: Rc<Props>,
	state_props: Rc<Props>,
	dispatch_props: Rc<Props>,
	merged: Rc<Props>,
}

enum Memo<S> {
	Impure,
	Pure { cache: Option<PureCache<S>> },
}

pub type StateEqual<S> = Rc<dyn Fn(&Rc<S>, &Rc<S>) -> bool>;

/// The composed selector for one binding instance. Pure mode keeps
/// the last inputs and outputs and recomputes only stale stages; a
/// failed pass drops the cache, so the next call starts clean.
pub struct PropsPipeline<S>
where
	S: 'static,
{
	map_state: MapState<S>,
	map_dispatch: MapDispatch,
	merge: Merge,
	dispatcher: Dispatcher,
	state_equal: Option<StateEqual<S>>,
	memo: Memo<S>,
}

impl<S: 'static> PropsPipeline<S> {
	pub fn new(
		map_state: MapState<S>,
		map_dispatch: MapDispatch,
		merge: Merge,
		dispatcher: Dispatcher,
		pure: bool,
		state_equal: Option<StateEqual<S>>,
	) -> Self {
		PropsPipeline {
			map_state,
			map_dispatch,
			merge,
			dispatcher,
			state_equal,
			memo: if pure {
				Memo::Pure { cache: None }
			} else {
				Memo::Impure
			},
		}
	}

	pub fn is_pure(&self) -> bool {
		matches!(self.memo, Memo::Pure { .. })
	}

	/// Computes the merged props for the given state snapshot and
	/// own props. In pure mode the returned handle moves only when
	/// the merged content actually changed.
	pub fn select(&mut self, state: &Rc<S>, own: &Rc<Props>) -> Result<Rc<Props>, ConfigError> {
		let prev = match &mut self.memo {
			Memo::Impure => return self.compute_all(state, own),
			Memo::Pure { cache } => cache.take(),
		};

		let next = match prev {
			None => self.first_call(state, own)?,
			Some(prev) => self.next_call(state, own, prev)?,
		};

		let merged = next.merged.clone();
		if let Memo::Pure { cache } = &mut self.memo {
			*cache = Some(next);
		}
		Ok(merged)
	}

	fn state_same(&self, a: &Rc<S>, b: &Rc<S>) -> bool {
		match &self.state_equal {
			Some(equal) => equal(a, b),
			None => Rc::ptr_eq(a, b),
		}
	}

	fn run_state(&self, state: &Rc<S>, own: &Props) -> Result<Rc<Props>, ConfigError> {
		expect_props(Stage::StateProps, (self.map_state.func)(state, own))
	}

	fn run_dispatch(&self, own: &Props) -> Result<Rc<Props>, ConfigError> {
		expect_props(
			Stage::DispatchProps,
			(self.map_dispatch.func)(&self.dispatcher, own),
		)
	}

	fn run_merge(
		&self,
		state_props: &Props,
		dispatch_props: &Props,
		own: &Props,
	) -> Result<Rc<Props>, ConfigError> {
		expect_props(Stage::Merge, (self.merge.func)(state_props, dispatch_props, own))
	}

	fn compute_all(&self, state: &Rc<S>, own: &Rc<Props>) -> Result<Rc<Props>, ConfigError> {
		let state_props = self.run_state(state, own)?;
		let dispatch_props = self.run_dispatch(own)?;
		self.run_merge(&state_props, &dispatch_props, own)
	}

	fn first_call(&self, state: &Rc<S>, own: &Rc<Props>) -> Result<PureCache<S>, ConfigError> {
		let state_props = self.run_state(state, own)?;
		let dispatch_props = self.run_dispatch(own)?;
		let merged = self.run_merge(&state_props, &dispatch_props, own)?;
		Ok(PureCache {
			state: state.clone(),
			own: own.clone(),
			state_props,
			dispatch_props,
			merged,
		})
	}

	fn next_call(
		&self,
		state: &Rc<S>,
		own: &Rc<Props>,
		prev: PureCache<S>,
	) -> Result<PureCache<S>, ConfigError> {
		let own_equal = shallow_equal_props(own, &prev.own);
		let state_same = self.state_same(state, &prev.state);

		// own-props stage: keep the previous handle for equal input
		let own = if own_equal { prev.own.clone() } else { own.clone() };

		if state_same && own_equal {
			return Ok(PureCache {
				state: state.clone(),
				own,
				..prev
			});
		}

		let state_props = if !state_same || (!own_equal && self.map_state.uses_props) {
			stabilize(self.run_state(state, &own)?, &prev.state_props)
		} else {
			prev.state_props.clone()
		};

		let dispatch_props = if !own_equal && self.map_dispatch.uses_props {
			stabilize(self.run_dispatch(&own)?, &prev.dispatch_props)
		} else {
			prev.dispatch_props.clone()
		};

		// merge reruns only when an input handle moved
		let inputs_moved = !Rc::ptr_eq(&state_props, &prev.state_props)
			|| !Rc::ptr_eq(&dispatch_props, &prev.dispatch_props)
			|| !Rc::ptr_eq(&own, &prev.own);

		let merged = if inputs_moved {
			stabilize(
				self.run_merge(&state_props, &dispatch_props, &own)?,
				&prev.merged,
			)
		} else {
			prev.merged.clone()
		};

		Ok(PureCache {
			state: state.clone(),
			own,
			state_props,
			dispatch_props,
			merged,
		})
	}
}

/// Keeps the previous handle alive when a recomputed mapping turned
/// out shallow-equal, so downstream reference checks stay stable.
fn stabilize(next: Rc<Props>, prev: &Rc<Props>) -> Rc<Props> {
	if shallow_equal_props(&next, prev) {
		prev.clone()
	} else {
		next
	}
}

/// The last gate before props reach the host. Pure mode withholds
/// the enhance step while the output stays shallow-equal to what the
/// host already has; impure mode always lets it through.
pub struct EnhanceGate {
	pure: bool,
	last: Option<Rc<Props>>,
}

impl EnhanceGate {
	pub fn new(pure: bool) -> Self {
		EnhanceGate { pure, last: None }
	}

	pub fn pass(&mut self, next: Rc<Props>) -> Option<Rc<Props>> {
		if self.pure {
			if let Some(last) = &self.last {
				if Rc::ptr_eq(last, &next) || shallow_equal_props(last, &next) {
					return None;
				}
			}
		}
		self.last = Some(next.clone());
		Some(next)
	}

	pub fn last(&self) -> Option<&Rc<Props>> {
		self.last.as_ref()
	}
}
