use std::fmt::Debug;
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::action::Dispatcher;

/// A single binding property. Primitives carry their value,
/// composite and callable variants carry a shared handle and
/// compare by identity.
#[derive(Clone)]
pub enum PropValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(Rc<str>),
	List(Rc<Vec<PropValue>>),
	Map(Rc<Props>),
	Func(Callback),
	Dispatch(Dispatcher),
}

impl PropValue {
	pub fn is_map(&self) -> bool {
		matches!(self, PropValue::Map(_))
	}

	pub fn as_map(&self) -> Option<&Rc<Props>> {
		match self {
			PropValue::Map(props) => Some(props),
			_ => None,
		}
	}
}

impl Debug for PropValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			PropValue::Null => f.write_str("Null"),
			PropValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
			PropValue::Int(value) => f.debug_tuple("Int").field(value).finish(),
			PropValue::Float(value) => f.debug_tuple("Float").field(value).finish(),
			PropValue::Str(value) => f.debug_tuple("Str").field(value).finish(),
			PropValue::List(value) => f.debug_tuple("List").field(value).finish(),
			PropValue::Map(value) => f.debug_tuple("Map").field(value).finish(),
			PropValue::Func(_) => f.write_str("Func"),
			PropValue::Dispatch(_) => f.write_str("Dispatch"),
		}
	}
}

/// An identity-bearing callback prop. Two callbacks are the same
/// prop only when they share the same handle.
#[derive(Clone)]
pub struct Callback {
	func: Rc<dyn Fn(&[PropValue]) -> PropValue>,
}

impl Callback {
	pub fn new(func: impl Fn(&[PropValue]) -> PropValue + 'static) -> Self {
		Callback {
			func: Rc::new(func),
		}
	}

	pub fn call(&self, args: &[PropValue]) -> PropValue {
		(self.func)(args)
	}

	pub fn same(&self, other: &Callback) -> bool {
		Rc::ptr_eq(&self.func, &other.func)
	}
}

/// The key-value mapping every pipeline stage produces and every
/// binding hands to its host. Values are cheap handles, so clones
/// copy one map level and never the data behind it.
#[derive(Clone, Default)]
pub struct Props {
	map: FxHashMap<Rc<str>, PropValue>,
}

impl Props {
	pub fn new() -> Self {
		Props {
			map: FxHashMap::default(),
		}
	}

	pub fn insert(&mut self, key: impl Into<Rc<str>>, value: impl Into<PropValue>) {
		self.map.insert(key.into(), value.into());
	}

	pub fn with(mut self, key: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
		self.insert(key, value);
		self
	}

	pub fn get(&self, key: &str) -> Option<&PropValue> {
		self.map.get(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.map.contains_key(key)
	}

	pub fn remove(&mut self, key: &str) -> Option<PropValue> {
		self.map.remove(key)
	}

	pub fn len(&self) -> usize {
		self.map.len()
	}

	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &PropValue)> {
		self.map.iter()
	}

	pub fn keys(&self) -> impl Iterator<Item = &Rc<str>> {
		self.map.keys()
	}

	/// Copies every entry of `other` over this mapping, overwriting
	/// on key collision. Entry handles are shared, not duplicated.
	pub fn extend_from(&mut self, other: &Props) {
		for (key, value) in &other.map {
			self.map.insert(key.clone(), value.clone());
		}
	}
}

impl Debug for Props {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_map()
			.entries(self.map.iter().map(|(key, value)| (&**key, value)))
			.finish()
	}
}

impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		PropValue::Bool(value)
	}
}

impl From<i64> for PropValue {
	fn from(value: i64) -> Self {
		PropValue::Int(value)
	}
}

impl From<i32> for PropValue {
	fn from(value: i32) -> Self {
		PropValue::Int(value as i64)
	}
}

impl From<f64> for PropValue {
	fn from(value: f64) -> Self {
		PropValue::Float(value)
	}
}

impl From<&str> for PropValue {
	fn from(value: &str) -> Self {
		PropValue::Str(Rc::from(value))
	}
}

impl From<String> for PropValue {
	fn from(value: String) -> Self {
		PropValue::Str(Rc::from(value.as_str()))
	}
}

impl From<Rc<str>> for PropValue {
	fn from(value: Rc<str>) -> Self {
		PropValue::Str(value)
	}
}

impl From<Vec<PropValue>> for PropValue {
	fn from(value: Vec<PropValue>) -> Self {
		PropValue::List(Rc::new(value))
	}
}

impl From<Props> for PropValue {
	fn from(value: Props) -> Self {
		PropValue::Map(Rc::new(value))
	}
}

impl From<Rc<Props>> for PropValue {
	fn from(value: Rc<Props>) -> Self {
		PropValue::Map(value)
	}
}

impl From<Callback> for PropValue {
	fn from(value: Callback) -> Self {
		PropValue::Func(value)
	}
}

impl From<Dispatcher> for PropValue {
	fn from(value: Dispatcher) -> Self {
		PropValue::Dispatch(value)
	}
}
