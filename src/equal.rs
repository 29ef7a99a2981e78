use std::rc::Rc;

use crate::props::{PropValue, Props};

/// Identity equality between two prop values. Primitives compare by
/// value, floats by bit pattern with all NaNs considered the same
/// value, composite and callable props by handle.
pub fn identical(a: &PropValue, b: &PropValue) -> bool {
	match (a, b) {
		(PropValue::Null, PropValue::Null) => true,
		(PropValue::Bool(a), PropValue::Bool(b)) => a == b,
		(PropValue::Int(a), PropValue::Int(b)) => a == b,
		(PropValue::Float(a), PropValue::Float(b)) => {
			(a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
		}
		(PropValue::Str(a), PropValue::Str(b)) => Rc::ptr_eq(a, b) || a == b,
		(PropValue::List(a), PropValue::List(b)) => Rc::ptr_eq(a, b),
		(PropValue::Map(a), PropValue::Map(b)) => Rc::ptr_eq(a, b),
		(PropValue::Func(a), PropValue::Func(b)) => a.same(b),
		(PropValue::Dispatch(a), PropValue::Dispatch(b)) => a.same(b),
		_ => false,
	}
}

/// One level deep: identical values, or two mappings with the same
/// key set and identical values per key. Never recurses, so the cost
/// is bounded by the breadth of one mapping.
pub fn shallow_equal(a: &PropValue, b: &PropValue) -> bool {
	if identical(a, b) {
		return true;
	}

	match (a, b) {
		(PropValue::Map(a), PropValue::Map(b)) => shallow_equal_props(a, b),
		_ => false,
	}
}

pub fn shallow_equal_props(a: &Props, b: &Props) -> bool {
	if std::ptr::eq(a, b) {
		return true;
	}

	if a.len() != b.len() {
		return false;
	}

	a.iter().all(|(key, value)| match b.get(key) {
		Some(other) => identical(value, other),
		None => false,
	})
}
