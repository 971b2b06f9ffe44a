use std::any::Any;

use derivative::Derivative;

use crate::error::CodecError;
use crate::value::Value;

/// Where a [`TypeDescriptor`] sits in its registration lifecycle. A stable id
/// can be reserved (so self-referential field types can name it before the
/// struct itself finishes registering) before it is fully initialized with
/// field accessors: a token valid before its backing row is parsed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DescriptorState {
	Reserved,
	Initialized,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
	Struct,
	Enum { variants: &'static [(&'static str, u64)] },
}

/// Type-erased accessor pair for one field, bridging a concrete Rust struct
/// field to the dynamic [`Value`] tree so the generic/reflective path can
/// read and write fields of any registered type without the caller naming it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FieldAccessor {
	#[derivative(Debug = "ignore")]
	pub get: Box<dyn Fn(&dyn Any) -> Value + Send + Sync>,
	#[derivative(Debug = "ignore")]
	pub set: Box<dyn Fn(&mut dyn Any, Value) -> Result<(), CodecError> + Send + Sync>,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct FieldDescriptor {
	pub name: &'static str,
	pub declared_type: &'static str,
	pub accessor: FieldAccessor,
}

/// Everything the generic path needs to know about a registered type:
/// its wire identity, its fields (for objects), and how to allocate a
/// fresh instance to fill in, field by field, from a [`Value`].
///
/// Pairs a column layout with closures that read typed values out of a
/// row; here the "row" is a [`crate::value::ObjectValue`].
#[derive(Derivative)]
#[derivative(Debug)]
pub struct TypeDescriptor {
	pub stable_id: u64,
	pub type_name: &'static str,
	pub kind: TypeKind,
	pub fields: Vec<FieldDescriptor>,
	#[derivative(Debug = "ignore")]
	pub construct_default: Box<dyn Fn() -> Box<dyn Any> + Send + Sync>,
	pub state: DescriptorState,
}

impl TypeDescriptor {
	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.fields.iter().find(|f| f.name == name)
	}

	/// Builds a [`Value::Object`] from a concrete instance by running every
	/// field accessor's `get` in declaration order.
	pub fn to_value(&self, instance: &dyn Any) -> Value {
		let mut object = crate::value::ObjectValue::new(self.stable_id);
		for field in &self.fields {
			object.set(field.name, (field.accessor.get)(instance));
		}
		Value::Object(std::rc::Rc::new(std::cell::RefCell::new(object)))
	}

	/// Fills a freshly constructed instance from an [`crate::value::ObjectValue`]'s
	/// fields, coercing each one through its field accessor's `set`.
	pub fn fill_from_object(
		&self,
		instance: &mut dyn Any,
		object: &crate::value::ObjectValue,
	) -> Result<(), CodecError> {
		for field in &self.fields {
			let value = object.get(field.name).cloned().unwrap_or(Value::Null);
			(field.accessor.set)(instance, value)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::ObjectValue;

	struct Widget {
		count: i32,
	}

	fn widget_descriptor() -> TypeDescriptor {
		TypeDescriptor {
			stable_id: 42,
			type_name: "Widget",
			kind: TypeKind::Struct,
			fields: vec![FieldDescriptor {
				name: "count",
				declared_type: "int",
				accessor: FieldAccessor {
					get: Box::new(|instance| {
						let widget = instance.downcast_ref::<Widget>().unwrap();
						Value::Int(widget.count)
					}),
					set: Box::new(|instance, value| {
						let widget = instance.downcast_mut::<Widget>().unwrap();
						widget.count = value.coerce_to_i32("int")?;
						Ok(())
					}),
				},
			}],
			construct_default: Box::new(|| Box::new(Widget { count: 0 })),
			state: DescriptorState::Initialized,
		}
	}

	#[test]
	fn round_trips_through_value() {
		let descriptor = widget_descriptor();
		let widget = Widget { count: 7 };
		let value = descriptor.to_value(&widget);
		let Value::Object(object) = value else { panic!("expected object") };
		assert_eq!(object.borrow().stable_id, 42);

		let mut rebuilt = (descriptor.construct_default)();
		descriptor.fill_from_object(rebuilt.as_mut(), &object.borrow()).unwrap();
		assert_eq!(rebuilt.downcast_ref::<Widget>().unwrap().count, 7);
	}

	#[test]
	fn missing_field_defaults_to_null_coercion_failure() {
		let descriptor = widget_descriptor();
		let mut rebuilt = (descriptor.construct_default)();
		let empty = ObjectValue::new(42);
		assert!(descriptor.fill_from_object(rebuilt.as_mut(), &empty).is_err());
	}
}
