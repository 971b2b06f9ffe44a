use std::any::Any;

use octet::descriptor::{DescriptorState, FieldAccessor, FieldDescriptor, TypeDescriptor, TypeKind};
use octet::{encode_dyn, encode_value, register_descriptor, CodecConfig, Decode, Encode, SerialContext, Value};

#[derive(Encode, Decode)]
#[octet(id = 40)]
struct Measurement {
	count: i32,
	label: String,
}

fn measurement_descriptor() -> TypeDescriptor {
	TypeDescriptor {
		stable_id: 40,
		type_name: "Measurement",
		kind: TypeKind::Struct,
		fields: vec![
			FieldDescriptor {
				name: "count",
				declared_type: "int",
				accessor: FieldAccessor {
					get: Box::new(|instance: &dyn Any| Value::Int(instance.downcast_ref::<Measurement>().unwrap().count)),
					set: Box::new(|instance: &mut dyn Any, value: Value| {
						instance.downcast_mut::<Measurement>().unwrap().count = value.coerce_to_i32("int")?;
						Ok(())
					}),
				},
			},
			FieldDescriptor {
				name: "label",
				declared_type: "string",
				accessor: FieldAccessor {
					get: Box::new(|instance: &dyn Any| {
						Value::Str(std::rc::Rc::from(instance.downcast_ref::<Measurement>().unwrap().label.as_str()))
					}),
					set: Box::new(|instance: &mut dyn Any, value: Value| {
						let label = value.as_str().ok_or(octet::CodecError::TypeMismatch {
							expected: "string",
							offset: 0,
						})?;
						instance.downcast_mut::<Measurement>().unwrap().label = label.to_owned();
						Ok(())
					}),
				},
			},
		],
		construct_default: Box::new(|| Box::new(Measurement { count: 0, label: String::new() })),
		state: DescriptorState::Initialized,
	}
}

#[test]
fn specialized_and_generic_encodings_agree_byte_for_byte() {
	register_descriptor::<Measurement>(measurement_descriptor()).unwrap();

	let instance = Measurement { count: 7, label: "widget".to_owned() };
	let specialized_bytes = encode_value(&instance).unwrap();

	let descriptor = measurement_descriptor();
	let value = descriptor.to_value(&instance);
	let mut ctx = SerialContext::new(CodecConfig::new());
	let mut generic_bytes = Vec::new();
	encode_dyn(&value, &mut ctx, &mut generic_bytes).unwrap();

	assert_eq!(specialized_bytes, generic_bytes);
}
