//! Integration tests for value coercion across declared types

use tracing_subscriber::EnvFilter;

use moose_core::{
    coerce, record, ArrayClass, ClassBuilder, Enum, MapClass, MooseError, PropertySpec, Type,
    Value,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_record_coerces_into_instance() {
    init_tracing();
    let point = ClassBuilder::new("Point")
        .has("x", PropertySpec::rw(Type::Number).required())
        .has("y", PropertySpec::rw(Type::Number).required())
        .build()
        .unwrap();
    let ty = Type::from(&point);

    let value = coerce(&ty, record! { "x" => "1", "y" => 2 }.into()).unwrap();
    let instance = value.as_object().unwrap();
    assert!(instance.class().ptr_eq(&point));
    assert_eq!(instance.get("x").unwrap(), Value::Number(1.0));

    let err = coerce(&ty, Value::from("origin")).unwrap_err();
    assert_eq!(err.to_string(), "Cannot convert String to Point");
}

#[test]
fn test_conforming_values_keep_identity() {
    init_tracing();
    let animal = ClassBuilder::new("Animal").build().unwrap();
    let dog = ClassBuilder::new("Dog").extends(&animal).build().unwrap();
    let rex = dog.construct(Value::Undefined).unwrap();

    let kept = coerce(&Type::from(&animal), Value::Object(rex.clone())).unwrap();
    assert!(kept.as_object().unwrap().ptr_eq(&rex));

    let numbers = ArrayClass::of(Type::Number).unwrap();
    let array = numbers.from_values([1, 2]).unwrap();
    let kept = coerce(&Type::from(numbers), Value::Array(array.clone())).unwrap();
    assert!(kept.as_array().unwrap().ptr_eq(&array));
}

#[test]
fn test_unrelated_instance_is_copied() {
    init_tracing();
    let named = ClassBuilder::new("Named")
        .has("name", PropertySpec::rw(Type::String))
        .build()
        .unwrap();
    let label = ClassBuilder::new("Label")
        .has("name", PropertySpec::rw(Type::String))
        .build()
        .unwrap();

    let original = named.new_instance(record! { "name" => "box" }).unwrap();
    let copied = coerce(&Type::from(&label), Value::Object(original.clone())).unwrap();
    let copied = copied.as_object().unwrap();
    assert!(copied.class().ptr_eq(&label));
    assert_eq!(copied.get("name").unwrap(), Value::from("box"));

    copied.set("name", "crate").unwrap();
    assert_eq!(original.get("name").unwrap(), Value::from("box"));
}

#[test]
fn test_idempotent_across_declared_types() {
    init_tracing();
    let point = ClassBuilder::new("Point")
        .has("x", PropertySpec::rw(Type::Number))
        .build()
        .unwrap();
    let cases = [
        (Type::from(ArrayClass::of(Type::String).unwrap()), Value::list([1, 2])),
        (
            Type::from(MapClass::of(Type::String, Type::Date)),
            record! { "launch" => "1969-07-20" }.into(),
        ),
        (Type::from(&point), record! { "x" => "3" }.into()),
        (Type::from(Enum::of(["a", "b"])), Value::from("a")),
    ];

    for (ty, input) in cases {
        let once = coerce(&ty, input).unwrap();
        let twice = coerce(&ty, once.clone()).unwrap();
        assert_eq!(once, twice, "coercing to {} twice", ty.name());
    }
}

#[test]
fn test_absent_values_never_coerce() {
    init_tracing();
    for ty in [Type::Any, Type::Boolean, Type::String, Type::Number] {
        assert!(matches!(
            coerce(&ty, Value::Null),
            Err(MooseError::UndefinedValue)
        ));
    }
}

#[test]
fn test_number_and_date_interplay() {
    init_tracing();
    let date = coerce(&Type::Date, Value::from(86_400_000)).unwrap();
    let back = coerce(&Type::Number, date).unwrap();
    assert_eq!(back, Value::Number(86_400_000.0));

    let err = coerce(&Type::Date, Value::from(true)).unwrap_err();
    assert_eq!(err.to_string(), "Boolean cannot be converted to a date");
}
