//! Integration tests for class declaration, construction and mutation

use moose_core::{
    coerce, record, Class, ClassBuilder, Function, MooseError, PropertySpec, Type, TypeSpec, Value,
};

fn mammal() -> Class {
    ClassBuilder::new("Mammal")
        .has("name", PropertySpec::rw(Type::String).required())
        .has("limbs", PropertySpec::rw(Type::Number).required().default_value(4))
        .build()
        .unwrap()
}

struct Zoo {
    doggo: Class,
    person: Class,
}

fn zoo() -> Zoo {
    let mammal = mammal();
    let doggo = ClassBuilder::new("Doggo")
        .extends(&mammal)
        .final_class()
        .build()
        .unwrap();
    let cat = ClassBuilder::new("Cat")
        .extends(&mammal)
        .final_class()
        .build()
        .unwrap();
    let person = ClassBuilder::new("Person")
        .extends(&mammal)
        .final_class()
        .has("alive", PropertySpec::rw(Type::Boolean).required().default_value(true))
        .has(
            "dob",
            PropertySpec::ro(Type::Date)
                .required()
                .default_with(|| Value::Date(chrono::Utc::now())),
        )
        .has(
            "dogs",
            PropertySpec::rw(TypeSpec::array_of(&doggo))
                .required()
                .default_with(|| Value::List(vec![])),
        )
        .has(
            "cats",
            PropertySpec::rw(TypeSpec::array_of(&cat))
                .required()
                .default_with(|| Value::List(vec![])),
        )
        .build()
        .unwrap();
    Zoo { doggo, person }
}

#[test]
fn test_property_types() {
    let zoo = zoo();
    let byron = zoo
        .person
        .new_instance(record! {
            "name" => "Byron",
            "dob" => "1991-02-20",
            "dogs" => vec![Value::from(record! { "name" => "Marley" })],
            "cats" => vec![Value::from(record! { "name" => "Titus" })],
        })
        .unwrap();

    assert_eq!(byron.get("limbs").unwrap(), Value::Number(4.0));

    let dogs = byron.get("dogs").unwrap();
    let first = dogs.as_array().unwrap().get(0).unwrap();
    assert!(first.as_object().unwrap().class().ptr_eq(&zoo.doggo));

    byron.set("alive", false).unwrap();
    assert_eq!(byron.get("alive").unwrap(), Value::Bool(false));

    let name = byron.get("name").unwrap().to_string();
    byron.set("name", format!("{} Murgatroyd", name)).unwrap();
    assert_eq!(byron.get("name").unwrap(), Value::from("Byron Murgatroyd"));
}

#[test]
fn test_invalid_operations() {
    let zoo = zoo();
    let testina = zoo
        .person
        .new_instance(record! { "name" => "Testina", "dob" => "1987-06-28" })
        .unwrap();

    let dogs = testina.get("dogs").unwrap();
    let err = dogs
        .as_array()
        .unwrap()
        .push(record! { "name" => "Mable", "type" => "rabbit" })
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown parameter \"type\" passed to \"Doggo\"");
    assert!(dogs.as_array().unwrap().is_empty());

    let err = testina.set("cuteness", 10).unwrap_err();
    assert_eq!(err.to_string(), "No such property \"cuteness\" of \"Person\"");

    let err = testina.set("name", Value::Undefined).unwrap_err();
    assert_eq!(err.to_string(), "Property \"name\" of \"Person\" required");
    assert_eq!(testina.get("name").unwrap(), Value::from("Testina"));

    let err = testina.delete("name").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot delete required property \"name\" of class \"Person\""
    );

    let err = testina.set("dob", "2000-01-01").unwrap_err();
    assert_eq!(err.to_string(), "Property \"dob\" of \"Person\" is read only");
}

#[test]
fn test_closed_class_rejects_unknown_reads_and_params() {
    let zoo = zoo();
    let err = zoo
        .person
        .new_instance(record! { "name" => "Byron", "wings" => 2 })
        .unwrap_err();
    assert!(matches!(err, MooseError::UnknownParameter { .. }));
    assert_eq!(err.to_string(), "Unknown parameter \"wings\" passed to \"Person\"");

    let byron = zoo.person.new_instance(record! { "name" => "Byron" }).unwrap();
    assert!(matches!(
        byron.get("wings"),
        Err(MooseError::UnknownProperty { .. })
    ));
}

#[test]
fn test_open_class_accepts_anything() {
    let mammal = mammal();
    let rex = mammal
        .new_instance(record! { "name" => "Rex", "tail" => true })
        .unwrap();
    assert_eq!(rex.get("tail").unwrap(), Value::Bool(true));
    rex.set("spots", 12).unwrap();
    assert_eq!(rex.get("spots").unwrap(), Value::Number(12.0));
}

#[test]
fn test_defaults() {
    let foo = ClassBuilder::new("Foo")
        .final_class()
        .has("literal", PropertySpec::ro(Type::Number).required().default_value(7))
        .has(
            "resultant",
            PropertySpec::ro(Type::Number)
                .required()
                .default_with(|| Value::from(13)),
        )
        .has(
            "pimpl",
            PropertySpec::ro(Type::Function)
                .required()
                .default_with(|| Value::from(Function::new(|_| Ok(Value::from(11))))),
        )
        .build()
        .unwrap();

    let foo = foo.construct(Value::Undefined).unwrap();
    assert_eq!(foo.get("literal").unwrap(), Value::Number(7.0));
    assert_eq!(foo.get("resultant").unwrap(), Value::Number(13.0));

    let pimpl = foo.get("pimpl").unwrap();
    let result = pimpl.as_function().unwrap().call(Value::Undefined).unwrap();
    assert_eq!(result, Value::Number(11.0));
}

#[test]
fn test_producer_defaults_are_not_shared() {
    let zoo = zoo();
    let a = zoo.person.new_instance(record! { "name" => "A" }).unwrap();
    let b = zoo.person.new_instance(record! { "name" => "B" }).unwrap();

    let a_dogs = a.get("dogs").unwrap();
    a_dogs.as_array().unwrap().push(record! { "name" => "Rex" }).unwrap();

    assert_eq!(a_dogs.as_array().unwrap().len(), 1);
    assert!(b.get("dogs").unwrap().as_array().unwrap().is_empty());
}

#[test]
fn test_reference_values_are_shared_not_copied() {
    let zoo = zoo();
    let marley = zoo.doggo.new_instance(record! { "name" => "Marley" }).unwrap();
    let owner = zoo
        .person
        .new_instance(record! { "name" => "Byron", "dogs" => vec![Value::from(marley.clone())] })
        .unwrap();

    let dogs = owner.get("dogs").unwrap();
    let stored = dogs.as_array().unwrap().get(0).unwrap();
    assert!(stored.as_object().unwrap().ptr_eq(&marley));

    marley.set("name", "Bob Marley").unwrap();
    assert_eq!(
        stored.as_object().unwrap().get("name").unwrap(),
        Value::from("Bob Marley")
    );
}

#[test]
fn test_copy_construction_from_instance() {
    let zoo = zoo();
    let byron = zoo
        .person
        .new_instance(record! { "name" => "Byron", "limbs" => 3, "dob" => "1991-02-20" })
        .unwrap();
    let copy = zoo.person.construct(Value::Object(byron.clone())).unwrap();
    assert!(!copy.ptr_eq(&byron));
    assert_eq!(copy, byron);

    // Coercion keeps an instance of the target class as is
    let coerced = coerce(&Type::from(&zoo.person), Value::Object(byron.clone())).unwrap();
    assert!(coerced.as_object().unwrap().ptr_eq(&byron));

    let rex = mammal().construct(Value::Object(byron)).unwrap();
    assert_eq!(rex.get("limbs").unwrap(), Value::Number(3.0));
    assert_eq!(rex.get("name").unwrap(), Value::from("Byron"));
}

#[test]
fn test_coercion_on_write() {
    let mammal = mammal();
    let rex = mammal.new_instance(record! { "name" => 42 }).unwrap();
    assert_eq!(rex.get("name").unwrap(), Value::from("42"));

    rex.set("limbs", "3").unwrap();
    assert_eq!(rex.get("limbs").unwrap(), Value::Number(3.0));

    let err = rex.set("limbs", "many").unwrap_err();
    assert_eq!(err.to_string(), "String cannot be converted to a number");
    assert_eq!(rex.get("limbs").unwrap(), Value::Number(3.0));
}

#[test]
fn test_missing_accessor_fails_at_declaration() {
    let err = ClassBuilder::new("Broken")
        .has("x", PropertySpec::new().isa(Type::Number))
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "No accessor defined for x, use ReadOnly or ReadWrite"
    );
}
