#[macro_use]
extern crate pretty_assertions;

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::time::Duration;

use trellis::prelude::*;
use trellis_graphql::prelude::*;

fn runner(schema: &str, root: impl Resolver + 'static) -> GraphQlRunner {
    let schema = Schema::parse(schema, "test").expect("Test schema invalid");
    GraphQlRunner::new(&trellis::log::discard(), Arc::new(schema), Arc::new(root))
}

async fn execute(runner: &GraphQlRunner, query: &str) -> QueryResult {
    let query = Query::parse(query, None).expect("Test query invalid");
    runner.run_query(query).await
}

fn execution_errors(result: &QueryResult) -> Vec<&QueryExecutionError> {
    result
        .errors
        .iter()
        .filter_map(|e| e.execution_error())
        .collect()
}

fn path(segments: &[&str]) -> Vec<PathSegment> {
    segments
        .iter()
        .map(|segment| match segment.parse::<usize>() {
            Ok(index) => PathSegment::Index(index),
            Err(_) => PathSegment::Field(segment.to_string()),
        })
        .collect()
}

struct User {
    id: &'static str,
    name: &'static str,
    friends: Vec<User>,
}

impl User {
    fn new(id: &'static str, name: &'static str) -> Self {
        User {
            id,
            name,
            friends: vec![],
        }
    }
}

impl Object for User {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<User> = Bindings::new("User")
                .field("ID", |user: &User| user.id)
                .field("Name", |user: &User| user.name)
                .field("Friends", |user: &User| {
                    Resolved::list(user.friends.iter().map(|friend| {
                        Resolved::object(User {
                            id: friend.id,
                            name: friend.name,
                            friends: vec![],
                        })
                    }))
                });
        }
        &BINDINGS
    }
}

struct HeroRoot;

impl Object for HeroRoot {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<HeroRoot> =
                Bindings::new("Query").field("Hero", |_: &HeroRoot| {
                    Resolved::object(User {
                        id: "2001",
                        name: "R2-D2",
                        friends: vec![
                            User::new("1000", "Luke Skywalker"),
                            User::new("1002", "Han Solo"),
                            User::new("1003", "Leia Organa"),
                        ],
                    })
                });
        }
        &BINDINGS
    }
}

const HERO_SCHEMA: &str = "
    type Query {
        hero: User
    }

    type User {
        id: String
        name: String
        friends: [User]
    }
";

#[tokio::test]
async fn hello_world() {
    let runner = runner(
        "type Query { hello: String }",
        DynamicObject::new("Query").with_value("hello", "Hello world!"),
    );

    let result = execute(&runner, "{ hello }").await;
    assert_eq!(
        result.to_json().unwrap(),
        r#"{"data":{"hello":"Hello world!"}}"#
    );
}

#[tokio::test]
async fn nested_objects_and_lists() {
    let runner = runner(HERO_SCHEMA, HeroRoot);

    let result = execute(&runner, "{ hero { id name friends { name } } }").await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! {
            hero: object! {
                id: "2001",
                name: "R2-D2",
                friends: vec![
                    object! { name: "Luke Skywalker" },
                    object! { name: "Han Solo" },
                    object! { name: "Leia Organa" },
                ],
            },
        })
    );
}

#[tokio::test]
async fn result_keys_follow_request_order() {
    let runner = runner(HERO_SCHEMA, HeroRoot);

    let result = execute(&runner, "{ hero { name id } }").await;
    assert_eq!(
        result.to_json().unwrap(),
        r#"{"data":{"hero":{"name":"R2-D2","id":"2001"}}}"#
    );
}

#[tokio::test]
async fn capabilities_bind_case_insensitively() {
    let runner = runner(
        "type Query { primaryFunction: String }",
        DynamicObject::new("Query").with_value("PRIMARYFUNCTION", "Astromech"),
    );

    let result = execute(&runner, "{ primaryFunction }").await;
    assert_eq!(
        result.data,
        Some(object! { primaryFunction: "Astromech" })
    );
}

#[tokio::test]
async fn binding_errors_are_field_errors() {
    let runner = runner(
        "type Query { name: String id: ID missing: String }",
        DynamicObject::new("Query")
            .with_value("name", "R2-D2")
            .with_value("ID", "2001")
            .with_value("id", "2001"),
    );

    let result = execute(&runner, "{ name id missing }").await;
    assert_eq!(
        result.data,
        Some(object! { name: "R2-D2", id: r::Value::Null, missing: r::Value::Null })
    );

    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.errors[0].path(), Some(path(&["id"]).as_slice()));
    match result.errors[0].execution_error() {
        Some(QueryExecutionError::AmbiguousBinding(_, type_name, field, names)) => {
            assert_eq!(type_name, "Query");
            assert_eq!(field, "id");
            assert_eq!(names, &vec!["ID".to_string(), "id".to_string()]);
        }
        e => panic!("unexpected error: {:?}", e),
    }
    assert!(matches!(
        result.errors[1].execution_error(),
        Some(QueryExecutionError::UnboundField(_, _, field)) if field == "missing"
    ));
}

#[tokio::test]
async fn failing_capability_only_nulls_its_field() {
    let runner = runner(
        "type Query { a: String b: String c: String }",
        DynamicObject::new("Query")
            .with_value("a", "A")
            .with_field("b", |_| Err(anyhow!("the b store is offline")))
            .with_value("c", "C"),
    );

    let result = execute(&runner, "{ a b c }").await;
    assert_eq!(
        result.data,
        Some(object! { a: "A", b: r::Value::Null, c: "C" })
    );
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path(), Some(path(&["b"]).as_slice()));
    match result.errors[0].execution_error() {
        Some(QueryExecutionError::ResolveError(_, field, message)) => {
            assert_eq!(field, "b");
            assert_eq!(message, "the b store is offline");
        }
        e => panic!("unexpected error: {:?}", e),
    }
}

fn greeter() -> DynamicObject {
    DynamicObject::new("Query")
        .with_field("greet", |args| {
            let name: String = args.get_required("name")?;
            let times: Option<i32> = args.get_optional("times")?;
            Ok(format!("Hello {}{}", name, "!".repeat(times.unwrap_or(1) as usize)).into())
        })
        .with_field("echo", |args| Ok(args.get_required::<String>("text")?.into()))
}

const GREETER_SCHEMA: &str = "
    type Query {
        greet(name: String = \"world\", times: Int): String
        echo(text: String!): String
    }
";

#[tokio::test]
async fn arguments_are_coerced_with_defaults() {
    let runner = runner(GREETER_SCHEMA, greeter());

    let result = execute(
        &runner,
        "{ plain: greet loud: greet(name: \"Leia\", times: 3) }",
    )
    .await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! { plain: "Hello world!", loud: "Hello Leia!!!" })
    );
}

#[tokio::test]
async fn argument_errors_are_field_errors() {
    let runner = runner(GREETER_SCHEMA, greeter());

    let result = execute(&runner, "{ greet(times: \"many\") echo plain: greet }").await;
    assert_eq!(
        result.data,
        Some(object! { greet: r::Value::Null, echo: r::Value::Null, plain: "Hello world!" })
    );

    let errors = execution_errors(&result);
    assert_eq!(errors.len(), 2);
    assert!(matches!(
        errors[0],
        QueryExecutionError::InvalidArgumentError(_, name, _) if name == "times"
    ));
    assert!(matches!(
        errors[1],
        QueryExecutionError::MissingArgumentError(_, name) if name == "text"
    ));
}

#[tokio::test]
async fn variables_supply_arguments() {
    let runner = runner(GREETER_SCHEMA, greeter());

    let mut variables = HashMap::new();
    variables.insert("name".to_string(), r::Value::String("Han".to_string()));
    let query = Query::parse(
        "query Greeting($name: String, $text: String = \"default\") { greet(name: $name) echo(text: $text) }",
        Some(QueryVariables::new(variables)),
    )
    .unwrap();

    let result = runner.run_query(query).await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! { greet: "Hello Han!", echo: "default" })
    );

    let query = Query::parse("query($text: String!) { echo(text: $text) }", None).unwrap();
    let result = runner.run_query(query).await;
    assert_eq!(result.data, None);
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::MissingVariableError(_, name)] if name == "text"
    ));
}

#[tokio::test]
async fn aliases_fragments_and_directives() {
    let runner = runner(HERO_SCHEMA, HeroRoot);

    let query = Query::parse(
        "
        query($withFriends: Boolean!) {
            droid: hero { ...Names friends @include(if: $withFriends) { name } }
            again: hero { ... on User { id } name @skip(if: true) }
        }

        fragment Names on User { name label: name }
        ",
        Some(QueryVariables::new(HashMap::from([(
            "withFriends".to_string(),
            r::Value::Boolean(false),
        )]))),
    )
    .unwrap();

    let result = runner.run_query(query).await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! {
            droid: object! { name: "R2-D2", label: "R2-D2" },
            again: object! { id: "2001" },
        })
    );
}

#[tokio::test]
async fn fields_with_the_same_response_key_are_merged() {
    let runner = runner(HERO_SCHEMA, HeroRoot);

    let result = execute(&runner, "{ hero { name } hero { id name } }").await;
    assert_eq!(
        result.to_json().unwrap(),
        r#"{"data":{"hero":{"name":"R2-D2","id":"2001"}}}"#
    );
}

#[tokio::test]
async fn typename_is_answered_by_the_engine() {
    let runner = runner(HERO_SCHEMA, HeroRoot);

    let result = execute(&runner, "{ __typename hero { __typename kind: __typename } }").await;
    assert_eq!(
        result.data,
        Some(object! {
            __typename: "Query",
            hero: object! { __typename: "User", kind: "User" },
        })
    );
}

const NON_NULL_SCHEMA: &str = "
    type Query {
        item: Item
        items: [Item!]
        required: String!
    }

    type Item {
        id: ID!
        label: String!
    }
";

fn item(id: &str, label: Option<&str>) -> Resolved {
    let label = label.map(str::to_string);
    Resolved::object(
        DynamicObject::new("Item")
            .with_value("id", id)
            .with_value("label", label),
    )
}

#[tokio::test]
async fn null_at_non_null_position_propagates_to_nullable_parent() {
    let root = DynamicObject::new("Query")
        .with_field("item", |_| Ok(item("1", None)))
        .with_field("items", |_| {
            Ok(Resolved::List(vec![item("1", Some("one")), item("2", None)]))
        })
        .with_value("required", "present");
    let runner = runner(NON_NULL_SCHEMA, root);

    let result = execute(&runner, "{ item { id label } items { label } required }").await;
    assert_eq!(
        result.data,
        Some(object! { item: r::Value::Null, items: r::Value::Null, required: "present" })
    );

    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.errors[0].path(), Some(path(&["item", "label"]).as_slice()));
    assert_eq!(
        result.errors[1].path(),
        Some(path(&["items", "1", "label"]).as_slice())
    );
    assert!(execution_errors(&result)
        .iter()
        .all(|e| matches!(e, QueryExecutionError::NonNullError(_, field) if field == "label")));
}

#[tokio::test]
async fn null_at_non_null_root_field_nulls_data() {
    let root = DynamicObject::new("Query")
        .with_field("required", |_| Err(anyhow!("unavailable")))
        .with_value("item", Resolved::Null);
    let runner = runner(NON_NULL_SCHEMA, root);

    let result = execute(&runner, "{ item { id } required }").await;
    assert_eq!(result.data, Some(r::Value::Null));

    // The resolver error explains the null; no second error is recorded
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::ResolveError(..)]
    ));
    assert_eq!(
        result.to_json().unwrap(),
        r#"{"data":null,"errors":[{"message":"Failed to resolve `required`: unavailable","locations":[{"line":1,"column":15}],"path":["required"]}]}"#
    );
}

#[tokio::test]
async fn leaf_values_must_match_their_types() {
    let root = DynamicObject::new("Query")
        .with_value("color", "PURPLE")
        .with_value("shade", "RED")
        .with_value("palette", "not a list");
    let runner = runner(
        "
        enum Color { RED GREEN }
        type Query { color: Color shade: Color palette: [Color] }
        ",
        root,
    );

    let result = execute(&runner, "{ color shade palette }").await;
    assert_eq!(
        result.data,
        Some(object! {
            color: r::Value::Null,
            shade: r::Value::Enum("RED".to_string()),
            palette: r::Value::Null,
        })
    );
    let errors = execution_errors(&result);
    assert!(matches!(errors[0], QueryExecutionError::LeafValueError(..)));
    assert!(matches!(errors[1], QueryExecutionError::ListValueError(..)));
}

#[tokio::test]
async fn invalid_requests_produce_no_data() {
    let runner = runner(HERO_SCHEMA, HeroRoot);

    let result = execute(&runner, "{ hero { name age } }").await;
    assert_eq!(result.data, None);
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::UnknownField(_, t, f)] if t == "User" && f == "age"
    ));

    let result = execute(&runner, "{ hero }").await;
    assert_eq!(result.data, None);
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::MissingSubselection(..)]
    ));

    let result = execute(&runner, "{ hero { name { first } } }").await;
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::UnexpectedSubselection(..)]
    ));

    let result = execute(&runner, "{ hero { ...Missing } }").await;
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::UndefinedFragment(name)] if name == "Missing"
    ));

    let result = execute(
        &runner,
        "{ hero { ...A } } fragment A on User { friends { ...B } } fragment B on User { ...A }",
    )
    .await;
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::CyclicalFragment(_)]
    ));
}

#[tokio::test]
async fn queries_deeper_than_the_limit_are_rejected() {
    let runner = runner(HERO_SCHEMA, HeroRoot);
    let mut options = QueryExecutionOptions::new(trellis::log::discard());
    options.max_depth = 2;

    let query = Query::parse("{ hero { friends { name } } }", None).unwrap();
    let result = runner
        .run_query_with_options(query, options.clone(), CancelHandle::never())
        .await;
    assert_eq!(result.data, None);
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::TooDeep(2)]
    ));

    let query = Query::parse("{ hero { name } }", None).unwrap();
    let result = runner
        .run_query_with_options(query, options, CancelHandle::never())
        .await;
    assert!(!result.has_errors());
}

fn slow_root() -> DynamicObject {
    DynamicObject::new("Query")
        .with_value("fast", "done")
        .with_async_field("slow", |_, _| {
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Resolved::from("too late"))
            }
            .boxed()
        })
}

#[tokio::test(start_paused = true)]
async fn deadline_abandons_unfinished_fields() {
    let runner = runner("type Query { fast: String slow: String }", slow_root());
    let mut options = QueryExecutionOptions::new(trellis::log::discard());
    options.deadline = Some(tokio::time::Instant::now() + Duration::from_secs(5));

    let query = Query::parse("{ fast slow }", None).unwrap();
    let result = runner
        .run_query_with_options(query, options, CancelHandle::never())
        .await;

    assert_eq!(
        result.data,
        Some(object! { fast: "done", slow: r::Value::Null })
    );
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path(), None);
    assert!(matches!(
        result.errors[0].execution_error(),
        Some(QueryExecutionError::Timeout)
    ));
}

#[tokio::test(start_paused = true)]
async fn canceled_requests_report_one_error() {
    let runner = runner("type Query { fast: String slow: String }", slow_root());
    let options = QueryExecutionOptions {
        logger: trellis::log::discard(),
        deadline: None,
        max_depth: 255,
        max_concurrency: 4,
    };

    let guard = CancelGuard::new();
    let handle = guard.handle();
    let query = Query::parse("{ fast slow }", None).unwrap();
    let run = runner.run_query_with_options(query, options, handle);
    let cancel = async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        guard.cancel();
    };
    let (result, ()) = futures03::join!(run, cancel);

    assert_eq!(
        result.data,
        Some(object! { fast: "done", slow: r::Value::Null })
    );
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        result.errors[0].execution_error(),
        Some(QueryExecutionError::Cancelled)
    ));
}

#[tokio::test]
async fn only_queries_are_executed() {
    let runner = runner(
        "type Query { hello: String } type Mutation { forget: Boolean }",
        DynamicObject::new("Query").with_value("hello", "Hello world!"),
    );

    let result = execute(&runner, "mutation { forget }").await;
    assert_eq!(result.data, None);
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::NotSupported(_)]
    ));

    let result = execute(&runner, "query A { hello } query B { hello }").await;
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::OperationNameRequired]
    ));

    let query = Query::parse("query A { a: hello } query B { b: hello }", None)
        .unwrap()
        .with_operation_name("B");
    let result = runner.run_query(query).await;
    assert_eq!(result.data, Some(object! { b: "Hello world!" }));
}
