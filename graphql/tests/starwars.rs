#[macro_use]
extern crate pretty_assertions;

use lazy_static::lazy_static;
use std::collections::HashMap;

use trellis::prelude::*;
use trellis_graphql::execution::verify_bindings;
use trellis_graphql::prelude::*;
use trellis_graphql::schema::Strings;

lazy_static! {
    static ref RUNNER: GraphQlRunner =
        trellis_mock::runner(&trellis::log::discard()).expect("Star Wars bindings invalid");
}

async fn execute(query: &str) -> QueryResult {
    execute_with_variables(query, vec![]).await
}

async fn execute_with_variables(query: &str, variables: Vec<(&str, r::Value)>) -> QueryResult {
    let variables = QueryVariables::new(
        variables
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect::<HashMap<_, _>>(),
    );
    let query = Query::parse(query, Some(variables)).expect("Test query invalid");
    RUNNER.run_query(query).await
}

fn execution_errors(result: &QueryResult) -> Vec<&QueryExecutionError> {
    result
        .errors
        .iter()
        .filter_map(|e| e.execution_error())
        .collect()
}

fn float_at(value: &r::Value, keys: &[&str]) -> f64 {
    let value = keys
        .iter()
        .fold(Some(value), |value, key| value.and_then(|v| v.get(key)));
    match value {
        Some(r::Value::Float(f)) => *f,
        other => panic!("expected a float at {:?}, got {:?}", keys, other),
    }
}

fn enums(names: &[&str]) -> Vec<r::Value> {
    names
        .iter()
        .map(|name| r::Value::Enum(name.to_string()))
        .collect()
}

#[tokio::test]
async fn hero_with_friends() {
    let result = execute("{ hero { id name friends { name } } }").await;
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
async fn hero_depends_on_the_episode() {
    let result = execute(
        "
        {
            empire: hero(episode: EMPIRE) {
                __typename
                name
                ... on Human { height mass }
                ... on Droid { primaryFunction }
            }
            jedi: hero(episode: JEDI) {
                __typename
                name
                ... on Human { height mass }
                ... on Droid { primaryFunction }
            }
        }
        ",
    )
    .await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! {
            empire: object! {
                __typename: "Human",
                name: "Luke Skywalker",
                height: 1.72,
                mass: 77.0,
                primaryFunction: r::Value::Null,
            },
            jedi: object! {
                __typename: "Droid",
                name: "R2-D2",
                height: r::Value::Null,
                mass: r::Value::Null,
                primaryFunction: "Astromech",
            },
        })
    );
}

#[tokio::test]
async fn lookups_by_id() {
    let result = execute(
        r#"
        {
            tarkin: character(id: "1004") { name appearsIn ... on Human { mass } }
            threepio: character(id: "2000") { name appearsIn }
            nobody: character(id: "9999") { name }
            notADroid: droid(id: "1000") { name }
            luke: human(id: "1000") { starships { name } }
        }
        "#,
    )
    .await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! {
            tarkin: object! {
                name: "Wilhuff Tarkin",
                appearsIn: enums(&["NEWHOPE"]),
                mass: r::Value::Null,
            },
            threepio: object! {
                name: "C-3PO",
                appearsIn: enums(&["NEWHOPE", "EMPIRE", "JEDI"]),
            },
            nobody: r::Value::Null,
            notADroid: r::Value::Null,
            luke: object! {
                starships: vec![
                    object! { name: "X-Wing" },
                    object! { name: "Imperial shuttle" },
                ],
            },
        })
    );
}

#[tokio::test]
async fn search_narrows_each_result() {
    let result = execute(
        r#"
        {
            search(text: "AN") {
                __typename
                ... on Character { name }
                ... on Starship { name length }
            }
        }
        "#,
    )
    .await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! {
            search: vec![
                object! { __typename: "Human", name: "Han Solo", length: r::Value::Null },
                object! { __typename: "Human", name: "Leia Organa", length: r::Value::Null },
                object! { __typename: "Starship", name: "TIE Advanced x1", length: 9.2 },
            ],
        })
    );
}

#[tokio::test]
async fn friends_connection_pages_through_friends() {
    let page = "
        query($after: ID) {
            human(id: \"1000\") {
                friendsConnection(first: 2, after: $after) {
                    totalCount
                    edges { cursor node { name } }
                    pageInfo { startCursor endCursor hasNextPage }
                }
            }
        }
    ";

    let result = execute(page).await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! {
            human: object! {
                friendsConnection: object! {
                    totalCount: 4,
                    edges: vec![
                        object! { cursor: "Y3Vyc29yMA==", node: object! { name: "Han Solo" } },
                        object! { cursor: "Y3Vyc29yMQ==", node: object! { name: "Leia Organa" } },
                    ],
                    pageInfo: object! {
                        startCursor: "Y3Vyc29yMA==",
                        endCursor: "Y3Vyc29yMQ==",
                        hasNextPage: true,
                    },
                },
            },
        })
    );

    let result = execute_with_variables(
        page,
        vec![("after", r::Value::String("Y3Vyc29yMQ==".to_string()))],
    )
    .await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! {
            human: object! {
                friendsConnection: object! {
                    totalCount: 4,
                    edges: vec![
                        object! { cursor: "Y3Vyc29yMg==", node: object! { name: "C-3PO" } },
                        object! { cursor: "Y3Vyc29yMw==", node: object! { name: "R2-D2" } },
                    ],
                    pageInfo: object! {
                        startCursor: "Y3Vyc29yMg==",
                        endCursor: "Y3Vyc29yMw==",
                        hasNextPage: false,
                    },
                },
            },
        })
    );
}

#[tokio::test]
async fn friends_connection_on_the_interface() {
    let result = execute(
        "{ hero { friendsConnection { totalCount friends { name } pageInfo { hasNextPage } } } }",
    )
    .await;
    assert!(!result.has_errors());
    assert_eq!(
        result.data,
        Some(object! {
            hero: object! {
                friendsConnection: object! {
                    totalCount: 3,
                    friends: vec![
                        object! { name: "Luke Skywalker" },
                        object! { name: "Han Solo" },
                        object! { name: "Leia Organa" },
                    ],
                    pageInfo: object! { hasNextPage: false },
                },
            },
        })
    );
}

#[tokio::test]
async fn bad_cursor_nulls_the_nearest_nullable_parent() {
    let result = execute(
        r#"{ human(id: "1000") { name friendsConnection(after: "bogus") { totalCount } } }"#,
    )
    .await;
    assert_eq!(result.data, Some(object! { human: r::Value::Null }));
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::ResolveError(_, field, _)] if field == "friendsConnection"
    ));
}

#[tokio::test]
async fn overflowing_cursor_is_a_field_error() {
    // Decodes to "cursor18446744073709551615"
    let cursor = "Y3Vyc29yMTg0NDY3NDQwNzM3MDk1NTE2MTU=";
    let result = execute_with_variables(
        r#"query($after: ID) {
            human(id: "1000") { name friendsConnection(after: $after) { totalCount } }
        }"#,
        vec![("after", r::Value::String(cursor.to_string()))],
    )
    .await;
    assert_eq!(result.data, Some(object! { human: r::Value::Null }));
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::ResolveError(_, field, _)] if field == "friendsConnection"
    ));
}

#[tokio::test]
async fn lengths_convert_between_units() {
    let result = execute(
        r#"{ starship(id: "3000") { name length feet: length(unit: FOOT) } }"#,
    )
    .await;
    assert!(!result.has_errors());
    let data = result.data.unwrap();
    assert_eq!(float_at(&data, &["starship", "length"]), 34.37);
    assert!((float_at(&data, &["starship", "feet"]) - 112.76).abs() < 0.01);

    let result = execute_with_variables(
        r#"query($unit: LengthUnit) { human(id: "1001") { height(unit: $unit) } }"#,
        vec![("unit", r::Value::String("FOOT".to_string()))],
    )
    .await;
    assert!(!result.has_errors());
    assert!((float_at(&result.data.unwrap(), &["human", "height"]) - 6.6273).abs() < 0.001);
}

#[tokio::test]
async fn unknown_units_are_argument_errors() {
    let result = execute(r#"{ starship(id: "3000") { name length(unit: FURLONG) } }"#).await;
    assert_eq!(
        result.data,
        Some(object! {
            starship: object! { name: "Millenium Falcon", length: r::Value::Null },
        })
    );
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::InvalidArgumentError(_, name, _)] if name == "unit"
    ));
}

#[tokio::test]
async fn quoted_units_are_not_enum_values() {
    let result = execute(r#"{ starship(id: "3000") { name length(unit: "FOOT") } }"#).await;
    assert_eq!(
        result.data,
        Some(object! {
            starship: object! { name: "Millenium Falcon", length: r::Value::Null },
        })
    );
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::InvalidArgumentError(_, name, _)] if name == "unit"
    ));
}

#[tokio::test]
async fn reviews_are_not_implemented() {
    let result = execute("{ reviews(episode: JEDI) { stars } hero { name } }").await;
    assert_eq!(
        result.data,
        Some(object! { reviews: r::Value::Null, hero: object! { name: "R2-D2" } })
    );
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::NotImplemented(_, what)] if what == "reviews"
    ));
}

#[tokio::test]
async fn mutations_are_rejected() {
    let result = execute(
        "mutation { createReview(episode: JEDI, review: { stars: 5 }) { stars } }",
    )
    .await;
    assert_eq!(result.data, None);
    assert!(matches!(
        execution_errors(&result)[..],
        [QueryExecutionError::NotSupported(_)]
    ));
}

#[tokio::test]
async fn results_do_not_depend_on_concurrency() {
    let text = "{ hero { name friends { name friends { name } } } search(text: \"o\") { __typename } }";
    let expected = execute(text).await;

    let mut options = QueryExecutionOptions::new(trellis::log::discard());
    options.max_concurrency = 1;
    let sequential = RUNNER
        .run_query_with_options(
            Query::parse(text, None).unwrap(),
            options,
            CancelHandle::never(),
        )
        .await;

    assert!(!expected.has_errors());
    assert_eq!(sequential.data, expected.data);
}

struct Incomplete;

impl Object for Incomplete {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<Incomplete> = Bindings::new("Starship")
                .field("ID", |_: &Incomplete| "3000")
                .field("Name", |_: &Incomplete| "Millenium Falcon");
        }
        &BINDINGS
    }
}

struct Colliding;

impl Object for Colliding {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<Colliding> = Bindings::new("Starship")
                .field("ID", |_: &Colliding| "3000")
                .field("Id", |_: &Colliding| "3000")
                .field("Name", |_: &Colliding| "Millenium Falcon")
                .field("Length", |_: &Colliding| 34.37);
        }
        &BINDINGS
    }
}

struct Stranger;

impl Object for Stranger {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<Stranger> = Bindings::new("Wookiee");
        }
        &BINDINGS
    }
}

#[test]
fn bindings_are_checked_against_the_schema() {
    let logger = trellis::log::discard();
    let schema = trellis_mock::schema().unwrap();

    assert!(verify_bindings(&logger, &schema, Incomplete::bindings(), false).is_ok());
    assert_eq!(
        verify_bindings(&logger, &schema, Incomplete::bindings(), true),
        Err(ConstructionError::MissingCapability(
            "Starship".to_string(),
            "length".to_string()
        ))
    );
    assert_eq!(
        verify_bindings(&logger, &schema, Colliding::bindings(), false),
        Err(ConstructionError::AmbiguousBinding(
            "Starship".to_string(),
            "id".to_string(),
            Strings(vec!["ID".to_string(), "Id".to_string()])
        ))
    );
    assert_eq!(
        verify_bindings(&logger, &schema, Stranger::bindings(), false),
        Err(ConstructionError::UnknownResolverType("Wookiee".to_string()))
    );

    assert!(RUNNER.verify::<trellis_mock::Character>().is_ok());
}
