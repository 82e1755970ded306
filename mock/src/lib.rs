//! Test fixtures for the GraphQL engine: the Star Wars schema, its data set
//! and the resolvers that serve it.

mod starwars;

pub use self::starwars::{
    runner, schema, Character, Droid, DroidData, Episode, FriendsConnection, FriendsEdge, Human,
    HumanData, PageInfo, QueryRoot, SearchResult, StarWars, Starship, StarshipData, SCHEMA,
};
