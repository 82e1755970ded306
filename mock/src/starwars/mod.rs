use std::fmt;
use trellis::prelude::*;
use trellis_graphql::prelude::{ConstructionError, GraphQlRunner, Schema};

mod resolvers;

pub use self::resolvers::{
    Character, Droid, FriendsConnection, FriendsEdge, Human, PageInfo, QueryRoot, SearchResult,
    Starship,
};

/// The schema text of the Star Wars example.
pub const SCHEMA: &str = include_str!("schema.graphql");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Episode {
    NewHope,
    Empire,
    Jedi,
}

impl Episode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Episode::NewHope => "NEWHOPE",
            Episode::Empire => "EMPIRE",
            Episode::Jedi => "JEDI",
        }
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct HumanData {
    pub id: &'static str,
    pub name: &'static str,
    pub friends: Vec<&'static str>,
    pub appears_in: Vec<Episode>,
    /// Meters.
    pub height: f64,
    pub mass: Option<f64>,
    pub starships: Vec<&'static str>,
}

#[derive(Clone, Debug)]
pub struct DroidData {
    pub id: &'static str,
    pub name: &'static str,
    pub friends: Vec<&'static str>,
    pub appears_in: Vec<Episode>,
    pub primary_function: &'static str,
}

#[derive(Clone, Debug)]
pub struct StarshipData {
    pub id: &'static str,
    pub name: &'static str,
    /// Meters.
    pub length: f64,
}

/// The read-only data set behind the resolvers. It is built once and
/// shared by every request.
#[derive(Clone, Debug)]
pub struct StarWars {
    pub humans: Vec<HumanData>,
    pub droids: Vec<DroidData>,
    pub starships: Vec<StarshipData>,
}

impl StarWars {
    pub fn new() -> Self {
        use Episode::*;

        let all = || vec![NewHope, Empire, Jedi];
        let humans = vec![
            HumanData {
                id: "1000",
                name: "Luke Skywalker",
                friends: vec!["1002", "1003", "2000", "2001"],
                appears_in: all(),
                height: 1.72,
                mass: Some(77.0),
                starships: vec!["3001", "3003"],
            },
            HumanData {
                id: "1001",
                name: "Darth Vader",
                friends: vec!["1004"],
                appears_in: all(),
                height: 2.02,
                mass: Some(136.0),
                starships: vec!["3002"],
            },
            HumanData {
                id: "1002",
                name: "Han Solo",
                friends: vec!["1000", "1003", "2001"],
                appears_in: all(),
                height: 1.8,
                mass: Some(80.0),
                starships: vec!["3000", "3003"],
            },
            HumanData {
                id: "1003",
                name: "Leia Organa",
                friends: vec!["1000", "1002", "2000", "2001"],
                appears_in: all(),
                height: 1.5,
                mass: Some(49.0),
                starships: vec![],
            },
            HumanData {
                id: "1004",
                name: "Wilhuff Tarkin",
                friends: vec!["1001"],
                appears_in: vec![NewHope],
                height: 1.8,
                mass: None,
                starships: vec![],
            },
        ];
        let droids = vec![
            DroidData {
                id: "2000",
                name: "C-3PO",
                friends: vec!["1000", "1002", "1003", "2001"],
                appears_in: all(),
                primary_function: "Protocol",
            },
            DroidData {
                id: "2001",
                name: "R2-D2",
                friends: vec!["1000", "1002", "1003"],
                appears_in: all(),
                primary_function: "Astromech",
            },
        ];
        let starships = vec![
            StarshipData {
                id: "3000",
                name: "Millenium Falcon",
                length: 34.37,
            },
            StarshipData {
                id: "3001",
                name: "X-Wing",
                length: 12.5,
            },
            StarshipData {
                id: "3002",
                name: "TIE Advanced x1",
                length: 9.2,
            },
            StarshipData {
                id: "3003",
                name: "Imperial shuttle",
                length: 20.0,
            },
        ];

        StarWars {
            humans,
            droids,
            starships,
        }
    }

    pub fn human_index(&self, id: &str) -> Option<usize> {
        self.humans.iter().position(|human| human.id == id)
    }

    pub fn droid_index(&self, id: &str) -> Option<usize> {
        self.droids.iter().position(|droid| droid.id == id)
    }

    pub fn starship_index(&self, id: &str) -> Option<usize> {
        self.starships.iter().position(|starship| starship.id == id)
    }
}

impl Default for StarWars {
    fn default() -> Self {
        StarWars::new()
    }
}

/// Parses the Star Wars schema.
pub fn schema() -> Result<Schema, ConstructionError> {
    Schema::parse(SCHEMA, "starwars")
}

/// A runner over the Star Wars schema and data set, with the bindings of
/// every resolver type checked against the schema.
pub fn runner(logger: &Logger) -> Result<GraphQlRunner, ConstructionError> {
    let data = Arc::new(StarWars::new());
    let runner = GraphQlRunner::new(
        logger,
        Arc::new(schema()?),
        Arc::new(QueryRoot::new(data)),
    );

    runner.verify::<QueryRoot>()?;
    runner.verify::<Character>()?;
    runner.verify::<SearchResult>()?;
    runner.verify::<Human>()?;
    runner.verify::<Droid>()?;
    runner.verify::<Starship>()?;
    runner.verify::<FriendsConnection>()?;
    runner.verify::<FriendsEdge>()?;
    runner.verify::<PageInfo>()?;
    Ok(runner)
}
