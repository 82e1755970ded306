use base64::{engine::general_purpose::STANDARD, Engine as _};
use lazy_static::lazy_static;
use trellis::prelude::*;
use trellis_graphql::prelude::{
    Arguments, Bindings, FieldContext, FromArguments, NotImplemented, Object, Resolved, Resolver,
};

use super::{DroidData, HumanData, StarWars, StarshipData};

const FEET_PER_METER: f64 = 3.28084;

fn convert_length(meters: f64, unit: &str) -> Result<f64, anyhow::Error> {
    match unit {
        "METER" => Ok(meters),
        "FOOT" => Ok(meters * FEET_PER_METER),
        _ => bail!("invalid length unit `{}`", unit),
    }
}

fn encode_cursor(position: usize) -> String {
    STANDARD.encode(format!("cursor{}", position))
}

fn decode_cursor(cursor: &str) -> Result<usize, anyhow::Error> {
    let bytes = STANDARD
        .decode(cursor)
        .map_err(|e| anyhow!("invalid cursor `{}`: {}", cursor, e))?;
    String::from_utf8(bytes)
        .ok()
        .and_then(|text| text.strip_prefix("cursor")?.parse().ok())
        .ok_or_else(|| anyhow!("invalid cursor `{}`", cursor))
}

fn characters(data: &Arc<StarWars>, ids: &[&'static str]) -> Resolved {
    Resolved::list(
        ids.iter()
            .filter_map(|id| Character::find(data, id))
            .map(Resolved::object),
    )
}

struct IdArgs {
    id: String,
}

impl FromArguments for IdArgs {
    fn from_arguments(arguments: &Arguments) -> Result<Self, anyhow::Error> {
        Ok(IdArgs {
            id: arguments.get_required("id")?,
        })
    }
}

struct EpisodeArgs {
    episode: Option<String>,
}

impl FromArguments for EpisodeArgs {
    fn from_arguments(arguments: &Arguments) -> Result<Self, anyhow::Error> {
        Ok(EpisodeArgs {
            episode: arguments.get_optional("episode")?,
        })
    }
}

struct LengthArgs {
    unit: String,
}

impl FromArguments for LengthArgs {
    fn from_arguments(arguments: &Arguments) -> Result<Self, anyhow::Error> {
        Ok(LengthArgs {
            unit: arguments
                .get_optional("unit")?
                .unwrap_or_else(|| "METER".to_string()),
        })
    }
}

struct ConnectionArgs {
    first: Option<i32>,
    after: Option<String>,
}

impl FromArguments for ConnectionArgs {
    fn from_arguments(arguments: &Arguments) -> Result<Self, anyhow::Error> {
        Ok(ConnectionArgs {
            first: arguments.get_optional("first")?,
            after: arguments.get_optional("after")?,
        })
    }
}

/// The root of every query.
pub struct QueryRoot {
    data: Arc<StarWars>,
}

impl QueryRoot {
    pub fn new(data: Arc<StarWars>) -> Self {
        QueryRoot { data }
    }

    fn hero(&self, episode: Option<&str>) -> Option<Character> {
        match episode {
            Some("EMPIRE") => Character::find(&self.data, "1000"),
            _ => Character::find(&self.data, "2001"),
        }
    }

    /// Everything whose name contains `text`, ignoring case: humans first,
    /// then droids, then starships.
    fn search(&self, text: &str) -> Vec<SearchResult> {
        let text = text.to_lowercase();
        let matches = |name: &str| name.to_lowercase().contains(&text);
        let data = &self.data;

        let humans = (0..data.humans.len())
            .filter(|i| matches(data.humans[*i].name))
            .map(|i| SearchResult::Human(Human::new(data, i)));
        let droids = (0..data.droids.len())
            .filter(|i| matches(data.droids[*i].name))
            .map(|i| SearchResult::Droid(Droid::new(data, i)));
        let starships = (0..data.starships.len())
            .filter(|i| matches(data.starships[*i].name))
            .map(|i| SearchResult::Starship(Starship::new(data, i)));
        humans.chain(droids).chain(starships).collect()
    }
}

impl Object for QueryRoot {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<QueryRoot> = Bindings::new("Query")
                .field_with("Hero", |root: &QueryRoot, args: EpisodeArgs| {
                    Ok(Resolved::optional(root.hero(args.episode.as_deref())))
                })
                .field_with("Reviews", |_: &QueryRoot, _: Arguments| {
                    Err::<Resolved, _>(NotImplemented("reviews".to_string()).into())
                })
                .field_async(
                    "Search",
                    |root: &QueryRoot, arguments: Arguments, ctx: FieldContext| {
                        async move {
                            let text: Option<String> = arguments.get_optional("text")?;
                            let results = root.search(text.as_deref().unwrap_or_default());
                            trace!(
                                ctx.logger,
                                "Search";
                                "text" => text.as_deref().unwrap_or_default(),
                                "results" => results.len(),
                            );
                            Ok::<_, anyhow::Error>(Resolved::list(
                                results.into_iter().map(Resolved::object),
                            ))
                        }
                        .boxed()
                    },
                )
                .field_with("Character", |root: &QueryRoot, args: IdArgs| {
                    Ok(Resolved::optional(Character::find(&root.data, &args.id)))
                })
                .field_with("Droid", |root: &QueryRoot, args: IdArgs| {
                    let droid = root
                        .data
                        .droid_index(&args.id)
                        .map(|i| Droid::new(&root.data, i));
                    Ok(Resolved::optional(droid))
                })
                .field_with("Human", |root: &QueryRoot, args: IdArgs| {
                    let human = root
                        .data
                        .human_index(&args.id)
                        .map(|i| Human::new(&root.data, i));
                    Ok(Resolved::optional(human))
                })
                .field_with("Starship", |root: &QueryRoot, args: IdArgs| {
                    let starship = root
                        .data
                        .starship_index(&args.id)
                        .map(|i| Starship::new(&root.data, i));
                    Ok(Resolved::optional(starship))
                });
        }
        &BINDINGS
    }
}

#[derive(Clone)]
pub struct Human {
    data: Arc<StarWars>,
    index: usize,
}

impl Human {
    fn new(data: &Arc<StarWars>, index: usize) -> Self {
        Human {
            data: data.clone(),
            index,
        }
    }

    fn record(&self) -> &HumanData {
        &self.data.humans[self.index]
    }
}

impl Object for Human {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<Human> = Bindings::new("Human")
                .field("ID", |human: &Human| human.record().id)
                .field("Name", |human: &Human| human.record().name)
                .field_with("Height", |human: &Human, args: LengthArgs| {
                    convert_length(human.record().height, &args.unit)
                })
                .field("Mass", |human: &Human| human.record().mass)
                .field("Friends", |human: &Human| {
                    characters(&human.data, &human.record().friends)
                })
                .field_with("FriendsConnection", |human: &Human, args: ConnectionArgs| {
                    FriendsConnection::page(&human.data, &human.record().friends, args)
                        .map(Resolved::object)
                })
                .field("AppearsIn", |human: &Human| {
                    episodes(&human.record().appears_in)
                })
                .field("Starships", |human: &Human| {
                    Resolved::list(human.record().starships.iter().filter_map(|id| {
                        human
                            .data
                            .starship_index(id)
                            .map(|i| Resolved::object(Starship::new(&human.data, i)))
                    }))
                });
        }
        &BINDINGS
    }
}

#[derive(Clone)]
pub struct Droid {
    data: Arc<StarWars>,
    index: usize,
}

impl Droid {
    fn new(data: &Arc<StarWars>, index: usize) -> Self {
        Droid {
            data: data.clone(),
            index,
        }
    }

    fn record(&self) -> &DroidData {
        &self.data.droids[self.index]
    }
}

impl Object for Droid {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<Droid> = Bindings::new("Droid")
                .field("ID", |droid: &Droid| droid.record().id)
                .field("Name", |droid: &Droid| droid.record().name)
                .field("Friends", |droid: &Droid| {
                    characters(&droid.data, &droid.record().friends)
                })
                .field_with("FriendsConnection", |droid: &Droid, args: ConnectionArgs| {
                    FriendsConnection::page(&droid.data, &droid.record().friends, args)
                        .map(Resolved::object)
                })
                .field("AppearsIn", |droid: &Droid| {
                    episodes(&droid.record().appears_in)
                })
                .field("PrimaryFunction", |droid: &Droid| {
                    droid.record().primary_function
                });
        }
        &BINDINGS
    }
}

fn episodes(episodes: &[super::Episode]) -> Resolved {
    Resolved::list(
        episodes
            .iter()
            .map(|episode| r::Value::Enum(episode.as_str().to_string())),
    )
}

#[derive(Clone)]
pub struct Starship {
    data: Arc<StarWars>,
    index: usize,
}

impl Starship {
    fn new(data: &Arc<StarWars>, index: usize) -> Self {
        Starship {
            data: data.clone(),
            index,
        }
    }

    fn record(&self) -> &StarshipData {
        &self.data.starships[self.index]
    }
}

impl Object for Starship {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<Starship> = Bindings::new("Starship")
                .field("ID", |starship: &Starship| starship.record().id)
                .field("Name", |starship: &Starship| starship.record().name)
                .field_with("Length", |starship: &Starship, args: LengthArgs| {
                    convert_length(starship.record().length, &args.unit)
                });
        }
        &BINDINGS
    }
}

/// A value of the `Character` interface.
#[derive(Clone)]
pub enum Character {
    Human(Human),
    Droid(Droid),
}

impl Character {
    /// The human or droid with the given id.
    pub fn find(data: &Arc<StarWars>, id: &str) -> Option<Self> {
        data.human_index(id)
            .map(|i| Character::Human(Human::new(data, i)))
            .or_else(|| {
                data.droid_index(id)
                    .map(|i| Character::Droid(Droid::new(data, i)))
            })
    }

    fn id(&self) -> &'static str {
        match self {
            Character::Human(human) => human.record().id,
            Character::Droid(droid) => droid.record().id,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Character::Human(human) => human.record().name,
            Character::Droid(droid) => droid.record().name,
        }
    }
}

impl Object for Character {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<Character> = Bindings::new("Character")
                .field("ID", |character: &Character| character.id())
                .field("Name", |character: &Character| character.name());
        }
        &BINDINGS
    }

    fn narrow(&self) -> Option<(&str, &dyn Resolver)> {
        match self {
            Character::Human(human) => Some(("Human", human)),
            Character::Droid(droid) => Some(("Droid", droid)),
        }
    }
}

/// A value of the `SearchResult` union.
#[derive(Clone)]
pub enum SearchResult {
    Human(Human),
    Droid(Droid),
    Starship(Starship),
}

impl Object for SearchResult {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<SearchResult> = Bindings::new("SearchResult");
        }
        &BINDINGS
    }

    fn narrow(&self) -> Option<(&str, &dyn Resolver)> {
        match self {
            SearchResult::Human(human) => Some(("Human", human)),
            SearchResult::Droid(droid) => Some(("Droid", droid)),
            SearchResult::Starship(starship) => Some(("Starship", starship)),
        }
    }
}

/// One page of a character's friends. `start..end` is the window into
/// `friends` the page covers.
pub struct FriendsConnection {
    data: Arc<StarWars>,
    friends: Vec<&'static str>,
    start: usize,
    end: usize,
}

impl FriendsConnection {
    fn page(
        data: &Arc<StarWars>,
        friends: &[&'static str],
        args: ConnectionArgs,
    ) -> Result<Self, anyhow::Error> {
        let start = match args.after {
            Some(cursor) => decode_cursor(&cursor)?
                .checked_add(1)
                .ok_or_else(|| anyhow!("cursor `{}` is out of range", cursor))?,
            None => 0,
        }
        .min(friends.len());
        let end = match args.first {
            Some(first) if first < 0 => bail!("`first` must not be negative, got {}", first),
            Some(first) => (start + first as usize).min(friends.len()),
            None => friends.len(),
        };

        Ok(FriendsConnection {
            data: data.clone(),
            friends: friends.to_vec(),
            start,
            end,
        })
    }

    fn edges(&self) -> Vec<FriendsEdge> {
        (self.start..self.end)
            .map(|position| FriendsEdge {
                cursor: encode_cursor(position),
                node: Character::find(&self.data, self.friends[position]),
            })
            .collect()
    }

    fn page_info(&self) -> PageInfo {
        let window = self.start < self.end;
        PageInfo {
            start_cursor: window.then(|| encode_cursor(self.start)),
            end_cursor: window.then(|| encode_cursor(self.end - 1)),
            has_next_page: self.end < self.friends.len(),
        }
    }
}

impl Object for FriendsConnection {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<FriendsConnection> =
                Bindings::new("FriendsConnection")
                    .field("TotalCount", |connection: &FriendsConnection| {
                        connection.friends.len()
                    })
                    .field("Edges", |connection: &FriendsConnection| {
                        Resolved::list(connection.edges().into_iter().map(Resolved::object))
                    })
                    .field("Friends", |connection: &FriendsConnection| {
                        characters(
                            &connection.data,
                            &connection.friends[connection.start..connection.end],
                        )
                    })
                    .field("PageInfo", |connection: &FriendsConnection| {
                        Resolved::object(connection.page_info())
                    });
        }
        &BINDINGS
    }
}

pub struct FriendsEdge {
    cursor: String,
    node: Option<Character>,
}

impl Object for FriendsEdge {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<FriendsEdge> = Bindings::new("FriendsEdge")
                .field("Cursor", |edge: &FriendsEdge| edge.cursor.clone())
                .field("Node", |edge: &FriendsEdge| {
                    Resolved::optional(edge.node.clone())
                });
        }
        &BINDINGS
    }
}

pub struct PageInfo {
    start_cursor: Option<String>,
    end_cursor: Option<String>,
    has_next_page: bool,
}

impl Object for PageInfo {
    fn bindings() -> &'static Bindings<Self> {
        lazy_static! {
            static ref BINDINGS: Bindings<PageInfo> = Bindings::new("PageInfo")
                .field("StartCursor", |info: &PageInfo| info.start_cursor.clone())
                .field("EndCursor", |info: &PageInfo| info.end_cursor.clone())
                .field("HasNextPage", |info: &PageInfo| info.has_next_page);
        }
        &BINDINGS
    }
}
