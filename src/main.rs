use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use nimbus_core::{AppError, Config};
use nimbus_storage::{KeyValueStore, SqliteStore};
use nimbus_weather::{
    CitySearch, FavoritesStore, Fetched, RecentSearches, SearchError, SearchOutcome,
    WeatherFetchService, WeatherRecord, ALL_WEATHER_KEY,
};

#[derive(Parser)]
#[command(name = "nimbus", version, about = "Offline-aware weather lookup")]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve from cache only, never touching the network
    #[arg(long, global = true)]
    offline: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Weather for every known city
    All,
    /// Weather for a single city
    City { name: String },
    /// Search a city and remember it in recent searches
    Search { query: String },
    /// Connectivity and cache status
    Status,
    /// Inspect or clear the weather cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage favorite cities
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Manage recent searches
    Recent {
        #[command(subcommand)]
        action: RecentAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached weather entry
    Clear,
    /// Age of a cache entry, e.g. `all_weather` or `city_London`
    Age { key: String },
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    /// Look up a city and add it to favorites
    Add { city: String },
    Remove { id: i64 },
    Clear,
}

#[derive(Subcommand)]
enum RecentAction {
    List,
    Remove { id: String },
    Clear,
}

struct Services {
    weather: Arc<WeatherFetchService>,
    favorites: FavoritesStore,
    recent: Arc<RecentSearches>,
}

impl Services {
    fn build(cli: &Cli) -> Result<Self, AppError> {
        let (mut config, _) = Config::load_validated(cli.config.as_deref())?;
        if cli.offline {
            config.connectivity.force_offline = true;
        }

        let db_path = config.database_path();
        tracing::debug!("Using database {}", db_path.display());
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&db_path)?);

        Ok(Self {
            weather: Arc::new(WeatherFetchService::from_config(&config, store.clone())?),
            favorites: FavoritesStore::new(store.clone()),
            recent: Arc::new(RecentSearches::new(store)),
        })
    }
}

fn print_record(record: &WeatherRecord) {
    println!(
        "#{:<3} {:<16} {:>5.1}°C  {:<14} humidity {:>3}%  wind {:>5.1} km/h",
        record.id,
        record.city,
        record.temperature,
        record.condition,
        record.humidity,
        record.wind_speed
    );
}

fn print_source<T>(fetched: &Fetched<T>) {
    if !fetched.is_fresh() {
        println!("(showing {} data)", fetched.source);
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| AppError::Other(e.into()))?;
    println!("{}", out);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let services = Services::build(&cli)?;

    match &cli.command {
        Command::All => {
            let fetched = services.weather.fetch_weather_data().await?;
            if cli.json {
                return print_json(&fetched.data);
            }
            print_source(&fetched);
            for record in &fetched.data {
                print_record(record);
            }
        }
        Command::City { name } => {
            let fetched = services.weather.fetch_weather_by_city(name).await?;
            if cli.json {
                return print_json(&fetched.data);
            }
            print_source(&fetched);
            match &fetched.data {
                Some(record) => print_record(record),
                None => println!("Weather data not found for \"{}\".", name.trim()),
            }
        }
        Command::Search { query } => {
            let search = CitySearch::new(services.weather.clone(), services.recent.clone());
            match search.search(query).await {
                Ok(SearchOutcome::Found(fetched)) => {
                    if cli.json {
                        return print_json(&fetched.data);
                    }
                    print_source(&fetched);
                    print_record(&fetched.data);
                }
                Ok(SearchOutcome::NotFound { query }) => {
                    println!(
                        "Weather data not found for \"{}\". Please check the city name.",
                        query
                    );
                }
                Err(SearchError::EmptyQuery) => {
                    eprintln!("{}", SearchError::EmptyQuery.user_message());
                }
                Err(SearchError::Weather(e)) => return Err(e.into()),
            }
        }
        Command::Status => {
            let connected = services.weather.is_connected().await;
            println!("Network: {}", if connected { "online" } else { "offline" });
            match services.weather.cache_age(ALL_WEATHER_KEY).await {
                Some(age) => println!("City list cached {} min ago", age / 60_000),
                None => println!("City list not cached"),
            }
        }
        Command::Cache { action } => match action {
            CacheAction::Clear => {
                let removed = services.weather.clear_cache().await;
                println!("Removed {} cache entries", removed);
            }
            CacheAction::Age { key } => match services.weather.cache_age(key).await {
                Some(age) => println!("{} written {} s ago", key, age / 1000),
                None => println!("{} is not cached", key),
            },
        },
        Command::Favorites { action } => match action {
            FavoritesAction::List => {
                let favorites = services.favorites.list().await?;
                if cli.json {
                    return print_json(&favorites);
                }
                if favorites.is_empty() {
                    println!("No favorites yet");
                }
                for record in &favorites {
                    print_record(record);
                }
            }
            FavoritesAction::Add { city } => {
                let fetched = services.weather.fetch_weather_by_city(city).await?;
                match fetched.into_inner() {
                    Some(record) => {
                        let name = record.city.clone();
                        if services.favorites.add(record).await? {
                            println!("Added {} to favorites", name);
                        } else {
                            println!("{} is already a favorite", name);
                        }
                    }
                    None => println!("Weather data not found for \"{}\".", city.trim()),
                }
            }
            FavoritesAction::Remove { id } => {
                if services.favorites.remove(*id).await? {
                    println!("Removed city #{} from favorites", id);
                } else {
                    println!("City #{} is not a favorite", id);
                }
            }
            FavoritesAction::Clear => {
                services.favorites.clear().await?;
                println!("Favorites cleared");
            }
        },
        Command::Recent { action } => match action {
            RecentAction::List => {
                let searches = services.recent.list().await;
                if cli.json {
                    return print_json(&searches);
                }
                for search in &searches {
                    println!("{:<24} {}", search.id, search.city);
                }
            }
            RecentAction::Remove { id } => {
                let remaining = services.recent.remove(id).await;
                println!("{} recent searches left", remaining.len());
            }
            RecentAction::Clear => {
                services.recent.clear().await;
                println!("Recent searches cleared");
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nimbus_core::init()?;

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::debug!("Command failed: {:?}", e);
        eprintln!("{}", e.user_message());
        eprintln!("  ({})", e);
        std::process::exit(1);
    }

    Ok(())
}
