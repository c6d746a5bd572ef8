use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use kicker_match::{PlayerId, SensorKind};
use tracing::info;

#[derive(Parser)]
#[command(name = "kicker")]
#[command(about = "Kicker operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Sensor log commands (bench testing)
    Sensor {
        #[command(subcommand)]
        cmd: SensorCmd,
    },

    /// Player roster
    Players {
        #[command(subcommand)]
        cmd: PlayersCmd,
    },

    /// Match history
    Games {
        #[command(subcommand)]
        cmd: GamesCmd,
    },

    /// Aggregate statistics over finished matches
    Stats {
        /// How many top players to list
        #[arg(long, default_value_t = 5)]
        top: i64,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses while a match record is open unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB with a match in progress.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum SensorCmd {
    /// Append one event to the sensor log
    Emit {
        /// kickoff | goal_home | goal_away
        #[arg(long, value_parser = parse_kind)]
        kind: SensorKind,

        /// RFC 3339 timestamp; defaults to the database clock
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[derive(Subcommand)]
enum PlayersCmd {
    List,

    Add {
        /// Display name
        name: String,
    },

    Remove {
        /// Player id
        id: i64,
    },
}

#[derive(Subcommand)]
enum GamesCmd {
    /// Finished matches, most recently ended first
    Recent {
        #[arg(long, default_value_t = 5)]
        limit: i64,
    },
}

fn parse_kind(s: &str) -> Result<SensorKind, String> {
    SensorKind::parse(s).ok_or_else(|| {
        format!("unknown sensor kind {s:?}; expected kickoff | goal_home | goal_away")
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let pool = kicker_db::connect_from_env().await?;

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => {
                let s = kicker_db::status(&pool).await?;
                println!("db_ok={} has_matches_table={}", s.ok, s.has_matches_table);
            }
            DbCmd::Migrate { yes } => {
                // Only meaningful once the schema exists.
                if kicker_db::status(&pool).await?.has_matches_table && !yes {
                    if let Some(open) = kicker_db::fetch_open_match(&pool).await? {
                        bail!(
                            "REFUSING MIGRATE: match {} is still open. Re-run with: `kicker db migrate --yes`",
                            open.match_id
                        );
                    }
                }
                kicker_db::migrate(&pool).await?;
                println!("migrations_applied=true");
            }
        },

        Commands::Sensor { cmd } => match cmd {
            SensorCmd::Emit { kind, at } => {
                let ev = kicker_db::insert_sensor_event(&pool, kind, at).await?;
                info!(event_id = ev.id, %kind, "sensor event appended");
                println!("event_id={}", ev.id);
                println!("kind={}", ev.kind);
                println!("timestamp={}", ev.timestamp.to_rfc3339());
            }
        },

        Commands::Players { cmd } => match cmd {
            PlayersCmd::List => {
                for p in kicker_db::list_players(&pool).await? {
                    println!("{}\t{}", p.player_id, p.name);
                }
            }
            PlayersCmd::Add { name } => {
                let p = kicker_db::add_player(&pool, &name).await?;
                println!("player_id={} name={}", p.player_id, p.name);
            }
            PlayersCmd::Remove { id } => {
                let player_id = PlayerId(id);
                if let Some(open) = kicker_db::fetch_open_match(&pool).await? {
                    if open
                        .home_players
                        .iter()
                        .chain(&open.away_players)
                        .any(|p| *p == player_id)
                    {
                        bail!(
                            "REFUSING REMOVE: player {} is in open match {}; stop it via the daemon first",
                            player_id,
                            open.match_id
                        );
                    }
                }
                if !kicker_db::delete_player(&pool, player_id).await? {
                    bail!("player {} not found", player_id);
                }
                println!("removed=true player_id={}", player_id);
            }
        },

        Commands::Games { cmd } => match cmd {
            GamesCmd::Recent { limit } => {
                for m in kicker_db::recent_matches(&pool, limit).await? {
                    println!("{}", serde_json::to_string(&m).context("encode match row")?);
                }
            }
        },

        Commands::Stats { top } => {
            let s = kicker_db::match_statistics(&pool).await?;
            println!("total_games={}", s.total_games);
            println!("avg_home_goals={}", opt_f64(s.avg_home_goals));
            println!("avg_away_goals={}", opt_f64(s.avg_away_goals));
            println!("home_wins={}", s.home_wins);
            println!("away_wins={}", s.away_wins);
            println!("draws={}", s.draws);
            for p in kicker_db::top_players(&pool, top).await? {
                println!("top_player={} name={} games={}", p.player_id, p.name, p.games_played);
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn opt_f64(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "null".to_string())
}
