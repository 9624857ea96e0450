use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use monopoly_rules::autoplay::{run_autoplay, AutoplayConfig};
use monopoly_rules::{load_board, load_cards, GameConfig};

#[derive(Parser)]
#[command(name = "monopoly-sim")]
#[command(about = "Plays headless Monopoly games between bots", version)]
struct Cli {
    /// Number of bot players
    #[arg(short, long, default_value_t = 4)]
    players: usize,

    /// Seed for dice and card draws
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Turns to play
    #[arg(short, long, default_value_t = 200)]
    turns: u32,

    /// Rule config, written with defaults if missing
    #[arg(long, default_value = "./config/game.json")]
    config: PathBuf,

    /// Board definition, written with the classic board if missing
    #[arg(long, default_value = "./config/board.json")]
    board: PathBuf,

    /// Chance and Community Chest decks, written with defaults if missing
    #[arg(long, default_value = "./config/action_cards.json")]
    cards: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let game = GameConfig::load_or_init(Some(&cli.config))?;
    let board = load_board(Some(&cli.board))?;
    let decks = load_cards(Some(&cli.cards))?;
    info!(tiles = board.len(), "loaded board");

    let config = AutoplayConfig {
        players: cli.players,
        seed: cli.seed,
        max_turns: cli.turns,
        game,
        ..AutoplayConfig::default()
    };
    let report = run_autoplay(&config, board, decks).context("self-play aborted")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("seed {} | {} turns | {} bought | {} auctions won | rent paid {}",
        report.seed, report.turns_played, report.properties_bought, report.auctions_won, report.rent_paid);
    for (rank, standing) in report.standings.iter().enumerate() {
        println!("{:>2}. {:<8} cash {:>6}  properties {:>2}  net worth {:>6}",
            rank + 1, standing.name, standing.cash, standing.properties, standing.net_worth);
    }
    Ok(())
}
