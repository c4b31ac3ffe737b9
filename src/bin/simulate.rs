use builders::players::{drive, RandomBot};
use builders::{channel, GameOutcome, GameSession, RuleSet};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

/// Plays random bots against each other and reports how the games went.
#[derive(Parser, Debug)]
#[command(name = "simulate", version)]
struct Args {
    /// Number of games to play
    #[arg(short = 'n', long, default_value_t = 10)]
    num_games: u32,

    /// Number of bots per game
    #[arg(short, long, default_value_t = 2)]
    players: usize,

    /// Base seed. Game i uses seed + i.
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Give up on a game after this many turns
    #[arg(short = 't', long, default_value_t = 1000)]
    max_turns: u32,

    /// JSON rules file
    #[arg(short, long)]
    rules: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if args.verbose && std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let base_rules = match &args.rules {
        Some(path) => match RuleSet::from_file(path) {
            Ok(rules) => rules,
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(2);
            }
        },
        None => RuleSet::default(),
    };

    println!("🏗️ Builders Game Simulation");
    println!("===========================");
    println!("Configuration:");
    println!("  - Players: {}", args.players);
    println!("  - Number of games: {}", args.num_games);
    println!("  - Seed: {}", args.seed);
    println!("  - Turn limit: {}", args.max_turns);

    let mut wins = vec![0u32; args.players];
    let mut play_errors = 0u32;
    let mut total_turns = 0u32;
    let mut completed_games = 0u32;
    let mut stalled_games = 0u32;
    let mut aborted_games = 0u32;

    for game_num in 0..args.num_games {
        let seed = args.seed.wrapping_add(game_num as u64);
        let rules = RuleSet {
            seed: Some(seed),
            max_turns: Some(args.max_turns),
            ..base_rules.clone()
        };

        let mut ports = Vec::new();
        let mut bots = Vec::new();
        for seat in 0..args.players {
            let (port, link) = channel(format!("bot_{}", seat));
            ports.push(Arc::new(port) as Arc<dyn builders::PlayerPort>);
            let bot = RandomBot::new(seed.wrapping_mul(31).wrapping_add(seat as u64));
            bots.push(tokio::spawn(drive(link, bot)));
        }

        let mut session = GameSession::new(rules);
        let handle = match session.configure(ports).and_then(|_| session.start()) {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("❌ Could not start game {}: {}", game_num + 1, e);
                std::process::exit(1);
            }
        };

        let outcome = handle.join().await;
        let mut turns = 0;
        for bot in bots {
            if let Ok(report) = bot.await {
                play_errors += report.play_errors;
                turns += report.turns;
            }
        }

        match outcome {
            Ok(GameOutcome::Winners { players }) => {
                completed_games += 1;
                total_turns += turns;
                for winner in &players {
                    if let Some(seat) = winner.strip_prefix("bot_").and_then(|s| s.parse::<usize>().ok()) {
                        wins[seat] += 1;
                    }
                }
                if args.num_games > 1 {
                    println!("  Game {}: {:?} won in {} turns", game_num + 1, players, turns);
                }
            }
            Ok(GameOutcome::TurnLimit { turns }) => {
                stalled_games += 1;
                println!("  Game {}: no winner within {} turns", game_num + 1, turns);
            }
            Ok(GameOutcome::Aborted { reason }) => {
                aborted_games += 1;
                println!("  Game {}: aborted ({})", game_num + 1, reason);
            }
            Err(e) => {
                aborted_games += 1;
                println!("  Game {}: lost ({})", game_num + 1, e);
            }
        }
    }

    println!("\n📊 Results:");
    println!("===========");
    for (seat, &win_count) in wins.iter().enumerate() {
        let win_rate = if completed_games > 0 {
            (win_count as f64 / completed_games as f64) * 100.0
        } else {
            0.0
        };
        println!("bot_{}: {} wins ({:.1}%)", seat, win_count, win_rate);
    }
    if completed_games > 0 {
        println!(
            "Average game length: {:.1} turns",
            total_turns as f64 / completed_games as f64
        );
    }
    println!("Bad plays: {}", play_errors);
    println!("Stalled games: {}", stalled_games);
    println!("Aborted games: {}", aborted_games);
}
