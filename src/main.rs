use anyhow::{Context, bail};
use clap::Parser;
use sokoban_engine::script::{Command, parse_script};
use sokoban_engine::{Entity, GameState, Levels, Snapshot, UndoError, UndoQuota};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sokoban")]
#[command(about = "Replay moves on a multi-agent Sokoban level", long_about = None)]
struct Args {
    /// Path to the levels file (XSB format)
    #[arg(value_name = "FILE")]
    levels_file: PathBuf,

    /// Level number to play (1-indexed)
    #[arg(value_name = "LEVEL")]
    level: usize,

    /// Moves to replay, e.g. "2,1>3,1 1,1>2,1 | undo"
    #[arg(short, long, conflicts_with = "script_file")]
    script: Option<String>,

    /// Read the moves to replay from a file
    #[arg(long, value_name = "PATH")]
    script_file: Option<PathBuf>,

    /// Override the level's undo quota ("unlimited" or a count)
    #[arg(short, long)]
    undo: Option<UndoQuota>,

    /// Print the board after every checkpoint and undo
    #[arg(short, long)]
    print_board: bool,

    /// Resume from a snapshot written by --save
    #[arg(long, value_name = "PATH")]
    resume: Option<PathBuf>,

    /// Write a snapshot of the final state
    #[arg(long, value_name = "PATH")]
    save: Option<PathBuf>,
}

fn play(game: &mut GameState, commands: &[Command], print_board: bool) -> anyhow::Result<()> {
    for (index, command) in commands.iter().enumerate() {
        match *command {
            Command::Move { from, to } => {
                if !game.in_bounds(from) || !game.in_bounds(to) {
                    bail!("command {} ({}): position out of bounds", index, command);
                }
                if !game.entity_at(from).is_movable() {
                    bail!("command {} ({}): nothing movable at {}", index, command, from);
                }
                if game.entity_at(to) != Entity::Floor {
                    bail!("command {} ({}): destination {} is occupied", index, command, to);
                }
                game.move_entity(from, to);
            }
            Command::Checkpoint => {
                game.checkpoint();
                if print_board {
                    println!("Turn sealed ({} in history):\n{}", game.history_len(), game);
                }
            }
            Command::Undo => {
                let result = game.undo();
                report_undo(game, index, command, result, print_board)
            }
            Command::Rewind(steps) => {
                let result = game.rewind(steps);
                report_undo(game, index, command, result, print_board)
            }
        }
    }
    Ok(())
}

// Undo failures are recoverable: log and keep replaying.
fn report_undo(
    game: &GameState,
    index: usize,
    command: &Command,
    result: Result<(), UndoError>,
    print_board: bool,
) {
    match result {
        Ok(()) if print_board => {
            println!("{} (undo left: {}):\n{}", command, game.remaining_undo(), game);
        }
        Ok(()) => {}
        Err(e) => tracing::warn!("command {} ({}) refused: {}", index, command, e),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let levels = Levels::from_file(&args.levels_file)
        .with_context(|| format!("loading levels from {}", args.levels_file.display()))?;

    if args.level == 0 {
        bail!("level numbers must be at least 1");
    }
    let Some(level) = levels.get(args.level - 1) else {
        bail!(
            "level {} not found (file contains {} levels)",
            args.level,
            levels.len()
        );
    };
    let level = match args.undo {
        Some(undo) => level.clone().with_undo_policy(undo),
        None => level.clone(),
    };
    tracing::info!(
        level = args.level,
        width = level.width(),
        height = level.height(),
        undo = %level.undo_policy(),
        "loaded level"
    );

    let mut game = match &args.resume {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            GameState::restore(&level, Snapshot::from_json(&json)?)?
        }
        None => GameState::new(&level),
    };

    let script = match (&args.script, &args.script_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?,
        (None, None) => String::new(),
    };
    let commands = parse_script(&script)?;

    println!("\nStarting position:\n{}", game);
    play(&mut game, &commands, args.print_board)?;
    println!("Final position:\n{}", game);

    println!(
        "level: {:<3}  solved: {}  empty goals: {:<3}  history: {:<4}  undo left: {}",
        args.level,
        if game.is_win() { 'Y' } else { 'N' },
        game.empty_goals(),
        game.history_len(),
        game.remaining_undo()
    );

    if let Some(path) = &args.save {
        fs::write(path, game.snapshot().to_json()?)
            .with_context(|| format!("writing snapshot {}", path.display()))?;
        tracing::info!("snapshot written to {}", path.display());
    }

    Ok(())
}
