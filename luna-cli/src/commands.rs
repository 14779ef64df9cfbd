//! CLI command implementations.

use std::fs;

use luna_container::{disassemble, read_chunks, Game};
use luna_vm::{Domain, RecordingRenderer, RuntimeError, Session, SessionConfig};

use crate::console::ConsolePlatform;

/// List the chunks of a container.
pub fn chunks(args: &[String]) -> Result<(), i32> {
    let [input] = args else {
        eprintln!("error: chunks requires an input file");
        eprintln!("Usage: luna chunks <file>");
        return Err(1);
    };

    let data = read_file(input)?;
    let chunks = read_chunks(&data).map_err(|e| {
        eprintln!("error: {e}");
        2
    })?;
    for chunk in &chunks {
        println!("{}  {:#010x}  {}", chunk.name(), chunk.offset, chunk.length);
    }
    Ok(())
}

/// Disassemble one code entry, or every entry in table order.
pub fn disasm(args: &[String]) -> Result<(), i32> {
    if args.is_empty() || args.len() > 2 {
        eprintln!("error: disasm requires an input file");
        eprintln!("Usage: luna disasm <file> [code]");
        return Err(1);
    }

    let game = load_game(&args[0])?;
    match args.get(1) {
        Some(name) => {
            let Some(program) = game.program_by_name(name) else {
                eprintln!("error: no code entry named '{name}'");
                return Err(1);
            };
            print!("{}", disassemble(program));
        }
        None => {
            for (i, (entry, program)) in game.code.iter().zip(&game.programs).enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{}:", entry.name);
                print!("{}", disassemble(program));
            }
        }
    }
    Ok(())
}

/// Run one code entry with a fresh domain and print its result.
pub fn exec(args: &[String]) -> Result<(), i32> {
    let options = Options::parse(args, &["--seed"])?;
    let [input, code] = options.positional.as_slice() else {
        eprintln!("error: exec requires an input file and a code entry name");
        eprintln!("Usage: luna exec <file> <code> [--seed N]");
        return Err(1);
    };

    let game = load_game(input)?;
    let config = SessionConfig {
        seed: options.number("--seed", 0)?,
        ..SessionConfig::default()
    };
    let mut session = open_session(game, config)?;
    let result = session.run_code(code, &mut Domain::new()).map_err(runtime_error)?;
    println!("{result}");
    Ok(())
}

/// Enter a room and step frames headlessly.
pub fn run(args: &[String]) -> Result<(), i32> {
    let options = Options::parse(args, &["--room", "--frames", "--seed"])?;
    let [input] = options.positional.as_slice() else {
        eprintln!("error: run requires an input file");
        eprintln!("Usage: luna run <file> [--room N] [--frames N] [--seed N] [-- params...]");
        return Err(1);
    };

    let game = load_game(input)?;
    let frames: u64 = options.number("--frames", 1)?;
    let room: Option<usize> = options.optional_number("--room")?;
    let config = SessionConfig {
        seed: options.number("--seed", 0)?,
        parameters: options.trailing.clone(),
        ..SessionConfig::default()
    };

    let renderer = RecordingRenderer::new();
    let draw_calls = renderer.calls();
    let mut session = open_session_with(game, config, renderer)?;
    let entered = match room {
        Some(room) => session.enter_room(room),
        None => session.start(),
    };
    entered.map_err(runtime_error)?;

    for _ in 0..frames {
        session.step().map_err(runtime_error)?;
    }

    let room_name = session
        .room()
        .and_then(|index| session.game().rooms.get(index))
        .map_or_else(|| "<none>".to_string(), |room| room.name.to_string());
    println!(
        "room {room_name}: {} frames, {} instances, {} draw calls",
        session.frames(),
        session.instance_count(),
        draw_calls.borrow().len()
    );
    Ok(())
}

/// Positional arguments, `--name value` options and everything after `--`.
struct Options {
    positional: Vec<String>,
    values: Vec<(String, String)>,
    trailing: Vec<String>,
}

impl Options {
    fn parse(args: &[String], known: &[&str]) -> Result<Self, i32> {
        let mut options = Options {
            positional: Vec::new(),
            values: Vec::new(),
            trailing: Vec::new(),
        };
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "--" {
                options.trailing = iter.cloned().collect();
                break;
            }
            if arg.starts_with("--") {
                if !known.contains(&arg.as_str()) {
                    eprintln!("error: unknown option '{arg}'");
                    return Err(1);
                }
                let Some(value) = iter.next() else {
                    eprintln!("error: {arg} requires a value");
                    return Err(1);
                };
                options.values.push((arg.clone(), value.clone()));
            } else {
                options.positional.push(arg.clone());
            }
        }
        Ok(options)
    }

    fn optional_number<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, i32> {
        let Some((_, raw)) = self.values.iter().rev().find(|(n, _)| n == name) else {
            return Ok(None);
        };
        raw.parse().map(Some).map_err(|_| {
            eprintln!("error: {name} expects a non-negative integer, got '{raw}'");
            1
        })
    }

    fn number<T: std::str::FromStr>(&self, name: &str, default: T) -> Result<T, i32> {
        Ok(self.optional_number(name)?.unwrap_or(default))
    }
}

fn read_file(path: &str) -> Result<Vec<u8>, i32> {
    fs::read(path).map_err(|e| {
        eprintln!("error: cannot read '{path}': {e}");
        1
    })
}

fn load_game(path: &str) -> Result<Game, i32> {
    let data = read_file(path)?;
    Game::from_bytes(&data).map_err(|e| {
        eprintln!("error: {path}: {e}");
        2
    })
}

fn open_session(game: Game, config: SessionConfig) -> Result<Session, i32> {
    open_session_with(game, config, RecordingRenderer::new())
}

fn open_session_with(
    game: Game,
    config: SessionConfig,
    renderer: RecordingRenderer,
) -> Result<Session, i32> {
    Session::with_hosts(game, config, Box::new(renderer), Box::new(ConsolePlatform))
        .map_err(runtime_error)
}

fn runtime_error(e: RuntimeError) -> i32 {
    eprintln!("runtime error: {e}");
    3
}
