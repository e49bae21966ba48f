use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use earmark::{Engine, EngineConfig, engine::RecognizeResult, fingerprint, logging};

fn main() -> ExitCode {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return ExitCode::FAILURE;
    };

    let result = match command.as_str() {
        "register" => run_register(&args[1..]),
        "recognize" => run_recognize(&args[1..]),
        "stats" => run_stats(&args[1..]),
        "fingerprint" => run_fingerprint(&args[1..]),
        _ => {
            eprintln!("Unknown command: {command}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!("Usage: earmark <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  register <directory>   Register all songs in a directory");
    eprintln!("  recognize <file>       Recognize a song from a file");
    eprintln!("  stats                  Show database statistics");
    eprintln!("  fingerprint <file>     Generate fingerprints without storing them");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --workers <num>        Worker threads (default: all cores)");
    eprintln!("  --db <path>            Database path (default: DB_PATH env or fingerprints.db)");
}

struct CommonArgs {
    target: Option<PathBuf>,
    db_path: PathBuf,
    workers: usize,
}

fn parse_args(args: &[String]) -> Result<CommonArgs, String> {
    let mut target = None;
    let mut db_path = std::env::var("DB_PATH")
        .ok()
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("fingerprints.db"));
    let mut workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--workers" => {
                let value = iter.next().ok_or("--workers needs a value")?;
                workers = value
                    .parse()
                    .map_err(|_| format!("invalid worker count: {value}"))?;
            }
            "--db" => {
                let value = iter.next().ok_or("--db needs a value")?;
                db_path = PathBuf::from(value);
            }
            other if !other.starts_with("--") && target.is_none() => {
                target = Some(PathBuf::from(other));
            }
            other => return Err(format!("unexpected argument: {other}")),
        }
    }
    Ok(CommonArgs {
        target,
        db_path,
        workers,
    })
}

fn run_register(args: &[String]) -> Result<(), String> {
    let parsed = parse_args(args)?;
    let dir = parsed.target.ok_or("please specify a directory to register")?;
    let engine = Engine::open_with_env(&parsed.db_path).map_err(|err| err.to_string())?;

    println!("Registering songs from: {}", dir.display());
    let started = Instant::now();
    let result = engine
        .register_dir(&dir, parsed.workers)
        .map_err(|err| err.to_string())?;
    let elapsed = started.elapsed().as_millis();

    if result.ok {
        println!("Registration completed successfully in {elapsed} ms");
    } else {
        println!("Registration completed with some errors in {elapsed} ms");
    }
    println!("Inserted {} hashes", result.hashes_inserted);
    print_stats(&engine)
}

fn run_recognize(args: &[String]) -> Result<(), String> {
    let parsed = parse_args(args)?;
    let file = parsed.target.ok_or("please specify a file to recognize")?;
    let engine = Engine::open_with_env(&parsed.db_path).map_err(|err| err.to_string())?;

    let result = engine.recognize(&file).map_err(|err| err.to_string())?;
    print_recognition(&result);
    Ok(())
}

fn print_recognition(result: &RecognizeResult) {
    println!("{}", "=".repeat(50));
    println!("RECOGNITION RESULT");
    println!("{}", "=".repeat(50));
    match &result.song {
        Some(song) => {
            println!("Match found!");
            println!("Artist:  {}", song.artist);
            println!("Album:   {}", song.album);
            println!("Title:   {}", song.title);
            println!("Song ID: {}", song.song_id);
            println!("Score: {}, Matches: {}", result.score, result.match_count);
        }
        None => println!("No match found in database"),
    }
    if !result.candidates.is_empty() {
        println!();
        println!("Top potential matches:");
        for (rank, candidate) in result.candidates.iter().take(10).enumerate() {
            println!(
                "  {}. {} (Score: {}, Matches: {})",
                rank + 1,
                candidate.song_id,
                candidate.score,
                candidate.match_count
            );
        }
    }
    println!("Recognition time: {} ms", result.recognition_ms);
}

fn run_stats(args: &[String]) -> Result<(), String> {
    let parsed = parse_args(args)?;
    let engine = Engine::open_with_env(&parsed.db_path).map_err(|err| err.to_string())?;
    print_stats(&engine)
}

fn print_stats(engine: &Engine) -> Result<(), String> {
    let stats = engine.stats().map_err(|err| err.to_string())?;
    println!("=== Database Statistics ===");
    println!("Total songs:  {}", stats.songs);
    println!("Total hashes: {}", stats.hashes);
    if stats.songs > 0 {
        println!("Average hashes per song: {}", stats.hashes / stats.songs);
    }
    Ok(())
}

fn run_fingerprint(args: &[String]) -> Result<(), String> {
    let parsed = parse_args(args)?;
    let file = parsed.target.ok_or("please specify a file to fingerprint")?;
    let config = EngineConfig::from_env();

    println!("Generating fingerprints for: {}", file.display());
    let started = Instant::now();
    let rows = fingerprint::fingerprint_file(&file, &config).map_err(|err| err.to_string())?;
    let elapsed = started.elapsed().as_millis();

    println!("Generated {} hashes in {elapsed} ms", rows.len());
    for row in rows.iter().take(10) {
        println!("  {:010x} @ {:.3}s", row.hash, row.time_offset);
    }
    Ok(())
}
