use std::fs;
use std::process;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use lark_core::{Error, Session, SessionOptions};

fn make_session() -> Result<Session, Error> {
    Session::new(SessionOptions {
        output: Some(Box::new(|line: &str| println!("{line}"))),
        ..SessionOptions::default()
    })
}

fn repl() -> Result<(), Box<dyn std::error::Error>> {
    let mut sess = make_session()?;
    let mut rl = DefaultEditor::new()?;

    println!("lark {}", env!("CARGO_PKG_VERSION"));
    println!("Type expressions to evaluate, (exit) or Ctrl-D to quit");
    println!();

    loop {
        match rl.readline(&format!("{}=> ", sess.current_ns())) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "(exit)" || input == "exit" {
                    break;
                }
                let _ = rl.add_history_entry(input);
                match sess.evaluate(input) {
                    Ok(result) => println!("{result}"),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn run_files(paths: &[String]) -> Result<(), String> {
    let mut sess = make_session().map_err(|e| e.to_string())?;
    let mut last = None;
    for path in paths {
        let contents =
            fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))?;
        log::debug!("running {path}");
        let result = sess
            .load_file(&contents, None)
            .map_err(|e| format!("{path}: {e}"))?;
        last = Some(result);
    }
    if let Some(result) = last {
        println!("{result}");
    }
    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  lark                Start interactive REPL");
    eprintln!("  lark <file.clj>...  Run source files in one session");
    eprintln!("  lark --help         Show this help message");
}

fn main() {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    if args.is_empty() {
        if let Err(e) = repl() {
            eprintln!("{e}");
            process::exit(1);
        }
    } else if let Err(e) = run_files(&args) {
        eprintln!("{e}");
        process::exit(1);
    }
}
