//! Interactive prompt for the chocolate bar dataset

use std::path::PathBuf;

use chocdb::{
    command::Command,
    dataset,
    error::Result,
    output::{barplot, format_result},
    sql::engine::{Engine, Session, kv::KVEngine},
    storage::memory::MemoryEngine,
};
use clap::Parser;
use rustyline::{DefaultEditor, error::ReadlineError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const HELP: &str = include_str!("../help.txt");
const PROMPT: &str = "Enter a command: ";

#[derive(Parser)]
#[command(name = "chocdb")]
#[command(about = "Query chocolate bar ratings with short token commands")]
struct Args {
    /// Directory holding bars.csv and countries.csv
    #[arg(short, long, env = "CHOCDB_DATA", default_value = "data")]
    data_dir: PathBuf,
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chocdb=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let engine = KVEngine::new(MemoryEngine::new());
    dataset::load(&engine, &args.data_dir)?;
    let mut session = engine.session()?;

    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" => break,
            "help" => println!("{HELP}"),
            _ => {
                editor.add_history_entry(line)?;
                if let Err(err) = run(&mut session, line) {
                    println!("Command not recognized: {line}");
                    println!("{err}");
                }
            }
        }
        println!();
    }
    println!("bye");
    Ok(())
}

/// Runs one command and prints its table or chart
fn run<E: Engine + 'static>(session: &mut Session<E>, line: &str) -> Result<()> {
    let command = Command::parse(line)?;
    let sql = command.to_sql();
    debug!(%sql, "compiled command");
    let result = session.execute(&sql)?;
    if command.barplot {
        print!("{}", barplot(&result, command.chart_column())?);
    } else {
        println!("{}", format_result(&result));
    }
    Ok(())
}
