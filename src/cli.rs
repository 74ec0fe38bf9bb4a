//! Command-line interface and REPL

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;

/// REPL commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    Status,
    Ports,
    /// Rebind the device output to the first port matching the pattern
    Output(String),
    /// Rebind the device input to the first port matching the pattern
    Input(String),
    Dump,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "" => return Ok(None),
            "start" => Command::Start,
            "stop" => Command::Stop,
            "toggle" | "t" => Command::Toggle,
            "status" | "s" => Command::Status,
            "ports" => Command::Ports,
            "dump" => Command::Dump,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "output" | "input" if rest.is_empty() => {
                return Err(format!("usage: {} <port name pattern>", word));
            }
            "output" => Command::Output(rest.to_string()),
            "input" => Command::Input(rest.to_string()),
            other => return Err(format!("unknown command '{}' (try 'help')", other)),
        };
        Ok(Some(command))
    }
}

pub const HELP: &str = "\
Commands:
  start             enter editor mode (patch dump, then live reporting)
  stop              leave editor mode (final patch dump)
  toggle, t         start or stop
  status, s         session state and traffic counters
  dump              request a patch dump now
  ports             list MIDI ports
  output <pattern>  rebind the device output
  input <pattern>   rebind the device input
  quit, exit, q     stop the session and exit";

/// Read lines on a dedicated thread and forward parsed commands.
///
/// rustyline blocks, so it must stay off the async runtime. End of input or
/// Ctrl+D sends [`Command::Quit`].
pub fn spawn_repl(tx: mpsc::Sender<Command>) -> Result<std::thread::JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("repl".to_string())
        .spawn(move || {
            if let Err(e) = run_repl(&tx) {
                eprintln!("readline error: {}", e);
            }
            let _ = tx.blocking_send(Command::Quit);
        })?;

    Ok(handle)
}

fn run_repl(tx: &mpsc::Sender<Command>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("anyma> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => return Ok(()),
                    Ok(Some(command)) => {
                        if tx.blocking_send(command).is_err() {
                            return Ok(());
                        }
                    }
                    Ok(None) => {}
                    Err(message) => println!("{}", message),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}
