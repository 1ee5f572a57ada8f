use std::fs::OpenOptions;
use std::io::{stdin, stdout};
use std::path::PathBuf;
use std::process::ExitCode;

use bedrock::bus::Bus;
use bedrock::disk::DiskController;
use bedrock::error::BedrockError;
use bedrock::machine::Machine;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("bedrock: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), BedrockError> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "-v" || a == "--trace");
    let positional: Vec<&String> = args[1..]
        .iter()
        .filter(|a| a.as_str() != "-v" && a.as_str() != "--trace")
        .collect();

    if positional.len() != 2 {
        eprintln!("usage: bedrock [-v] <disk0-path> <disk1-path>");
        eprintln!("       pass -- for a slot to leave it unattached");
        return Err(BedrockError::ArgCount);
    }

    let disk0 = open_disk(0, positional[0])?;
    let disk1 = open_disk(1, positional[1])?;

    let bus = Bus::new(stdin().lock(), stdout().lock());
    let mut machine = Machine::new(disk0, disk1, bus);

    if verbose {
        eprintln!("bedrock: starting at pc=0x0000");
    }
    machine.run()?;
    if verbose {
        eprintln!("bedrock: halted");
    }
    Ok(())
}

fn open_disk(slot: u8, path: &str) -> Result<DiskController, BedrockError> {
    if path == "--" {
        return Ok(DiskController::absent());
    }
    let path = PathBuf::from(path);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|_| BedrockError::DiskPath { slot, path: path.clone() })?;
    Ok(DiskController::attach(Box::new(file))?)
}
