mod cli;

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use barec_compiler::{Config, compile};
use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let base = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    let config = cli.apply(base);

    let (source, filename) = read_schema(cli)?;
    let generated = compile(&source, &filename, &config)
        .map_err(|err| err.render(&source, cli.color.should_colorize()))?;

    match &cli.out {
        Some(path) => fs::write(path, generated)
            .map_err(|err| format!("cannot write '{}': {err}", path.display())),
        None => {
            print!("{generated}");
            Ok(())
        }
    }
}

fn load_config(path: &Path) -> Result<Config, String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("cannot read '{}': {err}", path.display()))?;
    serde_json::from_str(&text)
        .map_err(|err| format!("invalid config '{}': {err}", path.display()))
}

fn read_schema(cli: &Cli) -> Result<(String, String), String> {
    match cli.schema.as_deref() {
        Some(path) if path != Path::new("-") => {
            let source = fs::read_to_string(path)
                .map_err(|err| format!("cannot read '{}': {err}", path.display()))?;
            Ok((source, path.display().to_string()))
        }
        _ => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .map_err(|err| format!("cannot read stdin: {err}"))?;
            Ok((source, "<stdin>".to_string()))
        }
    }
}
