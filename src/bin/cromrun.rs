use cromrun::commands;
use cromrun::config::Config;

fn run() -> Result<(), String> {
    let config = Config::from_env().map_err(|err| err.to_string())?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = commands::run_cli(args, &config)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
