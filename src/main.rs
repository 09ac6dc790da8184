mod application;
mod domain;
mod infrastructure;
mod ui;
mod utils;

use crossterm::event::{self, Event, KeyEventKind};
use std::env;
use std::io;
use std::time::Duration;

use crate::application::app::App;
use crate::application::cli::{api_help, run_api};
use crate::application::input::handle_key;
use crate::ui::tui::{Tui, restore_terminal, setup_terminal};
use crate::ui::ui;
use crate::utils::version::build_version;

fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    crate::log!("tsheet {} started with {:?}", build_version(), args.iter().skip(1).collect::<Vec<_>>());
    match args.get(1).map(String::as_str) {
        None | Some("tui") => run_tui(),
        Some("api") => {
            if let Err(error) = run_api(&args[2..]) {
                eprintln!("{error}");
                std::process::exit(1);
            }
            Ok(())
        }
        Some("-V") | Some("--version") | Some("version") => {
            println!("tsheet {}", build_version());
            Ok(())
        }
        Some("-h") | Some("--help") | Some("help") => {
            print_help(&args[0]);
            Ok(())
        }
        Some(other) => {
            eprintln!("Comando desconocido: {other}\n");
            print_help(&args[0]);
            std::process::exit(1);
        }
    }
}

fn run_tui() -> io::Result<()> {
    let app = App::new().map_err(io::Error::other)?;
    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, app);
    restore_terminal(&mut terminal)?;
    result
}

fn print_help(bin: &str) {
    println!(
        "Uso:\n  {bin} tui\n  {bin} api <subcomando>\n  {bin} version\n\nSubcomandos API:\n{}",
        api_help()
    );
}

fn run_app(terminal: &mut Tui, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|frame| ui(frame, &mut app))?;

        app.check_background_load();

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(&mut app, key.code, key.modifiers) {
                    return Ok(());
                }
            }
        }
    }
}
