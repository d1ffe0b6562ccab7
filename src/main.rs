use atble_listener::app::{self, Options};
use atble_listener::driver::replay::ReplayDriver;
use atble_listener::session::StopFlag;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader};
use std::panic::{self, PanicHookInfo};

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    // Clean exit codes for process managers that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();

    let stop = StopFlag::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.stop();
            }
        });
    }

    let mut out = io::stdout();
    let mut err = io::stderr();

    let result = match options.replay.clone() {
        Some(path) => match File::open(&path) {
            Ok(file) => {
                let driver = ReplayDriver::new(BufReader::new(file), stop.clone());
                app::run_with_io(options, driver, stop, &mut out, &mut err).await
            }
            Err(e) => {
                eprintln!("error: cannot open {}: {}", path.display(), e);
                std::process::exit(EXIT_ERROR);
            }
        },
        None => {
            let driver = ReplayDriver::new(BufReader::new(io::stdin()), stop.clone());
            app::run_with_io(options, driver, stop, &mut out, &mut err).await
        }
    };

    match result {
        Ok(_) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            eprintln!("error: {}", why);
            std::process::exit(EXIT_ERROR);
        }
    }
}
