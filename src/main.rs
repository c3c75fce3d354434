// src/main.rs

use scriptrun::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(None) => {}
        Ok(Some(signal)) => signal.exit(),
        Err(err) => {
            eprintln!("scriptrun error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<Option<scriptrun::ExitSignal>> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
