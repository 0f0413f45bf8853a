use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use amplia::api::ApiClient;
use amplia::cli::{Flow, Repl};
use amplia::config::ClientConfig;
use amplia::identity::{FileStore, Session};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let cfg = ClientConfig::from_env()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "amplia",
        "Amplia client starting: RUST_LOG='{}', api_url={}, state_dir='{}', page_size={}",
        rust_log, cfg.api_url, cfg.state_dir.display(), cfg.page_size
    );

    let store = FileStore::in_dir(&cfg.state_dir)
        .with_context(|| format!("cannot open session store in {}", cfg.state_dir.display()))?;
    let session = Arc::new(Session::open(Arc::new(store)));
    let api = ApiClient::new(&cfg.api_url, session.clone());
    let mut repl = Repl::new(session, api, cfg.page_size);

    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    println!("amplia interpreter. Type 'help' for commands.");
    loop {
        input.clear();
        print!("{}", repl.prompt());
        let _ = stdout.flush();
        match stdin.lock().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if rt.block_on(repl.run_line(input.trim(), &mut stdout))? == Flow::Quit {
            break;
        }
    }
    Ok(())
}
