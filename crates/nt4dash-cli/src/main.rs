//! `nt4dash` – runs the NT4 dashboard asset server.
//!
//! 1. Initialises logging (and OTLP export when configured).
//! 2. Loads `~/.nt4dash/config.toml` plus `NT4DASH_*` overrides.
//! 3. Serves `deploy_dir/asset_subdir` and the embedded client module
//!    until **Ctrl-C**, then stops the server and releases the port.

mod args;
mod config;
mod telemetry;

use clap::Parser;
use colored::Colorize;
use nt4dash_bootstrap::{HttpModuleSource, ModuleSource, fetch_verified};
use nt4dash_server::DashboardServer;
use nt4dash_types::DashError;
use tokio::sync::mpsc;
use tracing::{info, warn};

use args::{Cli, Commands, ServeArgs};
use config::Config;

fn main() {
    let _guard = telemetry::init_tracing("nt4dash");
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {e}", "Failed to start runtime".red());
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli)) {
        eprintln!("{}: {e}", "Error".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), DashError> {
    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => serve(args).await,
        Commands::Probe { url } => probe(url).await,
        Commands::InitConfig { force } => init_config(force),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// serve
// ─────────────────────────────────────────────────────────────────────────────

fn apply_serve_args(cfg: &mut Config, args: ServeArgs) {
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if let Some(addr) = args.interface {
        cfg.bind_address = addr;
    }
    if let Some(dir) = args.deploy_dir {
        cfg.deploy_dir = dir;
    }
}

async fn serve(args: ServeArgs) -> Result<(), DashError> {
    let mut cfg = config::load()?;
    apply_serve_args(&mut cfg, args);
    print_banner();

    let root = cfg.asset_root();
    let handle = DashboardServer::new(root.dir())
        .with_bind_address(cfg.bind_address)
        .with_port(cfg.port)
        .with_page_config(cfg.page_config())
        .start()
        .await?;

    println!(
        "  Serving {} on {}",
        root.dir().display().to_string().bold(),
        format!("http://{}", handle.local_addr()).cyan()
    );
    println!(
        "  Client {} → NT4 server {}",
        cfg.client_name.bold(),
        cfg.target_address.bold()
    );
    println!("  Press {} to stop.\n", "Ctrl-C".bold());

    wait_for_ctrl_c().await;

    println!();
    println!("{}", "⚠  Ctrl-C received – stopping dashboard server …".yellow().bold());
    handle.stop().await?;
    println!("{}", "  ✓ Port released.".green());
    info!("dashboard server stopped");
    Ok(())
}

async fn wait_for_ctrl_c() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = tx.send(());
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; using tokio signal");
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        return;
    }
    rx.recv().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// probe
// ─────────────────────────────────────────────────────────────────────────────

async fn probe(url: Option<String>) -> Result<(), DashError> {
    let cfg = config::load()?;
    let base = url.unwrap_or_else(|| format!("http://localhost:{}", cfg.port));
    let source = HttpModuleSource::new(base);

    print!("  Probing {} … ", source.describe().dimmed());
    match fetch_verified(&source).await {
        Ok(bytes) => {
            println!("{} ({} bytes)", "ok".green(), bytes.len());
            Ok(())
        }
        Err(e) => {
            println!("{}", "failed".red());
            Err(e)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// init-config
// ─────────────────────────────────────────────────────────────────────────────

fn init_config(force: bool) -> Result<(), DashError> {
    let path = config::config_path();
    if path.exists() && !force {
        println!(
            "  Config already exists at {} (use {} to overwrite).",
            path.display().to_string().bold(),
            "--force".bold()
        );
        return Ok(());
    }
    config::save_to(&Config::default(), &path)?;
    println!("  {} {}", "✓ Wrote".green(), path.display().to_string().bold());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"        _   _  _     _          _    "#.bold().cyan());
    println!("{}", r#"  _ _  | |_| || |  __| |__ _ ___| |_  "#.bold().cyan());
    println!("{}", r#" | ' \ |  _|__   _/ _` / _` (_-<| ' \ "#.bold().cyan());
    println!("{}", r#" |_||_| \__|  |_| \__,_\__,_/__/|_||_|"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "nt4dash".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  NT4 Dashboard Server");
    println!();
}
