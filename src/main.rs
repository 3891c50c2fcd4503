#[macro_use]
extern crate tracing;

use std::env;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use calloop::generic::Generic;
use calloop::signals::{Signal, Signals};
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, Interest, Mode, PostAction};
use clap::Parser;
use directories::BaseDirs;
use page::backend::x11::X11Backend;
use page::page::Page;
use page::utils::spawn;
use page_config::{default_config_path, Config};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: `$XDG_CONFIG_HOME/page/config.kdl`).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// X display to manage (default: `$DISPLAY`).
    #[arg(short, long)]
    display: Option<String>,
    /// Take over from a running window manager.
    #[arg(long)]
    replace: bool,
    /// Parse the config file, report errors and exit.
    #[arg(long)]
    validate: bool,
}

fn main() {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| "page=debug".to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            error!("{err:?}");
            process::exit(1);
        }
    };
    if cli.validate {
        info!("config is valid");
        return;
    }

    if let Err(err) = run(&cli, config) {
        error!("{err:?}");
        process::exit(1);
    }
}

/// An explicitly given config must load; the default one falls back to the built-in config.
fn load_config(cli: &Cli) -> miette::Result<Config> {
    if let Some(path) = &cli.config {
        return Config::load(path);
    }

    let config_home = BaseDirs::new().map(|dirs| dirs.config_dir().to_owned());
    let Some(path) = default_config_path(config_home) else {
        warn!("no config directory, using the default config");
        return Ok(Config::default());
    };
    match Config::load_or_default(&path) {
        Ok(config) => Ok(config),
        Err(err) if cli.validate => Err(err),
        Err(err) => {
            warn!("{err:?}");
            warn!("using the default config");
            Ok(Config::default())
        }
    }
}

fn run(cli: &Cli, config: Config) -> anyhow::Result<()> {
    let mut event_loop: EventLoop<Page<X11Backend>> =
        EventLoop::try_new().context("error creating the event loop")?;
    let handle = event_loop.handle();

    let backend = X11Backend::new(cli.display.as_deref(), cli.replace)?;
    let fd = backend
        .fd()
        .try_clone_to_owned()
        .context("error duplicating the X connection descriptor")?;
    let outputs = backend.outputs();

    let startup = config.exec_on_startup.clone();
    let frame_interval_ms = config.compositor.frame_interval_ms.max(1);
    let frame_interval = Duration::from_millis(u64::from(frame_interval_ms));
    let mut page = Page::new(backend, config, outputs)?;
    info!("managing the display");

    handle
        .insert_source(Generic::new(fd, Interest::READ, Mode::Level), |_, _, page| {
            page.dispatch_events();
            Ok(PostAction::Continue)
        })
        .map_err(|err| anyhow::anyhow!("error watching the X connection: {err}"))?;

    handle
        .insert_source(Timer::from_duration(frame_interval), move |_, _, page| {
            if page.needs_frame() {
                page.render_frame(Instant::now());
            }
            TimeoutAction::ToDuration(frame_interval)
        })
        .map_err(|err| anyhow::anyhow!("error adding the frame timer: {err}"))?;

    let signals = Signals::new(&[Signal::SIGINT, Signal::SIGTERM])
        .context("error listening for signals")?;
    handle
        .insert_source(signals, |event, _, page| {
            info!("got {:?}, quitting", event.signal());
            page.quit();
        })
        .map_err(|err| anyhow::anyhow!("error adding the signal source: {err}"))?;

    for exec in startup {
        spawn(exec.command);
    }

    page.dispatch_events();
    while page.is_running() {
        event_loop
            .dispatch(None, &mut page)
            .context("error dispatching the event loop")?;
        // Replies can pull events into the connection buffer without waking the loop.
        page.dispatch_events();
    }

    page.shutdown();
    info!("exiting");
    Ok(())
}
