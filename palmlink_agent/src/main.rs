use anyhow::Context;
use clap::Parser;
use palmlink_agent::control_api;
use palmlink_agent::dispatch::{
    CommandSink, DiscardSink, Dispatcher, KeyComboWorkspace, WorkspaceActions,
};
use palmlink_agent::executor::ExecutorProcess;
use palmlink_agent::main_loop::MainLoop;
use palmlink_agent::net::{self, ControllerLink, HostLink};
use palmlink_agent::router::{Role, RoleRouter};
use palmlink_tracker::{ClassifierConfig, EmitterConfig, JsonlFrameSource, Pipeline};
use std::fs::File;
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

const HOST_IDLE_TICK: Duration = Duration::from_millis(10);

#[derive(Parser, Debug)]
#[command(name = "palmlink", about = "Hand-gesture device control agent")]
struct Args {
    /// Device role: standalone, host, or controller.
    #[arg(long, default_value = "standalone")]
    role: String,

    /// Peer listen address (host role).
    #[arg(long, default_value = "0.0.0.0:9010")]
    listen: String,

    /// Host address to connect to (controller role).
    #[arg(long)]
    connect: Option<String>,

    /// Workspace-control endpoint bind address (host role).
    #[arg(long, default_value = "127.0.0.1:3000")]
    control_addr: SocketAddr,

    /// Pointer-executor command line (host/standalone roles).
    #[arg(long, default_value = "swift mouse_control.swift")]
    executor: String,

    /// Landmark frame stream: `-` for stdin, a file path, or `none` for
    /// an event-only host. Defaults to `none` for a host and `-`
    /// otherwise.
    #[arg(long)]
    frames: Option<String>,

    #[arg(long, default_value_t = 1920.0)]
    screen_width: f64,

    #[arg(long, default_value_t = 1080.0)]
    screen_height: f64,

    /// Swipe delta threshold in app space.
    #[arg(long, default_value_t = 0.04)]
    swipe_threshold: f32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let role: Role = args.role.parse()?;

    let emitter_config = EmitterConfig {
        screen_width: args.screen_width,
        screen_height: args.screen_height,
        swipe_threshold: args.swipe_threshold,
        ..EmitterConfig::default()
    };
    let pipeline = Pipeline::new(ClassifierConfig::default(), emitter_config);

    let (events_tx, events_rx) = net::event_channel();
    let mut router = RoleRouter::new(role);
    let mut host_link: Option<HostLink> = None;
    let mut controller_link: Option<ControllerLink> = None;

    match role {
        Role::Host => {
            let link = HostLink::spawn(&args.listen, events_tx.clone())?;
            info!(addr = %link.listen_addr(), "waiting for a controller");
            host_link = Some(link);
        }
        Role::Controller => {
            let addr = args
                .connect
                .as_deref()
                .context("--connect <host:port> is required for the controller role")?;
            let link = ControllerLink::spawn(addr, events_tx.clone())?;
            router.attach_peer(link.handle());
            controller_link = Some(link);
        }
        Role::Standalone | Role::None => {}
    }
    drop(events_tx);

    let mut sink: Box<dyn CommandSink> = match role {
        Role::Controller | Role::None => Box::new(DiscardSink),
        Role::Standalone | Role::Host => {
            let workspace: Arc<dyn WorkspaceActions> = Arc::new(KeyComboWorkspace);
            if role == Role::Host {
                let (control_addr, _server) =
                    control_api::spawn(args.control_addr, Arc::clone(&workspace))?;
                info!(addr = %control_addr, "workspace-control endpoint up");
            }
            let command: Vec<String> = args
                .executor
                .split_whitespace()
                .map(str::to_string)
                .collect();
            let executor = ExecutorProcess::spawn(&command)?;
            Box::new(Dispatcher::new(executor, workspace))
        }
    };

    let frames = args.frames.clone().unwrap_or_else(|| match role {
        Role::Host => "none".to_string(),
        _ => "-".to_string(),
    });

    let mut main_loop = MainLoop::new(pipeline, router, Some(events_rx));

    match frames.as_str() {
        // Event-only host: nothing local to classify, just pump the link.
        "none" => loop {
            main_loop.tick(None, Instant::now(), sink.as_mut());
            thread::sleep(HOST_IDLE_TICK);
        },
        "-" => {
            let mut source = JsonlFrameSource::new(io::stdin().lock());
            main_loop.run(&mut source, sink.as_mut())?;
        }
        path => {
            let file =
                File::open(path).with_context(|| format!("opening frame stream {path}"))?;
            let mut source = JsonlFrameSource::new(BufReader::new(file));
            main_loop.run(&mut source, sink.as_mut())?;
        }
    }

    if let Some(link) = controller_link {
        link.shutdown();
    }
    if let Some(link) = host_link {
        link.shutdown();
    }
    Ok(())
}
