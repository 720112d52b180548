use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::signal;
use zen_switch::config::{Config, load_dotenv};
use zen_switch::native::{Action, HandleId, SoftEngine};
use zen_switch::switch::{StateEvent, Switch, SwitchCommand, SwitchFactory, parse_assignment};

#[derive(Parser, Debug)]
#[command(name = "zswitch", about = "Drive software switches from the command line")]
struct Args {
    /// JSON file with switch definitions
    #[arg(long, env = "ZSWITCH_CONFIG")]
    config: Option<PathBuf>,

    /// Command to apply, as <id>=<ON|OFF|TOGGLE>; may be repeated
    #[arg(long = "command", value_parser = parse_assignment)]
    commands: Vec<(String, SwitchCommand)>,

    /// Keep running engine timers for this long after the commands
    #[arg(long, default_value_t = 0)]
    run_for_ms: u64,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// State handler backing each switch with an in-memory relay.
fn relay_handler(act: Action, state: &mut StateEvent, relay: &Arc<AtomicBool>) -> bool {
    let id = state.thing.as_ref().map_or("?", |t| t.id());
    match act {
        Action::Set => {
            info!("[relay] '{}' -> {}", id, state.value);
            relay.store(state.value.is_on(), Ordering::SeqCst);
        }
        Action::Get => {
            state.value = relay.load(Ordering::SeqCst).into();
        }
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    load_dotenv();
    init_logger();
    info!("Starting zswitch");

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("zswitch stopped");
}

async fn run(args: Args) -> zen_switch::Result<()> {
    let config = Config::load(args.config.as_deref())?;
    info!("Configuration loaded:");
    info!("  Switches: {}", config.switches.len());
    info!("  Timer tick: {} ms", config.tick_ms);

    let engine = Arc::new(SoftEngine::new());
    engine.on_state_updated(Arc::new(|handle: HandleId, on: bool| {
        info!("State of {} updated to {}", handle, if on { "ON" } else { "OFF" });
    }));

    let factory = SwitchFactory::new(engine.clone());
    factory.on_create_subscribe(|switch: &Switch| {
        info!("  - '{}' ready ({})", switch.id(), switch.handle_id());
        Ok(())
    });

    let mut switches = Vec::with_capacity(config.switches.len());
    for def in &config.switches {
        let switch = factory.create(&def.id, Some(def.config))?;
        if !switch.set_state_handler(relay_handler, Arc::new(AtomicBool::new(false))) {
            warn!("Could not attach a state handler to '{}'", def.id);
        }
        switches.push(switch);
    }

    for (id, command) in &args.commands {
        let Some(switch) = switches.iter().find(|s| s.id() == id) else {
            warn!("Unknown switch '{}'", id);
            continue;
        };
        let accepted = switch.execute(*command);
        info!(
            "{} '{}': {} (now {})",
            command,
            id,
            if accepted { "accepted" } else { "rejected" },
            switch.get_state()
        );
    }

    if args.run_for_ms > 0 {
        let deadline = tokio::time::sleep(Duration::from_millis(args.run_for_ms));
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(Duration::from_millis(config.tick_ms.max(1)));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    engine.run_timers(Instant::now());
                }
                _ = &mut deadline => break,
                result = signal::ctrl_c() => {
                    match result {
                        Ok(()) => info!("Received shutdown signal"),
                        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                    }
                    break;
                }
            }
        }
    }

    for switch in switches {
        switch.close();
    }
    Ok(())
}
