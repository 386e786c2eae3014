use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dsm_control::api::{ApiServerBuilder, ApiState};
use dsm_control::{
    Action, CommandRequest, Config, DispatchReport, Dispatcher, DisplayBoard, HttpRpcClient,
    NodeRegistry, OutcomeStatus, RpcClient, Session,
};

/// dsmctl - control and monitor the aircraft's data system modules
#[derive(Parser)]
#[command(name = "dsmctl", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/dsm-control/config.toml)
    #[arg(short, long, env = "DSM_CONFIG")]
    config: Option<PathBuf>,

    /// Host running dsm_server
    #[arg(long)]
    control_host: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the fleet as reported by dsm_server
    List,
    /// Send an action to one or more nodes
    Dispatch {
        /// Action name (Start, Stop, Restart, Quit, List_NCAR_A2Ds, TestVoltage, ...)
        action: String,
        /// Target node ids
        targets: Vec<String>,
        /// Action parameter, repeatable (e.g. -p voltage=5)
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Show the detailed status of one node
    Status {
        /// Node id
        node: String,
    },
    /// Show the clock of every node
    Clocks,
    /// Poll clocks and the selected node's status, printing each refresh
    Watch {
        /// Node to show detailed status for
        #[arg(long)]
        node: Option<String>,
        /// Host this client is on; decides live vs static mode
        #[arg(long, default_value = "localhost")]
        client_host: String,
        /// Force static mode (no periodic refresh)
        #[arg(long = "static")]
        static_mode: bool,
        /// Stop after this many refreshes
        #[arg(long)]
        ticks: Option<u32>,
    },
    /// Serve the HTTP API with background polling
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Host the panel is viewed from; decides live vs static mode
        #[arg(long, default_value = "localhost")]
        client_host: String,
        /// Force static mode (no periodic refresh)
        #[arg(long = "static")]
        static_mode: bool,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

/// Everything a subcommand needs
struct Context {
    config: Config,
    rpc: Arc<dyn RpcClient>,
    registry: NodeRegistry,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,dsm_control=info",
        1 => "info,dsm_control=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(host) = cli.control_host {
        config.registry.control_host = host;
    }
    tracing::debug!(?config, "loaded configuration");

    let rpc: Arc<dyn RpcClient> = Arc::new(HttpRpcClient::new(&config.rpc.path, config.rpc.timeout)?);
    let registry = NodeRegistry::new(config.registry.clone());
    let ctx = Context {
        config,
        rpc,
        registry,
    };

    match cli.command {
        Command::List => cmd_list(&ctx).await,
        Command::Dispatch {
            action,
            targets,
            params,
        } => cmd_dispatch(&ctx, &action, targets, params).await,
        Command::Status { node } => cmd_status(&ctx, node).await,
        Command::Clocks => cmd_clocks(&ctx).await,
        Command::Watch {
            node,
            client_host,
            static_mode,
            ticks,
        } => {
            let periodic = !static_mode && ctx.config.polling.is_periodic(&client_host);
            cmd_watch(&ctx, node, periodic, ticks).await
        }
        Command::Serve {
            port,
            client_host,
            static_mode,
        } => {
            let periodic = !static_mode && ctx.config.polling.is_periodic(&client_host);
            cmd_serve(ctx, port, periodic).await
        }
    }
}

/// Print the fleet listing
async fn cmd_list(ctx: &Context) -> anyhow::Result<ExitCode> {
    let fleet = ctx.registry.list_fleet(ctx.rpc.as_ref()).await?;
    let width = fleet.label_width();

    for node in &fleet {
        let endpoint = ctx.registry.endpoint(node);
        println!("{}  {endpoint}", node.label(width));
    }

    Ok(ExitCode::SUCCESS)
}

/// Send an action and print the consolidated report
async fn cmd_dispatch(
    ctx: &Context,
    action: &str,
    targets: Vec<String>,
    params: Vec<(String, String)>,
) -> anyhow::Result<ExitCode> {
    let action: Action = action.parse()?;
    let mut request = CommandRequest::new(action, targets);
    request.parameters.extend(params);

    let dispatcher = Dispatcher::new(
        Arc::clone(&ctx.rpc),
        ctx.registry.clone(),
        ctx.config.dispatch.max_in_flight,
    );
    let report = dispatcher.dispatch(&request).await?;
    print_report(&report);

    Ok(if report.all_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &DispatchReport) {
    let width = report
        .iter()
        .map(|o| o.node_id.len())
        .max()
        .unwrap_or_default();

    for outcome in report.iter() {
        let detail = match &outcome.status {
            OutcomeStatus::Ok(serde_json::Value::String(s)) => s.clone(),
            OutcomeStatus::Ok(value) => value.to_string(),
            OutcomeStatus::Fault(message) => message.clone(),
            OutcomeStatus::NoResponse => String::new(),
        };
        println!(
            "{:<width$}  {:<11}  {detail}",
            outcome.node_id,
            outcome.status.label()
        );
    }
}

/// Print one node's detailed status
async fn cmd_status(ctx: &Context, node: String) -> anyhow::Result<ExitCode> {
    let board = DisplayBoard::new();
    let session = Session::new(
        Arc::clone(&ctx.rpc),
        ctx.registry.clone(),
        Arc::new(board),
        true,
    );

    match session.select(Some(node)).await? {
        Some(status) => println!("{}", render_status(&status)),
        None => println!("(no status)"),
    }

    Ok(ExitCode::SUCCESS)
}

/// Print every node's clock once
async fn cmd_clocks(ctx: &Context) -> anyhow::Result<ExitCode> {
    let clocks =
        dsm_control::polling::fetch_clocks(ctx.rpc.as_ref(), &ctx.registry.status_endpoint())
            .await?;

    for (id, value) in clocks {
        println!("{id:<12} {value}");
    }

    Ok(ExitCode::SUCCESS)
}

/// Poll in the foreground, printing the board after each period
async fn cmd_watch(
    ctx: &Context,
    node: Option<String>,
    periodic: bool,
    ticks: Option<u32>,
) -> anyhow::Result<ExitCode> {
    // Fail once, clearly, if the control host is down; never retry
    ctx.registry.list_fleet(ctx.rpc.as_ref()).await?;

    let board = DisplayBoard::new();
    let session = Session::new(
        Arc::clone(&ctx.rpc),
        ctx.registry.clone(),
        Arc::new(board.clone()),
        periodic,
    );

    session.select(node).await?;
    print_board(&board).await;

    if !periodic {
        println!("(static page: run again to refresh)");
        return Ok(ExitCode::SUCCESS);
    }

    let period = ctx.config.polling.period;
    let handle = session
        .poller(ctx.config.polling.detail_every)
        .start(period, true);

    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    let mut printed = 0u32;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                print_board(&board).await;
                printed += 1;
                if ticks.is_some_and(|n| printed >= n) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.stop();
    handle.join().await;

    Ok(ExitCode::SUCCESS)
}

async fn print_board(board: &DisplayBoard) {
    let state = board.snapshot().await;
    for (id, value) in &state.clocks {
        println!("{id:<12} {value}");
    }
    if let Some(status) = &state.status {
        println!("{}", render_status(status));
    }
    println!("---");
}

fn render_status(status: &serde_json::Value) -> String {
    match status {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Serve the API with the poller running behind it
async fn cmd_serve(ctx: Context, port: Option<u16>, periodic: bool) -> anyhow::Result<ExitCode> {
    // Fail once, clearly, if the control host is down; never retry
    let fleet = ctx.registry.list_fleet(ctx.rpc.as_ref()).await?;
    tracing::info!(nodes = fleet.len(), periodic, "control host reachable");

    let board = DisplayBoard::new();
    let session = Session::new(
        Arc::clone(&ctx.rpc),
        ctx.registry.clone(),
        Arc::new(board.clone()),
        periodic,
    );
    let poller = session
        .poller(ctx.config.polling.detail_every)
        .start(ctx.config.polling.period, periodic);

    let dispatcher = Dispatcher::new(
        Arc::clone(&ctx.rpc),
        ctx.registry.clone(),
        ctx.config.dispatch.max_in_flight,
    );
    let state = Arc::new(ApiState {
        rpc: ctx.rpc,
        registry: ctx.registry,
        dispatcher,
        session,
        board,
    });

    let port = port.unwrap_or(ctx.config.api_server.port);
    let server = ApiServerBuilder::new(state, port).spawn();

    tokio::select! {
        result = server => result??,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    poller.stop();
    poller.join().await;

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_val_splits_on_first_equals() {
        assert_eq!(
            parse_key_val("device=/dev/ncar_a2d0").unwrap(),
            ("device".to_string(), "/dev/ncar_a2d0".to_string())
        );
        assert_eq!(
            parse_key_val("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("voltage").is_err());
    }

    #[test]
    fn cli_parses_dispatch() {
        let cli = Cli::try_parse_from([
            "dsmctl", "dispatch", "TestVoltage", "dsm319", "-p", "voltage=0",
        ])
        .unwrap();
        match cli.command {
            Command::Dispatch {
                action,
                targets,
                params,
            } => {
                assert_eq!(action, "TestVoltage");
                assert_eq!(targets, ["dsm319"]);
                assert_eq!(params, [("voltage".to_string(), "0".to_string())]);
            }
            _ => panic!("expected dispatch"),
        }
    }
}
