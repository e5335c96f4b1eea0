use clap::{ArgMatches, CommandFactory, FromArgMatches};
use strest_cluster::args::{ClusterArgs, Command};
use strest_cluster::config::{apply_config, load_config, resolve_settings};
use strest_cluster::controller::{Controller, SharedStores};
use strest_cluster::domain::AgentRecord;
use strest_cluster::error::AppResult;
use strest_cluster::logger::init_logging;
use strest_cluster::shutdown::{setup_signal_shutdown_handler, shutdown_channel};

pub(crate) fn run() -> AppResult<()> {
    let (args, matches) = parse_args()?;

    init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args, &matches))
}

fn parse_args() -> AppResult<(ClusterArgs, ArgMatches)> {
    let matches = ClusterArgs::command().get_matches();
    let args = ClusterArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}

async fn run_async(mut args: ClusterArgs, matches: &ArgMatches) -> AppResult<()> {
    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(&mut args, matches, &config)?;
    }
    let settings = resolve_settings(&args)?;
    let command = args.command.take().unwrap_or(Command::Run);

    let stores = SharedStores::open(&settings).await?;
    let controller = Controller::new(settings, stores);
    let manager = controller.manager();

    match command {
        Command::Run => {
            let (shutdown_tx, _) = shutdown_channel();
            let signals = setup_signal_shutdown_handler(&shutdown_tx);
            let result = controller.run(&shutdown_tx).await;
            signals.abort();
            result
        }
        Command::List(list) => {
            let records = if list.all {
                manager.all_agent_records().await?
            } else {
                manager.local_agent_records().await?
            };
            print_records(&records);
            Ok(())
        }
        Command::Stop(target) => {
            let posted = manager.stop_agent_by_id(target.id).await?;
            print_request_result("stop", target.id, posted);
            Ok(())
        }
        Command::Share(target) => {
            let posted = manager.request_share_monitoring(target.id).await?;
            print_request_result("share", target.id, posted);
            Ok(())
        }
        Command::Snapshot(target) => {
            let snapshot = manager.snapshot(&target.ip, &target.name).await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        Command::Capacity(target) => {
            for (region, available) in manager.available_agents(&target.user).await? {
                println!("{}: {}", region, available);
            }
            Ok(())
        }
    }
}

fn print_records(records: &[AgentRecord]) {
    println!(
        "{:>6}  {:<15}  {:<20}  {:>5}  {:<24}  {:<12}  {}",
        "id", "ip", "name", "port", "region", "status", "approved"
    );
    for record in records {
        let id = record
            .id
            .map_or_else(|| "-".to_owned(), |id| id.to_string());
        let region = record.region.to_string();
        println!(
            "{:>6}  {:<15}  {:<20}  {:>5}  {:<24}  {:<12}  {}",
            id,
            record.ip,
            record.name,
            record.port,
            region,
            record.status.as_str(),
            record.approved
        );
    }
}

fn print_request_result(action: &str, id: i64, posted: bool) {
    if posted {
        println!("Posted {} request for agent {}.", action, id);
    } else {
        eprintln!("No {} request posted: unknown agent {} or cache unavailable.", action, id);
    }
}
