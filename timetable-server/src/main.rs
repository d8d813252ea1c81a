use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::info;
use miette::{IntoDiagnostic, Result};
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use timetable_server::{demo::DemoBridge, web::Web, Cli, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    info!("Timetable server {} starting", VERSION);

    let bridge = Arc::new(DemoBridge::new());
    bridge.set_loaded(!args.start_unloaded);
    let web = Web::new(bridge, &args);

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("Web", move |s| web.run(s)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await
    .into_diagnostic()
}
