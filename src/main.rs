use std::sync::Arc;

use clap::Parser;
use warp::Filter;

use jukebox_relay::clock::SystemClock;
use jukebox_relay::cmdline::Opts;
use jukebox_relay::room_server::RoomServer;
use jukebox_relay::web;

#[tokio::main]
async fn main() {
    env_logger::init();
    let opts = Opts::parse();

    let server = RoomServer::new(Arc::new(SystemClock));
    let routes = web::routes(server, opts.static_dir.clone());

    log::info!(
        "jukebox-relay {} listening on {}:{}",
        env!("CARGO_PKG_VERSION"),
        opts.listen_addr,
        opts.port
    );
    warp::serve(routes.with(warp::log("jukebox_relay")))
        .run((opts.listen_addr, opts.port))
        .await;
}
