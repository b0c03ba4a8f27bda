use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

/// Self-hosted ephemeral collaborative music session server.
#[derive(Parser)]
#[command(version)]
pub struct Opts {
    /// Port to listen on.
    #[arg(long, default_value_t = 15230)]
    pub port: u16,
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub listen_addr: IpAddr,
    /// Directory of static client assets.
    #[arg(long, default_value = "public")]
    pub static_dir: PathBuf,
}
