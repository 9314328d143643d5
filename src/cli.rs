//! Command-line arguments.

use clap::Parser;

use crate::{DEFAULT_PORT, DEFAULT_SOCKET};

#[derive(Debug, Parser)]
#[command(name = "basalt")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TCP port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Unix domain socket path to listen on.
    #[arg(short, long, default_value_t = DEFAULT_SOCKET.to_string())]
    pub socket: String,
}
