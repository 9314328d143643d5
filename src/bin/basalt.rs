/*!
 * basalt server entry point
 *
 * Parses CLI arguments, wires up logging, and runs the event loop. Blocks
 * until the process is killed.
 */

use anyhow::Result;
use basalt::cli::Args;
use basalt::{net, DEFAULT_HOST};
use clap::Parser;
use std::net::ToSocketAddrs;
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let tcp_addr = (DEFAULT_HOST, args.port)
        .to_socket_addrs()?
        .next()
        .expect("resolving a literal host/port always yields an address");
    let unix_path = PathBuf::from(&args.socket);

    net::run_server(tcp_addr, &unix_path)
}
