// Core modules for the basalt data server
pub mod protocol; // RESP parser + encoders + Cmd enum + CommandError
pub mod storage; // Keyspace + Value tagged union
pub mod trie; // Trie (r*) engine: ordered field/value map
pub mod heap; // Heap (q*) engine: keyed min-priority queue
pub mod fts; // FTS (d*) engine: inverted-index document store
pub mod shard; // Shard::exec (command execution + router)
pub mod net; // mio event loop: TCP + Unix socket connection loop
pub mod cli; // command-line argument parsing

pub use cli::Args;
pub use fts::Fts;
pub use heap::Heap;
pub use net::run_server;
pub use protocol::*;
pub use shard::Shard;
pub use storage::{Keyspace, Value};
pub use trie::Trie;

/// Default TCP listen host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default TCP listen port.
pub const DEFAULT_PORT: u16 = 6000;
/// Default Unix domain socket path.
pub const DEFAULT_SOCKET: &str = "/tmp/rhino-rox.sock";
