/*!
 * Network layer and event loop
 *
 * A single-threaded mio event loop serving both a TCP listener and a Unix
 * domain socket listener against one shared `Shard`. Every command is
 * executed inline on the poll thread as soon as it is fully parsed, so two
 * commands pipelined back-to-back on the same connection are always
 * answered in the order they arrived — offloading execution to a worker
 * pool (as a sharded design would) cannot make that guarantee once more
 * than one worker can run concurrently, so this server does not shard.
 */

use crate::protocol::parse_many;
use crate::shard::Shard;
use anyhow::Result;
use bytes::BytesMut;
use hashbrown::HashMap;
use mio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use mio::{Events, Interest, Poll, Token};
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Size of read buffer for incoming data.
const READ_BUF: usize = 4096;

const TCP_LISTENER: Token = Token(0);
const UNIX_LISTENER: Token = Token(1);
const FIRST_CLIENT: usize = 2;

enum Conn {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl Conn {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Conn::Tcp(s) => s.read(buf),
            Conn::Unix(s) => s.read(buf),
        }
    }

    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Conn::Tcp(s) => s.write(buf),
            Conn::Unix(s) => s.write(buf),
        }
    }
}

struct Client {
    conn: Conn,
    rbuf: BytesMut,
    wbuf: BytesMut,
}

/// Run the server: bind `tcp_addr` and `unix_path`, then serve connections on
/// both until the process is killed. A stale socket file left over from a
/// previous run is removed before binding.
pub fn run_server(tcp_addr: SocketAddr, unix_path: &Path) -> Result<()> {
    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(1024);

    let mut tcp_listener = TcpListener::bind(tcp_addr)?;
    poll.registry()
        .register(&mut tcp_listener, TCP_LISTENER, Interest::READABLE)?;

    if unix_path.exists() {
        std::fs::remove_file(unix_path)?;
    }
    let mut unix_listener = UnixListener::bind(unix_path)?;
    poll.registry()
        .register(&mut unix_listener, UNIX_LISTENER, Interest::READABLE)?;

    let mut shard = Shard::new();
    let mut clients: HashMap<usize, Client> = HashMap::new();
    let mut next_tok: usize = FIRST_CLIENT;

    log::info!("basalt listening on tcp://{tcp_addr} and unix://{}", unix_path.display());

    loop {
        poll.poll(&mut events, Some(Duration::from_millis(200)))?;

        for ev in events.iter() {
            match ev.token() {
                TCP_LISTENER => loop {
                    match tcp_listener.accept() {
                        Ok((mut sock, peer)) => {
                            sock.set_nodelay(true).ok();
                            let tok = next_tok;
                            next_tok += 1;
                            poll.registry().register(
                                &mut sock,
                                Token(tok),
                                Interest::READABLE | Interest::WRITABLE,
                            )?;
                            log::debug!("accepted tcp connection {peer} as token {tok}");
                            clients.insert(
                                tok,
                                Client {
                                    conn: Conn::Tcp(sock),
                                    rbuf: BytesMut::with_capacity(READ_BUF),
                                    wbuf: BytesMut::new(),
                                },
                            );
                        }
                        Err(ref e) if would_block(e) => break,
                        Err(e) => {
                            log::warn!("tcp accept error: {e}");
                            break;
                        }
                    }
                },

                UNIX_LISTENER => loop {
                    match unix_listener.accept() {
                        Ok((mut sock, _)) => {
                            let tok = next_tok;
                            next_tok += 1;
                            poll.registry().register(
                                &mut sock,
                                Token(tok),
                                Interest::READABLE | Interest::WRITABLE,
                            )?;
                            log::debug!("accepted unix connection as token {tok}");
                            clients.insert(
                                tok,
                                Client {
                                    conn: Conn::Unix(sock),
                                    rbuf: BytesMut::with_capacity(READ_BUF),
                                    wbuf: BytesMut::new(),
                                },
                            );
                        }
                        Err(ref e) if would_block(e) => break,
                        Err(e) => {
                            log::warn!("unix accept error: {e}");
                            break;
                        }
                    }
                },

                Token(t) => {
                    let should_remove = service_client(&mut shard, &mut clients, t, &ev);
                    if should_remove {
                        clients.remove(&t);
                    }
                }
            }
        }
    }
}

/// Drive one client's readable/writable events to completion. Returns true
/// if the connection should be torn down.
fn service_client(
    shard: &mut Shard,
    clients: &mut HashMap<usize, Client>,
    tok: usize,
    ev: &mio::event::Event,
) -> bool {
    let Some(client) = clients.get_mut(&tok) else {
        return false;
    };
    let mut should_remove = false;

    if ev.is_readable() {
        let mut tmp = [0u8; READ_BUF];
        loop {
            match client.conn.read(&mut tmp) {
                Ok(0) => {
                    should_remove = true;
                    break;
                }
                Ok(n) => client.rbuf.extend_from_slice(&tmp[..n]),
                Err(ref e) if would_block(e) => break,
                Err(_) => {
                    should_remove = true;
                    break;
                }
            }
        }

        if !should_remove {
            let mut cmds = Vec::new();
            match parse_many(&mut client.rbuf, &mut cmds) {
                Ok(()) => {
                    for cmd in cmds {
                        let reply = shard.exec(cmd);
                        client.wbuf.extend_from_slice(&reply);
                    }
                }
                Err(e) => {
                    // Framing error: reply, then close — there is no
                    // reliable resync point in a corrupted byte stream.
                    client.wbuf.extend_from_slice(&e.to_resp());
                    should_remove = true;
                }
            }

            if !client.wbuf.is_empty() {
                flush(client, &mut should_remove);
            }
        }
    }

    if !should_remove && ev.is_writable() && !client.wbuf.is_empty() {
        flush(client, &mut should_remove);
    }

    should_remove
}

fn flush(client: &mut Client, should_remove: &mut bool) {
    match client.conn.write(&client.wbuf) {
        Ok(n) => {
            let _ = client.wbuf.split_to(n);
        }
        Err(ref e) if would_block(e) => {}
        Err(_) => *should_remove = true,
    }
}

#[inline]
fn would_block(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
    )
}
