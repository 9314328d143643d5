use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

/// Picks a free TCP port by binding to port 0, reading it back, then
/// dropping the listener before `run_server` binds it for real. There is an
/// unavoidable race against other processes grabbing the same port between
/// the drop and the real bind, but it is vanishingly unlikely in a test run.
fn free_tcp_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("read local addr")
}

fn spawn_server() -> (SocketAddr, PathBuf) {
    let addr = free_tcp_addr();
    let socket_path = std::env::temp_dir().join(format!("basalt-test-{}.sock", std::process::id()));
    let _ = std::fs::remove_file(&socket_path);

    let spawn_addr = addr;
    let spawn_path = socket_path.clone();
    std::thread::spawn(move || {
        basalt::net::run_server(spawn_addr, &spawn_path).expect("server loop exited");
    });

    // Give the listener a moment to bind before the first connection attempt.
    for _ in 0..50 {
        if TcpStream::connect(addr).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    (addr, socket_path)
}

fn tcp_client(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("failed to set read timeout");
    stream
}

fn read_bulk_string<S: Read>(reader: &mut BufReader<S>) -> Vec<u8> {
    let mut line = String::new();
    reader.read_line(&mut line).expect("failed to read header");
    if !line.starts_with('$') {
        panic!("expected bulk string header, got: {line}");
    }
    let len: usize = line[1..].trim().parse().expect("invalid bulk length");
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).expect("failed to read body");
    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf).expect("failed to read trailing CRLF");
    data
}

#[test]
fn large_payload_round_trips_over_tcp() {
    let (addr, _socket) = spawn_server();
    let mut stream = tcp_client(addr);

    let size = 1024 * 1024;
    let data = "a".repeat(size);
    let key = "large_1mb";

    let header = format!("*3\r\n$3\r\nSET\r\n${}\r\n{}\r\n${}\r\n", key.len(), key, size);
    stream.write_all(header.as_bytes()).unwrap();
    stream.write_all(data.as_bytes()).unwrap();
    stream.write_all(b"\r\n").unwrap();

    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    assert_eq!(line, "+OK\r\n");

    let get = format!("*2\r\n$3\r\nGET\r\n${}\r\n{}\r\n", key.len(), key);
    stream.write_all(get.as_bytes()).unwrap();
    let received = read_bulk_string(&mut reader);
    assert_eq!(received.len(), size);
    assert_eq!(received[0], b'a');
    assert_eq!(received[size - 1], b'a');
}

#[test]
fn admin_commands_work_over_tcp_and_unix_socket() {
    let (addr, socket_path) = spawn_server();

    let mut tcp = tcp_client(addr);
    tcp.write_all(b"*1\r\n$4\r\nPING\r\n").unwrap();
    let mut buf = [0u8; 64];
    let n = tcp.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"+PONG\r\n");

    let mut unix = UnixStream::connect(&socket_path).expect("connect to unix socket");
    unix.write_all(b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n").unwrap();
    let mut buf = [0u8; 64];
    let n = unix.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"$5\r\nhello\r\n");

    unix.write_all(b"*1\r\n$4\r\nPING\r\n").unwrap();
    let n = unix.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"+PONG\r\n");

    tcp.write_all(b"*1\r\n$4\r\nINFO\r\n").unwrap();
    let mut reader = BufReader::new(tcp);
    let body = read_bulk_string(&mut reader);
    assert!(!body.is_empty());
}
