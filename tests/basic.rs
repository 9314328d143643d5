use basalt::*;

fn exec(shard: &mut Shard, line: &str) -> Vec<u8> {
    let argv: Vec<&str> = line.split(' ').collect();
    let mut buf = bytes::BytesMut::new();
    buf.extend_from_slice(format!("*{}\r\n", argv.len()).as_bytes());
    for a in &argv {
        buf.extend_from_slice(format!("${}\r\n", a.len()).as_bytes());
        buf.extend_from_slice(a.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    let mut cmds = Vec::new();
    protocol::parse_many(&mut buf, &mut cmds).unwrap();
    shard.exec(cmds.remove(0))
}

#[test]
fn set_get_del_cycle() {
    let mut shard = Shard::new();
    assert_eq!(exec(&mut shard, "set a 1"), protocol::resp_simple("OK"));
    assert_eq!(exec(&mut shard, "get a"), protocol::resp_bulk(b"1"));
    assert_eq!(exec(&mut shard, "del a"), protocol::resp_integer(1));
    assert_eq!(exec(&mut shard, "get a"), protocol::resp_null());
}

#[test]
fn exists_and_type_track_the_keyspace() {
    let mut shard = Shard::new();
    exec(&mut shard, "set x 41");
    assert_eq!(exec(&mut shard, "exists x"), protocol::resp_integer(1));
    assert_eq!(exec(&mut shard, "type x"), protocol::resp_simple("string"));
    assert_eq!(exec(&mut shard, "del x"), protocol::resp_integer(1));
    assert_eq!(exec(&mut shard, "exists x"), protocol::resp_integer(0));
    assert_eq!(exec(&mut shard, "type x"), protocol::resp_simple("none"));
}

#[test]
fn trie_heap_and_fts_each_get_their_own_tag() {
    let mut shard = Shard::new();
    exec(&mut shard, "rset fields name alice");
    exec(&mut shard, "qpush queue 1 job");
    exec(&mut shard, "dset docs title body");
    assert_eq!(exec(&mut shard, "type fields"), protocol::resp_simple("trie"));
    assert_eq!(exec(&mut shard, "type queue"), protocol::resp_simple("heap"));
    assert_eq!(exec(&mut shard, "type docs"), protocol::resp_simple("fts"));
    assert_eq!(exec(&mut shard, "len"), protocol::resp_integer(3));
}

#[test]
fn draining_a_container_to_empty_removes_the_key() {
    let mut shard = Shard::new();
    exec(&mut shard, "qpush q 1 only");
    assert_eq!(exec(&mut shard, "exists q"), protocol::resp_integer(1));
    exec(&mut shard, "qpop q");
    assert_eq!(exec(&mut shard, "exists q"), protocol::resp_integer(0));
}
