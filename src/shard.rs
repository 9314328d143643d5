/*!
 * Command execution
 *
 * `Shard::exec` is the single entry point that takes a parsed command (or a
 * recoverable parse error) and produces a RESP-encoded reply. It owns the
 * keyspace and is the only place that touches it, so every command is
 * observed atomically by definition — see net.rs for how connections share
 * one `Shard`.
 */

use crate::protocol::{
    resp_array, resp_bulk, resp_bulk_array, resp_integer, resp_null, resp_simple, Cmd,
    CommandError,
};
use crate::storage::{Keyspace, Value};

pub struct Shard {
    keyspace: Keyspace,
}

impl Default for Shard {
    fn default() -> Self {
        Self::new()
    }
}

impl Shard {
    pub fn new() -> Self {
        Self {
            keyspace: Keyspace::new(),
        }
    }

    /// Execute one already-parsed request (or surface its parse error) and
    /// return the RESP-encoded reply.
    pub fn exec(&mut self, cmd: Result<Cmd, CommandError>) -> Vec<u8> {
        match cmd {
            Ok(cmd) => self.dispatch(cmd).unwrap_or_else(|e| e.to_resp()),
            Err(e) => e.to_resp(),
        }
    }

    fn dispatch(&mut self, cmd: Cmd) -> Result<Vec<u8>, CommandError> {
        Ok(match cmd {
            Cmd::Ping => resp_simple("PONG"),
            Cmd::Echo(msg) => resp_bulk(&msg),
            Cmd::Info => resp_bulk(info_payload().as_bytes()),

            Cmd::Len => resp_integer(self.keyspace.len() as i64),
            Cmd::Del(keys) => {
                let n = keys.iter().filter(|k| self.keyspace.remove(k)).count();
                resp_integer(n as i64)
            }
            Cmd::Exists(k) => resp_integer(self.keyspace.contains(&k) as i64),
            Cmd::Type(k) => resp_simple(match self.keyspace.get(&k) {
                Some(v) => v.tag(),
                None => "none",
            }),

            Cmd::Set(k, v) => {
                self.keyspace.insert(k, Value::Str(v));
                resp_simple("OK")
            }
            Cmd::Get(k) => match self.keyspace.get(&k) {
                Some(Value::Str(v)) => resp_bulk(v),
                Some(_) => return Err(CommandError::WrongType),
                None => resp_null(),
            },

            Cmd::RSet(k, field, value) => {
                self.keyspace.trie_mut(&k)?.set(field, value);
                resp_simple("OK")
            }
            Cmd::RGet(k, field) => match self.keyspace.trie(&k)? {
                Some(t) => match t.get(&field) {
                    Some(v) => resp_bulk(v),
                    None => resp_null(),
                },
                None => resp_null(),
            },
            Cmd::RDel(k, field) => {
                let removed = self.keyspace.trie_mut(&k)?.del(&field);
                self.keyspace.remove_if_empty(&k);
                resp_integer(removed as i64)
            }
            Cmd::RExists(k, field) => {
                let exists = match self.keyspace.trie(&k)? {
                    Some(t) => t.exists(&field),
                    None => false,
                };
                resp_integer(exists as i64)
            }
            Cmd::RLen(k) => {
                let len = match self.keyspace.trie(&k)? {
                    Some(t) => t.len(),
                    None => 0,
                };
                resp_integer(len as i64)
            }
            Cmd::RKeys(k) => match self.keyspace.trie(&k)? {
                Some(t) => resp_bulk_array(t.keys()),
                None => resp_array(Vec::new()),
            },
            Cmd::RValues(k) => match self.keyspace.trie(&k)? {
                Some(t) => resp_bulk_array(t.values()),
                None => resp_array(Vec::new()),
            },
            Cmd::RGetAll(k) => match self.keyspace.trie(&k)? {
                Some(t) => resp_bulk_array(t.iter().flat_map(|(f, v)| [f, v])),
                None => resp_array(Vec::new()),
            },
            Cmd::RPGet(k, prefix) => match self.keyspace.trie(&k)? {
                Some(t) => resp_bulk_array(t.prefix_iter(&prefix).flat_map(|(f, v)| [f, v])),
                None => resp_array(Vec::new()),
            },

            Cmd::QPush(k, priority, value) => {
                self.keyspace.heap_mut(&k)?.push(priority, value);
                resp_simple("OK")
            }
            Cmd::QPop(k) => {
                let popped = self.keyspace.heap_mut(&k)?.pop();
                self.keyspace.remove_if_empty(&k);
                match popped {
                    Some(v) => resp_bulk(&v),
                    None => resp_null(),
                }
            }
            Cmd::QPopN(k, n) => {
                let popped = self.keyspace.heap_mut(&k)?.pop_n(n);
                self.keyspace.remove_if_empty(&k);
                resp_bulk_array(popped)
            }
            Cmd::QPeek(k) => match self.keyspace.heap(&k)? {
                Some(h) => match h.peek() {
                    Some(v) => resp_bulk(v),
                    None => resp_null(),
                },
                None => resp_null(),
            },
            Cmd::QLen(k) => {
                let len = match self.keyspace.heap(&k)? {
                    Some(h) => h.len(),
                    None => 0,
                };
                resp_integer(len as i64)
            }

            Cmd::DSet(k, title, body) => {
                self.keyspace.fts_mut(&k)?.set(title, body);
                resp_simple("OK")
            }
            Cmd::DGet(k, title) => match self.keyspace.fts(&k)? {
                Some(f) => match f.get(&title) {
                    Some(body) => resp_bulk(body),
                    None => resp_null(),
                },
                None => resp_null(),
            },
            Cmd::DDel(k, title) => {
                let removed = self.keyspace.fts_mut(&k)?.del(&title);
                self.keyspace.remove_if_empty(&k);
                resp_integer(removed as i64)
            }
            Cmd::DLen(k) => {
                let len = match self.keyspace.fts(&k)? {
                    Some(f) => f.len(),
                    None => 0,
                };
                resp_integer(len as i64)
            }
            Cmd::DSearch(k, word) => match self.keyspace.fts(&k)? {
                Some(f) => {
                    let hits = f.search(&word);
                    resp_bulk_array(hits.into_iter().flat_map(|(t, b)| [t, b]))
                }
                None => resp_array(Vec::new()),
            },
        })
    }
}

fn info_payload() -> String {
    format!(
        "server:basalt\r\nversion:{}\r\nmode:standalone\r\n",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

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
        crate::protocol::parse_many(&mut buf, &mut cmds).unwrap();
        shard.exec(cmds.remove(0))
    }

    #[test]
    fn scenario_string_keyspace_lifecycle() {
        let mut s = Shard::new();
        exec(&mut s, "set foo bar");
        exec(&mut s, "set egg spam");
        exec(&mut s, "set apple orange");
        assert_eq!(exec(&mut s, "len"), resp_integer(3));
        assert_eq!(exec(&mut s, "get foo"), resp_bulk(b"bar"));
        assert_eq!(exec(&mut s, "type foo"), resp_simple("string"));
        assert_eq!(exec(&mut s, "exists foo"), resp_integer(1));
        exec(&mut s, "del foo");
        assert_eq!(exec(&mut s, "get foo"), resp_null());
        assert_eq!(exec(&mut s, "exists foo"), resp_integer(0));
    }

    #[test]
    fn scenario_trie_basic() {
        let mut s = Shard::new();
        exec(&mut s, "rset trie ape 1");
        exec(&mut s, "rset trie app 2");
        assert_eq!(exec(&mut s, "rget trie app"), resp_bulk(b"2"));
        assert_eq!(exec(&mut s, "rlen trie"), resp_integer(2));
        assert_eq!(exec(&mut s, "rexists trie ape"), resp_integer(1));
        exec(&mut s, "rdel trie ape");
        assert_eq!(exec(&mut s, "rexists trie ape"), resp_integer(0));
    }

    #[test]
    fn scenario_trie_prefix() {
        let mut s = Shard::new();
        for (f, v) in [
            ("apply", "1"),
            ("apple", "2"),
            ("ape", "3"),
            ("apolo", "4"),
            ("arm", "5"),
        ] {
            exec(&mut s, &format!("rset trie {f} {v}"));
        }
        assert_eq!(
            exec(&mut s, "rpget trie ap"),
            resp_bulk_array(["ape", "3", "apolo", "4", "apple", "2", "apply", "1"])
        );
    }

    #[test]
    fn scenario_heap() {
        let mut s = Shard::new();
        exec(&mut s, "qpush test 1 v1");
        exec(&mut s, "qpush test 4 v2");
        exec(&mut s, "qpush test 2 v3");
        exec(&mut s, "qpush test 1.5 v4");
        assert_eq!(exec(&mut s, "qpopn test 2"), resp_bulk_array(["v1", "v4"]));
        assert_eq!(exec(&mut s, "qlen test"), resp_integer(2));
        assert_eq!(exec(&mut s, "qpeek test"), resp_bulk(b"v3"));
        assert_eq!(exec(&mut s, "qpop test"), resp_bulk(b"v3"));
        assert_eq!(exec(&mut s, "qpop test"), resp_bulk(b"v2"));
        assert_eq!(exec(&mut s, "qlen test"), resp_integer(0));
        assert_eq!(exec(&mut s, "exists test"), resp_integer(0));
    }

    #[test]
    fn scenario_fts() {
        let mut s = Shard::new();
        exec(&mut s, "dset fts pretend Pretend-inferiority-and-encourage");
        assert_eq!(exec(&mut s, "dlen fts"), resp_integer(1));
        exec(&mut s, "ddel fts pretend");
        assert_eq!(exec(&mut s, "dlen fts"), resp_integer(0));
        assert_eq!(exec(&mut s, "exists fts"), resp_integer(0));
    }

    #[test]
    fn admin_commands_ping_echo_info() {
        let mut s = Shard::new();
        assert_eq!(exec(&mut s, "ping"), resp_simple("PONG"));
        assert_eq!(exec(&mut s, "echo hello"), resp_bulk(b"hello"));
        let info = exec(&mut s, "info");
        assert!(info.starts_with(b"$"));
        assert!(!info.starts_with(b"$-1"));
        assert!(info.len() > 5);
    }

    #[test]
    fn type_error_on_wrong_container() {
        let mut s = Shard::new();
        exec(&mut s, "set k v");
        assert_eq!(
            s.exec(Ok(Cmd::RSet(b"k".to_vec(), b"f".to_vec(), b"v".to_vec()))),
            CommandError::WrongType.to_resp()
        );
    }

    #[test]
    fn unknown_command_and_arity_errors_are_resp_errors() {
        let mut s = Shard::new();
        assert_eq!(
            s.exec(Err(CommandError::UnknownCommand("BOGUS".into()))),
            CommandError::UnknownCommand("BOGUS".into()).to_resp()
        );
        assert_eq!(
            s.exec(Err(CommandError::WrongArity("SET".into()))),
            CommandError::WrongArity("SET".into()).to_resp()
        );
    }

    #[test]
    fn del_counts_only_existing_keys_and_missing_get_is_null() {
        let mut s = Shard::new();
        exec(&mut s, "set a 1");
        assert_eq!(
            s.exec(Ok(Cmd::Del(vec![b"a".to_vec(), b"missing".to_vec()]))),
            resp_integer(1)
        );
        assert_eq!(exec(&mut s, "get missing"), resp_null());
        assert_eq!(exec(&mut s, "type missing"), resp_simple("none"));
    }
}
