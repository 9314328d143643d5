/*!
 * RESP Protocol Implementation
 *
 * This module implements the Redis Serialization Protocol (RESP) for parsing
 * and encoding commands and responses. It accepts both the inline form (a
 * single whitespace-split line) and the array-of-bulk-strings form used by
 * real Redis client libraries, and encodes the full set of RESP reply types.
 */

use thiserror::Error;

/// Errors surfaced while parsing or dispatching a single command.
///
/// `Protocol` is the only variant that terminates the connection; the rest
/// are recoverable at the command boundary (see net.rs).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    #[error("ERR value is not a valid float")]
    NotFloat,

    #[error("ERR Protocol error: {0}")]
    Protocol(String),
}

impl CommandError {
    /// Render as a RESP error reply (`-ERR …\r\n`).
    pub fn to_resp(&self) -> Vec<u8> {
        resp_error(&self.to_string())
    }

    /// Whether this error should cause the connection to be closed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CommandError::Protocol(_))
    }
}

/// Every command the router recognizes.
///
/// Byte strings are kept as owned `Vec<u8>` so the parsed command outlives
/// the read buffer it was sliced from.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    // admin
    Ping,
    Echo(Vec<u8>),
    Info,

    // keyspace
    Len,
    Del(Vec<Vec<u8>>),
    Exists(Vec<u8>),
    Type(Vec<u8>),

    // string
    Set(Vec<u8>, Vec<u8>),
    Get(Vec<u8>),

    // trie (r*)
    RSet(Vec<u8>, Vec<u8>, Vec<u8>),
    RGet(Vec<u8>, Vec<u8>),
    RDel(Vec<u8>, Vec<u8>),
    RExists(Vec<u8>, Vec<u8>),
    RLen(Vec<u8>),
    RKeys(Vec<u8>),
    RValues(Vec<u8>),
    RGetAll(Vec<u8>),
    RPGet(Vec<u8>, Vec<u8>),

    // heap (q*)
    QPush(Vec<u8>, f64, Vec<u8>),
    QPop(Vec<u8>),
    QPopN(Vec<u8>, usize),
    QPeek(Vec<u8>),
    QLen(Vec<u8>),

    // fts (d*)
    DSet(Vec<u8>, Vec<u8>, Vec<u8>),
    DGet(Vec<u8>, Vec<u8>),
    DDel(Vec<u8>, Vec<u8>),
    DLen(Vec<u8>),
    DSearch(Vec<u8>, Vec<u8>),
}

/// Parse a decimal priority/count the way the spec requires: optional sign,
/// digits, optional fractional part. Rejects `inf`/`nan`/exponent forms that
/// `f64::from_str` would otherwise accept.
fn parse_decimal_f64(s: &[u8]) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let mut i = 0;
    if s[i] == b'+' || s[i] == b'-' {
        i += 1;
    }
    let start_digits = i;
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
    }
    let mut saw_digits = i > start_digits;
    if i < s.len() && s[i] == b'.' {
        i += 1;
        let start_frac = i;
        while i < s.len() && s[i].is_ascii_digit() {
            i += 1;
        }
        saw_digits = saw_digits || i > start_frac;
    }
    if !saw_digits || i != s.len() {
        return None;
    }
    std::str::from_utf8(s).ok()?.parse::<f64>().ok()
}

fn parse_usize(s: &[u8]) -> Option<usize> {
    std::str::from_utf8(s).ok()?.parse::<usize>().ok()
}

/// Build a `Cmd` from an argv already split into words (shared by both the
/// inline and array request forms).
fn cmd_from_argv(argv: Vec<Vec<u8>>) -> Result<Cmd, CommandError> {
    if argv.is_empty() {
        return Err(CommandError::Protocol("empty command".into()));
    }
    let verb = upper_ascii(&argv[0]);
    let name = || String::from_utf8_lossy(&argv[0]).to_string();
    let arity_err = || Err(CommandError::WrongArity(name()));

    macro_rules! need {
        ($n:expr) => {
            if argv.len() != $n {
                return arity_err();
            }
        };
    }

    Ok(match &verb[..] {
        b"PING" => {
            need!(1);
            Cmd::Ping
        }
        b"ECHO" => {
            need!(2);
            Cmd::Echo(argv[1].clone())
        }
        b"INFO" => {
            need!(1);
            Cmd::Info
        }
        b"LEN" => {
            need!(1);
            Cmd::Len
        }
        b"DEL" => {
            if argv.len() < 2 {
                return arity_err();
            }
            Cmd::Del(argv[1..].to_vec())
        }
        b"EXISTS" => {
            need!(2);
            Cmd::Exists(argv[1].clone())
        }
        b"TYPE" => {
            need!(2);
            Cmd::Type(argv[1].clone())
        }
        b"SET" => {
            need!(3);
            Cmd::Set(argv[1].clone(), argv[2].clone())
        }
        b"GET" => {
            need!(2);
            Cmd::Get(argv[1].clone())
        }
        b"RSET" => {
            need!(4);
            Cmd::RSet(argv[1].clone(), argv[2].clone(), argv[3].clone())
        }
        b"RGET" => {
            need!(3);
            Cmd::RGet(argv[1].clone(), argv[2].clone())
        }
        b"RDEL" => {
            need!(3);
            Cmd::RDel(argv[1].clone(), argv[2].clone())
        }
        b"REXISTS" => {
            need!(3);
            Cmd::RExists(argv[1].clone(), argv[2].clone())
        }
        b"RLEN" => {
            need!(2);
            Cmd::RLen(argv[1].clone())
        }
        b"RKEYS" => {
            need!(2);
            Cmd::RKeys(argv[1].clone())
        }
        b"RVALUES" => {
            need!(2);
            Cmd::RValues(argv[1].clone())
        }
        b"RGETALL" => {
            need!(2);
            Cmd::RGetAll(argv[1].clone())
        }
        b"RPGET" => {
            need!(3);
            Cmd::RPGet(argv[1].clone(), argv[2].clone())
        }
        b"QPUSH" => {
            need!(4);
            let p = parse_decimal_f64(&argv[2]).ok_or(CommandError::NotFloat)?;
            Cmd::QPush(argv[1].clone(), p, argv[3].clone())
        }
        b"QPOP" => {
            need!(2);
            Cmd::QPop(argv[1].clone())
        }
        b"QPOPN" => {
            need!(3);
            let n = parse_usize(&argv[2]).ok_or(CommandError::NotInteger)?;
            Cmd::QPopN(argv[1].clone(), n)
        }
        b"QPEEK" => {
            need!(2);
            Cmd::QPeek(argv[1].clone())
        }
        b"QLEN" => {
            need!(2);
            Cmd::QLen(argv[1].clone())
        }
        b"DSET" => {
            need!(4);
            Cmd::DSet(argv[1].clone(), argv[2].clone(), argv[3].clone())
        }
        b"DGET" => {
            need!(3);
            Cmd::DGet(argv[1].clone(), argv[2].clone())
        }
        b"DDEL" => {
            need!(3);
            Cmd::DDel(argv[1].clone(), argv[2].clone())
        }
        b"DLEN" => {
            need!(2);
            Cmd::DLen(argv[1].clone())
        }
        b"DSEARCH" => {
            need!(3);
            Cmd::DSearch(argv[1].clone(), argv[2].clone())
        }
        _ => return Err(CommandError::UnknownCommand(name())),
    })
}

/// Parse one request from `data`, whichever form it's in.
///
/// Returns `Ok(Some((consumed, result)))` where `result` is either the
/// parsed command or a recoverable `CommandError` (arity/unknown/parse);
/// the caller still owes a reply for those. Returns `Ok(None)` if more
/// bytes are needed. Returns `Err(..)` only for unrecoverable framing
/// errors, which should close the connection.
pub fn parse_one(data: &[u8]) -> Result<Option<(usize, Result<Cmd, CommandError>)>, CommandError> {
    if data.is_empty() {
        return Ok(None);
    }
    if data[0] == b'*' {
        parse_array(data)
    } else {
        parse_inline(data)
    }
}

/// Inline form: a single CRLF- or LF-terminated line, whitespace-split.
fn parse_inline(
    data: &[u8],
) -> Result<Option<(usize, Result<Cmd, CommandError>)>, CommandError> {
    let newline = match data.iter().position(|&b| b == b'\n') {
        Some(i) => i,
        None => return Ok(None),
    };
    let mut line = &data[..newline];
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    let consumed = newline + 1;
    let argv: Vec<Vec<u8>> = line
        .split(|&b| b == b' ' || b == b'\t')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_vec())
        .collect();
    if argv.is_empty() {
        // blank line: nothing to execute, nothing useful to reply with
        return Ok(Some((
            consumed,
            Err(CommandError::Protocol("empty inline request".into())),
        )));
    }
    Ok(Some((consumed, cmd_from_argv(argv))))
}

/// Array-of-bulk-strings form: `*N\r\n$L\r\n<bytes>\r\n...`.
fn parse_array(
    data: &[u8],
) -> Result<Option<(usize, Result<Cmd, CommandError>)>, CommandError> {
    let (i, n) = match read_decimal_line(&data[1..])? {
        Some(x) => x,
        None => return Ok(None),
    };
    let mut cursor = 1 + i;

    if n <= 0 {
        return Err(CommandError::Protocol("empty array".into()));
    }

    let mut items: Vec<Vec<u8>> = Vec::with_capacity(n as usize);
    for _ in 0..n {
        if cursor >= data.len() {
            return Ok(None);
        }
        if data[cursor] != b'$' {
            return Err(CommandError::Protocol("expected bulk string".into()));
        }
        let (i2, len) = match read_decimal_line(&data[cursor + 1..])? {
            Some(x) => x,
            None => return Ok(None),
        };
        cursor += 1 + i2;
        if len < 0 {
            return Err(CommandError::Protocol("negative bulk length".into()));
        }
        let need = len as usize + 2;
        if cursor + need > data.len() {
            return Ok(None);
        }
        items.push(data[cursor..cursor + len as usize].to_vec());
        cursor += need;
    }

    Ok(Some((cursor, cmd_from_argv(items))))
}

/// Parse every complete request currently buffered, leaving any trailing
/// partial request in `buf` for the next read.
pub fn parse_many(
    buf: &mut bytes::BytesMut,
    out: &mut Vec<Result<Cmd, CommandError>>,
) -> Result<(), CommandError> {
    use bytes::Buf;
    loop {
        match parse_one(&buf[..])? {
            Some((consumed, result)) => {
                buf.advance(consumed);
                out.push(result);
            }
            None => break,
        }
    }
    Ok(())
}

/// Read a decimal integer terminated by `\r\n`. `Ok(None)` means the line
/// is not yet complete in the buffer.
fn read_decimal_line(s: &[u8]) -> Result<Option<(usize, i64)>, CommandError> {
    let mut i = 0;
    while i + 1 < s.len() && !(s[i] == b'\r' && s[i + 1] == b'\n') {
        i += 1;
    }
    if i + 1 >= s.len() {
        return Ok(None);
    }
    let num = std::str::from_utf8(&s[..i])
        .ok()
        .and_then(|t| t.parse::<i64>().ok())
        .ok_or_else(|| CommandError::Protocol("invalid length prefix".into()))?;
    Ok(Some((i + 2, num)))
}

#[inline]
fn upper_ascii(s: &[u8]) -> Vec<u8> {
    s.iter().map(|c| c.to_ascii_uppercase()).collect()
}

//
// RESP reply encoders
//

/// `+<text>\r\n`
pub fn resp_simple(s: &str) -> Vec<u8> {
    let mut v = Vec::with_capacity(s.len() + 3);
    v.push(b'+');
    v.extend_from_slice(s.as_bytes());
    v.extend_from_slice(b"\r\n");
    v
}

/// `-<text>\r\n`
pub fn resp_error(s: &str) -> Vec<u8> {
    let mut v = Vec::with_capacity(s.len() + 3);
    v.push(b'-');
    v.extend_from_slice(s.as_bytes());
    v.extend_from_slice(b"\r\n");
    v
}

/// `$<len>\r\n<bytes>\r\n`
pub fn resp_bulk(b: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(b.len() + 16);
    v.extend_from_slice(format!("${}\r\n", b.len()).as_bytes());
    v.extend_from_slice(b);
    v.extend_from_slice(b"\r\n");
    v
}

/// `$-1\r\n`
pub fn resp_null() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

/// `:<n>\r\n`
pub fn resp_integer(i: i64) -> Vec<u8> {
    format!(":{}\r\n", i).into_bytes()
}

/// `*<count>\r\n` followed by each already-encoded element.
pub fn resp_array(items: Vec<Vec<u8>>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
    for it in items {
        out.extend_from_slice(&it);
    }
    out
}

/// An array of bulk strings, built directly from byte slices.
pub fn resp_bulk_array<I, T>(items: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let encoded: Vec<Vec<u8>> = items.into_iter().map(|t| resp_bulk(t.as_ref())).collect();
    resp_array(encoded)
}
