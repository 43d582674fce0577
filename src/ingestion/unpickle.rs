//! Pickle machine for payloads that reference Python classes.
//!
//! `serde_pickle` stops at the first class reference. Record lists taken from a DataFrame
//! (`df.to_dict("records")`) routinely carry `datetime`, `date`, `Decimal` and pandas
//! `Timestamp` values, so those payloads are re-run here. Known objects are rendered as the
//! text Python's `str()` prints for them; any other class is rejected.
//!
//! Memoized containers are stored by value: a list or dict referenced a second time through
//! the memo holds only what it held when it was memoized.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde_pickle::{HashableValue, Value};

use crate::error::{IngestionError, IngestionResult};

/// Decode a complete pickle stream into a [`Value`].
pub(crate) fn decode(bytes: &[u8]) -> IngestionResult<Value> {
    Machine::new(bytes).run()
}

/// Stack entry. Class references and datetime helpers live beside plain values until they
/// are stored in a container.
#[derive(Debug, Clone)]
enum Obj {
    Value(Value),
    Tuple(Vec<Obj>),
    Global { module: String, name: String },
    Delta { days: i64, seconds: i64, micros: i64 },
    Zone { offset: i64 },
}

fn bad(msg: impl std::fmt::Display) -> IngestionError {
    IngestionError::malformed(format!("pickle: {msg}"))
}

struct Machine<'a> {
    buf: &'a [u8],
    pos: usize,
    stack: Vec<Obj>,
    marks: Vec<usize>,
    memo: HashMap<usize, Obj>,
}

impl<'a> Machine<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            stack: Vec::new(),
            marks: Vec::new(),
            memo: HashMap::new(),
        }
    }

    fn run(mut self) -> IngestionResult<Value> {
        loop {
            let at = self.pos;
            let op = self.byte()?;
            match op {
                b'.' => return into_value(self.pop()?),
                0x80 => {
                    self.byte()?;
                }
                0x95 => {
                    self.take(8)?;
                }

                b'(' => self.marks.push(self.stack.len()),
                b'0' => {
                    self.pop()?;
                }
                b'1' => {
                    self.pop_mark()?;
                }
                b'2' => {
                    let top = self.top()?.clone();
                    self.stack.push(top);
                }

                b'N' => self.push(Value::None),
                0x88 => self.push(Value::Bool(true)),
                0x89 => self.push(Value::Bool(false)),
                b'I' => {
                    let v = match self.line()? {
                        "00" => Value::Bool(false),
                        "01" => Value::Bool(true),
                        s => int_value(parse_int(s)?),
                    };
                    self.push(v);
                }
                b'J' => {
                    let n = i32::from_le_bytes(self.array()?);
                    self.push(Value::I64(n.into()));
                }
                b'K' => {
                    let n = self.byte()?;
                    self.push(Value::I64(n.into()));
                }
                b'M' => {
                    let n = u16::from_le_bytes(self.array()?);
                    self.push(Value::I64(n.into()));
                }
                b'L' => {
                    let n = parse_int(self.line()?.trim_end_matches('L'))?;
                    self.push(int_value(n));
                }
                0x8a => {
                    let n = usize::from(self.byte()?);
                    let v = long_value(self.take(n)?)?;
                    self.push(v);
                }
                0x8b => {
                    let n = usize::try_from(i32::from_le_bytes(self.array()?)).map_err(|_| bad("negative LONG4 size"))?;
                    let v = long_value(self.take(n)?)?;
                    self.push(v);
                }
                b'F' => {
                    let line = self.line()?;
                    let f = line.trim().parse::<f64>().map_err(|_| bad(format!("invalid float {line:?}")))?;
                    self.push(Value::F64(f));
                }
                b'G' => {
                    let f = f64::from_be_bytes(self.array()?);
                    self.push(Value::F64(f));
                }

                b'S' => {
                    let s = unquote(self.line()?)?;
                    self.push(Value::String(s));
                }
                b'T' => {
                    let n = usize::try_from(i32::from_le_bytes(self.array()?)).map_err(|_| bad("negative BINSTRING size"))?;
                    let s = String::from_utf8_lossy(self.take(n)?).into_owned();
                    self.push(Value::String(s));
                }
                b'U' => {
                    let n = usize::from(self.byte()?);
                    let s = String::from_utf8_lossy(self.take(n)?).into_owned();
                    self.push(Value::String(s));
                }
                b'V' => {
                    let s = raw_unicode_unescape(self.line_bytes()?)?;
                    self.push(Value::String(s));
                }
                b'X' => {
                    let n = self.u32_len()?;
                    let s = utf8(self.take(n)?)?;
                    self.push(Value::String(s));
                }
                0x8c => {
                    let n = usize::from(self.byte()?);
                    let s = utf8(self.take(n)?)?;
                    self.push(Value::String(s));
                }
                0x8d => {
                    let n = self.u64_len()?;
                    let s = utf8(self.take(n)?)?;
                    self.push(Value::String(s));
                }
                b'B' => {
                    let n = self.u32_len()?;
                    let b = self.take(n)?.to_vec();
                    self.push(Value::Bytes(b));
                }
                b'C' => {
                    let n = usize::from(self.byte()?);
                    let b = self.take(n)?.to_vec();
                    self.push(Value::Bytes(b));
                }
                0x8e | 0x96 => {
                    let n = self.u64_len()?;
                    let b = self.take(n)?.to_vec();
                    self.push(Value::Bytes(b));
                }

                b']' => self.push(Value::List(Vec::new())),
                b'l' => {
                    let items = self.pop_mark()?.into_iter().map(into_value).collect::<IngestionResult<_>>()?;
                    self.push(Value::List(items));
                }
                b'a' => {
                    let v = into_value(self.pop()?)?;
                    self.list_mut()?.push(v);
                }
                b'e' => {
                    let items: Vec<Value> = self.pop_mark()?.into_iter().map(into_value).collect::<IngestionResult<_>>()?;
                    self.list_mut()?.extend(items);
                }
                b')' => self.stack.push(Obj::Tuple(Vec::new())),
                b't' => {
                    let items = self.pop_mark()?;
                    self.stack.push(Obj::Tuple(items));
                }
                0x85..=0x87 => {
                    let n = usize::from(op - 0x84);
                    if self.stack.len() < n {
                        return Err(bad("stack underflow"));
                    }
                    let items = self.stack.split_off(self.stack.len() - n);
                    self.stack.push(Obj::Tuple(items));
                }
                b'}' => self.push(Value::Dict(BTreeMap::new())),
                b'd' => {
                    let items = pairs(self.pop_mark()?)?;
                    self.push(Value::Dict(items.into_iter().collect()));
                }
                b's' => {
                    let v = into_value(self.pop()?)?;
                    let k = into_key(self.pop()?)?;
                    self.dict_mut()?.insert(k, v);
                }
                b'u' => {
                    let items = pairs(self.pop_mark()?)?;
                    self.dict_mut()?.extend(items);
                }
                0x8f => self.push(Value::Set(BTreeSet::new())),
                0x90 => {
                    let items: Vec<HashableValue> = self.pop_mark()?.into_iter().map(into_key).collect::<IngestionResult<_>>()?;
                    self.set_mut()?.extend(items);
                }
                0x91 => {
                    let items = self.pop_mark()?.into_iter().map(into_key).collect::<IngestionResult<_>>()?;
                    self.push(Value::FrozenSet(items));
                }

                b'p' => {
                    let idx = parse_index(self.line()?)?;
                    self.memoize(idx)?;
                }
                b'q' => {
                    let idx = usize::from(self.byte()?);
                    self.memoize(idx)?;
                }
                b'r' => {
                    let idx = self.u32_len()?;
                    self.memoize(idx)?;
                }
                0x94 => {
                    let idx = self.memo.len();
                    self.memoize(idx)?;
                }
                b'g' => {
                    let idx = parse_index(self.line()?)?;
                    self.recall(idx)?;
                }
                b'h' => {
                    let idx = usize::from(self.byte()?);
                    self.recall(idx)?;
                }
                b'j' => {
                    let idx = self.u32_len()?;
                    self.recall(idx)?;
                }

                b'c' => {
                    let module = self.line()?.to_string();
                    let name = self.line()?.to_string();
                    self.stack.push(Obj::Global { module, name });
                }
                0x93 => {
                    let name = text_arg(self.pop()?)?;
                    let module = text_arg(self.pop()?)?;
                    self.stack.push(Obj::Global { module, name });
                }
                b'R' | 0x81 => {
                    let args = self.pop()?;
                    let callable = self.pop()?;
                    self.stack.push(call(callable, args)?);
                }
                0x92 => {
                    self.pop()?;
                    let args = self.pop()?;
                    let callable = self.pop()?;
                    self.stack.push(call(callable, args)?);
                }
                b'b' => {
                    self.pop()?;
                    self.top()?;
                }

                other => return Err(bad(format!("unsupported opcode 0x{other:02x} at byte {at}"))),
            }
        }
    }

    fn take(&mut self, n: usize) -> IngestionResult<&'a [u8]> {
        let buf = self.buf;
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= buf.len())
            .ok_or_else(|| bad("unexpected end of data"))?;
        let out = &buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn byte(&mut self) -> IngestionResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> IngestionResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32_len(&mut self) -> IngestionResult<usize> {
        usize::try_from(u32::from_le_bytes(self.array()?)).map_err(|_| bad("length out of range"))
    }

    fn u64_len(&mut self) -> IngestionResult<usize> {
        usize::try_from(u64::from_le_bytes(self.array()?)).map_err(|_| bad("length out of range"))
    }

    fn line_bytes(&mut self) -> IngestionResult<&'a [u8]> {
        let buf = self.buf;
        let rest = &buf[self.pos..];
        let nl = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| bad("unterminated text argument"))?;
        self.pos += nl + 1;
        Ok(&rest[..nl])
    }

    fn line(&mut self) -> IngestionResult<&'a str> {
        std::str::from_utf8(self.line_bytes()?).map_err(|_| bad("text argument is not UTF-8"))
    }

    fn push(&mut self, v: Value) {
        self.stack.push(Obj::Value(v));
    }

    fn pop(&mut self) -> IngestionResult<Obj> {
        self.stack.pop().ok_or_else(|| bad("stack underflow"))
    }

    fn top(&self) -> IngestionResult<&Obj> {
        self.stack.last().ok_or_else(|| bad("stack underflow"))
    }

    fn pop_mark(&mut self) -> IngestionResult<Vec<Obj>> {
        let start = self.marks.pop().ok_or_else(|| bad("missing MARK"))?;
        if start > self.stack.len() {
            return Err(bad("stack underflow"));
        }
        Ok(self.stack.split_off(start))
    }

    fn memoize(&mut self, idx: usize) -> IngestionResult<()> {
        let top = self.top()?.clone();
        self.memo.insert(idx, top);
        Ok(())
    }

    fn recall(&mut self, idx: usize) -> IngestionResult<()> {
        let obj = self
            .memo
            .get(&idx)
            .cloned()
            .ok_or_else(|| bad(format!("memo key {idx} not found")))?;
        self.stack.push(obj);
        Ok(())
    }

    fn list_mut(&mut self) -> IngestionResult<&mut Vec<Value>> {
        match self.stack.last_mut() {
            Some(Obj::Value(Value::List(items))) => Ok(items),
            _ => Err(bad("append target is not a list")),
        }
    }

    fn dict_mut(&mut self) -> IngestionResult<&mut BTreeMap<HashableValue, Value>> {
        match self.stack.last_mut() {
            Some(Obj::Value(Value::Dict(map))) => Ok(map),
            _ => Err(bad("setitem target is not a dict")),
        }
    }

    fn set_mut(&mut self) -> IngestionResult<&mut BTreeSet<HashableValue>> {
        match self.stack.last_mut() {
            Some(Obj::Value(Value::Set(items))) => Ok(items),
            _ => Err(bad("additems target is not a set")),
        }
    }
}

fn into_value(obj: Obj) -> IngestionResult<Value> {
    match obj {
        Obj::Value(v) => Ok(v),
        Obj::Tuple(items) => Ok(Value::Tuple(
            items.into_iter().map(into_value).collect::<IngestionResult<_>>()?,
        )),
        Obj::Delta { days, seconds, micros } => Ok(Value::String(timedelta_text(days, seconds, micros))),
        Obj::Zone { offset } => Ok(Value::String(zone_text(offset))),
        Obj::Global { module, name } => Err(bad(format!("class reference {module}.{name} is not a value"))),
    }
}

fn into_key(obj: Obj) -> IngestionResult<HashableValue> {
    into_value(obj)?.into_hashable().map_err(bad)
}

fn pairs(items: Vec<Obj>) -> IngestionResult<Vec<(HashableValue, Value)>> {
    if items.len() % 2 != 0 {
        return Err(bad("odd number of dict items"));
    }
    let mut out = Vec::with_capacity(items.len() / 2);
    let mut it = items.into_iter();
    while let (Some(k), Some(v)) = (it.next(), it.next()) {
        out.push((into_key(k)?, into_value(v)?));
    }
    Ok(out)
}

fn text_arg(obj: Obj) -> IngestionResult<String> {
    match obj {
        Obj::Value(Value::String(s)) => Ok(s),
        _ => Err(bad("expected a string")),
    }
}

fn parse_int(s: &str) -> IngestionResult<i128> {
    s.trim().parse().map_err(|_| bad(format!("invalid integer {s:?}")))
}

fn parse_index(s: &str) -> IngestionResult<usize> {
    s.trim().parse().map_err(|_| bad(format!("invalid memo key {s:?}")))
}

fn int_value(n: i128) -> Value {
    i64::try_from(n).map(Value::I64).unwrap_or_else(|_| Value::String(n.to_string()))
}

/// Little-endian two's complement, as written by LONG1/LONG4.
fn long_value(bytes: &[u8]) -> IngestionResult<Value> {
    if bytes.len() > 16 {
        return Err(bad("integer wider than 128 bits"));
    }
    let fill = match bytes.last() {
        Some(&b) if b >= 0x80 => 0xff,
        _ => 0x00,
    };
    let mut raw = [fill; 16];
    raw[..bytes.len()].copy_from_slice(bytes);
    Ok(int_value(i128::from_le_bytes(raw)))
}

fn utf8(bytes: &[u8]) -> IngestionResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| bad("string is not valid UTF-8"))
}

fn unquote(line: &str) -> IngestionResult<String> {
    let inner = ['\'', '"']
        .iter()
        .find_map(|&q| line.strip_prefix(q).and_then(|l| l.strip_suffix(q)))
        .ok_or_else(|| bad("STRING argument is not quoted"))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                let b = u8::from_str_radix(&hex, 16).map_err(|_| bad("invalid \\x escape"))?;
                out.push(char::from(b));
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Ok(out)
}

/// Python's `raw-unicode-escape`: latin-1 bytes plus `\uXXXX` / `\UXXXXXXXX`.
fn raw_unicode_unescape(bytes: &[u8]) -> IngestionResult<String> {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let width = match (bytes[i], bytes.get(i + 1).copied()) {
            (b'\\', Some(b'u')) => 4,
            (b'\\', Some(b'U')) => 8,
            (b, _) => {
                out.push(char::from(b));
                i += 1;
                continue;
            }
        };
        let c = bytes
            .get(i + 2..i + 2 + width)
            .and_then(|h| std::str::from_utf8(h).ok())
            .and_then(|h| u32::from_str_radix(h, 16).ok())
            .and_then(char::from_u32)
            .ok_or_else(|| bad("invalid unicode escape"))?;
        out.push(c);
        i += 2 + width;
    }
    Ok(out)
}

fn call(callable: Obj, args: Obj) -> IngestionResult<Obj> {
    let Obj::Global { module, name } = callable else {
        return Err(bad("call target is not a class or function"));
    };
    let args = match args {
        Obj::Tuple(items) => items,
        _ => return Err(bad(format!("arguments to {module}.{name} are not a tuple"))),
    };
    match (module.as_str(), name.as_str()) {
        ("datetime", "datetime") => datetime_obj(&args),
        ("datetime", "date") => date_obj(&args),
        ("datetime", "time") => time_obj(&args),
        ("datetime", "timedelta") => Ok(Obj::Delta {
            days: int_arg(&args, 0)?,
            seconds: int_arg(&args, 1)?,
            micros: int_arg(&args, 2)?,
        }),
        ("datetime", "timezone") => match args.first() {
            Some(Obj::Delta { days, seconds, .. }) => Ok(Obj::Zone {
                offset: days * 86_400 + seconds,
            }),
            _ => Err(bad("timezone without an offset")),
        },
        ("_codecs", "encode") => {
            let text = str_arg(&args, 0)?;
            latin1(text).map(|b| Obj::Value(Value::Bytes(b)))
        }
        ("builtins" | "__builtin__", "bytearray") => bytes_arg(&args, 0).map(|b| Obj::Value(Value::Bytes(b))),
        ("builtins" | "__builtin__", "set" | "frozenset") => {
            let items = match args.into_iter().next().map(into_value).transpose()? {
                Some(Value::List(items) | Value::Tuple(items)) => items,
                None => Vec::new(),
                Some(_) => return Err(bad("set() of a non-sequence")),
            };
            let items = items
                .into_iter()
                .map(|v| v.into_hashable().map_err(bad))
                .collect::<IngestionResult<BTreeSet<_>>>()?;
            Ok(Obj::Value(if name == "set" {
                Value::Set(items)
            } else {
                Value::FrozenSet(items)
            }))
        }
        ("decimal", "Decimal") => Ok(Obj::Value(Value::String(str_arg(&args, 0)?.to_string()))),
        ("pandas._libs.tslibs.timestamps", "_unpickle_timestamp" | "Timestamp") => pandas_timestamp(&args),
        ("pandas._libs.tslibs.nattype", "__nat_unpickle") => Ok(Obj::Value(Value::None)),
        _ => Err(bad(format!("unsupported pickled object {module}.{name}"))),
    }
}

fn int_arg(args: &[Obj], i: usize) -> IngestionResult<i64> {
    match args.get(i) {
        Some(Obj::Value(Value::I64(n))) => Ok(*n),
        _ => Err(bad(format!("argument {i} is not an integer"))),
    }
}

fn str_arg(args: &[Obj], i: usize) -> IngestionResult<&str> {
    match args.get(i) {
        Some(Obj::Value(Value::String(s))) => Ok(s),
        _ => Err(bad(format!("argument {i} is not a string"))),
    }
}

/// Byte-string argument; protocols below 3 pass these as latin-1 text.
fn bytes_arg(args: &[Obj], i: usize) -> IngestionResult<Vec<u8>> {
    match args.get(i) {
        Some(Obj::Value(Value::Bytes(b))) => Ok(b.clone()),
        Some(Obj::Value(Value::String(s))) => latin1(s),
        _ => Err(bad(format!("argument {i} is not a byte string"))),
    }
}

fn latin1(text: &str) -> IngestionResult<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(c).map_err(|_| bad("byte string outside latin-1")))
        .collect()
}

fn tz_arg(args: &[Obj], i: usize) -> IngestionResult<Option<i64>> {
    match args.get(i) {
        None | Some(Obj::Value(Value::None)) => Ok(None),
        Some(Obj::Zone { offset }) => Ok(Some(*offset)),
        Some(_) => Err(bad("unsupported tzinfo")),
    }
}

fn ymd(year_hi: u8, year_lo: u8, month: u8, day: u8) -> IngestionResult<NaiveDate> {
    let year = i32::from(year_hi) * 256 + i32::from(year_lo);
    NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day)).ok_or_else(|| bad("invalid date"))
}

fn hms_micro(hour: u8, minute: u8, second: u8, us: &[u8]) -> IngestionResult<NaiveTime> {
    let micros = us.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
    NaiveTime::from_hms_micro_opt(u32::from(hour), u32::from(minute), u32::from(second), micros)
        .ok_or_else(|| bad("invalid time"))
}

// Month and hour carry the `fold` flag in their high bit.
fn datetime_obj(args: &[Obj]) -> IngestionResult<Obj> {
    let s = bytes_arg(args, 0)?;
    let [yh, yl, mo, d, h, mi, sec, u1, u2, u3] = s[..] else {
        return Err(bad("datetime state is not 10 bytes"));
    };
    let ndt = ymd(yh, yl, mo & 0x7f, d)?.and_time(hms_micro(h, mi, sec, &[u1, u2, u3])?);
    Ok(Obj::Value(Value::String(timestamp_text(ndt, tz_arg(args, 1)?))))
}

fn date_obj(args: &[Obj]) -> IngestionResult<Obj> {
    let s = bytes_arg(args, 0)?;
    let [yh, yl, mo, d] = s[..] else {
        return Err(bad("date state is not 4 bytes"));
    };
    Ok(Obj::Value(Value::String(ymd(yh, yl, mo, d)?.format("%Y-%m-%d").to_string())))
}

fn time_obj(args: &[Obj]) -> IngestionResult<Obj> {
    let s = bytes_arg(args, 0)?;
    let [h, mi, sec, u1, u2, u3] = s[..] else {
        return Err(bad("time state is not 6 bytes"));
    };
    let t = hms_micro(h & 0x7f, mi, sec, &[u1, u2, u3])?;
    let mut text = t.format("%H:%M:%S").to_string();
    push_fraction(&mut text, t.nanosecond());
    if let Some(offset) = tz_arg(args, 1)? {
        text.push_str(&utc_offset(offset));
    }
    Ok(Obj::Value(Value::String(text)))
}

/// `(value, freq, tz[, reso])`; `value` counts units of `reso` since the epoch, in UTC.
fn pandas_timestamp(args: &[Obj]) -> IngestionResult<Obj> {
    let value = int_arg(args, 0)?;
    let reso = if args.len() > 3 { int_arg(args, 3)? } else { 10 };
    let per_second: i64 = match reso {
        7 => 1,
        8 => 1_000,
        9 => 1_000_000,
        10 => 1_000_000_000,
        other => return Err(bad(format!("unsupported timestamp resolution {other}"))),
    };
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    let utc = DateTime::from_timestamp(value.div_euclid(per_second), u32::try_from(nanos).map_err(bad)?)
        .ok_or_else(|| bad("timestamp out of range"))?
        .naive_utc();
    let tz = tz_arg(args, 2)?;
    let local = match tz {
        Some(offset) => utc + TimeDelta::seconds(offset),
        None => utc,
    };
    Ok(Obj::Value(Value::String(timestamp_text(local, tz))))
}

fn push_fraction(text: &mut String, nanos: u32) {
    if nanos % 1_000 != 0 {
        text.push_str(&format!(".{nanos:09}"));
    } else if nanos != 0 {
        text.push_str(&format!(".{:06}", nanos / 1_000));
    }
}

fn timestamp_text(ndt: NaiveDateTime, tz: Option<i64>) -> String {
    let mut text = ndt.format("%Y-%m-%d %H:%M:%S").to_string();
    push_fraction(&mut text, ndt.nanosecond());
    if let Some(offset) = tz {
        text.push_str(&utc_offset(offset));
    }
    text
}

fn utc_offset(offset: i64) -> String {
    let sign = if offset < 0 { '-' } else { '+' };
    let a = offset.abs();
    let mut s = format!("{sign}{:02}:{:02}", a / 3600, a % 3600 / 60);
    if a % 60 != 0 {
        s.push_str(&format!(":{:02}", a % 60));
    }
    s
}

fn zone_text(offset: i64) -> String {
    if offset == 0 {
        "UTC".to_string()
    } else {
        format!("UTC{}", utc_offset(offset))
    }
}

fn timedelta_text(days: i64, seconds: i64, micros: i64) -> String {
    let mut s = format!("{}:{:02}:{:02}", seconds / 3600, seconds % 3600 / 60, seconds % 60);
    if micros != 0 {
        s.push_str(&format!(".{micros:06}"));
    }
    if days != 0 {
        let plural = if days.abs() == 1 { "" } else { "s" };
        s = format!("{days} day{plural}, {s}");
    }
    s
}
