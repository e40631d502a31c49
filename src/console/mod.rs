//! Console Module
//!
//! A line-oriented front end to the zone registry: parses a command,
//! runs it against one dictionary and renders a JSON reply.

mod command;
mod reply;

pub use command::{Command, CommandError, Op};
pub use reply::{scalar_to_json, value_to_json, Reply};

use std::time::Duration;

use serde_json::json;

use crate::dict::{End, SharedDict, WriteMode};
use crate::registry::SharedDicts;

/// Parses and runs one line; `None` for a blank line.
pub fn handle_line(dicts: &SharedDicts, line: &str) -> Option<Reply> {
    match Command::parse(line) {
        Ok(Some(command)) => Some(execute(dicts, command)),
        Ok(None) => None,
        Err(e) => Some(Reply::err(e)),
    }
}

/// Runs a parsed command against the registry.
pub fn execute(dicts: &SharedDicts, command: Command) -> Reply {
    match command {
        Command::Zones => Reply {
            zones: Some(dicts.iter().map(|d| d.name().to_string()).collect()),
            ..Reply::ok()
        },
        Command::Zone { zone, op } => match dicts.get(&zone) {
            Some(dict) => run(&dict, op),
            None => Reply::err(format!("no such zone: {zone}")),
        },
    }
}

fn run(dict: &SharedDict, op: Op) -> Reply {
    let result = match op {
        Op::Get { key } => dict.get(key).map(Reply::lookup),
        Op::GetStale { key } => dict.get_stale(key).map(Reply::lookup),
        Op::Write {
            mode,
            evict,
            key,
            value,
            ttl_ms,
            flags,
        } => {
            let ttl = Duration::from_millis(ttl_ms);
            let stored = match (mode, evict) {
                (WriteMode::Set, true) => dict.set(key, value, ttl, flags),
                (WriteMode::Set, false) => dict.safe_set(key, value, ttl, flags),
                (WriteMode::Add, true) => dict.add(key, value, ttl, flags),
                (WriteMode::Add, false) => dict.safe_add(key, value, ttl, flags),
                (WriteMode::Replace, _) => dict.replace(key, value, ttl, flags),
            };
            stored.map(|s| Reply::forcible(s.forcible))
        }
        Op::Delete { key } => dict.delete(key).map(|()| Reply::ok()),
        Op::Incr {
            key,
            delta,
            init,
            init_ttl_ms,
        } => dict
            .incr(key, delta, init, Duration::from_millis(init_ttl_ms))
            .map(|i| Reply {
                forcible: Some(i.forcible),
                ..Reply::with_value(json!(i.value))
            }),
        Op::Push { key, item, end } => match end {
            End::Front => dict.lpush(key, item),
            End::Back => dict.rpush(key, item),
        }
        .map(|len| Reply::with_value(json!(len))),
        Op::Pop { key, end } => match end {
            End::Front => dict.lpop(key),
            End::Back => dict.rpop(key),
        }
        .map(|item| Reply::with_value(scalar_to_json(&item))),
        Op::Llen { key } => dict.llen(key).map(|len| Reply::with_value(json!(len))),
        // 0 means the entry never expires
        Op::Ttl { key } => dict.ttl(key).map(|ttl| {
            let ms = ttl.map_or(0, |t| t.as_millis().max(1) as u64);
            Reply::with_value(json!(ms))
        }),
        Op::Expire { key, ttl_ms } => dict
            .expire(key, Duration::from_millis(ttl_ms))
            .map(|()| Reply::ok()),
        Op::FlushAll => {
            dict.flush_all();
            Ok(Reply::ok())
        }
        Op::FlushExpired { max_count } => {
            Ok(Reply::with_value(json!(dict.flush_expired(max_count))))
        }
        Op::GetKeys { max_count } => {
            let found = dict.get_keys(max_count);
            Ok(Reply {
                keys: Some(
                    found
                        .keys
                        .iter()
                        .map(|k| String::from_utf8_lossy(k).into_owned())
                        .collect(),
                ),
                truncated: Some(found.truncated),
                ..Reply::ok()
            })
        }
        Op::Capacity => Ok(Reply::with_value(json!(dict.capacity()))),
        Op::FreeSpace => Ok(Reply::with_value(json!(dict.free_space()))),
        Op::Stats => Ok(Reply {
            stats: Some(dict.stats()),
            ..Reply::ok()
        }),
    };

    result.unwrap_or_else(Reply::err)
}
