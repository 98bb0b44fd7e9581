//! Line parsers turning whitespace-separated automount lines into a [`Map`].
//!
//! Both sources feed this module: the flat-file source passes file lines
//! through as-is, the directory source joins each object's key with its
//! `nisMapEntry` value. Blank and comment lines are filtered before this point.

use super::{Entry, Map, MapKind, MasterEntry, Origin, SubmapEntry};

/// A malformed line in either source. Always fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bad {origin} map format in {map}: {reason}: `{line}`")]
pub struct FormatError {
    /// Source the line came from.
    pub origin: Origin,
    /// Map being parsed.
    pub map: String,
    /// The offending line.
    pub line: String,
    /// What is wrong with it.
    pub reason: String,
}

/// Parses one master map line: `key map` or `key map options`.
///
/// # Errors
///
/// Returns the reason when the line does not have exactly two or three tokens.
pub fn parse_master_line(line: &str) -> Result<(String, MasterEntry), String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [key, map] => {
            Ok(((*key).to_string(), MasterEntry { map: (*map).to_string(), options: None }))
        }
        [key, map, options] => Ok((
            (*key).to_string(),
            MasterEntry { map: (*map).to_string(), options: Some((*options).to_string()) },
        )),
        _ => Err(format!("expected 2 or 3 fields, found {}", tokens.len())),
    }
}

/// Parses one submap line: `key host:path` or `key options host:path`.
///
/// The last token is always the `host:path` pair; anything between the key
/// and that pair is the options string.
///
/// # Errors
///
/// Returns the reason when the line has no `host:path` pair or the pair does
/// not split into exactly two non-empty parts.
pub fn parse_submap_line(line: &str) -> Result<(String, SubmapEntry), String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((key, rest)) = tokens.split_first() else {
        return Err("empty line".to_string());
    };
    let Some((pair, options)) = rest.split_last() else {
        return Err("no server:path specified".to_string());
    };

    let parts: Vec<&str> = pair.split(':').collect();
    let [host, path] = parts.as_slice() else {
        return Err(format!("expected one `:` in server:path pair `{pair}`"));
    };
    if host.is_empty() || path.is_empty() {
        return Err(format!("empty server or path in `{pair}`"));
    }

    let options = if options.is_empty() { None } else { Some(options.join(" ")) };
    Ok((
        (*key).to_string(),
        SubmapEntry { host: (*host).to_string(), path: (*path).to_string(), options },
    ))
}

/// Parses the master map.
///
/// # Errors
///
/// Returns a [`FormatError`] naming the first malformed or duplicated line.
pub fn parse_master(name: &str, lines: &[String], origin: Origin) -> Result<Map, FormatError> {
    collect(name, MapKind::Master, lines, origin, |line| {
        parse_master_line(line).map(|(key, entry)| (key, Entry::Master(entry)))
    })
}

/// Parses a direct map or ordinary submap.
///
/// # Errors
///
/// Returns a [`FormatError`] naming the first malformed or duplicated line.
pub fn parse_submap(
    name: &str,
    kind: MapKind,
    lines: &[String],
    origin: Origin,
) -> Result<Map, FormatError> {
    collect(name, kind, lines, origin, |line| {
        parse_submap_line(line).map(|(key, entry)| (key, Entry::Submap(entry)))
    })
}

/// Parses a map with the routine matching its kind.
///
/// # Errors
///
/// Returns a [`FormatError`] naming the first malformed or duplicated line.
pub fn parse_map(
    name: &str,
    kind: MapKind,
    lines: &[String],
    origin: Origin,
) -> Result<Map, FormatError> {
    match kind {
        MapKind::Master => parse_master(name, lines, origin),
        MapKind::Direct | MapKind::Submap => parse_submap(name, kind, lines, origin),
    }
}

fn collect<F>(
    name: &str,
    kind: MapKind,
    lines: &[String],
    origin: Origin,
    parse_line: F,
) -> Result<Map, FormatError>
where
    F: Fn(&str) -> Result<(String, Entry), String>,
{
    let error = |line: &str, reason: String| FormatError {
        origin,
        map: name.to_string(),
        line: line.trim().to_string(),
        reason,
    };

    let mut map = Map::new(name, kind);
    for line in lines {
        let (key, entry) = parse_line(line).map_err(|reason| error(line, reason))?;
        if map.contains_key(&key) {
            return Err(error(line, format!("duplicate key {key}")));
        }
        map.insert(key, entry);
    }
    Ok(map)
}
