//! `amsync show` command.

use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::model::Map;
use crate::source::{DirectorySource, FlatFileSource};

/// Execute the `show` command.
///
/// Prints map `name` from the flat files, or from the directory when
/// `from_directory` is set, one entry per line in flat-file syntax.
///
/// # Errors
///
/// Returns [`Error::UnknownMap`] if the map does not exist on the chosen
/// side, or the error raised while reading it.
pub fn run(ctx: &ServiceContext, name: &str, from_directory: bool) -> Result<()> {
    let map = load(ctx, name, from_directory)?;
    for line in map.to_lines() {
        println!("{line}");
    }
    Ok(())
}

/// Loads the map the command prints.
///
/// # Errors
///
/// See [`run`].
pub fn load(ctx: &ServiceContext, name: &str, from_directory: bool) -> Result<Map> {
    if from_directory {
        return DirectorySource::new(ctx, true)
            .load_map(name)?
            .ok_or_else(|| Error::UnknownMap { name: name.to_string() });
    }
    let flat = FlatFileSource::new(ctx);
    if !flat.map_exists(name) {
        return Err(Error::UnknownMap { name: name.to_string() });
    }
    flat.load_map(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{CountingClock, MemoryDirectory, MemoryFileSystem};
    use crate::config::Settings;

    fn context() -> ServiceContext {
        ServiceContext::new(
            Settings::new("cn=automounts,dc=example,dc=org", "/maps"),
            Box::new(MemoryFileSystem::new().with_file(
                "/maps/auto.data",
                "zeta nfs2.example.org:/z\nalpha -ro nfs1.example.org:/a\n",
            )),
            Box::new(
                MemoryDirectory::new()
                    .with_object("cn=automounts,dc=example,dc=org", &[("cn", &["automounts"])]),
            ),
            Box::new(CountingClock::new()),
        )
    }

    #[test]
    fn flat_file_map_is_sorted() {
        let map = load(&context(), "auto.data", false).unwrap();
        assert_eq!(
            map.to_lines(),
            vec!["alpha\t\t-ro nfs1.example.org:/a", "zeta\t\tnfs2.example.org:/z"]
        );
    }

    #[test]
    fn unknown_maps_are_reported() {
        let ctx = context();
        assert!(matches!(load(&ctx, "auto.none", false), Err(Error::UnknownMap { .. })));
        assert!(matches!(load(&ctx, "auto.data", true), Err(Error::UnknownMap { .. })));
    }
}
