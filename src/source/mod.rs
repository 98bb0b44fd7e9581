//! The two map sources: authoritative flat files and the directory mirror.

pub mod directory;
pub mod flat_file;

pub use directory::{Conflict, DirectorySource, Listing};
pub use flat_file::{FlatFileSource, Orphans};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::model::Origin;

/// Orders map names the way every pass walks them: master first, direct
/// map second if present, then the remaining names carrying the submap
/// prefix in ascending order.
///
/// # Errors
///
/// Returns [`Error::MasterMapMissing`] if the master map is not among `names`.
pub fn order_map_names(
    mut names: Vec<String>,
    settings: &Settings,
    origin: Origin,
) -> Result<Vec<String>> {
    let master = &settings.master_map_name;
    if !names.contains(master) {
        return Err(Error::MasterMapMissing { name: master.clone(), origin });
    }
    names.retain(|n| n != master);

    let mut ordered = vec![master.clone()];
    if let Some(direct) = &settings.direct_map_name {
        if names.contains(direct) {
            names.retain(|n| n != direct);
            ordered.push(direct.clone());
        }
    }

    names.sort();
    names.dedup();
    ordered.extend(names.into_iter().filter(|n| n.starts_with(&settings.submap_prefix)));
    Ok(ordered)
}

/// Whether `name` is a map this tool manages.
#[must_use]
pub fn is_map_name(name: &str, settings: &Settings) -> bool {
    name == settings.master_map_name
        || settings.direct_map_name.as_deref() == Some(name)
        || name.starts_with(&settings.submap_prefix)
}
