#![deny(clippy::unwrap_used)]

use crate::{
    artifact::{ObjectFile, SourceFile},
    error::FatalError,
    options::BuildOptions,
};

/// Decides whether a source must be recompiled against its object file.
///
/// Equal timestamps rebuild rather than miss a change made within the
/// filesystem's timestamp resolution. Headers are not tracked; a header
/// change is forced through with the clean option.
pub fn is_stale(
    source: &SourceFile,
    object: &ObjectFile,
    options: &BuildOptions,
) -> Result<bool, FatalError> {
    if options.clean {
        return Ok(true);
    }
    let Some(object_time) = object.last_updated() else {
        return Ok(true);
    };
    Ok(source.last_updated()? >= object_time)
}
