//! Release tag discovery
//!
//! The newest release tag is the baseline every new release merges in, so a
//! release builds on the previous one instead of re-merging history. With no
//! release tag yet, mainline is the baseline.

use tracing::debug;

use crate::errors::Result;
use crate::git::{RepositoryOperations, TagInfo};
use crate::naming::NamingPolicy;

/// Pick the tag whose commit is newest.
///
/// Ties on commit time go to the lexicographically greatest tag name so the
/// choice does not depend on listing order.
pub fn select_latest<'a, I>(tags: I) -> Option<&'a TagInfo>
where
    I: IntoIterator<Item = &'a TagInfo>,
{
    tags.into_iter().max_by(|a, b| {
        a.committed_at
            .cmp(&b.committed_at)
            .then_with(|| a.name.cmp(&b.name))
    })
}

pub fn latest_release_tag(
    repo: &dyn RepositoryOperations,
    naming: &NamingPolicy,
) -> Result<Option<TagInfo>> {
    let tags = repo.tags()?;
    let latest = select_latest(tags.iter().filter(|tag| naming.is_release_tag(&tag.name))).cloned();
    debug!(
        candidates = tags.len(),
        latest = latest.as_ref().map(|tag| tag.name.as_str()),
        "resolved latest release tag"
    );
    Ok(latest)
}

/// Ref to merge into an integration branch before releasing it
pub fn resolve_baseline(
    repo: &dyn RepositoryOperations,
    naming: &NamingPolicy,
    mainline: &str,
) -> Result<String> {
    Ok(latest_release_tag(repo, naming)?
        .map(|tag| tag.name)
        .unwrap_or_else(|| mainline.to_string()))
}
