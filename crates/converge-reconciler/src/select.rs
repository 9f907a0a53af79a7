use std::cmp::Ordering;

use converge_core::ObservedResource;

/// Pick one resource when a lookup matched several.
///
/// Order: highest status precedence (available > updating > creating >
/// failed), then most recently created (unknown creation time sorts last),
/// then smallest provider id. The provider's own ordering is never used.
pub fn select_match(mut candidates: Vec<ObservedResource>) -> Option<ObservedResource> {
    if candidates.len() > 1 {
        candidates.sort_by(compare);
        tracing::warn!(
            matches = candidates.len(),
            selected = %candidates[0].id,
            "identity matched multiple resources, applying tie-break"
        );
    }
    candidates.into_iter().next()
}

fn compare(a: &ObservedResource, b: &ObservedResource) -> Ordering {
    b.status
        .precedence()
        .cmp(&a.status.precedence())
        .then_with(|| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.cmp(&b.id))
}
