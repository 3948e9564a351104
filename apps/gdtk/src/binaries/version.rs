//! Version-aware ordering for Godot version strings.
//!
//! Godot versions are dot-separated numbers of varying length (`2.1`,
//! `3.1.1`, `3.2.3.1`) and are not valid semver, so they are compared
//! component-wise: `3.10` sorts above `3.9`, and `4.0.1` above `4.0`.

use std::cmp::Ordering;

/// One dot-separated piece of a version string.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Component<'a> {
    Number(u64),
    Text(&'a str),
}

fn components(version: &str) -> Vec<Component<'_>> {
    version
        .split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_or(Component::Text(part), Component::Number)
        })
        .collect()
}

/// Compares two version strings component-wise.
///
/// Missing trailing components count as zero, so `4.0` equals `4.0.0` in
/// value; the longer string then sorts higher to keep the order total.
/// Numeric components sort below non-numeric ones.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = components(a);
    let b_parts = components(b);
    let len = a_parts.len().max(b_parts.len());

    for i in 0..len {
        let left = a_parts.get(i).unwrap_or(&Component::Number(0));
        let right = b_parts.get(i).unwrap_or(&Component::Number(0));
        match left.cmp(right) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    a_parts.len().cmp(&b_parts.len())
}

/// Returns the highest version in `versions`, or `None` if empty.
#[must_use]
pub fn latest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare_versions(a, b))
}

/// Sorts version strings newest first.
pub fn sort_newest_first(versions: &mut [&str]) {
    versions.sort_by(|a, b| compare_versions(b, a));
}
