//! Max/min selection by a numeric key.
//!
//! Items whose key is `None` are skipped. On ties the earliest item wins.
//! Empty input (or no keyed item) returns `None`.

/// The item with the largest key.
pub fn max_by_key<T>(items: &[T], key: impl Fn(&T) -> Option<f64>) -> Option<&T> {
    pick(items, key, |candidate, best| candidate > best)
}

/// The item with the smallest key.
pub fn min_by_key<T>(items: &[T], key: impl Fn(&T) -> Option<f64>) -> Option<&T> {
    pick(items, key, |candidate, best| candidate < best)
}

fn pick<T>(
    items: &[T],
    key: impl Fn(&T) -> Option<f64>,
    better: impl Fn(f64, f64) -> bool,
) -> Option<&T> {
    let mut best: Option<(&T, f64)> = None;
    for item in items {
        let Some(k) = key(item) else { continue };
        match best {
            Some((_, current)) if !better(k, current) => {}
            _ => best = Some((item, k)),
        }
    }
    best.map(|(item, _)| item)
}
