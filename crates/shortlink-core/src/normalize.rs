/// Returns the storage key for a short link display name.
///
/// The key is the name lowercased with every `-` removed, so `Foo-Bar`,
/// `foobar` and `FOO-BAR` all resolve to `foobar`. Both links and click
/// stats are keyed by it.
///
/// Normalizing a key returns the same key.
pub fn normalize(short: &str) -> String {
    short
        .chars()
        .filter(|&c| c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
