//! Display order for extracted page files.
//!
//! Stems are left-padded with zeros to [`PAD_WIDTH`] characters and compared ordinally, so
//! `2.png` sorts before `10.png`. Stems longer than the pad width are left untouched and fall
//! back to plain lexical order.

use std::cmp::Ordering;

pub const PAD_WIDTH: usize = 10;

/// Sort key for a page file name.
pub fn sort_key(file_name: &str) -> String {
    let stem = super::util::archive_stem(file_name);
    let len = stem.chars().count();
    if len >= PAD_WIDTH {
        return stem.to_string();
    }

    let mut key = String::with_capacity(PAD_WIDTH + stem.len() - len);
    key.extend(std::iter::repeat_n('0', PAD_WIDTH - len));
    key.push_str(stem);
    key
}

/// Compare two file names by their padded stems, breaking ties on the full name.
pub fn compare(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b)).then_with(|| a.cmp(b))
}

/// Return `names` in page order.
pub fn order<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> Vec<S> {
    let mut keyed: Vec<(String, S)> =
        names.into_iter().map(|name| (sort_key(name.as_ref()), name)).collect();
    keyed.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.as_ref().cmp(b.as_ref())));
    keyed.into_iter().map(|(_, name)| name).collect()
}
