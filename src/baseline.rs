//! Fixtures for comparing client output against recorded baselines.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Queries with recorded output, paired with the suffix of their
/// input and baseline files.
pub const TEST_QUERIES: [(&str, &str); 4] = [
    ("SELECT 1", "small.txt"),
    ("SELECT 1; SELECT 2;", "multiple.txt"),
    (
        "SELECT xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
        "col_too_wide.txt",
    ),
    (
        "SELECT REPLICATE(CAST('X,' AS VARCHAR(MAX)), 1024)",
        "col_wide.txt",
    ),
];

/// Returns the `(input, baseline)` file paths for a test suffix under `dir`.
pub fn io_paths(dir: impl AsRef<Path>, suffix: &str) -> (PathBuf, PathBuf) {
    let dir = dir.as_ref();
    (
        dir.join("test_query_inputs").join(format!("input_{suffix}")),
        dir.join("test_query_baseline")
            .join(format!("baseline_{suffix}")),
    )
}

/// Reads a baseline file with carriage returns removed and surrounding
/// whitespace trimmed, so baselines recorded on Windows compare equal.
pub fn read_baseline(path: impl AsRef<Path>) -> io::Result<String> {
    let content = fs::read_to_string(path)?;
    Ok(content.replace('\r', "").trim().to_owned())
}

/// Path under `<root>/temp`, joined with `parts`.
pub fn temp_path<I, P>(root: impl AsRef<Path>, parts: I) -> PathBuf
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut path = root.as_ref().join("temp");
    path.extend(parts);
    path
}
