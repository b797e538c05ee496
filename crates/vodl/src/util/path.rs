use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

pub trait VodlPathExt {
    /// Add suffix to file name without changing extension.
    ///
    /// Note this function does not handle multiple suffixes.
    /// For example, `test.tar.gz` with `_suffix` will be `test.tar_suffix.gz`.
    fn with_suffix<T: AsRef<OsStr>>(&self, suffix: T) -> PathBuf;

    /// Append an extra extension after the existing one: `a.ts` -> `a.ts.part`.
    fn append_extension<T: AsRef<OsStr>>(&self, extension: T) -> PathBuf;

    /// Sibling file which is written before being renamed to this path.
    fn part_path(&self) -> PathBuf {
        self.append_extension("part")
    }

    /// Sibling file used as an advisory lock of this path.
    fn lock_path(&self) -> PathBuf {
        self.append_extension("lock")
    }
}

impl VodlPathExt for Path {
    fn with_suffix<T: AsRef<OsStr>>(&self, suffix: T) -> PathBuf {
        let mut filename = OsString::new();

        // {file_stem}_{suffix}.{ext}
        if let Some(file_stem) = self.file_stem() {
            filename.push(file_stem);
        }
        filename.push("_");
        filename.push(suffix);

        if let Some(ext) = self.extension() {
            filename.push(".");
            filename.push(ext);
        }

        self.with_file_name(filename)
    }

    fn append_extension<T: AsRef<OsStr>>(&self, extension: T) -> PathBuf {
        let mut path = self.as_os_str().to_os_string();
        path.push(".");
        path.push(extension);
        PathBuf::from(path)
    }
}

/// Make a human readable title usable as a file name on common filesystems.
pub fn sanitize_file_stem(stem: &str) -> String {
    let sanitized: String = stem
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let sanitized = sanitized.trim_matches(|c: char| c.is_whitespace() || c == '.');

    if sanitized.is_empty() {
        "output".to_string()
    } else {
        sanitized.to_string()
    }
}
