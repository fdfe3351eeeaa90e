//! Conversion between native filesystem paths and the `file://` URLs the
//! bundler's loader works with.
//!
//! Module names handed back to the bundler come in two shapes: absolute file
//! URLs (what the built-in normalizer produces) and base-relative,
//! URL-encoded paths (what package resolution produces). [`to_native`] maps
//! either shape back to a filesystem path.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use sugar_path::SugarPath;

/// Scheme prefix of file URLs.
pub const FILE_SCHEME: &str = "file://";

/// Bytes escaped by `encodeURI`; everything else in the ASCII range is kept.
const URI_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Convert a file URL to a native path using the host separator.
#[must_use]
pub fn to_native_path(url: &str) -> String {
    to_native_path_with(url, MAIN_SEPARATOR)
}

/// Convert a native path to a file URL using the host separator.
#[must_use]
pub fn to_url(path: &str) -> String {
    to_url_with(path, MAIN_SEPARATOR)
}

/// [`to_native_path`] for an explicit separator.
#[must_use]
pub fn to_native_path_with(url: &str, separator: char) -> String {
    let path = url.strip_prefix(FILE_SCHEME).unwrap_or(url);
    if separator == '/' {
        return path.to_string();
    }

    let path = match path.strip_prefix('/') {
        Some(rest) if starts_with_drive(rest) => rest,
        _ => path,
    };
    path.replace('/', separator.encode_utf8(&mut [0; 4]))
}

/// [`to_url`] for an explicit separator.
#[must_use]
pub fn to_url_with(path: &str, separator: char) -> String {
    let slashed = if separator == '/' {
        path.to_string()
    } else {
        path.replace(separator, "/")
    };
    let rest = slashed.strip_prefix('/').unwrap_or(&slashed);
    format!("{FILE_SCHEME}/{rest}")
}

fn starts_with_drive(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Render `path` relative to `base` with `/` separators, URL-encoded.
#[must_use]
pub fn relative_url(base: &Path, path: &Path) -> String {
    let relative = path.relative(base);
    let slashed = relative.as_path().to_slash_lossy();
    utf8_percent_encode(&slashed, URI_ESCAPE).to_string()
}

/// [`relative_url`] with a `./` prefix, including paths outside `base`
/// (`./../shared/a.js`).
#[must_use]
pub fn dot_relative(base: &Path, path: &Path) -> String {
    format!("./{}", relative_url(base, path))
}

/// Undo the encoding applied by [`relative_url`].
#[must_use]
pub fn decode_url_path(encoded: &str) -> String {
    percent_decode_str(encoded).decode_utf8_lossy().into_owned()
}

/// Map a normalized module name back to a filesystem path.
///
/// File URLs are converted directly; anything else is treated as an
/// encoded path relative to `base`.
#[must_use]
pub fn to_native(base: &Path, name: &str) -> PathBuf {
    if name.starts_with(FILE_SCHEME) {
        PathBuf::from(to_native_path(name))
    } else {
        let decoded = decode_url_path(name.strip_prefix("./").unwrap_or(name));
        base.join(decoded).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_url_unix() {
        assert_eq!(to_url_with("/home/app/index.js", '/'), "file:///home/app/index.js");
    }

    #[test]
    fn test_to_url_collapses_single_leading_slash() {
        assert_eq!(to_url_with("//server/share", '/'), "file:////server/share");
    }

    #[test]
    fn test_to_url_windows_drive() {
        assert_eq!(to_url_with(r"C:\app\index.js", '\\'), "file:///C:/app/index.js");
    }

    #[test]
    fn test_to_native_windows_strips_slash_before_drive() {
        assert_eq!(
            to_native_path_with("file:///C:/app/index.js", '\\'),
            r"C:\app\index.js"
        );
    }

    #[test]
    fn test_to_native_without_scheme_is_passthrough_on_unix() {
        assert_eq!(to_native_path_with("/app/x.js", '/'), "/app/x.js");
    }

    #[test]
    fn test_round_trip_unix_paths() {
        for p in ["/", "/a", "/a/b/c.js", "/with space/x.js", "/a/node_modules/@s/p"] {
            assert_eq!(to_native_path_with(&to_url_with(p, '/'), '/'), p);
        }
    }

    #[test]
    fn test_round_trip_windows_paths() {
        for p in [r"C:\", r"C:\a\b.js", r"d:\proj\node_modules\x", r"\rooted\x"] {
            assert_eq!(to_native_path_with(&to_url_with(p, '\\'), '\\'), p);
        }
    }

    #[test]
    fn test_round_trip_host_separator() {
        let p = std::env::temp_dir().join("pkgbridge").join("a.js");
        let p = p.to_string_lossy().into_owned();
        assert_eq!(to_native_path(&to_url(&p)), p);
    }

    #[test]
    fn test_relative_url_encodes_like_encode_uri() {
        let base = Path::new("/proj");
        let path = Path::new("/proj/node_modules/@scope/my pkg/index.js");
        assert_eq!(
            relative_url(base, path),
            "node_modules/@scope/my%20pkg/index.js"
        );
    }

    #[test]
    fn test_dot_relative() {
        let base = Path::new("/proj");
        assert_eq!(dot_relative(base, Path::new("/proj/src/a.js")), "./src/a.js");
        assert_eq!(dot_relative(base, Path::new("/other/a.js")), "./../other/a.js");
    }

    #[test]
    fn test_to_native_relative_name_is_decoded() {
        let base = Path::new("/proj");
        assert_eq!(
            to_native(base, "node_modules/my%20pkg/index.js"),
            PathBuf::from("/proj/node_modules/my pkg/index.js")
        );
        assert_eq!(to_native(base, "./src/a.js"), PathBuf::from("/proj/src/a.js"));
        assert_eq!(to_native(base, "./../other/a.js"), PathBuf::from("/other/a.js"));
    }
}
