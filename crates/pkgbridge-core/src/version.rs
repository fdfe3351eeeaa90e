use std::fmt::Write;

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version banner for `pkgbridge version`.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("pkgbridge {VERSION}");
    let _ = write!(s, " ({}-{})", std::env::consts::OS, std::env::consts::ARCH);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_names_the_tool() {
        let s = version_string();
        assert!(s.starts_with("pkgbridge "));
        assert!(s.contains(VERSION));
    }
}
