use semver::Version;

/// Normalize a dotted version string into its concatenated comparison token.
///
/// A single trailing dot is stripped, missing fields are right-padded with
/// zero until three are present, then the dots are removed, leaving a token
/// that can be compared as an integer.
///
/// Examples:
/// - "9" -> "900"
/// - "9.1" -> "910"
/// - "8.3.3" -> "833"
/// - "11.2" -> "1120"
///
/// Fields are not zero-padded to a fixed width, so distinct versions can
/// collide ("9.2" and "9.20" both yield "920"). Ordering decisions inside
/// this crate therefore go through [`parse_version`]; the token survives as
/// the stable version key reported in logs.
///
/// Never fails: malformed input yields some token rather than an error.
pub fn normalize(version: &str) -> String {
    let stripped = version.strip_suffix('.').unwrap_or(version);

    let mut padded = stripped.to_string();
    while padded.matches('.').count() < 2 {
        padded.push_str(".0");
    }

    padded.replace('.', "")
}

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "9" or "9.1" by padding with zeros.
///
/// Examples:
/// - "9" -> Version(9, 0, 0)
/// - "9.1" -> Version(9, 1, 0)
/// - "9.1.2" -> Version(9, 1, 2)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.strip_suffix('.').unwrap_or(version);
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}
