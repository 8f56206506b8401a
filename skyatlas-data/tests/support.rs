use camino::Utf8PathBuf;

/// Epsilon for coordinate comparisons in tests.
const COORDINATE_EPSILON: f64 = 1.0e-9;

/// Path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Compare floating-point values within a small epsilon.
pub fn assert_close(actual: f64, expected: f64) {
    let delta = (actual - expected).abs();
    assert!(
        delta <= COORDINATE_EPSILON,
        "expected {expected}, got {actual} (|Δ| = {delta})"
    );
}
