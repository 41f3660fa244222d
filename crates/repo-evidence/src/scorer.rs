//! File importance ranking.
//!
//! Scores are a pure function of the path string. Higher scores mean the file
//! says more about the architecture of the project per byte fetched.

/// Documentation entry point (README).
pub const SCORE_DOCS: u8 = 100;
/// Manifest / dependency declaration.
pub const SCORE_MANIFEST: u8 = 90;
/// Container / orchestration descriptors.
pub const SCORE_CONTAINER: u8 = 85;
/// Configuration files.
pub const SCORE_CONFIG: u8 = 80;
/// Files whose name suggests request handling or business logic.
pub const SCORE_APP_LOGIC: u8 = 70;
/// General source by extension.
pub const SCORE_SOURCE: u8 = 50;
/// Test and spec files.
pub const SCORE_TEST: u8 = 20;
/// Fallback for anything unclassified.
pub const SCORE_DEFAULT: u8 = 10;
/// Lock files and binary artifacts.
pub const SCORE_NOISE: u8 = 0;

const MANIFEST_MARKERS: &[&str] = &["package.json", "pom.xml", "requirements.txt"];
const CONTAINER_MARKERS: &[&str] = &["docker", "k8s", "helm"];
const CONFIG_MARKERS: &[&str] = &["config", "settings", "application.y"];
const APP_LOGIC_MARKERS: &[&str] = &["controller", "service", "api"];
const SOURCE_EXTENSIONS: &[&str] = &[".ts", ".js", ".java", ".py", ".go"];
const NOISE_EXTENSIONS: &[&str] = &[
    ".lock", ".png", ".jpg", ".jpeg", ".gif", ".ico", ".pdf", ".zip", ".jar",
];
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];
const TEST_NAME_MARKERS: &[&str] = &[".test.", ".spec.", "_test.", "_spec."];

/// Score a repository path in `[0, 100]`.
///
/// Tiers are checked highest first and the first match wins, except that
/// test files are recognised before the plain source-extension tier so
/// `tests/foo.spec.ts` ranks below `src/index.ts`.
pub fn score(path: &str) -> u8 {
    let lower = path.to_lowercase();

    if lower.contains("readme.md") {
        return SCORE_DOCS;
    }
    if contains_any(&lower, MANIFEST_MARKERS) {
        return SCORE_MANIFEST;
    }
    if contains_any(&lower, CONTAINER_MARKERS) {
        return SCORE_CONTAINER;
    }
    if contains_any(&lower, CONFIG_MARKERS) {
        return SCORE_CONFIG;
    }
    if contains_any(&lower, APP_LOGIC_MARKERS) {
        return SCORE_APP_LOGIC;
    }
    if is_test_path(&lower) {
        return SCORE_TEST;
    }
    if SOURCE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return SCORE_SOURCE;
    }
    if NOISE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return SCORE_NOISE;
    }
    SCORE_DEFAULT
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Test detection works on path segments, not raw substrings, so that
/// `src/latest.ts` or `inspector.py` are not mistaken for tests.
fn is_test_path(lower: &str) -> bool {
    let mut segments = lower.split('/').peekable();
    while let Some(segment) = segments.next() {
        let is_file = segments.peek().is_none();
        if !is_file && TEST_DIRS.contains(&segment) {
            return true;
        }
        if is_file
            && (segment.starts_with("test_")
                || TEST_NAME_MARKERS.iter().any(|m| segment.contains(m)))
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_paths() {
        assert_eq!(score("README.md"), 100);
        assert_eq!(score("src/index.ts"), 50);
        assert_eq!(score("tests/foo.spec.ts"), 20);
        assert!(score("README.md") > score("src/index.ts"));
        assert!(score("src/index.ts") > score("tests/foo.spec.ts"));
    }

    #[test]
    fn test_score_is_deterministic() {
        for path in ["README.md", "a/b/c.go", "Cargo.lock", "weird/path with space"] {
            assert_eq!(score(path), score(path));
        }
    }

    #[test]
    fn test_tiers() {
        assert_eq!(score("docs/readme.md"), SCORE_DOCS);
        assert_eq!(score("web/package.json"), SCORE_MANIFEST);
        assert_eq!(score("pom.xml"), SCORE_MANIFEST);
        assert_eq!(score("requirements.txt"), SCORE_MANIFEST);
        assert_eq!(score("Dockerfile"), SCORE_CONTAINER);
        assert_eq!(score("deploy/k8s/deployment.yaml"), SCORE_CONTAINER);
        assert_eq!(score("charts/helm/values.yaml"), SCORE_CONTAINER);
        assert_eq!(score("src/config.ts"), SCORE_CONFIG);
        assert_eq!(score("src/main/resources/application.yml"), SCORE_CONFIG);
        assert_eq!(score("app/settings.py"), SCORE_CONFIG);
        assert_eq!(score("src/UserController.java"), SCORE_APP_LOGIC);
        assert_eq!(score("src/order_service.go"), SCORE_APP_LOGIC);
        assert_eq!(score("src/api/routes.rb"), SCORE_APP_LOGIC);
        assert_eq!(score("pkg/model.py"), SCORE_SOURCE);
        assert_eq!(score("src/util.test.js"), SCORE_TEST);
        assert_eq!(score("test_parser.rb"), SCORE_TEST);
        assert_eq!(score("yarn.lock"), SCORE_NOISE);
        assert_eq!(score("assets/logo.png"), SCORE_NOISE);
        assert_eq!(score("assets/photo.jpg"), SCORE_NOISE);
        assert_eq!(score("LICENSE"), SCORE_DEFAULT);
        assert_eq!(score("src/lib.rs"), SCORE_DEFAULT);
    }

    #[test]
    fn test_first_match_wins() {
        // README beats the test directory it lives in.
        assert_eq!(score("tests/README.md"), SCORE_DOCS);
        // Container marker beats config marker.
        assert_eq!(score("docker/config.json"), SCORE_CONTAINER);
        // App-logic name beats the test tier.
        assert_eq!(score("tests/api_client.spec.ts"), SCORE_APP_LOGIC);
    }

    #[test]
    fn test_segment_based_test_detection() {
        assert_eq!(score("src/latest.ts"), SCORE_SOURCE);
        assert_eq!(score("src/inspector.py"), SCORE_SOURCE);
        assert_eq!(score("src/__tests__/widget.js"), SCORE_TEST);
        assert_eq!(score("pkg/handler_test.go"), SCORE_TEST);
    }

    #[test]
    fn test_scores_are_bounded() {
        for path in ["", "/", "a", "README.md", "x.png", "deep/nested/thing.py"] {
            assert!(score(path) <= 100);
        }
    }
}
