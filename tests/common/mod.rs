//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures, helper functions, and sample
//! inputs to reduce duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_file("values.yml", inputs::VALUES);
//!     fixture.template().arg("-f").arg(fixture.path()).assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::inputs;
    pub use super::TestFixture;
}

/// Sample input files.
#[allow(dead_code)]
pub mod inputs {
    /// Root data values.
    pub const VALUES: &str = "#@data/values\n---\napp:\n  name: web\n  replicas: 1\n";

    /// Template reading the root values.
    pub const TEMPLATE: &str =
        "kind: Deployment\nname: (@= data.values.app.name @)\nreplicas: (@= data.values.app.replicas @)\n";

    /// Schema matching `VALUES`.
    pub const SCHEMA: &str = "#@data/values-schema\n---\napp:\n  name: \"\"\n  replicas: 0\n";

    /// Template that fails to evaluate.
    pub const BROKEN_TEMPLATE: &str = "value: (@= data.values.missing @)\n";
}

/// A test fixture that provides a temporary directory of input files.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_file("values.yml", inputs::VALUES)
///     .with_file("app.yml", inputs::TEMPLATE);
///
/// fixture.template().args(["-f", "."]).assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add the sample values and template.
    #[allow(dead_code)]
    pub fn with_app(self) -> Self {
        self.with_file("config/values.yml", inputs::VALUES)
            .with_file("config/app.yml", inputs::TEMPLATE)
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("strata");
        cmd.current_dir(self.path());
        cmd.env_remove("STRATA_LOG");
        cmd.env_remove("STRATA_ENABLE_EXPERIMENT_SCHEMA");
        cmd
    }

    /// Create a `strata template` command.
    pub fn template(&self) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg("template");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_file() {
        let fixture = TestFixture::new().with_file("nested/test.yml", "a: 1");
        assert!(fixture.path().join("nested/test.yml").exists());
    }

    #[test]
    fn test_inputs_are_valid_yaml() {
        for input in [inputs::VALUES, inputs::SCHEMA] {
            let body = input.split("---\n").nth(1).expect("document body");
            serde_yaml::from_str::<serde_yaml::Value>(body).expect("input should be valid YAML");
        }
    }
}
