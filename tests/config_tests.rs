//! Configuration layering: file, DECKHAND_ variables, CLUSTER_ overrides
//!
//! These tests mutate the process environment, so they run serially and
//! clean up after themselves.

use std::env;
use std::io::Write;

use deckhand::config::load_config;
use serial_test::serial;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

struct EnvGuard(Vec<&'static str>);

impl EnvGuard {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        for (key, value) in vars {
            unsafe { env::set_var(key, value) };
        }
        Self(vars.iter().map(|(key, _)| *key).collect())
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.0 {
            unsafe { env::remove_var(key) };
        }
    }
}

#[test]
#[serial]
fn file_values_load_through_an_explicit_path() {
    let file = write_config(
        r#"
[cluster]
root_url = "https://cluster.example.com"
timeout_secs = 7

[sources]
directory = "deploy/config"
documents = ["roles.json", "hooks.json"]
"#,
    );

    let config = load_config(file.path().to_str()).unwrap();
    assert_eq!(config.cluster.root_url, "https://cluster.example.com");
    assert_eq!(config.cluster.timeout_secs, 7);
    assert_eq!(config.sources.directory, "deploy/config");
    assert_eq!(config.sources.documents, vec!["roles.json", "hooks.json"]);
}

#[test]
#[serial]
fn missing_explicit_path_is_an_error() {
    let result = load_config(Some("/nonexistent/deckhand.toml"));
    assert!(result.is_err());
}

#[test]
#[serial]
fn prefixed_variables_override_the_file() {
    let file = write_config(
        r#"
[cluster]
root_url = "https://file.example.com"
timeout_secs = 7
"#,
    );
    let _env = EnvGuard::set(&[
        ("DECKHAND_CLUSTER__ROOT_URL", "https://env.example.com"),
        ("DECKHAND_CLUSTER__MAX_RETRIES", "9"),
        ("DECKHAND_SOURCES__DIRECTORY", "from-env"),
    ]);

    let config = load_config(file.path().to_str()).unwrap();
    assert_eq!(config.cluster.root_url, "https://env.example.com");
    assert_eq!(config.cluster.max_retries, 9);
    // untouched file values survive the overlay
    assert_eq!(config.cluster.timeout_secs, 7);
    assert_eq!(config.sources.directory, "from-env");
}

#[test]
#[serial]
fn cluster_variables_win_over_everything() {
    let file = write_config(
        r#"
[cluster]
root_url = "https://file.example.com"
client_id = "from-file"
"#,
    );
    let _env = EnvGuard::set(&[
        ("DECKHAND_CLUSTER__ROOT_URL", "https://env.example.com"),
        ("CLUSTER_ROOT_URL", "https://wins.example.com"),
        ("CLUSTER_CLIENT_ID", "from-shell"),
        ("CLUSTER_ACCESS_TOKEN", "shell-token"),
    ]);

    let config = load_config(file.path().to_str()).unwrap();
    assert_eq!(config.cluster.root_url, "https://wins.example.com");
    assert_eq!(config.cluster.client_id.as_deref(), Some("from-shell"));
    let token = config.cluster.access_token.as_ref().unwrap();
    assert_eq!(token.expose_secret(), "shell-token");
}

#[test]
#[serial]
fn environment_alone_is_enough_without_a_file() {
    let _env = EnvGuard::set(&[("CLUSTER_ROOT_URL", "https://only-env.example.com")]);

    // no config file anywhere near a temp working directory; rely on the
    // default paths not existing and the env var carrying the root URL
    let config = load_config(None).unwrap();
    assert_eq!(config.cluster.root_url, "https://only-env.example.com");
    assert_eq!(config.cluster.timeout_secs, 30);
    assert_eq!(config.sources.documents, vec!["resources.json"]);
}

#[test]
#[serial]
fn validation_applies_to_the_merged_result() {
    let file = write_config(
        r#"
[cluster]
root_url = "https://file.example.com"
"#,
    );
    let _env = EnvGuard::set(&[("CLUSTER_ROOT_URL", "not-a-url")]);

    // a valid file does not rescue an invalid override
    assert!(load_config(file.path().to_str()).is_err());
}

#[test]
#[serial]
fn proxy_url_flows_in_from_the_shell() {
    let file = write_config(
        r#"
[cluster]
root_url = "https://cluster.example.com"
"#,
    );
    let _env = EnvGuard::set(&[("CLUSTER_PROXY_URL", "http://localhost:8080")]);

    let config = load_config(file.path().to_str()).unwrap();
    assert_eq!(
        config.cluster.proxy_url.as_deref(),
        Some("http://localhost:8080")
    );
    assert!(config.cluster.require_credentials().is_ok());
    assert_eq!(config.cluster.base_url(), "http://localhost:8080");
}
