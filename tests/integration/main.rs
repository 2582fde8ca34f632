//! Integration tests for Kiln

mod bridge;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use kiln::config::Config;
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn kiln() -> Command {
        cargo_bin_cmd!("kiln")
    }

    /// Command bound to a config file with its store inside `temp`
    fn kiln_with(temp: &TempDir, config: &Config) -> Command {
        let path = temp.path().join("config.toml");
        std::fs::write(&path, toml::to_string_pretty(config).unwrap()).unwrap();
        let mut cmd = kiln();
        cmd.env("KILN_CONFIG", &path);
        cmd
    }

    fn isolated_config(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.cache.dir = Some(temp.path().join("store"));
        config.runtime.class_version = Some("52.0".to_string());
        config
    }

    #[test]
    fn help_displays() {
        kiln()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("compiler bridge cache"));
    }

    #[test]
    fn version_displays() {
        kiln()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("kiln"));
    }

    #[test]
    fn config_path_honors_env() {
        let temp = TempDir::new().unwrap();
        kiln_with(&temp, &isolated_config(&temp))
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        kiln_with(&temp, &isolated_config(&temp))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[resolver]"))
            .stdout(predicate::str::contains("52.0"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let temp = TempDir::new().unwrap();
        kiln_with(&temp, &isolated_config(&temp))
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn key_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let config = isolated_config(&temp);

        let first = kiln_with(&temp, &config)
            .args(["key", "--compiler-version", "2.12.8"])
            .assert()
            .success()
            .stdout(predicate::str::contains("__2.12.8__52.0"))
            .get_output()
            .stdout
            .clone();

        kiln_with(&temp, &config)
            .args(["key", "--compiler-version", "2.12.8"])
            .assert()
            .success()
            .stdout(first);
    }

    #[test]
    fn key_runtime_flag_overrides_config() {
        let temp = TempDir::new().unwrap();
        kiln_with(&temp, &isolated_config(&temp))
            .args([
                "key",
                "--compiler-version",
                "2.13.1",
                "--runtime-version",
                "61.0",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("__2.13.1__61.0"));
    }

    #[test]
    fn key_rejects_bad_bridge_coordinates() {
        let temp = TempDir::new().unwrap();
        kiln_with(&temp, &isolated_config(&temp))
            .args(["key", "--compiler-version", "2.12.8", "--bridge", "only:two"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("only:two"));
    }

    #[test]
    fn cache_list_empty() {
        let temp = TempDir::new().unwrap();
        kiln_with(&temp, &isolated_config(&temp))
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached components"));
    }

    #[test]
    fn cache_path_points_at_configured_store() {
        let temp = TempDir::new().unwrap();
        kiln_with(&temp, &isolated_config(&temp))
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("store"));
    }

    #[test]
    fn cache_remove_rejects_path_like_keys() {
        let temp = TempDir::new().unwrap();
        kiln_with(&temp, &isolated_config(&temp))
            .args(["cache", "remove", "../outside"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid cache key"));
    }

    fn publish(repo: &Path, org: &str, name: &str, rev: &str, classifier: Option<&str>) {
        let dir = repo.join(org.replace('.', "/")).join(name).join(rev);
        std::fs::create_dir_all(&dir).unwrap();
        let file = match classifier {
            Some(c) => format!("{}-{}-{}.jar", name, rev, c),
            None => format!("{}-{}.jar", name, rev),
        };
        std::fs::write(dir.join(file), name).unwrap();
    }

    /// Repository, fake compiler and config for an end-to-end provide
    #[cfg(unix)]
    fn end_to_end(temp: &TempDir) -> (Config, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let repo = temp.path().join("repo");
        publish(&repo, "org.example", "iface", "1.9.3", None);
        publish(&repo, "org.example", "bridge_2.12", "1.0", None);
        publish(&repo, "org.example", "bridge_2.12", "1.0", Some("sources"));

        let runs = temp.path().join("runs");
        let script = temp.path().join("fakec");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho run >> '{}'\nwhile [ $# -gt 0 ]; do if [ \"$1\" = \"-d\" ]; then echo compiled > \"$2\"; fi; shift; done\n",
                runs.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = isolated_config(temp);
        config.cache.workspace_dir = Some(temp.path().join("work"));
        config.resolver.repositories = vec![repo.display().to_string()];
        config.compiler.command = script.display().to_string();
        config.compiler.extra_args = Vec::new();
        config.bridge.organization = "org.example".to_string();
        config.bridge.name = "bridge_{binary}".to_string();
        config.bridge.revision = Some("1.0".to_string());
        config.bridge.interface_organization = "org.example".to_string();
        config.bridge.interface_name = "iface".to_string();

        (config, runs)
    }

    #[cfg(unix)]
    #[test]
    fn provide_builds_once_then_serves_from_cache() {
        let temp = TempDir::new().unwrap();
        let (config, runs) = end_to_end(&temp);

        let first = kiln_with(&temp, &config)
            .args(["provide", "--compiler-version", "2.12.8"])
            .assert()
            .success()
            .stdout(predicate::str::contains(".jar"))
            .get_output()
            .stdout
            .clone();

        kiln_with(&temp, &config)
            .args(["provide", "--compiler-version", "2.12.8"])
            .assert()
            .success()
            .stdout(first.clone());

        let jar = PathBuf::from(String::from_utf8(first).unwrap().trim());
        assert!(jar.starts_with(temp.path().join("store")));
        assert_eq!(std::fs::read_to_string(jar).unwrap().trim(), "compiled");
        assert_eq!(std::fs::read_to_string(runs).unwrap().lines().count(), 1);

        kiln_with(&temp, &config)
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("interface-1.9.3"))
            .stdout(predicate::str::contains("__2.12.8__52.0"));
    }

    #[cfg(unix)]
    #[test]
    fn provide_reports_missing_sources() {
        let temp = TempDir::new().unwrap();
        let (mut config, runs) = end_to_end(&temp);
        config.bridge.revision = Some("9.9".to_string());

        kiln_with(&temp, &config)
            .args(["provide", "--compiler-version", "2.12.8"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Could not retrieve"));
        assert!(!runs.exists());
    }

    #[cfg(unix)]
    #[test]
    fn cache_clear_removes_everything() {
        let temp = TempDir::new().unwrap();
        let (config, _) = end_to_end(&temp);

        kiln_with(&temp, &config)
            .args(["provide", "--compiler-version", "2.12.8"])
            .assert()
            .success();

        kiln_with(&temp, &config)
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleared 2 component(s)"));

        kiln_with(&temp, &config)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached components"));
    }
}
