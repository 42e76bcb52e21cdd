use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::TempDir;
use toggle::{ConfigTree, Error, Toggle, ToggleOptions};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn str_value(value: Option<&ConfigTree>) -> Option<&str> {
    value.and_then(ConfigTree::as_str)
}

#[test]
fn test_resolves_key_file_and_config() {
    let mut toggle = Toggle::new(
        ToggleOptions::new()
            .with_key_filepath(fixture("key-local.yml"))
            .with_config_filepath(fixture("config.yml")),
    );

    assert_eq!(toggle.key().unwrap().as_deref(), Some("local"));
    assert_eq!(toggle.keys().unwrap(), vec!["local", "remote"]);
    assert_eq!(
        str_value(toggle.get("erb_attribute").unwrap()),
        Some("local_erb_attribute_value")
    );
}

#[test]
fn test_flat_key_file() {
    let mut toggle = Toggle::new(
        ToggleOptions::new()
            .with_key_filepath(fixture("flat-key-local"))
            .with_config_filepath(fixture("config.yml")),
    );

    assert_eq!(
        str_value(toggle.get(":plain_attribute").unwrap()),
        Some("local_plain_attribute_value")
    );
}

#[test]
fn test_values_for_key_render_as_yaml() {
    let mut toggle = Toggle::new(ToggleOptions::new().with_config_filepath(fixture("config.yml")));

    let yaml = toggle
        .config_for("local")
        .unwrap()
        .unwrap()
        .to_yaml_string()
        .unwrap();
    assert_eq!(
        yaml,
        "plain_attribute: local_plain_attribute_value\nerb_attribute: local_erb_attribute_value\n"
    );
}

#[test]
fn test_options_from_toml_and_env() {
    let dir = TempDir::new().unwrap();
    let options_path = dir.path().join("toggle.toml");
    std::fs::write(
        &options_path,
        format!(
            "key = \"local\"\nconfig_filepath = {:?}\n",
            fixture("config.yml").display().to_string()
        ),
    )
    .unwrap();

    std::env::set_var("TOGGLE_IT_KEY", "remote");
    let options = ToggleOptions::from_toml_file(&options_path)
        .unwrap()
        .with_env("TOGGLE_IT");
    let mut toggle = Toggle::new(options);

    assert_eq!(toggle.key().unwrap().as_deref(), Some("remote"));
    assert_eq!(
        str_value(toggle.get("plain_attribute").unwrap()),
        Some("remote_plain_attribute_value")
    );
}

#[test]
fn test_missing_config_reports_not_found() {
    let mut toggle = Toggle::new(ToggleOptions::new().with_config_filepath("/path/to/nothing"));

    let err = toggle.keys().unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, Error::Compile(_)));
}

#[test]
fn test_shared_behind_mutex() {
    let toggle = Mutex::new(Toggle::new(
        ToggleOptions::new()
            .with_key("remote")
            .with_config_filepath(fixture("config.yml")),
    ));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let mut toggle = toggle.lock().unwrap();
                assert_eq!(
                    str_value(toggle.get("plain_attribute").unwrap()),
                    Some("remote_plain_attribute_value")
                );
            });
        }
    });
}
