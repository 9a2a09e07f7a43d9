use std::io::Write;

use formweave_engine::*;
use pretty_assertions::assert_eq;

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::load_from(dir.path().join("engine.toml"));
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn file_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[assembly]\nduplicate-field = \"last-wins\"\n\n[access]\nmode = \"denylist\"\nplugins = [\"http_repost\"]"
    )
    .unwrap();

    let config = EngineConfig::load_from(file.path());
    assert_eq!(config.assembly.duplicate_field, DuplicateFieldPolicy::LastWins);
    assert_eq!(config.assembly.missing_plugin, MissingPluginPolicy::Skip);
    assert_eq!(config.access.mode, AccessMode::Denylist);
}

#[test]
fn unparsable_file_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[assembly\nthis is not toml").unwrap();
    assert_eq!(EngineConfig::load_from(file.path()), EngineConfig::default());
}
