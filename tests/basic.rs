use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::tempdir;

use fileflow::model::{self, ProcedureType};

#[test]
fn test_configuration_loading() -> Result<()> {
    let dir = tempdir()?;
    let config_path = dir.path().join("config.json");
    let config = json!({
        "meta": { "name": "housekeeping", "author": "ops" },
        "procedures": [
            {
                "kind": "move", "id": "1", "name": "sort",
                "source": dir.path().join("in"), "target": dir.path().join("out"),
                "discover": "recursive", "placement": "structural", "conflict": "rename",
                "filter": { "include": ["*.txt"] }
            },
            { "kind": "delete", "source": dir.path(), "discover": "flat", "delete": "hard" },
            { "kind": "clean", "id": "3", "source": dir.path() },
            { "kind": "zip", "id": "4" }
        ]
    });
    fs::write(&config_path, config.to_string())?;

    let config = model::load_configuration(&config_path)?;
    assert_eq!(config.meta.name.as_deref(), Some("housekeeping"));
    assert!(!config.options.stop_on_error);

    let procedures = config.procedures()?;
    let kinds: Vec<_> = procedures.iter().map(|p| p.procedure_type()).collect();
    assert_eq!(
        kinds,
        vec![
            ProcedureType::Move,
            ProcedureType::Delete,
            ProcedureType::Clean,
            ProcedureType::Zip
        ]
    );
    assert_eq!(procedures[0].name, "sort");
    // Missing id gets a UUID, missing name falls back to the id.
    assert_eq!(procedures[1].id.len(), 36);
    assert_eq!(procedures[1].name, procedures[1].id);
    assert_eq!(procedures[2].name, "3");
    Ok(())
}

#[test]
fn test_configuration_save_and_reload() -> Result<()> {
    let dir = tempdir()?;
    let config = model::from_json(
        &json!({
            "options": { "stop_on_error": true },
            "procedures": [{ "kind": "clean", "id": "c", "name": "tidy", "source": "/var/tmp/x" }]
        })
        .to_string(),
    )?;
    let path = dir.path().join("saved.json");
    model::save_configuration(&path, &config)?;

    let reloaded = model::load_configuration(&path)?;
    assert!(reloaded.options.stop_on_error);
    let procedures = reloaded.procedures()?;
    assert_eq!(procedures[0].id, "c");
    assert_eq!(procedures[0].name, "tidy");
    Ok(())
}

#[test]
fn test_invalid_configuration_is_rejected() -> Result<()> {
    let unknown_kind = model::from_json(r#"{"procedures": [{"kind": "shred", "source": "/x"}]}"#);
    assert!(unknown_kind.is_err());

    let bad_pattern = model::from_json(
        &json!({
            "procedures": [{
                "kind": "delete", "source": "/x", "discover": "flat", "delete": "hard",
                "filter": { "include": ["(unclosed"], "syntax": "regex" }
            }]
        })
        .to_string(),
    )?;
    assert!(bad_pattern.procedures().is_err());
    Ok(())
}

#[test]
fn test_schema_generation() {
    let schema = model::generate_schema();
    assert!(schema.contains("$schema"));
    assert!(schema.contains("Configuration"));
    assert!(schema.contains("procedures"));
}
