//! End-to-end registry builds through the library API.

mod util;

use anyhow::Result;
use assert_fs::prelude::*;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use swatch::core::build::{BuildOptions, build};
use swatch::core::error::WarningKind;
use swatch::core::model::{ExportKind, Resolution, TokenKind};

fn at(hour: u32) -> BuildOptions
{
    BuildOptions {
        now: Utc
            .with_ymd_and_hms(2026, 4, 1, hour, 0, 0)
            .unwrap(),
        dry_run: false,
        output: None,
    }
}

#[test]
fn builds_components_and_tokens() -> Result<()>
{
    let tmp = util::design_system();
    let report = build(&tmp.path().join("swatch.json"), &at(9))?;
    let reg = &report.registry;

    assert!(report.written);
    assert_eq!(reg.name, "acme-ui");
    assert_eq!(reg.version, "2.0.0");

    let names: Vec<&str> = reg
        .components
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Button", "Card"]);

    let button = &reg.components[0];
    assert_eq!(button.export, ExportKind::Named);
    assert_eq!(button.resolution, Resolution::Direct);
    assert_eq!(button.tokens_used, vec!["color.primary"]);

    let card = &reg.components[1];
    assert_eq!(card.export, ExportKind::Default);
    assert_eq!(card.source_path, "src/components/Card.jsx");
    assert_eq!(card.props[0].name, "title");
    assert!(card.props[0].required);
    assert_eq!(card.props[1].default, Some(json!(false)));
    assert!(
        card.tokens_used
            .contains(&"space.md".to_string())
    );

    let keys: Vec<String> = reg
        .tokens
        .iter()
        .map(|t| t.key())
        .collect();
    assert_eq!(keys, vec!["color.muted", "color.primary", "font.bold", "motion.fast", "radius.sm", "space.md"]);
    assert_eq!(reg.tokens[0].kind, TokenKind::Color);
    assert_eq!(reg.tokens[2].kind, TokenKind::FontWeight);
    assert_eq!(reg.tokens[3].kind, TokenKind::Duration);

    assert!(
        tmp.path()
            .join("registry.json")
            .exists()
    );
    Ok(())
}

#[test]
fn rebuilding_an_unchanged_tree_is_byte_identical() -> Result<()>
{
    let tmp = util::design_system();
    let config = tmp.path().join("swatch.json");

    build(&config, &at(9))?;
    let first = std::fs::read(tmp.path().join("registry.json"))?;

    let again = build(&config, &at(17))?;
    let second = std::fs::read(tmp.path().join("registry.json"))?;

    assert!(!again.written);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn dry_run_writes_nothing() -> Result<()>
{
    let tmp = util::design_system();
    let report = build(&tmp.path().join("swatch.json"), &BuildOptions { dry_run: true, ..at(9) })?;

    assert!(!report.written);
    assert_eq!(report.registry.components.len(), 2);
    assert!(
        !tmp.path()
            .join("registry.json")
            .exists()
    );
    Ok(())
}

#[test]
fn cyclic_barrels_finish_and_are_tagged() -> Result<()>
{
    let tmp = util::design_system();
    tmp.child("src/components/loop/a.ts")
        .write_str("export { Ring } from './b';\n")?;
    tmp.child("src/components/loop/b.ts")
        .write_str("export * from './a';\n")?;

    let report = build(&tmp.path().join("swatch.json"), &at(9))?;

    let truncated: Vec<_> = report
        .registry
        .components
        .iter()
        .filter(|c| c.resolution == Resolution::CycleTruncated)
        .collect();
    assert!(!truncated.is_empty());
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::BarrelTruncated)
    );

    // The rest of the tree is unaffected
    assert!(
        report
            .registry
            .component("Button")
            .is_some()
    );
    Ok(())
}

#[test]
fn legacy_components_key_still_builds() -> Result<()>
{
    let tmp = util::design_system();
    tmp.child("swatch.json")
        .write_str(r#"{"components": "./src/components", "tokens": ["./src/styles/tokens.css"], "output": "./out/reg.json"}"#)?;

    let report = build(&tmp.path().join("swatch.json"), &at(9))?;

    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::LegacyConfig)
    );
    assert_eq!(report.registry.components.len(), 2);
    assert!(
        tmp.path()
            .join("out/reg.json")
            .exists()
    );
    Ok(())
}

#[test]
fn missing_component_source_is_a_config_error() -> Result<()>
{
    let tmp = util::design_system();
    tmp.child("swatch.json")
        .write_str(r#"{"componentSource": "./nowhere", "tokens": "./src/styles", "output": "./registry.json"}"#)?;

    let err = build(&tmp.path().join("swatch.json"), &at(9)).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    Ok(())
}

#[test]
fn typed_component_snapshot() -> Result<()>
{
    let tmp = util::design_system();
    build(&tmp.path().join("swatch.json"), &at(9))?;

    let doc: Value = serde_json::from_slice(&std::fs::read(tmp.path().join("registry.json"))?)?;
    let button = doc["components"][0].clone();

    insta::assert_json_snapshot!(button, @r#"
    {
      "doc": "Primary action.",
      "examples": [
        "<Button label=\"Go\" />"
      ],
      "export": "named",
      "name": "Button",
      "props": [
        {
          "name": "label",
          "required": true,
          "type": {
            "kind": "primitive",
            "name": "string"
          }
        },
        {
          "default": "md",
          "name": "size",
          "required": false,
          "type": {
            "kind": "union",
            "values": [
              "sm",
              "md"
            ]
          }
        }
      ],
      "sourcePath": "src/components/Button.tsx",
      "tokensUsed": [
        "color.primary"
      ]
    }
    "#);
    Ok(())
}
