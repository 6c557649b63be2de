//! Shared fixtures for integration tests
//!
//! A small design system: a typed TSX component, a propTypes JSX component
//! with a co-located stylesheet, a barrel, and a token sheet.

#![allow(dead_code)]

use assert_fs::prelude::*;

pub const CONFIG: &str = r#"{
  "name": "acme-ui",
  "version": "2.0.0",
  "componentSource": "./src/components",
  "tokens": "./src/styles",
  "output": "./registry.json"
}
"#;

pub const BUTTON_TSX: &str = r#"import React from 'react';

export interface ButtonProps {
  label: string;
  size?: 'sm' | 'md';
}

/**
 * Primary action.
 * @example <Button label="Go" />
 */
export function Button({ label, size = 'md' }: ButtonProps) {
  return <button style={{ color: 'var(--color-primary)' }}>{label}</button>;
}
"#;

pub const CARD_JSX: &str = r#"import PropTypes from 'prop-types';
import './Card.module.css';

export default function Card({ title, elevated = false }) {
  return <div className="card">{title}</div>;
}

Card.propTypes = {
  title: PropTypes.string.isRequired,
  elevated: PropTypes.bool,
};
"#;

pub const CARD_CSS: &str = ".card { padding: var(--space-md); border-radius: var(--radius-sm); }\n";

pub const TOKENS_CSS: &str = r#":root {
  /* palette */
  --color-primary: #0055ff;
  --color-muted: rgb(120, 120, 120);
  --space-md: 16px;
  --radius-sm: 4px;
  --motion-fast: 150ms;
  --font-bold: 700;
}
"#;

/// Fresh project with `swatch.json` at its root
pub fn design_system() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("swatch.json")
        .write_str(CONFIG)
        .expect("write config");
    tmp.child("src/components/Button.tsx")
        .write_str(BUTTON_TSX)
        .expect("write Button");
    tmp.child("src/components/Card.jsx")
        .write_str(CARD_JSX)
        .expect("write Card");
    tmp.child("src/components/Card.module.css")
        .write_str(CARD_CSS)
        .expect("write Card css");
    tmp.child("src/components/index.ts")
        .write_str("export { Button } from './Button';\n")
        .expect("write barrel");
    tmp.child("src/styles/tokens.css")
        .write_str(TOKENS_CSS)
        .expect("write tokens");

    tmp
}
