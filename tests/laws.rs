//! Property tests for the token exchange and patch/diff laws.

use proptest::prelude::*;
use serde_json::{Map, Value};

use swatch::core::model::{TokenDescriptor, TokenKind};
use swatch::core::patch::{apply, diff};
use swatch::core::tokens::{export_tokens, import_tokens};

fn kind() -> impl Strategy<Value = TokenKind>
{
    prop_oneof![
        Just(TokenKind::Color),
        Just(TokenKind::Dimension),
        Just(TokenKind::Duration),
        Just(TokenKind::FontWeight),
        Just(TokenKind::String),
    ]
}

fn token() -> impl Strategy<Value = TokenDescriptor>
{
    ("[a-z]{1,6}", "[a-z][a-z0-9]{0,5}(-[a-z0-9]{1,4})?", "[ -~]{0,12}", kind(), "[a-z/]{0,10}\\.css").prop_map(
        |(category, name, value, kind, source_file)| TokenDescriptor { category, name, value, kind, source_file },
    )
}

fn token_set() -> impl Strategy<Value = Vec<TokenDescriptor>>
{
    prop::collection::vec(token(), 0..24).prop_map(|mut tokens| {
        tokens.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
        tokens.dedup_by(|a, b| a.category == b.category && a.name == b.name);
        tokens
    })
}

/// JSON trees biased toward registry-like shapes: objects with `name`
/// and `category` keys inside arrays
fn json_tree() -> impl Strategy<Value = Value>
{
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-50i64..50).prop_map(|n| Value::Number(n.into())),
        "[a-c]{0,2}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map(prop_oneof![Just("name"), Just("category"), Just("a"), Just("b~/")], inner, 0..4)
                .prop_map(|m| Value::Object(
                    m.into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect::<Map<String, Value>>()
                )),
        ]
    })
}

proptest! {
    #[test]
    fn import_inverts_export(tokens in token_set()) {
        let back = import_tokens(&export_tokens(&tokens)).unwrap();
        prop_assert_eq!(back, tokens);
    }

    #[test]
    fn diff_then_apply_reaches_the_target(a in json_tree(), b in json_tree()) {
        let patch = diff(&a, &b);
        prop_assert_eq!(apply(&a, &patch).unwrap(), b.clone());

        // And the reverse direction undoes it
        let undo = diff(&b, &a);
        prop_assert_eq!(apply(&b, &undo).unwrap(), a);
    }

    #[test]
    fn identical_documents_have_empty_diffs(a in json_tree()) {
        prop_assert!(diff(&a, &a).is_empty());
    }
}
