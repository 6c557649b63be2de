//! Filepath: src/infra/utils.rs
//! Utility helpers organized by small, focused structs.
//! All functions are associated fns to keep call sites
//! ergonomic, testable, and discoverable.

// Tree-sitter types for node helpers
use tree_sitter::Node;

/// Common Tree-sitter node helpers
pub struct TsNodeUtils;

impl TsNodeUtils
{
    /// Named children in source order
    pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>>
    {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .collect()
    }

    /// All children (named and anonymous) in source order
    pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>>
    {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .collect()
    }

    /// Source text of a node; empty when the range is not valid UTF-8
    pub fn text<'a>(
        node: Node,
        src: &'a str,
    ) -> &'a str
    {
        src.get(node.start_byte()..node.end_byte())
            .unwrap_or("")
    }

    /// Extract text of a child field if present
    pub fn field_text<'a>(
        node: Node,
        field: &str,
        src: &'a str,
    ) -> Option<&'a str>
    {
        // Locate the child by field name
        let child = node.child_by_field_name(field)?;

        Some(Self::text(child, src))
    }

    /// True when any direct child (named or not) has `kind`
    pub fn has_child_kind(
        node: Node,
        kind: &str,
    ) -> bool
    {
        Self::children(node)
            .iter()
            .any(|c| c.kind() == kind)
    }

    /// 1-based row of the first ERROR or MISSING node, if any
    pub fn first_error_row(node: Node) -> Option<usize>
    {
        if !node.has_error()
        {
            return None;
        }

        if node.is_error() || node.is_missing()
        {
            return Some(node.start_position().row + 1);
        }

        Self::children(node)
            .into_iter()
            .find_map(Self::first_error_row)
            .or(Some(node.start_position().row + 1))
    }
}

/// JSDoc block helpers
pub struct JsDocUtils;

/// Description and `@example` bodies of one doc block
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JsDoc
{
    pub description: Option<String>,
    pub examples: Vec<String>,
}

impl JsDocUtils
{
    /// Parse a `/** ... */` comment; None for other comment forms
    pub fn parse(comment: &str) -> Option<JsDoc>
    {
        let t = comment.trim();
        if !t.starts_with("/**") || t == "/**/"
        {
            return None;
        }

        let body = t
            .trim_start_matches("/**")
            .trim_end_matches("*/");

        // Strip the conventional " * " gutter but keep example indentation
        let lines: Vec<&str> = body
            .lines()
            .map(|l| {
                let l = l.trim_start();
                let l = l
                    .strip_prefix('*')
                    .unwrap_or(l);
                l.strip_prefix(' ')
                    .unwrap_or(l)
                    .trim_end()
            })
            .collect();

        let mut doc = JsDoc::default();
        let mut description: Vec<&str> = Vec::new();
        let mut example: Option<Vec<&str>> = None;
        let mut in_other_tag = false;

        for line in lines
        {
            if let Some(rest) = line
                .trim_start()
                .strip_prefix('@')
            {
                if let Some(ex) = example.take()
                {
                    Self::push_example(&mut doc, &ex);
                }

                if let Some(after) = rest.strip_prefix("example")
                {
                    let first = after.trim();
                    example = Some(if first.is_empty() { vec![] } else { vec![first] });
                    in_other_tag = false;
                }
                else
                {
                    in_other_tag = true;
                }
                continue;
            }

            if let Some(ex) = example.as_mut()
            {
                ex.push(line);
            }
            else if !in_other_tag
            {
                description.push(line);
            }
        }

        if let Some(ex) = example.take()
        {
            Self::push_example(&mut doc, &ex);
        }

        let text = description
            .join("\n")
            .trim()
            .to_string();
        doc.description = (!text.is_empty()).then_some(text);

        Some(doc)
    }

    fn push_example(
        doc: &mut JsDoc,
        lines: &[&str],
    )
    {
        let mut text = lines.join("\n");

        // Drop a surrounding markdown fence
        let trimmed = text.trim();
        if trimmed.starts_with("```")
        {
            let inner: Vec<&str> = trimmed
                .lines()
                .skip(1)
                .take_while(|l| !l.trim_start().starts_with("```"))
                .collect();
            text = inner.join("\n");
        }

        let text = text
            .trim_matches('\n')
            .trim_end()
            .to_string();
        if !text.is_empty()
        {
            doc.examples
                .push(text);
        }
    }
}

/// Identifier casing helpers
pub struct CaseUtils;

impl CaseUtils
{
    /// `button-group` / `button_group` / `buttonGroup` → `ButtonGroup`
    pub fn pascal(s: &str) -> String
    {
        s.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|p| !p.is_empty())
            .map(|p| {
                let mut chars = p.chars();
                match chars.next()
                {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars)
                        .collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    }

    /// Component names start with an uppercase letter
    pub fn is_component_name(name: &str) -> bool
    {
        name.chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests
{
    use tree_sitter::Parser;

    use super::*;

    #[test]
    fn jsdoc_description_and_examples()
    {
        let c = r#"/**
 * Primary call to action.
 * Use sparingly.
 * @param size how big
 * @example
 * <Button size="lg" />
 * @example <Button />
 */"#;
        let doc = JsDocUtils::parse(c).unwrap();
        assert_eq!(doc.description.as_deref(), Some("Primary call to action.\nUse sparingly."));
        assert_eq!(doc.examples, vec![r#"<Button size="lg" />"#.to_string(), "<Button />".to_string()]);
    }

    #[test]
    fn jsdoc_fenced_example_keeps_indentation()
    {
        let c = "/**\n * @example\n * ```tsx\n * <Card>\n *   <p/>\n * </Card>\n * ```\n */";
        let doc = JsDocUtils::parse(c).unwrap();
        assert_eq!(doc.description, None);
        assert_eq!(doc.examples, vec!["<Card>\n  <p/>\n</Card>".to_string()]);
    }

    #[test]
    fn plain_comments_are_not_docs()
    {
        assert_eq!(JsDocUtils::parse("// hi"), None);
        assert_eq!(JsDocUtils::parse("/* hi */"), None);
    }

    #[test]
    fn pascal_case()
    {
        assert_eq!(CaseUtils::pascal("button-group"), "ButtonGroup");
        assert_eq!(CaseUtils::pascal("icon_button"), "IconButton");
        assert_eq!(CaseUtils::pascal("card"), "Card");
        assert!(CaseUtils::is_component_name("Card"));
        assert!(!CaseUtils::is_component_name("useCard"));
    }

    #[test]
    fn error_rows_are_reported()
    {
        let mut p = Parser::new();
        p.set_language(&tree_sitter_javascript::LANGUAGE.into())
            .expect("set language");

        let ok = p
            .parse("export const A = 1;", None)
            .expect("parse");
        assert_eq!(TsNodeUtils::first_error_row(ok.root_node()), None);

        let bad = p
            .parse("const a = 1;\nexport function (", None)
            .expect("parse");
        assert!(TsNodeUtils::first_error_row(bad.root_node()).is_some());
    }
}
