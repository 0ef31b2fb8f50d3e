//! SQL DDL extractor: `CREATE TABLE` statements become tables and columns

use std::path::Path;

use metagraph_core::{Node, NodeId, NodeKind, Provenance, checksum};
use regex::Regex;
use tracing::debug;

use super::source_ref;
use crate::error::ExtractionError;
use crate::extractor::ArtefactExtractor;

pub struct SqlExtractor;

const CREATE_TABLE: &str = r#"(?i)\bCREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([\w."`\[\]]+)\s*\("#;
const TABLE_CONSTRAINT: &str = r#"(?i)^(?:CONSTRAINT\b|CHECK\s*\(|PRIMARY\s+KEY\b|FOREIGN\s+KEY\b|UNIQUE\s*(?:KEY\b|INDEX\b|\()|(?:KEY|INDEX)\s*[\w`"]*\s*\()"#;
const COLUMN_NAME: &str = r#"^(?:"([^"]+)"|`([^`]+)`|\[([^\]]+)\]|(\w+))"#;

fn parse_error(path: &Path, reason: impl ToString) -> ExtractionError {
    ExtractionError::Parse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Parse every `CREATE TABLE` statement in `text`.
///
/// Each table yields a `Table` node followed by one `Column` node per column
/// definition, linked by `has_column` edges in declaration order.
pub fn parse_sql(path: &Path, text: &str) -> Result<Vec<Node>, ExtractionError> {
    let create = Regex::new(CREATE_TABLE).map_err(|e| parse_error(path, e))?;
    let constraint = Regex::new(TABLE_CONSTRAINT).map_err(|e| parse_error(path, e))?;
    let column_name = Regex::new(COLUMN_NAME).map_err(|e| parse_error(path, e))?;

    let code = mask_comments(text);
    let mut nodes = Vec::new();
    let mut consumed = 0;
    for caps in create.captures_iter(&code) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() < consumed {
            continue;
        }
        let table_name = unquote(name.as_str());
        let open = whole.end() - 1;
        let close = matching_paren(&code, open).ok_or_else(|| {
            parse_error(
                path,
                format!(
                    "unterminated CREATE TABLE {} at line {}",
                    table_name,
                    line_of(text, whole.start())
                ),
            )
        })?;
        consumed = close + 1;

        let statement = &text[whole.start()..=close];
        let source = source_ref(path, Some((line_of(text, whole.start()), line_of(text, close))));
        let mut table = Node::new(NodeId::derive(NodeKind::Table, &table_name), NodeKind::Table)
            .with_prop("name", table_name.as_str())
            .with_prov(Provenance::new(source.as_str(), checksum(statement)));

        let mut columns = Vec::new();
        for item in split_top_level(&code[open + 1..close]) {
            let item = item.trim();
            if item.is_empty() || constraint.is_match(item) {
                continue;
            }
            let Some(col) = column_name
                .captures(item)
                .and_then(|c| (1..=4).find_map(|i| c.get(i)))
                .map(|m| m.as_str().to_string())
            else {
                debug!("Skipping unrecognized item in {}: {}", table_name, item);
                continue;
            };
            let col_id = NodeId::derive(NodeKind::Column, &format!("{table_name}:{col}"));
            table = table.with_edge("has_column", col_id.clone());
            columns.push(
                Node::new(col_id, NodeKind::Column)
                    .with_prop("name", col.as_str())
                    .with_prov(Provenance::new(source.as_str(), checksum(&col))),
            );
        }

        debug!("Parsed table {} with {} columns", table_name, columns.len());
        nodes.push(table);
        nodes.extend(columns);
    }
    Ok(nodes)
}

fn unquote(name: &str) -> String {
    name.replace(|c: char| matches!(c, '"' | '`' | '[' | ']'), "")
}

/// `text` with `--` and `/* */` comments blanked to spaces. Byte offsets and
/// line breaks are unchanged, and comment markers inside quotes are kept.
fn mask_comments(text: &str) -> String {
    fn blank(out: &mut String, c: char) {
        if c == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat_n(' ', c.len_utf8()));
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            out.push(c);
            continue;
        }
        match (c, chars.peek().copied()) {
            ('-', Some('-')) => {
                blank(&mut out, c);
                while let Some(&n) = chars.peek() {
                    if n == '\n' {
                        break;
                    }
                    blank(&mut out, n);
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                blank(&mut out, c);
                chars.next();
                blank(&mut out, '*');
                let mut prev = None;
                for n in chars.by_ref() {
                    blank(&mut out, n);
                    if prev == Some('*') && n == '/' {
                        break;
                    }
                    prev = Some(n);
                }
            }
            ('\'' | '"' | '`', _) => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// 1-based line number of byte offset `at`.
fn line_of(text: &str, at: usize) -> usize {
    text[..at].matches('\n').count() + 1
}

/// Byte offset of the `)` closing the `(` at `open`, skipping quoted text.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text[open..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are outside parentheses and quotes.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                items.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&body[start..]);
    items
}

#[async_trait::async_trait]
impl ArtefactExtractor for SqlExtractor {
    async fn extract(&self, path: &Path, text: &str) -> Result<Vec<Node>, ExtractionError> {
        parse_sql(path, text)
    }

    fn name(&self) -> &str {
        "sql"
    }
}
