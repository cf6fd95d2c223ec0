//! Arbor CLI - XML tree inspection tool
//!
//! Usage:
//!   arbor <file>                  Parse and display the element tree
//!   arbor <file> --format xml     Re-serialize with indentation
//!   arbor <file> --format json    Output the tree as JSON
//!   arbor <file> --format tokens  Show the token stream
//!   arbor --xml '<a><b/></a>'     Parse an inline string

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use arbor_common::warning::warn_once;
use arbor_dom::{ElementId, ElementTree};
use arbor_xml::{
    EncodingDecoder, ParseOptions, TokenSource, XmlTokenizer, parse_elements_with_options,
    parse_with_options, to_compact_string, to_string,
};
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// Arbor - inspect, reformat and dump XML element trees
#[derive(Parser, Debug)]
#[command(name = "arbor")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Print the element tree
    arbor feed.xml

    # Pretty-print with declarations hoisted to the root
    arbor --format xml feed.xml

    # Several top-level elements
    arbor --elements --xml '<a/><b/>'

    # Dump as JSON
    arbor --format json feed.xml

    # Read a windows-1252 or Shift_JIS file
    arbor --decode legacy.xml
"#)]
struct Cli {
    /// Path to the XML file
    #[arg(value_name = "FILE")]
    path: Option<PathBuf>,

    /// Parse an XML string directly instead of a file
    #[arg(long, value_name = "XML")]
    xml: Option<String>,

    /// What to print
    #[arg(short, long, value_enum, default_value_t = Format::Tree)]
    format: Format,

    /// Accept any number of top-level elements instead of one document
    #[arg(short, long)]
    elements: bool,

    /// Decode input whose XML declaration names a non-UTF-8 encoding
    #[arg(long)]
    decode: bool,

    /// Reject elements nested deeper than this
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
enum Format {
    /// Indented outline with colors
    Tree,
    /// Pretty-printed XML
    Xml,
    /// XML without whitespace between elements
    Compact,
    /// Nested JSON objects
    Json,
    /// The raw token stream
    Tokens,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let input = read_input(&cli)?;
    let options = parse_options(&cli);

    if cli.format == Format::Tokens {
        return print_tokens(&input, &options);
    }
    let (tree, roots) = parse_input(&input, &options, cli.elements)?;

    match cli.format {
        Format::Tree => {
            println!("=== Elements ({} in tree) ===", tree.len());
            for &root in &roots {
                print_tree(&tree, root, 0);
            }
        }
        Format::Xml => {
            for &root in &roots {
                print!("{}", to_string(&tree, root).context("failed to serialize")?);
            }
        }
        Format::Compact => {
            for &root in &roots {
                println!("{}", to_compact_string(&tree, root).context("failed to serialize")?);
            }
        }
        Format::Json => println!("{}", tree_json(&tree, &roots, cli.elements)?),
        Format::Tokens => {}
    }
    Ok(())
}

/// The parsed tree and its top-level elements.
fn parse_input(
    input: &[u8],
    options: &ParseOptions,
    elements: bool,
) -> Result<(ElementTree, Vec<ElementId>)> {
    if elements {
        let forest =
            parse_elements_with_options(input, options).context("failed to parse elements")?;
        Ok((forest.tree, forest.roots))
    } else {
        let document = parse_with_options(input, options).context("failed to parse document")?;
        let (tree, root) = document.into_parts();
        Ok((tree, root.into_iter().collect()))
    }
}

/// Raw bytes of the input; decoding is left to the tokenizer.
fn read_input(cli: &Cli) -> Result<Vec<u8>> {
    if let Some(ref xml) = cli.xml {
        if cli.path.is_some() {
            warn_once("CLI", "both FILE and --xml given, using --xml");
        }
        Ok(xml.clone().into_bytes())
    } else if let Some(ref path) = cli.path {
        fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))
    } else {
        bail!("no input: pass a FILE or --xml")
    }
}

fn parse_options(cli: &Cli) -> ParseOptions {
    let mut options = ParseOptions::new();
    if cli.decode {
        options = options.with_charset_decoder(EncodingDecoder);
    }
    if let Some(limit) = cli.max_depth {
        options = options.with_max_depth(limit);
    }
    options
}

fn print_tokens(input: &[u8], options: &ParseOptions) -> Result<()> {
    let mut tokenizer = XmlTokenizer::with_decoder(input, options.charset_decoder.as_ref());
    let mut index = 0;
    loop {
        let token = tokenizer
            .next_token()
            .with_context(|| format!("tokenizing failed after {index} tokens"))?;
        let kind = token.kind().to_string();
        let line = tokenizer.line();
        println!("  {index:3} L{line:<4} {} {token}", format!("{kind:<11}").dimmed());
        if token.is_eof() {
            return Ok(());
        }
        index += 1;
    }
}

fn print_tree(tree: &ElementTree, id: ElementId, depth: usize) {
    let Some(element) = tree.get(id) else {
        return;
    };
    let indent = "  ".repeat(depth);

    let attributes: Vec<String> = element
        .attributes
        .iter()
        .map(|attribute| {
            format!(
                " {}={}",
                attribute.name.yellow(),
                format!("\"{}\"", attribute.value).green()
            )
        })
        .collect();
    let content = match element.content.as_deref() {
        Some(content) => format!(" \"{}\"", preview(content, 50)),
        None => String::new(),
    };
    let line = format!("{indent}<{}{}>{content}", element.name.cyan(), attributes.join(""));
    println!("{line}");

    for &child in element.children() {
        print_tree(tree, child, depth + 1);
    }
}

/// First `limit` characters of `text`, with an ellipsis if cut.
fn preview(text: &str, limit: usize) -> String {
    let flat = text.replace('\n', "\\n");
    match flat.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[derive(Debug, Serialize)]
struct ElementJson<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attributes: Vec<AttributeJson<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<ElementJson<'a>>,
}

#[derive(Debug, Serialize)]
struct AttributeJson<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
    value: &'a str,
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn element_json(tree: &ElementTree, id: ElementId) -> Option<ElementJson<'_>> {
    let element = tree.get(id)?;
    Some(ElementJson {
        name: &element.name.local,
        namespace: non_empty(&element.name.space),
        attributes: element
            .attributes
            .iter()
            .map(|attribute| AttributeJson {
                name: &attribute.name.local,
                namespace: non_empty(&attribute.name.space),
                value: &attribute.value,
            })
            .collect(),
        content: element.content.as_deref(),
        children: element
            .children()
            .iter()
            .filter_map(|&child| element_json(tree, child))
            .collect(),
    })
}

/// The roots as a JSON array in element mode, else the document element or `null`.
fn tree_json(tree: &ElementTree, roots: &[ElementId], as_list: bool) -> Result<String> {
    let elements: Vec<ElementJson<'_>> = roots
        .iter()
        .filter_map(|&root| element_json(tree, root))
        .collect();
    let json = if as_list {
        serde_json::to_string_pretty(&elements)
    } else {
        serde_json::to_string_pretty(&elements.first())
    };
    json.context("failed to encode JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_xml::{parse_elements, parse_str};
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_format_name_parses() {
        for format in Format::iter() {
            let cli = Cli::try_parse_from(["arbor", "--format", &format.to_string(), "in.xml"])
                .unwrap();
            assert_eq!(cli.format, format);
        }
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["arbor", "--xml", "<a/>"]).unwrap();
        assert_eq!(cli.format, Format::Tree);
        assert!(!cli.elements);
        assert_eq!(read_input(&cli).unwrap(), b"<a/>");
        assert_eq!(parse_options(&cli).max_depth, None);
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let cli = Cli::try_parse_from(["arbor"]).unwrap();
        assert!(read_input(&cli).is_err());
    }

    #[test]
    fn test_options_from_flags() {
        let cli = Cli::try_parse_from(["arbor", "--decode", "--max-depth", "3", "x.xml"]).unwrap();
        assert_eq!(parse_options(&cli).max_depth, Some(3));
    }

    #[test]
    fn test_document_json() {
        let document = parse_str(r#"<p:a xmlns:p="urn:p" k="v"><b>hi</b></p:a>"#).unwrap();
        let root = document.root().unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&tree_json(document.tree(), &[root], false).unwrap()).unwrap();

        assert_eq!(json["name"], "a");
        assert_eq!(json["namespace"], "urn:p");
        assert_eq!(json["attributes"][0]["namespace"], "xmlns");
        assert_eq!(json["attributes"][1]["name"], "k");
        assert!(json["attributes"][1].get("namespace").is_none());
        assert_eq!(json["children"][0]["content"], "hi");
        assert!(json["children"][0].get("children").is_none());
    }

    #[test]
    fn test_elements_json_is_a_list() {
        let forest = parse_elements("<a/><b/>".as_bytes()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&tree_json(&forest.tree, &forest.roots, true).unwrap()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        assert_eq!(json[1]["name"], "b");
    }

    #[test]
    fn test_empty_document_json_is_null() {
        let tree = ElementTree::new();
        assert_eq!(tree_json(&tree, &[], false).unwrap(), "null");
    }

    #[test]
    fn test_preview_cuts_on_characters() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ééééé", 2), "éé...");
        assert_eq!(preview("a\nb", 10), "a\\nb");
    }
}
