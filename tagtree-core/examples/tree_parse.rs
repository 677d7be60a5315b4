//! Example: Parse markup to a tree and navigate it.
//!
//! Run with: cargo run --example tree_parse

use tagtree_core::{parse_with_rules, Node, NodeKind, RuleSet};

fn main() {
    let input = r#"<!DOCTYPE html>
<article id="intro" class="featured">
  <h1>Welcome</h1>
  <p>Markup and prose coexist, and a stray 1 < 2 stays text.<br>
  <img src="cover.png" alt="Cover">
  <!-- footer follows -->
  <footer><![CDATA[<raw> & untouched]]></footer>
</article>
"#;

    let doc = match parse_with_rules(input, &RuleSet::html()) {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("{}", err.render());
            std::process::exit(1);
        }
    };

    println!("=== Document Tree ===\n");
    print_node(doc.root(), 0);

    println!("\n=== Element Details ===\n");
    for node in doc.descendants() {
        let Some(el) = node.element() else { continue };
        if el.attrs().is_empty() {
            continue;
        }
        println!("Element: {}", el.qualified_name());
        for attr in el.attrs() {
            println!("  {} = {:?}", attr.name, attr.value());
        }
        println!();
    }
}

fn print_node(node: Node<'_, '_>, depth: usize) {
    let indent = "  ".repeat(depth);

    match node.kind() {
        NodeKind::Document => println!("{}Document", indent),
        NodeKind::Container(el) => println!("{}<{}>", indent, el.qualified_name()),
        NodeKind::SelfClosing(el) => println!("{}<{}/>", indent, el.qualified_name()),
        NodeKind::Void(el) => println!("{}<{}> (void)", indent, el.qualified_name()),
        NodeKind::Text(s) => println!("{}Text: {:?}", indent, s),
        NodeKind::Comment(s) => println!("{}Comment: {:?}", indent, s),
        NodeKind::CData(s) => println!("{}CDATA: {:?}", indent, s),
        NodeKind::DeclarationOpener { element, system_literals } => {
            println!("{}<!{}> {:?}", indent, element.qualified_name(), system_literals)
        }
        NodeKind::ProcessingInstruction(el) => println!("{}<?{}?>", indent, el.qualified_name()),
    }

    for child in node.children() {
        print_node(child, depth + 1);
    }
}
