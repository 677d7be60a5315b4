//! Example: Parse stdin and report the node count or the first error.
//!
//! Run with: cargo run --example stdin_parse -- [--html] < page.html
//! Set RUST_LOG=trace to watch the scanner.

use std::io::Read;

use tagtree_core::{ParseOptions, Parser, RuleSet};

fn main() {
    env_logger::init();

    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("failed to read stdin: {}", err);
        std::process::exit(2);
    }

    let rules = if std::env::args().any(|a| a == "--html") {
        RuleSet::html()
    } else {
        RuleSet::new()
    };

    match Parser::with_options(&input, ParseOptions::default().with_rules(rules)).parse() {
        Ok(doc) => println!("{} nodes reachable", doc.descendants().count()),
        Err(err) => {
            eprintln!("{}", err.render());
            std::process::exit(1);
        }
    }
}
