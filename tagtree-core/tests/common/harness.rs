//! Test harness for running tests with stochastic variations

use crate::common::{ExpectedEvent, Gen, RuleConfig, TestCase};
use tagtree_core::{
    Attribute, CloseMode, Node, NodeKind, ParseOptions, Parser, RuleSet, TagSyntaxRule,
};

/// Result of running a test
#[derive(Debug)]
pub struct TestResult {
    pub passed: bool,
    pub input: String,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    pub seed: u64,
    pub errors: Vec<String>,
}

fn close_mode(name: &str) -> CloseMode {
    match name {
        "Tag" => CloseMode::TAG,
        "SelfClose" => CloseMode::SELF_CLOSE,
        "Void" => CloseMode::VOID,
        other => panic!("unknown close mode {:?} in fixture", other),
    }
}

fn build_rules(config: Option<&RuleConfig>) -> RuleSet {
    match config {
        None => RuleSet::new(),
        Some(RuleConfig::Preset(name)) => match name.as_str() {
            "html" => RuleSet::html(),
            "strict_xml" => RuleSet::strict_xml(),
            "permissive" => RuleSet::new(),
            other => panic!("unknown rule preset {:?} in fixture", other),
        },
        Some(RuleConfig::Tags(tags)) => {
            let mut rules = RuleSet::new();
            for (tag, modes) in tags {
                let modes = modes
                    .iter()
                    .map(|m| close_mode(m))
                    .fold(CloseMode::NONE, |acc, m| acc | m);
                if tag == "*" {
                    rules.set_default_rule(TagSyntaxRule::unnamed(modes));
                } else {
                    rules.add_rule(TagSyntaxRule::for_tag(tag.as_str()).with_close_modes(modes));
                }
            }
            rules
        }
    }
}

fn push_attrs(attrs: &[Attribute<'_>], out: &mut Vec<String>) {
    for attr in attrs {
        out.push(format!("Attr {:?}", attr.name.as_ref()));
        if let Some(value) = attr.value() {
            out.push(format!("Value {:?}", value));
        }
    }
}

fn push_node(node: Node<'_, '_>, out: &mut Vec<String>) {
    match node.kind() {
        NodeKind::Document => {
            for child in node.children() {
                push_node(child, out);
            }
        }
        NodeKind::Container(el) => {
            out.push(format!("Container {:?}", el.qualified_name()));
            push_attrs(el.attrs(), out);
            for child in node.children() {
                push_node(child, out);
            }
            out.push("End".to_string());
        }
        NodeKind::SelfClosing(el) => {
            out.push(format!("SelfClosing {:?}", el.qualified_name()));
            push_attrs(el.attrs(), out);
        }
        NodeKind::Void(el) => {
            out.push(format!("Void {:?}", el.qualified_name()));
            push_attrs(el.attrs(), out);
        }
        NodeKind::Text(content) => out.push(format!("Text {:?}", content.as_ref())),
        NodeKind::Comment(content) => out.push(format!("Comment {:?}", content.as_ref())),
        NodeKind::CData(content) => out.push(format!("CData {:?}", content.as_ref())),
        NodeKind::DeclarationOpener { element, system_literals } => {
            out.push(format!("Declaration {:?}", element.qualified_name()));
            push_attrs(element.attrs(), out);
            for literal in system_literals {
                out.push(format!("Literal {:?}", literal.as_ref()));
            }
        }
        NodeKind::ProcessingInstruction(el) => {
            out.push(format!("Instruction {:?}", el.qualified_name()));
            push_attrs(el.attrs(), out);
        }
    }
}

/// Flatten a parse result into outline events: one line per node, with
/// `End` after the children of every container. A failed parse yields a
/// single `Error "Code"` event.
pub fn outline(input: &str, rules: RuleSet) -> Vec<String> {
    let options = ParseOptions::default().with_rules(rules);
    match Parser::with_options(input, options).parse() {
        Ok(doc) => {
            let mut out = Vec::new();
            push_node(doc.root(), &mut out);
            out
        }
        Err(err) => vec![format!("Error {:?}", format!("{:?}", err.code()))],
    }
}

/// Format expected event for comparison
fn format_expected(event: &ExpectedEvent) -> String {
    match event {
        ExpectedEvent::Bare(name) => name.clone(),
        ExpectedEvent::WithContent(name, content) => format!("{} {:?}", name, content),
    }
}

/// Run a single test case (canonical, no variations)
pub fn run_test(case: &TestCase) -> TestResult {
    let actual = outline(&case.input, build_rules(case.rules.as_ref()));
    let expected: Vec<String> = case.events.iter().map(format_expected).collect();

    let mut errors = Vec::new();

    if actual.len() != expected.len() {
        errors.push(format!(
            "Event count mismatch: expected {}, got {}",
            expected.len(),
            actual.len()
        ));
    }

    for (i, (act, exp)) in actual.iter().zip(expected.iter()).enumerate() {
        if act != exp {
            errors.push(format!("Event {}: expected '{}', got '{}'", i, exp, act));
        }
    }

    TestResult {
        passed: errors.is_empty(),
        input: case.input.clone(),
        expected,
        actual,
        seed: 0,
        errors,
    }
}

/// Run test with stochastic variations
///
/// Applies independent variations:
/// - 50% chance of a balanced fragment above (a comment when the case sets
///   a default rule)
/// - Random whitespace between the fragment and the case
/// - 40% chance of a fragment below (success cases only)
///
/// Error cases must still fail with the same code; their offsets move with
/// the prefix, so only the code is compared.
pub fn run_with_variations(case: &TestCase, gen: &mut Gen) -> TestResult {
    let mut input = String::new();

    // A custom default rule may reject the generated elements.
    let comments_only = matches!(&case.rules, Some(RuleConfig::Tags(tags)) if tags.contains_key("*"));
    let fragment = |gen: &mut Gen| if comments_only { gen.comment() } else { gen.fragment() };

    if gen.chance(0.5) {
        input.push_str(&fragment(gen));
    }
    input.push_str(&gen.whitespace());
    input.push_str(&case.input);

    let error_case = case.expects_error();
    if !error_case && gen.chance(0.4) {
        input.push_str(&fragment(gen));
    }

    let actual = outline(&input, build_rules(case.rules.as_ref()));
    let expected: Vec<String> = case.events.iter().map(format_expected).collect();

    let mut errors = Vec::new();

    if error_case {
        if actual != expected {
            errors.push(format!("Expected {:?}, got {:?}", expected, actual));
        }
    } else {
        // Expected events must appear in order (subsequence match); the
        // wrapping context adds its own.
        let mut exp_idx = 0;
        for act in &actual {
            if exp_idx < expected.len() && act == &expected[exp_idx] {
                exp_idx += 1;
            }
        }

        if exp_idx < expected.len() {
            errors.push(format!(
                "Missing expected events starting at index {}: {:?}",
                exp_idx,
                &expected[exp_idx..]
            ));
        }

        for act in &actual {
            if act.starts_with("Error") {
                errors.push(format!("Unexpected error: {}", act));
            }
        }
    }

    TestResult {
        passed: errors.is_empty(),
        input,
        expected,
        actual,
        seed: gen.seed,
        errors,
    }
}

impl TestResult {
    /// Print detailed failure info
    pub fn print_failure(&self, case_id: &str) {
        eprintln!("\n=== FAILED: {} ===", case_id);
        eprintln!("Seed: {} (set TAGTREE_TEST_SEED={} to reproduce)", self.seed, self.seed);
        eprintln!("\nInput:");
        eprintln!("{}", self.input);
        eprintln!("\nExpected events:");
        for (i, e) in self.expected.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nActual events:");
        for (i, e) in self.actual.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nErrors:");
        for e in &self.errors {
            eprintln!("  - {}", e);
        }
    }
}
