use ahash::AHashSet;
use clap::Parser;
use playgraph::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Inspect a persisted playbook document: chains, orphans and broken invariants
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the playbook document JSON file
    document_path: String,

    /// Only report the scope with this id
    #[arg(short, long)]
    scope: Option<String>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionReport {
    section: Section,
    chain: Vec<NodeId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScopeReport {
    id: ScopeId,
    name: String,
    node_count: usize,
    link_count: usize,
    sections: Vec<SectionReport>,
    orphans: Vec<NodeId>,
    violations: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let document = PlaybookDocument::from_file(&cli.document_path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to load '{}': {}", cli.document_path, e))
    });

    // Violations are checked on the raw document too, since loading repairs them.
    let raw_problems = raw_violations(&document);
    let store = document.into_store("inspect", "inspect");

    let reports: Vec<ScopeReport> = store
        .scopes()
        .iter()
        .filter(|s| cli.scope.as_deref().is_none_or(|id| id == s.id))
        .map(report)
        .collect();
    if reports.is_empty() {
        exit_with_error("No matching scope in the document");
    }

    if cli.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => exit_with_error(&format!("Failed to encode report: {}", e)),
        }
        return;
    }

    if !raw_problems.is_empty() {
        println!("Repaired while loading:");
        for problem in &raw_problems {
            println!("  - {}", problem);
        }
        println!();
    }
    for report in &reports {
        println!("{} ({})", report.name, report.id);
        println!("  {} node(s), {} link(s)", report.node_count, report.link_count);
        for section in &report.sections {
            println!("  {:<9} chain length {}", section.section.to_string(), section.chain.len());
            if !section.chain.is_empty() {
                println!("            {}", section.chain.join(" -> "));
            }
        }
        if report.orphans.is_empty() {
            println!("  no orphans");
        } else {
            println!("  orphans: {}", report.orphans.join(", "));
        }
        for violation in &report.violations {
            println!("  violation: {}", violation);
        }
        println!();
    }
}

fn report(scope: &Scope) -> ScopeReport {
    ScopeReport {
        id: scope.id.clone(),
        name: scope.name.clone(),
        node_count: scope.node_count(),
        link_count: scope.links().len(),
        sections: Section::SCOPE_LEVEL
            .into_iter()
            .map(|section| SectionReport {
                section,
                chain: chain_members(scope, &entry_marker_id(&scope.id, section)),
            })
            .collect(),
        orphans: orphans(scope),
        violations: scope.violations(),
    }
}

/// Links the loader drops: dangling endpoints and second claims on a chain slot.
fn raw_violations(document: &PlaybookDocument) -> Vec<String> {
    let mut problems = Vec::new();
    let mut slots = AHashSet::new();
    for link in &document.links {
        let known = |id: &str| {
            playgraph::ids::is_entry_marker_id(id)
                || document.nodes.iter().any(|n| n.scope_id == link.scope_id && n.id == id)
        };
        if !known(&link.from) || !known(&link.to) {
            problems.push(format!("link '{}' has a missing endpoint", link.id));
        }
        let from_slot = (link.scope_id.as_str(), link.link_type, link.from.as_str(), true);
        let to_slot = (link.scope_id.as_str(), link.link_type, link.to.as_str(), false);
        if !slots.insert(from_slot) || !slots.insert(to_slot) {
            problems.push(format!("link '{}' breaks the single-chain rule", link.id));
        }
    }
    problems
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
