use ansi_term::Colour;
use clap::{App, Arg};
use livediff::{
    analyze_document, parse_tree_text, ActiveStatement, ActiveStatementFlags, AnalysisRequest,
    AnalyzerOptions, CancellationToken, RudeEdit, RuntimeCapabilities, Span, SyntaxTree,
};
use std::cmp::min;
use std::fs::read_to_string;
use std::process::exit;

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("livediff {}", panic_info);
        exit(-3)
    }));

    let cmd_args = App::new("Livediff")
        .version("0.1")
        .about("Analyze a source edit for compatibility with a running process")
        .long_about(
            "Analyze a source edit for compatibility with a running process\n\n\
            Both arguments are documents in the parenthesized tree notation: \
            `(kind child...)` for nodes and `(kind \"text\")` for tokens. \
            The old file may be given as `-` to analyze a file added during \
            the session.\n\
            The report lists rude edits (changes that require restarting the \
            application) and the fate of each active statement.\n\
            Exit with the number of rude edits found (capped to 127).",
        )
        .arg(
            Arg::with_name("old-file")
                .required(true)
                .help("Path to the document before the edit, or `-` for an added file"),
        )
        .arg(
            Arg::with_name("new-file")
                .required(true)
                .help("Path to the document after the edit"),
        )
        .arg(
            Arg::with_name("colored")
                .short("c")
                .long("colored")
                .help("Color the report with ANSI escape codes"),
        )
        .arg(
            Arg::with_name("same-form-closures")
                .long("same-form-closures")
                .help("Only match closures against closures of the same syntactic form"),
        )
        .arg(
            Arg::with_name("capabilities")
                .long("capabilities")
                .takes_value(true)
                .use_delimiter(true)
                .help("Comma-separated runtime capability names, e.g. add-method-to-existing-type"),
        )
        .arg(
            Arg::with_name("active-statement")
                .long("active-statement")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("Active statement span `START..END` in the old document, with an optional `:nonleaf` suffix"),
        )
        .get_matches_safe()
        .unwrap_or_else(|err| {
            eprintln!("{}", err);
            exit(-1)
        });

    let mut capabilities = RuntimeCapabilities::BASELINE;
    if let Some(names) = cmd_args.values_of("capabilities") {
        for name in names {
            match RuntimeCapabilities::from_capability_name(name) {
                Some(capability) => capabilities |= capability,
                None => {
                    eprintln!("Unknown runtime capability `{}`", name);
                    exit(-1)
                }
            }
        }
    }

    let mut active_statements = Vec::new();
    if let Some(values) = cmd_args.values_of("active-statement") {
        for (ordinal, value) in values.enumerate() {
            active_statements.push(parse_active_statement(ordinal, value));
        }
    }

    let old_filename = cmd_args.value_of("old-file").unwrap();
    let old_tree = if old_filename == "-" {
        None
    } else {
        Some(parse_tree_file(old_filename))
    };
    let new_tree = parse_tree_file(cmd_args.value_of("new-file").unwrap());

    let mut options = AnalyzerOptions::default();
    options.match_options.match_across_closure_forms =
        !cmd_args.is_present("same-form-closures");

    let request = AnalysisRequest {
        old_tree: old_tree.as_ref(),
        new_tree: &new_tree,
        active_statements: &active_statements,
        known_matches: &[],
        capabilities,
        options,
        cancel: CancellationToken::new(),
    };
    let result = analyze_document(&request).unwrap_or_else(|err| {
        eprintln!("{}", err);
        exit(-2)
    });

    let colored = cmd_args.is_present("colored");
    println!("changes: {}", if result.has_changes { "yes" } else { "no" });
    println!(
        "syntax errors: {}",
        if result.has_syntax_errors { "yes" } else { "no" }
    );
    for member in &result.updated_members {
        println!(
            "updated member: {}",
            new_tree.kind(member.new_member).name()
        );
    }
    for stmt in &result.active_statements {
        println!(
            "active statement #{}: {}",
            stmt.ordinal,
            if stmt.is_stale() { "stale" } else { "tracked" }
        );
    }
    for rude in &result.rude_edits {
        println!("{}", format_rude_edit(rude, colored));
    }

    exit(min(result.rude_edits.len(), 127) as i32)
}

fn format_rude_edit(rude: &RudeEdit, colored: bool) -> String {
    let line = match &rude.detail {
        Some(detail) => format!(
            "rude edit: {}: {} ({})",
            rude.kind.name(),
            rude.kind.description(),
            detail
        ),
        None => format!("rude edit: {}: {}", rude.kind.name(), rude.kind.description()),
    };
    if colored {
        Colour::Red.paint(line).to_string()
    } else {
        line
    }
}

fn parse_tree_file(filename: &str) -> SyntaxTree {
    let source = read_to_string(filename).unwrap_or_else(|err| {
        eprintln!("Unable to read {}: {}", filename, err);
        exit(-1)
    });
    parse_tree_text(&source).unwrap_or_else(|err| {
        eprintln!("Unable to parse {}: {}", filename, err);
        exit(-2)
    })
}

fn parse_active_statement(ordinal: usize, value: &str) -> ActiveStatement {
    let (span_part, flags) = match value.strip_suffix(":nonleaf") {
        Some(prefix) => (prefix, ActiveStatementFlags::NON_LEAF_FRAME),
        None => (
            value.strip_suffix(":leaf").unwrap_or(value),
            ActiveStatementFlags::LEAF_FRAME,
        ),
    };
    let span = span_part
        .split_once("..")
        .and_then(|(start, end)| Some(Span::new(start.parse().ok()?, end.parse().ok()?)))
        .unwrap_or_else(|| {
            eprintln!("Invalid active statement `{}`, expected START..END", value);
            exit(-1)
        });
    ActiveStatement::new(ordinal, span, flags)
}
