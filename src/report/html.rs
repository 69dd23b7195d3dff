//! Navigable HTML coverage report.
//!
//! One `index.html` per directory node of the summary tree and one
//! annotated detail page per file. When an incremental map is present in
//! the run context, index pages carry a second row per entry showing the
//! metrics restricted to the changed lines, and detail pages dim every
//! line outside the diff window.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Local;

use crate::annotate::{annotate, AnnotatedLine, Covered};
use crate::collector::Collector;
use crate::config::{ReportConfig, RunContext, Watermark};
use crate::error::Result;
use crate::incremental::filter_file_coverage;
use crate::model::FileCoverage;
use crate::report::Report;
use crate::store::{FsStore, Store};
use crate::summary::{summarize_file_coverage, CoverageSummary, Metrics};
use crate::tree::{Node, NodeKind, TreeSummarizer, TreeSummary};
use crate::writer::FileWriter;

const BASE_CSS: &str = include_str!("base.css");

pub struct HtmlReport {
    config: ReportConfig,
    store: Box<dyn Store>,
}

impl HtmlReport {
    #[must_use]
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            store: Box::new(FsStore),
        }
    }

    /// Replace the source store, used by tests and callers with embedded
    /// sources.
    #[must_use]
    pub fn with_store(config: ReportConfig, store: Box<dyn Store>) -> Self {
        Self { config, store }
    }

    fn source_for(&self, fc: &FileCoverage) -> Result<String> {
        // Records may embed their source; fall back to the store.
        match &fc.code {
            Some(lines) => Ok(format!("{}\n", lines.join("\n"))),
            None => self.store.get(&fc.path),
        }
    }

    fn write_node(
        &self,
        tree: &TreeSummary,
        node: &Node,
        dir: &Path,
        collector: &Collector,
        ctx: &RunContext,
        incremental: &TreeSummary,
        writer: &FileWriter,
        datetime: &str,
    ) -> Result<()> {
        let index = self.index_page(tree, node, incremental, datetime);
        writer.write_file(&dir.join("index.html"), &index)?;

        for child_id in &node.children {
            let child = tree.node(*child_id);
            if child.kind == NodeKind::Dir {
                let child_dir = dir.join(child.relative_name.trim_end_matches('/'));
                self.write_node(
                    tree,
                    child,
                    &child_dir,
                    collector,
                    ctx,
                    incremental,
                    writer,
                    datetime,
                )?;
            } else if let Some(fc) = collector.file_coverage_for(&child.full_name) {
                let page = self.detail_page(tree, child, fc, ctx, incremental, datetime)?;
                let path = dir.join(format!("{}.html", child.relative_name));
                writer.write_file(&path, &page)?;
            }
        }
        Ok(())
    }

    fn index_page(
        &self,
        tree: &TreeSummary,
        node: &Node,
        incremental: &TreeSummary,
        datetime: &str,
    ) -> String {
        let watermarks = &self.config.watermarks;
        let mut out = self.page_header(tree, node, incremental);
        out.push_str(SUMMARY_TABLE_HEADER);

        for child_id in &node.children {
            let child = tree.node(*child_id);
            let metrics = child.metrics.unwrap_or_else(CoverageSummary::neutral);
            out.push_str(&summary_row("origin", child, &metrics, watermarks));
            if let Some(inc) = incremental.get_node(&child.name) {
                let inc_metrics = inc.metrics.unwrap_or_else(CoverageSummary::neutral);
                out.push_str(&summary_row("incremental", child, &inc_metrics, watermarks));
            }
        }

        out.push_str(SUMMARY_TABLE_FOOTER);
        out.push_str(&page_footer(datetime));
        out
    }

    fn detail_page(
        &self,
        tree: &TreeSummary,
        node: &Node,
        fc: &FileCoverage,
        ctx: &RunContext,
        incremental: &TreeSummary,
        datetime: &str,
    ) -> Result<String> {
        let source = self.source_for(fc)?;
        let lines = annotate(fc, &source, ctx.ranges_for(&fc.path));

        let mut out = self.page_header(tree, node, incremental);
        out.push_str("<pre><table class=\"coverage\">\n");
        out.push_str("<tr>\n");
        out.push_str(&line_number_column(&lines));
        out.push_str(&execution_count_column(&lines, &fc.l));
        out.push_str(&code_column(&lines));
        out.push_str("</tr>\n");
        out.push_str("</table></pre>\n");
        out.push_str(&page_footer(datetime));
        Ok(out)
    }

    fn page_header(&self, tree: &TreeSummary, node: &Node, incremental: &TreeSummary) -> String {
        let entity = if node.name.is_empty() || node.name == "/" {
            "All files"
        } else {
            &node.name
        };
        let metrics = node.metrics.unwrap_or_else(CoverageSummary::neutral);
        let report_class = report_class(&metrics.statements, self.config.watermarks.statements);

        let mut header = format!(
            "<!doctype html>\n<html lang=\"en\">\n<head>\n\
             <title>Code coverage report for {entity}</title>\n\
             <meta charset=\"utf-8\">\n\
             <style>{BASE_CSS}</style>\n\
             </head>\n<body>\n\
             <div class=\"header {report_class}\">\n\
             <h1>Code coverage report for <span class=\"entity\">{entity}</span></h1>\n\
             <div class=\"path\">{path}</div>\n\
             {strip}",
            path = path_html(tree, node),
            strip = metrics_strip(&metrics, "origin"),
        );
        if let Some(inc) = incremental.get_node(&node.name) {
            let inc_metrics = inc.metrics.unwrap_or_else(CoverageSummary::neutral);
            header.push_str(&metrics_strip(&inc_metrics, "incremental"));
        }
        header.push_str("</div>\n<div class=\"body\">\n");
        header
    }
}

impl Report for HtmlReport {
    fn synopsis(&self) -> &'static str {
        "Navigable HTML coverage report for every file and directory"
    }

    fn write_report(&self, collector: &Collector, ctx: &RunContext) -> Result<()> {
        let mut summarizer = TreeSummarizer::new();
        let mut incremental_summarizer = TreeSummarizer::new();

        for (path, fc) in collector.coverage_map() {
            summarizer.add_summary(path, summarize_file_coverage(fc));
            if let Some(ranges) = ctx.ranges_for(path) {
                let reduced = filter_file_coverage(fc, ranges);
                incremental_summarizer.add_summary(path, summarize_file_coverage(&reduced));
            }
        }

        let tree = summarizer.build_tree(None);
        // Force the same prefix so node names line up between the trees.
        let incremental_tree = incremental_summarizer.build_tree(Some(tree.prefix.clone()));

        if self.config.verbose {
            eprintln!("{}", tree.to_json());
        }

        let writer = FileWriter::new(self.config.verbose);
        let datetime = Local::now().format("%a %b %e %Y %H:%M:%S").to_string();
        self.write_node(
            &tree,
            tree.root(),
            &self.config.dir,
            collector,
            ctx,
            &incremental_tree,
            &writer,
            &datetime,
        )
    }
}

const SUMMARY_TABLE_HEADER: &str = "\
<div class=\"pad1\">\n\
<table class=\"coverage-summary\">\n\
<thead>\n<tr>\n\
   <th class=\"file\">File</th>\n\
   <th class=\"pic\"></th>\n\
   <th class=\"pct\">Lines</th>\n\
   <th class=\"abs\"></th>\n\
   <th class=\"pct\">Functions</th>\n\
   <th class=\"abs\"></th>\n\
   <th class=\"pct\">Statements</th>\n\
   <th class=\"abs\"></th>\n\
   <th class=\"pct\">Branches</th>\n\
   <th class=\"abs\"></th>\n\
</tr>\n</thead>\n<tbody>\n";

const SUMMARY_TABLE_FOOTER: &str = "</tbody>\n</table>\n</div>\n";

fn summary_row(
    row_type: &str,
    child: &Node,
    metrics: &CoverageSummary,
    watermarks: &crate::config::Watermarks,
) -> String {
    let statements = report_class(&metrics.statements, watermarks.statements);
    let lines = report_class(&metrics.lines, watermarks.lines);
    let functions = report_class(&metrics.functions, watermarks.functions);
    let branches = report_class(&metrics.branches, watermarks.branches);
    let file = &child.relative_name;
    let output = link_from_parent(child);

    format!(
        "<tr class=\"summary-line {row_type}\">\n\
         <td class=\"file {statements}\"><a href=\"{output}\">{file}</a></td>\n\
         <td class=\"pic {statements}\"><div class=\"chart\">{chart}</div></td>\n\
         <td class=\"pct {lines}\">{lpct}%</td>\n\
         <td class=\"abs {lines}\">{lcov}/{ltot}</td>\n\
         <td class=\"pct {functions}\">{fpct}%</td>\n\
         <td class=\"abs {functions}\">{fcov}/{ftot}</td>\n\
         <td class=\"pct {statements}\">{spct}%</td>\n\
         <td class=\"abs {statements}\">{scov}/{stot}</td>\n\
         <td class=\"pct {branches}\">{bpct}%</td>\n\
         <td class=\"abs {branches}\">{bcov}/{btot}</td>\n\
         </tr>\n",
        chart = percent_graph(metrics.statements.pct),
        lpct = metrics.lines.pct,
        lcov = metrics.lines.covered,
        ltot = metrics.lines.total,
        fpct = metrics.functions.pct,
        fcov = metrics.functions.covered,
        ftot = metrics.functions.total,
        spct = metrics.statements.pct,
        scov = metrics.statements.covered,
        stot = metrics.statements.total,
        bpct = metrics.branches.pct,
        bcov = metrics.branches.covered,
        btot = metrics.branches.total,
    )
}

fn metrics_strip(metrics: &CoverageSummary, row_type: &str) -> String {
    let mut strip = format!(
        "<div class=\"clearfix {row_type}\">\n\
         {}{}{}{}",
        metric_box("Lines", &metrics.lines),
        metric_box("Functions", &metrics.functions),
        metric_box("Statements", &metrics.statements),
        metric_box("Branches", &metrics.branches),
    );
    let ignored =
        metrics.statements.skipped + metrics.functions.skipped + metrics.branches.skipped;
    if ignored > 0 {
        strip.push_str(&format!(
            "<div class=\"fl pad1y\"><span class=\"strong\">{}</span> \
             <span class=\"quiet\">Ignored</span></div>\n",
            show_ignores(metrics)
        ));
    }
    strip.push_str("</div>\n");
    strip
}

fn metric_box(label: &str, metrics: &Metrics) -> String {
    format!(
        "<div class=\"fl pad1y space-right2\">\n\
         <span class=\"strong\">{pct}% </span>\n\
         <span class=\"quiet\">{label}</span>\n\
         <span class=\"fraction\">{covered}/{total}</span>\n\
         </div>\n",
        pct = metrics.pct,
        covered = metrics.covered,
        total = metrics.total,
    )
}

/// Human-readable list of explicitly ignored entities, e.g.
/// "2 statements, 1 branch".
fn show_ignores(metrics: &CoverageSummary) -> String {
    let mut parts = Vec::new();
    for (count, singular) in [
        (metrics.statements.skipped, "statement"),
        (metrics.functions.skipped, "function"),
        (metrics.branches.skipped, "branch"),
    ] {
        match count {
            0 => {}
            1 => parts.push(format!("1 {singular}")),
            n => parts.push(format!("{n} {singular}s")),
        }
    }
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

fn page_footer(datetime: &str) -> String {
    format!(
        "</div>\n<div class=\"footer quiet pad2 space-top1 center small\">\n\
         Code coverage generated at {datetime}\n\
         </div>\n</body>\n</html>\n"
    )
}

/// Watermark classification for one metric, driving row/header colors.
fn report_class(metrics: &Metrics, watermark: Watermark) -> &'static str {
    if metrics.pct >= watermark.high {
        "high"
    } else if metrics.pct >= watermark.low {
        "medium"
    } else {
        "low"
    }
}

/// The filled/empty bar pair shown in the "pic" column.
fn percent_graph(pct: f64) -> String {
    let full = if pct == 100.0 { " cover-full" } else { "" };
    let covered = pct.floor() as u64;
    let empty = 100 - covered.min(100);
    format!(
        "<div class=\"cover-fill{full}\" style=\"width: {covered}%;\"></div>\
         <div class=\"cover-empty\" style=\"width:{empty}%;\"></div>"
    )
}

fn link_from_parent(node: &Node) -> String {
    if node.kind == NodeKind::Dir {
        format!("{}index.html", node.relative_name)
    } else {
        format!("{}.html", node.relative_name)
    }
}

/// Output-directory depth a node's own page contributes when climbing to
/// its parent's index: one level per path segment in the relative name.
fn levels(node: &Node) -> usize {
    node.relative_name.matches('/').count()
}

/// Relative href from `node`'s page to the index of its ancestor `num`
/// levels up.
fn ancestor_href(tree: &TreeSummary, node: &Node, num: usize) -> String {
    let mut href = String::new();
    let mut current = node;
    for _ in 0..num {
        href.push_str(&"../".repeat(levels(current)));
        match current.parent {
            Some(parent) => current = tree.node(parent),
            None => break,
        }
    }
    format!("{href}index.html")
}

/// Breadcrumb links back up the tree, ending with the node's own name.
fn path_html(tree: &TreeSummary, node: &Node) -> String {
    let mut ancestors = Vec::new();
    let mut parent = node.parent;
    while let Some(id) = parent {
        ancestors.push(tree.node(id));
        parent = tree.node(id).parent;
    }
    if ancestors.is_empty() {
        return "/".to_string();
    }

    let mut crumbs: Vec<String> = ancestors
        .iter()
        .enumerate()
        .map(|(i, ancestor)| {
            let label = if ancestor.relative_name.is_empty() {
                "all files"
            } else {
                &ancestor.relative_name
            };
            format!(
                "<a href=\"{}\">{label}</a>",
                ancestor_href(tree, node, i + 1)
            )
        })
        .collect();
    crumbs.reverse();
    crumbs.push(node.relative_name.clone());
    crumbs.join(" / ")
}

fn line_number_column(lines: &[AnnotatedLine]) -> String {
    let numbers: Vec<String> = lines.iter().map(|l| l.line.to_string()).collect();
    format!(
        "<td class=\"line-count quiet\">{}</td>\n",
        numbers.join("\n")
    )
}

fn execution_count_column(lines: &[AnnotatedLine], hits: &BTreeMap<u32, u64>) -> String {
    let counts: Vec<String> = lines
        .iter()
        .map(|l| {
            let (covered, value) = match l.covered {
                Covered::Yes => (
                    "yes",
                    format!("{}×", hits.get(&l.line).copied().unwrap_or(0)),
                ),
                Covered::No => ("no", "&nbsp;".to_string()),
                Covered::Neutral => ("neutral", "&nbsp;".to_string()),
            };
            format!("<span class=\"cline-any cline-{covered}\">{value}</span>")
        })
        .collect();
    format!(
        "<td class=\"line-coverage quiet\">{}</td>\n",
        counts.join("\n")
    )
}

fn code_column(lines: &[AnnotatedLine]) -> String {
    let code: Vec<&str> = lines
        .iter()
        .map(|l| if l.text.is_empty() { "&nbsp;" } else { l.text.as_str() })
        .collect();
    format!(
        "<td class=\"text\"><pre class=\"prettyprint\">{}</pre></td>\n",
        code.join("\n")
    )
}
