use crate::errors::{ConfigError, GardenerError};
use crate::graph::{GraphModel, ModelNode, NodeKind};
use crate::parser::rules::IncludeStyle;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Dot,
    Graphml,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" => Ok(OutputFormat::Dot),
            "xml" | "graphml" => Ok(OutputFormat::Graphml),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotTheme {
    Light,
    Dark,
}

impl FromStr for DotTheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(DotTheme::Light),
            "dark" => Ok(DotTheme::Dark),
            _ => Err(ConfigError::InvalidDotOption { option: "theme", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDir {
    LR,
    TB,
}

impl FromStr for RankDir {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LR" => Ok(RankDir::LR),
            "TB" => Ok(RankDir::TB),
            _ => Err(ConfigError::InvalidDotOption { option: "rankdir", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DotOptions {
    pub theme: DotTheme,
    pub rankdir: RankDir,
    /// Label edges with the include's line number.
    pub line_labels: bool,
    /// Show file labels relative to this directory when they are below it.
    pub base: Option<PathBuf>,
}

impl Default for DotOptions {
    fn default() -> Self {
        Self { theme: DotTheme::Light, rankdir: RankDir::LR, line_labels: true, base: None }
    }
}

/// Render `model` in `format`. `dot` is only consulted for `OutputFormat::Dot`,
/// except for `base`, which also shortens GraphML labels.
///
/// # Errors
/// Returns `GardenerError::Serialization` if JSON encoding fails.
pub fn render(model: &GraphModel, format: OutputFormat, dot: &DotOptions) -> Result<String, GardenerError> {
    match format {
        OutputFormat::Dot => Ok(DotGenerator::new().generate_dot_with_options(model, dot)),
        OutputFormat::Graphml => Ok(GraphmlGenerator::new().generate(model, dot.base.as_deref())),
        OutputFormat::Json => {
            let mut s = serde_json::to_string_pretty(model).map_err(|e| GardenerError::Serialization(e.to_string()))?;
            s.push('\n');
            Ok(s)
        }
    }
}

#[derive(Debug, Default)]
pub struct DotGenerator;

impl DotGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }

    #[must_use]
    pub fn generate_dot(&self, model: &GraphModel) -> String {
        self.generate_dot_with_options(model, &DotOptions::default())
    }

    #[must_use]
    pub fn generate_dot_with_options(&self, model: &GraphModel, opts: &DotOptions) -> String {
        let mut s = String::new();
        s.push_str("digraph IncludeGraph\n{\n");
        let rank = match opts.rankdir {
            RankDir::LR => "LR",
            RankDir::TB => "TB",
        };
        let _ = write!(
            s,
            "  rankdir={rank};\n  graph [fontname=Helvetica];\n  node [fontname=Helvetica, fontsize=10, style=filled];\n  edge [fontname=Helvetica, fontsize=9];\n"
        );

        for node in &model.nodes {
            let (fill, shape, extra) = style_for_node(node, opts.theme);
            let label = display_label(node, opts.base.as_deref());
            let _ = writeln!(
                s,
                "  n{} [label=\"{}\", shape=\"{shape}\", fillcolor=\"{fill}\", tooltip=\"{}\"{extra}];",
                node.id,
                escape_label(&label),
                escape_label(&node.label)
            );
        }

        for edge in &model.edges {
            let style = match edge.style {
                IncludeStyle::Quoted => "solid",
                IncludeStyle::Angle => "dashed",
            };
            if opts.line_labels {
                let _ = writeln!(s, "  n{} -> n{} [label=\"{}\", style=\"{style}\"];", edge.source, edge.target, edge.line);
            } else {
                let _ = writeln!(s, "  n{} -> n{} [style=\"{style}\"];", edge.source, edge.target);
            }
        }

        s.push_str("}\n");
        s
    }
}

#[derive(Debug, Default)]
pub struct GraphmlGenerator;

impl GraphmlGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }

    #[must_use]
    pub fn generate(&self, model: &GraphModel, base: Option<&Path>) -> String {
        let mut s = String::new();
        s.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        s.push_str(
            "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd\">\n",
        );
        s.push_str("  <key id=\"d0\" for=\"node\" attr.name=\"label\" attr.type=\"string\"/>\n");
        s.push_str("  <key id=\"d1\" for=\"node\" attr.name=\"kind\" attr.type=\"string\"/>\n");
        s.push_str("  <key id=\"d2\" for=\"node\" attr.name=\"language\" attr.type=\"string\"/>\n");
        s.push_str("  <key id=\"d3\" for=\"edge\" attr.name=\"line\" attr.type=\"int\"/>\n");
        s.push_str("  <key id=\"d4\" for=\"edge\" attr.name=\"style\" attr.type=\"string\"/>\n");
        s.push_str("  <graph id=\"G\" edgedefault=\"directed\">\n");

        for node in &model.nodes {
            let kind = match node.kind {
                NodeKind::File => "file",
                NodeKind::Unresolved => "unresolved",
            };
            let _ = write!(
                s,
                "    <node id=\"n{}\">\n      <data key=\"d0\">{}</data>\n      <data key=\"d1\">{kind}</data>\n",
                node.id,
                xml_escape(&display_label(node, base))
            );
            if let Some(lang) = &node.language {
                let _ = writeln!(s, "      <data key=\"d2\">{}</data>", xml_escape(lang));
            }
            s.push_str("    </node>\n");
        }

        for (i, edge) in model.edges.iter().enumerate() {
            let _ = write!(
                s,
                "    <edge id=\"e{i}\" source=\"n{}\" target=\"n{}\">\n      <data key=\"d3\">{}</data>\n      <data key=\"d4\">{}</data>\n    </edge>\n",
                edge.source,
                edge.target,
                edge.line,
                edge.style.as_str()
            );
        }

        s.push_str("  </graph>\n</graphml>\n");
        s
    }
}

fn display_label(node: &ModelNode, base: Option<&Path>) -> String {
    match (&node.path, base) {
        (Some(path), Some(base)) => match path.strip_prefix(base) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.display().to_string(),
            _ => node.label.clone(),
        },
        _ => node.label.clone(),
    }
}

fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn style_for_node(node: &ModelNode, theme: DotTheme) -> (&'static str, &'static str, &'static str) {
    match (theme, node.kind, node.scanned) {
        (DotTheme::Light, NodeKind::File, true) => ("#e0f3ff", "box", ""),
        (DotTheme::Light, NodeKind::File, false) => ("#f0f0f0", "ellipse", ""),
        (DotTheme::Light, NodeKind::Unresolved, _) => ("#ffe0e0", "note", ", color=\"#d62728\", style=\"filled,dashed\""),
        (DotTheme::Dark, NodeKind::File, true) => ("#124559", "box", ", fontcolor=\"white\""),
        (DotTheme::Dark, NodeKind::File, false) => ("#3a3a3a", "ellipse", ", fontcolor=\"white\""),
        (DotTheme::Dark, NodeKind::Unresolved, _) => {
            ("#6a1e1e", "note", ", color=\"#ff6b6b\", fontcolor=\"white\", style=\"filled,dashed\"")
        }
    }
}
