//! 单个 XML 部件的编译与渲染

use super::error::{IssueKind, TemplateIssue};
use super::lexer::{self, Chunk, LexIssue, Tag, TagKind};
use super::value::{PlaceholderBag, Value};
use super::xml::{self, Leaf, PARAGRAPH, RUN_TEXT, TABLE_CELL, TABLE_ROW};
use quick_xml::escape::escape;
use std::collections::HashMap;
use std::ops::Range;

const LINE_BREAK: &str = r#"</w:t><w:br/><w:t xml:space="preserve">"#;

/// 编译后的节点
#[derive(Debug, Clone)]
enum Node {
    Open { name: String, raw: String },
    Close { raw: String },
    Markup(String),
    Text(String),
    Tag(Tag),
}

/// 渲染指令: 原样输出的节点区间, 或一个循环/条件区块
#[derive(Debug, Clone)]
enum Item {
    Nodes(Range<usize>),
    Section {
        name: String,
        inverted: bool,
        body: Vec<Item>,
    },
}

/// 一对 `{#x}` / `{/x}` 展开后的范围
#[derive(Debug, Clone)]
struct Span {
    name: String,
    inverted: bool,
    /// 整个区块 (含被移除的标签段落) 在输出中被替换的范围
    outer: Range<usize>,
    /// 每次重复输出的范围
    body: Range<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct Part {
    name: String,
    nodes: Vec<Node>,
    items: Vec<Item>,
}

/// 节点的结构信息
struct Structure {
    /// 起始标签 -> 结束标签
    close_of: HashMap<usize, usize>,
    /// 标签节点 -> 外层起始标签 (由外到内)
    ancestors: HashMap<usize, Vec<usize>>,
}

impl Part {
    pub(crate) fn compile(name: &str, source: &str) -> Result<Self, Vec<TemplateIssue>> {
        let leaves = xml::parse(source).map_err(|e| {
            vec![TemplateIssue::new(IssueKind::MalformedXml, name, e.to_string())]
        })?;

        let mut issues = Vec::new();
        let nodes = flatten(name, leaves, &mut issues);
        if !issues.is_empty() {
            return Err(issues);
        }

        let structure = Structure::analyze(&nodes);
        let pairs = pair_sections(name, &nodes, &mut issues);
        let mut spans: Vec<Span> = pairs
            .into_iter()
            .filter_map(|(open, close)| expand(name, &nodes, &structure, open, close, &mut issues))
            .collect();
        spans.sort_by(|a, b| {
            a.outer
                .start
                .cmp(&b.outer.start)
                .then_with(|| b.outer.end.cmp(&a.outer.end))
        });
        let items = build(name, 0..nodes.len(), &spans, &mut issues);

        if issues.is_empty() {
            Ok(Self {
                name: name.to_string(),
                nodes,
                items,
            })
        } else {
            Err(issues)
        }
    }

    /// 渲染为 XML 文本, 数据问题追加到 `issues`
    pub(crate) fn render(&self, bag: &PlaceholderBag, issues: &mut Vec<TemplateIssue>) -> String {
        let mut out = String::new();
        let mut scopes = vec![bag];
        self.emit(&self.items, &mut scopes, &mut out, issues);
        out
    }

    fn emit<'a>(
        &self,
        items: &[Item],
        scopes: &mut Vec<&'a PlaceholderBag>,
        out: &mut String,
        issues: &mut Vec<TemplateIssue>,
    ) {
        for item in items {
            match item {
                Item::Nodes(range) => {
                    for node in &self.nodes[range.clone()] {
                        self.emit_node(node, scopes, out, issues);
                    }
                }
                Item::Section {
                    name,
                    inverted,
                    body,
                } => match lookup(scopes, name) {
                    Some(Value::List(entries)) => {
                        if *inverted {
                            if entries.is_empty() {
                                self.emit(body, scopes, out, issues);
                            }
                        } else {
                            for entry in entries {
                                scopes.push(entry);
                                self.emit(body, scopes, out, issues);
                                scopes.pop();
                            }
                        }
                    }
                    other => {
                        let truthy = other.is_some_and(Value::is_truthy);
                        if truthy != *inverted {
                            self.emit(body, scopes, out, issues);
                        }
                    }
                },
            }
        }
    }

    fn emit_node(
        &self,
        node: &Node,
        scopes: &[&PlaceholderBag],
        out: &mut String,
        issues: &mut Vec<TemplateIssue>,
    ) {
        match node {
            Node::Open { raw, .. } | Node::Close { raw } | Node::Markup(raw) => out.push_str(raw),
            Node::Text(text) => out.push_str(&escape(text.as_str())),
            Node::Tag(tag) if tag.kind == TagKind::Value => match lookup(scopes, &tag.name) {
                Some(Value::List(_)) => issues.push(
                    TemplateIssue::new(
                        IssueKind::ListAsText,
                        &self.name,
                        format!("`{}` is a list and can only be used as {{#{}}}", tag.name, tag.name),
                    )
                    .with_tag(&tag.name),
                ),
                Some(value) => push_multiline(out, &value.to_text()),
                None => tracing::debug!(part = %self.name, tag = %tag.name, "placeholder has no value"),
            },
            Node::Tag(_) => {}
        }
    }
}

fn lookup<'a>(scopes: &[&'a PlaceholderBag], key: &str) -> Option<&'a Value> {
    for &scope in scopes.iter().rev() {
        if let Some(value) = scope.get(key) {
            return Some(value);
        }
    }
    None
}

fn push_multiline(out: &mut String, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push_str(LINE_BREAK);
        }
        out.push_str(&escape(line.trim_end_matches('\r')));
    }
}

/// 合并跨 run 的标签并把 `w:t` 文本拆成字面量与标签节点
fn flatten(part: &str, mut leaves: Vec<Leaf>, issues: &mut Vec<TemplateIssue>) -> Vec<Node> {
    // 按段落分组 `w:t` 文本
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut group_of: HashMap<usize, usize> = HashMap::new();
    for (idx, leaf) in leaves.iter().enumerate() {
        if let Leaf::Text { run: Some(run), .. } = leaf {
            let key = run.paragraph.unwrap_or(run.t_open);
            let group = *group_of.entry(key).or_insert_with(|| {
                groups.push((key, Vec::new()));
                groups.len() - 1
            });
            groups[group].1.push(idx);
        }
    }

    for (_, members) in &groups {
        let mut segments: Vec<String> = members
            .iter()
            .map(|&idx| match &leaves[idx] {
                Leaf::Text { text, .. } => text.clone(),
                _ => String::new(),
            })
            .collect();

        let found = lexer::scan(&segments);
        if !found.issues.is_empty() {
            issues.extend(found.issues.into_iter().map(|issue| lex_issue(part, issue)));
            continue;
        }
        if found.tags.is_empty() {
            continue;
        }
        lexer::merge_split_tags(&mut segments, &found.tags);
        for (&idx, segment) in members.iter().zip(segments) {
            if let Leaf::Text { text, .. } = &mut leaves[idx] {
                *text = segment;
            }
        }
    }

    // 含标签的 `w:t` 需要保留空白
    let mut preserve = Vec::new();
    for leaf in &leaves {
        if let Leaf::Text { text, run: Some(run) } = leaf {
            if text.contains('{') {
                preserve.push(run.t_open);
            }
        }
    }
    for idx in preserve {
        if let Leaf::Open { name, raw } = &mut leaves[idx] {
            if name == RUN_TEXT && !raw.contains("xml:space") {
                raw.insert_str(raw.len() - 1, r#" xml:space="preserve""#);
            }
        }
    }

    let mut nodes = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        match leaf {
            Leaf::Open { name, raw } => nodes.push(Node::Open { name, raw }),
            Leaf::Close { raw, .. } => nodes.push(Node::Close { raw }),
            Leaf::Markup(raw) => nodes.push(Node::Markup(raw)),
            Leaf::Text { text, run: Some(_) } if text.contains('{') => {
                nodes.extend(lexer::split(&text).into_iter().map(|chunk| match chunk {
                    Chunk::Literal(text) => Node::Text(text),
                    Chunk::Tag(tag) => Node::Tag(tag),
                }))
            }
            Leaf::Text { text, .. } => nodes.push(Node::Text(text)),
        }
    }
    nodes
}

fn lex_issue(part: &str, issue: LexIssue) -> TemplateIssue {
    match issue {
        LexIssue::Unclosed(text) => {
            TemplateIssue::new(IssueKind::UnclosedTag, part, format!("tag `{}` is not closed", text))
                .with_tag(&text)
        }
        LexIssue::Unopened => {
            TemplateIssue::new(IssueKind::UnopenedTag, part, "found `}` without a matching `{`")
        }
        LexIssue::Empty => TemplateIssue::new(IssueKind::EmptyTag, part, "found an empty tag `{}`"),
    }
}

impl Structure {
    fn analyze(nodes: &[Node]) -> Self {
        let mut close_of = HashMap::new();
        let mut ancestors = HashMap::new();
        let mut stack: Vec<usize> = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            match node {
                Node::Open { .. } => stack.push(idx),
                Node::Close { .. } => {
                    if let Some(open) = stack.pop() {
                        close_of.insert(open, idx);
                    }
                }
                Node::Tag(_) => {
                    ancestors.insert(idx, stack.clone());
                }
                _ => {}
            }
        }
        Self {
            close_of,
            ancestors,
        }
    }

    /// 标签节点最内层名为 `element` 的外层元素
    fn innermost(&self, nodes: &[Node], tag: usize, element: &str) -> Option<usize> {
        self.ancestors.get(&tag)?.iter().rev().copied().find(|&idx| {
            matches!(&nodes[idx], Node::Open { name, .. } if name == element)
        })
    }

    /// 外层元素的直接父元素
    fn parent_of(&self, tag: usize, element: usize) -> Option<usize> {
        let chain = self.ancestors.get(&tag)?;
        let pos = chain.iter().position(|&idx| idx == element)?;
        pos.checked_sub(1).map(|p| chain[p])
    }

    fn end_of(&self, open: usize) -> usize {
        self.close_of.get(&open).copied().unwrap_or(open)
    }
}

/// 配对区块标签, 返回 (起始标签节点, 结束标签节点)
fn pair_sections(part: &str, nodes: &[Node], issues: &mut Vec<TemplateIssue>) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut stack: Vec<(usize, &str)> = Vec::new();
    for (idx, node) in nodes.iter().enumerate() {
        let Node::Tag(tag) = node else { continue };
        match tag.kind {
            TagKind::Section | TagKind::Inverted => stack.push((idx, tag.name.as_str())),
            TagKind::Close => match stack.last() {
                Some(&(open, name)) if name == tag.name => {
                    stack.pop();
                    pairs.push((open, idx));
                }
                Some(_) if stack.iter().any(|&(_, name)| name == tag.name) => {
                    // 内层未关闭的区块
                    while let Some((open, name)) = stack.pop() {
                        if name == tag.name {
                            pairs.push((open, idx));
                            break;
                        }
                        issues.push(unclosed(part, name));
                    }
                }
                Some(&(_, name)) => issues.push(
                    TemplateIssue::new(
                        IssueKind::MismatchedLoop,
                        part,
                        format!("`{{/{}}}` closes `{{#{}}}`", tag.name, name),
                    )
                    .with_tag(&tag.name),
                ),
                None => issues.push(
                    TemplateIssue::new(
                        IssueKind::UnopenedLoop,
                        part,
                        format!("`{{/{}}}` has no opening tag", tag.name),
                    )
                    .with_tag(&tag.name),
                ),
            },
            TagKind::Value => {}
        }
    }
    issues.extend(stack.into_iter().map(|(_, name)| unclosed(part, name)));
    pairs
}

fn unclosed(part: &str, name: &str) -> TemplateIssue {
    TemplateIssue::new(IssueKind::UnclosedLoop, part, format!("`{{#{}}}` is never closed", name))
        .with_tag(name)
}

/// 计算区块的展开范围: 同段落内联、表格行、或相邻段落
fn expand(
    part: &str,
    nodes: &[Node],
    structure: &Structure,
    open: usize,
    close: usize,
    issues: &mut Vec<TemplateIssue>,
) -> Option<Span> {
    let Node::Tag(tag) = &nodes[open] else {
        return None;
    };
    let inverted = tag.kind == TagKind::Inverted;
    let span = |outer: Range<usize>, body: Range<usize>| Span {
        name: tag.name.clone(),
        inverted,
        outer,
        body,
    };

    let p_open = structure.innermost(nodes, open, PARAGRAPH);
    let p_close = structure.innermost(nodes, close, PARAGRAPH);
    if p_open == p_close {
        return Some(span(open..close + 1, open..close + 1));
    }

    let row_open = structure.innermost(nodes, open, TABLE_ROW);
    let row_close = structure.innermost(nodes, close, TABLE_ROW);
    if let (Some(row), Some(other)) = (row_open, row_close) {
        let cell_open = structure.innermost(nodes, open, TABLE_CELL);
        let cell_close = structure.innermost(nodes, close, TABLE_CELL);
        if row == other && cell_open != cell_close {
            let rows = row..structure.end_of(row) + 1;
            return Some(span(rows.clone(), rows));
        }
    }

    if let (Some(first), Some(last)) = (p_open, p_close) {
        if structure.parent_of(open, first) == structure.parent_of(close, last) && first < last {
            let first_end = structure.end_of(first);
            let last_end = structure.end_of(last);
            let body_start = if only_tag(nodes, first..first_end, open) {
                first_end + 1
            } else {
                first
            };
            let body_end = if only_tag(nodes, last..last_end, close) {
                last
            } else {
                last_end + 1
            };
            return Some(span(first..last_end + 1, body_start..body_end.max(body_start)));
        }
    }

    issues.push(
        TemplateIssue::new(
            IssueKind::LoopPositionInvalid,
            part,
            format!(
                "`{{#{}}}` and its closing tag must share a paragraph, a table row, or sibling paragraphs",
                tag.name
            ),
        )
        .with_tag(&tag.name),
    );
    None
}

/// 段落内除空白外只有给定标签
fn only_tag(nodes: &[Node], range: Range<usize>, tag: usize) -> bool {
    nodes[range.clone()].iter().zip(range).all(|(node, idx)| match node {
        Node::Text(text) => text.trim().is_empty(),
        Node::Tag(_) => idx == tag,
        _ => true,
    })
}

fn build(part: &str, range: Range<usize>, spans: &[Span], issues: &mut Vec<TemplateIssue>) -> Vec<Item> {
    let mut items = Vec::new();
    let mut cursor = range.start;
    let mut i = 0;
    while i < spans.len() {
        let span = &spans[i];
        let mut j = i + 1;
        while j < spans.len() && spans[j].outer.start < span.outer.end {
            j += 1;
        }
        let children = &spans[i + 1..j];
        for child in children {
            if child.outer.start < span.body.start || child.outer.end > span.body.end {
                issues.push(
                    TemplateIssue::new(
                        IssueKind::LoopOverlap,
                        part,
                        format!("`{{#{}}}` overlaps `{{#{}}}`", child.name, span.name),
                    )
                    .with_tag(&child.name),
                );
            }
        }
        if cursor < span.outer.start {
            items.push(Item::Nodes(cursor..span.outer.start));
        }
        items.push(Item::Section {
            name: span.name.clone(),
            inverted: span.inverted,
            body: build(part, span.body.clone(), children, issues),
        });
        cursor = cursor.max(span.outer.end);
        i = j;
    }
    if cursor < range.end {
        items.push(Item::Nodes(cursor..range.end));
    }
    items
}
