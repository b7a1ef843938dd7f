//! 占位符标签扫描
//!
//! Word 经常把一个 `{tag}` 拆进多个 run, 所以扫描按段落进行:
//! 先在段落全部 `w:t` 文本的拼接上定位标签, 再把跨 run 的标签整体
//! 移到起始 run 中, 之后每个标签都完整地位于单个文本片段内。

const OPEN: char = '{';
const CLOSE: char = '}';

/// 标签类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    /// `{name}`
    Value,
    /// `{#name}`
    Section,
    /// `{^name}`
    Inverted,
    /// `{/name}`
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tag {
    pub kind: TagKind,
    pub name: String,
}

impl Tag {
    pub(crate) fn parse(content: &str) -> Self {
        let content = content.trim();
        let (kind, name) = match content.chars().next() {
            Some('#') => (TagKind::Section, &content[1..]),
            Some('^') => (TagKind::Inverted, &content[1..]),
            Some('/') => (TagKind::Close, &content[1..]),
            _ => (TagKind::Value, content),
        };
        Self {
            kind,
            name: name.trim().to_string(),
        }
    }
}

/// 文本片段中的位置 (片段下标, 字节偏移)
pub(crate) type Pos = (usize, usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Located {
    pub tag: Tag,
    pub start: Pos,
    /// 右花括号之后的位置
    pub end: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LexIssue {
    Unclosed(String),
    Unopened,
    Empty,
}

#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub tags: Vec<Located>,
    pub issues: Vec<LexIssue>,
}

pub(crate) fn scan<S: AsRef<str>>(segments: &[S]) -> Scan {
    let mut scan = Scan::default();
    let mut current: Option<(Pos, String)> = None;

    for (seg, text) in segments.iter().enumerate() {
        for (offset, ch) in text.as_ref().char_indices() {
            match ch {
                OPEN => {
                    if let Some((_, content)) = current.take() {
                        scan.issues.push(LexIssue::Unclosed(format!("{{{}", content)));
                    }
                    current = Some(((seg, offset), String::new()));
                }
                CLOSE => match current.take() {
                    Some((start, content)) => {
                        if content.trim().is_empty() {
                            scan.issues.push(LexIssue::Empty);
                        } else {
                            scan.tags.push(Located {
                                tag: Tag::parse(&content),
                                start,
                                end: (seg, offset + 1),
                            });
                        }
                    }
                    None => scan.issues.push(LexIssue::Unopened),
                },
                _ => {
                    if let Some((_, content)) = current.as_mut() {
                        content.push(ch);
                    }
                }
            }
        }
    }

    if let Some((_, content)) = current {
        scan.issues.push(LexIssue::Unclosed(format!("{{{}", content)));
    }
    scan
}

/// 把跨片段的标签合并到起始片段, 后续片段中对应的文本删除
pub(crate) fn merge_split_tags(segments: &mut [String], tags: &[Located]) {
    for located in tags.iter().rev() {
        let (si, so) = located.start;
        let (ei, eo) = located.end;
        if si == ei {
            continue;
        }
        let mut full = segments[si].split_off(so);
        for segment in &mut segments[si + 1..ei] {
            full.push_str(segment);
            segment.clear();
        }
        full.push_str(&segments[ei][..eo]);
        segments[ei].replace_range(..eo, "");
        segments[si].push_str(&full);
    }
}

/// 单个片段拆分结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Chunk {
    Literal(String),
    Tag(Tag),
}

/// 拆分一个不含跨片段标签、且扫描无错误的文本片段
pub(crate) fn split(text: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find(OPEN) {
        let Some(close) = rest[open..].find(CLOSE).map(|c| open + c) else {
            break;
        };
        if open > 0 {
            chunks.push(Chunk::Literal(rest[..open].to_string()));
        }
        chunks.push(Chunk::Tag(Tag::parse(&rest[open + 1..close])));
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        chunks.push(Chunk::Literal(rest.to_string()));
    }
    chunks
}
