//! WordprocessingML 的扁平化表示
//!
//! 模板只关心 `w:t` 中的文本与 `w:p` / `w:tr` / `w:tc` 的嵌套关系,
//! 其余标记按原样保留, 渲染时直接拼接。

use quick_xml::events::Event;
use quick_xml::Reader;

pub(crate) const PARAGRAPH: &str = "w:p";
pub(crate) const TABLE_ROW: &str = "w:tr";
pub(crate) const TABLE_CELL: &str = "w:tc";
pub(crate) const RUN_TEXT: &str = "w:t";

/// 解析后的一个片段
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Leaf {
    Open { name: String, raw: String },
    Close { name: String, raw: String },
    /// 自闭合元素、声明、注释等不参与模板的标记
    Markup(String),
    /// 已反转义的文本
    Text { text: String, run: Option<RunText> },
}

/// `w:t` 内的文本位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunText {
    /// 所属 `w:t` 起始标签的下标
    pub t_open: usize,
    /// 最内层 `w:p` 起始标签的下标
    pub paragraph: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum XmlError {
    #[error(transparent)]
    Syntax(#[from] quick_xml::Error),
    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

pub(crate) fn parse(xml: &str) -> Result<Vec<Leaf>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut leaves = Vec::new();
    // (元素名, 起始标签下标)
    let mut open: Vec<(String, usize)> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = lossy(e.name().as_ref());
                open.push((name.clone(), leaves.len()));
                leaves.push(Leaf::Open {
                    name,
                    raw: format!("<{}>", lossy(&e)),
                });
            }
            Event::End(e) => {
                let name = lossy(e.name().as_ref());
                open.pop();
                leaves.push(Leaf::Close {
                    raw: format!("</{}>", name),
                    name,
                });
            }
            Event::Empty(e) => leaves.push(Leaf::Markup(format!("<{}/>", lossy(&e)))),
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                let run = match open.last() {
                    Some((name, t_open)) if name == RUN_TEXT => Some(RunText {
                        t_open: *t_open,
                        paragraph: open
                            .iter()
                            .rev()
                            .find(|(name, _)| name == PARAGRAPH)
                            .map(|(_, idx)| *idx),
                    }),
                    _ => None,
                };
                leaves.push(Leaf::Text { text, run });
            }
            Event::CData(e) => leaves.push(Leaf::Markup(format!("<![CDATA[{}]]>", lossy(&e)))),
            Event::Comment(e) => leaves.push(Leaf::Markup(format!("<!--{}-->", lossy(&e)))),
            Event::Decl(e) => leaves.push(Leaf::Markup(format!("<?{}?>", lossy(&e)))),
            Event::PI(e) => leaves.push(Leaf::Markup(format!("<?{}?>", lossy(&e)))),
            Event::DocType(e) => {
                leaves.push(Leaf::Markup(format!("<!DOCTYPE {}>", lossy(&e).trim())))
            }
            Event::Eof => break,
        }
    }

    if let Some((name, _)) = open.pop() {
        return Err(XmlError::Unclosed(name));
    }

    Ok(leaves)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
