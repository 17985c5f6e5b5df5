use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::models::Post;

/// 区块注释标记
const BLOCK_MARKER: &str = "<!-- wp:";
/// 构建器短代码标记
const SHORTCODE_MARKER: &str = "[et_pb_";
/// 构建器区块的命名空间
const BUILDER_NAMESPACE: &str = "divi/";
/// 平均每个单词的字符数，用于把字符长度换算成手动摘要的单词数
const CHARS_PER_WORD: usize = 6;

struct Patterns {
    block_delimiter: Regex,
    script_style: Regex,
    tag: Regex,
    bracket: Regex,
    shortcode: Regex,
    whitespace: Regex,
    setting_token: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        block_delimiter: Regex::new(
            r"(?s)<!--\s+(?P<closer>/)?wp:(?P<namespace>[a-z][a-z0-9_-]*/)?(?P<name>[a-z][a-z0-9_-]*)\s+(?P<attrs>\{.*?\}\s+)?(?P<void>/)?-->",
        )
        .expect("valid block delimiter pattern"),
        script_style: Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>")
            .expect("valid script pattern"),
        tag: Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"),
        bracket: Regex::new(r"\[.*?\]").expect("valid bracket pattern"),
        shortcode: Regex::new(r"\[/?[A-Za-z][\w-]*(?:\s[^\]]*)?/?\]").expect("valid shortcode pattern"),
        whitespace: Regex::new(r"\s+").expect("valid whitespace pattern"),
        setting_token: Regex::new(r"^[0-9A-Za-z_\s-]+$").expect("valid setting pattern"),
    })
}

/// 从文章生成纯文本摘要
///
/// 优先使用手动摘要（按 `max_length / 6` 个单词截断），其次是正文，
/// 正文为空时回退到旧版正文。正文按内容类型预处理后去除标签和短代码，
/// 超过 `max_length` 个字符时在单词边界截断并追加 `...`。
pub fn extract_excerpt(post: &Post, max_length: usize) -> String {
    let manual = strip_all_tags(&post.excerpt);
    if !manual.trim().is_empty() {
        let words = (max_length / CHARS_PER_WORD).max(1);
        return trim_words(&manual, words);
    }

    let content = if !post.content.trim().is_empty() {
        post.content.as_str()
    } else {
        match post.legacy_content.as_deref() {
            Some(legacy) if !legacy.trim().is_empty() => legacy,
            _ => return String::new(),
        }
    };

    let text = plain_text(content);
    truncate_at_word(&text, max_length)
}

/// 把正文转换为折叠空白后的纯文本
pub fn plain_text(content: &str) -> String {
    let p = patterns();
    let mut text = if content.contains(BLOCK_MARKER) {
        extract_text_from_blocks(content)
    } else if content.contains(SHORTCODE_MARKER) {
        p.bracket.replace_all(content, " ").into_owned()
    } else {
        content.to_string()
    };

    text = strip_all_tags(&text);
    text = p.shortcode.replace_all(&text, "").into_owned();
    collapse_whitespace(&text)
}

/// 超过 `max_length` 个字符时在最后一个空白处截断并追加 `...`
///
/// 第一个单词本身就超长时保留整个单词，不在单词中间截断。
pub fn truncate_at_word(text: &str, max_length: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_length) else {
        return text.to_string();
    };

    let head = &text[..cut];
    if text[cut..].starts_with(char::is_whitespace) {
        return format!("{}...", head.trim_end());
    }

    match head.rfind(char::is_whitespace) {
        Some(idx) if !head[..idx].trim().is_empty() => format!("{}...", head[..idx].trim_end()),
        _ => {
            let first_word = text.split_whitespace().next().unwrap_or_default();
            format!("{}...", first_word)
        }
    }
}

/// 保留前 `count` 个单词，有剩余时追加 `...`
fn trim_words(text: &str, count: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > count {
        format!("{}...", words[..count].join(" "))
    } else {
        words.join(" ")
    }
}

/// 去除 script/style 块和所有 HTML 标签，并解码常见实体
pub fn strip_all_tags(html: &str) -> String {
    let p = patterns();
    let without_scripts = p.script_style.replace_all(html, "");
    let text = p.tag.replace_all(&without_scripts, "");
    decode_entities(&text)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&#8217;", "\u{2019}")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    patterns().whitespace.replace_all(text, " ").trim().to_string()
}

/// 解析出的区块
#[derive(Debug, Clone, Default)]
struct Block {
    /// 区块名，自由 HTML 片段为 `None`
    name: Option<String>,
    attrs: Value,
    inner_html: String,
    inner_blocks: Vec<Block>,
}

impl Block {
    fn named(name: String, attrs: Value) -> Self {
        Self {
            name: Some(name),
            attrs,
            ..Self::default()
        }
    }

    fn has_attrs(&self) -> bool {
        self.attrs.as_object().map_or(false, |map| !map.is_empty())
    }
}

/// 把区块注释标记的内容解析成区块树
fn parse_blocks(content: &str) -> Vec<Block> {
    let p = patterns();
    let mut top_level: Vec<Block> = Vec::new();
    let mut stack: Vec<Block> = Vec::new();
    let mut cursor = 0;

    let attach = |block: Block, stack: &mut Vec<Block>, top_level: &mut Vec<Block>| {
        match stack.last_mut() {
            Some(parent) => parent.inner_blocks.push(block),
            None => top_level.push(block),
        }
    };

    for caps in p.block_delimiter.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        let between = &content[cursor..whole.start()];
        cursor = whole.end();

        match stack.last_mut() {
            Some(open) => open.inner_html.push_str(between),
            None if !between.trim().is_empty() => top_level.push(Block {
                inner_html: between.to_string(),
                ..Block::default()
            }),
            None => {}
        }

        let namespace = caps.name("namespace").map_or("core/", |m| m.as_str());
        let name = format!("{}{}", namespace, &caps["name"]);

        if caps.name("closer").is_some() {
            if let Some(done) = stack.pop() {
                attach(done, &mut stack, &mut top_level);
            }
            continue;
        }

        let attrs = caps
            .name("attrs")
            .and_then(|m| serde_json::from_str::<Value>(m.as_str().trim()).ok())
            .unwrap_or(Value::Null);
        let block = Block::named(name, attrs);

        if caps.name("void").is_some() {
            attach(block, &mut stack, &mut top_level);
        } else {
            stack.push(block);
        }
    }

    let rest = &content[cursor..];
    match stack.last_mut() {
        Some(open) => open.inner_html.push_str(rest),
        None if !rest.trim().is_empty() => top_level.push(Block {
            inner_html: rest.to_string(),
            ..Block::default()
        }),
        None => {}
    }

    // 未闭合的区块按原顺序挂回父级
    while let Some(open) = stack.pop() {
        attach(open, &mut stack, &mut top_level);
    }

    top_level
}

/// 从区块内容中提取可读文本
fn extract_text_from_blocks(content: &str) -> String {
    let mut fragments = Vec::new();
    collect_block_text(&parse_blocks(content), &mut fragments);
    collapse_whitespace(&fragments.join(" "))
}

fn collect_block_text(blocks: &[Block], fragments: &mut Vec<String>) {
    for block in blocks {
        let Some(name) = block.name.as_deref() else {
            continue;
        };

        if name.contains(BUILDER_NAMESPACE) && block.has_attrs() {
            let known = [
                block.attrs.pointer("/content/innerContent/desktop/value"),
                block.attrs.get("innerContent").filter(|v| v.is_string()),
                block.attrs.pointer("/innerContent/desktop/value"),
            ];
            let found = known
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(strip_all_tags)
                .find(|text| !text.trim().is_empty());

            match found {
                Some(text) => fragments.push(text),
                None => collect_attr_text(&block.attrs, fragments),
            }
        }

        let text = strip_all_tags(&block.inner_html);
        let text = text.trim();
        if !text.is_empty() {
            fragments.push(text.to_string());
        }

        collect_block_text(&block.inner_blocks, fragments);
    }
}

/// 在区块属性中递归查找像正文的字符串，跳过 URL、类名、颜色和设置值
fn collect_attr_text(value: &Value, fragments: &mut Vec<String>) {
    let p = patterns();
    match value {
        Value::String(raw) => {
            if raw.len() <= 10 || strip_all_tags(raw).is_empty() {
                return;
            }
            if raw.starts_with("http")
                || raw.starts_with("class")
                || raw.starts_with('#')
                || p.setting_token.is_match(raw)
            {
                return;
            }
            let text = strip_all_tags(raw);
            let text = text.trim();
            if text.len() > 10 {
                fragments.push(text.to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_attr_text(item, fragments)),
        Value::Object(map) => map.values().for_each(|item| collect_attr_text(item, fragments)),
        _ => {}
    }
}
