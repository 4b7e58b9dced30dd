//! 从自由文本中提取 JSON 对象
//!
//! 分类后端被要求只返回一个 JSON 对象，但实际响应经常带有客套话、
//! markdown 代码块等包装。本模块的契约：提取文本中**第一个花括号配平的
//! JSON 对象子串**（正确处理字符串字面量与转义，不使用正则）。
//! 提取出的子串是否为合法 JSON 由调用方解析时判定。

/// 提取第一个花括号配平的对象子串
///
/// 找不到起始 `{` 或括号始终未配平时返回 `None`。
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
