use crate::error::{CksrError, Result};

/// 按空白切词的扫描器，括号与引号内部的空白不切分
///
/// `(`/`[`/`<` 与对应的闭合符号构成嵌套，`'`、`"`、`` ` `` 构成引用区间。
/// 行尾逗号不计入最后一个词。一行扫描结束时仍有未闭合的嵌套或引号视为致命错误。
pub(crate) struct WordScanner {
    chars: Vec<char>,
    pos: usize,
}

impl WordScanner {
    pub(crate) fn new(line: &str) -> Self {
        Self {
            chars: line.trim_end().chars().collect(),
            pos: 0,
        }
    }

    /// 取下一个词，扫描到行尾时返回 None
    pub(crate) fn next_word(&mut self) -> Result<Option<String>> {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
        if self.pos >= self.chars.len() {
            return Ok(None);
        }

        let last = self.chars.len() - 1;
        let mut word = String::new();
        let mut stack: Vec<char> = Vec::new();
        let mut quote: Option<char> = None;
        let mut escape_next = false;

        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            let nested = quote.is_some() || !stack.is_empty();

            if !nested && ch.is_whitespace() {
                break;
            }
            if !nested && ch == ',' && self.pos == last {
                self.pos += 1;
                break;
            }

            word.push(ch);
            self.pos += 1;

            if escape_next {
                escape_next = false;
                continue;
            }

            match quote {
                Some(q) => {
                    if ch == '\\' {
                        escape_next = true;
                    } else if ch == q {
                        quote = None;
                    }
                }
                None => match ch {
                    '\'' | '"' | '`' => quote = Some(ch),
                    '(' | '[' => stack.push(ch),
                    // 只把紧跟类型名的 `<` 当作嵌套，如 ARRAY<INT>
                    '<' if self.prev_is_alphabetic() => stack.push(ch),
                    ')' | ']' | '>' => {
                        let open = match ch {
                            ')' => '(',
                            ']' => '[',
                            _ => '<',
                        };
                        if stack.last() == Some(&open) {
                            stack.pop();
                        } else if ch != '>' {
                            return Err(self.unbalanced());
                        }
                    }
                    _ => {}
                },
            }
        }

        if quote.is_some() || !stack.is_empty() {
            return Err(self.unbalanced());
        }
        Ok(Some(word))
    }

    fn prev_is_alphabetic(&self) -> bool {
        // pos 已经越过当前字符
        self.pos >= 2 && self.chars[self.pos - 2].is_ascii_alphabetic()
    }

    fn unbalanced(&self) -> CksrError {
        let line: String = self.chars.iter().collect();
        CksrError::parse(format!("括号或引号不匹配: {line}"))
    }
}

/// 去掉标识符两侧的反引号
pub(crate) fn unquote_identifier(word: &str) -> String {
    word.trim_matches('`').to_string()
}

/// 去掉字符串字面量两侧的引号
pub(crate) fn unquote_literal(word: &str) -> String {
    let trimmed = word.trim();
    for q in ['\'', '"'] {
        if trimmed.len() >= 2 && trimmed.starts_with(q) && trimmed.ends_with(q) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}
