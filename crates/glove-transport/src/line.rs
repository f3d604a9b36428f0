//! 行缓冲：把字节流切分为行

use crate::TransportError;

/// 单行最大长度（不含行尾），固件遥测行远小于此值
pub const MAX_LINE_LEN: usize = 4096;

/// 行缓冲区
///
/// 字节按到达顺序追加，遇到 `\n` 才产出一行；未完成的部分行一直保留。
/// 部分行超过上限时整行丢弃，直到下一个 `\n` 为止的字节都不会再产出。
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// `buf[..scanned]` 中没有 `\n`
    scanned: usize,
    max_line_len: usize,
    /// 正在丢弃一条超长行的剩余部分
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_line_len,
            discarding: false,
        }
    }

    /// 追加收到的字节
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// 取出下一行（去掉 `\r\n`），没有完整行时返回 `None`
    ///
    /// 超长行返回一次 [`TransportError::LineTooLong`]。
    pub fn next_line(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let Some(offset) = self.buf[self.scanned..].iter().position(|&b| b == b'\n') else {
                if self.discarding {
                    self.buf.clear();
                    self.scanned = 0;
                    return None;
                }
                if self.buf.len() > self.max_line_len {
                    let len = self.buf.len();
                    self.buf.clear();
                    self.scanned = 0;
                    self.discarding = true;
                    return Some(Err(TransportError::LineTooLong { len }));
                }
                self.scanned = self.buf.len();
                return None;
            };

            let pos = self.scanned + offset;
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            self.scanned = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }

            line.pop(); // '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.len() > self.max_line_len {
                return Some(Err(TransportError::LineTooLong { len: line.len() }));
            }
            return Some(String::from_utf8(line).map_err(|_| TransportError::InvalidUtf8));
        }
    }

    /// 未成行的字节数
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
