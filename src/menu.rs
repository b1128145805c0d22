// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Gopher 菜单编码模块
//!
//! 负责把菜单条目序列化为协议规定的格式：
//!
//! ```text
//! <类型><显示文本>\t<selector>\t<主机>\t<端口>\r\n
//! ```
//!
//! 菜单响应以仅包含 `.` 的一行结束；错误响应只有一行，且没有结束行。

use std::{borrow::Cow, fmt, io};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::param::*;

/// 单个 Gopher 菜单行。生成后立即序列化发送，不会被保存。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    item_type: ItemType,
    display: String,
    selector: String,
    host: String,
    port: u16,
}

impl MenuEntry {
    pub fn new(
        item_type: ItemType,
        display: impl Into<String>,
        selector: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            item_type,
            display: display.into(),
            selector: selector.into(),
            host: host.into(),
            port,
        }
    }

    /// 不可选择的信息行
    pub fn info(text: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self::new(ItemType::Info, text, INFO_SELECTOR, host, port)
    }

    /// 错误行，selector、主机与端口均为固定值
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ItemType::Error, message, ERROR_SELECTOR, ERROR_HOST, ERROR_PORT)
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 编码为带 CRLF 的完整协议行
    pub fn to_bytes(&self) -> Bytes {
        let line = self.to_string();
        let mut buf = BytesMut::with_capacity(line.len() + CRLF.len());
        buf.put_slice(line.as_bytes());
        buf.put_slice(CRLF.as_bytes());
        buf.freeze()
    }
}

const FIELD_BREAKS: &[char] = &['\t', '\r', '\n'];

/// 字段内部的制表符和换行符会破坏行结构，统一替换为空格
fn field(value: &str) -> Cow<'_, str> {
    if value.contains(FIELD_BREAKS) {
        Cow::Owned(value.replace(FIELD_BREAKS, " "))
    } else {
        Cow::Borrowed(value)
    }
}

impl fmt::Display for MenuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}\t{}\t{}\t{}",
            self.item_type,
            field(&self.display),
            field(&self.selector),
            field(&self.host),
            self.port
        )
    }
}

/// 发送一行文本并追加 CRLF
pub async fn write_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(line.len() + CRLF.len());
    buf.put_slice(line.as_bytes());
    buf.put_slice(CRLF.as_bytes());
    writer.write_all(&buf).await
}

pub async fn write_entry<W>(writer: &mut W, entry: &MenuEntry) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&entry.to_bytes()).await
}

pub async fn write_error<W>(writer: &mut W, message: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_entry(writer, &MenuEntry::error(message)).await
}

/// 发送菜单结束行 `.`
pub async fn write_terminator<W>(writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_line(writer, MENU_TERMINATOR).await
}
