//! # Gophermap 解释器
//!
//! 目录中名为 `gophermap` 的文件会完全取代该目录的自动列表。文件逐行解释：
//!
//! - 不含 TAB 的行是信息行，原样作为 `i` 条目发送；
//! - 含 TAB 的行最多拆分为 4 个字段：`<类型><显示文本>`、selector、主机、端口，
//!   缺省或为空的字段使用默认值。
//!
//! 所有行处理完毕后发送结束行 `.`。

use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::{
    exception::Exception,
    menu::{write_entry, write_terminator, MenuEntry},
    param::ItemType,
    util::{join_selector, read_bounded_line},
};

/// 针对某一次请求的 gophermap 解释上下文
#[derive(Debug, Clone, Copy)]
pub struct Gophermap<'a> {
    /// 目录的请求路径，相对 selector 以此为基准
    request_path: &'a str,
    host: &'a str,
    port: u16,
}

impl<'a> Gophermap<'a> {
    pub fn new(request_path: &'a str, host: &'a str, port: u16) -> Self {
        Self {
            request_path,
            host,
            port,
        }
    }

    /// 将 gophermap 中的一行解释为菜单条目
    pub fn parse_line(&self, line: &str) -> MenuEntry {
        if !line.contains('\t') {
            return MenuEntry::info(line, self.host, self.port);
        }

        let mut fields = line.splitn(4, '\t');
        let head = fields.next().unwrap_or_default();
        // 行首字符不是已知类型时，整个首字段作为信息行的显示文本
        let (item_type, display) = match head.chars().next().and_then(ItemType::from_char) {
            Some(item_type) => (item_type, &head[1..]),
            None => (ItemType::Info, head),
        };

        let selector = match fields.next().filter(|s| !s.is_empty()) {
            Some(path) if path.starts_with('/') => path.to_string(),
            Some(path) => join_selector(self.request_path, path),
            None => join_selector(self.request_path, display),
        };

        let host = fields
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(self.host);

        let port = match fields
            .next()
            .and_then(|s| s.split('\t').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(port) => port.parse().unwrap_or_else(|_| {
                warn!("gophermap中的端口{}无法解析，使用默认端口{}", port, self.port);
                self.port
            }),
            None => self.port,
        };

        MenuEntry::new(item_type, display, selector, host, port)
    }

    /// 逐行解释 `reader` 中的内容并写入 `writer`，最后发送结束行。
    ///
    /// 返回发送的条目数。读取出错时立即返回错误，不发送结束行。
    pub async fn render<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        max_line_length: usize,
    ) -> Result<usize, Exception>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut count = 0;
        while let Some(line) = read_bounded_line(reader, max_line_length).await? {
            if line.truncated {
                debug!("gophermap中的行超过了{}字节，将被拆分", max_line_length);
            }
            let text = String::from_utf8_lossy(&line.bytes);
            write_entry(writer, &self.parse_line(&text)).await?;
            count += 1;
        }
        write_terminator(writer).await?;
        Ok(count)
    }
}
