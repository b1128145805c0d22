use std::io;

use log::warn;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::param::FALLBACK_HOSTNAME;

/// 按 `/` 分隔对路径做纯词法的规范化。
///
/// - 多个连续的 `/` 合并为一个，`.` 段被丢弃；
/// - `..` 段抵消其前一个普通段；
/// - 以 `/` 开头的路径中，位于根部的 `..` 被丢弃；相对路径中无法抵消的 `..` 被保留；
/// - 结果为空时，绝对路径返回 `/`，相对路径返回 `.`。
///
/// 该函数不访问文件系统，也不解析符号链接。
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ => {
                    if !rooted {
                        parts.push("..");
                    }
                }
            },
            s => parts.push(s),
        }
    }
    let joined = parts.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// 将 `name` 拼接到 selector `base` 之下，去掉多余的 `/`。
pub fn join_selector(base: &str, name: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}

/// 有长度上限的单行读取结果
#[derive(Debug, PartialEq, Eq)]
pub struct BoundedLine {
    /// 去掉行终止符（`\n` 或 `\r\n`）之后的内容
    pub bytes: Vec<u8>,
    /// 读满上限仍未遇到换行符时为 `true`，剩余部分留在 reader 中
    pub truncated: bool,
}

/// 读取一行，行内容最多 `limit` 个字节，行终止符不计入上限。
///
/// 在任何字节被读取之前遇到 EOF 时返回 `Ok(None)`；在行中途遇到 EOF 时，
/// 已读取的部分作为完整的一行返回。
pub async fn read_bounded_line<R>(reader: &mut R, limit: usize) -> io::Result<Option<BoundedLine>>
where
    R: AsyncBufRead + Unpin,
{
    let mut bytes = Vec::new();
    let n = (&mut *reader)
        .take(limit as u64)
        .read_until(b'\n', &mut bytes)
        .await?;
    if n == 0 {
        return Ok(None);
    }

    let terminated = if bytes.last() == Some(&b'\n') {
        bytes.pop();
        true
    } else if n >= limit {
        // 内容恰好填满上限时，紧随其后的终止符仍属于这一行
        consume_terminator(reader).await?
    } else {
        true
    };
    if terminated && bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    Ok(Some(BoundedLine {
        bytes,
        truncated: !terminated,
    }))
}

/// 若 reader 的下一个字节是 `\n` 或 `\r\n`，将其消耗并返回 `true`
async fn consume_terminator<R>(reader: &mut R) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    let next = reader.fill_buf().await?.first().copied();
    match next {
        Some(b'\n') => {
            reader.consume(1);
            Ok(true)
        }
        Some(b'\r') => {
            reader.consume(1);
            if reader.fill_buf().await?.first() == Some(&b'\n') {
                reader.consume(1);
            }
            Ok(true)
        }
        // EOF 紧跟在内容之后
        None => Ok(true),
        Some(_) => Ok(false),
    }
}

/// 本机主机名，无法确定时退回到 `localhost`。
pub fn default_hostname() -> String {
    match hostname::get().ok().and_then(|h| h.into_string().ok()) {
        Some(name) if !name.is_empty() => name,
        _ => {
            warn!("无法确定本机主机名，使用默认值{}", FALLBACK_HOSTNAME);
            FALLBACK_HOSTNAME.to_string()
        }
    }
}
