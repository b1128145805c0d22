// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Gopher 请求处理模块
//!
//! 负责把客户端发送的一行 selector 转换为文档根目录之内的绝对路径：
//! 1. 读取请求行（有长度上限），去掉行终止符以及 TAB 之后的附加字段。
//! 2. 对 selector 做词法规范化，得到以 `/` 开头的请求路径。
//! 3. 将请求路径拼接到文档根目录之后再次规范化，并校验结果仍位于文档根目录之内。
//!
//! 第 3 步是整个服务器最核心的安全边界：校验失败的请求不会触发任何文件系统操作。

use log::warn;
use tokio::io::AsyncBufRead;

use crate::{
    config::Config,
    exception::Exception,
    util::{clean_path, read_bounded_line},
};

/// 单个连接上的一次 Gopher 请求。
#[derive(Debug, Clone)]
pub struct Request {
    /// 连接 ID，用于在日志中追踪
    id: u128,
    /// 客户端发送的原始 selector（不含行终止符与 TAB 之后的内容）
    selector: String,
    /// 规范化之后的请求路径，总是以 `/` 开头
    path: String,
    /// 文档根目录下的绝对路径
    absolute_path: String,
}

impl Request {
    /// 从连接中读取请求行并解析。
    ///
    /// 连接在发送任何数据前关闭、读取出错或请求行过长时返回错误，调用方不应再向客户端发送任何内容。
    pub async fn read_from<R>(reader: &mut R, id: u128, config: &Config) -> Result<Self, Exception>
    where
        R: AsyncBufRead + Unpin,
    {
        let line = match read_bounded_line(reader, config.max_line_length()).await {
            Ok(Some(line)) => line,
            Ok(None) => {
                warn!("[ID{}]客户端未发送请求即关闭了连接", id);
                return Err(Exception::MalformedRequest);
            }
            Err(e) => {
                warn!("[ID{}]读取请求行时遇到错误: {}", id, e);
                return Err(Exception::MalformedRequest);
            }
        };
        if line.truncated {
            warn!(
                "[ID{}]请求行超过了{}字节的上限",
                id,
                config.max_line_length()
            );
            return Err(Exception::RequestTooLong);
        }
        Self::try_from(&line.bytes, id, config.doc_root())
    }

    /// 从已去掉行终止符的请求行构建 `Request`。
    pub fn try_from(line: &[u8], id: u128, doc_root: &str) -> Result<Self, Exception> {
        let line = match std::str::from_utf8(line) {
            Ok(line) => line,
            Err(_) => {
                warn!("[ID{}]请求行不是合法的UTF-8", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };
        // Gopher+ 客户端会在 TAB 之后附加额外字段
        let selector = match line.split_once('\t') {
            Some((selector, _)) => selector,
            None => line,
        };
        let path = normalize_selector(selector);
        let absolute_path = match resolve(doc_root, &path) {
            Some(p) => p,
            None => {
                warn!(
                    "[ID{}]请求的路径：{} 不在文档根目录内，拒绝处理",
                    id, selector
                );
                return Err(Exception::OutsideDocumentRoot);
            }
        };
        Ok(Self {
            id,
            selector: selector.to_string(),
            path,
            absolute_path,
        })
    }
}

impl Request {
    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn absolute_path(&self) -> &str {
        &self.absolute_path
    }
}

/// 将 selector 规范化为以单个 `/` 开头、不以 `/` 结尾的请求路径。
///
/// selector 被当作相对路径处理，因此越过起点的 `..` 会被保留下来
/// （例如 `/../etc` 规范化为 `/../etc`），交由 [`resolve`] 拒绝。
/// 该函数是幂等的。
pub fn normalize_selector(selector: &str) -> String {
    let cleaned = clean_path(selector.trim_start_matches('/'));
    let trimmed = cleaned.trim_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// 计算请求路径对应的绝对路径；结果不在 `doc_root` 之内时返回 `None`。
///
/// `doc_root` 必须是经过 [`clean_path`] 规范化的绝对路径。
pub fn resolve(doc_root: &str, path: &str) -> Option<String> {
    let absolute = clean_path(&format!("{}{}", doc_root, path));
    if is_within(doc_root, &absolute) {
        Some(absolute)
    } else {
        None
    }
}

/// 按路径段判断 `path` 是否等于 `root` 或位于其之下
fn is_within(root: &str, path: &str) -> bool {
    if root == "/" {
        return path.starts_with('/');
    }
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    const ROOT: &str = "/srv/gopher";

    #[test]
    fn test_normalize_empty_selector() {
        assert_eq!(normalize_selector(""), "/");
        assert_eq!(normalize_selector("/"), "/");
        assert_eq!(normalize_selector("."), "/");
        assert_eq!(normalize_selector("//"), "/");
    }

    #[test]
    fn test_normalize_strips_slashes_and_dots() {
        assert_eq!(normalize_selector("docs"), "/docs");
        assert_eq!(normalize_selector("/docs/"), "/docs");
        assert_eq!(normalize_selector("//docs//a/./b/"), "/docs/a/b");
        assert_eq!(normalize_selector("/docs/a/../b"), "/docs/b");
    }

    #[test]
    fn test_normalize_keeps_escaping_dotdot() {
        assert_eq!(normalize_selector("/../../etc/passwd"), "/../../etc/passwd");
        assert_eq!(normalize_selector("a/../../b"), "/../b");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for selector in ["", "/a/b/", "../x", "/a/../../b/./c", "a//b/../c/"] {
            let once = normalize_selector(selector);
            assert_eq!(normalize_selector(&once), once);
        }
    }

    #[test]
    fn test_resolve_inside_root() {
        assert_eq!(resolve(ROOT, "/").as_deref(), Some(ROOT));
        assert_eq!(
            resolve(ROOT, "/docs/notes.txt").as_deref(),
            Some("/srv/gopher/docs/notes.txt")
        );
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        assert_eq!(resolve(ROOT, "/../../etc/passwd"), None);
        assert_eq!(resolve(ROOT, "/.."), None);
        assert_eq!(resolve(ROOT, "/../gopher2/secret"), None);
    }

    #[test]
    fn test_resolve_rejects_sibling_with_shared_prefix() {
        assert_eq!(resolve(ROOT, "/../gopherx"), None);
        assert!(!is_within(ROOT, "/srv/gopherx"));
        assert!(is_within(ROOT, "/srv/gopher/x"));
    }

    #[test]
    fn test_resolve_with_filesystem_root() {
        assert_eq!(resolve("/", "/etc/motd").as_deref(), Some("/etc/motd"));
        assert_eq!(resolve("/", "/../etc").as_deref(), Some("/etc"));
    }

    #[test]
    fn test_try_from_strips_gopher_plus_fields() {
        let request = Request::try_from(b"/docs\t+", 3, ROOT).unwrap();
        assert_eq!(request.id(), 3);
        assert_eq!(request.selector(), "/docs");
        assert_eq!(request.path(), "/docs");
        assert_eq!(request.absolute_path(), "/srv/gopher/docs");
    }

    #[test]
    fn test_try_from_rejects_traversal() {
        let result = Request::try_from(b"/../../etc/passwd", 0, ROOT);
        assert!(matches!(result, Err(Exception::OutsideDocumentRoot)));
    }

    #[test]
    fn test_try_from_rejects_invalid_utf8() {
        let result = Request::try_from(&[0x2f, 0xff, 0xfe], 0, ROOT);
        assert!(matches!(result, Err(Exception::RequestIsNotUtf8)));
    }

    fn config() -> Config {
        Config::new()
            .with_hostname("gopher.test")
            .with_doc_root(ROOT)
            .finalize()
            .unwrap()
    }

    #[tokio::test]
    async fn test_read_from_connection() {
        let mut reader = BufReader::new(&b"/pics\r\n"[..]);
        let request = Request::read_from(&mut reader, 1, &config()).await.unwrap();
        assert_eq!(request.path(), "/pics");
        assert_eq!(request.absolute_path(), "/srv/gopher/pics");
    }

    #[tokio::test]
    async fn test_read_from_empty_line_is_root() {
        let mut reader = BufReader::new(&b"\r\n"[..]);
        let request = Request::read_from(&mut reader, 1, &config()).await.unwrap();
        assert_eq!(request.selector(), "");
        assert_eq!(request.path(), "/");
        assert_eq!(request.absolute_path(), ROOT);
    }

    #[tokio::test]
    async fn test_read_from_closed_connection() {
        let mut reader = BufReader::new(&b""[..]);
        let result = Request::read_from(&mut reader, 1, &config()).await;
        assert!(matches!(result, Err(Exception::MalformedRequest)));
    }

    #[tokio::test]
    async fn test_read_from_oversized_request() {
        let long = format!("/{}\r\n", "A".repeat(10000));
        let mut reader = BufReader::new(long.as_bytes());
        let result = Request::read_from(&mut reader, 1, &config()).await;
        assert!(matches!(result, Err(Exception::RequestTooLong)));
    }
}
