// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#[cfg(test)]
mod security_tests {
    //! # 安全回归测试套件
    //!
    //! 模拟常见的攻击向量来验证服务器的防御能力：
    //! - 路径遍历：越过文档根目录的请求不会得到任何响应；
    //! - 畸形请求：超长、非 UTF-8 以及含空字节的请求行被静默关闭；
    //! - 性质测试：任意 selector 解析出的路径都位于文档根目录之内。

    use std::{fs, net::SocketAddr, sync::Arc, time::Duration};

    use gopherd::{
        request::{normalize_selector, resolve},
        Config, Server,
    };
    use proptest::prelude::*;
    use tempfile::TempDir;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };

    /// 在临时目录中放置一个位于文档根目录之外的“机密”文件
    fn jailed_root() -> (TempDir, String) {
        let outer = tempfile::tempdir().unwrap();
        fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("root");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("public.txt"), "hello").unwrap();
        let root = root.to_str().unwrap().to_string();
        (outer, root)
    }

    async fn start(root: &str) -> SocketAddr {
        let config = Config::new()
            .with_hostname("gopher.test")
            .with_bind_address("127.0.0.1:0")
            .with_doc_root(root)
            .finalize()
            .unwrap();
        let server = Server::bind(Arc::new(config)).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    async fn send_request(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        // 服务端可能在读完请求之前就关闭连接，写入失败不影响断言
        let _ = stream.write_all(request).await;
        let mut response = Vec::new();
        // 设置硬超时限制，防止测试用例因服务器挂起而永久阻塞
        let _ = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
            .await
            .expect("服务端没有关闭连接");
        response
    }

    /// ## 攻击向量：路径遍历
    #[tokio::test]
    async fn test_path_traversal() {
        let (_outer, root) = jailed_root();
        let addr = start(&root).await;

        let attacks: [&[u8]; 6] = [
            b"/../secret.txt\r\n",
            b"../secret.txt\r\n",
            b"/../../../../etc/passwd\r\n",
            b"/public.txt/../../secret.txt\r\n",
            b"/./../secret.txt\r\n",
            b"//..//secret.txt\r\n",
        ];
        for attack in attacks {
            let response = send_request(addr, attack).await;
            assert!(
                response.is_empty(),
                "越界请求{:?}不应得到响应",
                String::from_utf8_lossy(attack)
            );
        }
    }

    /// ## 攻击向量：与文档根目录同前缀的兄弟目录
    #[tokio::test]
    async fn test_sibling_prefix_directory() {
        let (outer, root) = jailed_root();
        let sibling = outer.path().join("root2");
        fs::create_dir(&sibling).unwrap();
        fs::write(sibling.join("leak.txt"), "leak").unwrap();
        let addr = start(&root).await;

        let response = send_request(addr, b"/../root2/leak.txt\r\n").await;
        assert!(response.is_empty());
    }

    /// ## 攻击向量：折返路径仍留在根目录之内时应正常处理
    #[tokio::test]
    async fn test_dotdot_inside_root_is_allowed() {
        let (_outer, root) = jailed_root();
        fs::create_dir(format!("{}/docs", root)).unwrap();
        let addr = start(&root).await;

        let response = send_request(addr, b"/docs/../public.txt\r\n").await;
        assert_eq!(response, b"hello");
    }

    /// ## 攻击向量：空字节注入
    #[tokio::test]
    async fn test_null_byte_injection() {
        let (_outer, root) = jailed_root();
        let addr = start(&root).await;

        let response = send_request(addr, b"/public.txt\0.gif\r\n").await;
        assert!(response.is_empty());
    }

    /// ## 攻击向量：超长请求行
    #[tokio::test]
    async fn test_oversized_request_line() {
        let (_outer, root) = jailed_root();
        let addr = start(&root).await;

        let request = format!("/{}\r\n", "A".repeat(10_000));
        let response = send_request(addr, request.as_bytes()).await;
        assert!(response.is_empty());
    }

    /// ## 攻击向量：非 UTF-8 请求
    #[tokio::test]
    async fn test_invalid_utf8() {
        let (_outer, root) = jailed_root();
        let addr = start(&root).await;

        let response = send_request(addr, b"/\xc0\xaf\xc0\xaf\r\n").await;
        assert!(response.is_empty());
    }

    /// ## 协议健壮性：未发送任何数据即关闭的连接不影响后续请求
    #[tokio::test]
    async fn test_empty_connection() {
        let (_outer, root) = jailed_root();
        let addr = start(&root).await;

        drop(TcpStream::connect(addr).await.unwrap());
        let response = send_request(addr, b"/public.txt\r\n").await;
        assert_eq!(response, b"hello");
    }

    /// ## 注入：菜单中的文件名不会拆出额外字段
    #[cfg(unix)]
    #[tokio::test]
    async fn test_tab_in_file_name() {
        let (_outer, root) = jailed_root();
        fs::write(format!("{}/evil\tname", root), "x").unwrap();
        let addr = start(&root).await;

        let response = String::from_utf8(send_request(addr, b"\r\n").await).unwrap();
        for line in response.split("\r\n").filter(|l| !l.is_empty() && *l != ".") {
            assert_eq!(line.matches('\t').count(), 3, "菜单行字段数错误: {:?}", line);
        }
    }

    proptest! {
        #[test]
        fn resolved_path_stays_inside_root(selector in "[a-z./]{0,40}") {
            let root = "/srv/gopher";
            let path = normalize_selector(&selector);
            if let Some(absolute) = resolve(root, &path) {
                prop_assert!(absolute == root || absolute.starts_with("/srv/gopher/"));
                prop_assert!(!absolute.split('/').any(|seg| seg == ".." || seg == "."));
            }
        }

        #[test]
        fn normalized_selector_is_canonical(selector in "\\PC{0,40}") {
            let path = normalize_selector(&selector);
            prop_assert!(path.starts_with('/'));
            prop_assert!(path == "/" || !path.ends_with('/'));
            prop_assert!(!path.contains("//"));
            prop_assert_eq!(normalize_selector(&path), path.clone());
        }

        #[test]
        fn selectors_without_dotdot_always_resolve(segments in prop::collection::vec("[a-z0-9]{1,8}", 0..6)) {
            let selector = format!("/{}", segments.join("/"));
            let expected = if segments.is_empty() {
                "/srv/gopher".to_string()
            } else {
                format!("/srv/gopher{}", selector)
            };
            let absolute = resolve("/srv/gopher", &normalize_selector(&selector));
            prop_assert_eq!(absolute, Some(expected));
        }
    }
}
