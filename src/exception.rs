// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了 Gopher 服务器在启动与请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖了请求行读取错误、路径越界、文件系统错误以及启动阶段的致命错误。
//! - **语义映射**：连接处理器根据变体决定是向客户端发送错误行，还是只记录日志后直接断开。
//! - **用户友好**：通过实现 `std::fmt::Display`，确保错误信息可以被安全地记录到日志中。

use std::{fmt, io};

/// 服务器处理过程中发生的异常类型。
#[derive(Debug)]
pub enum Exception {
    /// 客户端在发送完整请求行之前关闭了连接，或读取请求行时出错。
    MalformedRequest,
    /// 请求行无法解析为合法的 UTF-8 字符串。
    RequestIsNotUtf8,
    /// 请求行超过了允许的最大长度。
    RequestTooLong,
    /// 规范化之后的路径不在文档根目录之内（目录遍历尝试）。
    OutsideDocumentRoot,
    /// 请求的资源不存在。
    ResourceNotFound,
    /// 无权访问请求的资源。对客户端而言与 `ResourceNotFound` 无法区分。
    AccessDenied,
    /// 读写过程中超过了配置的时限。
    Timeout,
    /// 其他 I/O 错误，例如响应中途的读写失败。
    Io(io::Error),
    /// 配置文件缺失或内容非法。
    Config(String),
    /// 无法确定当前工作目录，或工作目录无法作为文档根目录使用。
    WorkingDirectoryUnavailable,
    /// 无法绑定监听地址。
    Bind(String, io::Error),
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRequest => write!(f, "Malformed request from client"),
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            RequestTooLong => write!(f, "Request line is too long"),
            OutsideDocumentRoot => write!(f, "Requested file not in document root"),
            ResourceNotFound => write!(f, "Resource not found"),
            AccessDenied => write!(f, "Access denied"),
            Timeout => write!(f, "Operation timed out"),
            Io(e) => write!(f, "I/O error: {}", e),
            Config(msg) => write!(f, "Invalid configuration: {}", msg),
            WorkingDirectoryUnavailable => write!(f, "No access to the working directory"),
            Bind(addr, e) => write!(f, "Couldn't bind {}: {}", addr, e),
        }
    }
}

impl std::error::Error for Exception {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Io(e) | Bind(_, e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Exception {
    fn from(e: io::Error) -> Self {
        Io(e)
    }
}
