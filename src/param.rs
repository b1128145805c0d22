// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Gopher 协议参数与常量模块
//!
//! 该模块定义了 `gopherd` 遵循的 Gopher 协议（RFC 1436）相关常量和数据结构，包括：
//! - 行终止符、菜单终止行等协议层面的固定文本。
//! - 服务器在本地实现上的限制（单行长度、分块大小等）的默认值。
//! - 菜单条目类型（Item Type）的强类型枚举。

use std::fmt;

/// Gopher 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 菜单响应的结束行，仅包含一个英文句点
pub const MENU_TERMINATOR: &str = ".";

/// 目录覆盖文件的文件名。存在该文件时，目录的自动列表将被完全替换。
pub const GOPHERMAP: &str = "gophermap";

/// Gopher 标准端口
pub const DEFAULT_PORT: u16 = 70;

/// 无法解析本机主机名时使用的兜底主机名
pub const FALLBACK_HOSTNAME: &str = "localhost";

/// 请求行与 gophermap 行的默认最大长度（字节）
pub const MAX_LINE_LENGTH: usize = 512;

/// 文本文件流式发送时每个分块的默认大小（字节）
pub const CHUNK_SIZE: usize = 512;

/// 信息行（`i`）所使用的占位 selector
pub const INFO_SELECTOR: &str = "F";

/// 错误行的固定 selector、主机与端口字段
pub const ERROR_SELECTOR: &str = "error";
pub const ERROR_HOST: &str = "host";
pub const ERROR_PORT: u16 = 0;

/// 资源既不是目录也不是普通文件时返回的信息行文本
pub const STUMPED: &str = "STUMPED";

/// 默认的 log4rs 配置文件路径
pub const DEFAULT_LOG_CONFIG: &str = "config/log4rs.yaml";

/// Gopher 菜单条目类型
///
/// 前 14 个变体来自 RFC 1436，其余为社区中广泛使用的扩展类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    /// 纯文本文件
    TextFile,
    /// 目录（子菜单）
    Directory,
    /// CSO 电话簿服务
    CsoPhoneBook,
    /// 错误
    Error,
    /// BinHex 编码的 Macintosh 文件
    BinHex,
    /// DOS 二进制归档
    DosBinary,
    /// UNIX uuencode 文件
    UuEncoded,
    /// 全文检索服务
    Search,
    /// Telnet 会话
    Telnet,
    /// 二进制文件
    Binary,
    /// 冗余（镜像）服务器
    Mirror,
    /// TN3270 会话
    Tn3270,
    /// GIF 图片
    Gif,
    /// 其他图片
    Image,
    /// HTML 文档
    Html,
    /// 信息行，不可选择
    Info,
    /// 音频文件
    Sound,
    /// 文档（PDF 等）
    Document,
    /// PNG 图片
    Png,
    /// PDF 文档
    Pdf,
    /// 视频文件
    Video,
    /// 位图图片
    Bitmap,
    /// 音频文件（`<` 形式）
    SoundAlt,
    /// 指向 Web 的链接
    Www,
    /// MIME 编码的文件
    Mime,
    /// 日历
    Calendar,
    /// XML 文档
    Xml,
    /// RTF 文档
    Rtf,
}

impl ItemType {
    /// 返回该类型在菜单行首使用的单个字符
    pub fn as_char(self) -> char {
        match self {
            ItemType::TextFile => '0',
            ItemType::Directory => '1',
            ItemType::CsoPhoneBook => '2',
            ItemType::Error => '3',
            ItemType::BinHex => '4',
            ItemType::DosBinary => '5',
            ItemType::UuEncoded => '6',
            ItemType::Search => '7',
            ItemType::Telnet => '8',
            ItemType::Binary => '9',
            ItemType::Mirror => '+',
            ItemType::Tn3270 => 'T',
            ItemType::Gif => 'g',
            ItemType::Image => 'I',
            ItemType::Html => 'h',
            ItemType::Info => 'i',
            ItemType::Sound => 's',
            ItemType::Document => 'd',
            ItemType::Png => 'p',
            ItemType::Pdf => 'P',
            ItemType::Video => ';',
            ItemType::Bitmap => ':',
            ItemType::SoundAlt => '<',
            ItemType::Www => 'w',
            ItemType::Mime => 'M',
            ItemType::Calendar => 'c',
            ItemType::Xml => 'x',
            ItemType::Rtf => 'r',
        }
    }

    /// 将行首字符识别为条目类型，无法识别时返回 `None`
    pub fn from_char(c: char) -> Option<Self> {
        let item_type = match c {
            '0' => ItemType::TextFile,
            '1' => ItemType::Directory,
            '2' => ItemType::CsoPhoneBook,
            '3' => ItemType::Error,
            '4' => ItemType::BinHex,
            '5' => ItemType::DosBinary,
            '6' => ItemType::UuEncoded,
            '7' => ItemType::Search,
            '8' => ItemType::Telnet,
            '9' => ItemType::Binary,
            '+' => ItemType::Mirror,
            'T' => ItemType::Tn3270,
            'g' => ItemType::Gif,
            'I' => ItemType::Image,
            'h' => ItemType::Html,
            'i' => ItemType::Info,
            's' => ItemType::Sound,
            'd' => ItemType::Document,
            'p' => ItemType::Png,
            'P' => ItemType::Pdf,
            ';' => ItemType::Video,
            ':' => ItemType::Bitmap,
            '<' => ItemType::SoundAlt,
            'w' => ItemType::Www,
            'M' => ItemType::Mime,
            'c' => ItemType::Calendar,
            'x' => ItemType::Xml,
            'r' => ItemType::Rtf,
            _ => return None,
        };
        Some(item_type)
    }
}

impl fmt::Display for ItemType {
    /// 将枚举格式化为菜单行首的类型字符
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}
