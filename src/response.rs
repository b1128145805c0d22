use std::{cmp::Ordering, fmt, fs::FileType, fs::Metadata, io, path::Path};

use log::debug;
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
};

use crate::{
    config::Config,
    exception::Exception,
    gophermap::Gophermap,
    menu::{write_entry, write_terminator, MenuEntry},
    param::{ItemType, GOPHERMAP, STUMPED},
    request::Request,
    util::join_selector,
};

/// 请求路径所指向的资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Directory,
    TextFile,
    /// 设备、套接字等既不是目录也不是普通文件的资源
    Other,
}

impl Resource {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        if metadata.is_dir() {
            Resource::Directory
        } else if metadata.is_file() {
            Resource::TextFile
        } else {
            Resource::Other
        }
    }
}

/// 一次成功响应的摘要，用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    Directory { entries: usize },
    Gophermap { lines: usize },
    TextFile { bytes: u64 },
    Stumped,
}

impl fmt::Display for Served {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Served::Directory { entries } => write!(f, "目录列表，共{}项", entries),
            Served::Gophermap { lines } => write!(f, "gophermap目录，共{}行", lines),
            Served::TextFile { bytes } => write!(f, "文本文件，共{}字节", bytes),
            Served::Stumped => write!(f, "{}", STUMPED),
        }
    }
}

/// # 请求分发
///
/// 打开请求的绝对路径并根据资源类型选择响应方式：
/// - 目录：存在 `gophermap` 时按其内容生成菜单，否则列出目录内容；
/// - 普通文件：原样发送文件字节；
/// - 其他：发送一行 `STUMPED` 信息行。
///
/// 资源不存在或无权访问时返回 `ResourceNotFound` / `AccessDenied`，此时尚未写入任何内容，
/// 由调用方决定如何回应客户端。
pub async fn dispatch<W>(request: &Request, config: &Config, writer: &mut W) -> Result<Served, Exception>
where
    W: AsyncWrite + Unpin,
{
    let id = request.id();
    let file = File::open(request.absolute_path())
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Exception::ResourceNotFound,
            io::ErrorKind::PermissionDenied => Exception::AccessDenied,
            _ => Exception::Io(e),
        })?;
    let metadata = file.metadata().await?;

    match Resource::from_metadata(&metadata) {
        Resource::Directory => {
            debug!("[ID{}]请求的路径是目录", id);
            drop(file);
            send_directory(request, config, writer).await
        }
        Resource::TextFile => {
            debug!("[ID{}]请求的路径是文件", id);
            send_text_file(file, config.chunk_size(), writer).await
        }
        Resource::Other => {
            debug!("[ID{}]请求的路径既不是目录也不是文件", id);
            let entry = MenuEntry::info(STUMPED, config.hostname(), config.port());
            write_entry(writer, &entry).await?;
            Ok(Served::Stumped)
        }
    }
}

async fn open_gophermap(dir: &Path) -> Option<File> {
    let file = File::open(dir.join(GOPHERMAP)).await.ok()?;
    let metadata = file.metadata().await.ok()?;
    metadata.is_file().then_some(file)
}

/// 发送目录菜单。`gophermap` 优先于自动列表。
pub async fn send_directory<W>(request: &Request, config: &Config, writer: &mut W) -> Result<Served, Exception>
where
    W: AsyncWrite + Unpin,
{
    let dir = Path::new(request.absolute_path());

    if let Some(map) = open_gophermap(dir).await {
        debug!("[ID{}]使用gophermap生成菜单", request.id());
        let gophermap = Gophermap::new(request.path(), config.hostname(), config.port());
        let mut reader = BufReader::new(map);
        let lines = gophermap
            .render(&mut reader, writer, config.max_line_length())
            .await?;
        return Ok(Served::Gophermap { lines });
    }

    // 先读取完整的目录内容，枚举失败时不发送任何内容
    let entries = read_dir_entries(dir).await?;
    for (name, file_type) in &entries {
        let selector = join_selector(request.path(), name);
        let entry = if file_type.is_file() {
            MenuEntry::new(ItemType::TextFile, name.as_str(), selector, config.hostname(), config.port())
        } else if file_type.is_dir() {
            MenuEntry::new(ItemType::Directory, name.as_str(), selector, config.hostname(), config.port())
        } else {
            MenuEntry::info(name.as_str(), config.hostname(), config.port())
        };
        write_entry(writer, &entry).await?;
    }
    write_terminator(writer).await?;
    Ok(Served::Directory {
        entries: entries.len(),
    })
}

/// 读取目录的直接子项。类型取自目录项本身，不跟随符号链接。
async fn read_dir_entries(dir: &Path) -> io::Result<Vec<(String, FileType)>> {
    let mut entries = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let file_type = entry.file_type().await?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, file_type));
    }
    sort_dir_entries(&mut entries);
    Ok(entries)
}

/// 目录排在文件之前，同类按名称排序
fn sort_dir_entries(entries: &mut [(String, FileType)]) {
    entries.sort_by(|(a_name, a_type), (b_name, b_type)| {
        match (a_type.is_dir(), b_type.is_dir()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a_name.cmp(b_name),
        }
    });
}

/// 按固定大小分块原样发送文件内容，不追加任何行终止符
pub async fn send_text_file<W>(mut file: File, chunk_size: usize, writer: &mut W) -> Result<Served, Exception>
where
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; chunk_size];
    let mut total_sent = 0u64;
    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        // 传输层无法接收全部字节时 write_all 返回 WriteZero 错误
        writer.write_all(&buffer[..n]).await?;
        total_sent += n as u64;
    }
    Ok(Served::TextFile { bytes: total_sent })
}
