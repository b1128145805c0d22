use std::{
    env,
    fs::File,
    io::prelude::*,
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;
use log::warn;
use serde_derive::{Deserialize, Serialize};

use crate::{
    exception::Exception,
    param::{CHUNK_SIZE, DEFAULT_LOG_CONFIG, DEFAULT_PORT, MAX_LINE_LENGTH},
    util::{clean_path, default_hostname},
};

/// 命令行参数。未指定的项使用配置文件或内置默认值。
#[derive(Debug, Parser, Clone)]
#[command(name = "gopherd", version, about = "A toy Gopher server based on Rust")]
pub struct CliArgs {
    /// 菜单中对外公布的主机名（默认为本机主机名）
    #[arg(long)]
    pub hostname: Option<String>,

    /// 菜单中对外公布的端口（默认为 70）
    #[arg(long)]
    pub port: Option<u16>,

    /// TOML 配置文件路径
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// log4rs 配置文件路径
    #[arg(long, default_value = DEFAULT_LOG_CONFIG)]
    pub log_config: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_hostname")]
    hostname: String,
    #[serde(default = "default_port")]
    port: u16,
    /// 为空时使用启动时的工作目录
    #[serde(default)]
    doc_root: String,
    /// 为空时监听 `hostname:port`
    #[serde(default)]
    bind_address: String,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_max_line_length")]
    max_line_length: usize,
    /// 0 表示不限制并发连接数
    #[serde(default)]
    max_connections: usize,
    /// 单位为秒，0 表示不设超时。读取请求行和发送整个响应各自受此限制。
    #[serde(default)]
    io_timeout: u64,
    /// 单位为毫秒
    #[serde(default = "default_accept_backoff_min")]
    accept_backoff_min: u64,
    /// 单位为毫秒
    #[serde(default = "default_accept_backoff_max")]
    accept_backoff_max: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_chunk_size() -> usize {
    CHUNK_SIZE
}

fn default_max_line_length() -> usize {
    MAX_LINE_LENGTH
}

fn default_accept_backoff_min() -> u64 {
    5
}

fn default_accept_backoff_max() -> u64 {
    1000
}

impl Config {
    pub fn new() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
            doc_root: String::new(),
            bind_address: String::new(),
            worker_threads: 0,
            chunk_size: default_chunk_size(),
            max_line_length: default_max_line_length(),
            max_connections: 0,
            io_timeout: 0,
            accept_backoff_min: default_accept_backoff_min(),
            accept_backoff_max: default_accept_backoff_max(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, Exception> {
        toml::from_str(content).map_err(|e| Exception::Config(e.to_string()))
    }

    pub fn from_toml(filename: &Path) -> Result<Self, Exception> {
        let mut file = File::open(filename)
            .map_err(|e| Exception::Config(format!("{}: {}", filename.display(), e)))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Exception::Config(format!("{}: {}", filename.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// 按 “内置默认值 < 配置文件 < 命令行” 的优先级构造最终配置
    pub fn load(args: &CliArgs) -> Result<Self, Exception> {
        let mut config = match &args.config {
            Some(path) => Self::from_toml(path)?,
            None => Self::new(),
        };
        config.apply_cli(args);
        config.finalize()
    }

    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(hostname) = &args.hostname {
            self.hostname = hostname.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
    }

    /// 解析文档根目录并修正非法的取值。只应在启动时调用一次。
    pub fn finalize(mut self) -> Result<Self, Exception> {
        let root = if self.doc_root.is_empty() {
            env::current_dir().map_err(|_| Exception::WorkingDirectoryUnavailable)?
        } else {
            let path = PathBuf::from(&self.doc_root);
            if path.is_absolute() {
                path
            } else {
                env::current_dir()
                    .map_err(|_| Exception::WorkingDirectoryUnavailable)?
                    .join(path)
            }
        };
        let root = root.to_str().ok_or(Exception::WorkingDirectoryUnavailable)?;
        self.doc_root = clean_path(root);

        if self.hostname.is_empty() {
            return Err(Exception::Config("hostname must not be empty".to_string()));
        }
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.chunk_size == 0 {
            warn!("chunk_size被设置为0，该值将被改为{}。", CHUNK_SIZE);
            self.chunk_size = CHUNK_SIZE;
        }
        if self.max_line_length == 0 {
            warn!("max_line_length被设置为0，该值将被改为{}。", MAX_LINE_LENGTH);
            self.max_line_length = MAX_LINE_LENGTH;
        }
        if self.accept_backoff_min == 0 {
            self.accept_backoff_min = default_accept_backoff_min();
        }
        if self.accept_backoff_max < self.accept_backoff_min {
            warn!(
                "accept_backoff_max({})小于accept_backoff_min({})，两者将取相同的值。",
                self.accept_backoff_max, self.accept_backoff_min
            );
            self.accept_backoff_max = self.accept_backoff_min;
        }
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = hostname.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_doc_root(mut self, doc_root: &str) -> Self {
        self.doc_root = doc_root.to_string();
        self
    }

    pub fn with_bind_address(mut self, bind_address: &str) -> Self {
        self.bind_address = bind_address.to_string();
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_io_timeout(mut self, seconds: u64) -> Self {
        self.io_timeout = seconds;
        self
    }
}

impl Config {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 规范化之后的文档根目录绝对路径
    pub fn doc_root(&self) -> &str {
        &self.doc_root
    }

    pub fn bind_address(&self) -> String {
        if self.bind_address.is_empty() {
            format!("{}:{}", self.hostname, self.port)
        } else {
            self.bind_address.clone()
        }
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    pub fn max_connections(&self) -> Option<usize> {
        match self.max_connections {
            0 => None,
            n => Some(n),
        }
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        match self.io_timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn accept_backoff(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.accept_backoff_min),
            Duration::from_millis(self.accept_backoff_max),
        )
    }
}
