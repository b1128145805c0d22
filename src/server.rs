//! # 监听与连接处理
//!
//! `Server` 绑定 TCP 端口并在主循环中接受连接，每个连接交由独立的 Tokio 任务处理，
//! 主循环从不等待任何一个连接处理完成。
//!
//! 连接处理器只读取一行请求，完成一次响应后无条件关闭连接。

use std::{future::Future, io, net::SocketAddr, sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use tokio::{
    io::{split, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter},
    net::TcpListener,
    sync::Semaphore,
};

use crate::{config::Config, exception::Exception, menu::write_error, request::Request, response};

pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
    /// 配置了最大连接数时用于限制并发
    limiter: Option<Arc<Semaphore>>,
}

impl Server {
    /// 绑定 `config.bind_address()`。失败时返回 `Exception::Bind`，调用方应终止进程。
    pub async fn bind(config: Arc<Config>) -> Result<Self, Exception> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| Exception::Bind(address.clone(), e))?;
        info!("服务端已在{}上监听Socket连接", address);
        let limiter = config
            .max_connections()
            .map(|n| Arc::new(Semaphore::new(n)));
        Ok(Self {
            listener,
            config,
            limiter,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 主事件循环 (Accept Loop)。单次 accept 失败不会让服务器停止。
    pub async fn run(self) {
        let (min, max) = self.config.accept_backoff();
        let mut backoff = AcceptBackoff::new(min, max);
        let mut id: u128 = 0;

        loop {
            // 达到连接上限时在这里等待，而不是接受之后再拒绝
            let permit = match &self.limiter {
                Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
                None => None,
            };

            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    backoff.reset();
                    debug!("[ID{}]新的连接：{}", id, addr);
                    let config = Arc::clone(&self.config);
                    tokio::spawn(async move {
                        handle_connection(stream, id, &config).await;
                        drop(permit);
                    });
                    id += 1;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!("接受连接时遇到错误：{}，{}ms后重试", e, delay.as_millis());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// accept 连续失败时的指数退避
#[derive(Debug, Clone)]
pub struct AcceptBackoff {
    min: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl AcceptBackoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            current: None,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.min,
            Some(d) => (d * 2).min(self.max),
        };
        self.current = Some(delay);
        delay
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

async fn within<F, T>(limit: Option<Duration>, future: F) -> Result<T, Exception>
where
    F: Future<Output = Result<T, Exception>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => Err(Exception::Timeout),
        },
        None => future.await,
    }
}

/// # 连接处理器
///
/// 负责单个连接的完整生命周期：读取请求行、分发请求、记录结果，最后关闭连接。
/// 无论处理成功与否，返回前都会刷新并关闭连接。
pub async fn handle_connection<S>(stream: S, id: u128, config: &Config)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, writer) = split(stream);
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    serve_request(&mut reader, &mut writer, id, config).await;

    if let Err(e) = writer.flush().await {
        debug!("[ID{}]刷新连接时遇到错误: {}", id, e);
    }
    if let Err(e) = writer.shutdown().await {
        debug!("[ID{}]关闭连接时遇到错误: {}", id, e);
    }
    debug!("[ID{}]连接已关闭", id);
}

async fn serve_request<R, W>(reader: &mut BufReader<R>, writer: &mut W, id: u128, config: &Config)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request = match within(config.io_timeout(), Request::read_from(reader, id, config)).await {
        Ok(request) => request,
        Err(Exception::Timeout) => {
            warn!("[ID{}]读取请求行超时", id);
            return;
        }
        // 具体原因已在解析时记录
        Err(_) => return,
    };
    info!("[ID{}]收到请求：{}", id, request.selector());

    match within(config.io_timeout(), response::dispatch(&request, config, writer)).await {
        Ok(served) => {
            info!("[ID{}]{} 已发送：{}", id, request.path(), served);
        }
        Err(Exception::ResourceNotFound) => {
            warn!("[ID{}]请求的资源：{} 不存在", id, request.path());
            send_not_found(writer, &request).await;
        }
        Err(Exception::AccessDenied) => {
            // 对客户端隐藏资源是否存在
            warn!("[ID{}]无权访问请求的资源：{}", id, request.path());
            send_not_found(writer, &request).await;
        }
        Err(Exception::Timeout) => {
            warn!("[ID{}]发送{}的响应超时", id, request.path());
        }
        Err(e) => {
            error!("[ID{}]处理{}时发生异常: {}", id, request.path(), e);
        }
    }
}

async fn send_not_found<W>(writer: &mut W, request: &Request)
where
    W: AsyncWrite + Unpin,
{
    let message = format!("{}: resource not found", request.selector());
    if let Err(e) = write_error(writer, &message).await {
        error!("[ID{}]发送错误行失败: {}", request.id(), e);
    }
}
