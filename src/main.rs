// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 异步 Gopher 服务器
//!
//! 基于 Tokio 运行时的多线程 Gopher (RFC 1436) 服务器，把文档根目录以菜单的形式发布出去。
//! 核心功能包括：
//! - 目录自动列表，以及通过 `gophermap` 文件自定义菜单
//! - 文本文件分块传输
//! - 基于路径段的文档根目录越界检查
//! - 可选的并发连接数上限与读写超时

use std::{path::Path, process, sync::Arc};

use clap::Parser;
use log::{error, info, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config as LogConfig, Root},
    encode::pattern::PatternEncoder,
};
use tokio::runtime::Builder;

use gopherd::{CliArgs, Config, Server};

/// # 程序入口点
///
/// 初始化日志、加载配置、构建 Tokio 运行时并启动主事件循环。
fn main() {
    let args = CliArgs::parse();

    // 1. 初始化日志系统：优先使用外部 YAML 配置，找不到时退回到控制台输出
    init_logging(&args.log_config);

    // 2. 配置加载：内置默认值 < TOML 配置文件 < 命令行参数
    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("无法加载配置：{}", e);
            process::exit(1);
        }
    };
    info!("配置文件已载入");
    info!("文档根目录: {}", config.doc_root());
    info!("对外公布的地址: {}:{}", config.hostname(), config.port());

    // 3. 异步运行时：根据配置分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            process::exit(1);
        }
    };

    runtime.block_on(async {
        let server = match Server::bind(Arc::new(config)).await {
            Ok(server) => server,
            Err(e) => {
                error!("{}", e);
                process::exit(1);
            }
        };
        server.run().await;
    });
}

fn init_logging(log_config: &Path) {
    if log_config.exists() {
        match log4rs::init_file(log_config, Default::default()) {
            Ok(_) => return,
            Err(e) => eprintln!("无法载入日志配置{}：{}", log_config.display(), e),
        }
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {m}{n}",
        )))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("无法初始化日志系统：{}", e);
            }
        }
        Err(e) => eprintln!("无法初始化日志系统：{}", e),
    }
}
