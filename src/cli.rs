// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand};

/// 默认输出的历史记录条数
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "statsrs")]
#[command(about = "Periodically collects MCP server counts from registry sites")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// 未指定子命令时运行调度循环
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the scheduler until Ctrl-C
    Run,

    /// Run a single stats collection and exit
    Once,

    /// Print the latest snapshot as JSON
    Latest,

    /// Print the most recent history rows
    History {
        #[arg(default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
}
