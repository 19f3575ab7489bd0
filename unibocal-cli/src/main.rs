mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "unibocal")]
#[command(about = "博洛尼亚大学课程表导出工具")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 课程快照文件
    #[arg(short, long, global = true, default_value = "data/courses.json")]
    data: PathBuf,

    /// 启用详细日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 从开放数据门户刷新课程快照
    Refresh {
        /// 开放数据门户地址
        #[arg(long, default_value = "https://dati.unibo.it/")]
        opendata_url: String,
    },

    /// 列出课程
    Courses {
        /// 按名称筛选（不区分大小写）
        #[arg(short, long)]
        search: Option<String>,
    },

    /// 列出课程每个学年、培养方案的科目
    Subjects {
        /// 课程代码
        #[arg(short, long)]
        course: u32,
    },

    /// 生成课程日历
    Generate {
        /// 课程代码
        #[arg(short, long)]
        course: u32,

        /// 学年（从 1 开始）
        #[arg(short, long)]
        year: u32,

        /// 培养方案代码
        #[arg(long)]
        curriculum: Option<String>,

        /// 逗号分隔的科目代码
        #[arg(short, long)]
        subjects: Option<String>,

        /// 输出文件路径
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 从 JSON 考试记录生成考试日历
    Exams {
        /// 考试记录 JSON 文件
        #[arg(short, long)]
        input: PathBuf,

        /// 逗号分隔的科目代码
        #[arg(short, long)]
        subjects: Option<String>,

        /// 日历名称
        #[arg(long, default_value = "Esami")]
        title: String,

        /// 日历描述
        #[arg(long, default_value = "")]
        description: String,

        /// 考试时长（分钟）
        #[arg(long, default_value = "120", value_parser = clap::value_parser!(i64).range(1..=1440))]
        duration_minutes: i64,

        /// 输出文件路径
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 设置日志级别
    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("unibocal_cli={0},unibocal_core={0}", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Refresh { opendata_url } => {
            commands::refresh_command(&cli.data, &opendata_url).await
        }

        Commands::Courses { search } => commands::courses_command(&cli.data, search).await,

        Commands::Subjects { course } => commands::subjects_command(&cli.data, course).await,

        Commands::Generate {
            course,
            year,
            curriculum,
            subjects,
            output,
        } => {
            commands::generate_command(
                &cli.data,
                commands::GenerateParams {
                    course,
                    year,
                    curriculum,
                    subjects,
                    output,
                },
            )
            .await
        }

        Commands::Exams {
            input,
            subjects,
            title,
            description,
            duration_minutes,
            output,
        } => commands::exams_command(commands::ExamsParams {
            input,
            subjects,
            title,
            description,
            duration_minutes,
            output,
        }),
    }
}
