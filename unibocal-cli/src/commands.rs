use std::{fs, path::Path, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use unibocal_core::{
    CalendarRequest, Exam, ServiceConfig,
    course::CourseCatalog,
    providers::{
        opendata::{OpenDataProvider, RefreshOutcome},
        unibo::UniboProvider,
    },
    service::CalendarService,
};

/// 生成课程日历命令参数
pub struct GenerateParams {
    pub course: u32,
    pub year: u32,
    pub curriculum: Option<String>,
    pub subjects: Option<String>,
    pub output: Option<PathBuf>,
}

/// 生成考试日历命令参数
pub struct ExamsParams {
    pub input: PathBuf,
    pub subjects: Option<String>,
    pub title: String,
    pub description: String,
    pub duration_minutes: i64,
    pub output: Option<PathBuf>,
}

async fn load_service(data: &Path) -> Result<CalendarService> {
    let catalog = CourseCatalog::load(data).await.with_context(|| {
        format!(
            "无法读取课程快照 {}，请先运行 refresh",
            data.display()
        )
    })?;
    let source = Arc::new(UniboProvider::new()?);
    Ok(CalendarService::new(
        Arc::new(catalog),
        source,
        ServiceConfig::default(),
    ))
}

/// 逗号分隔的参数，忽略空项
fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// 刷新课程快照命令
pub async fn refresh_command(data: &Path, opendata_url: &str) -> Result<()> {
    tracing::info!("刷新课程快照: {}", data.display());

    let provider = OpenDataProvider::with_root(opendata_url)?;
    match provider.refresh_snapshot(data, Utc::now().year()).await? {
        RefreshOutcome::UpToDate => println!("✓ 课程快照已是最新"),
        RefreshOutcome::Downloaded(count) => {
            println!("✓ 已下载 {} 门课程到 {}", count, data.display())
        }
    }

    Ok(())
}

/// 列出课程命令
pub async fn courses_command(data: &Path, search: Option<String>) -> Result<()> {
    let catalog = CourseCatalog::load(data).await?;
    let search = search.map(|s| s.to_lowercase());

    let courses: Vec<_> = catalog
        .list()
        .into_iter()
        .filter(|c| {
            search
                .as_deref()
                .is_none_or(|s| c.description.to_lowercase().contains(s))
        })
        .collect();

    if courses.is_empty() {
        println!("没有找到课程");
        return Ok(());
    }

    for course in courses {
        println!(
            "{:>5}  {} ({}, {} 年, {})",
            course.code, course.description, course.course_type, course.duration_years, course.campus
        );
    }

    Ok(())
}

/// 列出科目命令
pub async fn subjects_command(data: &Path, code: u32) -> Result<()> {
    let service = load_service(data).await?;
    let course = service.course(code)?;

    println!("{} - {}", course.code, course.description);

    let curricula = service.all_curricula(course).await?;
    let subjects = service.subjects(course, &curricula).await?;

    for (year, entries) in &subjects {
        for entry in entries {
            let label = if entry.curriculum.label.is_empty() {
                entry.curriculum.value.as_str()
            } else {
                entry.curriculum.label.as_str()
            };
            println!("第 {} 学年 [{}] {}", year, entry.curriculum.value, label);
            for subject in &entry.subjects {
                println!("    {}  {}", subject.code, subject.name);
            }
        }
    }

    Ok(())
}

/// 生成课程日历命令
pub async fn generate_command(data: &Path, params: GenerateParams) -> Result<()> {
    let service = load_service(data).await?;

    let mut request = CalendarRequest::new(params.course, params.year)
        .with_subjects(split_list(params.subjects.as_deref()));
    if let Some(curriculum) = params.curriculum.filter(|c| !c.is_empty()) {
        request = request.with_curriculum(curriculum);
    }

    tracing::info!(
        "开始生成课程日历: 课程={}, 学年={}, 培养方案={}",
        request.course_code,
        request.year,
        request.curriculum.value
    );

    let bytes = service.lecture_calendar(&request).await?;

    let output = params.output.unwrap_or_else(|| {
        PathBuf::from(format!("lezioni-{}-{}.ics", params.course, params.year))
    });
    fs::write(&output, &*bytes)?;
    println!("✓ ICS文件已保存到: {}", output.display());

    Ok(())
}

/// 生成考试日历命令
pub fn exams_command(params: ExamsParams) -> Result<()> {
    let content = fs::read_to_string(&params.input)
        .with_context(|| format!("无法读取 {}", params.input.display()))?;
    let exams: Vec<Exam> = serde_json::from_str(&content)?;
    let total = exams.len();

    let config = ServiceConfig {
        exam_duration: chrono::Duration::minutes(params.duration_minutes),
        ..Default::default()
    };
    let service = CalendarService::new(
        Arc::new(CourseCatalog::default()),
        Arc::new(UniboProvider::new()?),
        config,
    );

    let subjects = split_list(params.subjects.as_deref());
    let document = service.exam_calendar(
        exams,
        Some(subjects.as_slice()),
        params.title,
        params.description,
    )?;
    println!("✓ {} 场考试中保留 {} 场", total, document.events.len());

    let output = params
        .output
        .unwrap_or_else(|| PathBuf::from("esami.ics"));
    fs::write(&output, document.to_bytes())?;
    println!("✓ ICS文件已保存到: {}", output.display());

    Ok(())
}
