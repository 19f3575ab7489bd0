use std::{collections::BTreeMap, time::Duration};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 课程信息（来自开放数据 CSV）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// 学年，如 "2024/2025"
    pub academic_year: String,
    /// 是否可注册
    pub enrollable: String,
    /// 课程代码
    pub code: u32,
    /// 课程名称
    pub description: String,
    /// 课程主页
    pub url: String,
    pub campus: String,
    pub site: String,
    pub scope: String,
    /// 课程类型（laurea, magistrale ...）
    pub course_type: String,
    /// 学制年数
    pub duration_years: u32,
    pub international: bool,
    pub international_title: String,
    pub international_language: String,
    pub languages: String,
    /// 入学方式
    pub access: String,
}

impl Course {
    /// 学年是否在 [1, duration_years] 范围内
    pub fn has_year(&self, year: u32) -> bool {
        (1..=self.duration_years).contains(&year)
    }
}

/// 课程网站标识，从课程主页抓取
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseWebsiteId {
    pub category: String,
    pub slug: String,
}

/// 上游 JSON 中的 `null` 与缺失字段同样视为默认值
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

/// 培养方案
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Curriculum {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub selected: bool,
}

impl Curriculum {
    /// 不按培养方案筛选
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn is_none(&self) -> bool {
        self.value.is_empty()
    }
}

/// 每学年的培养方案列表
pub type CurriculaMap = BTreeMap<u32, Vec<Curriculum>>;

/// 教室
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    #[serde(rename = "des_risorsa", default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// 课表中的单次课程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEvent {
    #[serde(rename = "cod_modulo")]
    pub module_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "docente", default, deserialize_with = "null_as_default")]
    pub teacher: String,
    #[serde(rename = "cfu", default, deserialize_with = "null_as_default")]
    pub credit_units: u32,
    #[serde(rename = "periodo", default, deserialize_with = "null_as_default")]
    pub period: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(rename = "aule", default, deserialize_with = "null_as_default")]
    pub classrooms: Vec<Classroom>,
    #[serde(rename = "periodo_calendario", default, deserialize_with = "null_as_default")]
    pub calendar_period: String,
    #[serde(rename = "cod_sdoppiamento", default, deserialize_with = "null_as_default")]
    pub split_code: String,
    #[serde(rename = "extCode", default, deserialize_with = "null_as_default")]
    pub external_code: String,
    #[serde(rename = "teledidattica", default, deserialize_with = "null_as_default")]
    pub remote: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<String>,
}

pub type Timetable = Vec<TimetableEvent>;

/// 课表查询的日期范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// 科目（从课表中去重得到）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub code: String,
    pub name: String,
}

/// 某个培养方案下的科目列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumSubjects {
    pub curriculum: Curriculum,
    pub subjects: Vec<Subject>,
}

/// 学年 -> 培养方案 -> 科目
pub type SubjectMap = BTreeMap<u32, Vec<CurriculumSubjects>>;

/// 考试安排
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub subject_code: String,
    pub subject_name: String,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub exam_type: String,
}

/// 日历事件，仅在一次生成过程中存在
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEvent {
    /// 内容哈希
    pub uid: String,
    pub organizer: String,
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: Option<String>,
    pub description: String,
    /// 生成时间 (DTSTAMP)
    pub stamp: DateTime<Utc>,
}

/// 课程日历请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRequest {
    pub course_code: u32,
    pub year: u32,
    pub curriculum: Curriculum,
    /// 已排序、去重的科目代码
    pub subjects: Vec<String>,
}

impl CalendarRequest {
    pub fn new(course_code: u32, year: u32) -> Self {
        Self {
            course_code,
            year,
            curriculum: Curriculum::none(),
            subjects: Vec::new(),
        }
    }

    pub fn with_curriculum(mut self, value: impl Into<String>) -> Self {
        self.curriculum = Curriculum::from_value(value);
        self
    }

    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut subjects: Vec<String> = subjects
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        subjects.sort();
        subjects.dedup();
        self.subjects = subjects;
        self
    }

    /// 解析逗号分隔的科目参数，忽略空项
    pub fn with_subjects_query(self, query: &str) -> Self {
        self.with_subjects(query.split(','))
    }

    /// 日历缓存键：课程、学年、培养方案、排序后的科目
    ///
    /// 以 JSON 数组编码，字段中的 `:` 或 `,` 不会造成冲突。
    pub fn cache_key(&self) -> String {
        serde_json::json!([
            self.course_code,
            self.year,
            self.curriculum.value,
            self.subjects
        ])
        .to_string()
    }
}

/// ICS生成选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcsOptions {
    pub product_id: String,
    /// METHOD 属性
    pub method: String,
    /// 时区（写入 X-WR-TIMEZONE）
    pub timezone: Option<String>,
}

impl Default for IcsOptions {
    fn default() -> Self {
        Self {
            product_id: "-//Unibocal//Course Calendar//IT".to_string(),
            method: "REQUEST".to_string(),
            timezone: Some("Europe/Rome".to_string()),
        }
    }
}

/// 单个缓存实例的配置
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub ttl: Duration,
    /// None 表示不启动后台清理
    pub sweep_interval: Option<Duration>,
}

/// 三个缓存实例的配置
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub website: CachePolicy,
    pub subjects: CachePolicy,
    pub calendars: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            website: CachePolicy {
                ttl: Duration::MAX,
                sweep_interval: None,
            },
            subjects: CachePolicy {
                ttl: Duration::from_secs(4 * 3600),
                sweep_interval: Some(Duration::from_secs(3600)),
            },
            calendars: CachePolicy {
                ttl: Duration::from_secs(10 * 60),
                sweep_interval: Some(Duration::from_secs(30 * 60)),
            },
        }
    }
}

/// 服务配置
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub ics: IcsOptions,
    /// 考试时长，上游数据不提供
    pub exam_duration: chrono::Duration,
    /// 预热任务启动前的等待
    pub warm_start_delay: Duration,
    /// 预热任务每门课程之间的间隔
    pub warm_course_delay: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            ics: IcsOptions::default(),
            exam_duration: chrono::Duration::hours(2),
            warm_start_delay: Duration::from_secs(5),
            warm_course_delay: Duration::from_secs(30),
        }
    }
}
