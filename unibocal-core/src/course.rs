use std::{collections::HashMap, path::Path};

use crate::{Course, Error, Result};

/// 课程目录，按课程代码索引
#[derive(Debug, Clone, Default)]
pub struct CourseCatalog {
    courses: HashMap<u32, Course>,
}

impl CourseCatalog {
    /// 同一代码出现多次时保留最后一条
    pub fn from_courses(courses: impl IntoIterator<Item = Course>) -> Self {
        Self {
            courses: courses.into_iter().map(|c| (c.code, c)).collect(),
        }
    }

    /// 从 JSON 快照加载
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read(path).await?;
        let courses: Vec<Course> = serde_json::from_slice(&content)?;
        tracing::info!(path = %path.display(), courses = courses.len(), "loaded course catalog");
        Ok(Self::from_courses(courses))
    }

    pub fn find(&self, code: u32) -> Option<&Course> {
        self.courses.get(&code)
    }

    pub fn get(&self, code: u32) -> Result<&Course> {
        self.find(code)
            .ok_or_else(|| Error::NotFound(format!("course {}", code)))
    }

    /// 按课程代码降序
    pub fn list(&self) -> Vec<&Course> {
        let mut list: Vec<&Course> = self.courses.values().collect();
        list.sort_by(|a, b| b.code.cmp(&a.code));
        list
    }

    /// 按课程代码升序（预热顺序）
    pub fn codes(&self) -> Vec<u32> {
        let mut codes: Vec<u32> = self.courses.keys().copied().collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

/// 写入 JSON 快照，必要时创建目录
pub async fn write_snapshot(path: &Path, courses: &[Course]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec(courses)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
