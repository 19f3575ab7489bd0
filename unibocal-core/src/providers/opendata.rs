use std::{io::Read, path::Path};

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Url;
use serde::Deserialize;

use crate::{
    Course, Error, Result,
    course::write_snapshot,
    providers::{BaseProvider, BaseProviderBuilder, ProviderInfo},
};

const API_ROOT: &str = "https://dati.unibo.it/";
pub const DEGREE_PROGRAMMES_PACKAGE: &str = "degree-programmes";
pub const LATEST_COURSES_ALIAS: &str = "corsi_latest_it";
const LAST_MODIFIED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const COURSE_COLUMNS: usize = 15;

/// CKAN `package_show` 响应
#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub success: bool,
    pub result: PackageResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageResult {
    #[serde(default)]
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub frequency: String,
    pub url: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub package_id: String,
    #[serde(default)]
    pub last_modified: Option<String>,
    /// 逗号加空格分隔的别名列表
    #[serde(default)]
    pub alias: String,
}

impl Resource {
    pub fn has_alias(&self, alias: &str) -> bool {
        self.alias.split(", ").any(|a| a == alias)
    }

    /// 上游的最后修改时间，按 UTC 解析
    pub fn last_modified(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.last_modified.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let naive = NaiveDateTime::parse_from_str(raw, LAST_MODIFIED_FORMAT)?;
        Ok(Some(naive.and_utc()))
    }
}

impl Package {
    pub fn resource_by_alias(&self, alias: &str) -> Option<&Resource> {
        self.result.resources.iter().find(|r| r.has_alias(alias))
    }
}

/// 快照刷新结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 本地快照比上游新
    UpToDate,
    /// 重新下载并写入的课程数
    Downloaded(usize),
}

/// dati.unibo.it 开放数据门户
pub struct OpenDataProvider {
    base: BaseProvider,
    root: Url,
}

impl OpenDataProvider {
    pub fn new() -> Result<Self> {
        Self::with_root(API_ROOT)
    }

    pub fn with_root(root: &str) -> Result<Self> {
        let info = ProviderInfo {
            name: "opendata".to_string(),
        };
        let root = Url::parse(root)
            .map_err(|e| Error::Config(format!("invalid open data root {}: {}", root, e)))?;

        Ok(Self {
            base: BaseProviderBuilder::new_with_timeout(info, 120).build()?,
            root,
        })
    }

    pub fn package_url(&self, id: &str) -> Result<Url> {
        let mut url = self
            .root
            .join("api/3/action/package_show")
            .map_err(|e| Error::Internal(format!("invalid open data url: {}", e)))?;
        url.query_pairs_mut().append_pair("id", id);
        Ok(url)
    }

    pub async fn package(&self, id: &str) -> Result<Package> {
        let url = self.package_url(id)?;
        self.base.get_json(url).await
    }

    /// 下载并解析课程 CSV 资源
    pub async fn download_courses(&self, resource: &Resource) -> Result<Vec<Course>> {
        if !resource.url.ends_with(".csv") {
            return Err(Error::Malformed(format!(
                "resource {} is not a csv file",
                resource.url
            )));
        }

        let body = self.base.get_bytes(resource.url.as_str()).await?;
        parse_courses_csv(body.as_slice())
    }

    /// 当上游资源比本地快照新（或快照不存在）时重新下载
    ///
    /// 只保留学年包含 `current_year` 的课程。
    pub async fn refresh_snapshot(&self, path: &Path, current_year: i32) -> Result<RefreshOutcome> {
        let package = self.package(DEGREE_PROGRAMMES_PACKAGE).await?;
        if package.result.resources.is_empty() {
            return Err(self.base.custom_error("package has no resources"));
        }

        let resource = package
            .resource_by_alias(LATEST_COURSES_ALIAS)
            .ok_or_else(|| {
                Error::NotFound(format!("open data resource {}", LATEST_COURSES_ALIAS))
            })?;

        let local = snapshot_modified(path).await?;
        if let (Some(local), Some(remote)) = (local, resource.last_modified()?) {
            if local > remote {
                tracing::info!(path = %path.display(), "open data snapshot is up to date");
                return Ok(RefreshOutcome::UpToDate);
            }
        }

        let courses = filter_current_year(self.download_courses(resource).await?, current_year);
        write_snapshot(path, &courses).await?;

        tracing::info!(
            path = %path.display(),
            courses = courses.len(),
            "open data snapshot downloaded"
        );
        Ok(RefreshOutcome::Downloaded(courses.len()))
    }
}

async fn snapshot_modified(path: &Path) -> Result<Option<DateTime<Utc>>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(DateTime::<Utc>::from(meta.modified()?))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 只保留学年字段包含指定年份的课程
pub fn filter_current_year(courses: Vec<Course>, year: i32) -> Vec<Course> {
    let year = year.to_string();
    courses
        .into_iter()
        .filter(|c| c.academic_year.contains(&year))
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// 解析开放数据课程 CSV，第一行为表头
///
/// 任何一行不合法都会使整个解析失败。
pub fn parse_courses_csv<R: Read>(reader: R) -> Result<Vec<Course>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut courses = Vec::with_capacity(100);
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = index + 2;
        if record.len() < COURSE_COLUMNS {
            return Err(Error::Malformed(format!(
                "line {}: expected {} columns, found {}",
                line,
                COURSE_COLUMNS,
                record.len()
            )));
        }

        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        let number = |i: usize, name: &str| -> Result<u32> {
            record
                .get(i)
                .unwrap_or_default()
                .trim()
                .parse()
                .map_err(|e| Error::Malformed(format!("line {}: invalid {}: {}", line, name, e)))
        };

        let international = parse_bool(record.get(10).unwrap_or_default().trim()).ok_or_else(|| {
            Error::Malformed(format!("line {}: invalid international flag", line))
        })?;

        courses.push(Course {
            academic_year: field(0),
            enrollable: field(1),
            code: number(2, "course code")?,
            description: field(3),
            url: field(4),
            campus: field(5),
            site: field(6),
            scope: field(7),
            course_type: field(8),
            duration_years: number(9, "duration")?,
            international,
            international_title: field(11),
            international_language: field(12),
            languages: field(13),
            access: field(14),
        });
    }

    Ok(courses)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "annoaccademico,immatricolabile,corso_codice,corso_descrizione,url,campus,sededidattica,ambiti,tipologia,durata,internazionale,internazionale_titolo,internazionale_lingua,lingue,accesso\n";

    #[test]
    fn test_parse_courses_csv() {
        let csv = format!(
            "{}{}{}",
            HEADER,
            "2024/2025,SI,8005,Ingegneria Informatica,https://www.unibo.it/it/studiare/lauree/8005,Bologna,Bologna,\"Ingegneria, Architettura\",Laurea,3,0,,,italiano,libero\n",
            "2024/2025,SI,9063,Artificial Intelligence,https://www.unibo.it/en/study/9063,Bologna,Bologna,Scienze,Laurea Magistrale,2,true,Double degree,inglese,inglese,programmato\n",
        );

        let courses = parse_courses_csv(csv.as_bytes()).unwrap();
        assert_eq!(courses.len(), 2);

        assert_eq!(courses[0].code, 8005);
        assert_eq!(courses[0].scope, "Ingegneria, Architettura");
        assert_eq!(courses[0].duration_years, 3);
        assert!(!courses[0].international);

        assert_eq!(courses[1].code, 9063);
        assert!(courses[1].international);
        assert_eq!(courses[1].international_language, "inglese");
        assert_eq!(courses[1].access, "programmato");
    }

    #[test]
    fn test_parse_courses_csv_rejects_bad_row() {
        let bad_code = format!(
            "{}2024/2025,SI,abc,X,u,c,s,a,t,3,0,,,it,libero\n",
            HEADER
        );
        assert!(parse_courses_csv(bad_code.as_bytes()).is_err());

        let bad_bool = format!(
            "{}2024/2025,SI,1,X,u,c,s,a,t,3,yes,,,it,libero\n",
            HEADER
        );
        assert!(parse_courses_csv(bad_bool.as_bytes()).is_err());

        let short = format!("{}2024/2025,SI,1\n", HEADER);
        let err = parse_courses_csv(short.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
    }

    #[test]
    fn test_resource_alias_lookup() {
        let json = r#"{
            "success": true,
            "result": {
                "resources": [
                    {"url": "https://dati.unibo.it/a.csv", "alias": "corsi_2023_it, corsi_old"},
                    {"url": "https://dati.unibo.it/b.csv", "alias": "corsi_2024_it, corsi_latest_it", "last_modified": "2024-07-01T10:20:30.123456"}
                ]
            }
        }"#;

        let package: Package = serde_json::from_str(json).unwrap();
        assert!(package.success);

        let resource = package.resource_by_alias(LATEST_COURSES_ALIAS).unwrap();
        assert_eq!(resource.url, "https://dati.unibo.it/b.csv");
        assert!(package.resource_by_alias("corsi_latest").is_none());

        let modified = resource.last_modified().unwrap().unwrap();
        assert_eq!(modified.to_rfc3339(), "2024-07-01T10:20:30.123456+00:00");
    }

    #[test]
    fn test_last_modified_without_fraction() {
        let resource = Resource {
            frequency: String::new(),
            url: "x.csv".to_string(),
            id: String::new(),
            package_id: String::new(),
            last_modified: Some("2024-07-01T10:20:30".to_string()),
            alias: String::new(),
        };
        assert!(resource.last_modified().unwrap().is_some());
    }

    #[test]
    fn test_filter_current_year() {
        let csv = format!(
            "{}{}{}",
            HEADER,
            "2023/2024,SI,1,Vecchio,u,c,s,a,t,3,0,,,it,libero\n",
            "2024/2025,SI,2,Nuovo,u,c,s,a,t,3,0,,,it,libero\n",
        );
        let courses = parse_courses_csv(csv.as_bytes()).unwrap();

        let filtered = filter_current_year(courses.clone(), 2025);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].code, 2);

        assert_eq!(filter_current_year(courses, 2024).len(), 2);
    }

    #[test]
    fn test_package_url() {
        let provider = OpenDataProvider::new().unwrap();
        assert_eq!(
            provider.package_url(DEGREE_PROGRAMMES_PACKAGE).unwrap().as_str(),
            "https://dati.unibo.it/api/3/action/package_show?id=degree-programmes"
        );
    }
}
