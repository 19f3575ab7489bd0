use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;

use crate::{
    Course, CourseWebsiteId, Curriculum, DateRange, Error, Result, Timetable,
    providers::{BaseProvider, BaseProviderBuilder, ProviderInfo, TimetableSource},
};

const API_ROOT: &str = "https://corsi.unibo.it/";
const WEBSITE_LINK_PATTERN: &str = r#"<a title="Sito del corso" href="https://corsi\.unibo\.it/(.+?)""#;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// corsi.unibo.it 课程网站
pub struct UniboProvider {
    base: BaseProvider,
    root: Url,
    website_link: Regex,
}

impl UniboProvider {
    pub fn new() -> Result<Self> {
        Self::with_root(API_ROOT)
    }

    /// 使用自定义根地址（测试或镜像）
    pub fn with_root(root: &str) -> Result<Self> {
        let info = ProviderInfo {
            name: "unibo".to_string(),
        };
        let root = Url::parse(root)
            .map_err(|e| Error::Config(format!("invalid upstream root {}: {}", root, e)))?;
        let website_link = Regex::new(WEBSITE_LINK_PATTERN)
            .map_err(|e| Error::Config(format!("invalid website pattern: {}", e)))?;

        Ok(Self {
            base: BaseProviderBuilder::new(info).build()?,
            root,
            website_link,
        })
    }

    /// 从课程主页 HTML 中提取网站标识
    pub fn parse_website_id(&self, html: &str) -> Result<CourseWebsiteId> {
        let captures = self
            .website_link
            .captures(html)
            .ok_or_else(|| Error::Malformed("course website link not found".to_string()))?;

        // laurea/IngegneriaInformatica/... -> (laurea, IngegneriaInformatica)
        let mut segments = captures[1].split('/').filter(|s| !s.is_empty());
        match (segments.next(), segments.next()) {
            (Some(category), Some(slug)) => Ok(CourseWebsiteId {
                category: category.to_string(),
                slug: slug.to_string(),
            }),
            _ => Err(Error::Malformed(format!(
                "unexpected course website path: {}",
                &captures[1]
            ))),
        }
    }

    fn page_url(&self, id: &CourseWebsiteId, endpoint: &str) -> Result<Url> {
        let path = format!("{}/{}/orario-lezioni/{}", id.category, id.slug, endpoint);
        self.root
            .join(&path)
            .map_err(|e| Error::Internal(format!("invalid upstream url {}: {}", path, e)))
    }

    pub fn curricula_url(&self, id: &CourseWebsiteId, year: u32) -> Result<Url> {
        let mut url = self.page_url(id, "@@available_curricula")?;
        url.query_pairs_mut()
            .append_pair("anno", &year.to_string())
            .append_pair("curricula", "");
        Ok(url)
    }

    pub fn timetable_url(
        &self,
        id: &CourseWebsiteId,
        year: u32,
        curriculum: &Curriculum,
        range: Option<DateRange>,
    ) -> Result<Url> {
        let mut url = self.page_url(id, "@@orario_reale_json")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("anno", &year.to_string());
            if !curriculum.is_none() {
                query.append_pair("curricula", &curriculum.value);
            }
            if let Some(range) = range {
                query
                    .append_pair("start", &range.start.format(DATE_FORMAT).to_string())
                    .append_pair("end", &range.end.format(DATE_FORMAT).to_string());
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl TimetableSource for UniboProvider {
    fn name(&self) -> &str {
        &self.base.info.name
    }

    async fn website_id(&self, course: &Course) -> Result<CourseWebsiteId> {
        let html = self.base.get_text(course.url.as_str()).await?;
        let id = self.parse_website_id(&html)?;
        tracing::debug!(course = course.code, category = %id.category, slug = %id.slug, "resolved course website");
        Ok(id)
    }

    async fn curricula(&self, website_id: &CourseWebsiteId, year: u32) -> Result<Vec<Curriculum>> {
        let url = self.curricula_url(website_id, year)?;
        self.base.get_json(url).await
    }

    async fn timetable(
        &self,
        website_id: &CourseWebsiteId,
        year: u32,
        curriculum: &Curriculum,
        range: Option<DateRange>,
    ) -> Result<Timetable> {
        let url = self.timetable_url(website_id, year, curriculum, range)?;
        self.base.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn website_id() -> CourseWebsiteId {
        CourseWebsiteId {
            category: "laurea".to_string(),
            slug: "IngegneriaInformatica".to_string(),
        }
    }

    #[test]
    fn test_parse_website_id() {
        let provider = UniboProvider::new().unwrap();
        let html = r#"<div><a title="Sito del corso" href="https://corsi.unibo.it/laurea/IngegneriaInformatica" class="btn">Sito</a></div>"#;

        assert_eq!(provider.parse_website_id(html).unwrap(), website_id());
        assert_eq!(provider.name(), "unibo");
    }

    #[test]
    fn test_parse_website_id_with_trailing_path() {
        let provider = UniboProvider::new().unwrap();
        let html = r#"<a title="Sito del corso" href="https://corsi.unibo.it/magistrale/AI/orario-lezioni">"#;

        let id = provider.parse_website_id(html).unwrap();
        assert_eq!(id.category, "magistrale");
        assert_eq!(id.slug, "AI");
    }

    #[test]
    fn test_parse_website_id_missing_link() {
        let provider = UniboProvider::new().unwrap();

        let err = provider
            .parse_website_id("<html><body>niente</body></html>")
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);

        let err = provider
            .parse_website_id(r#"<a title="Sito del corso" href="https://corsi.unibo.it/laurea""#)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Malformed);
    }

    #[test]
    fn test_curricula_url() {
        let provider = UniboProvider::new().unwrap();
        let url = provider.curricula_url(&website_id(), 2).unwrap();

        assert_eq!(
            url.as_str(),
            "https://corsi.unibo.it/laurea/IngegneriaInformatica/orario-lezioni/@@available_curricula?anno=2&curricula="
        );
    }

    #[test]
    fn test_timetable_url() {
        let provider = UniboProvider::new().unwrap();

        let url = provider
            .timetable_url(&website_id(), 1, &Curriculum::none(), None)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://corsi.unibo.it/laurea/IngegneriaInformatica/orario-lezioni/@@orario_reale_json?anno=1"
        );

        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2024, 9, 16).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
        };
        let url = provider
            .timetable_url(&website_id(), 2, &Curriculum::from_value("A58-000"), Some(range))
            .unwrap();
        assert_eq!(
            url.query(),
            Some("anno=2&curricula=A58-000&start=2024-09-16&end=2024-12-20")
        );
    }
}
