use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::{
    CalendarRequest, Course, CourseWebsiteId, CurriculaMap, Error, Exam, Result, ServiceConfig,
    Subject, SubjectMap,
    aggregator::fetch_all_curricula,
    cache::Caches,
    course::CourseCatalog,
    event::EventMapper,
    filter::{filter_by_subjects, filter_exams},
    ics::{CalendarDocument, IcsGenerator},
    providers::TimetableSource,
    resolver::SubjectResolver,
};

/// 课程页面数据
#[derive(Debug, Clone, Serialize)]
pub struct CoursePage {
    pub course: Course,
    pub curricula: CurriculaMap,
    pub subjects: SubjectMap,
    /// 培养方案或科目获取失败，以空结果代替
    pub degraded: bool,
}

/// 日历服务：组合课程目录、上游数据源、缓存和 ICS 生成器
#[derive(Clone)]
pub struct CalendarService {
    catalog: Arc<CourseCatalog>,
    source: Arc<dyn TimetableSource>,
    caches: Caches,
    resolver: SubjectResolver,
    generator: IcsGenerator,
    config: ServiceConfig,
}

impl CalendarService {
    pub fn new(
        catalog: Arc<CourseCatalog>,
        source: Arc<dyn TimetableSource>,
        config: ServiceConfig,
    ) -> Self {
        let caches = Caches::new(&config.cache);
        let resolver = SubjectResolver::new(Arc::clone(&source), Arc::clone(&caches.subjects));
        let generator = IcsGenerator::new(
            config.ics.clone(),
            EventMapper::new(config.exam_duration),
        );

        Self {
            catalog,
            source,
            caches,
            resolver,
            generator,
            config,
        }
    }

    pub fn catalog(&self) -> &CourseCatalog {
        &self.catalog
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn course(&self, code: u32) -> Result<&Course> {
        self.catalog.get(code)
    }

    /// 课程网站标识，永久缓存
    pub async fn website_id(&self, course: &Course) -> Result<CourseWebsiteId> {
        let key = course.code.to_string();
        if let Some(id) = self.caches.website_ids.get(&key) {
            return Ok(id);
        }

        let id = self.source.website_id(course).await?;
        tracing::debug!(source = self.source.name(), course = course.code, "resolved website id");
        self.caches.website_ids.insert(key, id.clone());
        Ok(id)
    }

    /// 所有学年的培养方案
    pub async fn all_curricula(&self, course: &Course) -> Result<CurriculaMap> {
        let website_id = self.website_id(course).await?;
        fetch_all_curricula(Arc::clone(&self.source), &website_id, course.duration_years).await
    }

    pub async fn subjects(&self, course: &Course, curricula: &CurriculaMap) -> Result<SubjectMap> {
        let website_id = self.website_id(course).await?;
        self.resolver.resolve(course, &website_id, curricula).await
    }

    /// 课程页面：培养方案或科目失败时返回空结果，只有课程不存在才报错
    pub async fn course_page(&self, code: u32) -> Result<CoursePage> {
        let course = self.course(code)?;
        let mut degraded = false;

        let curricula = match self.all_curricula(course).await {
            Ok(curricula) => curricula,
            Err(e) => {
                tracing::error!(course = code, error = %e, "unable to get curricula");
                degraded = true;
                CurriculaMap::new()
            }
        };

        let subjects = match self.subjects(course, &curricula).await {
            Ok(subjects) => subjects,
            Err(e) => {
                tracing::error!(course = code, error = %e, "unable to get subjects");
                degraded = true;
                SubjectMap::new()
            }
        };

        Ok(CoursePage {
            course: course.clone(),
            curricula,
            subjects,
            degraded,
        })
    }

    fn validate(&self, request: &CalendarRequest) -> Result<&Course> {
        let course = self.course(request.course_code)?;
        if !course.has_year(request.year) {
            return Err(Error::InvalidRequest(format!(
                "year {} is out of range 1..={} for course {}",
                request.year, course.duration_years, course.code
            )));
        }
        Ok(course)
    }

    /// 课程日历的 ICS 字节，缓存期内重复请求返回完全相同的内容
    pub async fn lecture_calendar(&self, request: &CalendarRequest) -> Result<Arc<[u8]>> {
        let course = self.validate(request)?;

        let key = request.cache_key();
        if let Some(bytes) = self.caches.calendars.get(&key) {
            tracing::debug!(%key, "calendar cache hit");
            return Ok(bytes);
        }

        let website_id = self.website_id(course).await?;
        let timetable = self
            .source
            .timetable(&website_id, request.year, &request.curriculum, None)
            .await?;

        let subjects = (!request.subjects.is_empty()).then_some(request.subjects.as_slice());
        let timetable = filter_by_subjects(timetable, subjects);

        let document = self
            .generator
            .lecture_calendar(&timetable, course, request.year)?;
        let bytes: Arc<[u8]> = document.to_bytes().into();

        tracing::info!(
            source = self.source.name(),
            %key,
            events = document.events.len(),
            "generated lecture calendar"
        );
        self.caches.calendars.insert(key, Arc::clone(&bytes));
        Ok(bytes)
    }

    /// 考试日历；考试记录由调用方提供
    pub fn exam_calendar<S: AsRef<str>>(
        &self,
        exams: Vec<Exam>,
        subjects: Option<&[S]>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<CalendarDocument> {
        let exams = filter_exams(exams, subjects);
        self.generator.exam_calendar(&exams, title, description)
    }

    /// 预热所有课程的科目缓存，出错只记录日志
    pub async fn warm_subjects_cache(&self) {
        let codes = self.catalog.codes();
        tracing::info!(courses = codes.len(), "warming subjects cache");

        for (index, code) in codes.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.warm_course_delay).await;
            }

            let Some(course) = self.catalog.find(*code) else {
                continue;
            };
            if let Err(e) = self.warm_course(course).await {
                tracing::warn!(course = code, error = %e, "cache warming failed");
            }
        }

        tracing::info!("subjects cache warmed");
    }

    async fn warm_course(&self, course: &Course) -> Result<()> {
        let curricula = self.all_curricula(course).await?;
        let subjects = self.subjects(course, &curricula).await?;
        let count: usize = subjects
            .values()
            .flatten()
            .map(|c| c.subjects.len())
            .sum();
        tracing::debug!(course = course.code, subjects = count, "warmed course");
        Ok(())
    }

    /// 在后台运行一次预热，启动前先等待
    pub fn spawn_warmer(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(service.config.warm_start_delay).await;
            service.warm_subjects_cache().await;
        })
    }

    /// 某个 (学年, 培养方案) 的科目，供 CLI 使用
    pub async fn year_subjects(
        &self,
        course: &Course,
        year: u32,
        curriculum: &crate::Curriculum,
    ) -> Result<Vec<Subject>> {
        let website_id = self.website_id(course).await?;
        self.resolver
            .subjects(course, &website_id, year, curriculum)
            .await
    }
}
