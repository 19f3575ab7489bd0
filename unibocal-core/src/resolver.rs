use std::sync::Arc;

use crate::{
    Course, CourseWebsiteId, CurriculaMap, Curriculum, CurriculumSubjects, Result, Subject,
    SubjectMap, cache::TtlCache, filter::extract_subjects, providers::TimetableSource,
};

/// Resolves the subjects taught in every (year, curriculum) pair of a course.
///
/// Each pair is cached independently; a miss fetches the full timetable of
/// that pair and keeps its distinct subjects.
#[derive(Clone)]
pub struct SubjectResolver {
    source: Arc<dyn TimetableSource>,
    cache: Arc<TtlCache<Vec<Subject>>>,
}

impl SubjectResolver {
    pub fn new(source: Arc<dyn TimetableSource>, cache: Arc<TtlCache<Vec<Subject>>>) -> Self {
        Self { source, cache }
    }

    pub fn cache_key(course_code: u32, year: u32, curriculum: &Curriculum) -> String {
        format!("{}-{}-{}", course_code, year, curriculum.value)
    }

    /// Subjects of a single pair, from cache when fresh.
    pub async fn subjects(
        &self,
        course: &Course,
        website_id: &CourseWebsiteId,
        year: u32,
        curriculum: &Curriculum,
    ) -> Result<Vec<Subject>> {
        let key = Self::cache_key(course.code, year, curriculum);
        if let Some(subjects) = self.cache.get(&key) {
            return Ok(subjects);
        }

        let timetable = self
            .source
            .timetable(website_id, year, curriculum, None)
            .await?;
        let subjects = extract_subjects(&timetable);
        self.cache.insert(key, subjects.clone());
        Ok(subjects)
    }

    /// The first failing pair aborts the whole resolution.
    pub async fn resolve(
        &self,
        course: &Course,
        website_id: &CourseWebsiteId,
        curricula: &CurriculaMap,
    ) -> Result<SubjectMap> {
        let mut map = SubjectMap::new();
        for (&year, year_curricula) in curricula {
            let mut entries = Vec::with_capacity(year_curricula.len());
            for curriculum in year_curricula {
                let subjects = self.subjects(course, website_id, year, curriculum).await?;
                entries.push(CurriculumSubjects {
                    curriculum: curriculum.clone(),
                    subjects,
                });
            }
            map.insert(year, entries);
        }
        Ok(map)
    }
}
