//! In-memory source used by unit tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    Course, CourseWebsiteId, Curriculum, DateRange, Error, Result, Timetable,
    providers::TimetableSource,
};

#[derive(Default)]
pub struct MockSource {
    pub curricula: HashMap<u32, Vec<Curriculum>>,
    /// (year, curriculum value) -> timetable
    pub timetables: HashMap<(u32, String), Timetable>,
    /// years whose curricula request fails
    pub failing_years: Vec<u32>,
    pub delay: Option<Duration>,
    pub website_calls: AtomicUsize,
    pub curricula_calls: AtomicUsize,
    pub timetable_calls: AtomicUsize,
    pub requested: Mutex<Vec<(u32, String)>>,
}

impl MockSource {
    pub fn website_id() -> CourseWebsiteId {
        CourseWebsiteId {
            category: "laurea".to_string(),
            slug: "IngegneriaInformatica".to_string(),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.website_calls.load(Ordering::SeqCst)
            + self.curricula_calls.load(Ordering::SeqCst)
            + self.timetable_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TimetableSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn website_id(&self, _course: &Course) -> Result<CourseWebsiteId> {
        self.website_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::website_id())
    }

    async fn curricula(&self, _website_id: &CourseWebsiteId, year: u32) -> Result<Vec<Curriculum>> {
        self.curricula_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_years.contains(&year) {
            return Err(Error::Upstream {
                source_name: "mock".to_string(),
                message: format!("year {} unavailable", year),
            });
        }
        Ok(self.curricula.get(&year).cloned().unwrap_or_default())
    }

    async fn timetable(
        &self,
        _website_id: &CourseWebsiteId,
        year: u32,
        curriculum: &Curriculum,
        _range: Option<DateRange>,
    ) -> Result<Timetable> {
        self.timetable_calls.fetch_add(1, Ordering::SeqCst);
        let key = (year, curriculum.value.clone());
        self.requested.lock().unwrap().push(key.clone());
        self.timetables.get(&key).cloned().ok_or_else(|| Error::Upstream {
            source_name: "mock".to_string(),
            message: format!("no timetable for {:?}", key),
        })
    }
}
