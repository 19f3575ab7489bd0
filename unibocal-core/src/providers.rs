pub mod base;
pub mod opendata;
pub mod unibo;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

use crate::{Course, CourseWebsiteId, Curriculum, DateRange, Result, Timetable};

pub use base::*;

/// Upstream source of course websites, curricula and timetables.
///
/// Implementations perform no retries; every failure is reported to the caller.
#[async_trait]
pub trait TimetableSource: Send + Sync {
    /// Source name, used in logs and errors
    fn name(&self) -> &str;

    /// Resolve the website identifier of a course by scraping its homepage.
    ///
    /// A homepage without the expected link is a malformed-data error.
    async fn website_id(&self, course: &Course) -> Result<CourseWebsiteId>;

    /// Curricula available for one academic year of a course
    async fn curricula(&self, website_id: &CourseWebsiteId, year: u32) -> Result<Vec<Curriculum>>;

    /// Timetable of one (year, curriculum) pair, optionally limited to a date range.
    ///
    /// An empty curriculum value means no curriculum filter.
    async fn timetable(
        &self,
        website_id: &CourseWebsiteId,
        year: u32,
        curriculum: &Curriculum,
        range: Option<DateRange>,
    ) -> Result<Timetable>;
}
