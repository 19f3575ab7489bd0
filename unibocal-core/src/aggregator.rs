use std::sync::Arc;

use tokio::task::JoinSet;

use crate::{CourseWebsiteId, CurriculaMap, Error, Result, providers::TimetableSource};

/// 并发获取 1..=years 每个学年的培养方案
///
/// 结果以学年为键，与完成顺序无关。任一学年失败即返回该错误，
/// 不返回部分结果。
pub async fn fetch_all_curricula(
    source: Arc<dyn TimetableSource>,
    website_id: &CourseWebsiteId,
    years: u32,
) -> Result<CurriculaMap> {
    let mut tasks = JoinSet::new();
    for year in 1..=years {
        let source = Arc::clone(&source);
        let website_id = website_id.clone();
        tasks.spawn(async move {
            let curricula = source.curricula(&website_id, year).await;
            (year, curricula)
        });
    }

    let mut map = CurriculaMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (year, curricula) =
            joined.map_err(|e| Error::Internal(format!("curricula task failed: {}", e)))?;
        match curricula {
            Ok(curricula) => {
                map.insert(year, curricula);
            }
            Err(e) => {
                tracing::warn!(source = source.name(), year, error = %e, "failed to fetch curricula");
                // 剩余任务在后台完成，结果被丢弃
                tasks.detach_all();
                return Err(e);
            }
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Curriculum, providers::mock::MockSource};
    use std::{sync::atomic::Ordering, time::Duration};

    fn curriculum(value: &str) -> Curriculum {
        Curriculum {
            value: value.to_string(),
            label: value.to_string(),
            selected: false,
        }
    }

    #[tokio::test]
    async fn test_fetch_all_years() {
        let mut mock = MockSource::default();
        mock.curricula.insert(1, vec![curriculum("000-000")]);
        mock.curricula.insert(2, vec![curriculum("A58-000"), curriculum("B12-000")]);
        mock.curricula.insert(3, vec![]);
        let mock = Arc::new(mock);

        let map = fetch_all_curricula(mock.clone(), &MockSource::website_id(), 3)
            .await
            .unwrap();

        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(map[&2].len(), 2);
        assert!(map[&3].is_empty());
        assert_eq!(mock.curricula_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_years_keyed_regardless_of_completion_order() {
        let mut mock = MockSource::default();
        mock.delay = Some(Duration::from_millis(10));
        for year in 1..=5 {
            mock.curricula.insert(year, vec![curriculum(&format!("Y{}", year))]);
        }

        let map = fetch_all_curricula(Arc::new(mock), &MockSource::website_id(), 5)
            .await
            .unwrap();

        for (year, curricula) in &map {
            assert_eq!(curricula[0].value, format!("Y{}", year));
        }
    }

    #[tokio::test]
    async fn test_single_failure_fails_all() {
        let mut mock = MockSource::default();
        mock.curricula.insert(1, vec![curriculum("000-000")]);
        mock.curricula.insert(3, vec![curriculum("000-000")]);
        mock.failing_years = vec![2];

        let err = fetch_all_curricula(Arc::new(mock), &MockSource::website_id(), 3)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Upstream);
    }

    #[tokio::test]
    async fn test_zero_years() {
        let map = fetch_all_curricula(Arc::new(MockSource::default()), &MockSource::website_id(), 0)
            .await
            .unwrap();
        assert!(map.is_empty());
    }
}
