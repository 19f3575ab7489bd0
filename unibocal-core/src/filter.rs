use std::collections::HashSet;

use crate::{Exam, Subject, Timetable, TimetableEvent};

/// 按科目代码筛选课表
///
/// `None` 或空列表表示不筛选，原样返回；否则保留模块代码完全匹配的事件，
/// 保持原有顺序，不去重。
pub fn filter_by_subjects<S: AsRef<str>>(timetable: Timetable, codes: Option<&[S]>) -> Timetable {
    let codes = match codes {
        Some(codes) if !codes.is_empty() => codes,
        _ => return timetable,
    };

    timetable
        .into_iter()
        .filter(|event| codes.iter().any(|c| c.as_ref() == event.module_code))
        .collect()
}

/// 从课表中提取去重后的科目，按名称排序
pub fn extract_subjects(timetable: &[TimetableEvent]) -> Vec<Subject> {
    let mut seen = HashSet::new();
    let mut subjects: Vec<Subject> = timetable
        .iter()
        .filter(|event| seen.insert((event.module_code.as_str(), event.title.as_str())))
        .map(|event| Subject {
            code: event.module_code.clone(),
            name: event.title.clone(),
        })
        .collect();

    subjects.sort_by(|a, b| a.name.cmp(&b.name));
    subjects
}

/// 考试记录使用的科目代码：去掉最后一个 `_` 及其后缀
///
/// `SPOT_<digits>` 这类代码也会被截断，目前保持这种行为。
pub fn exam_subject_code(module_code: &str) -> &str {
    match module_code.rfind('_') {
        Some(idx) => &module_code[..idx],
        None => module_code,
    }
}

/// 按科目代码筛选考试，规则与课表筛选一致
pub fn filter_exams<S: AsRef<str>>(exams: Vec<Exam>, codes: Option<&[S]>) -> Vec<Exam> {
    let codes = match codes {
        Some(codes) if !codes.is_empty() => codes,
        _ => return exams,
    };

    let wanted: HashSet<&str> = codes.iter().map(|c| exam_subject_code(c.as_ref())).collect();

    exams
        .into_iter()
        .filter(|exam| wanted.contains(exam_subject_code(&exam.subject_code)))
        .collect()
}
