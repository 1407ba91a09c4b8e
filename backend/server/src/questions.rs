//! # Questions
//!
//! Every question the server can answer, and how each one is answered.
//!
//! ## Catalogue
//! - `NumStudents` (**className**): distinct students whose course id contains the class name
//! - `ProblemSetSubmissions` (**problemID**, optional **csv**): every submission to one problem,
//!   also accepted as `studentProblemSetSubmissions`
//!
//! ## Answering
//! 1. Validate the question's parameters, malformed requests never reach MySQL
//! 2. Look the parameter up in the question's cache partition
//! 3. On a miss, run the question's prepared statement once and cache the shaped result
//! 4. Format the result as an HTML fragment for the answer page
//!
//! ## Empty results
//! - `NumStudents` with no row caches nothing and replies [`Reply::Empty`]
//! - `ProblemSetSubmissions` with no rows caches the empty list so the next ask skips MySQL
use std::{fmt, str::FromStr, sync::Arc};

use maud::{PreEscaped, html};
use tracing::{debug, info};

use crate::{
    cache::{Answer, AnswerCache},
    database::QueryExecutor,
    error::AppError,
    render::{render_csv, render_html},
    utils::{Params, escape_like},
};

pub const NUM_STUDENTS_SQL: &str = "SELECT COUNT(DISTINCT anon_screen_name) \
     FROM Edx.EdxTrackEvent \
     WHERE CAST(course_id AS BINARY) LIKE CONCAT('%', ?, '%')";

pub const SUBMISSIONS_SQL: &str = "SELECT anon_screen_name, time, correctness \
     FROM Edx.EdxTrackEvent \
     WHERE problem_id = ?";

pub const SUBMISSIONS_HEADER: &str = "AnonS,SubmissionTime,Correctness";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    NumStudents,
    ProblemSetSubmissions,
}

impl FromStr for QuestionKind {
    type Err = AppError;

    fn from_str(q_id: &str) -> Result<Self, Self::Err> {
        match q_id {
            "NumStudents" => Ok(QuestionKind::NumStudents),
            "ProblemSetSubmissions" | "studentProblemSetSubmissions" => {
                Ok(QuestionKind::ProblemSetSubmissions)
            }
            _ => Err(AppError::malformed(format!("Unknown question: {q_id}"))),
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::NumStudents => f.write_str("NumStudents"),
            QuestionKind::ProblemSetSubmissions => f.write_str("ProblemSetSubmissions"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// HTML fragment answering the question.
    Answered(String),
    /// No answer could be determined; carries a message for the client.
    Empty(String),
}

pub struct Resolver<'a> {
    cache: &'a AnswerCache,
    executor: &'a dyn QueryExecutor,
}

impl<'a> Resolver<'a> {
    pub fn new(cache: &'a AnswerCache, executor: &'a dyn QueryExecutor) -> Self {
        Self { cache, executor }
    }

    pub async fn answer(&self, kind: QuestionKind, params: &Params) -> Result<Reply, AppError> {
        match kind {
            QuestionKind::NumStudents => self.num_students(params).await,
            QuestionKind::ProblemSetSubmissions => self.problem_set_submissions(params).await,
        }
    }

    async fn num_students(&self, params: &Params) -> Result<Reply, AppError> {
        let kind = QuestionKind::NumStudents;
        let class_name = params.required(
            "className",
            "The query did not include a class name.",
            "Class name is in wrong format.",
        )?;

        if let Some(Answer::Count(count)) = self.cache.get(kind, class_name) {
            debug!(%kind, class_name, "Cache hit");
            return Ok(Reply::Answered(num_students_fragment(class_name, count)));
        }

        debug!(%kind, class_name, "Cache miss");
        let pattern = escape_like(class_name);
        let rows = self.executor.query(NUM_STUDENTS_SQL, &[pattern.as_str()]).await?;

        let Some(row) = rows.first() else {
            info!(%kind, class_name, "Query returned no rows");
            return Ok(Reply::Empty(
                html! { "No student count available for class " (class_name) "." }.into_string(),
            ));
        };

        let count = match row.as_slice() {
            [value] => value.as_count(),
            _ => None,
        }
        .ok_or_else(|| AppError::UnexpectedResult(format!("{kind} row {row:?}")))?;

        self.cache.put(kind, class_name, Answer::Count(count));

        Ok(Reply::Answered(num_students_fragment(class_name, count)))
    }

    async fn problem_set_submissions(&self, params: &Params) -> Result<Reply, AppError> {
        let kind = QuestionKind::ProblemSetSubmissions;
        let problem_id = params.required(
            "problemID",
            "The query did not include a problem ID.",
            "Problem ID is in wrong format.",
        )?;
        let as_csv = params.flag("csv");

        let rows = match self.cache.get(kind, problem_id) {
            Some(Answer::Rows(rows)) => {
                debug!(%kind, problem_id, "Cache hit");
                rows
            }
            _ => {
                debug!(%kind, problem_id, "Cache miss");
                let rows = Arc::new(self.executor.query(SUBMISSIONS_SQL, &[problem_id]).await?);
                self.cache.put(kind, problem_id, Answer::Rows(rows.clone()));
                rows
            }
        };

        if rows.is_empty() {
            return Ok(Reply::Answered(
                html! { "No submissions found for problem " (problem_id) "." }.into_string(),
            ));
        }

        let table = if as_csv {
            render_csv(&rows, SUBMISSIONS_HEADER)
        } else {
            render_html(&rows, SUBMISSIONS_HEADER)
        };

        Ok(Reply::Answered(
            html! { "Submissions to problem " (problem_id) ":" br; " " (PreEscaped(table)) }
                .into_string(),
        ))
    }
}

fn num_students_fragment(class_name: &str, count: u64) -> String {
    let markup = html! { "Number of students in " (class_name) " is " (count) };
    markup.into_string()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::database::{ExecutorError, Row, Value};

    #[derive(Default)]
    struct ScriptedExecutor {
        rows: Vec<Row>,
        fail: bool,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl ScriptedExecutor {
        fn returning(rows: Vec<Row>) -> Self {
            Self {
                rows,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl QueryExecutor for ScriptedExecutor {
        async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, ExecutorError> {
            self.calls.lock().push((
                sql.to_string(),
                params.iter().map(|p| p.to_string()).collect(),
            ));

            if self.fail {
                return Err(ExecutorError::Unavailable("connection refused".into()));
            }

            Ok(self.rows.clone())
        }
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn submissions() -> Vec<Row> {
        vec![
            vec![
                Value::Text("alice".into()),
                Value::Text("t1".into()),
                Value::Bool(true),
            ],
            vec![Value::Null, Value::Text("t2".into()), Value::Bool(false)],
        ]
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!("NumStudents".parse::<QuestionKind>().unwrap(), QuestionKind::NumStudents);
        assert_eq!(
            "ProblemSetSubmissions".parse::<QuestionKind>().unwrap(),
            QuestionKind::ProblemSetSubmissions
        );
        assert_eq!(
            "studentProblemSetSubmissions".parse::<QuestionKind>().unwrap(),
            QuestionKind::ProblemSetSubmissions
        );

        let err = "numstudents".parse::<QuestionKind>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown question: numstudents");
    }

    #[tokio::test]
    async fn test_num_students_queries_once() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor::returning(vec![vec![Value::Int(42)]]);
        let resolver = Resolver::new(&cache, &executor);
        let p = params(&[("className", "CS144")]);

        let first = resolver.answer(QuestionKind::NumStudents, &p).await.unwrap();
        let second = resolver.answer(QuestionKind::NumStudents, &p).await.unwrap();

        assert_eq!(first, Reply::Answered("Number of students in CS144 is 42".into()));
        assert_eq!(first, second);
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn test_num_students_binds_escaped_pattern() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor::returning(vec![vec![Value::Int(0)]]);
        let resolver = Resolver::new(&cache, &executor);

        resolver
            .answer(QuestionKind::NumStudents, &params(&[("className", "CS_1%'")]))
            .await
            .unwrap();

        let calls = executor.calls.lock();
        assert_eq!(calls[0].0, NUM_STUDENTS_SQL);
        assert_eq!(calls[0].1, vec!["CS\\_1\\%'".to_string()]);
    }

    #[tokio::test]
    async fn test_invalidate_forces_requery() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor::returning(vec![vec![Value::Int(42)]]);
        let resolver = Resolver::new(&cache, &executor);
        let p = params(&[("className", "CS144")]);

        resolver.answer(QuestionKind::NumStudents, &p).await.unwrap();
        cache.invalidate_all();
        resolver.answer(QuestionKind::NumStudents, &p).await.unwrap();

        assert_eq!(executor.calls(), 2);
    }

    #[tokio::test]
    async fn test_num_students_without_rows_is_not_cached() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor::returning(vec![]);
        let resolver = Resolver::new(&cache, &executor);
        let p = params(&[("className", "CS144")]);

        let reply = resolver.answer(QuestionKind::NumStudents, &p).await.unwrap();
        assert!(matches!(reply, Reply::Empty(_)));
        assert!(cache.is_empty());

        resolver.answer(QuestionKind::NumStudents, &p).await.unwrap();
        assert_eq!(executor.calls(), 2);
    }

    #[tokio::test]
    async fn test_num_students_wrong_shape() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor::returning(vec![vec![Value::Int(1), Value::Int(2)]]);
        let resolver = Resolver::new(&cache, &executor);

        let err = resolver
            .answer(QuestionKind::NumStudents, &params(&[("className", "CS144")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnexpectedResult(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_missing_class_name_skips_query() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor::default();
        let resolver = Resolver::new(&cache, &executor);

        let err = resolver
            .answer(QuestionKind::NumStudents, &params(&[]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "The query did not include a class name.");
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_submissions_are_cached() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor::returning(vec![]);
        let resolver = Resolver::new(&cache, &executor);
        let p = params(&[("problemID", "p1")]);

        let first = resolver
            .answer(QuestionKind::ProblemSetSubmissions, &p)
            .await
            .unwrap();
        resolver
            .answer(QuestionKind::ProblemSetSubmissions, &p)
            .await
            .unwrap();

        assert_eq!(first, Reply::Answered("No submissions found for problem p1.".into()));
        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn test_submissions_csv_and_html_share_cache() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor::returning(submissions());
        let resolver = Resolver::new(&cache, &executor);

        let csv = resolver
            .answer(
                QuestionKind::ProblemSetSubmissions,
                &params(&[("problemID", "p1"), ("csv", "on")]),
            )
            .await
            .unwrap();
        let table = resolver
            .answer(QuestionKind::ProblemSetSubmissions, &params(&[("problemID", "p1")]))
            .await
            .unwrap();

        assert_eq!(
            csv,
            Reply::Answered(
                "Submissions to problem p1:<br> \
                 AnonS,SubmissionTime,Correctness<br>alice,t1,True<br>n/a,t2,False<br>"
                    .into()
            )
        );
        let Reply::Answered(table) = table else {
            panic!("expected an answer");
        };
        assert!(table.starts_with("Submissions to problem p1:<br> <table>"));
        assert!(table.contains("<td>n/a</td>"));
        assert_eq!(executor.calls(), 1);

        let calls = executor.calls.lock();
        assert_eq!(calls[0].0, SUBMISSIONS_SQL);
        assert_eq!(calls[0].1, vec!["p1".to_string()]);
    }

    #[tokio::test]
    async fn test_partitions_do_not_collide() {
        let cache = AnswerCache::new();
        cache.put(QuestionKind::NumStudents, "CS144", Answer::Count(42));
        let executor = ScriptedExecutor::returning(vec![]);
        let resolver = Resolver::new(&cache, &executor);

        resolver
            .answer(QuestionKind::ProblemSetSubmissions, &params(&[("problemID", "CS144")]))
            .await
            .unwrap();

        assert_eq!(executor.calls(), 1);
    }

    #[tokio::test]
    async fn test_backing_store_failure() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor {
            fail: true,
            ..Default::default()
        };
        let resolver = Resolver::new(&cache, &executor);

        let err = resolver
            .answer(QuestionKind::ProblemSetSubmissions, &params(&[("problemID", "p1")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BackingStoreFailure(_)));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_fragments_escape_parameters() {
        let cache = AnswerCache::new();
        let executor = ScriptedExecutor::returning(vec![vec![Value::Int(3)]]);
        let resolver = Resolver::new(&cache, &executor);

        let reply = resolver
            .answer(QuestionKind::NumStudents, &params(&[("className", "<b>")]))
            .await
            .unwrap();

        assert_eq!(reply, Reply::Answered("Number of students in &lt;b&gt; is 3".into()));
    }
}
